use async_trait::async_trait;
use hyper::{Body, Method, Request, Response};

use crate::auth::current_user;
use crate::context::AppCtx;
use crate::feed;
use crate::views::{HomeView, PinView, UserView};
use crate::web::error::AppError;
use crate::web::request::{parse_query, query_param, Session};
use crate::web::response::json_response;
use crate::web::Preroute;

#[derive(Debug)]
pub(crate) struct HomeRequest {
    session: Session,
    q: Option<String>,
}

#[async_trait]
impl Preroute for HomeRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::GET && path == "/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        let query = parse_query(req.uri().query().unwrap_or(""));
        Ok(Self {
            session: Session::from_request(&req),
            q: query_param(&query, "q")?,
        })
    }
}

pub(crate) async fn home(ctx: AppCtx, req: HomeRequest) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let user_id = user.id;
    let q = req.q;
    let (feed, boards) = ctx
        .db(move |conn| {
            let feed = feed::build(conn, user_id, q.as_deref())?;
            let boards = super::board_summaries(conn, &feed.boards)?;
            Ok((feed, boards))
        })
        .await?;
    json_response(&HomeView {
        query: feed.query,
        pins: PinView::list(&ctx.media, &feed.pins),
        boards,
        users: feed.users.iter().map(UserView::from).collect(),
    })
}
