use async_trait::async_trait;
use hyper::{Body, Method, Request, Response};
use tracing::info;

use crate::auth::current_user;
use crate::context::AppCtx;
use crate::forms::{AddToBoardForm, BoardForm};
use crate::models::Board;
use crate::repo::{boards, pins};
use crate::views::{BoardDetail, PinView};
use crate::web::error::AppError;
use crate::web::request::{matches_with, path_param, PendingJson, Session};
use crate::web::response::{json_response, redirect};
use crate::web::Preroute;

const ADD_TO_BOARD: &str = "/add_to_board/{pin_id}/";
const REMOVE_FROM_BOARD: &str = "/remove_from_board/{board_id}/{pin_id}/";
const BOARD: &str = "/board/{board_id}/";
const DELETE_BOARD: &str = "/board/{board_id}/delete/";

fn board_url(board_id: i32) -> String {
    format!("/board/{}/", board_id)
}

/// Someone else's board is reported exactly like a missing one.
async fn owned_board(ctx: &AppCtx, board_id: i32, user_id: i32) -> Result<Board, AppError> {
    ctx.db(move |conn| Ok(boards::find_owned(conn, board_id, user_id)?))
        .await?
        .ok_or_else(|| AppError::not_found("board"))
}

#[derive(Debug)]
pub(crate) struct UploadBoardRequest {
    session: Session,
    body: PendingJson<BoardForm>,
}

#[async_trait]
impl Preroute for UploadBoardRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && path == "/upload_board/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            body: PendingJson::new(req),
        })
    }
}

pub(crate) async fn upload_board(
    ctx: AppCtx,
    req: UploadBoardRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let form = req.body.read().await?;
    let user_id = user.id;
    let board_id = ctx
        .db(move |conn| {
            let existing = pins::existing_ids(conn, &form.pin_ids())?;
            let board = form.clean(&existing)?;
            Ok(boards::create(conn, user_id, &board.title, &board.pin_ids)?)
        })
        .await?;
    info!(user_id, board_id, "board created");
    Ok(redirect("/"))
}

#[derive(Debug)]
pub(crate) struct AddToBoardRequest {
    session: Session,
    pin_id: i32,
    body: PendingJson<AddToBoardForm>,
}

#[async_trait]
impl Preroute for AddToBoardRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && matches_with::<i32>(ADD_TO_BOARD, path)
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            pin_id: path_param(ADD_TO_BOARD, req.uri().path(), 0)?,
            body: PendingJson::new(req),
        })
    }
}

pub(crate) async fn add_to_board(
    ctx: AppCtx,
    req: AddToBoardRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let board_id = req.body.read().await?.clean()?;
    let board = owned_board(&ctx, board_id, user.id).await?;
    let pin_id = req.pin_id;
    ctx.db(move |conn| {
        pins::find(conn, pin_id)?.ok_or_else(|| AppError::not_found("pin"))?;
        Ok(boards::add_pin(conn, board_id, pin_id)?)
    })
    .await?;
    info!(board_id, pin_id, "pin added to board");
    Ok(redirect(&board_url(board.id)))
}

#[derive(Debug)]
pub(crate) struct RemoveFromBoardRequest {
    session: Session,
    board_id: i32,
    pin_id: i32,
}

#[async_trait]
impl Preroute for RemoveFromBoardRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && matches_with::<i32>(REMOVE_FROM_BOARD, path)
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        let path = req.uri().path();
        Ok(Self {
            session: Session::from_request(&req),
            board_id: path_param(REMOVE_FROM_BOARD, path, 0)?,
            pin_id: path_param(REMOVE_FROM_BOARD, path, 1)?,
        })
    }
}

pub(crate) async fn remove_from_board(
    ctx: AppCtx,
    req: RemoveFromBoardRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let board = owned_board(&ctx, req.board_id, user.id).await?;
    let (board_id, pin_id) = (board.id, req.pin_id);
    ctx.db(move |conn| {
        pins::find(conn, pin_id)?.ok_or_else(|| AppError::not_found("pin"))?;
        Ok(boards::remove_pin(conn, board_id, pin_id)?)
    })
    .await?;
    info!(board_id, pin_id, "pin removed from board");
    Ok(redirect(&board_url(board_id)))
}

#[derive(Debug)]
pub(crate) struct BoardRequest {
    session: Session,
    board_id: i32,
}

#[async_trait]
impl Preroute for BoardRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::GET && matches_with::<i32>(BOARD, path)
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            board_id: path_param(BOARD, req.uri().path(), 0)?,
        })
    }
}

pub(crate) async fn board_detail(
    ctx: AppCtx,
    req: BoardRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let board_id = req.board_id;
    let (board, owner, pins) = ctx
        .db(move |conn| {
            let board = boards::find(conn, board_id)?.ok_or_else(|| AppError::not_found("board"))?;
            let owner = boards::owner_name(conn, &board)?;
            let pins = boards::pins(conn, board_id)?;
            let pins = pins::with_details(conn, pins)?;
            Ok((board, owner, pins))
        })
        .await?;
    json_response(&BoardDetail {
        id: board.id,
        owner,
        title: board.title,
        created_at: board.created_at,
        is_owner: board.user_id == user.id,
        pins: PinView::list(&ctx.media, &pins),
    })
}

#[derive(Debug)]
pub(crate) struct DeleteBoardRequest {
    session: Session,
    board_id: i32,
}

#[async_trait]
impl Preroute for DeleteBoardRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && matches_with::<i32>(DELETE_BOARD, path)
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            board_id: path_param(DELETE_BOARD, req.uri().path(), 0)?,
        })
    }
}

pub(crate) async fn delete_board(
    ctx: AppCtx,
    req: DeleteBoardRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let board = owned_board(&ctx, req.board_id, user.id).await?;
    let board_id = board.id;
    ctx.db(move |conn| Ok(boards::delete(conn, board_id)?)).await?;
    info!(user_id = user.id, board_id, "board deleted");
    Ok(redirect("/profile/"))
}
