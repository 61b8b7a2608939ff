use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use hyper::{Body, Method, Request, Response};
use tracing::info;

use crate::auth::{self, current_user};
use crate::context::AppCtx;
use crate::forms::{LoginForm, RegisterForm};
use crate::passwords::{hash_password, verify_password};
use crate::models::User;
use crate::repo::{self, profiles, users};
use crate::tokens::new_session_token;
use crate::web::error::AppError;
use crate::web::request::{JsonBody, Session};
use crate::web::response::{redirect, with_cookie};
use crate::web::Preroute;

#[derive(Debug)]
pub(crate) struct LoginRequest {
    body: JsonBody<LoginForm>,
}

#[async_trait]
impl Preroute for LoginRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && path == "/login/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            body: JsonBody::from_request(req).await?,
        })
    }
}

pub(crate) async fn login(ctx: AppCtx, req: LoginRequest) -> Result<Response<Body>, AppError> {
    let (username, password) = req.body.0.clean()?;
    let user = ctx
        .db(move |conn| {
            let user = users::find_by_username(conn, &username)?;
            Ok(user.filter(|u| verify_password(&password, &u.password_hash)))
        })
        .await?
        .ok_or_else(LoginForm::invalid_credentials)?;
    info!(user_id = user.id, "logged in");
    with_cookie(redirect("/"), &auth::login_cookie(&ctx, &user)?)
}

#[derive(Debug)]
pub(crate) struct RegisterRequest {
    body: JsonBody<RegisterForm>,
}

#[async_trait]
impl Preroute for RegisterRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && path == "/register/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            body: JsonBody::from_request(req).await?,
        })
    }
}

pub(crate) async fn register(
    ctx: AppCtx,
    req: RegisterRequest,
) -> Result<Response<Body>, AppError> {
    let form = req.body.0;
    let user = ctx.db(move |conn| create_account(conn, &form)).await?;
    info!(user_id = user.id, username = %user.username, "registered");
    with_cookie(redirect("/"), &auth::login_cookie(&ctx, &user)?)
}

/// The username check and the insert share one write transaction. A
/// concurrent registration that still wins the name is reported the same way.
fn create_account(conn: &mut SqliteConnection, form: &RegisterForm) -> Result<User, AppError> {
    conn.immediate_transaction::<_, AppError, _>(|conn| {
        let taken = users::username_taken(conn, form.username.trim())?;
        let registration = form.clean(taken)?;
        let password_hash = hash_password(&registration.password)?;
        let user = users::create(
            conn,
            &registration.username,
            &registration.email,
            &password_hash,
            &new_session_token(),
        )
        .map_err(|e| {
            if repo::is_unique_violation(&e) {
                AppError::from(RegisterForm::username_taken())
            } else {
                AppError::from(e)
            }
        })?;
        profiles::upsert_display_name(conn, user.id, &registration.display_name)?;
        Ok(user)
    })
}

#[derive(Debug)]
pub(crate) struct LogoutRequest {
    session: Session,
}

#[async_trait]
impl Preroute for LogoutRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && path == "/logout/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
        })
    }
}

pub(crate) async fn logout(ctx: AppCtx, req: LogoutRequest) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    auth::logout(&ctx, &user).await?;
    info!(user_id = user.id, "logged out");
    with_cookie(redirect("/login/"), &auth::logout_cookie())
}
