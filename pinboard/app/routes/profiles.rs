use async_trait::async_trait;
use hyper::{Body, Method, Request, Response};
use tracing::info;

use crate::auth::current_user;
use crate::context::AppCtx;
use crate::forms::{AvatarForm, ProfileForm};
use crate::media::DecodedUpload;
use crate::models::User;
use crate::repo::{boards, pins, profiles, users};
use crate::views::{PinView, ProfileView};
use crate::web::error::AppError;
use crate::web::request::{match_pattern, path_param, PendingJson, Session};
use crate::web::response::{json_response, redirect};
use crate::web::Preroute;

const USER_PROFILE: &str = "/profile/{username}/";

#[derive(Debug)]
pub(crate) struct UploadAvatarRequest {
    session: Session,
    body: PendingJson<AvatarForm>,
}

#[async_trait]
impl Preroute for UploadAvatarRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && path == "/profile/upload_avatar/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            body: PendingJson::new(req),
        })
    }
}

pub(crate) async fn upload_avatar(
    ctx: AppCtx,
    req: UploadAvatarRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let avatar = req.body.read().await?.clean()?;
    replace_avatar(&ctx, &user, &avatar).await?;
    Ok(redirect("/profile/"))
}

async fn replace_avatar(ctx: &AppCtx, user: &User, avatar: &DecodedUpload) -> Result<(), AppError> {
    let stored = ctx.media.save(avatar).await?;
    let user_id = user.id;
    let path = stored.clone();
    match ctx
        .db(move |conn| Ok(profiles::set_avatar(conn, user_id, &path)?))
        .await
    {
        Ok(previous) => {
            if let Some(previous) = previous {
                ctx.media.discard(&previous).await;
            }
            info!(user_id, avatar = %stored, "avatar replaced");
            Ok(())
        }
        Err(e) => {
            ctx.media.discard(&stored).await;
            Err(e)
        }
    }
}

#[derive(Debug)]
pub(crate) struct OwnProfileRequest {
    session: Session,
}

#[async_trait]
impl Preroute for OwnProfileRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::GET && path == "/profile/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
        })
    }
}

pub(crate) async fn own_profile(
    ctx: AppCtx,
    req: OwnProfileRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let viewer = user.id;
    profile_page(&ctx, user, viewer).await
}

#[derive(Debug)]
pub(crate) struct UserProfileRequest {
    session: Session,
    username: String,
}

#[async_trait]
impl Preroute for UserProfileRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::GET && match_pattern(USER_PROFILE, path).is_some()
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            username: path_param(USER_PROFILE, req.uri().path(), 0)?,
        })
    }
}

pub(crate) async fn user_profile(
    ctx: AppCtx,
    req: UserProfileRequest,
) -> Result<Response<Body>, AppError> {
    let viewer = current_user(&ctx, &req.session).await?.id;
    let username = req.username;
    let user = ctx
        .db(move |conn| Ok(users::find_by_username(conn, &username)?))
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    profile_page(&ctx, user, viewer).await
}

async fn profile_page(ctx: &AppCtx, user: User, viewer: i32) -> Result<Response<Body>, AppError> {
    let user_id = user.id;
    let (profile, pins, boards) = ctx
        .db(move |conn| {
            let profile = profiles::get_or_create(conn, user_id)?;
            let pins = pins::list_by_user(conn, user_id)?;
            let pins = pins::with_details(conn, pins)?;
            let boards = boards::list_by_user(conn, user_id)?;
            let boards = super::board_summaries(conn, &boards)?;
            Ok((profile, pins, boards))
        })
        .await?;
    json_response(&ProfileView {
        display_name: ProfileView::shown_name(&profile, &user),
        username: user.username,
        bio: profile.bio,
        avatar: profile.avatar.as_deref().map(|p| ctx.media.url(p)),
        is_own_profile: user_id == viewer,
        pins: PinView::list(&ctx.media, &pins),
        boards,
    })
}

#[derive(Debug)]
pub(crate) struct EditProfileRequest {
    session: Session,
    body: PendingJson<ProfileForm>,
}

#[async_trait]
impl Preroute for EditProfileRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && path == "/profile/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            body: PendingJson::new(req),
        })
    }
}

pub(crate) async fn edit_profile(
    ctx: AppCtx,
    req: EditProfileRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let changes = req.body.read().await?.clean()?;
    let stored = match &changes.avatar {
        Some(avatar) => Some(ctx.media.save(avatar).await?),
        None => None,
    };
    let user_id = user.id;
    let avatar = stored.clone();
    let result = ctx
        .db(move |conn| {
            Ok(profiles::update(
                conn,
                user_id,
                &changes.display_name,
                &changes.bio,
                avatar.as_deref(),
            )?)
        })
        .await;
    match result {
        Ok(previous) => {
            if let Some(previous) = previous {
                ctx.media.discard(&previous).await;
            }
            info!(user_id, "profile updated");
            Ok(redirect("/profile/"))
        }
        Err(e) => {
            if let Some(stored) = &stored {
                ctx.media.discard(stored).await;
            }
            Err(e)
        }
    }
}
