use async_trait::async_trait;
use hyper::{Body, Method, Request, Response};
use tracing::info;

use crate::auth::current_user;
use crate::context::AppCtx;
use crate::forms::{PinForm, PinSubmission};
use crate::media::MediaStore;
use crate::models::Pin;
use crate::moderation;
use crate::repo::pins::{self, PinDraft};
use crate::views::{PinEditView, PinView};
use crate::web::error::AppError;
use crate::web::request::{matches_with, path_param, PendingJson, Session};
use crate::web::response::{json_response, redirect};
use crate::web::Preroute;

const DELETE_PIN: &str = "/delete_pin/{pin_id}/";
const EDIT_PIN: &str = "/pin/{pin_id}/edit/";

/// Files written for one submission, removed again if the save fails.
#[derive(Debug, Default)]
struct StoredMedia {
    image: Option<String>,
    video: Option<String>,
}

impl StoredMedia {
    async fn store(media: &MediaStore, submission: &PinSubmission) -> Result<Self, AppError> {
        let mut stored = StoredMedia::default();
        if let Some(image) = &submission.image {
            stored.image = Some(media.save(image).await?);
        }
        if let Some(video) = &submission.video {
            match media.save(video).await {
                Ok(path) => stored.video = Some(path),
                Err(e) => {
                    stored.discard(media).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    async fn discard(&self, media: &MediaStore) {
        let paths = self.image.iter().chain(&self.video).cloned().collect();
        media.discard_all(paths).await;
    }
}

#[derive(Debug)]
pub(crate) struct UploadPinRequest {
    session: Session,
    body: PendingJson<PinForm>,
}

#[async_trait]
impl Preroute for UploadPinRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && path == "/upload_pin/"
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            body: PendingJson::new(req),
        })
    }
}

pub(crate) async fn upload_pin(
    ctx: AppCtx,
    req: UploadPinRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let submission = req.body.read().await?.clean()?;
    let stored = StoredMedia::store(&ctx.media, &submission).await?;
    let draft = PinDraft {
        title: submission.title,
        description: submission.description,
        image: stored.image.clone(),
        video: stored.video.clone(),
        tags: submission.tags,
    };
    let user_id = user.id;
    match ctx
        .db(move |conn| moderation::save_new_pin(conn, user_id, &draft))
        .await
    {
        Ok(pin_id) => {
            info!(user_id, pin_id, "pin uploaded");
            Ok(redirect("/"))
        }
        Err(e) => {
            stored.discard(&ctx.media).await;
            Err(e)
        }
    }
}

#[derive(Debug)]
pub(crate) struct DeletePinRequest {
    session: Session,
    pin_id: i32,
}

#[async_trait]
impl Preroute for DeletePinRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && matches_with::<i32>(DELETE_PIN, path)
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            pin_id: path_param(DELETE_PIN, req.uri().path(), 0)?,
        })
    }
}

pub(crate) async fn delete_pin(
    ctx: AppCtx,
    req: DeletePinRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let pin = owned_pin(&ctx, req.pin_id, user.id).await?;
    let pin_id = pin.id;
    ctx.db(move |conn| Ok(pins::delete(conn, pin_id)?)).await?;
    ctx.media
        .discard_all(pin.image.into_iter().chain(pin.video).collect())
        .await;
    info!(user_id = user.id, pin_id, "pin deleted");
    Ok(redirect("/profile/"))
}

/// Someone else's pin is reported exactly like a missing one.
async fn owned_pin(ctx: &AppCtx, pin_id: i32, user_id: i32) -> Result<Pin, AppError> {
    ctx.db(move |conn| Ok(pins::find_owned(conn, pin_id, user_id)?))
        .await?
        .ok_or_else(|| AppError::not_found("pin"))
}

#[derive(Debug)]
pub(crate) struct EditPinFormRequest {
    session: Session,
    pin_id: i32,
}

#[async_trait]
impl Preroute for EditPinFormRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::GET && matches_with::<i32>(EDIT_PIN, path)
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            pin_id: path_param(EDIT_PIN, req.uri().path(), 0)?,
        })
    }
}

pub(crate) async fn edit_pin_form(
    ctx: AppCtx,
    req: EditPinFormRequest,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let pin = owned_pin(&ctx, req.pin_id, user.id).await?;
    let mut details = ctx
        .db(move |conn| Ok(pins::with_details(conn, vec![pin])?))
        .await?;
    let details = details.pop().ok_or_else(|| AppError::not_found("pin"))?;
    json_response(&PinEditView {
        tags_input: details.tag_names().join(", "),
        pin: PinView::new(&ctx.media, &details),
    })
}

#[derive(Debug)]
pub(crate) struct EditPinRequest {
    session: Session,
    pin_id: i32,
    body: PendingJson<PinForm>,
}

#[async_trait]
impl Preroute for EditPinRequest {
    fn match_path(method: &Method, path: &str) -> bool {
        *method == Method::POST && matches_with::<i32>(EDIT_PIN, path)
    }

    async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        Ok(Self {
            session: Session::from_request(&req),
            pin_id: path_param(EDIT_PIN, req.uri().path(), 0)?,
            body: PendingJson::new(req),
        })
    }
}

pub(crate) async fn edit_pin(ctx: AppCtx, req: EditPinRequest) -> Result<Response<Body>, AppError> {
    let user = current_user(&ctx, &req.session).await?;
    let pin = owned_pin(&ctx, req.pin_id, user.id).await?;
    let submission = req.body.read().await?.clean()?;
    let stored = StoredMedia::store(&ctx.media, &submission).await?;
    // Absent uploads keep what the pin already has.
    let draft = PinDraft {
        title: submission.title,
        description: submission.description,
        image: stored.image.clone().or_else(|| pin.image.clone()),
        video: stored.video.clone().or_else(|| pin.video.clone()),
        tags: submission.tags,
    };
    let pin_id = pin.id;
    let result = ctx
        .db(move |conn| moderation::save_pin_changes(conn, pin_id, &draft))
        .await;
    // Old files that are no longer referenced by a stored pin.
    let mut orphaned = Vec::new();
    match result {
        Ok(()) => {
            if stored.image.is_some() {
                orphaned.extend(pin.image.clone());
            }
            if stored.video.is_some() {
                orphaned.extend(pin.video.clone());
            }
            ctx.media.discard_all(orphaned).await;
            info!(user_id = user.id, pin_id, "pin edited");
            Ok(redirect("/profile/"))
        }
        Err(e) => {
            stored.discard(&ctx.media).await;
            let deleted = ctx
                .db(move |conn| Ok(pins::find(conn, pin_id)?.is_none()))
                .await
                .unwrap_or(false);
            if deleted {
                orphaned.extend(pin.image.clone());
                orphaned.extend(pin.video.clone());
                ctx.media.discard_all(orphaned).await;
            }
            Err(e)
        }
    }
}
