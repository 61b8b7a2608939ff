//! Rules every pin save goes through.
//!
//! Media presence is checked before anything is written. Forbidden tags are
//! checked after the pin and its tags are committed; an offending pin is then
//! deleted again and the save reports which tags were refused.

use chrono::Utc;
use diesel::sqlite::SqliteConnection;
use tracing::info;

use crate::repo::{forbidden_tags, pins};
use crate::repo::pins::PinDraft;
use crate::tags::slugify;
use crate::web::error::{AppError, FormErrors, NON_FIELD_ERRORS};

pub const MISSING_MEDIA: &str = "Upload an image or a video.";

/// Denylist entries matching any of the pin's tag slugs, sorted.
pub fn offending_tags(pin_slugs: &[String], denylist: &[String]) -> Vec<String> {
    let mut offending: Vec<String> = denylist
        .iter()
        .filter(|tag| !tag.trim().is_empty())
        .filter(|tag| {
            let slug = slugify(tag);
            pin_slugs.iter().any(|s| *s == slug)
        })
        .cloned()
        .collect();
    offending.sort();
    offending.dedup();
    offending
}

pub fn forbidden_message(offending: &[String]) -> String {
    format!(
        "Forbidden tags: {}. The pin was not saved.",
        offending.join(", ")
    )
}

pub fn check_media(draft: &PinDraft) -> Result<(), FormErrors> {
    if draft.has_media() {
        Ok(())
    } else {
        Err(FormErrors::single(NON_FIELD_ERRORS, MISSING_MEDIA))
    }
}

pub fn save_new_pin(
    conn: &mut SqliteConnection,
    user_id: i32,
    draft: &PinDraft,
) -> Result<i32, AppError> {
    check_media(draft)?;
    let id = pins::insert(conn, user_id, draft, Utc::now().naive_utc())?;
    enforce_forbidden_tags(conn, id)?;
    Ok(id)
}

pub fn save_pin_changes(
    conn: &mut SqliteConnection,
    pin_id: i32,
    draft: &PinDraft,
) -> Result<(), AppError> {
    check_media(draft)?;
    pins::replace(conn, pin_id, draft)?;
    enforce_forbidden_tags(conn, pin_id)
}

/// Deletes the stored pin if it carries a forbidden tag.
fn enforce_forbidden_tags(conn: &mut SqliteConnection, pin_id: i32) -> Result<(), AppError> {
    let denylist = forbidden_tags::tags(conn)?;
    if denylist.is_empty() {
        return Ok(());
    }
    let offending = offending_tags(&pins::tag_slugs(conn, pin_id)?, &denylist);
    if offending.is_empty() {
        return Ok(());
    }
    pins::delete(conn, pin_id)?;
    info!(pin_id, tags = ?offending, "deleted pin with forbidden tags");
    Err(FormErrors::single("tags", forbidden_message(&offending)).into())
}
