use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{NewPin, NewPinTag, Pin, PinChanges, PinDetails, PinTag};
use crate::schema::{pin_tags, pins, users};
use crate::tags::slugify;

/// Column values of a pin about to be written, media already stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDraft {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub tags: Vec<String>,
}

impl PinDraft {
    pub fn has_media(&self) -> bool {
        self.image.is_some() || self.video.is_some()
    }
}

/// Writes the pin and its tags in one transaction and returns its id.
pub fn insert(
    conn: &mut SqliteConnection,
    user_id: i32,
    draft: &PinDraft,
    created_at: NaiveDateTime,
) -> QueryResult<i32> {
    conn.transaction(|conn| {
        let id = diesel::insert_into(pins::table)
            .values(&NewPin {
                user_id,
                title: &draft.title,
                description: &draft.description,
                image: draft.image.as_deref(),
                video: draft.video.as_deref(),
                created_at,
            })
            .returning(pins::id)
            .get_result::<i32>(conn)?;
        write_tags(conn, id, &draft.tags)?;
        Ok(id)
    })
}

/// Replaces every editable column and the tag set of an existing pin.
pub fn replace(conn: &mut SqliteConnection, id: i32, draft: &PinDraft) -> QueryResult<()> {
    conn.transaction(|conn| {
        diesel::update(pins::table.find(id))
            .set(&PinChanges {
                title: &draft.title,
                description: &draft.description,
                image: draft.image.as_deref(),
                video: draft.video.as_deref(),
            })
            .execute(conn)?;
        diesel::delete(pin_tags::table.filter(pin_tags::pin_id.eq(id))).execute(conn)?;
        write_tags(conn, id, &draft.tags)
    })
}

fn write_tags(conn: &mut SqliteConnection, pin_id: i32, tags: &[String]) -> QueryResult<()> {
    let slugs: Vec<String> = tags.iter().map(|t| slugify(t)).collect();
    let rows: Vec<NewPinTag<'_>> = tags
        .iter()
        .zip(&slugs)
        .map(|(name, slug)| NewPinTag {
            pin_id,
            name,
            slug,
        })
        .collect();
    if !rows.is_empty() {
        diesel::insert_or_ignore_into(pin_tags::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Pin>> {
    pins::table.find(id).first(conn).optional()
}

pub fn find_owned(conn: &mut SqliteConnection, id: i32, user_id: i32) -> QueryResult<Option<Pin>> {
    pins::table
        .find(id)
        .filter(pins::user_id.eq(user_id))
        .first(conn)
        .optional()
}

pub fn existing_ids(conn: &mut SqliteConnection, ids: &[i32]) -> QueryResult<Vec<i32>> {
    pins::table
        .filter(pins::id.eq_any(ids))
        .select(pins::id)
        .load(conn)
}

/// Deletes the pin; tags and board memberships go with it.
pub fn delete(conn: &mut SqliteConnection, id: i32) -> QueryResult<bool> {
    Ok(diesel::delete(pins::table.find(id)).execute(conn)? > 0)
}

pub fn tag_slugs(conn: &mut SqliteConnection, pin_id: i32) -> QueryResult<Vec<String>> {
    pin_tags::table
        .filter(pin_tags::pin_id.eq(pin_id))
        .order(pin_tags::slug.asc())
        .select(pin_tags::slug)
        .load(conn)
}

pub fn list_by_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Vec<Pin>> {
    pins::table
        .filter(pins::user_id.eq(user_id))
        .order((pins::created_at.desc(), pins::id.desc()))
        .load(conn)
}

/// Every pin not owned by `user_id`, newest first.
pub fn list_excluding_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Vec<Pin>> {
    pins::table
        .filter(pins::user_id.ne(user_id))
        .order((pins::created_at.desc(), pins::id.desc()))
        .load(conn)
}

/// Attaches author names and tags, keeping the order of `pins`.
pub fn with_details(conn: &mut SqliteConnection, pins: Vec<Pin>) -> QueryResult<Vec<PinDetails>> {
    let pin_ids: Vec<i32> = pins.iter().map(|p| p.id).collect();
    let user_ids: Vec<i32> = pins.iter().map(|p| p.user_id).collect();
    let authors: HashMap<i32, String> = users::table
        .filter(users::id.eq_any(&user_ids))
        .select((users::id, users::username))
        .load::<(i32, String)>(conn)?
        .into_iter()
        .collect();
    let mut tags: HashMap<i32, Vec<PinTag>> = HashMap::new();
    for tag in pin_tags::table
        .filter(pin_tags::pin_id.eq_any(&pin_ids))
        .order(pin_tags::name.asc())
        .load::<PinTag>(conn)?
    {
        tags.entry(tag.pin_id).or_insert_with(Vec::new).push(tag);
    }
    Ok(pins
        .into_iter()
        .map(|pin| PinDetails {
            author: authors.get(&pin.user_id).cloned().unwrap_or_default(),
            tags: tags.remove(&pin.id).unwrap_or_default(),
            pin,
        })
        .collect())
}
