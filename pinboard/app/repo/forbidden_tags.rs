use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{ForbiddenTag, NewForbiddenTag};
use crate::schema::forbidden_tags;

pub fn list(conn: &mut SqliteConnection) -> QueryResult<Vec<ForbiddenTag>> {
    forbidden_tags::table
        .order(forbidden_tags::tag.asc())
        .load(conn)
}

/// The denylist without blank entries.
pub fn tags(conn: &mut SqliteConnection) -> QueryResult<Vec<String>> {
    Ok(forbidden_tags::table
        .order(forbidden_tags::tag.asc())
        .select(forbidden_tags::tag)
        .load::<String>(conn)?
        .into_iter()
        .filter(|tag| !tag.trim().is_empty())
        .collect())
}

/// Returns `false` when the tag was already listed.
pub fn add(conn: &mut SqliteConnection, tag: &str) -> QueryResult<bool> {
    let inserted = diesel::insert_or_ignore_into(forbidden_tags::table)
        .values(&NewForbiddenTag { tag })
        .execute(conn)?;
    Ok(inserted > 0)
}

pub fn remove(conn: &mut SqliteConnection, tag: &str) -> QueryResult<bool> {
    let removed =
        diesel::delete(forbidden_tags::table.filter(forbidden_tags::tag.eq(tag))).execute(conn)?;
    Ok(removed > 0)
}
