use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::NewSearchEntry;
use crate::schema::search_history;

/// How many past searches feed the recommendations.
pub const RECENT_LIMIT: i64 = 20;

pub fn record(conn: &mut SqliteConnection, user_id: i32, query: &str) -> QueryResult<()> {
    diesel::insert_into(search_history::table)
        .values(&NewSearchEntry {
            user_id,
            query,
            created_at: Utc::now().naive_utc(),
        })
        .execute(conn)?;
    Ok(())
}

/// The user's latest queries, newest first.
pub fn recent(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Vec<String>> {
    search_history::table
        .filter(search_history::user_id.eq(user_id))
        .order((search_history::created_at.desc(), search_history::id.desc()))
        .limit(RECENT_LIMIT)
        .select(search_history::query)
        .load(conn)
}
