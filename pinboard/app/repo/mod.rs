//! Diesel queries, grouped by table.
//!
//! Everything here is synchronous and takes a borrowed connection; handlers
//! reach it through [`AppCtx::db`](crate::context::AppCtx::db).

pub mod boards;
pub mod forbidden_tags;
pub mod pins;
pub mod profiles;
pub mod search_history;
pub mod users;

/// Case-insensitive substring test used by every search.
///
/// Searches load their candidates and filter with this in Rust: SQLite's
/// `LIKE` only folds ASCII case.
pub fn icontains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Whether an insert failed on a UNIQUE constraint.
pub fn is_unique_violation(e: &diesel::result::Error) -> bool {
    matches!(
        e,
        diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _)
    )
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use diesel::sqlite::SqliteConnection;
    use diesel::Connection;

    use crate::models::User;
    use crate::repo::{pins, users};
    use crate::tags::parse_tags;

    pub fn conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        diesel::connection::SimpleConnection::batch_execute(&mut conn, "PRAGMA foreign_keys = ON;")
            .unwrap();
        crate::db::migrate(&mut conn).unwrap();
        conn
    }

    pub fn user(conn: &mut SqliteConnection, username: &str) -> User {
        users::create(conn, username, &format!("{}@example.com", username), "x", "token").unwrap()
    }

    pub fn pin(conn: &mut SqliteConnection, owner: &User, title: &str, tags: &str) -> i32 {
        let draft = pins::PinDraft {
            title: title.to_owned(),
            description: String::new(),
            image: Some(format!("pins/images/{}.png", title)),
            video: None,
            tags: parse_tags(tags),
        };
        pins::insert(conn, owner.id, &draft, Utc::now().naive_utc()).unwrap()
    }
}
