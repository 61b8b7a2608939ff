//! Connection pooling and schema creation.

use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel::QueryResult;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    token TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users (id) ON DELETE CASCADE,
    display_name TEXT NOT NULL DEFAULT '',
    bio TEXT NOT NULL DEFAULT '',
    avatar TEXT
);

CREATE TABLE IF NOT EXISTS pins (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    image TEXT,
    video TEXT,
    created_at TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS pins_user_id ON pins (user_id);

CREATE TABLE IF NOT EXISTS pin_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    pin_id INTEGER NOT NULL REFERENCES pins (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    UNIQUE (pin_id, slug)
);

CREATE TABLE IF NOT EXISTS boards (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS boards_user_id ON boards (user_id);

CREATE TABLE IF NOT EXISTS board_pins (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    board_id INTEGER NOT NULL REFERENCES boards (id) ON DELETE CASCADE,
    pin_id INTEGER NOT NULL REFERENCES pins (id) ON DELETE CASCADE,
    UNIQUE (board_id, pin_id)
);

CREATE TABLE IF NOT EXISTS forbidden_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    tag TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS search_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    query TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS search_history_user_id ON search_history (user_id);
"#;

/// Creates every table that does not exist yet.
pub fn migrate(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute(SCHEMA)
}

#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn is_in_memory(database_url: &str) -> bool {
    database_url == ":memory:" || database_url.contains("mode=memory")
}

pub fn build_pool(database_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let builder = Pool::builder().connection_customizer(Box::new(SqlitePragmas));
    let builder = if is_in_memory(database_url) {
        // Every connection to `:memory:` is a separate database, so keep
        // exactly one alive for the lifetime of the pool.
        builder.max_size(1).idle_timeout(None).max_lifetime(None)
    } else {
        builder
            .max_size(8)
            .connection_timeout(Duration::from_secs(10))
    };
    builder.build(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::prelude::*;

    #[test]
    fn test_migrate_is_idempotent() {
        let pool = build_pool(":memory:").unwrap();
        let mut conn = pool.get().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        let count: i64 = crate::schema::users::table
            .count()
            .get_result(&mut *conn)
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let pool = build_pool(":memory:").unwrap();
        let mut conn = pool.get().unwrap();
        migrate(&mut conn).unwrap();
        let result = conn.batch_execute(
            "INSERT INTO boards (user_id, title, created_at) VALUES (42, 'x', '2024-01-01 00:00:00');",
        );
        assert!(result.is_err());
    }
}
