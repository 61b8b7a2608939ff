use std::path::PathBuf;

use derivative::Derivative;
use diesel::sqlite::SqliteConnection;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::media::MediaStore;
use crate::web::error::AppError;

#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct AppCtx {
    #[derivative(Debug = "ignore")]
    db: DbPool,
    #[derivative(Debug = "ignore")]
    pub secret_key: String,
    pub media: MediaStore,
    pub session_ttl_secs: i64,
}

impl AppCtx {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let db = db::build_pool(&config.database_url)?;
        db::migrate(&mut *db.get()?)?;
        Ok(Self {
            db,
            secret_key: config.secret_key.clone(),
            media: MediaStore::new(config.media_root.clone(), &config.media_url),
            session_ttl_secs: config.session_ttl_secs,
        })
    }

    /// A context over a fresh in-memory database.
    pub fn in_memory(media_root: impl Into<PathBuf>, secret_key: &str) -> Result<Self, AppError> {
        Self::new(&Config {
            port: 0,
            database_url: String::from(":memory:"),
            secret_key: secret_key.to_owned(),
            media_root: media_root.into(),
            media_url: String::from("/media/"),
            session_ttl_secs: 60 * 60,
        })
    }

    /// Runs blocking database work on a pooled connection.
    pub async fn db<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await?
    }
}
