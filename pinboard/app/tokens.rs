use chrono::Utc;
use jwt::{DecodingKey, EncodingKey, Header, Validation};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::context::AppCtx;
use crate::web::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// The user's session token at the time of login.
    pub token: String,
    pub exp: i64,
}

impl Claims {
    pub fn new(ctx: &AppCtx, user_id: i32, token: &str) -> Self {
        Self {
            sub: user_id.to_string(),
            token: token.to_owned(),
            exp: Utc::now().timestamp() + ctx.session_ttl_secs,
        }
    }

    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

pub fn encode(ctx: &AppCtx, claims: &Claims) -> Result<String, AppError> {
    jwt::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(ctx.secret_key.as_bytes()),
    )
    .map_err(|e| AppError::internal("encode session", e))
}

/// Returns `None` for anything but a well-signed, unexpired token.
pub fn decode(ctx: &AppCtx, token: &str) -> Option<Claims> {
    jwt::decode::<Claims>(
        token,
        &DecodingKey::from_secret(ctx.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// A fresh random session token; rotating it logs out every session.
pub fn new_session_token() -> String {
    let mut buf = [0; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    base64::encode(&buf)
}
