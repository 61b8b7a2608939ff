//! Session handling on top of [`tokens`](crate::tokens).

use crate::context::AppCtx;
use crate::models::User;
use crate::repo::users;
use crate::tokens::{self, Claims};
use crate::web::error::{AppError, LoginRequired};
use crate::web::request::{Session, SESSION_COOKIE};

/// The user behind the session, or a redirect to the login page.
pub async fn current_user(ctx: &AppCtx, session: &Session) -> Result<User, AppError> {
    let login_required = || {
        AppError::LoginRequired(LoginRequired {
            next: session.origin.clone(),
        })
    };
    let claims = session
        .token
        .as_deref()
        .and_then(|token| tokens::decode(ctx, token))
        .ok_or_else(login_required)?;
    let user_id = claims.user_id().ok_or_else(login_required)?;
    let user = ctx.db(move |conn| Ok(users::find(conn, user_id)?)).await?;
    match user {
        Some(user) if user.token == claims.token => Ok(user),
        _ => Err(login_required()),
    }
}

/// `Set-Cookie` value logging `user` in.
pub fn login_cookie(ctx: &AppCtx, user: &User) -> Result<String, AppError> {
    let jwt = tokens::encode(ctx, &Claims::new(ctx, user.id, &user.token))?;
    Ok(format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, jwt, ctx.session_ttl_secs
    ))
}

pub fn logout_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    )
}

/// Invalidates every session of the user.
pub async fn logout(ctx: &AppCtx, user: &User) -> Result<(), AppError> {
    let user_id = user.id;
    let token = tokens::new_session_token();
    ctx.db(move |conn| Ok(users::set_token(conn, user_id, &token)?))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: Option<String>) -> Session {
        Session {
            token,
            origin: String::from("/board/1/"),
        }
    }

    #[tokio::test]
    async fn test_session_roundtrip_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppCtx::in_memory(dir.path(), "secret").unwrap();
        let user = ctx
            .db(|conn| Ok(users::create(conn, "anna", "a@example.com", "x", "t0")?))
            .await
            .unwrap();

        let cookie = login_cookie(&ctx, &user).unwrap();
        assert!(cookie.ends_with("Max-Age=3600"));
        let jwt = cookie
            .trim_start_matches("sessionid=")
            .split(';')
            .next()
            .unwrap()
            .to_owned();
        let found = current_user(&ctx, &session(Some(jwt.clone()))).await.unwrap();
        assert_eq!(found.id, user.id);

        logout(&ctx, &user).await.unwrap();
        match current_user(&ctx, &session(Some(jwt))).await {
            Err(AppError::LoginRequired(e)) => assert_eq!(e.next, "/board/1/"),
            other => panic!("unexpected {:?}", other.map(|u| u.id)),
        }
    }

    #[tokio::test]
    async fn test_rejects_foreign_signature() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppCtx::in_memory(dir.path(), "secret").unwrap();
        let other = AppCtx::in_memory(dir.path(), "other").unwrap();
        let user = ctx
            .db(|conn| Ok(users::create(conn, "anna", "a@example.com", "x", "t0")?))
            .await
            .unwrap();
        let forged = tokens::encode(&other, &Claims::new(&other, user.id, "t0")).unwrap();
        assert!(current_user(&ctx, &session(Some(forged))).await.is_err());
        assert!(current_user(&ctx, &session(None)).await.is_err());
    }
}
