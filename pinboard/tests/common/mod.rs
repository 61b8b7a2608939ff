#![allow(dead_code)]

use hyper::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE, LOCATION, SET_COOKIE};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use pinboard::config::Config;
use pinboard::context::AppCtx;
use pinboard::routes::build_route;
use pinboard::web::Service;

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

pub struct TestApp {
    pub service: Service<AppCtx>,
    pub media: TempDir,
}

/// A response with its body already read.
pub struct Reply {
    pub status: StatusCode,
    pub location: Option<String>,
    pub cookie: Option<String>,
    pub json: Value,
}

impl Reply {
    async fn read(resp: Response<Body>) -> Self {
        let status = resp.status();
        let header = |name: HeaderName| {
            resp.headers()
                .get(name)
                .map(|v| v.to_str().unwrap().to_owned())
        };
        let location = header(LOCATION);
        let cookie = header(SET_COOKIE);
        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            location,
            cookie,
            json,
        }
    }

    /// The session JWT set by this response.
    pub fn session(&self) -> String {
        let cookie = self.cookie.as_deref().expect("no Set-Cookie header");
        cookie
            .trim_start_matches("sessionid=")
            .split(';')
            .next()
            .unwrap()
            .to_owned()
    }

    pub fn errors(&self, field: &str) -> Vec<String> {
        match self.json["errors"][field].as_array() {
            Some(messages) => messages
                .iter()
                .map(|m| m.as_str().unwrap().to_owned())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let ctx = AppCtx::in_memory(media.path(), "test-secret").unwrap();
        TestApp {
            service: build_route(&ctx),
            media,
        }
    }

    /// Like [`TestApp::new`], but over a database file, so that requests can
    /// use separate connections concurrently.
    pub fn with_database_file() -> Self {
        let media = tempfile::tempdir().unwrap();
        let ctx = AppCtx::new(&Config {
            port: 0,
            database_url: media.path().join("db.sqlite3").to_str().unwrap().to_owned(),
            secret_key: String::from("test-secret"),
            media_root: media.path().join("media"),
            media_url: String::from("/media/"),
            session_ttl_secs: 60 * 60,
        })
        .unwrap();
        TestApp {
            service: build_route(&ctx),
            media,
        }
    }

    pub fn ctx(&self) -> &AppCtx {
        self.service.ctx()
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(session) = session {
            builder = builder.header(AUTHORIZATION, format!("Token {}", session));
        }
        let req = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        Reply::read(self.service.respond(req).await).await
    }

    /// Sends `body` as is, without a Content-Length.
    pub async fn send_raw(
        &self,
        path: &str,
        session: Option<&str>,
        content_type: &str,
        body: Body,
    ) -> Reply {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, content_type);
        if let Some(session) = session {
            builder = builder.header(AUTHORIZATION, format!("Token {}", session));
        }
        Reply::read(self.service.respond(builder.body(body).unwrap()).await).await
    }

    pub async fn get(&self, path: &str, session: &str) -> Reply {
        self.send(Method::GET, path, Some(session), None).await
    }

    pub async fn post(&self, path: &str, session: &str, body: Value) -> Reply {
        self.send(Method::POST, path, Some(session), Some(body)).await
    }

    pub async fn post_empty(&self, path: &str, session: &str) -> Reply {
        self.send(Method::POST, path, Some(session), None).await
    }

    /// Registers `username` with password `pw` and returns the session.
    pub async fn register(&self, username: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/register/",
                None,
                Some(json!({
                    "username": username,
                    "display_name": username.to_uppercase(),
                    "email": format!("{}@example.com", username),
                    "password1": "pw",
                    "password2": "pw",
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER, "{}", reply.json);
        reply.session()
    }

    pub async fn upload_pin(&self, session: &str, title: &str, tags: &str) -> Reply {
        self.post(
            "/upload_pin/",
            session,
            json!({
                "title": title,
                "description": "",
                "image": image(&format!("{}.png", title)),
                "tags": tags,
            }),
        )
        .await
    }

    /// Uploads a pin that must succeed and returns its id.
    pub async fn pin(&self, session: &str, title: &str, tags: &str) -> i64 {
        let reply = self.upload_pin(session, title, tags).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER, "{}", reply.json);
        let profile = self.get("/profile/", session).await;
        profile.json["pins"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["title"] == title)
            .and_then(|p| p["id"].as_i64())
            .unwrap()
    }

    /// Creates a board that must succeed and returns its id.
    pub async fn board(&self, session: &str, title: &str, pins: &[i64]) -> i64 {
        let reply = self
            .post("/upload_board/", session, json!({ "title": title, "pins": pins }))
            .await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER, "{}", reply.json);
        let profile = self.get("/profile/", session).await;
        profile.json["boards"]
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["title"] == title)
            .and_then(|b| b["id"].as_i64())
            .unwrap()
    }

    pub fn media_files(&self, dir: &str) -> usize {
        match std::fs::read_dir(self.media.path().join(dir)) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

pub fn image(filename: &str) -> Value {
    json!({ "filename": filename, "content": base64::encode(PNG) })
}

pub fn titles(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_owned())
        .collect()
}
