use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use hyper::body::HttpBody as _;
use hyper::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use hyper::{Body, HeaderMap, Method, Request};
use serde::de::DeserializeOwned;

use crate::web::error::{
    AppError, BodyError, ContentTypeError, JsonBodyError, PayloadTooLarge, QueryError,
};

/// Upper bound for request bodies. Uploads travel base64-encoded inside JSON.
pub const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

/// Name of the cookie carrying the session JWT.
pub const SESSION_COOKIE: &str = "sessionid";

#[async_trait]
pub trait Preroute: Sized {
    fn match_path(method: &Method, path: &str) -> bool;

    async fn from_request(req: Request<Body>) -> Result<Self, AppError>;
}

pub trait FromPath: Sized {
    fn from_path(path_component: &str) -> Result<Self, ()>;

    fn matches(path_component: &str) -> bool {
        Self::from_path(path_component).is_ok()
    }
}

impl FromPath for String {
    fn from_path(path_component: &str) -> Result<Self, ()> {
        parse_percent_encoding(path_component, false).ok_or(())
    }
}

macro_rules! from_path_int_matcher {
    ($($int:ty)*) => {
        $(
            impl FromPath for $int {
                fn from_path(path_component: &str) -> Result<Self, ()> {
                    path_component.parse::<$int>().map_err(|_| ())
                }
            }
        )*
    };
}
from_path_int_matcher!(u8 u16 u32 u64 i8 i16 i32 i64);

/// Matches `path` against a pattern such as `/board/{board_id}/delete/`,
/// returning the raw captured segments in order.
pub fn match_pattern<'a>(pattern: &str, path: &'a str) -> Option<Vec<&'a str>> {
    let mut captures = Vec::new();
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(captures),
            (Some(expected), Some(segment)) => {
                if expected.starts_with('{') && expected.ends_with('}') {
                    if segment.is_empty() {
                        return None;
                    }
                    captures.push(segment);
                } else if expected != segment {
                    return None;
                }
            }
            _ => return None,
        }
    }
}

/// Like [`match_pattern`], but also requires every capture to parse as `T`.
pub fn matches_with<T: FromPath>(pattern: &str, path: &str) -> bool {
    match_pattern(pattern, path)
        .map(|captures| captures.iter().all(|c| T::matches(c)))
        .unwrap_or(false)
}

/// Parses the `index`-th capture of `pattern` in `path`.
pub fn path_param<T: FromPath>(pattern: &str, path: &str, index: usize) -> Result<T, AppError> {
    match_pattern(pattern, path)
        .and_then(|captures| captures.get(index).copied())
        .and_then(|c| T::from_path(c).ok())
        .ok_or_else(|| AppError::not_found("page"))
}

pub trait FromQuery: Sized {
    fn from_query(values: &[String]) -> Result<Self, ()>;
}

impl<T> FromQuery for Option<T>
where
    T: FromQuery,
{
    fn from_query(values: &[String]) -> Result<Self, ()> {
        if values.is_empty() {
            Ok(None)
        } else {
            Ok(Some(T::from_query(values)?))
        }
    }
}

impl FromQuery for String {
    fn from_query(values: &[String]) -> Result<Self, ()> {
        if values.len() != 1 {
            return Err(());
        }
        Ok(values[0].clone())
    }
}

/// Extracts a single query parameter from an already parsed query.
pub fn query_param<T: FromQuery>(
    query: &HashMap<String, Vec<String>>,
    key: &str,
) -> Result<T, QueryError> {
    let values = query.get(key).map(|v| &v[..]).unwrap_or(&[]);
    T::from_query(values).map_err(|()| {
        if values.len() > 1 {
            QueryError::MultipleQuery(key.to_owned())
        } else {
            QueryError::Malformed(key.to_owned())
        }
    })
}

/// Pairs that are not `key=value` or are not valid UTF-8 are skipped.
pub fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let mut hash: HashMap<String, Vec<String>> = HashMap::new();
    for pair in query.split('&') {
        let (key, value) = if let Some(pair) = parse_query_pair(pair) {
            pair
        } else {
            continue;
        };
        match hash.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().push(value);
            }
            Entry::Vacant(entry) => {
                entry.insert(vec![value]);
            }
        }
    }
    hash
}

fn parse_query_pair(pair: &str) -> Option<(String, String)> {
    let mut kv_iter = pair.split('=');
    let key = kv_iter.next()?;
    let value = kv_iter.next()?;
    if kv_iter.next().is_some() {
        return None;
    }
    let key = parse_percent_encoding(key, true)?;
    let value = parse_percent_encoding(value, true)?;
    Some((key, value))
}

fn parse_percent_encoding(input: &str, plus_as_space: bool) -> Option<String> {
    let input = input.as_bytes();
    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' {
            if i + 3 > input.len() {
                return None;
            }
            let d0 = (input[i + 1] as char).to_digit(16)?;
            let d1 = (input[i + 2] as char).to_digit(16)?;
            output.push((d0 * 16 + d1) as u8);
            i += 3;
        } else if plus_as_space && input[i] == b'+' {
            output.push(b' ');
            i += 1;
        } else {
            output.push(input[i]);
            i += 1;
        }
    }
    String::from_utf8(output).ok()
}

pub fn encode_query_component(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                output.push(b as char)
            }
            _ => output.push_str(&format!("%{:02X}", b)),
        }
    }
    output
}

/// Session credentials carried by a request, not yet verified.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<String>,
    /// Path and query of the request, used to come back after logging in.
    pub origin: String,
}

impl Session {
    pub fn from_request(req: &Request<Body>) -> Self {
        let origin = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| req.uri().path().to_owned());
        Self {
            token: session_token(req.headers()),
            origin,
        }
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Token "))
        .map(|v| v.trim().to_owned());
    if from_header.is_some() {
        return from_header;
    }
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let mut kv = pair.trim().splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some(SESSION_COOKIE), Some(value)) if !value.is_empty() => {
                    Some(value.to_owned())
                }
                _ => None,
            }
        })
        .next()
}

#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T: DeserializeOwned> JsonBody<T> {
    pub async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_owned());
        let is_json = content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false);
        if !is_json {
            return Err(ContentTypeError {
                expected: vec![String::from("application/json")],
                got: content_type,
            }
            .into());
        }
        let declared_len = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if declared_len.map_or(false, |len| len > MAX_BODY_BYTES) {
            return Err(PayloadTooLarge {
                limit: MAX_BODY_BYTES,
            }
            .into());
        }
        let bytes = read_limited(req.into_body(), MAX_BODY_BYTES).await?;
        let value = serde_json::from_slice(&bytes).map_err(JsonBodyError)?;
        Ok(JsonBody(value))
    }
}

/// Collects `body`, giving up as soon as it grows past `limit` bytes.
pub async fn read_limited(mut body: Body, limit: u64) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(BodyError)?;
        if (bytes.len() + chunk.len()) as u64 > limit {
            return Err(PayloadTooLarge { limit }.into());
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// A JSON body that is only read once the handler asks for it, so that the
/// caller can be authenticated first.
pub struct PendingJson<T> {
    req: Request<Body>,
    _form: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> PendingJson<T> {
    pub fn new(req: Request<Body>) -> Self {
        Self {
            req,
            _form: PhantomData,
        }
    }

    pub async fn read(self) -> Result<T, AppError> {
        Ok(JsonBody::from_request(self.req).await?.0)
    }
}

impl<T> fmt::Debug for PendingJson<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingJson")
            .field("headers", self.req.headers())
            .finish()
    }
}
