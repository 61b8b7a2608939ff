use hyper::header::{HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use hyper::{Body, Response, StatusCode};
use serde::Serialize;

use crate::web::error::{location_header, AppError};

pub fn json_response<T: Serialize>(body: &T) -> Result<Response<Body>, AppError> {
    let json = serde_json::to_vec(body).map_err(|e| AppError::internal("serialize response", e))?;
    let mut resp = Response::new(Body::from(json));
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(resp)
}

/// `303 See Other`, the answer to every successful form submission.
pub fn redirect(location: &str) -> Response<Body> {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = StatusCode::SEE_OTHER;
    resp.headers_mut().insert(LOCATION, location_header(location));
    resp
}

pub fn with_cookie(mut resp: Response<Body>, cookie: &str) -> Result<Response<Body>, AppError> {
    let value =
        HeaderValue::from_str(cookie).map_err(|e| AppError::internal("build cookie", e))?;
    resp.headers_mut().append(SET_COOKIE, value);
    Ok(resp)
}
