use std::collections::BTreeMap;
use std::fmt;

use hyper::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::{Body, Response, StatusCode};
use serde::Serialize;

use crate::web::request::encode_query_component;

pub trait ServiceError: std::error::Error + Send + Sync + 'static {
    fn status(&self) -> StatusCode;
    fn class_name(&self) -> &str;
    fn has_public_message(&self) -> bool {
        false
    }
    fn fmt_public_message(&self, f: &mut fmt::Formatter) -> fmt::Result {
        drop(f);
        Ok(())
    }
}

pub trait ServiceErrorExt: ServiceError {
    fn public_message(&self) -> Option<PublicMessage<'_, Self>> {
        if self.has_public_message() {
            Some(PublicMessage(self))
        } else {
            None
        }
    }
}
impl<T: ServiceError + ?Sized> ServiceErrorExt for T {}

pub struct PublicMessage<'a, E: ServiceError + ?Sized>(&'a E);

impl<E: ServiceError + ?Sized> fmt::Display for PublicMessage<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt_public_message(f)
    }
}

#[derive(Debug)]
pub enum AppError {
    ContentTypeError(ContentTypeError),
    JsonBodyError(JsonBodyError),
    BodyError(BodyError),
    PayloadTooLarge(PayloadTooLarge),
    QueryError(QueryError),
    NotFound(NotFound),
    LoginRequired(LoginRequired),
    FormError(FormError),
    StorageError(StorageError),
    InternalError(InternalError),
}

macro_rules! dispatch {
    ($self:expr, $e:ident => $body:expr) => {
        match $self {
            AppError::ContentTypeError($e) => $body,
            AppError::JsonBodyError($e) => $body,
            AppError::BodyError($e) => $body,
            AppError::PayloadTooLarge($e) => $body,
            AppError::QueryError($e) => $body,
            AppError::NotFound($e) => $body,
            AppError::LoginRequired($e) => $body,
            AppError::FormError($e) => $body,
            AppError::StorageError($e) => $body,
            AppError::InternalError($e) => $body,
        }
    };
}

impl AppError {
    pub fn not_found(what: &'static str) -> Self {
        AppError::NotFound(NotFound { what })
    }

    pub fn internal(context: &'static str, message: impl fmt::Display) -> Self {
        AppError::InternalError(InternalError {
            context,
            message: message.to_string(),
        })
    }

    pub fn form_errors(&self) -> Option<&FormErrors> {
        match self {
            AppError::FormError(e) => Some(&e.0),
            _ => None,
        }
    }

    /// Renders the error as a JSON body, except a missing login, which
    /// redirects to the login page.
    pub fn to_response(&self) -> Response<Body> {
        if let AppError::LoginRequired(e) = self {
            let mut resp = Response::new(Body::empty());
            *resp.status_mut() = StatusCode::FOUND;
            resp.headers_mut()
                .insert(LOCATION, location_header(&e.redirect_target()));
            return resp;
        }
        let body = ErrorBody {
            error: self.class_name().to_owned(),
            message: self
                .public_message()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "error".to_string()),
            errors: self.form_errors(),
        };
        let mut resp = match serde_json::to_vec(&body) {
            Ok(json) => {
                let mut resp = Response::new(Body::from(json));
                resp.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                resp
            }
            Err(_) => Response::new(Body::from("error")),
        };
        *resp.status_mut() = self.status();
        resp
    }
}

pub(crate) fn location_header(location: &str) -> HeaderValue {
    HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"))
}

impl ServiceError for AppError {
    fn status(&self) -> StatusCode {
        dispatch!(self, e => e.status())
    }
    fn class_name(&self) -> &str {
        dispatch!(self, e => e.class_name())
    }
    fn has_public_message(&self) -> bool {
        dispatch!(self, e => e.has_public_message())
    }
    fn fmt_public_message(&self, f: &mut fmt::Formatter) -> fmt::Result {
        dispatch!(self, e => e.fmt_public_message(f))
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        dispatch!(self, e => std::error::Error::source(e))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        dispatch!(self, e => fmt::Display::fmt(e, f))
    }
}

impl From<ContentTypeError> for AppError {
    fn from(e: ContentTypeError) -> Self {
        AppError::ContentTypeError(e)
    }
}

impl From<JsonBodyError> for AppError {
    fn from(e: JsonBodyError) -> Self {
        AppError::JsonBodyError(e)
    }
}

impl From<BodyError> for AppError {
    fn from(e: BodyError) -> Self {
        AppError::BodyError(e)
    }
}

impl From<PayloadTooLarge> for AppError {
    fn from(e: PayloadTooLarge) -> Self {
        AppError::PayloadTooLarge(e)
    }
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::QueryError(e)
    }
}

impl From<FormErrors> for AppError {
    fn from(e: FormErrors) -> Self {
        AppError::FormError(FormError(e))
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::StorageError(e)
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => AppError::not_found("object"),
            e => AppError::StorageError(StorageError::Query(e)),
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        AppError::StorageError(StorageError::Pool(e))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::StorageError(StorageError::Worker(e))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::StorageError(StorageError::Io(e))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a FormErrors>,
}

#[derive(Debug)]
pub struct ContentTypeError {
    pub expected: Vec<String>,
    pub got: Option<String>,
}

impl ServiceError for ContentTypeError {
    fn status(&self) -> StatusCode {
        StatusCode::UNSUPPORTED_MEDIA_TYPE
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::ContentTypeError"
    }
    fn has_public_message(&self) -> bool {
        true
    }
    fn fmt_public_message(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for ContentTypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Self { expected, got } = self;
        write!(f, "Invalid Content-Type: expected ")?;
        if expected.is_empty() {
            write!(f, "nothing")?;
        } else if expected.len() == 1 {
            write!(f, "{:?}", expected[0])?;
        } else {
            for ct in &expected[..expected.len() - 2] {
                write!(f, "{:?}, ", ct)?;
            }
            write!(
                f,
                "{:?} or {:?}",
                expected[expected.len() - 2],
                expected[expected.len() - 1],
            )?;
        }
        if let Some(got) = got {
            write!(f, ", got {:?}", got)?;
        } else {
            write!(f, ", got nothing")?;
        }
        Ok(())
    }
}

impl std::error::Error for ContentTypeError {}

#[derive(Debug)]
pub struct JsonBodyError(pub serde_json::Error);

impl ServiceError for JsonBodyError {
    fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::JsonBodyError"
    }
    fn has_public_message(&self) -> bool {
        true
    }
    fn fmt_public_message(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for JsonBodyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error in JSON Body: {}", self.0)
    }
}

impl std::error::Error for JsonBodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

#[derive(Debug)]
pub struct BodyError(pub hyper::Error);

impl ServiceError for BodyError {
    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::BodyError"
    }
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error reading request body: {}", self.0)
    }
}

impl std::error::Error for BodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

#[derive(Debug)]
pub struct PayloadTooLarge {
    pub limit: u64,
}

impl ServiceError for PayloadTooLarge {
    fn status(&self) -> StatusCode {
        StatusCode::PAYLOAD_TOO_LARGE
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::PayloadTooLarge"
    }
    fn has_public_message(&self) -> bool {
        true
    }
    fn fmt_public_message(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for PayloadTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "request body exceeds {} bytes", self.limit)
    }
}

impl std::error::Error for PayloadTooLarge {}

#[derive(Debug)]
pub enum QueryError {
    MultipleQuery(String),
    Malformed(String),
}

impl ServiceError for QueryError {
    fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::QueryError"
    }
    fn has_public_message(&self) -> bool {
        true
    }
    fn fmt_public_message(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use QueryError::*;
        match self {
            MultipleQuery(key) => write!(f, "multiple values found for {:?}", key),
            Malformed(key) => write!(f, "malformed value for {:?}", key),
        }
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug)]
pub struct NotFound {
    pub what: &'static str,
}

impl ServiceError for NotFound {
    fn status(&self) -> StatusCode {
        StatusCode::NOT_FOUND
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::NotFound"
    }
    fn has_public_message(&self) -> bool {
        true
    }
    fn fmt_public_message(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} not found", self.what)
    }
}

impl std::error::Error for NotFound {}

/// Raised when a protected route is visited without a valid session.
#[derive(Debug)]
pub struct LoginRequired {
    /// Path (and query) of the page that was requested.
    pub next: String,
}

impl LoginRequired {
    pub fn redirect_target(&self) -> String {
        format!("/login/?next={}", encode_query_component(&self.next))
    }
}

impl ServiceError for LoginRequired {
    fn status(&self) -> StatusCode {
        StatusCode::FOUND
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::LoginRequired"
    }
}

impl fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "login required to access {}", self.next)
    }
}

impl std::error::Error for LoginRequired {}

/// Field name to messages. Non-field errors live under [`NON_FIELD_ERRORS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

pub const NON_FIELD_ERRORS: &str = "__all__";

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(Vec::new)
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(|v| &v[..]).unwrap_or(&[])
    }

    pub fn into_result<T>(self, cleaned: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(cleaned)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug)]
pub struct FormError(pub FormErrors);

impl ServiceError for FormError {
    fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::FormError"
    }
    fn has_public_message(&self) -> bool {
        true
    }
    fn fmt_public_message(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "the submitted form is invalid")
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid form:")?;
        for (field, messages) in &(self.0).0 {
            write!(f, " {}: {};", field, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for FormError {}

#[derive(Debug)]
pub enum StorageError {
    Query(diesel::result::Error),
    Pool(diesel::r2d2::PoolError),
    Worker(tokio::task::JoinError),
    Io(std::io::Error),
}

impl ServiceError for StorageError {
    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::StorageError"
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use StorageError::*;
        match self {
            Query(e) => write!(f, "database query failed: {}", e),
            Pool(e) => write!(f, "database connection unavailable: {}", e),
            Worker(e) => write!(f, "database worker failed: {}", e),
            Io(e) => write!(f, "media storage failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use StorageError::*;
        match self {
            Query(e) => Some(e),
            Pool(e) => Some(e),
            Worker(e) => Some(e),
            Io(e) => Some(e),
        }
    }
}

#[derive(Debug)]
pub struct InternalError {
    pub context: &'static str,
    pub message: String,
}

impl ServiceError for InternalError {
    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
    fn class_name(&self) -> &str {
        "pinboard::web::error::InternalError"
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

impl std::error::Error for InternalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_error_message() {
        let e = ContentTypeError {
            expected: vec![S("application/json")],
            got: None,
        };
        assert_eq!(
            e.to_string(),
            r#"Invalid Content-Type: expected "application/json", got nothing"#
        );
        let e = ContentTypeError {
            expected: vec![S("a/b"), S("c/d"), S("e/f")],
            got: Some(S("text/plain")),
        };
        assert_eq!(
            e.to_string(),
            r#"Invalid Content-Type: expected "a/b", "c/d" or "e/f", got "text/plain""#
        );
    }

    #[test]
    fn test_login_required_redirects() {
        let e = AppError::LoginRequired(LoginRequired {
            next: S("/board/3/?q=a b"),
        });
        let resp = e.to_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers()[LOCATION],
            "/login/?next=%2Fboard%2F3%2F%3Fq%3Da%20b"
        );
    }

    #[test]
    fn test_form_errors() {
        let mut errors = FormErrors::new();
        assert!(errors.is_empty());
        errors.add("title", "This field is required.");
        errors.add(NON_FIELD_ERRORS, "bad");
        errors.add("title", "again");
        assert!(errors.has("title"));
        assert_eq!(errors.get("title"), &[S("This field is required."), S("again")]);
        assert_eq!(errors.get("missing"), &[] as &[String]);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({
                "__all__": ["bad"],
                "title": ["This field is required.", "again"],
            })
        );
        assert!(errors.into_result(()).is_err());
    }

    #[test]
    fn test_not_found_response() {
        let resp = AppError::not_found("pin").to_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_storage_error_hides_details() {
        let e = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.public_message().is_none());
    }

    #[allow(non_snake_case)]
    fn S(s: &'static str) -> String {
        s.to_owned()
    }
}
