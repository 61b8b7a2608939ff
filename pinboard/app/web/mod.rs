//! A small request router on top of hyper.
//!
//! Each endpoint is a request type implementing [`Preroute`], which decides
//! whether it matches a method and path and extracts itself from the raw
//! request, paired with an async handler `Fn(Ctx, Req)`.

pub use request::Preroute;
pub use routing::{Routable, Router};
pub use service::Service;

pub mod error;
pub mod request;
pub mod response;
pub mod routing;
pub mod service;
