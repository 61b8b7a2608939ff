use futures::prelude::*;

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use hyper::{Body, Method, Request, Response};

use crate::web::error::AppError;
use crate::web::request::Preroute;

pub struct Router<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    routes: Vec<Box<dyn Routable<Ctx = Ctx> + Send + Sync + 'static>>,
    _marker: PhantomData<fn(Ctx)>,
}

impl<Ctx> Router<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn add_route<R>(&mut self, route: R)
    where
        R: Routable<Ctx = Ctx> + Send + Sync + 'static,
    {
        self.routes.push(Box::new(route));
    }

    pub fn add_function_route<F, Fut, Req>(&mut self, route: F)
    where
        F: Fn(Ctx, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<Body>, AppError>> + Send + 'static,
        Req: Preroute + Send + 'static,
    {
        self.add_route(FunctionRoute::new(route))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<Ctx> Default for Router<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> fmt::Debug for Router<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .finish()
    }
}

#[async_trait]
impl<Ctx> Routable for Router<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    type Ctx = Ctx;

    fn match_path(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|route| route.match_path(method, path))
    }

    // Routes are tried in registration order; the first match wins, so
    // literal paths must be added before patterns that would capture them.
    async fn respond(
        &self,
        ctx: &Self::Ctx,
        req: Request<Body>,
    ) -> Result<Response<Body>, AppError> {
        let route = {
            let method = req.method();
            let path = req.uri().path();
            self.routes
                .iter()
                .find(|route| route.match_path(method, path))
        };
        match route {
            Some(route) => route.respond(ctx, req).await,
            None => Err(AppError::not_found("page")),
        }
    }
}

#[async_trait]
pub trait Routable {
    type Ctx: Clone + Send + Sync + 'static;

    fn match_path(&self, method: &Method, path: &str) -> bool;

    async fn respond(
        &self,
        ctx: &Self::Ctx,
        req: Request<Body>,
    ) -> Result<Response<Body>, AppError>;
}

pub struct FunctionRoute<Ctx, F, Req> {
    f: F,
    _marker: PhantomData<fn(Ctx, Req)>,
}

impl<Ctx, F, Fut, Req> FunctionRoute<Ctx, F, Req>
where
    Ctx: Clone + Send + Sync + 'static,
    F: Fn(Ctx, Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Body>, AppError>> + Send + 'static,
    Req: Preroute + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<Ctx, F, Fut, Req> Routable for FunctionRoute<Ctx, F, Req>
where
    Ctx: Clone + Send + Sync + 'static,
    F: Fn(Ctx, Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Body>, AppError>> + Send + 'static,
    Req: Preroute + Send,
{
    type Ctx = Ctx;

    fn match_path(&self, method: &Method, path: &str) -> bool {
        Req::match_path(method, path)
    }

    async fn respond(
        &self,
        ctx: &Self::Ctx,
        req: Request<Body>,
    ) -> Result<Response<Body>, AppError> {
        let req = Req::from_request(req).await?;
        (self.f)(ctx.clone(), req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::request::{match_pattern, path_param};

    #[derive(Debug, Clone)]
    struct Ctx;

    #[derive(Debug)]
    struct LiteralRequest;

    #[async_trait]
    impl Preroute for LiteralRequest {
        fn match_path(method: &Method, path: &str) -> bool {
            *method == Method::GET && path == "/profile/upload_avatar/"
        }
        async fn from_request(_req: Request<Body>) -> Result<Self, AppError> {
            Ok(LiteralRequest)
        }
    }

    #[derive(Debug)]
    struct CaptureRequest {
        name: String,
    }

    #[async_trait]
    impl Preroute for CaptureRequest {
        fn match_path(method: &Method, path: &str) -> bool {
            *method == Method::GET && match_pattern("/profile/{username}/", path).is_some()
        }
        async fn from_request(req: Request<Body>) -> Result<Self, AppError> {
            Ok(CaptureRequest {
                name: path_param("/profile/{username}/", req.uri().path(), 0)?,
            })
        }
    }

    async fn literal(_ctx: Ctx, _req: LiteralRequest) -> Result<Response<Body>, AppError> {
        Ok(Response::new(Body::from("literal")))
    }

    async fn capture(_ctx: Ctx, req: CaptureRequest) -> Result<Response<Body>, AppError> {
        Ok(Response::new(Body::from(req.name)))
    }

    async fn body_of(resp: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_first_registered_route_wins() {
        let mut router = Router::new();
        router.add_function_route(literal);
        router.add_function_route(capture);
        assert_eq!(router.len(), 2);

        let resp = router.respond(&Ctx, get("/profile/upload_avatar/")).await.unwrap();
        assert_eq!(body_of(resp).await, "literal");
        let resp = router.respond(&Ctx, get("/profile/anna/")).await.unwrap();
        assert_eq!(body_of(resp).await, "anna");
    }

    #[tokio::test]
    async fn test_unmatched_route_is_not_found() {
        let mut router = Router::new();
        router.add_function_route(capture);
        assert!(!router.match_path(&Method::POST, "/profile/anna/"));
        match router.respond(&Ctx, get("/nowhere/")).await {
            Err(AppError::NotFound(_)) => {}
            other => panic!("unexpected {:?}", other.map(|r| r.status())),
        }
    }
}
