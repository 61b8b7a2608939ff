use futures::prelude::*;

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use hyper::service::Service as HyperService;
use hyper::{Body, Request, Response};
use tracing::{error, info, warn};

use crate::web::error::{AppError, ServiceError};
use crate::web::request::Preroute;
use crate::web::routing::{Routable, Router};

#[derive(Debug)]
pub struct Service<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    inner: Arc<ServiceInner<Ctx>>,
    ctx: Ctx,
}

impl<Ctx> Service<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    pub fn builder() -> Builder<Ctx> {
        Builder::new()
    }

    pub fn ctx(&self) -> &Ctx {
        &self.ctx
    }

    /// Runs a request through the router. Errors are rendered, never returned.
    pub async fn respond(&self, req: Request<Body>) -> Response<Body> {
        self.inner.respond(&self.ctx, req).await
    }
}

impl<Ctx> Clone for Service<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<Ctx> HyperService<Request<Body>> for Service<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response<Body>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let this = self.clone();
        async move { Ok(this.respond(req).await) }.boxed()
    }
}

#[derive(Debug)]
pub struct Builder<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    inner: Option<ServiceInner<Ctx>>,
}

impl<Ctx> Builder<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Some(ServiceInner {
                router: Router::new(),
            }),
        }
    }

    pub fn finish(&mut self, ctx: &Ctx) -> Service<Ctx> {
        let inner = self.inner.take().expect("Builder::finish called twice");
        Service {
            inner: Arc::new(inner),
            ctx: ctx.clone(),
        }
    }

    fn inner_mut(&mut self) -> &mut ServiceInner<Ctx> {
        self.inner
            .as_mut()
            .expect("this builder is already finished")
    }

    pub fn add_function_route<F, Fut, Req>(&mut self, route: F) -> &mut Self
    where
        F: Fn(Ctx, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<Body>, AppError>> + Send + 'static,
        Req: Preroute + Send + 'static,
    {
        self.inner_mut().router.add_function_route(route);
        self
    }
}

impl<Ctx> Default for Builder<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct ServiceInner<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    router: Router<Ctx>,
}

impl<Ctx> ServiceInner<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    async fn respond(&self, ctx: &Ctx, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let resp = match self.router.respond(ctx, req).await {
            Ok(resp) => resp,
            Err(e) => {
                if e.status().is_server_error() {
                    error!(%method, %path, error = %e, "request failed");
                } else if e.status().is_client_error() {
                    warn!(%method, %path, error = %e, "request rejected");
                }
                e.to_response()
            }
        };
        info!(%method, %path, status = resp.status().as_u16(), "handled request");
        resp
    }
}
