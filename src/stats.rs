use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use actix_service::{Service, Transform};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::web::Data;
use actix_web::Error;
use actix_web::{get, web};
use futures::future::{ok, Ready};
use futures::Future;

use crate::db;
use crate::matches::Match;
use crate::server::Response;

#[derive(Debug, Default)]
pub struct Stats {
    pub requests: AtomicU32,
    pub errors: AtomicU32,
}

impl Stats {
    pub fn new() -> Stats {
        Stats {
            requests: AtomicU32::new(0u32),
            errors: AtomicU32::new(0u32),
        }
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub requests: u32,
    pub errors: u32,
    pub upcoming_matches: i64,
    pub active_db_connections: u32,
    pub idle_db_connections: u32,
}

#[get("/stats")]
pub async fn route(stats: Data<Stats>, pool: Data<db::Pool>) -> Response {
    let state = pool.state();

    let upcoming_matches = web::block(move || {
        let conn = pool.get()?;
        Match::upcoming_count(&conn)
    })
    .await?;

    http_ok_json!(StatsResponse {
        requests: stats.requests.load(Ordering::Relaxed),
        errors: stats.errors.load(Ordering::Relaxed),
        upcoming_matches,
        active_db_connections: state.connections - state.idle_connections,
        idle_db_connections: state.idle_connections,
    });
}

/// Counts every request, and every request that ended in a server error
pub struct Middleware {
    stats: Data<Stats>,
}

impl Middleware {
    pub fn new(stats: Data<Stats>) -> Middleware {
        Middleware { stats }
    }
}

impl<S, B> Transform<S> for Middleware
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestCountMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestCountMiddleware {
            service,
            stats: self.stats.clone(),
        })
    }
}

pub struct RequestCountMiddleware<S> {
    service: S,
    stats: Data<Stats>,
}

impl<S, B> Service for RequestCountMiddleware<S>
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: ServiceRequest) -> Self::Future {
        let stats = self.stats.clone();

        stats.requests.fetch_add(1, Ordering::Relaxed);

        let fut = self.service.call(request);

        Box::pin(async move {
            let res = fut.await?;

            if res.response().status().is_server_error() {
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }

            Ok(res)
        })
    }
}
