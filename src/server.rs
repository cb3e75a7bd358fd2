use actix::{Actor, Addr};
use actix_cors::Cors;
use actix_identity::{CookieIdentityPolicy, IdentityService};
use actix_web::http::header;
use actix_web::{cookie, get, middleware, web, App, HttpRequest, HttpResponse, HttpServer};

use crate::auth;
use crate::clubs;
use crate::config::Config;
use crate::db;
use crate::errors::ServiceError;
use crate::events;
use crate::finance;
use crate::friends;
use crate::inventory;
use crate::matches;
use crate::notifications::Mailer;
use crate::stats;
use crate::users;

pub type Response = Result<HttpResponse, ServiceError>;

/// sessions last for 30 days
const SESSION_MAX_AGE: i64 = 30 * 24 * 60 * 60;

#[get("/health")]
async fn health(_: HttpRequest) -> &'static str {
    "ok"
}

fn cors() -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600);

    match Config::allowed_origin() {
        Some(origin) => cors.allowed_origin(origin),
        None => cors,
    }
}

/// every route of the api, mounted under `/api`
pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(stats::route);

    auth::routes::register(cfg);
    users::routes::register(cfg);
    clubs::routes::register(cfg);
    matches::routes::register(cfg);
    events::routes::register(cfg);
    friends::routes::register(cfg);
    inventory::routes::register(cfg);
    finance::routes::register(cfg);
}

pub async fn launch(db_pool: db::Pool) -> std::io::Result<()> {
    let stats = web::Data::new(stats::Stats::new());
    let mailer: Addr<Mailer> = Mailer::from_config().start();
    let mailer = web::Data::new(mailer);

    HttpServer::new(move || {
        App::new()
            .data(db_pool.clone())
            .app_data(mailer.clone())
            .app_data(stats.clone())
            .wrap(middleware::DefaultHeaders::new().header("X-Version", env!("CARGO_PKG_VERSION")))
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::default())
            .wrap(stats::Middleware::new(stats.clone()))
            .wrap(
                IdentityService::new(
                    CookieIdentityPolicy::new(Config::session_private_key().as_bytes())
                        .name("padelhub-session")
                        .secure(Config::secure_cookies())
                        .max_age(SESSION_MAX_AGE)
                        .same_site(cookie::SameSite::Lax),
                ),
            )
            .wrap(cors())
            .wrap(actix_web_opentelemetry::RequestTracing::new())
            .wrap(sentry_actix::Sentry::new())
            // spreadsheet uploads are sent as the raw request body
            .data(web::JsonConfig::default().limit(262_144))
            .data(web::PayloadConfig::default().limit(5 * 1024 * 1024))
            .service(web::scope("/api").configure(register))
    })
    .bind(format!("{}:{}", Config::api_host(), Config::api_port()))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use diesel::r2d2::ConnectionManager;
    use diesel::PgConnection;

    #[actix_rt::test]
    async fn health_check() {
        let mut app = test::init_service(App::new().service(web::scope("/api").service(health))).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let res = test::call_service(&mut app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, web::Bytes::from_static(b"ok"));
    }

    #[actix_rt::test]
    async fn routes_need_a_session() {
        // never connects, the session is checked before a connection is needed
        let manager = ConnectionManager::<PgConnection>::new("postgres://localhost/padelhub");
        let pool = db::Pool::builder().build_unchecked(manager);

        let mut app = test::init_service(
            App::new()
                .data(pool)
                .wrap(IdentityService::new(
                    CookieIdentityPolicy::new(&[0; 32]).name("padelhub-session"),
                ))
                .service(web::scope("/api").configure(users::routes::register)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/users/me").to_request();
        let res = test::call_service(&mut app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn every_module_is_mounted() {
        let manager = ConnectionManager::<PgConnection>::new("postgres://localhost/padelhub");
        let pool = db::Pool::builder().build_unchecked(manager);

        let mut app = test::init_service(
            App::new()
                .data(pool)
                .wrap(IdentityService::new(
                    CookieIdentityPolicy::new(&[0; 32]).name("padelhub-session"),
                ))
                .service(web::scope("/api").configure(register)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let res = test::call_service(&mut app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        for uri in &[
            "/api/users/me",
            "/api/friends",
            "/api/inventory/articles",
            "/api/finance/summary",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let res = test::call_service(&mut app, req).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
