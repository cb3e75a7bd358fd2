//! padelhub: padel matches, events and club management behind a JSON api.
#![warn(missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
extern crate diesel;

#[macro_use]
extern crate diesel_migrations;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;

use anyhow::{anyhow, Context};
use dotenv::dotenv;

use crate::config::Config;

#[macro_use]
mod macros;

mod auth;
mod cancellations;
mod clubs;
mod config;
mod db;
mod errors;
mod events;
mod finance;
mod friends;
mod inventory;
mod matches;
mod notifications;
mod schema;
mod server;
mod spreadsheet;
mod stats;
mod sweeper;
mod users;
mod validator;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    Config::init();

    let (tracer, _uninstall) = opentelemetry_jaeger::new_pipeline()
        .with_service_name("padelhub")
        .with_agent_endpoint(Config::opentelemetry_endpoint())
        .install()
        .context("unable to connect to opentelemetry agent")?;

    let opentelemetry = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(opentelemetry)
        .try_init()
        .context("unable to initialize the tracing subscriber")?;

    let _sentry = Config::sentry_dsn().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    db::migrate(Config::database_url()).map_err(|e| anyhow!("unable to run migrations: {}", e))?;

    let pool = db::build_connection_pool(Config::database_url())
        .map_err(|e| anyhow!("unable to build the database pool: {}", e))?;

    sweeper::Sweeper::new(pool.clone()).start();

    debug!("launching the actix webserver");
    server::launch(pool).await?;

    Ok(())
}
