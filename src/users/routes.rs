use actix_identity::Identity;
use actix_web::web;
use actix_web::web::{Data, Json, Query};
use actix_web::{get, patch};

use crate::auth;
use crate::cancellations::CancellationRecord;
use crate::db;
use crate::events::Event;
use crate::matches::Match;
use crate::server::Response;
use crate::users::{Filter, HistoryFilter, ProfileUpdate, User};
use crate::validator::Validator;

#[get("/users")]
async fn find_all(filter: Query<Filter>, pool: Data<db::Pool>, id: Identity) -> Response {
    auth::get_user(&id)?;

    let users = web::block(move || {
        let conn = pool.get()?;
        User::find_all(filter.into_inner(), &conn)
    })
    .await?;

    http_ok_json!(users);
}

#[get("/users/me")]
async fn find_me(pool: Data<db::Pool>, id: Identity) -> Response {
    let player = auth::get_player(&id)?;

    let user = web::block(move || {
        let conn = pool.get()?;
        User::find(player.id, &conn)
    })
    .await?;

    http_ok_json!(user);
}

#[patch("/users/me")]
async fn update_me(
    update: Json<Validator<ProfileUpdate>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let player = auth::get_player(&id)?;
    let update = update.into_inner().validate()?;

    let user = web::block(move || {
        let conn = pool.get()?;
        User::update_profile(player.id, update, &conn)
    })
    .await?;

    http_ok_json!(user);
}

#[get("/users/me/matches")]
async fn my_matches(filter: Query<HistoryFilter>, pool: Data<db::Pool>, id: Identity) -> Response {
    let player = auth::get_player(&id)?;
    let include_past = filter.include_past.unwrap_or(false);

    let matches = web::block(move || {
        let conn = pool.get()?;
        Match::find_by_player(player.id, include_past, &conn)
    })
    .await?;

    http_ok_json!(matches);
}

#[get("/users/me/events")]
async fn my_events(pool: Data<db::Pool>, id: Identity) -> Response {
    let player = auth::get_player(&id)?;

    let events = web::block(move || {
        let conn = pool.get()?;
        Event::find_by_player(player.id, &conn)
    })
    .await?;

    http_ok_json!(events);
}

#[get("/users/me/cancellations")]
async fn my_cancellations(pool: Data<db::Pool>, id: Identity) -> Response {
    let player = auth::get_player(&id)?;

    let records = web::block(move || {
        let conn = pool.get()?;
        CancellationRecord::find_by_user(player.id, &conn)
    })
    .await?;

    http_ok_json!(records);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(find_me);
    cfg.service(update_me);
    cfg.service(my_matches);
    cfg.service(my_events);
    cfg.service(my_cancellations);
}
