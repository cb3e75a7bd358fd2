use actix_identity::Identity;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Data, HttpResponse, Json, Path, Query};
use actix_web::{delete, get, patch, post};

use crate::auth::{self, Role};
use crate::db;
use crate::events::{CancelRegistration, Canceller, CreateEvent, Event, EventFilter, JoinEvent, UpdateEvent};
use crate::server::Response;
use crate::validator::Validator;

#[get("/events")]
async fn find_all(filter: Query<EventFilter>, pool: Data<db::Pool>) -> Response {
    let events = web::block(move || {
        let conn = pool.get()?;
        Event::find_all(filter.into_inner(), &conn)
    })
    .await?;

    http_ok_json!(events);
}

#[get("/events/{id}")]
async fn find(event_id: Path<i64>, pool: Data<db::Pool>) -> Response {
    let event = web::block(move || {
        let conn = pool.get()?;
        Event::find(*event_id, &conn)
    })
    .await?;

    http_ok_json!(event);
}

#[post("/events")]
async fn create(
    new_event: Json<Validator<CreateEvent>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;
    let new_event = new_event.into_inner().validate()?;

    let event = web::block(move || {
        let conn = pool.get()?;
        Event::create(&new_event, club.id, &conn)
    })
    .await?;

    http_created_json!(event);
}

#[patch("/events/{id}")]
async fn update(
    event_id: Path<i64>,
    update: Json<UpdateEvent>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;

    let event = web::block(move || {
        let conn = pool.get()?;
        Event::update(*event_id, club.id, &update.into_inner(), &conn)
    })
    .await?;

    http_ok_json!(event);
}

#[delete("/events/{id}")]
async fn delete(event_id: Path<i64>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    web::block(move || {
        let conn = pool.get()?;
        Event::delete(*event_id, club.id, &conn)
    })
    .await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

#[post("/events/{id}/join")]
async fn join(
    event_id: Path<i64>,
    join: Option<Json<JoinEvent>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let player = auth::get_player(&id)?;
    // open court registrations don't need a body
    let join = join.map(Json::into_inner).unwrap_or_default();

    let event = web::block(move || {
        let conn = pool.get()?;
        Event::join(*event_id, player.id, join, &conn)
    })
    .await?;

    http_ok_json!(event);
}

#[post("/events/{id}/cancel")]
async fn cancel(
    event_id: Path<i64>,
    cancel: Option<Json<CancelRegistration>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let user = auth::get_user(&id)?;
    let cancel = cancel.map(Json::into_inner).unwrap_or_default();
    let canceller = match user.role {
        Role::Player => Canceller::Player(user.id),
        Role::Club => Canceller::Club(user.id),
    };

    let event = web::block(move || {
        let conn = pool.get()?;
        Event::cancel(*event_id, canceller, cancel, &conn)
    })
    .await?;

    http_ok_json!(event);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(find);
    cfg.service(create);
    cfg.service(update);
    cfg.service(delete);
    cfg.service(join);
    cfg.service(cancel);
}
