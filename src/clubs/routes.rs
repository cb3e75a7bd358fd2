use actix_identity::Identity;
use actix_web::web;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{get, patch};

use crate::auth;
use crate::cancellations::CancellationRecord;
use crate::clubs::{Club, ClubFilter, ClubUpdate};
use crate::db;
use crate::server::Response;
use crate::validator::Validator;

#[get("/clubs")]
async fn find_all(filter: Query<ClubFilter>, pool: Data<db::Pool>) -> Response {
    let clubs = web::block(move || {
        let conn = pool.get()?;
        Club::find_all(filter.into_inner(), &conn)
    })
    .await?;

    http_ok_json!(clubs);
}

#[get("/clubs/me")]
async fn find_me(pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    let club = web::block(move || {
        let conn = pool.get()?;
        Club::find(club.id, &conn)
    })
    .await?;

    http_ok_json!(club);
}

#[patch("/clubs/me")]
async fn update_me(
    update: Json<Validator<ClubUpdate>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;
    let update = update.into_inner().validate()?;

    let club = web::block(move || {
        let conn = pool.get()?;
        Club::update(club.id, &update, &conn)
    })
    .await?;

    http_ok_json!(club);
}

/// late cancellations of players at the authenticated club
#[get("/clubs/me/cancellations")]
async fn cancellations(pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    let records = web::block(move || {
        let conn = pool.get()?;
        CancellationRecord::find_by_club(club.id, &conn)
    })
    .await?;

    http_ok_json!(records);
}

#[get("/clubs/{id}")]
async fn find(club_id: Path<i64>, pool: Data<db::Pool>) -> Response {
    let club = web::block(move || {
        let conn = pool.get()?;
        Club::find(*club_id, &conn)
    })
    .await?;

    http_ok_json!(club);
}

// the /clubs/me routes have to be registered before /clubs/{id}
pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(find_me);
    cfg.service(update_me);
    cfg.service(cancellations);
    cfg.service(find);
}
