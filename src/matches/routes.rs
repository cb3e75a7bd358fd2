use actix::Addr;
use actix_identity::Identity;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Data, HttpResponse, Json, Path, Query};
use actix_web::{delete, get, patch, post};

use crate::auth;
use crate::db;
use crate::errors::ServiceError;
use crate::matches::{CreateMatch, JoinOutcome, Match, MatchFilter, UpdateMatch};
use crate::notifications::{self, Mailer};
use crate::server::Response;
use crate::validator::Validator;

#[get("/matches")]
async fn find_all(filter: Query<MatchFilter>, pool: Data<db::Pool>) -> Response {
    let matches = web::block(move || {
        let conn = pool.get()?;
        Match::find_all(filter.into_inner(), &conn)
    })
    .await?;

    http_ok_json!(matches);
}

#[get("/matches/{id}")]
async fn find(match_id: Path<i64>, pool: Data<db::Pool>) -> Response {
    let padel_match = web::block(move || {
        let conn = pool.get()?;
        Match::find_details(*match_id, &conn)
    })
    .await?;

    http_ok_json!(padel_match);
}

#[post("/matches")]
async fn create(
    new_match: Json<Validator<CreateMatch>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;
    let new_match = new_match.into_inner().validate()?;

    let padel_match = web::block(move || {
        let conn = pool.get()?;
        Match::create(&new_match, club.id, &conn)
    })
    .await?;

    http_created_json!(padel_match);
}

#[patch("/matches/{id}")]
async fn update(
    match_id: Path<i64>,
    update: Json<UpdateMatch>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;

    let padel_match = web::block(move || {
        let conn = pool.get()?;
        Match::update(*match_id, club.id, &update.into_inner(), &conn)
    })
    .await?;

    http_ok_json!(padel_match);
}

#[delete("/matches/{id}")]
async fn delete(match_id: Path<i64>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    web::block(move || {
        let conn = pool.get()?;
        Match::delete(*match_id, club.id, &conn)
    })
    .await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

#[post("/matches/{id}/join")]
async fn join(
    match_id: Path<i64>,
    pool: Data<db::Pool>,
    mailer: Data<Addr<Mailer>>,
    id: Identity,
) -> Response {
    let player = auth::get_player(&id)?;

    let (padel_match, emails) = web::block(move || -> Result<_, ServiceError> {
        let conn = pool.get()?;
        let (padel_match, outcome) = Match::join(*match_id, player.id, &conn)?;

        let emails = match outcome {
            JoinOutcome::Completed => notifications::match_completed(&padel_match, &conn)?,
            JoinOutcome::Joined => vec![],
        };

        Ok((padel_match, emails))
    })
    .await?;

    notifications::dispatch(&mailer, emails);

    http_ok_json!(padel_match);
}

#[post("/matches/{id}/leave")]
async fn leave(
    match_id: Path<i64>,
    pool: Data<db::Pool>,
    mailer: Data<Addr<Mailer>>,
    id: Identity,
) -> Response {
    let player = auth::get_player(&id)?;

    let (padel_match, emails) = web::block(move || -> Result<_, ServiceError> {
        let conn = pool.get()?;
        let (padel_match, outcome) = Match::leave(*match_id, player.id, &conn)?;

        let emails = if outcome.reopened {
            notifications::match_reopened(&padel_match, player.id, &conn)?
        } else {
            vec![]
        };

        Ok((padel_match, emails))
    })
    .await?;

    notifications::dispatch(&mailer, emails);

    http_ok_json!(padel_match);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(find);
    cfg.service(create);
    cfg.service(update);
    cfg.service(delete);
    cfg.service(join);
    cfg.service(leave);
}
