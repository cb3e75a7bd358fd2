use actix_identity::Identity;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Data, HttpResponse, Json, Path, Query};
use actix_web::{delete, get, patch, post};

use crate::auth;
use crate::db;
use crate::errors::ServiceError;
use crate::finance::{self, CreateMovement, Movement, MovementFilter, UpdateMovement};
use crate::server::Response;
use crate::spreadsheet;
use crate::validator::Validator;

#[get("/finance/movements")]
async fn find_all(filter: Query<MovementFilter>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;
    let filter = Validator::new(filter.into_inner()).validate()?;

    let movements = web::block(move || {
        let conn = pool.get()?;
        Movement::find_all(club.id, &filter, &conn)
    })
    .await?;

    http_ok_json!(movements);
}

#[post("/finance/movements")]
async fn create(
    movement: Json<Validator<CreateMovement>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;
    let movement = movement.into_inner().validate()?;

    let movement = web::block(move || {
        let conn = pool.get()?;
        Movement::create(&movement, club.id, &conn)
    })
    .await?;

    http_created_json!(movement);
}

#[patch("/finance/movements/{id}")]
async fn update(
    movement_id: Path<i64>,
    update: Json<Validator<UpdateMovement>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;
    let update = update.into_inner().validate()?;

    let movement = web::block(move || {
        let conn = pool.get()?;
        Movement::update(*movement_id, club.id, update, &conn)
    })
    .await?;

    http_ok_json!(movement);
}

#[delete("/finance/movements/{id}")]
async fn delete(movement_id: Path<i64>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    web::block(move || {
        let conn = pool.get()?;
        Movement::delete(*movement_id, club.id, &conn)
    })
    .await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

/// income, expenses and balance, the kind filter is ignored
#[get("/finance/summary")]
async fn summary(filter: Query<MovementFilter>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;
    let filter = Validator::new(filter.into_inner()).validate()?;

    let summary = web::block(move || {
        let conn = pool.get()?;
        Movement::summary(club.id, filter.from, filter.to, &conn)
    })
    .await?;

    http_ok_json!(summary);
}

#[get("/finance/export")]
async fn export(filter: Query<MovementFilter>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;
    let filter = Validator::new(filter.into_inner()).validate()?;

    let bytes = web::block(move || -> Result<_, ServiceError> {
        let conn = pool.get()?;
        let movements = Movement::find_all(club.id, &filter, &conn)?;

        spreadsheet::write_workbook(
            "finance",
            &finance::EXPORT_HEADER,
            &finance::export_rows(&movements),
        )
    })
    .await?;

    Ok(spreadsheet::download("finance.xlsx", bytes))
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(create);
    cfg.service(update);
    cfg.service(delete);
    cfg.service(summary);
    cfg.service(export);
}
