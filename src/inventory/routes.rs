use actix_identity::Identity;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Bytes, Data, HttpResponse, Json, Path, Query};
use actix_web::{delete, get, patch, post};
use diesel::Connection;

use crate::auth;
use crate::db;
use crate::errors::ServiceError;
use crate::inventory::{import, Article, ArticleFilter, CreateArticle, ImportReport, UpdateArticle};
use crate::server::Response;
use crate::spreadsheet;
use crate::validator::Validator;

#[get("/inventory/articles")]
async fn find_all(filter: Query<ArticleFilter>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    let articles = web::block(move || {
        let conn = pool.get()?;
        Article::find_all(club.id, filter.into_inner(), &conn)
    })
    .await?;

    http_ok_json!(articles);
}

#[get("/inventory/articles/{id}")]
async fn find(article_id: Path<i64>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    let article = web::block(move || {
        let conn = pool.get()?;
        Article::find(*article_id, club.id, &conn)
    })
    .await?;

    http_ok_json!(article);
}

#[post("/inventory/articles")]
async fn create(
    article: Json<Validator<CreateArticle>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;
    let article = article.into_inner().validate()?;

    let article = web::block(move || {
        let conn = pool.get()?;
        Article::create(&article, club.id, &conn)
    })
    .await?;

    http_created_json!(article);
}

#[patch("/inventory/articles/{id}")]
async fn update(
    article_id: Path<i64>,
    update: Json<Validator<UpdateArticle>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let club = auth::get_club(&id)?;
    let update = update.into_inner().validate()?;

    let article = web::block(move || {
        let conn = pool.get()?;
        Article::update(*article_id, club.id, &update, &conn)
    })
    .await?;

    http_ok_json!(article);
}

#[delete("/inventory/articles/{id}")]
async fn delete(article_id: Path<i64>, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    web::block(move || {
        let conn = pool.get()?;
        Article::delete(*article_id, club.id, &conn)
    })
    .await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

/// The body is the raw `.xlsx` file
#[post("/inventory/import")]
async fn import_articles(body: Bytes, pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    if body.is_empty() {
        bad_request!("upload a spreadsheet");
    }

    let report = web::block(move || -> Result<_, ServiceError> {
        let sheet = spreadsheet::read_first_sheet(&body)?;
        let import::ParsedSheet { rows, errors } =
            import::parse_rows(&sheet.rows, sheet.first_row)?;

        let conn = pool.get()?;
        let imported = conn.transaction::<_, ServiceError, _>(|| {
            Article::upsert_all(club.id, rows, &conn)
        })?;

        info!(
            "club {} imported {} article(s), {} row(s) rejected",
            club.id,
            imported,
            errors.len()
        );

        Ok(ImportReport { imported, errors })
    })
    .await?;

    http_ok_json!(report);
}

#[get("/inventory/export")]
async fn export_articles(pool: Data<db::Pool>, id: Identity) -> Response {
    let club = auth::get_club(&id)?;

    let bytes = web::block(move || -> Result<_, ServiceError> {
        let conn = pool.get()?;
        let articles = Article::find_all(
            club.id,
            ArticleFilter {
                search: None,
                category: None,
            },
            &conn,
        )?;

        spreadsheet::write_workbook("inventory", &import::HEADER, &import::export_rows(&articles))
    })
    .await?;

    Ok(spreadsheet::download("inventory.xlsx", bytes))
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(find);
    cfg.service(create);
    cfg.service(update);
    cfg.service(delete);
    cfg.service(import_articles);
    cfg.service(export_articles);
}
