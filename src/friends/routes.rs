use actix::Addr;
use actix_identity::Identity;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Data, HttpResponse, Json, Path};
use actix_web::{delete, get, patch, post};

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::errors::ServiceError;
use crate::friends::{FriendRequest, Friendship, RequestAnswer};
use crate::notifications::{self, templates, Mailer};
use crate::server::Response;
use crate::users::User;

#[get("/friends")]
async fn find_friends(pool: Data<db::Pool>, id: Identity) -> Response {
    let player = auth::get_player(&id)?;

    let friends = web::block(move || {
        let conn = pool.get()?;
        Friendship::find_friends(player.id, &conn)
    })
    .await?;

    http_ok_json!(friends);
}

#[delete("/friends/{user_id}")]
async fn remove_friend(user_id: Path<i64>, pool: Data<db::Pool>, id: Identity) -> Response {
    let player = auth::get_player(&id)?;

    web::block(move || {
        let conn = pool.get()?;
        Friendship::remove(player.id, *user_id, &conn)
    })
    .await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

#[get("/friends/requests")]
async fn find_requests(pool: Data<db::Pool>, id: Identity) -> Response {
    let player = auth::get_player(&id)?;

    let requests = web::block(move || {
        let conn = pool.get()?;
        Friendship::find_pending(player.id, &conn)
    })
    .await?;

    http_ok_json!(requests);
}

#[post("/friends/requests")]
async fn send_request(
    request: Json<FriendRequest>,
    pool: Data<db::Pool>,
    mailer: Data<Addr<Mailer>>,
    id: Identity,
) -> Response {
    let player = auth::get_player(&id)?;

    let (friendship, email) = web::block(move || -> Result<_, ServiceError> {
        let conn = pool.get()?;
        let requester = User::find(player.id, &conn)?;
        let (friendship, addressee) = Friendship::request(player.id, request.user_id, &conn)?;

        let email = templates::friend_request(&addressee.email, &requester.name, Config::frontend_url());
        Ok((friendship, email))
    })
    .await?;

    notifications::dispatch(&mailer, vec![email]);

    http_created_json!(friendship);
}

#[patch("/friends/requests/{requester_id}")]
async fn answer_request(
    requester_id: Path<i64>,
    answer: Json<RequestAnswer>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let player = auth::get_player(&id)?;

    let friendship = web::block(move || {
        let conn = pool.get()?;
        Friendship::answer(*requester_id, player.id, answer.state, &conn)
    })
    .await?;

    http_ok_json!(friendship);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_friends);
    cfg.service(find_requests);
    cfg.service(send_request);
    cfg.service(answer_request);
    cfg.service(remove_friend);
}
