use actix::Addr;
use actix_identity::Identity;
use actix_web::http::StatusCode;
use actix_web::web::{Data, Json};
use actix_web::{post, put, web, HttpResponse};
use diesel::Connection;
use serde_json::json;

use crate::auth::{
    self, Credentials, PasswordChange, PasswordReset, ResetConfirmation, ResetRequest, Role,
    SessionUser,
};
use crate::clubs::{Club, ClubRegistration};
use crate::config::Config;
use crate::db;
use crate::errors::ServiceError;
use crate::notifications::{self, templates, Mailer};
use crate::server::Response;
use crate::users::{Registration, User};
use crate::validator::Validator;

/// unknown accounts and wrong passwords both answer 401
fn unauthorized_when_missing(error: ServiceError) -> ServiceError {
    match error {
        ServiceError::NotFound => ServiceError::Unauthorized,
        _ => error,
    }
}

#[post("/auth/register")]
async fn register_player(
    registration: Json<Validator<Registration>>,
    pool: Data<db::Pool>,
    mailer: Data<Addr<Mailer>>,
    id: Identity,
) -> Response {
    let registration = registration.into_inner().validate()?;

    let user = web::block(move || {
        let conn = pool.get()?;
        User::create(&registration, &conn)
    })
    .await?;

    auth::remember(
        &id,
        SessionUser {
            id: user.id,
            role: Role::Player,
        },
    )?;

    notifications::dispatch(
        &mailer,
        vec![templates::welcome(&user.email, &user.name, Config::frontend_url())],
    );

    http_created_json!(user);
}

#[post("/auth/login")]
async fn login(credentials: Json<Credentials>, pool: Data<db::Pool>, id: Identity) -> Response {
    let credentials = credentials.into_inner();

    let user = web::block(move || -> Result<_, ServiceError> {
        let conn = pool.get()?;
        let user = User::find_by_email(&credentials.email, &conn)
            .map_err(unauthorized_when_missing)?;
        user.verify_password(credentials.password.as_bytes())?;
        Ok(user)
    })
    .await?;

    auth::remember(
        &id,
        SessionUser {
            id: user.id,
            role: Role::Player,
        },
    )?;

    http_ok_json!(user);
}

#[post("/auth/clubs/register")]
async fn register_club(
    registration: Json<Validator<ClubRegistration>>,
    pool: Data<db::Pool>,
    mailer: Data<Addr<Mailer>>,
    id: Identity,
) -> Response {
    let registration = registration.into_inner().validate()?;

    let club = web::block(move || {
        let conn = pool.get()?;
        Club::create(&registration, &conn)
    })
    .await?;

    auth::remember(
        &id,
        SessionUser {
            id: club.id,
            role: Role::Club,
        },
    )?;

    notifications::dispatch(
        &mailer,
        vec![templates::welcome(&club.email, &club.name, Config::frontend_url())],
    );

    http_created_json!(club);
}

#[post("/auth/clubs/login")]
async fn login_club(credentials: Json<Credentials>, pool: Data<db::Pool>, id: Identity) -> Response {
    let credentials = credentials.into_inner();

    let club = web::block(move || -> Result<_, ServiceError> {
        let conn = pool.get()?;
        let club = Club::find_by_email(&credentials.email, &conn)
            .map_err(unauthorized_when_missing)?;
        club.verify_password(credentials.password.as_bytes())?;
        Ok(club)
    })
    .await?;

    auth::remember(
        &id,
        SessionUser {
            id: club.id,
            role: Role::Club,
        },
    )?;

    http_ok_json!(club);
}

#[post("/auth/logout")]
async fn logout(id: Identity) -> Response {
    auth::get_user(&id)?;

    id.forget();

    http_ok_json!(json!({ "message": "Successfully signed out" }));
}

#[put("/auth/password")]
async fn change_password(
    change: Json<Validator<PasswordChange>>,
    pool: Data<db::Pool>,
    id: Identity,
) -> Response {
    let session = auth::get_user(&id)?;
    let change = change.into_inner().validate()?;

    web::block(move || -> Result<(), ServiceError> {
        let conn = pool.get()?;

        match session.role {
            Role::Player => {
                User::find(session.id, &conn)?.verify_password(change.old.as_bytes())?;
                User::update_password(session.id, &change.new, &conn)
            }
            Role::Club => {
                Club::find(session.id, &conn)?.verify_password(change.old.as_bytes())?;
                Club::update_password(session.id, &change.new, &conn)
            }
        }
    })
    .await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

/// Always answers 200 so the endpoint never reveals whether an account exists.
#[post("/auth/password-reset")]
async fn request_reset(
    request: Json<ResetRequest>,
    pool: Data<db::Pool>,
    mailer: Data<Addr<Mailer>>,
) -> Response {
    let email = request.into_inner().email;

    let emails = web::block(move || -> Result<_, ServiceError> {
        let conn = pool.get()?;

        let user = match User::find_by_email(&email, &conn) {
            Ok(user) => user,
            Err(ServiceError::NotFound) => {
                debug!("password reset requested for an unknown email");
                return Ok(vec![]);
            }
            Err(error) => return Err(error),
        };

        let reset = PasswordReset::new(user.id);
        reset.save(&conn)?;

        Ok(vec![templates::password_reset(
            &user.email,
            &reset.token,
            Config::frontend_url(),
        )])
    })
    .await?;

    notifications::dispatch(&mailer, emails);

    Ok(HttpResponse::new(StatusCode::OK))
}

#[post("/auth/password-reset/confirm")]
async fn confirm_reset(confirmation: Json<Validator<ResetConfirmation>>, pool: Data<db::Pool>) -> Response {
    let confirmation = confirmation.into_inner().validate()?;

    web::block(move || {
        let conn = pool.get()?;

        conn.transaction::<_, ServiceError, _>(|| {
            let user_id = PasswordReset::consume(confirmation.token.trim(), &conn)?;
            User::update_password(user_id, &confirmation.password, &conn)
        })
    })
    .await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(register_player);
    cfg.service(login);
    cfg.service(register_club);
    cfg.service(login_club);
    cfg.service(logout);
    cfg.service(change_password);
    cfg.service(request_reset);
    cfg.service(confirm_reset);
}
