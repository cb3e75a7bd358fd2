use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{error::ResponseError, HttpResponse};
use derive_more::Display;
use diesel::result::{DatabaseErrorKind, Error as DBError};
use std::convert::From;

#[derive(Debug, Display)]
pub enum ServiceError {
    #[display(fmt = "Internal Server Error")]
    InternalServerError,

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "Unauthorized")]
    Unauthorized,

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "Not Found")]
    NotFound,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

// impl ResponseError trait allows to convert our errors into http responses with appropriate data
impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            ServiceError::InternalServerError => {
                String::from("Internal Server Error, Please try later")
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody { error })
    }
}

impl From<DBError> for ServiceError {
    fn from(error: DBError) -> ServiceError {
        match error {
            DBError::NotFound => ServiceError::NotFound,
            DBError::DatabaseError(kind, info) => {
                error!("db error: {}", info.message());
                if let DatabaseErrorKind::UniqueViolation = kind {
                    let message = info.details().unwrap_or_else(|| info.message()).to_string();
                    return ServiceError::Conflict(message);
                }
                ServiceError::InternalServerError
            }
            _ => {
                error!("db error: {}", error);
                ServiceError::InternalServerError
            }
        }
    }
}

impl From<r2d2::Error> for ServiceError {
    fn from(error: r2d2::Error) -> ServiceError {
        error!("r2d2 connection pool error: {}", error);
        ServiceError::InternalServerError
    }
}

/// Errors raised inside `web::block` are passed through untouched,
/// only a cancelled blocking call turns into a server error.
impl From<BlockingError<ServiceError>> for ServiceError {
    fn from(error: BlockingError<ServiceError>) -> ServiceError {
        match error {
            BlockingError::Error(error) => error,
            BlockingError::Canceled => {
                error!("actix threadpool pool error: blocking call canceled");
                ServiceError::InternalServerError
            }
        }
    }
}

impl From<argon2::Error> for ServiceError {
    fn from(error: argon2::Error) -> ServiceError {
        error!("argon2 error: {}", error);
        ServiceError::InternalServerError
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(error: serde_json::Error) -> ServiceError {
        error!("json error: {}", error);
        ServiceError::InternalServerError
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(error: reqwest::Error) -> ServiceError {
        error!("http client error: {}", error);
        ServiceError::InternalServerError
    }
}

impl From<calamine::XlsxError> for ServiceError {
    fn from(error: calamine::XlsxError) -> ServiceError {
        warn!("unreadable spreadsheet: {}", error);
        ServiceError::BadRequest(String::from("unable to read the spreadsheet"))
    }
}

impl From<rust_xlsxwriter::XlsxError> for ServiceError {
    fn from(error: rust_xlsxwriter::XlsxError) -> ServiceError {
        error!("spreadsheet export error: {}", error);
        ServiceError::InternalServerError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::{Body, ResponseBody};

    fn body_of(response: &HttpResponse) -> String {
        match response.body() {
            ResponseBody::Body(Body::Bytes(bytes)) => String::from_utf8(bytes.to_vec()).unwrap(),
            _ => panic!("expected a bytes body"),
        }
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ServiceError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServiceError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::InternalServerError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_body_is_json_object() {
        let response = ServiceError::BadRequest(String::from("this match is full")).error_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(&response), r#"{"error":"this match is full"}"#);
    }

    #[test]
    /// internal errors should never leak their cause
    fn internal_error_is_generic() {
        let response = ServiceError::InternalServerError.error_response();

        assert_eq!(
            body_of(&response),
            r#"{"error":"Internal Server Error, Please try later"}"#
        );
    }

    #[test]
    fn blocking_errors_keep_their_cause() {
        let error: ServiceError = BlockingError::Error(ServiceError::NotFound).into();
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);

        let error: ServiceError = BlockingError::<ServiceError>::Canceled.into();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_rows_are_not_found() {
        let error: ServiceError = DBError::NotFound.into();
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }
}
