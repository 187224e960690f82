use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error as ThisError;

use crate::dotenv::Error as DotError;
use crate::jsonwebtoken::errors::Error as JsonWebTokenError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Invalid(String),

    #[error("jwt error: {0}")]
    JWTError(#[from] JsonWebTokenError),

    #[error("dotenv error: {0}")]
    DotEnvError(#[from] DotError),

    #[error("server error: {0}")]
    ServerError(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Invalid(_) => StatusCode::BAD_REQUEST,
            Error::JWTError(_) | Error::DotEnvError(_) | Error::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // internal details stay in the log
        let message = if status.is_server_error() && !matches!(self, Error::Unavailable(_)) {
            log::error!("{}", self);
            "internal server error".to_owned()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ErrorBody { error: &message })
    }
}
