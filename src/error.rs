use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use base64::DecodeError as BASE64_DECODE_ERROR;
use reqwest::Error as REQWEST_ERROR;
use serde_json::Error as JSON_ERROR;
use sqlx::{error::Error as SQL_ERROR, migrate::MigrateError as MIGRATE_ERROR};
use std::{
    env::VarError, io::Error as IO_ERROR, num::ParseIntError,
    str::ParseBoolError as PARSE_BOOL_ERROR,
};
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

use crate::types::PermissionState;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    Migrate(#[from] MIGRATE_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    TokioElapsedError(#[from] Elapsed),

    #[error("{0}")]
    Base64DecodeError(#[from] BASE64_DECODE_ERROR),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("{0}")]
    ParseBoolError(#[from] PARSE_BOOL_ERROR),

    #[error("{0}")]
    ReqwestError(#[from] REQWEST_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Server end with error: {0}")]
    ServerError(String),

    #[error("Invalid option {option}")]
    InvalidOption { option: String },

    #[error("Missing params: {0}")]
    MissingParams(String),

    #[error("Store responded with {status}: {message}")]
    Store { status: u16, message: String },

    #[error("Push notifications are not supported on this device")]
    PushUnsupported,

    #[error(
        "Push notifications on iOS require the app to be installed: \
         tap Share, choose \"Add to Home Screen\" and open the app from \
         the Home Screen"
    )]
    InstallRequired,

    #[error("Notification permission is {0}")]
    PermissionNotGranted(PermissionState),

    #[error("VAPID public key: {0}")]
    VapidKey(String),

    #[error("Service worker is not ready")]
    ServiceWorkerNotReady,

    #[error("Push platform error: {0}")]
    Platform(String),
}

/// How a failure is treated by callers of the push subscription flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Deploy-time problem, fatal and never retried.
    Configuration,
    /// Holds for the rest of the session, e.g. a denied permission.
    Terminal,
    /// The device cannot take a subscription as it is.
    Platform,
    Transient,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::VapidKey(_)
            | Error::ConfigurationError(_)
            | Error::VAR(_)
            | Error::Migrate(_) => ErrorKind::Configuration,
            Error::PermissionNotGranted(_) => ErrorKind::Terminal,
            Error::PushUnsupported | Error::InstallRequired => {
                ErrorKind::Platform
            },
            _ => ErrorKind::Transient,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request - client sent invalid input
            Error::MissingParams(_)
            | Error::InvalidOption { .. }
            | Error::URL(_)
            | Error::INT(_)
            | Error::ParseBoolError(_)
            | Error::JsonError(_)
            | Error::Base64DecodeError(_) => StatusCode::BAD_REQUEST,

            // 502 Bad Gateway - upstream service error
            Error::ReqwestError(_) | Error::Store { .. } => {
                StatusCode::BAD_GATEWAY
            },

            // 504 Gateway Timeout - upstream timed out
            Error::TokioElapsedError(_) => StatusCode::GATEWAY_TIMEOUT,

            Error::Io(_)
            | Error::SQL(_)
            | Error::Migrate(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::SetGlobalDefaultError(_)
            | Error::ConfigurationError(_)
            | Error::ServerError(_)
            | Error::PushUnsupported
            | Error::InstallRequired
            | Error::PermissionNotGranted(_)
            | Error::VapidKey(_)
            | Error::ServiceWorkerNotReady
            | Error::Platform(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Unknown"),
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        HttpResponse::build(status).json(body)
    }
}
