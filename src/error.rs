use thiserror::Error;

#[cfg(feature = "web")]
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Errors produced anywhere in the ingestion pipeline
///
/// Every operation returns one of these and the HTTP layer maps it to a
/// response at the boundary. Only `Validation`, `Parse` and `NotFound` carry
/// messages that are safe to show to the user; `Io` and `Internal` are logged
/// and replaced with a generic message.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad, missing or disallowed upload input
    #[error("{0}")]
    Validation(String),

    /// The spreadsheet could not be decoded
    #[error("Error processing file: {0}")]
    Parse(String),

    /// Disk failure while saving, reading or removing files
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A data-dependent view was requested before anything was uploaded
    #[error("{0}")]
    NotFound(String),

    /// The request body exceeded the configured size cap
    #[error("{0}")]
    TooLarge(String),

    /// Template rendering or serialization failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl AppError {
    /// Shorthand for the "nothing uploaded yet" case
    pub fn no_data() -> Self {
        AppError::NotFound("No data loaded".to_string())
    }

    /// Message that may be returned to the client
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(_)
            | AppError::Parse(_)
            | AppError::NotFound(_)
            | AppError::TooLarge(_) => self.to_string(),
            AppError::Io(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    #[cfg(feature = "web")]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Parse(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(feature = "web")]
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("{}", self);
        }

        let body = serde_json::json!({ "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}

#[cfg(feature = "web")]
impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::TooLarge("File too large".to_string());
        }
        AppError::Validation(format!("Invalid multipart payload: {}", err.body_text()))
    }
}

/// A request that is not multipart at all carries no file
#[cfg(feature = "web")]
impl From<axum::extract::multipart::MultipartRejection> for AppError {
    fn from(err: axum::extract::multipart::MultipartRejection) -> Self {
        log::debug!("Multipart rejection: {}", err.body_text());
        AppError::Validation("No file provided".to_string())
    }
}

#[cfg(feature = "web")]
impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Validation(format!("Invalid JSON body: {}", err.body_text()))
    }
}

#[cfg(feature = "web")]
impl From<handlebars::RenderError> for AppError {
    fn from(err: handlebars::RenderError) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
