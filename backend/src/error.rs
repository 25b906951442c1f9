use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::domain::{
    box_id::BoxIdError,
    collaboration::TransitionError,
    contracts::ContractError,
    epk::EpkValidationError,
    folders::FolderRuleError,
    moves::MoveError,
    notes::{NoteError, ReorderError},
    projects::ProjectError,
};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, message)
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.message, "request failed");
        }
        let body = Json(ErrorResponse {
            message: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            _ => AppError::internal(value),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        AppError::new(value.status(), value.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(value: PathRejection) -> Self {
        AppError::new(value.status(), value.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(value: QueryRejection) -> Self {
        AppError::new(value.status(), value.body_text())
    }
}

impl From<FolderRuleError> for AppError {
    fn from(value: FolderRuleError) -> Self {
        match value {
            FolderRuleError::NameConflict => AppError::conflict(value.to_string()),
            FolderRuleError::UnknownKind(_) => AppError::internal(value),
            _ => AppError::bad_request(value.to_string()),
        }
    }
}

impl From<MoveError> for AppError {
    fn from(value: MoveError) -> Self {
        match value {
            MoveError::NotAFolder => AppError::bad_request(value.to_string()),
            MoveError::StaleOrigin { current, .. } => {
                AppError::conflict(format!("{value}; current folder is {current}"))
            }
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::AlreadyResponded(_) => AppError::conflict(value.to_string()),
            TransitionError::Expired => AppError::gone(value.to_string()),
            TransitionError::UnknownValue(_) | TransitionError::InvalidExpiry => {
                AppError::bad_request(value.to_string())
            }
        }
    }
}

impl From<ContractError> for AppError {
    fn from(value: ContractError) -> Self {
        match value {
            ContractError::UnknownTemplate(_) => AppError::not_found(),
            ContractError::Render(_) => AppError::internal(value),
        }
    }
}

impl From<ProjectError> for AppError {
    fn from(value: ProjectError) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<NoteError> for AppError {
    fn from(value: NoteError) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<ReorderError> for AppError {
    fn from(value: ReorderError) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<EpkValidationError> for AppError {
    fn from(value: EpkValidationError) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<BoxIdError> for AppError {
    fn from(value: BoxIdError) -> Self {
        AppError::bad_request(value.to_string())
    }
}
