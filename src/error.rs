// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type Result<T> = std::result::Result<T, CostError>;

#[derive(Debug, thiserror::Error)]
pub enum CostError {
    #[error("Validation error, {0}")]
    Validation(String),
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },
    #[error("{0}")]
    Auth(String),
    #[error("Network error, {0}")]
    Network(String),
    #[error("Configuration error, {0}")]
    Config(String),
    #[error("Internal error, {0}")]
    Internal(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serde json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error, {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Validation errors, {0}")]
    ValidatorErrors(#[from] validator::ValidationErrors),
}

/// Coarse classification used by callers to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Auth,
    Network,
    Internal,
}

impl CostError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::ValidatorErrors(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Auth(_) | Self::Jwt(_) => ErrorKind::Auth,
            Self::Network(_) | Self::Request(_) => ErrorKind::Network,
            _ => ErrorKind::Internal,
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Network => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CostError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_http_statuses() {
        assert_eq!(
            CostError::validation("bad").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            CostError::not_found("budget", 7).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CostError::Auth("expired".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            CostError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_resource() {
        let err = CostError::not_found("budget", 42);
        assert_eq!(err.to_string(), "budget with ID 42 not found");
    }
}
