use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Every failure a handler can surface. The `Display` text is what the
/// client shows in the envelope's `message` field.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("Doctor is not available on {0}")]
    Unavailable(String),

    #[error("Requested time {time} is outside the doctor's hours on {day}")]
    OutsideHours { day: String, time: String },

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

impl ClinicError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClinicError::Validation(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        ClinicError::NotFound(format!("{what} not found"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ClinicError::Validation(_)
            | ClinicError::Conflict(_)
            | ClinicError::InsufficientStock { .. }
            | ClinicError::Unavailable(_)
            | ClinicError::OutsideHours { .. }
            | ClinicError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            ClinicError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::Database(_) | ClinicError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Translates constraint violations on insert/update into domain errors;
/// anything else stays a database error.
pub fn map_constraint(err: sqlx::Error, on_unique: &str, on_missing_ref: &str) -> ClinicError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return ClinicError::Conflict(on_unique.to_string());
        }
        if db.is_foreign_key_violation() {
            return ClinicError::NotFound(on_missing_ref.to_string());
        }
    }
    ClinicError::Database(err)
}

/// On delete, a foreign-key violation means other rows still reference the
/// target.
pub fn map_in_use(err: sqlx::Error, message: &str) -> ClinicError {
    let referenced = matches!(&err, sqlx::Error::Database(db) if db.is_foreign_key_violation());
    if referenced {
        ClinicError::Conflict(message.to_string())
    } else {
        ClinicError::Database(err)
    }
}

impl From<JsonRejection> for ClinicError {
    fn from(rejection: JsonRejection) -> Self {
        ClinicError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ClinicError {
    fn from(rejection: PathRejection) -> Self {
        ClinicError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ClinicError {
    fn from(rejection: QueryRejection) -> Self {
        ClinicError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ClinicError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ClinicError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                "Internal server error".to_string()
            }
            ClinicError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_client_errors() {
        assert_eq!(ClinicError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ClinicError::Conflict("dup".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ClinicError::InsufficientStock { requested: 3, available: 1 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ClinicError::not_found("Doctor").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ClinicError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(ClinicError::not_found("Supplier").to_string(), "Supplier not found");
        assert_eq!(
            ClinicError::InsufficientStock { requested: 6, available: 5 }.to_string(),
            "Insufficient stock: requested 6, available 5"
        );
    }

    #[test]
    fn non_database_errors_pass_through_constraint_mapping() {
        let mapped = map_constraint(sqlx::Error::RowNotFound, "dup", "missing");
        assert!(matches!(mapped, ClinicError::Database(_)));
        let mapped = map_in_use(sqlx::Error::PoolTimedOut, "in use");
        assert!(matches!(mapped, ClinicError::Database(_)));
    }
}
