use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::selector::SelectionError;
use sea_orm::DbErr;
use serde::Serialize;

/// Seconds a client should wait after losing the prize-allocation race.
const CONTENTION_RETRY_AFTER_SECS: u64 = 1;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `EVENT_INACTIVE`,
    /// `TOKEN_MISSING`, `TOKEN_INVALID`, `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`,
    /// `INVALID_SESSION_STATE`, `SESSION_IN_PROGRESS`, `ROUND_LIMIT_REACHED`,
    /// `INSUFFICIENT_QUESTIONS`, `QUESTION_POOL_EXHAUSTED`, `CONTENTION`, `INTERNAL_ERROR`.
    #[schema(example = "ROUND_LIMIT_REACHED")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "All 3 rounds of this event have been used")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Event is switched off or outside its time window.
    EventInactive(String),
    TokenMissing,
    TokenInvalid,
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    /// Operation not allowed in the session's current state.
    SessionState(String),
    SessionInProgress {
        session_id: i32,
    },
    RoundLimitReached {
        max_rounds: u32,
    },
    /// Not enough unseen normal questions to fill a new session.
    InsufficientQuestions {
        available: usize,
        required: usize,
    },
    PoolExhausted(String),
    /// Serialization retries ran out.
    Contention,
    Database(DbErr),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::EventInactive(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "EVENT_INACTIVE",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::SessionState(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "INVALID_SESSION_STATE",
                    message: msg,
                },
            ),
            AppError::SessionInProgress { session_id } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "SESSION_IN_PROGRESS",
                    message: format!("Session {session_id} is still in progress"),
                },
            ),
            AppError::RoundLimitReached { max_rounds } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "ROUND_LIMIT_REACHED",
                    message: format!("All {max_rounds} rounds of this event have been used"),
                },
            ),
            AppError::InsufficientQuestions {
                available,
                required,
            } => {
                tracing::error!(available, required, "Question pool too small to start a session");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INSUFFICIENT_QUESTIONS",
                        message: "Not enough questions are available to start a session".into(),
                    },
                )
            }
            AppError::PoolExhausted(detail) => {
                tracing::error!("Question pool exhausted mid-session: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "QUESTION_POOL_EXHAUSTED",
                        message: "No further question could be selected".into(),
                    },
                )
            }
            AppError::Contention => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    code: "CONTENTION",
                    message: "The request conflicted with concurrent updates. Please retry".into(),
                },
            ),
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = matches!(self, AppError::Contention).then_some(CONTENTION_RETRY_AFTER_SECS);

        let (status, body) = self.status_and_body();

        if let Some(seconds) = retry_after {
            (status, [("Retry-After", seconds.to_string())], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Database(err)
    }
}

impl From<SelectionError> for AppError {
    fn from(err: SelectionError) -> Self {
        AppError::PoolExhausted(err.to_string())
    }
}
