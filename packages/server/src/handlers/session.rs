use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::session::*;
use crate::quiz::session::SessionService;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/{id}/sessions",
    tag = "Sessions",
    operation_id = "startSession",
    summary = "Start the next quiz round",
    description = "Opens a new session for the caller in the given event and returns its first question. Each user gets at most `max_rounds` completed rounds per event and one in-progress session at a time. Questions are never repeated across a user's rounds.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 201, description = "Session started", body = StartSessionResponse),
        (status = 400, description = "Event not open (EVENT_INACTIVE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Session already running or no rounds left (SESSION_IN_PROGRESS, ROUND_LIMIT_REACHED)", body = ErrorBody),
        (status = 500, description = "Question pool too small (INSUFFICIENT_QUESTIONS)", body = ErrorBody),
        (status = 503, description = "Concurrent update, retry later (CONTENTION)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn start_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let started = SessionService::new(&state.db, &state.config)
        .start(&auth_user.user_id, id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse::from(started)),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Sessions",
    operation_id = "getSession",
    summary = "Get a session",
    description = "Returns the caller's session with its progress and the question currently awaiting an answer.",
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session details", body = SessionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Session belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SessionResponse>, AppError> {
    let view = SessionService::new(&state.db, &state.config)
        .get(&auth_user.user_id, id)
        .await?;

    Ok(Json(SessionResponse::from(view)))
}

#[utoipa::path(
    post,
    path = "/{id}/answers",
    tag = "Sessions",
    operation_id = "submitAnswer",
    summary = "Submit an answer",
    description = "Grades the answer to the currently served question and returns the next one. Resubmitting an already answered question updates it in place and increments `attempt_number`; only the first attempt counts toward unlocking lucky-draw questions. A first-try-correct lucky-draw answer runs the prize draw in the same transaction.",
    params(("id" = i32, Path, description = "Session ID")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SubmitAnswerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Session belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Session or question not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Session is not in progress (INVALID_SESSION_STATE)", body = ErrorBody),
        (status = 500, description = "No question left to serve (QUESTION_POOL_EXHAUSTED)", body = ErrorBody),
        (status = 503, description = "Concurrent update, retry later (CONTENTION)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id, question_id = payload.question_id))]
pub async fn submit_answer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    validate_submit_answer(&payload)?;

    let outcome = SessionService::new(&state.db, &state.config)
        .submit(&auth_user.user_id, id, payload.into())
        .await?;

    Ok(Json(SubmitAnswerResponse::from(outcome)))
}

#[utoipa::path(
    post,
    path = "/{id}/complete",
    tag = "Sessions",
    operation_id = "completeSession",
    summary = "Complete a session",
    description = "Closes the round once every question has been answered and returns a summary.",
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session completed", body = SessionSummaryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Session belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Unanswered questions or not in progress (INVALID_SESSION_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn complete_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SessionSummaryResponse>, AppError> {
    let summary = SessionService::new(&state.db, &state.config)
        .complete(&auth_user.user_id, id)
        .await?;

    Ok(Json(SessionSummaryResponse::from(summary)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Sessions",
    operation_id = "cancelSession",
    summary = "Cancel a session",
    description = "Deletes an in-progress session and its answers. The round can be played again.",
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session cancelled"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Session belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Session already completed (INVALID_SESSION_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn cancel_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    SessionService::new(&state.db, &state.config)
        .cancel(&auth_user.user_id, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
