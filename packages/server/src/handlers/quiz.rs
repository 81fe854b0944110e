use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::quiz::{QuizListItem, QuizListResponse};
use crate::quiz::overview::quiz_overview;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/quizzes",
    tag = "Quizzes",
    operation_id = "listQuizzes",
    summary = "List active quizzes with the caller's progress",
    description = "Returns every active event ordered by start time, with the caller's completed rounds, completion percentage over all rounds, prize status and the action to offer (`start`, `resume`, `completed`, `expired`, `upcoming`).",
    responses(
        (status = 200, description = "Active quizzes", body = QuizListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_quizzes(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<QuizListResponse>, AppError> {
    let quiz = &state.config.quiz;
    let progress = quiz_overview(&state.db, quiz, &auth_user.user_id).await?;

    Ok(Json(QuizListResponse {
        data: progress
            .into_iter()
            .map(|p| QuizListItem::new(p, quiz.max_rounds))
            .collect(),
    }))
}
