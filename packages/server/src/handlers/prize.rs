use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, PERM_PRIZE_DRAW, PERM_PRIZE_VIEW_ALL};
use crate::extractors::json::AppJson;
use crate::models::prize::*;
use crate::models::shared::PrizeAwardResponse;
use crate::quiz::prize::PrizeAllocator;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/{id}/draw",
    tag = "Prizes",
    operation_id = "bulkDraw",
    summary = "Draw winners among qualified users",
    description = "Picks up to `count` random winners among users with a first-try-correct lucky-draw answer who hold no prize yet. The count is clamped to the event's free slots. Requires `prize:draw` permission.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = BulkDrawRequest,
    responses(
        (status = 200, description = "Draw finished", body = BulkDrawResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Concurrent update, retry later (CONTENTION)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(count = payload.count))]
pub async fn bulk_draw(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<BulkDrawRequest>,
) -> Result<Json<BulkDrawResponse>, AppError> {
    auth_user.require_permission(PERM_PRIZE_DRAW)?;
    validate_bulk_draw(&payload)?;

    let outcome = PrizeAllocator::new(&state.db, state.config.prize.retry_policy())
        .bulk_draw(id, payload.count)
        .await?;

    Ok(Json(BulkDrawResponse::new(id, outcome)))
}

#[utoipa::path(
    get,
    path = "/{id}/prizes",
    tag = "Prizes",
    operation_id = "listEventPrizes",
    summary = "List awards of an event",
    description = "Returns every award of the event, oldest first. Requires `prize:view_all` permission.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Awards of the event", body = PrizeListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_event_prizes(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PrizeListResponse>, AppError> {
    auth_user.require_permission(PERM_PRIZE_VIEW_ALL)?;

    let awards = PrizeAllocator::new(&state.db, state.config.prize.retry_policy())
        .list_for_event(id)
        .await?;

    Ok(Json(PrizeListResponse {
        data: awards.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Prizes",
    operation_id = "listMyPrizes",
    summary = "List the caller's prizes",
    responses(
        (status = 200, description = "Prizes won by the caller", body = PrizeListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_prizes(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PrizeListResponse>, AppError> {
    let awards = PrizeAllocator::new(&state.db, state.config.prize.retry_policy())
        .list_for_user(&auth_user.user_id)
        .await?;

    Ok(Json(PrizeListResponse {
        data: awards.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/claim",
    tag = "Prizes",
    operation_id = "claimPrize",
    summary = "Claim a prize",
    description = "Marks one of the caller's awards as claimed.",
    params(("id" = i32, Path, description = "Award ID")),
    responses(
        (status = 200, description = "Prize claimed", body = PrizeAwardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Award belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Award not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already claimed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn claim_prize(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PrizeAwardResponse>, AppError> {
    let award = PrizeAllocator::new(&state.db, state.config.prize.retry_policy())
        .claim(id, &auth_user.user_id)
        .await?;

    Ok(Json(PrizeAwardResponse::from(award)))
}
