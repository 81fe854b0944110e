use serde::{Deserialize, Serialize};

use super::shared::PrizeAwardResponse;
use crate::error::AppError;
use crate::quiz::prize::BulkDrawOutcome;

/// Upper bound on winners picked by a single bulk draw.
const MAX_DRAW_COUNT: u64 = 1000;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BulkDrawRequest {
    /// Number of winners to pick. Clamped to the event's free slots.
    #[schema(example = 5)]
    pub count: u64,
}

pub fn validate_bulk_draw(req: &BulkDrawRequest) -> Result<(), AppError> {
    if req.count == 0 || req.count > MAX_DRAW_COUNT {
        return Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_DRAW_COUNT}"
        )));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BulkDrawResponse {
    #[schema(example = 1)]
    pub event_id: i32,
    #[schema(example = 5)]
    pub requested: u64,
    pub awarded: Vec<PrizeAwardResponse>,
    #[schema(example = 2)]
    pub remaining_slots: u64,
}

impl BulkDrawResponse {
    pub fn new(event_id: i32, outcome: BulkDrawOutcome) -> Self {
        Self {
            event_id,
            requested: outcome.requested,
            awarded: outcome.awarded.into_iter().map(Into::into).collect(),
            remaining_slots: outcome.remaining_slots,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PrizeListResponse {
    pub data: Vec<PrizeAwardResponse>,
}
