use chrono::{DateTime, Utc};
use serde::Serialize;

use super::shared::PrizeAwardResponse;
use crate::quiz::overview::{CallToAction, EventProgress};

#[derive(Serialize, utoipa::ToSchema)]
pub struct QuizListItem {
    #[schema(example = 1)]
    pub event_id: i32,
    #[schema(example = "Security Awareness Week")]
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[schema(example = "Coffee voucher")]
    pub prize_label: String,
    pub call_to_action: CallToAction,
    /// Session to resume when `call_to_action` is `resume`.
    pub active_session_id: Option<i32>,
    #[schema(example = 1)]
    pub completed_rounds: u32,
    #[schema(example = 3)]
    pub max_rounds: u32,
    /// Answered questions over all rounds, as a percentage of the event total.
    #[schema(example = 33)]
    pub percent_complete: u32,
    #[schema(example = 1)]
    pub lucky_first_try_correct: usize,
    pub prize: Option<PrizeAwardResponse>,
}

impl QuizListItem {
    pub fn new(p: EventProgress, max_rounds: u32) -> Self {
        Self {
            event_id: p.event.id,
            title: p.event.title,
            description: p.event.description,
            start_time: p.event.start_time,
            end_time: p.event.end_time,
            prize_label: p.event.prize_label,
            call_to_action: p.call_to_action,
            active_session_id: p.active_session_id,
            completed_rounds: p.completed_rounds,
            max_rounds,
            percent_complete: p.percent_complete,
            lucky_first_try_correct: p.lucky_first_try_correct,
            prize: p.award.map(Into::into),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct QuizListResponse {
    pub data: Vec<QuizListItem>,
}
