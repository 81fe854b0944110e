use chrono::{DateTime, Utc};
use common::{QuestionCategory, QuestionType};
use serde::Serialize;

use crate::entity::prize_award::AwardSource;
use crate::entity::{prize_award, question};

/// A question as shown to the user. Never carries the correct answer.
#[derive(Serialize, utoipa::ToSchema)]
pub struct QuestionView {
    #[schema(example = 12)]
    pub id: i32,
    pub question_type: QuestionType,
    pub category: QuestionCategory,
    #[schema(example = "Which of these is a sign of a phishing email?")]
    pub prompt: String,
    /// Answer choices, e.g. `[{"id": "a", "label": "..."}]`. Empty for free text.
    #[schema(value_type = Object)]
    pub options: serde_json::Value,
}

impl From<question::Model> for QuestionView {
    fn from(m: question::Model) -> Self {
        Self {
            id: m.id,
            question_type: m.question_type,
            category: m.category,
            prompt: m.prompt,
            options: m.options,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PrizeAwardResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = 1)]
    pub event_id: i32,
    #[schema(example = "emp-1042")]
    pub user_id: String,
    #[schema(example = "Coffee voucher")]
    pub prize_label: String,
    pub source: AwardSource,
    pub claimed: bool,
    pub won_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl From<prize_award::Model> for PrizeAwardResponse {
    fn from(m: prize_award::Model) -> Self {
        Self {
            id: m.id,
            event_id: m.event_id,
            user_id: m.user_id,
            prize_label: m.prize_label,
            source: m.source,
            claimed: m.claimed,
            won_at: m.won_at,
            claimed_at: m.claimed_at,
        }
    }
}
