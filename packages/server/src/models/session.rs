use chrono::{DateTime, Utc};
use common::SessionStatus;
use serde::{Deserialize, Serialize};

use super::shared::{PrizeAwardResponse, QuestionView};
use crate::error::AppError;
use crate::quiz::prize::{AwardOutcome, NotWonReason};
use crate::quiz::session::{AnswerOutcome, SessionSummary, SessionView, StartedSession, SubmitAnswer};

/// Longest accepted per-question answering time.
const MAX_ELAPSED_SECONDS: i32 = 24 * 60 * 60;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitAnswerRequest {
    /// The question being answered. Must be the one currently served, or one
    /// already answered in this session (resubmission).
    #[schema(example = 12)]
    pub question_id: i32,
    /// Submitted value: option id, list of option ids, boolean or text.
    #[schema(value_type = Object, example = json!("b"))]
    pub value: serde_json::Value,
    /// Seconds spent on the question, as measured by the client.
    #[schema(example = 14)]
    pub elapsed_seconds: Option<i32>,
}

impl From<SubmitAnswerRequest> for SubmitAnswer {
    fn from(req: SubmitAnswerRequest) -> Self {
        Self {
            question_id: req.question_id,
            value: req.value,
            elapsed_seconds: req.elapsed_seconds.unwrap_or(0),
        }
    }
}

pub fn validate_submit_answer(req: &SubmitAnswerRequest) -> Result<(), AppError> {
    if req.value.is_null() {
        return Err(AppError::Validation("value must not be null".into()));
    }
    if let Some(elapsed) = req.elapsed_seconds
        && !(0..=MAX_ELAPSED_SECONDS).contains(&elapsed)
    {
        return Err(AppError::Validation(format!(
            "elapsed_seconds must be between 0 and {MAX_ELAPSED_SECONDS}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct StartSessionResponse {
    #[schema(example = 41)]
    pub session_id: i32,
    #[schema(example = 1)]
    pub event_id: i32,
    #[schema(example = 1)]
    pub round: i32,
    pub first_question: QuestionView,
}

impl From<StartedSession> for StartSessionResponse {
    fn from(s: StartedSession) -> Self {
        Self {
            session_id: s.session.id,
            event_id: s.session.event_id,
            round: s.session.round,
            first_question: s.question.into(),
        }
    }
}

/// Result of the prize draw triggered by a lucky-draw answer.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PrizeResult {
    Won { prize: PrizeAwardResponse },
    NotWon { reason: NotWonReason },
}

impl From<AwardOutcome> for PrizeResult {
    fn from(outcome: AwardOutcome) -> Self {
        match outcome {
            AwardOutcome::Won(award) => PrizeResult::Won {
                prize: award.into(),
            },
            AwardOutcome::NotWon(reason) => PrizeResult::NotWon { reason },
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmitAnswerResponse {
    #[schema(example = 12)]
    pub question_id: i32,
    pub is_correct: bool,
    /// 1 for the first submission, incremented on each resubmission.
    #[schema(example = 1)]
    pub attempt_number: i32,
    /// Canonical answer, revealed only when this submission was wrong.
    #[schema(value_type = Option<Object>)]
    pub correct_answer: Option<serde_json::Value>,
    pub explanation: Option<String>,
    /// Next question to answer; `null` when the session is full.
    pub next_question: Option<QuestionView>,
    pub session_complete: bool,
    pub prize_result: Option<PrizeResult>,
}

impl From<AnswerOutcome> for SubmitAnswerResponse {
    fn from(o: AnswerOutcome) -> Self {
        let is_correct = o.answer.is_correct;
        Self {
            question_id: o.question.id,
            is_correct,
            attempt_number: o.answer.attempt_number,
            correct_answer: (!is_correct).then_some(o.question.correct_answer),
            explanation: o.question.explanation,
            next_question: o.next_question.map(QuestionView::from),
            session_complete: o.session_complete,
            prize_result: o.prize.map(PrizeResult::from),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionResponse {
    #[schema(example = 41)]
    pub session_id: i32,
    #[schema(example = 1)]
    pub event_id: i32,
    #[schema(example = 2)]
    pub round: i32,
    pub status: SessionStatus,
    #[schema(example = 3)]
    pub answered: usize,
    #[schema(example = 2)]
    pub correct: usize,
    /// Question awaiting an answer, if any.
    pub current_question: Option<QuestionView>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SessionView> for SessionResponse {
    fn from(v: SessionView) -> Self {
        Self {
            session_id: v.session.id,
            event_id: v.session.event_id,
            round: v.session.round,
            status: v.session.status,
            answered: v.answers.len(),
            correct: v.answers.iter().filter(|a| a.is_correct).count(),
            current_question: v.current_question.map(QuestionView::from),
            started_at: v.session.started_at,
            completed_at: v.session.completed_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionSummaryResponse {
    #[schema(example = 41)]
    pub session_id: i32,
    #[schema(example = 1)]
    pub round: i32,
    pub status: SessionStatus,
    #[schema(example = 5)]
    pub answered: usize,
    /// Answers whose latest submission is correct.
    #[schema(example = 4)]
    pub correct: usize,
    #[schema(example = 1)]
    pub incorrect: usize,
    #[schema(example = 3)]
    pub first_try_correct: usize,
    #[schema(example = 1)]
    pub lucky_seen: usize,
    #[schema(example = 1)]
    pub lucky_first_try_correct: usize,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SessionSummary> for SessionSummaryResponse {
    fn from(s: SessionSummary) -> Self {
        Self {
            session_id: s.session.id,
            round: s.session.round,
            status: s.session.status,
            answered: s.answered,
            correct: s.correct,
            incorrect: s.answered - s.correct,
            first_try_correct: s.first_try_correct,
            lucky_seen: s.lucky_seen,
            lucky_first_try_correct: s.lucky_first_try_correct,
            completed_at: s.session.completed_at,
        }
    }
}
