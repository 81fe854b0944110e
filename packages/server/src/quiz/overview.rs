//! Per-user progress across active events, used for the quiz list.

use std::collections::HashMap;

use chrono::Utc;
use common::SessionStatus;
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::config::QuizConfig;
use crate::entity::{answer, event, prize_award, quiz_session};
use crate::error::AppError;
use crate::utils::event::{EventWindow, event_window};

/// What the client should offer the user for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CallToAction {
    Start,
    Resume,
    Completed,
    Expired,
    Upcoming,
}

#[derive(Clone, Debug)]
pub struct EventProgress {
    pub event: event::Model,
    pub completed_rounds: u32,
    pub active_session_id: Option<i32>,
    /// Answers given across every existing session of the event.
    pub answered: usize,
    pub lucky_first_try_correct: usize,
    pub award: Option<prize_award::Model>,
    pub call_to_action: CallToAction,
    pub percent_complete: u32,
}

pub fn call_to_action(
    window: EventWindow,
    has_active_session: bool,
    completed_rounds: u32,
    max_rounds: u32,
) -> CallToAction {
    match window {
        EventWindow::Ended => CallToAction::Expired,
        EventWindow::Upcoming => CallToAction::Upcoming,
        EventWindow::Open if has_active_session => CallToAction::Resume,
        EventWindow::Open if completed_rounds >= max_rounds => CallToAction::Completed,
        EventWindow::Open => CallToAction::Start,
    }
}

pub fn percent_complete(answered: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    u32::try_from((answered * 100 / total).min(100)).unwrap_or(100)
}

/// Progress of `user_id` in every active event, ordered by start time.
pub async fn quiz_overview(
    db: &DatabaseConnection,
    quiz: &QuizConfig,
    user_id: &str,
) -> Result<Vec<EventProgress>, AppError> {
    let now = Utc::now();

    let events = event::Entity::find()
        .filter(event::Column::IsActive.eq(true))
        .order_by_asc(event::Column::StartTime)
        .order_by_asc(event::Column::Id)
        .all(db)
        .await?;
    if events.is_empty() {
        return Ok(Vec::new());
    }
    let event_ids: Vec<i32> = events.iter().map(|e| e.id).collect();

    let sessions = quiz_session::Entity::find()
        .filter(quiz_session::Column::UserId.eq(user_id))
        .filter(quiz_session::Column::EventId.is_in(event_ids.clone()))
        .all(db)
        .await?;

    let session_event: HashMap<i32, i32> = sessions.iter().map(|s| (s.id, s.event_id)).collect();
    let answers: Vec<(i32, bool, bool)> = if session_event.is_empty() {
        Vec::new()
    } else {
        answer::Entity::find()
            .select_only()
            .column(answer::Column::SessionId)
            .column(answer::Column::IsLucky)
            .column(answer::Column::FirstAttemptCorrect)
            .filter(answer::Column::SessionId.is_in(session_event.keys().copied().collect::<Vec<_>>()))
            .into_tuple()
            .all(db)
            .await?
    };

    let mut awards: HashMap<i32, prize_award::Model> = prize_award::Entity::find()
        .filter(prize_award::Column::UserId.eq(user_id))
        .filter(prize_award::Column::EventId.is_in(event_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.event_id, a))
        .collect();

    let mut answered: HashMap<i32, usize> = HashMap::new();
    let mut lucky_hits: HashMap<i32, usize> = HashMap::new();
    for (session_id, is_lucky, first_try_correct) in answers {
        let Some(event_id) = session_event.get(&session_id) else {
            continue;
        };
        *answered.entry(*event_id).or_default() += 1;
        if is_lucky && first_try_correct {
            *lucky_hits.entry(*event_id).or_default() += 1;
        }
    }

    let total = quiz.questions_per_event();
    let progress = events
        .into_iter()
        .map(|event| {
            let own: Vec<&quiz_session::Model> =
                sessions.iter().filter(|s| s.event_id == event.id).collect();
            let completed_rounds = own
                .iter()
                .filter(|s| s.status == SessionStatus::Completed)
                .count() as u32;
            let active_session_id = own
                .iter()
                .find(|s| s.status == SessionStatus::InProgress)
                .map(|s| s.id);
            let answered = answered.get(&event.id).copied().unwrap_or(0);

            EventProgress {
                completed_rounds,
                active_session_id,
                answered,
                lucky_first_try_correct: lucky_hits.get(&event.id).copied().unwrap_or(0),
                award: awards.remove(&event.id),
                call_to_action: call_to_action(
                    event_window(event.start_time, event.end_time, now),
                    active_session_id.is_some(),
                    completed_rounds,
                    quiz.max_rounds,
                ),
                percent_complete: percent_complete(answered, total),
                event,
            }
        })
        .collect();

    Ok(progress)
}
