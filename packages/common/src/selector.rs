//! Next-question selection for a quiz session.
//!
//! The selector is pure: callers hand it the session history, the candidate pool
//! (already stripped of everything the user has been asked in this event) and a
//! random source. Persistence and locking live with the caller.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::question::QuestionCategory;

/// Tunables for question selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRules {
    /// Questions served per session.
    pub questions_per_session: usize,
    /// First-try-correct answers needed before lucky-draw questions unlock.
    pub unlock_threshold: usize,
    /// Chance (0-100) of preferring a lucky-draw question once unlocked.
    pub lucky_weight_percent: u8,
}

impl Default for SelectorRules {
    fn default() -> Self {
        Self {
            questions_per_session: 5,
            unlock_threshold: 3,
            lucky_weight_percent: 40,
        }
    }
}

/// A question that may still be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub id: i32,
    pub category: QuestionCategory,
}

/// A question already served in the current session, in serving order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Served {
    pub question_id: i32,
    pub category: QuestionCategory,
    /// Whether the first submitted attempt was correct.
    pub first_try_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Next(Candidate),
    /// The session already holds its full set of questions.
    SessionComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error(
        "no eligible question left (normal: {normal_left}, lucky: {lucky_left}, lucky unlocked: {unlocked})"
    )]
    PoolExhausted {
        normal_left: usize,
        lucky_left: usize,
        unlocked: bool,
    },
}

/// Whether a fresh session can be filled without relying on lucky-draw questions.
pub fn can_fill_session(rules: &SelectorRules, pool: &[Candidate]) -> bool {
    pool.iter()
        .filter(|c| c.category == QuestionCategory::Normal)
        .count()
        >= rules.questions_per_session
}

/// Pick the next question for a session.
///
/// Lucky-draw questions stay locked until `unlock_threshold` answers in this
/// session were correct on the first try, and two are never served back to back
/// while a normal question is available.
pub fn select_next<R: Rng + ?Sized>(
    rules: &SelectorRules,
    history: &[Served],
    pool: &[Candidate],
    rng: &mut R,
) -> Result<Selection, SelectionError> {
    if history.len() >= rules.questions_per_session {
        return Ok(Selection::SessionComplete);
    }

    let served: HashSet<i32> = history.iter().map(|s| s.question_id).collect();
    let (lucky, normal): (Vec<Candidate>, Vec<Candidate>) = pool
        .iter()
        .filter(|c| !served.contains(&c.id))
        .partition(|c| c.category.is_lucky());

    let first_try_correct = history.iter().filter(|s| s.first_try_correct).count();
    let unlocked = first_try_correct >= rules.unlock_threshold;
    let previous_was_lucky = history.last().is_some_and(|s| s.category.is_lucky());

    let prefer_lucky = unlocked
        && !previous_was_lucky
        && rng.random_ratio(u32::from(rules.lucky_weight_percent.min(100)), 100);

    let picked = if prefer_lucky {
        match lucky.choose(rng) {
            Some(c) => Some(*c),
            None => {
                debug!("Lucky pool empty, falling back to normal");
                normal.choose(rng).copied()
            }
        }
    } else {
        match normal.choose(rng) {
            Some(c) => Some(*c),
            // Only a normal-exhausted pool may break the back-to-back rule.
            None if unlocked => {
                debug!(previous_was_lucky, "Normal pool empty, falling back to lucky");
                lucky.choose(rng).copied()
            }
            None => None,
        }
    };

    picked
        .map(Selection::Next)
        .ok_or(SelectionError::PoolExhausted {
            normal_left: normal.len(),
            lucky_left: lucky.len(),
            unlocked,
        })
}
