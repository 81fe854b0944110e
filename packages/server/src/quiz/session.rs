//! Quiz session lifecycle: start, answer, complete, cancel.
//!
//! A session moves from `in_progress` to `completed`; cancelling deletes it.
//! Every mutation takes a row lock on the session first, and answer
//! submission runs in one SERIALIZABLE transaction together with question
//! selection and any prize allocation it triggers.

use std::collections::HashSet;

use chrono::Utc;
use common::retry::RetryPolicy;
use common::selector::{self, Candidate, Selection, SelectionError, SelectorRules, Served};
use common::{QuestionCategory, SessionStatus};
use sea_orm::*;
use tracing::{debug, info, instrument};

use crate::config::AppConfig;
use crate::entity::prize_award::AwardSource;
use crate::entity::{answer, question, quiz_session};
use crate::error::AppError;
use crate::quiz::prize::{self, AwardOutcome};
use crate::quiz::txn;
use crate::utils::event::{find_event, require_event_open};

#[derive(Clone, Debug)]
pub struct StartedSession {
    pub session: quiz_session::Model,
    pub question: question::Model,
}

#[derive(Clone, Debug)]
pub struct SubmitAnswer {
    pub question_id: i32,
    pub value: serde_json::Value,
    pub elapsed_seconds: i32,
}

#[derive(Clone, Debug)]
pub struct AnswerOutcome {
    pub answer: answer::Model,
    /// The question that was answered.
    pub question: question::Model,
    pub next_question: Option<question::Model>,
    /// All questions of the session have been answered.
    pub session_complete: bool,
    /// Present when a first-try-correct lucky-draw answer ran the allocator.
    pub prize: Option<AwardOutcome>,
}

#[derive(Clone, Debug)]
pub struct SessionView {
    pub session: quiz_session::Model,
    pub answers: Vec<answer::Model>,
    pub current_question: Option<question::Model>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub session: quiz_session::Model,
    pub answered: usize,
    pub correct: usize,
    pub first_try_correct: usize,
    pub lucky_seen: usize,
    pub lucky_first_try_correct: usize,
}

impl SessionSummary {
    fn new(session: quiz_session::Model, answers: &[answer::Model]) -> Self {
        Self {
            session,
            answered: answers.len(),
            correct: answers.iter().filter(|a| a.is_correct).count(),
            first_try_correct: answers.iter().filter(|a| a.first_attempt_correct).count(),
            lucky_seen: answers.iter().filter(|a| a.is_lucky).count(),
            lucky_first_try_correct: answers
                .iter()
                .filter(|a| a.is_lucky && a.first_attempt_correct)
                .count(),
        }
    }
}

pub struct SessionService<'a> {
    db: &'a DatabaseConnection,
    rules: SelectorRules,
    max_rounds: u32,
    retry: RetryPolicy,
}

impl<'a> SessionService<'a> {
    pub fn new(db: &'a DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            db,
            rules: config.quiz.selector_rules(),
            max_rounds: config.quiz.max_rounds,
            retry: config.prize.retry_policy(),
        }
    }

    /// Open the next round for the user and serve its first question.
    #[instrument(skip(self))]
    pub async fn start(&self, user_id: &str, event_id: i32) -> Result<StartedSession, AppError> {
        let rules = self.rules;
        let max_rounds = self.max_rounds;
        txn::serializable(self.db, &self.retry, "start_session", |txn| {
            let user_id = user_id.to_owned();
            Box::pin(async move { start_in_txn(txn, rules, max_rounds, &user_id, event_id).await })
        })
        .await
    }

    /// Record an answer, select the next question and run the prize draw when
    /// the answer qualifies.
    #[instrument(skip(self, submission), fields(question_id = submission.question_id))]
    pub async fn submit(
        &self,
        user_id: &str,
        session_id: i32,
        submission: SubmitAnswer,
    ) -> Result<AnswerOutcome, AppError> {
        let rules = self.rules;
        txn::serializable(self.db, &self.retry, "submit_answer", |txn| {
            let user_id = user_id.to_owned();
            let submission = submission.clone();
            Box::pin(async move { submit_in_txn(txn, rules, &user_id, session_id, submission).await })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: &str, session_id: i32) -> Result<SessionView, AppError> {
        let session = quiz_session::Entity::find_by_id(session_id)
            .one(self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".into()))?;
        ensure_owner(&session, user_id)?;

        let answers = session_answers(self.db, session.id).await?;
        let current_question = match session.current_question_id {
            Some(id) => question::Entity::find_by_id(id).one(self.db).await?,
            None => None,
        };

        Ok(SessionView {
            session,
            answers,
            current_question,
        })
    }

    /// Close a session once every question has been answered.
    #[instrument(skip(self))]
    pub async fn complete(&self, user_id: &str, session_id: i32) -> Result<SessionSummary, AppError> {
        let txn = self.db.begin().await?;

        let session = find_session_for_update(&txn, session_id).await?;
        ensure_owner(&session, user_id)?;
        ensure_in_progress(&session)?;

        let answers = session_answers(&txn, session.id).await?;
        if answers.len() != self.rules.questions_per_session {
            return Err(AppError::SessionState(format!(
                "Session has {} of {} answers",
                answers.len(),
                self.rules.questions_per_session
            )));
        }

        let mut active: quiz_session::ActiveModel = session.into();
        active.status = Set(SessionStatus::Completed);
        active.completed_at = Set(Some(Utc::now()));
        active.current_question_id = Set(None);
        let session = active.update(&txn).await?;

        txn.commit().await?;

        info!(session_id, round = session.round, "Session completed");
        Ok(SessionSummary::new(session, &answers))
    }

    /// Abandon an in-progress session. The session and its answers are
    /// deleted, so the round number becomes available again.
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: &str, session_id: i32) -> Result<(), AppError> {
        let txn = self.db.begin().await?;

        let session = find_session_for_update(&txn, session_id).await?;
        ensure_owner(&session, user_id)?;
        ensure_in_progress(&session)?;

        let removed = answer::Entity::delete_many()
            .filter(answer::Column::SessionId.eq(session.id))
            .exec(&txn)
            .await?
            .rows_affected;
        quiz_session::Entity::delete_by_id(session.id)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(session_id, removed_answers = removed, "Session cancelled");
        Ok(())
    }
}

async fn start_in_txn<C: ConnectionTrait>(
    conn: &C,
    rules: SelectorRules,
    max_rounds: u32,
    user_id: &str,
    event_id: i32,
) -> Result<StartedSession, AppError> {
    let now = Utc::now();
    let event = find_event(conn, event_id).await?;
    require_event_open(&event, now)?;

    let sessions = user_sessions(conn, user_id, event_id).await?;
    if let Some(active) = sessions
        .iter()
        .find(|s| s.status == SessionStatus::InProgress)
    {
        return Err(AppError::SessionInProgress {
            session_id: active.id,
        });
    }

    let completed = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .count();
    if completed >= max_rounds as usize {
        return Err(AppError::RoundLimitReached { max_rounds });
    }

    let asked = asked_question_ids(conn, &sessions).await?;
    let pool = remaining_pool(conn, event_id, &asked).await?;
    let candidates = to_candidates(&pool);
    if !selector::can_fill_session(&rules, &candidates) {
        return Err(AppError::InsufficientQuestions {
            available: candidates
                .iter()
                .filter(|c| c.category == QuestionCategory::Normal)
                .count(),
            required: rules.questions_per_session,
        });
    }

    let first = match select(&rules, &[], &candidates)? {
        Selection::Next(c) => take_question(pool, c.id)?,
        Selection::SessionComplete => {
            return Err(AppError::Internal(
                "selector closed an empty session".into(),
            ));
        }
    };

    let round = i32::try_from(completed + 1)
        .map_err(|_| AppError::Internal("round number out of range".into()))?;

    let session = quiz_session::ActiveModel {
        user_id: Set(user_id.to_owned()),
        event_id: Set(event_id),
        round: Set(round),
        status: Set(SessionStatus::InProgress),
        current_question_id: Set(Some(first.id)),
        started_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("A session for this round already exists".into())
        }
        _ => AppError::Database(e),
    })?;

    info!(
        session_id = session.id,
        event_id,
        round,
        "Session started"
    );

    Ok(StartedSession {
        session,
        question: first,
    })
}

async fn submit_in_txn<C: ConnectionTrait>(
    conn: &C,
    rules: SelectorRules,
    user_id: &str,
    session_id: i32,
    submission: SubmitAnswer,
) -> Result<AnswerOutcome, AppError> {
    let session = find_session_for_update(conn, session_id).await?;
    ensure_owner(&session, user_id)?;
    ensure_in_progress(&session)?;

    let question = question::Entity::find_by_id(submission.question_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".into()))?;

    let answers = session_answers(conn, session.id).await?;
    let is_correct = question
        .question_type
        .is_correct(&submission.value, &question.correct_answer);
    let now = Utc::now();

    if let Some(previous) = answers.iter().find(|a| a.question_id == question.id) {
        let attempt_number = previous.attempt_number + 1;
        let mut active: answer::ActiveModel = previous.clone().into();
        active.value = Set(submission.value);
        active.is_correct = Set(is_correct);
        active.attempt_number = Set(attempt_number);
        active.elapsed_seconds = Set(submission.elapsed_seconds);
        active.updated_at = Set(now);
        let answer = active.update(conn).await?;

        debug!(session_id, question_id = question.id, attempt_number, "Answer resubmitted");

        let next_question = match session.current_question_id {
            Some(id) => question::Entity::find_by_id(id).one(conn).await?,
            None => None,
        };
        return Ok(AnswerOutcome {
            answer,
            question,
            next_question,
            session_complete: answers.len() >= rules.questions_per_session,
            prize: None,
        });
    }

    if session.current_question_id != Some(question.id) {
        return Err(AppError::Validation(
            "Question was not served in this session".into(),
        ));
    }

    let answer = answer::ActiveModel {
        session_id: Set(session.id),
        question_id: Set(question.id),
        value: Set(submission.value),
        is_correct: Set(is_correct),
        first_attempt_correct: Set(is_correct),
        attempt_number: Set(1),
        elapsed_seconds: Set(submission.elapsed_seconds),
        is_lucky: Set(question.category.is_lucky()),
        answered_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let mut history: Vec<Served> = answers.iter().map(served).collect();
    history.push(served(&answer));

    let next_question = if history.len() >= rules.questions_per_session {
        None
    } else {
        let sessions = user_sessions(conn, user_id, session.event_id).await?;
        let asked = asked_question_ids(conn, &sessions).await?;
        let pool = remaining_pool(conn, session.event_id, &asked).await?;
        match select(&rules, &history, &to_candidates(&pool))? {
            Selection::Next(c) => Some(take_question(pool, c.id)?),
            Selection::SessionComplete => None,
        }
    };

    let event_id = session.event_id;
    let mut active: quiz_session::ActiveModel = session.into();
    active.current_question_id = Set(next_question.as_ref().map(|q| q.id));
    active.update(conn).await?;

    let prize = if question.category.is_lucky() && is_correct {
        Some(prize::award_in_txn(conn, event_id, user_id, AwardSource::Instant).await?)
    } else {
        None
    };

    debug!(
        session_id,
        question_id = question.id,
        is_correct,
        answered = history.len(),
        "Answer recorded"
    );

    Ok(AnswerOutcome {
        answer,
        question,
        next_question,
        session_complete: history.len() >= rules.questions_per_session,
        prize,
    })
}

fn select(
    rules: &SelectorRules,
    history: &[Served],
    candidates: &[Candidate],
) -> Result<Selection, SelectionError> {
    let mut rng = rand::rng();
    selector::select_next(rules, history, candidates, &mut rng)
}

fn served(answer: &answer::Model) -> Served {
    Served {
        question_id: answer.question_id,
        category: if answer.is_lucky {
            QuestionCategory::Lucky
        } else {
            QuestionCategory::Normal
        },
        first_try_correct: answer.first_attempt_correct,
    }
}

fn to_candidates(pool: &[question::Model]) -> Vec<Candidate> {
    pool.iter()
        .map(|q| Candidate {
            id: q.id,
            category: q.category,
        })
        .collect()
}

fn take_question(pool: Vec<question::Model>, id: i32) -> Result<question::Model, AppError> {
    pool.into_iter()
        .find(|q| q.id == id)
        .ok_or_else(|| AppError::Internal(format!("selected question {id} missing from pool")))
}

fn ensure_owner(session: &quiz_session::Model, user_id: &str) -> Result<(), AppError> {
    if session.user_id == user_id {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

fn ensure_in_progress(session: &quiz_session::Model) -> Result<(), AppError> {
    if session.status == SessionStatus::InProgress {
        Ok(())
    } else {
        Err(AppError::SessionState(format!(
            "Session is {}",
            session.status
        )))
    }
}

async fn find_session_for_update<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<quiz_session::Model, AppError> {
    quiz_session::Entity::find_by_id(id)
        .lock(sea_query::LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".into()))
}

/// Answers of a session in the order their questions were served.
async fn session_answers<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
) -> Result<Vec<answer::Model>, DbErr> {
    answer::Entity::find()
        .filter(answer::Column::SessionId.eq(session_id))
        .order_by_asc(answer::Column::Id)
        .all(conn)
        .await
}

async fn user_sessions<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    event_id: i32,
) -> Result<Vec<quiz_session::Model>, DbErr> {
    quiz_session::Entity::find()
        .filter(quiz_session::Column::UserId.eq(user_id))
        .filter(quiz_session::Column::EventId.eq(event_id))
        .order_by_asc(quiz_session::Column::Round)
        .all(conn)
        .await
}

/// Every question the user has been served in the event, answered or pending.
async fn asked_question_ids<C: ConnectionTrait>(
    conn: &C,
    sessions: &[quiz_session::Model],
) -> Result<HashSet<i32>, DbErr> {
    let mut asked: HashSet<i32> = sessions
        .iter()
        .filter_map(|s| s.current_question_id)
        .collect();

    let session_ids: Vec<i32> = sessions.iter().map(|s| s.id).collect();
    if !session_ids.is_empty() {
        let answered: Vec<i32> = answer::Entity::find()
            .select_only()
            .column(answer::Column::QuestionId)
            .filter(answer::Column::SessionId.is_in(session_ids))
            .into_tuple()
            .all(conn)
            .await?;
        asked.extend(answered);
    }

    Ok(asked)
}

async fn remaining_pool<C: ConnectionTrait>(
    conn: &C,
    event_id: i32,
    asked: &HashSet<i32>,
) -> Result<Vec<question::Model>, DbErr> {
    let questions = question::Entity::find()
        .filter(question::Column::EventId.eq(event_id))
        .order_by_asc(question::Column::Id)
        .all(conn)
        .await?;
    Ok(questions
        .into_iter()
        .filter(|q| !asked.contains(&q.id))
        .collect())
}
