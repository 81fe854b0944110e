//! Quota-bounded prize allocation.
//!
//! Every award path locks the event row first and then counts existing
//! awards inside a SERIALIZABLE transaction, so the per-event cap holds under
//! any number of concurrent callers.

use std::collections::HashSet;

use chrono::Utc;
use common::retry::RetryPolicy;
use rand::Rng;
use rand::seq::SliceRandom;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::entity::event::{self, DrawMode};
use crate::entity::prize_award::{self, AwardSource};
use crate::entity::{answer, quiz_session};
use crate::error::AppError;
use crate::quiz::txn;
use crate::utils::event::{find_event, find_event_for_update};

/// Why a qualifying answer did not produce a prize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotWonReason {
    /// The event already has `max_winners` awards.
    QuotaExhausted,
    /// The user already holds a prize for this event.
    AlreadyAwarded,
    /// The event draws by chance and this draw missed.
    RandomMiss,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AwardOutcome {
    Won(prize_award::Model),
    NotWon(NotWonReason),
}

#[derive(Clone, Debug)]
pub struct BulkDrawOutcome {
    pub requested: u64,
    pub awarded: Vec<prize_award::Model>,
    /// Free slots left after this draw.
    pub remaining_slots: u64,
}

/// Quota-aware award service.
pub struct PrizeAllocator<'a> {
    db: &'a DatabaseConnection,
    retry: RetryPolicy,
}

impl<'a> PrizeAllocator<'a> {
    pub fn new(db: &'a DatabaseConnection, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    /// Try to award the event's prize to `user_id` in its own transaction.
    #[instrument(skip(self))]
    pub async fn try_award(&self, event_id: i32, user_id: &str) -> Result<AwardOutcome, AppError> {
        txn::serializable(self.db, &self.retry, "try_award", |txn| {
            let user_id = user_id.to_owned();
            Box::pin(async move {
                award_in_txn(txn, event_id, &user_id, AwardSource::Instant).await
            })
        })
        .await
    }

    /// Award up to `count` prizes to randomly chosen qualified users who do not
    /// hold one yet. The count is clamped to the free slots.
    #[instrument(skip(self))]
    pub async fn bulk_draw(&self, event_id: i32, count: u64) -> Result<BulkDrawOutcome, AppError> {
        txn::serializable(self.db, &self.retry, "bulk_draw", |txn| {
            Box::pin(async move { bulk_draw_in_txn(txn, event_id, count).await })
        })
        .await
    }

    /// All awards for an event, oldest first.
    pub async fn list_for_event(&self, event_id: i32) -> Result<Vec<prize_award::Model>, AppError> {
        find_event(self.db, event_id).await?;
        let awards = prize_award::Entity::find()
            .filter(prize_award::Column::EventId.eq(event_id))
            .order_by_asc(prize_award::Column::WonAt)
            .order_by_asc(prize_award::Column::Id)
            .all(self.db)
            .await?;
        Ok(awards)
    }

    /// Awards won by a user across all events, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<prize_award::Model>, AppError> {
        let awards = prize_award::Entity::find()
            .filter(prize_award::Column::UserId.eq(user_id))
            .order_by_desc(prize_award::Column::WonAt)
            .all(self.db)
            .await?;
        Ok(awards)
    }

    /// Mark an award as claimed by its owner. Claiming twice is a conflict.
    #[instrument(skip(self))]
    pub async fn claim(&self, award_id: i32, user_id: &str) -> Result<prize_award::Model, AppError> {
        let txn = self.db.begin().await?;

        let award = prize_award::Entity::find_by_id(award_id)
            .lock(sea_query::LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Prize not found".into()))?;

        if award.user_id != user_id {
            return Err(AppError::PermissionDenied);
        }
        if award.claimed {
            return Err(AppError::Conflict("Prize has already been claimed".into()));
        }

        let mut active: prize_award::ActiveModel = award.into();
        active.claimed = Set(true);
        active.claimed_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        info!(award_id, "Prize claimed");
        Ok(updated)
    }
}

fn quota(event: &event::Model) -> u64 {
    u64::try_from(event.max_winners).unwrap_or(0)
}

async fn count_awards<C: ConnectionTrait>(conn: &C, event_id: i32) -> Result<u64, DbErr> {
    prize_award::Entity::find()
        .filter(prize_award::Column::EventId.eq(event_id))
        .count(conn)
        .await
}

fn draw_hits(event: &event::Model) -> bool {
    match event.draw_mode {
        DrawMode::Always => true,
        DrawMode::Chance => {
            let percent = u32::try_from(event.win_rate_percent.clamp(0, 100)).unwrap_or(0);
            rand::rng().random_ratio(percent, 100)
        }
    }
}

/// Single-award step. Must run inside a SERIALIZABLE transaction; the event
/// row lock is the first statement so concurrent callers queue behind it.
pub async fn award_in_txn<C: ConnectionTrait>(
    conn: &C,
    event_id: i32,
    user_id: &str,
    source: AwardSource,
) -> Result<AwardOutcome, AppError> {
    let event = find_event_for_update(conn, event_id).await?;

    let awarded = count_awards(conn, event_id).await?;
    if awarded >= quota(&event) {
        debug!(event_id, awarded, "Prize quota exhausted");
        return Ok(AwardOutcome::NotWon(NotWonReason::QuotaExhausted));
    }

    let existing = prize_award::Entity::find()
        .filter(prize_award::Column::EventId.eq(event_id))
        .filter(prize_award::Column::UserId.eq(user_id))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Ok(AwardOutcome::NotWon(NotWonReason::AlreadyAwarded));
    }

    if !draw_hits(&event) {
        return Ok(AwardOutcome::NotWon(NotWonReason::RandomMiss));
    }

    let award = prize_award::ActiveModel {
        event_id: Set(event_id),
        user_id: Set(user_id.to_owned()),
        prize_label: Set(event.prize_label.clone()),
        source: Set(source),
        claimed: Set(false),
        won_at: Set(Utc::now()),
        claimed_at: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    info!(event_id, user_id, award_id = award.id, "Prize awarded");
    Ok(AwardOutcome::Won(award))
}

/// Users with at least one first-try-correct lucky-draw answer in the event.
async fn qualified_users<C: ConnectionTrait>(conn: &C, event_id: i32) -> Result<Vec<String>, DbErr> {
    quiz_session::Entity::find()
        .select_only()
        .column(quiz_session::Column::UserId)
        .distinct()
        .filter(quiz_session::Column::EventId.eq(event_id))
        .filter(
            quiz_session::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(answer::Column::SessionId)
                    .from(answer::Entity)
                    .and_where(answer::Column::IsLucky.eq(true))
                    .and_where(answer::Column::FirstAttemptCorrect.eq(true))
                    .to_owned(),
            ),
        )
        .order_by_asc(quiz_session::Column::UserId)
        .into_tuple()
        .all(conn)
        .await
}

async fn bulk_draw_in_txn<C: ConnectionTrait>(
    conn: &C,
    event_id: i32,
    requested: u64,
) -> Result<BulkDrawOutcome, AppError> {
    let event = find_event_for_update(conn, event_id).await?;

    let awarded = count_awards(conn, event_id).await?;
    let free = quota(&event).saturating_sub(awarded);
    let slots = std::cmp::Ord::min(requested, free);

    let holders: HashSet<String> = prize_award::Entity::find()
        .select_only()
        .column(prize_award::Column::UserId)
        .filter(prize_award::Column::EventId.eq(event_id))
        .into_tuple::<String>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let mut eligible: Vec<String> = qualified_users(conn, event_id)
        .await?
        .into_iter()
        .filter(|user_id| !holders.contains(user_id))
        .collect();

    {
        let mut rng = rand::rng();
        eligible.shuffle(&mut rng);
    }
    eligible.truncate(usize::try_from(slots).unwrap_or(usize::MAX));

    let now = Utc::now();
    let mut winners = Vec::with_capacity(eligible.len());
    for user_id in eligible {
        let award = prize_award::ActiveModel {
            event_id: Set(event_id),
            user_id: Set(user_id),
            prize_label: Set(event.prize_label.clone()),
            source: Set(AwardSource::BulkDraw),
            claimed: Set(false),
            won_at: Set(now),
            claimed_at: Set(None),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        winners.push(award);
    }

    let remaining_slots = free - winners.len() as u64;
    info!(
        event_id,
        requested,
        awarded = winners.len(),
        remaining_slots,
        "Bulk draw finished"
    );

    Ok(BulkDrawOutcome {
        requested,
        awarded: winners,
        remaining_slots,
    })
}
