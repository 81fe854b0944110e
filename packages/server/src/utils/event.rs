use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect, sea_query::LockType};

use crate::entity::event;
use crate::error::AppError;

/// Where an event sits relative to its time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventWindow {
    Upcoming,
    Open,
    Ended,
}

pub fn event_window(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> EventWindow {
    if now < start_time {
        EventWindow::Upcoming
    } else if now >= end_time {
        EventWindow::Ended
    } else {
        EventWindow::Open
    }
}

/// Look up an event by ID, returning 404 if not found.
pub async fn find_event<C: ConnectionTrait>(db: &C, id: i32) -> Result<event::Model, AppError> {
    event::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

/// Look up an event and take a row lock on it until the transaction ends.
pub async fn find_event_for_update<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<event::Model, AppError> {
    event::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

/// Check that new sessions may be started for the event right now.
pub fn require_event_open(event: &event::Model, now: DateTime<Utc>) -> Result<(), AppError> {
    check_open(
        event.is_active,
        event_window(event.start_time, event.end_time, now),
    )
}

fn check_open(is_active: bool, window: EventWindow) -> Result<(), AppError> {
    if !is_active {
        return Err(AppError::EventInactive("Event is not active".into()));
    }
    match window {
        EventWindow::Upcoming => Err(AppError::EventInactive("Event has not started yet".into())),
        EventWindow::Ended => Err(AppError::EventInactive("Event has ended".into())),
        EventWindow::Open => Ok(()),
    }
}
