use common::SessionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quiz_session")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Opaque subject id from the bearer token.
    #[sea_orm(indexed)]
    pub user_id: String,

    pub event_id: i32,
    #[sea_orm(belongs_to, from = "event_id", to = "id")]
    pub event: HasOne<super::event::Entity>,

    /// 1-based attempt number within the event; unique per (user, event).
    pub round: i32,
    pub status: SessionStatus,

    /// Question served but not yet answered.
    pub current_question_id: Option<i32>,

    #[sea_orm(has_many)]
    pub answers: HasMany<super::answer::Entity>,

    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
