use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a first-try-correct lucky-draw answer turns into a prize.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// Every qualifying answer wins while slots remain.
    #[sea_orm(string_value = "always")]
    Always,
    /// Qualifying answers win with `win_rate_percent` probability.
    #[sea_orm(string_value = "chance")]
    Chance,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub description: String,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    pub is_active: bool,

    /// Hard cap on prize awards for this event.
    #[sea_orm(default_value = 10)]
    pub max_winners: i32,
    pub prize_label: String,
    pub draw_mode: DrawMode,
    #[sea_orm(default_value = 100)]
    pub win_rate_percent: i32,

    #[sea_orm(has_many)]
    pub questions: HasMany<super::question::Entity>,

    #[sea_orm(has_many)]
    pub sessions: HasMany<super::quiz_session::Entity>,

    #[sea_orm(has_many)]
    pub prize_awards: HasMany<super::prize_award::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
