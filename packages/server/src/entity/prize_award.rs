use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where an award came from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum AwardSource {
    /// Won while answering a lucky-draw question.
    #[sea_orm(string_value = "instant")]
    Instant,
    /// Picked by an operator-triggered draw.
    #[sea_orm(string_value = "bulk_draw")]
    BulkDraw,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prize_award")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub event_id: i32,
    #[sea_orm(belongs_to, from = "event_id", to = "id")]
    pub event: HasOne<super::event::Entity>,

    #[sea_orm(indexed)]
    pub user_id: String,
    pub prize_label: String,
    pub source: AwardSource,
    #[sea_orm(default_value = false)]
    pub claimed: bool,

    pub won_at: DateTimeUtc,
    pub claimed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
