use common::{QuestionCategory, QuestionType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub event_id: i32,
    #[sea_orm(belongs_to, from = "event_id", to = "id")]
    pub event: HasOne<super::event::Entity>,

    pub question_type: QuestionType,
    pub category: QuestionCategory,
    pub prompt: String,

    /// Answer choices shown to the user; empty for free text.
    #[sea_orm(column_type = "JsonBinary")]
    pub options: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub correct_answer: Json,
    #[sea_orm(column_type = "Text")]
    pub explanation: Option<String>,

    #[sea_orm(has_many)]
    pub answers: HasMany<super::answer::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
