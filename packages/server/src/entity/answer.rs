use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "answer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub session_id: i32,
    #[sea_orm(belongs_to, from = "session_id", to = "id")]
    pub session: HasOne<super::quiz_session::Entity>,

    pub question_id: i32,
    #[sea_orm(belongs_to, from = "question_id", to = "id")]
    pub question: HasOne<super::question::Entity>,

    /// Latest submitted value.
    #[sea_orm(column_type = "JsonBinary")]
    pub value: Json,
    /// Correctness of the latest submission.
    pub is_correct: bool,
    /// Correctness of the first submission. Written once.
    pub first_attempt_correct: bool,
    pub attempt_number: i32,
    pub elapsed_seconds: i32,
    pub is_lucky: bool,

    pub answered_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
