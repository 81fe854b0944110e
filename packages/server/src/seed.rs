use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::{answer, prize_award, question, quiz_session};

/// Ensure required database indexes exist.
///
/// Schema sync creates tables and single-column indexes only, so the
/// composite keys that back the quiz invariants are created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // One answer row per question per session; resubmissions update it.
    create_index(
        db,
        "idx_answer_session_question",
        Index::create()
            .unique()
            .table(answer::Entity)
            .col(answer::Column::SessionId)
            .col(answer::Column::QuestionId)
            .to_owned(),
    )
    .await?;

    // A round number is used at most once per user and event.
    create_index(
        db,
        "idx_quiz_session_user_event_round",
        Index::create()
            .unique()
            .table(quiz_session::Entity)
            .col(quiz_session::Column::UserId)
            .col(quiz_session::Column::EventId)
            .col(quiz_session::Column::Round)
            .to_owned(),
    )
    .await?;

    // At most one prize per user per event.
    create_index(
        db,
        "idx_prize_award_event_user",
        Index::create()
            .unique()
            .table(prize_award::Entity)
            .col(prize_award::Column::EventId)
            .col(prize_award::Column::UserId)
            .to_owned(),
    )
    .await?;

    // Pool lookups: SELECT ... FROM question WHERE event_id = ?
    create_index(
        db,
        "idx_question_event_category",
        Index::create()
            .table(question::Entity)
            .col(question::Column::EventId)
            .col(question::Column::Category)
            .to_owned(),
    )
    .await?;

    Ok(())
}

async fn create_index(
    db: &DatabaseConnection,
    name: &str,
    mut stmt: IndexCreateStatement,
) -> Result<(), DbErr> {
    let sql = stmt
        .if_not_exists()
        .name(name)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&sql).await?;
    info!("Ensured index {} exists", name);
    Ok(())
}
