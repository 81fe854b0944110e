//! Serializable transactions with bounded retry on serialization failures.

use std::future::Future;
use std::pin::Pin;

use common::retry::RetryPolicy;
use sea_orm::{
    DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel, RuntimeErr, TransactionTrait,
};
use tracing::{debug, warn};

use crate::error::AppError;

/// SQLSTATE raised when a serializable transaction loses a conflict.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

pub type TxnFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'c>>;

/// Whether the database rejected the transaction in a way that a clean retry can fix.
pub fn is_retryable(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return false,
    };
    match runtime {
        RuntimeErr::SqlxError(e) => e
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .is_some_and(|code| code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED),
        _ => false,
    }
}

/// Run `op` in a fresh SERIALIZABLE transaction, retrying the whole closure
/// when Postgres reports a serialization failure or deadlock.
///
/// `op` may run several times, so it must not have side effects outside the
/// transaction. Once the budget is spent the caller gets [`AppError::Contention`].
pub async fn serializable<T, F>(
    db: &DatabaseConnection,
    policy: &RetryPolicy,
    op_name: &'static str,
    mut op: F,
) -> Result<T, AppError>
where
    F: for<'c> FnMut(&'c DatabaseTransaction) -> TxnFuture<'c, T>,
{
    let mut attempt: u8 = 0;
    loop {
        attempt = attempt.saturating_add(1);

        let outcome = match db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
        {
            Ok(txn) => run_once(txn, &mut op).await,
            Err(err) => Err(AppError::Database(err)),
        };

        match outcome {
            Err(AppError::Database(ref err)) if is_retryable(err) => {
                if !policy.allows_retry_after(attempt) {
                    warn!(op = op_name, attempt, "Serialization retries exhausted");
                    return Err(AppError::Contention);
                }
                let delay = policy.delay_after(attempt);
                debug!(op = op_name, attempt, ?delay, "Serialization conflict, retrying");
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

async fn run_once<T, F>(txn: DatabaseTransaction, op: &mut F) -> Result<T, AppError>
where
    F: for<'c> FnMut(&'c DatabaseTransaction) -> TxnFuture<'c, T>,
{
    let result = op(&txn).await;
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                debug!("Rollback after failed attempt errored: {}", rollback_err);
            }
            Err(err)
        }
    }
}
