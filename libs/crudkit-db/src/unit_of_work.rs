//! Caller-owned units of work.
//!
//! `CrudBase` never commits on its own except in `create_multi`; to span
//! several operations, run them against the transaction handed out here.

use std::future::Future;
use std::pin::Pin;

use sea_orm::{DatabaseTransaction, TransactionError, TransactionTrait};

use crate::error::CrudError;

/// Run `f` inside a transaction on `db`.
///
/// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
///
/// ```ignore
/// let (user, audit) = in_transaction(&db, move |tx| Box::pin(async move {
///     let user = users.create(tx, input).await?;
///     let audit = audits.create(tx, entry_for(&user)).await?;
///     Ok((user, audit))
/// }))
/// .await?;
/// ```
///
/// # Errors
/// Returns the error produced by `f`, or `CrudError` if the transaction could
/// not be started or committed.
pub async fn in_transaction<C, T, F>(db: &C, f: F) -> Result<T, CrudError>
where
    C: TransactionTrait,
    T: Send,
    F: for<'c> FnOnce(
            &'c DatabaseTransaction,
        ) -> Pin<Box<dyn Future<Output = Result<T, CrudError>> + Send + 'c>>
        + Send,
{
    db.transaction::<_, T, CrudError>(f)
        .await
        .map_err(|e| match e {
            TransactionError::Transaction(err) => {
                tracing::debug!(error = %err, "transaction rolled back");
                err
            }
            TransactionError::Connection(db_err) => CrudError::from(db_err),
        })
}
