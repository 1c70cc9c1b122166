use moviecore_types::{Operation, StoreError};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use crate::map_sqlx_error;

/// A database transaction that rolls back unless explicitly committed.
///
/// Dropping the guard before [`commit`](Self::commit) (early return on an
/// error, a panic, or a cancelled future) discards every statement issued
/// through it.
pub(crate) struct ScopedTransaction {
    tx: Transaction<'static, Postgres>,
    rollback_notice: RollbackNotice,
}

/// Logs the rollback of a transaction that was never committed.
struct RollbackNotice {
    operation: Operation,
    armed: bool,
}

impl Drop for RollbackNotice {
    fn drop(&mut self) {
        if self.armed {
            debug!(
                operation = %self.operation,
                "[postgres.transaction] rolling back uncommitted transaction"
            );
        }
    }
}

impl ScopedTransaction {
    pub(crate) async fn begin(pool: &PgPool, operation: Operation) -> Result<Self, StoreError> {
        let tx = pool
            .begin()
            .await
            .map_err(|error| map_sqlx_error(error, Operation::BeginTransaction))?;

        Ok(Self {
            tx,
            rollback_notice: RollbackNotice {
                operation,
                armed: true,
            },
        })
    }

    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub(crate) async fn commit(self) -> Result<(), StoreError> {
        let Self {
            tx,
            mut rollback_notice,
        } = self;

        tx.commit()
            .await
            .map_err(|error| map_sqlx_error(error, Operation::CommitTransaction))?;
        rollback_notice.armed = false;
        Ok(())
    }
}
