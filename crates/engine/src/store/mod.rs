//! Stateless repositories over the sea-orm entities.
//!
//! Every function is generic over [`sea_orm::ConnectionTrait`], so the same
//! code runs against the pool for reads and against an open transaction for
//! the engine's units of work. Nothing here commits: the caller owns the
//! transaction.

pub(crate) mod bins;
pub(crate) mod catalogue;
pub(crate) mod ledger;

use sea_orm::{ConnectionTrait, DbBackend};

use crate::ResultEngine;

/// Whether the backend understands `SELECT ... FOR UPDATE`.
///
/// SQLite has no row locks; its write lock covers the whole database, see
/// [`claim_writer`].
pub(crate) fn supports_row_locks<C: ConnectionTrait>(db: &C) -> bool {
    db.get_database_backend() != DbBackend::Sqlite
}

/// Take the database write lock as the first statement of a transaction.
///
/// A deferred SQLite transaction only waits on the busy timeout when its
/// first statement asks for the write lock. One that reads first and writes
/// later fails with `SQLITE_BUSY` as soon as another writer is active. The
/// no-op update below makes every unit of work queue up front instead. A
/// no-op on backends with row locks.
pub(crate) async fn claim_writer<C: ConnectionTrait>(db: &C) -> ResultEngine<()> {
    if supports_row_locks(db) {
        return Ok(());
    }
    db.execute_unprepared("UPDATE product_qualities SET quantity = quantity WHERE id < 0")
        .await?;
    Ok(())
}
