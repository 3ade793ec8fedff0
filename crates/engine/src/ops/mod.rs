use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod catalogue;
mod movements;
mod queries;
mod recompute;
mod users;

/// Attempts made for one unit of work when the backend reports contention.
pub(crate) const MAX_TX_ATTEMPTS: u32 = 3;

const BASE_BACKOFF: Duration = Duration::from_millis(25);

/// Delay before retry number `attempt` (1-based): 25ms, 50ms, 100ms, ...
pub(crate) fn retry_backoff(attempt: u32) -> Duration {
    BASE_BACKOFF * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Run a block inside a DB transaction, committing on success and rolling
/// back on error.
///
/// On SQLite the transaction opens by claiming the database write lock, so
/// concurrent units of work queue instead of failing mid-way.
///
/// Every step is raced against the operation context, so a cancellation or
/// an expired deadline drops the in-flight call and rolls back. Transient
/// backend failures (serialization failures, deadlocks, busy database) rerun
/// the whole block with exponential backoff; the block must therefore only
/// borrow its inputs.
macro_rules! with_tx {
    ($self:expr, $ctx:expr, |$tx:ident| $body:expr) => {{
        let ctx: &$crate::OpContext = $ctx;
        let mut attempt = 1u32;
        loop {
            let outcome: $crate::ResultEngine<_> = async {
                let $tx = ctx
                    .guard(async {
                        let tx = sea_orm::TransactionTrait::begin(&$self.database).await?;
                        $crate::store::claim_writer(&tx).await?;
                        Ok::<_, $crate::EngineError>(tx)
                    })
                    .await?;
                let value = ctx
                    .guard(async {
                        let value: $crate::ResultEngine<_> = $body;
                        value
                    })
                    .await?;
                ctx.guard_commit(async { $tx.commit().await.map_err($crate::EngineError::from) })
                    .await?;
                Ok::<_, $crate::EngineError>(value)
            }
            .await;
            match outcome {
                Err(err) if err.is_transient() && attempt < $crate::ops::MAX_TX_ATTEMPTS => {
                    tracing::warn!("transient backend failure (attempt {attempt}): {err}");
                    let pause = $crate::ops::retry_backoff(attempt);
                    if let Err(err) = ctx
                        .guard(async {
                            tokio::time::sleep(pause).await;
                            Ok::<_, $crate::EngineError>(())
                        })
                        .await
                    {
                        break Err(err);
                    }
                    attempt += 1;
                }
                other => break other,
            }
        }
    }};
}

pub(crate) use with_tx;

/// Entry point of the stock engine.
///
/// Cheap to share behind an `Arc`: the only state is the connection pool.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
