use crate::{
    EngineError, Movement, MovementKind, OpContext, ResultEngine,
    store::{bins, ledger},
    util::normalize_required_text,
};

use super::{
    super::{Engine, with_tx},
    lock_pair,
};

impl Engine {
    /// Remove a movement and take back its effect on stock.
    ///
    /// Reversing an `IN` whose goods already left the bin fails with
    /// `InsufficientStock` and keeps the movement.
    pub async fn delete_movement(&self, ctx: &OpContext, code: &str) -> ResultEngine<Movement> {
        let code = normalize_required_text(code, "code")?;
        tracing::debug!("deleting movement {code}");

        let movement = with_tx!(self, ctx, |db_tx| {
            let movement = Movement::try_from(ledger::find_for_update(&db_tx, &code).await?)?;
            match movement.kind {
                MovementKind::In => {
                    bins::decrease_stock(&db_tx, movement.target_bin_id, movement.quantity)
                        .await?;
                }
                MovementKind::Out => {
                    bins::increase_stock(&db_tx, movement.target_bin_id, movement.quantity)
                        .await?;
                }
                MovementKind::Transfer => {
                    let source_bin_id = movement.source_bin_id.ok_or_else(|| {
                        EngineError::NotFound(format!("source of transaction {code}"))
                    })?;
                    lock_pair(&db_tx, source_bin_id, movement.target_bin_id).await?;
                    bins::increase_stock(&db_tx, source_bin_id, movement.quantity).await?;
                    bins::decrease_stock(&db_tx, movement.target_bin_id, movement.quantity)
                        .await?;
                }
            }
            ledger::delete(&db_tx, &code).await?;
            Ok(movement)
        })?;

        tracing::info!(
            "movement {} ({}) deleted",
            movement.code,
            movement.kind.as_str()
        );
        Ok(movement)
    }
}
