use crate::{
    EngineError, Movement, MovementKind, OpContext, ResultEngine, UpdateMovementCmd,
    store::{bins, catalogue, ledger},
    transactions::MovementChanges,
    util::{apply_optional_text_patch, normalize_required_text, validate_quantity},
};

use super::super::{Engine, with_tx};

impl Engine {
    /// Change quantity, unit, description or counterparty of an `IN` or
    /// `OUT` movement.
    ///
    /// The old quantity is taken back out of the target bin first, then the
    /// new one is applied. Either step fails with
    /// [`EngineError::InsufficientStock`] when the bin cannot cover it, which
    /// includes reversing an `IN` whose stock has already left. Transfers
    /// cannot be updated; delete and recreate them.
    pub async fn update_movement(
        &self,
        ctx: &OpContext,
        cmd: UpdateMovementCmd,
    ) -> ResultEngine<Movement> {
        let code = normalize_required_text(&cmd.code, "code")?;
        validate_quantity(cmd.quantity, "quantity")?;
        tracing::debug!("updating movement {code}");

        let movement = with_tx!(self, ctx, |db_tx| {
            let current = ledger::find_for_update(&db_tx, &code).await?;
            let kind = MovementKind::try_from(current.kind.as_str())?;
            if kind == MovementKind::Transfer {
                return Err(EngineError::CannotUpdateTransfer(code.clone()));
            }

            let supplier_code = apply_optional_text_patch(
                current.supplier_code.clone(),
                cmd.supplier_code.as_deref(),
            );
            let customer_code = apply_optional_text_patch(
                current.customer_code.clone(),
                cmd.customer_code.as_deref(),
            );
            if kind == MovementKind::Out && supplier_code.is_some() {
                return Err(EngineError::invalid(
                    "supplier_code",
                    "excluded_unless",
                    "kind IN",
                ));
            }
            if kind == MovementKind::In && customer_code.is_some() {
                return Err(EngineError::invalid(
                    "customer_code",
                    "excluded_unless",
                    "kind OUT",
                ));
            }
            if let Some(code) = supplier_code.as_deref() {
                catalogue::require_supplier(&db_tx, code).await?;
            }
            if let Some(code) = customer_code.as_deref() {
                catalogue::require_customer(&db_tx, code).await?;
            }

            let target_bin_id = current.product_quality_id;
            match kind {
                MovementKind::In => {
                    bins::decrease_stock(&db_tx, target_bin_id, current.quantity).await?
                }
                _ => bins::increase_stock(&db_tx, target_bin_id, current.quantity).await?,
            };

            let changes = MovementChanges {
                quantity: cmd.quantity,
                unit: cmd.unit,
                description: apply_optional_text_patch(
                    current.description.clone(),
                    cmd.description.as_deref(),
                ),
                supplier_code,
                customer_code,
            };
            let movement = ledger::update(&db_tx, current, changes).await?;

            match kind {
                MovementKind::In => {
                    bins::increase_stock(&db_tx, target_bin_id, cmd.quantity).await?
                }
                _ => bins::decrease_stock(&db_tx, target_bin_id, cmd.quantity).await?,
            };
            Ok(movement)
        })?;

        tracing::info!(
            "movement {} updated, quantity {} {}",
            movement.code,
            movement.quantity,
            movement.unit
        );
        Ok(movement)
    }
}
