use crate::{
    CreateMovementCmd, EngineError, Movement, MovementKind, OpContext, ResultEngine,
    ValidationErrors,
    store::{bins, catalogue, ledger},
    transactions::NewMovement,
    util::normalize_optional_text,
};

use super::super::{Engine, with_tx};

/// Reject inputs that cannot form an `IN` or `OUT` movement.
fn validate(
    cmd: &CreateMovementCmd,
    supplier_code: Option<&str>,
    customer_code: Option<&str>,
) -> ResultEngine<()> {
    let mut errors = ValidationErrors::new();
    if cmd.kind == MovementKind::Transfer {
        errors.add("kind", "oneof", "IN OUT");
    }
    if !cmd.quantity.is_finite() || cmd.quantity <= 0.0 {
        errors.add("quantity", "gt", 0);
    }
    if cmd.kind != MovementKind::In && supplier_code.is_some() {
        errors.add("supplier_code", "excluded_unless", "kind IN");
    }
    if cmd.kind != MovementKind::Out && customer_code.is_some() {
        errors.add("customer_code", "excluded_unless", "kind OUT");
    }
    errors.into_result()
}

impl Engine {
    /// Record goods received (`IN`) or shipped (`OUT`) on a bin and move its
    /// stock accordingly.
    ///
    /// The quantity is stored in the unit it was given in. An `OUT` larger
    /// than the bin's stock fails with [`EngineError::InsufficientStock`] and
    /// changes nothing.
    pub async fn create_movement(
        &self,
        ctx: &OpContext,
        cmd: CreateMovementCmd,
    ) -> ResultEngine<Movement> {
        let supplier_code = normalize_optional_text(cmd.supplier_code.as_deref());
        let customer_code = normalize_optional_text(cmd.customer_code.as_deref());
        validate(&cmd, supplier_code.as_deref(), customer_code.as_deref())?;
        tracing::debug!(
            "creating {} movement on product quality {}",
            cmd.kind.as_str(),
            cmd.target_bin_id
        );

        let movement = with_tx!(self, ctx, |db_tx| {
            bins::find_for_update(&db_tx, cmd.target_bin_id).await?;
            if let Some(code) = supplier_code.as_deref() {
                catalogue::require_supplier(&db_tx, code).await?;
            }
            if let Some(code) = customer_code.as_deref() {
                catalogue::require_customer(&db_tx, code).await?;
            }

            let movement = ledger::create(
                &db_tx,
                NewMovement {
                    kind: cmd.kind,
                    target_bin_id: cmd.target_bin_id,
                    source_bin_id: None,
                    supplier_code: supplier_code.clone(),
                    customer_code: customer_code.clone(),
                    description: cmd.description.clone(),
                    quantity: cmd.quantity,
                    unit: cmd.unit,
                },
            )
            .await?;

            match cmd.kind {
                MovementKind::In => {
                    bins::increase_stock(&db_tx, cmd.target_bin_id, cmd.quantity).await?;
                }
                MovementKind::Out => {
                    bins::decrease_stock(&db_tx, cmd.target_bin_id, cmd.quantity).await?;
                }
                MovementKind::Transfer => {
                    return Err(EngineError::invalid("kind", "oneof", "IN OUT"));
                }
            }
            Ok(movement)
        })?;

        tracing::info!(
            "movement {} ({}) recorded on product quality {}",
            movement.code,
            movement.kind.as_str(),
            movement.target_bin_id
        );
        Ok(movement)
    }
}
