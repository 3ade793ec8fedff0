use crate::{
    EngineError, Movement, MovementKind, OpContext, ResultEngine, TransferStockCmd,
    ValidationErrors,
    store::{bins, catalogue, ledger},
    transactions::NewMovement,
};

use super::{
    super::{Engine, with_tx},
    lock_pair,
};

fn validate(cmd: &TransferStockCmd) -> ResultEngine<()> {
    let mut errors = ValidationErrors::new();
    if !cmd.quantity.is_finite() || cmd.quantity <= 0.0 {
        errors.add("quantity", "gt", 0);
    }
    if cmd.source_bin_id == cmd.target_bin_id {
        errors.add("target_bin_id", "nefield", "source_bin_id");
    }
    errors.into_result()
}

impl Engine {
    /// Move `quantity` from one bin to another bin of the same product and
    /// record a `TRANSFER` movement.
    ///
    /// The movement is recorded in the product's unit of mass.
    pub async fn transfer_stock(
        &self,
        ctx: &OpContext,
        cmd: TransferStockCmd,
    ) -> ResultEngine<Movement> {
        validate(&cmd)?;
        tracing::debug!(
            "transferring {} from product quality {} to {}",
            cmd.quantity,
            cmd.source_bin_id,
            cmd.target_bin_id
        );

        let movement = with_tx!(self, ctx, |db_tx| {
            lock_pair(&db_tx, cmd.source_bin_id, cmd.target_bin_id).await?;
            let source = bins::find_by_id(&db_tx, cmd.source_bin_id).await?;
            let target = bins::find_by_id(&db_tx, cmd.target_bin_id).await?;
            if source.product_code != target.product_code {
                return Err(EngineError::TransferAcrossProducts(format!(
                    "product quality {} belongs to {}, {} belongs to {}",
                    source.id, source.product_code, target.id, target.product_code
                )));
            }
            let product = catalogue::require_product(&db_tx, &source.product_code).await?;

            bins::decrease_stock(&db_tx, source.id, cmd.quantity).await?;
            bins::increase_stock(&db_tx, target.id, cmd.quantity).await?;

            ledger::create(
                &db_tx,
                NewMovement {
                    kind: MovementKind::Transfer,
                    target_bin_id: target.id,
                    source_bin_id: Some(source.id),
                    supplier_code: None,
                    customer_code: None,
                    description: cmd.description.clone(),
                    quantity: cmd.quantity,
                    unit: product.unit,
                },
            )
            .await
        })?;

        tracing::info!(
            "movement {} transferred {} from product quality {} to {}",
            movement.code,
            movement.quantity,
            cmd.source_bin_id,
            cmd.target_bin_id
        );
        Ok(movement)
    }
}
