use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{ActiveValue, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Bin, EngineError, Movement, MovementKind, OpContext, ResultEngine, product_qualities,
    store::supports_row_locks, transactions, util::QUANTITY_EPSILON,
};

use super::{Engine, with_tx};

/// Signed effect of one movement on each bin it touches.
fn effects(movement: &Movement) -> Vec<(i32, f64)> {
    match movement.kind {
        MovementKind::In => vec![(movement.target_bin_id, movement.quantity)],
        MovementKind::Out => vec![(movement.target_bin_id, -movement.quantity)],
        MovementKind::Transfer => {
            let mut effects = vec![(movement.target_bin_id, movement.quantity)];
            if let Some(source) = movement.source_bin_id {
                effects.insert(0, (source, -movement.quantity));
            }
            effects
        }
    }
}

impl Engine {
    /// Recomputes every bin quantity from the ledger and stores the result.
    ///
    /// - Replays movements in insertion order.
    /// - Fails with `InsufficientStock` when the replay drives a bin below
    ///   zero; nothing is written in that case.
    /// - Returns the bins whose stored quantity was corrected.
    pub async fn recompute_stock(&self, ctx: &OpContext) -> ResultEngine<Vec<Bin>> {
        let corrected = with_tx!(self, ctx, |db_tx| {
            let mut query = product_qualities::Entity::find().order_by_asc(product_qualities::Column::Id);
            if supports_row_locks(&db_tx) {
                query = query.lock_exclusive();
            }
            let bin_models = query.all(&db_tx).await?;

            let mut replayed: BTreeMap<i32, f64> =
                bin_models.iter().map(|model| (model.id, 0.0)).collect();
            let movement_models = transactions::Entity::find()
                .order_by_asc(transactions::Column::Id)
                .all(&db_tx)
                .await?;
            for model in movement_models {
                let movement = Movement::try_from(model)?;
                for (bin_id, change) in effects(&movement) {
                    let quantity = replayed.get_mut(&bin_id).ok_or_else(|| {
                        EngineError::NotFound(format!("product quality {bin_id}"))
                    })?;
                    *quantity += change;
                    if *quantity < -QUANTITY_EPSILON {
                        return Err(EngineError::InsufficientStock(format!(
                            "replaying movement {} leaves product quality {bin_id} at {}",
                            movement.code, *quantity
                        )));
                    }
                    if quantity.abs() <= QUANTITY_EPSILON {
                        *quantity = 0.0;
                    }
                }
            }

            let mut corrected = Vec::new();
            for model in bin_models {
                let quantity = replayed.get(&model.id).copied().unwrap_or(0.0);
                if (model.quantity - quantity).abs() <= QUANTITY_EPSILON {
                    continue;
                }
                let mut active: product_qualities::ActiveModel = model.into();
                active.quantity = ActiveValue::Set(quantity);
                active.updated_at = ActiveValue::Set(Utc::now());
                corrected.push(Bin::try_from(active.update(&db_tx).await?)?);
            }
            Ok(corrected)
        })?;

        if corrected.is_empty() {
            tracing::info!("stock recomputed, every bin matches the ledger");
        } else {
            tracing::warn!("stock recomputed, {} bins corrected", corrected.len());
        }
        Ok(corrected)
    }
}
