//! Ledger store over the `transactions` table.

use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use crate::{
    EngineError, Movement, MovementDetail, ResultEngine,
    code::insert_with_code,
    transactions::{self, MovementChanges, NewMovement},
    util::normalize_optional_text,
};

use super::{bins, catalogue, supports_row_locks};

fn movement_not_found(code: &str) -> EngineError {
    EngineError::NotFound(format!("transaction {code}"))
}

fn into_movements(models: Vec<transactions::Model>) -> ResultEngine<Vec<Movement>> {
    models.into_iter().map(Movement::try_from).collect()
}

/// A window of the ledger, newest first.
pub(crate) async fn find_all<C: ConnectionTrait>(
    db: &C,
    offset: u64,
    limit: u64,
) -> ResultEngine<Vec<Movement>> {
    let models = transactions::Entity::find()
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;
    into_movements(models)
}

pub(crate) async fn count<C: ConnectionTrait>(db: &C) -> ResultEngine<u64> {
    Ok(transactions::Entity::find().count(db).await?)
}

pub(crate) async fn find_all_by_supplier_code<C: ConnectionTrait>(
    db: &C,
    supplier_code: &str,
) -> ResultEngine<Vec<Movement>> {
    let models = transactions::Entity::find()
        .filter(transactions::Column::SupplierCode.eq(supplier_code))
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id)
        .all(db)
        .await?;
    into_movements(models)
}

pub(crate) async fn find_all_by_customer_code<C: ConnectionTrait>(
    db: &C,
    customer_code: &str,
) -> ResultEngine<Vec<Movement>> {
    let models = transactions::Entity::find()
        .filter(transactions::Column::CustomerCode.eq(customer_code))
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id)
        .all(db)
        .await?;
    into_movements(models)
}

/// Every movement touching `bin_id`, as target or as source, oldest first.
pub(crate) async fn find_all_by_bin<C: ConnectionTrait>(
    db: &C,
    bin_id: i32,
) -> ResultEngine<Vec<Movement>> {
    let models = transactions::Entity::find()
        .filter(
            Condition::any()
                .add(transactions::Column::ProductQualityId.eq(bin_id))
                .add(transactions::Column::ProductQualityIdSource.eq(bin_id)),
        )
        .order_by_asc(transactions::Column::Id)
        .all(db)
        .await?;
    into_movements(models)
}

/// Number of movements referencing any of `bin_ids`.
pub(crate) async fn count_by_bins<C: ConnectionTrait>(
    db: &C,
    bin_ids: &[i32],
) -> ResultEngine<u64> {
    if bin_ids.is_empty() {
        return Ok(0);
    }
    let count = transactions::Entity::find()
        .filter(
            Condition::any()
                .add(transactions::Column::ProductQualityId.is_in(bin_ids.iter().copied()))
                .add(transactions::Column::ProductQualityIdSource.is_in(bin_ids.iter().copied())),
        )
        .count(db)
        .await?;
    Ok(count)
}

pub(crate) async fn find_by_code<C: ConnectionTrait>(db: &C, code: &str) -> ResultEngine<Movement> {
    transactions::Entity::find()
        .filter(transactions::Column::Code.eq(code))
        .one(db)
        .await?
        .ok_or_else(|| movement_not_found(code))
        .and_then(Movement::try_from)
}

/// Read a movement and hold its row lock until the surrounding transaction
/// ends.
pub(crate) async fn find_for_update<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> ResultEngine<transactions::Model> {
    let mut query = transactions::Entity::find().filter(transactions::Column::Code.eq(code));
    if supports_row_locks(db) {
        query = query.lock_exclusive();
    }
    query.one(db).await?.ok_or_else(|| movement_not_found(code))
}

/// A movement with its bins (and their products) and its counterparty.
pub(crate) async fn find_by_code_with_associations<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> ResultEngine<MovementDetail> {
    let movement = find_by_code(db, code).await?;
    let target = bins::find_by_id_with_product(db, movement.target_bin_id).await?;
    let source = match movement.source_bin_id {
        Some(id) => Some(bins::find_by_id_with_product(db, id).await?),
        None => None,
    };
    let supplier = match movement.supplier_code.as_deref() {
        Some(code) => Some(catalogue::require_supplier(db, code).await?),
        None => None,
    };
    let customer = match movement.customer_code.as_deref() {
        Some(code) => Some(catalogue::require_customer(db, code).await?),
        None => None,
    };
    Ok(MovementDetail {
        movement,
        target,
        source,
        supplier,
        customer,
    })
}

/// Insert a movement under a freshly minted code.
pub(crate) async fn create<C>(db: &C, new: NewMovement) -> ResultEngine<Movement>
where
    C: ConnectionTrait + TransactionTrait,
{
    let new = NewMovement {
        description: normalize_optional_text(new.description.as_deref()),
        supplier_code: normalize_optional_text(new.supplier_code.as_deref()),
        customer_code: normalize_optional_text(new.customer_code.as_deref()),
        ..new
    };
    let now = Utc::now();
    let model = insert_with_code!(db, "transactions", |code| new
        .clone()
        .into_active_model(code, now))?;
    Movement::try_from(model)
}

/// Overwrite the mutable fields of `current`.
pub(crate) async fn update<C: ConnectionTrait>(
    db: &C,
    current: transactions::Model,
    changes: MovementChanges,
) -> ResultEngine<Movement> {
    let mut active: transactions::ActiveModel = current.into();
    active.quantity = ActiveValue::Set(changes.quantity);
    active.unit_mass_acronym = ActiveValue::Set(changes.unit.acronym().to_string());
    active.description = ActiveValue::Set(changes.description);
    active.supplier_code = ActiveValue::Set(changes.supplier_code);
    active.customer_code = ActiveValue::Set(changes.customer_code);
    active.updated_at = ActiveValue::Set(Utc::now());
    Movement::try_from(active.update(db).await?)
}

pub(crate) async fn delete<C: ConnectionTrait>(db: &C, code: &str) -> ResultEngine<()> {
    let result = transactions::Entity::delete_many()
        .filter(transactions::Column::Code.eq(code))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(movement_not_found(code));
    }
    Ok(())
}
