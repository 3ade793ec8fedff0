//! Bin store: reads over `product_qualities` and the only code path that
//! changes a bin's on-hand quantity.

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Adjustment, Bin, BinWithProduct, EngineError, ResultEngine, product_qualities, products,
    util::{QUANTITY_EPSILON, validate_delta},
};

use super::supports_row_locks;

fn bin_not_found(id: i32) -> EngineError {
    EngineError::NotFound(format!("product quality {id}"))
}

fn hydrate(
    (bin, product): (product_qualities::Model, Option<products::Model>),
) -> ResultEngine<BinWithProduct> {
    let product = product
        .ok_or_else(|| EngineError::NotFound(format!("product {}", bin.product_code)))?;
    Ok(BinWithProduct {
        bin: Bin::try_from(bin)?,
        product: product.try_into()?,
    })
}

/// Every bin with its product, in id order.
pub(crate) async fn find_all<C: ConnectionTrait>(db: &C) -> ResultEngine<Vec<BinWithProduct>> {
    product_qualities::Entity::find()
        .find_also_related(products::Entity)
        .order_by_asc(product_qualities::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(hydrate)
        .collect()
}

pub(crate) async fn find_all_by_product_code<C: ConnectionTrait>(
    db: &C,
    product_code: &str,
) -> ResultEngine<Vec<Bin>> {
    product_qualities::Entity::find()
        .filter(product_qualities::Column::ProductCode.eq(product_code))
        .order_by_asc(product_qualities::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Bin::try_from)
        .collect()
}

pub(crate) async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> ResultEngine<Bin> {
    product_qualities::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| bin_not_found(id))
        .and_then(Bin::try_from)
}

pub(crate) async fn find_by_id_with_product<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> ResultEngine<BinWithProduct> {
    let row = product_qualities::Entity::find_by_id(id)
        .find_also_related(products::Entity)
        .one(db)
        .await?
        .ok_or_else(|| bin_not_found(id))?;
    hydrate(row)
}

/// Read a bin and hold its row lock until the surrounding transaction ends.
///
/// SQLite has no row lock to take; there the unit of work already holds the
/// database write lock from [`super::claim_writer`].
pub(crate) async fn find_for_update<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> ResultEngine<product_qualities::Model> {
    let mut query = product_qualities::Entity::find_by_id(id);
    if supports_row_locks(db) {
        query = query.lock_exclusive();
    }
    query.one(db).await?.ok_or_else(|| bin_not_found(id))
}

pub(crate) async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> ResultEngine<()> {
    let result = product_qualities::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(bin_not_found(id));
    }
    Ok(())
}

pub(crate) async fn increase_stock<C: ConnectionTrait>(
    db: &C,
    id: i32,
    delta: f64,
) -> ResultEngine<Bin> {
    validate_delta(delta)?;
    adjust_stock(db, id, delta).await
}

pub(crate) async fn decrease_stock<C: ConnectionTrait>(
    db: &C,
    id: i32,
    delta: f64,
) -> ResultEngine<Bin> {
    validate_delta(delta)?;
    adjust_stock(db, id, -delta).await
}

/// Apply a signed change to a bin under its row lock.
///
/// A result below zero beyond [`QUANTITY_EPSILON`] fails with
/// `InsufficientStock`; a result within the tolerance of zero is stored as
/// exactly zero.
async fn adjust_stock<C: ConnectionTrait>(
    db: &C,
    id: i32,
    change: f64,
) -> ResultEngine<Bin> {
    let row = find_for_update(db, id).await?;
    let current = row.quantity;
    let mut next = current + change;
    if next < -QUANTITY_EPSILON {
        return Err(EngineError::InsufficientStock(format!(
            "product quality {id} holds {current}, cannot remove {}",
            -change
        )));
    }
    if next.abs() <= QUANTITY_EPSILON {
        next = 0.0;
    }

    let mut active: product_qualities::ActiveModel = row.into();
    active.quantity = ActiveValue::Set(next);
    if change > 0.0 {
        active.adjustment = ActiveValue::Set(Some(Adjustment::Increase.as_str().to_string()));
    } else if change < 0.0 {
        active.adjustment = ActiveValue::Set(Some(Adjustment::Decrease.as_str().to_string()));
    }
    active.updated_at = ActiveValue::Set(Utc::now());
    Bin::try_from(active.update(db).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use migration::MigratorTrait;
    use sea_orm::{ConnectOptions, Database, DatabaseConnection, TransactionTrait};
    use tokio::task::JoinSet;

    use super::*;
    use crate::store::claim_writer;

    async fn setup() -> (DatabaseConnection, i32) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let id = seed(&db).await;
        (db, id)
    }

    /// A file-backed database behind a pool of eight connections.
    async fn setup_on_disk(dir: &tempfile::TempDir) -> (DatabaseConnection, i32) {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("bins.db").display());
        let mut options = ConnectOptions::new(url);
        options.max_connections(8).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        let id = seed(&db).await;
        (db, id)
    }

    async fn seed(db: &DatabaseConnection) -> i32 {
        migration::Migrator::up(db, None).await.unwrap();

        let now = Utc::now();
        products::ActiveModel {
            id: ActiveValue::NotSet,
            code: ActiveValue::Set("PRODUCT001".to_string()),
            name: ActiveValue::Set("Flour".to_string()),
            unit_acronym: ActiveValue::Set("kg".to_string()),
            unit_description: ActiveValue::Set("kilogram".to_string()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
        .insert(db)
        .await
        .unwrap();
        let bin = product_qualities::ActiveModel {
            id: ActiveValue::NotSet,
            product_code: ActiveValue::Set("PRODUCT001".to_string()),
            quality: ActiveValue::Set("A".to_string()),
            price: ActiveValue::Set(1_200),
            quantity: ActiveValue::Set(0.0),
            adjustment: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
        .insert(db)
        .await
        .unwrap();
        bin.id
    }

    #[tokio::test]
    async fn increase_then_decrease() {
        let (db, id) = setup().await;

        let bin = increase_stock(&db, id, 10.0).await.unwrap();
        assert_eq!(bin.quantity, 10.0);
        assert_eq!(bin.adjustment, Some(Adjustment::Increase));

        let bin = decrease_stock(&db, id, 4.0).await.unwrap();
        assert_eq!(bin.quantity, 6.0);
        assert_eq!(bin.adjustment, Some(Adjustment::Decrease));
    }

    #[tokio::test]
    async fn overdraw_is_rejected_and_leaves_the_bin_alone() {
        let (db, id) = setup().await;
        increase_stock(&db, id, 3.0).await.unwrap();

        let err = decrease_stock(&db, id, 5.0).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock(_)));
        assert_eq!(find_by_id(&db, id).await.unwrap().quantity, 3.0);
    }

    #[tokio::test]
    async fn near_zero_results_are_clamped() {
        let (db, id) = setup().await;
        increase_stock(&db, id, 0.3).await.unwrap();
        increase_stock(&db, id, 0.6).await.unwrap();

        let bin = decrease_stock(&db, id, 0.9).await.unwrap();
        assert_eq!(bin.quantity, 0.0);
    }

    #[tokio::test]
    async fn negative_delta_and_missing_bin() {
        let (db, id) = setup().await;
        assert_eq!(
            increase_stock(&db, id, -1.0).await,
            Err(EngineError::invalid("delta", "gte", 0))
        );
        assert_eq!(
            increase_stock(&db, id + 100, 1.0).await,
            Err(EngineError::NotFound(format!("product quality {}", id + 100)))
        );
    }

    #[tokio::test]
    async fn reads_hydrate_the_product() {
        let (db, id) = setup().await;

        let all = find_all(&db).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].product.code, "PRODUCT001");

        let bins = find_all_by_product_code(&db, "PRODUCT001").await.unwrap();
        assert_eq!(bins.len(), 1);
        assert!(find_all_by_product_code(&db, "NOPE").await.unwrap().is_empty());

        let one = find_by_id_with_product(&db, id).await.unwrap();
        assert_eq!(one.bin.id, id);
        assert_eq!(one.product.name, "Flour");

        delete(&db, id).await.unwrap();
        assert!(matches!(
            delete(&db, id).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_increases_each_in_their_own_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let (db, id) = setup_on_disk(&dir).await;
        let db = Arc::new(db);

        let mut tasks = JoinSet::new();
        for _ in 0..20 {
            let db = Arc::clone(&db);
            tasks.spawn(async move {
                let txn = db.begin().await?;
                claim_writer(&txn).await?;
                increase_stock(&txn, id, 1.0).await?;
                txn.commit().await?;
                Ok::<_, EngineError>(())
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        assert_eq!(find_by_id(db.as_ref(), id).await.unwrap().quantity, 20.0);
    }
}
