use std::sync::Arc;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tokio_util::sync::CancellationToken;

use engine::{
    Bin, CreateMovementCmd, Engine, EngineError, MovementKind, NewBinCmd, NewPartyCmd,
    NewProductCmd, OpContext, PageRequest, Product, TransferStockCmd, UnitOfMass,
    UpdateMovementCmd, is_valid_code,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Engine on a file-backed database whose pool hands out eight
/// connections, so concurrent operations really overlap.
async fn engine_with_pool(dir: &tempfile::TempDir) -> Engine {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("stock.db").display());
    let mut options = ConnectOptions::new(url);
    options.max_connections(8).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

async fn new_product(engine: &Engine, name: &str) -> Product {
    engine
        .new_product(
            &OpContext::new(),
            NewProductCmd {
                name: name.to_string(),
                unit: UnitOfMass::Kg,
            },
        )
        .await
        .unwrap()
}

async fn new_bin(engine: &Engine, product: &Product, quality: &str) -> Bin {
    engine
        .new_bin(
            &OpContext::new(),
            NewBinCmd {
                product_code: product.code.clone(),
                quality: quality.to_string(),
                price: 100,
            },
        )
        .await
        .unwrap()
}

async fn quantity(engine: &Engine, bin_id: i32) -> f64 {
    engine
        .bin(&OpContext::new(), bin_id)
        .await
        .unwrap()
        .bin
        .quantity
}

async fn ledger_size(engine: &Engine) -> u64 {
    engine
        .list_movements(&OpContext::new(), PageRequest::default())
        .await
        .unwrap()
        .total
}

async fn stock_in(engine: &Engine, bin_id: i32, qty: f64) -> String {
    engine
        .create_movement(
            &OpContext::new(),
            CreateMovementCmd::inbound(bin_id, qty, UnitOfMass::Kg),
        )
        .await
        .unwrap()
        .code
}

#[tokio::test]
async fn in_then_out() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    assert_eq!(bin.quantity, 0.0);

    let inbound = engine
        .create_movement(&ctx, CreateMovementCmd::inbound(bin.id, 10.0, UnitOfMass::Kg))
        .await
        .unwrap();
    assert_eq!(inbound.kind, MovementKind::In);
    assert_eq!(quantity(&engine, bin.id).await, 10.0);

    engine
        .create_movement(&ctx, CreateMovementCmd::outbound(bin.id, 4.0, UnitOfMass::Kg))
        .await
        .unwrap();
    assert_eq!(quantity(&engine, bin.id).await, 6.0);
}

#[tokio::test]
async fn out_over_draw_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    stock_in(&engine, bin.id, 3.0).await;

    let err = engine
        .create_movement(
            &OpContext::new(),
            CreateMovementCmd::outbound(bin.id, 5.0, UnitOfMass::Kg),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(quantity(&engine, bin.id).await, 3.0);
    assert_eq!(ledger_size(&engine).await, 1);
}

#[tokio::test]
async fn transfer_within_product() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Flour").await;
    let b1 = new_bin(&engine, &product, "00").await;
    let b2 = new_bin(&engine, &product, "0").await;
    stock_in(&engine, b1.id, 10.0).await;

    let movement = engine
        .transfer_stock(&OpContext::new(), TransferStockCmd::new(b1.id, b2.id, 4.0))
        .await
        .unwrap();

    assert_eq!(movement.kind, MovementKind::Transfer);
    assert_eq!(movement.source_bin_id, Some(b1.id));
    assert_eq!(movement.target_bin_id, b2.id);
    assert_eq!(movement.unit, UnitOfMass::Kg);
    assert_eq!(quantity(&engine, b1.id).await, 6.0);
    assert_eq!(quantity(&engine, b2.id).await, 4.0);
}

#[tokio::test]
async fn transfer_conserves_stock() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Rice").await;
    let b1 = new_bin(&engine, &product, "arborio").await;
    let b2 = new_bin(&engine, &product, "carnaroli").await;
    stock_in(&engine, b1.id, 7.5).await;
    stock_in(&engine, b2.id, 1.25).await;

    engine
        .transfer_stock(&OpContext::new(), TransferStockCmd::new(b2.id, b1.id, 1.0))
        .await
        .unwrap();

    let (q1, q2) = (quantity(&engine, b1.id).await, quantity(&engine, b2.id).await);
    assert_eq!(q1, 8.5);
    assert_eq!(q2, 0.25);
    assert!((q1 + q2 - 8.75).abs() < 1e-9);
}

#[tokio::test]
async fn transfer_across_products_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let flour = new_product(&engine, "Flour").await;
    let sugar = new_product(&engine, "Sugar").await;
    let b1 = new_bin(&engine, &flour, "00").await;
    let b3 = new_bin(&engine, &sugar, "cane").await;
    stock_in(&engine, b1.id, 10.0).await;

    let err = engine
        .transfer_stock(&OpContext::new(), TransferStockCmd::new(b1.id, b3.id, 4.0))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::TransferAcrossProducts(_)));
    assert_eq!(quantity(&engine, b1.id).await, 10.0);
    assert_eq!(quantity(&engine, b3.id).await, 0.0);
    assert_eq!(ledger_size(&engine).await, 1);
}

#[tokio::test]
async fn transfer_to_itself_is_invalid() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    stock_in(&engine, bin.id, 2.0).await;

    let err = engine
        .transfer_stock(&OpContext::new(), TransferStockCmd::new(bin.id, bin.id, 1.0))
        .await
        .unwrap_err();

    let EngineError::Validation(errors) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(errors.fields[0].field, "target_bin_id");
    assert_eq!(errors.fields[0].rule, "nefield");
    assert_eq!(quantity(&engine, bin.id).await, 2.0);
}

#[tokio::test]
async fn update_moves_stock_by_the_difference() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let code = stock_in(&engine, bin.id, 5.0).await;

    let updated = engine
        .update_movement(
            &OpContext::new(),
            UpdateMovementCmd::new(code.clone(), 8.0, UnitOfMass::Kg),
        )
        .await
        .unwrap();

    assert_eq!(updated.code, code);
    assert_eq!(updated.quantity, 8.0);
    assert_eq!(quantity(&engine, bin.id).await, 8.0);
    let stored = engine.movement(&OpContext::new(), &code).await.unwrap();
    assert_eq!(stored.quantity, 8.0);
}

#[tokio::test]
async fn update_below_what_already_left_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let code = stock_in(&engine, bin.id, 10.0).await;
    engine
        .create_movement(&ctx, CreateMovementCmd::outbound(bin.id, 8.0, UnitOfMass::Kg))
        .await
        .unwrap();

    let err = engine
        .update_movement(&ctx, UpdateMovementCmd::new(code.clone(), 7.0, UnitOfMass::Kg))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(quantity(&engine, bin.id).await, 2.0);
    assert_eq!(engine.movement(&ctx, &code).await.unwrap().quantity, 10.0);
}

#[tokio::test]
async fn update_cannot_take_back_stock_that_already_left() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let code = stock_in(&engine, bin.id, 10.0).await;
    engine
        .create_movement(&ctx, CreateMovementCmd::outbound(bin.id, 8.0, UnitOfMass::Kg))
        .await
        .unwrap();

    // Growing the delivery still has to return the original 10 first.
    let err = engine
        .update_movement(&ctx, UpdateMovementCmd::new(code.clone(), 12.0, UnitOfMass::Kg))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(quantity(&engine, bin.id).await, 2.0);
    assert_eq!(engine.movement(&ctx, &code).await.unwrap().quantity, 10.0);
}

#[tokio::test]
async fn update_of_an_out_returns_stock_before_shipping_again() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    stock_in(&engine, bin.id, 10.0).await;
    let outbound = engine
        .create_movement(&ctx, CreateMovementCmd::outbound(bin.id, 6.0, UnitOfMass::Kg))
        .await
        .unwrap();

    engine
        .update_movement(
            &ctx,
            UpdateMovementCmd::new(outbound.code.clone(), 10.0, UnitOfMass::Kg),
        )
        .await
        .unwrap();
    assert_eq!(quantity(&engine, bin.id).await, 0.0);

    let err = engine
        .update_movement(&ctx, UpdateMovementCmd::new(outbound.code, 11.0, UnitOfMass::Kg))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(quantity(&engine, bin.id).await, 0.0);
}

#[tokio::test]
async fn update_of_a_transfer_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let b1 = new_bin(&engine, &product, "00").await;
    let b2 = new_bin(&engine, &product, "0").await;
    stock_in(&engine, b1.id, 10.0).await;
    let transfer = engine
        .transfer_stock(&ctx, TransferStockCmd::new(b1.id, b2.id, 4.0))
        .await
        .unwrap();

    let err = engine
        .update_movement(
            &ctx,
            UpdateMovementCmd::new(transfer.code.clone(), 1.0, UnitOfMass::Kg),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::CannotUpdateTransfer(_)));
    assert_eq!(quantity(&engine, b1.id).await, 6.0);
    assert_eq!(quantity(&engine, b2.id).await, 4.0);
    assert_eq!(engine.movement(&ctx, &transfer.code).await.unwrap(), transfer);
}

#[tokio::test]
async fn update_patches_counterparty_and_description() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let supplier = engine
        .new_supplier(&ctx, NewPartyCmd::new("Mill"))
        .await
        .unwrap();
    let customer = engine
        .new_customer(&ctx, NewPartyCmd::new("Bakery"))
        .await
        .unwrap();
    let code = stock_in(&engine, bin.id, 5.0).await;

    let updated = engine
        .update_movement(
            &ctx,
            UpdateMovementCmd::new(code.clone(), 5.0, UnitOfMass::Kg)
                .supplier(supplier.code.clone())
                .description("first delivery"),
        )
        .await
        .unwrap();
    assert_eq!(updated.supplier_code.as_deref(), Some(supplier.code.as_str()));
    assert_eq!(updated.description.as_deref(), Some("first delivery"));

    let cleared = engine
        .update_movement(
            &ctx,
            UpdateMovementCmd::new(code.clone(), 5.0, UnitOfMass::Kg).description(""),
        )
        .await
        .unwrap();
    assert_eq!(cleared.description, None);
    assert_eq!(cleared.supplier_code.as_deref(), Some(supplier.code.as_str()));

    let err = engine
        .update_movement(
            &ctx,
            UpdateMovementCmd::new(code.clone(), 5.0, UnitOfMass::Kg).customer(customer.code),
        )
        .await
        .unwrap_err();
    assert_eq!(err.tag(), "validation");

    let err = engine
        .update_movement(
            &ctx,
            UpdateMovementCmd::new(code, 5.0, UnitOfMass::Kg).supplier("NOSUCHCODE"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn delete_in_restores_the_bin() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let code = stock_in(&engine, bin.id, 5.0).await;
    assert_eq!(quantity(&engine, bin.id).await, 5.0);

    let deleted = engine.delete_movement(&ctx, &code).await.unwrap();

    assert_eq!(deleted.code, code);
    assert_eq!(quantity(&engine, bin.id).await, 0.0);
    assert!(matches!(
        engine.movement(&ctx, &code).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_of_consumed_in_keeps_the_movement() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let code = stock_in(&engine, bin.id, 5.0).await;
    engine
        .create_movement(&ctx, CreateMovementCmd::outbound(bin.id, 3.0, UnitOfMass::Kg))
        .await
        .unwrap();

    let err = engine.delete_movement(&ctx, &code).await.unwrap_err();

    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(quantity(&engine, bin.id).await, 2.0);
    assert!(engine.movement(&ctx, &code).await.is_ok());
}

#[tokio::test]
async fn create_then_delete_is_a_no_op_for_every_kind() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let b1 = new_bin(&engine, &product, "00").await;
    let b2 = new_bin(&engine, &product, "0").await;
    stock_in(&engine, b1.id, 10.0).await;
    stock_in(&engine, b2.id, 1.0).await;

    let inbound = stock_in(&engine, b1.id, 2.5).await;
    engine.delete_movement(&ctx, &inbound).await.unwrap();
    assert_eq!(quantity(&engine, b1.id).await, 10.0);

    let outbound = engine
        .create_movement(&ctx, CreateMovementCmd::outbound(b1.id, 2.5, UnitOfMass::Kg))
        .await
        .unwrap();
    engine.delete_movement(&ctx, &outbound.code).await.unwrap();
    assert_eq!(quantity(&engine, b1.id).await, 10.0);

    let transfer = engine
        .transfer_stock(&ctx, TransferStockCmd::new(b1.id, b2.id, 3.0))
        .await
        .unwrap();
    engine.delete_movement(&ctx, &transfer.code).await.unwrap();
    assert_eq!(quantity(&engine, b1.id).await, 10.0);
    assert_eq!(quantity(&engine, b2.id).await, 1.0);
}

#[tokio::test]
async fn create_update_delete_is_a_no_op() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    stock_in(&engine, bin.id, 10.0).await;

    let inbound = stock_in(&engine, bin.id, 2.0).await;
    engine
        .update_movement(&ctx, UpdateMovementCmd::new(inbound.clone(), 6.0, UnitOfMass::Kg))
        .await
        .unwrap();
    assert_eq!(quantity(&engine, bin.id).await, 16.0);
    engine.delete_movement(&ctx, &inbound).await.unwrap();
    assert_eq!(quantity(&engine, bin.id).await, 10.0);

    let outbound = engine
        .create_movement(&ctx, CreateMovementCmd::outbound(bin.id, 2.0, UnitOfMass::Kg))
        .await
        .unwrap();
    engine
        .update_movement(
            &ctx,
            UpdateMovementCmd::new(outbound.code.clone(), 9.0, UnitOfMass::Kg),
        )
        .await
        .unwrap();
    assert_eq!(quantity(&engine, bin.id).await, 1.0);
    engine.delete_movement(&ctx, &outbound.code).await.unwrap();
    assert_eq!(quantity(&engine, bin.id).await, 10.0);
}

#[tokio::test]
async fn failed_create_leaves_no_trace() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;

    let err = engine
        .create_movement(
            &ctx,
            CreateMovementCmd::inbound(bin.id, 4.0, UnitOfMass::Kg).supplier("NOSUCHCODE"),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("supplier NOSUCHCODE".to_string()));

    let err = engine
        .create_movement(&ctx, CreateMovementCmd::inbound(9_999, 4.0, UnitOfMass::Kg))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    assert_eq!(quantity(&engine, bin.id).await, 0.0);
    assert_eq!(ledger_size(&engine).await, 0);
}

#[tokio::test]
async fn malformed_create_lists_every_field() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;

    let err = engine
        .create_movement(
            &OpContext::new(),
            CreateMovementCmd::outbound(bin.id, 0.0, UnitOfMass::Kg).supplier("ABCDEFGHIJ"),
        )
        .await
        .unwrap_err();

    let EngineError::Validation(errors) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    let rules: Vec<(&str, &str)> = errors
        .fields
        .iter()
        .map(|field| (field.field.as_str(), field.rule.as_str()))
        .collect();
    assert_eq!(
        rules,
        vec![("quantity", "gt"), ("supplier_code", "excluded_unless")]
    );
}

#[tokio::test]
async fn minted_codes_round_trip() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let supplier = engine
        .new_supplier(&ctx, NewPartyCmd::new("Mill"))
        .await
        .unwrap();
    let customer = engine
        .new_customer(&ctx, NewPartyCmd::new("Bakery"))
        .await
        .unwrap();
    let movement = engine
        .create_movement(
            &ctx,
            CreateMovementCmd::inbound(bin.id, 1.0, UnitOfMass::Kg).supplier(supplier.code.clone()),
        )
        .await
        .unwrap();

    for code in [&product.code, &supplier.code, &customer.code, &movement.code] {
        assert!(is_valid_code(code), "bad code {code}");
    }
    assert_eq!(engine.product(&ctx, &product.code).await.unwrap(), product);
    assert_eq!(engine.supplier(&ctx, &supplier.code).await.unwrap(), supplier);
    assert_eq!(engine.customer(&ctx, &customer.code).await.unwrap(), customer);
    assert_eq!(engine.movement(&ctx, &movement.code).await.unwrap(), movement);
}

#[tokio::test]
async fn movement_detail_hydrates_associations() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let b1 = new_bin(&engine, &product, "00").await;
    let b2 = new_bin(&engine, &product, "0").await;
    let supplier = engine
        .new_supplier(&ctx, NewPartyCmd::new("Mill"))
        .await
        .unwrap();
    let inbound = engine
        .create_movement(
            &ctx,
            CreateMovementCmd::inbound(b1.id, 3.0, UnitOfMass::Kg).supplier(supplier.code.clone()),
        )
        .await
        .unwrap();
    let transfer = engine
        .transfer_stock(&ctx, TransferStockCmd::new(b1.id, b2.id, 1.0))
        .await
        .unwrap();

    let detail = engine.movement_detail(&ctx, &inbound.code).await.unwrap();
    assert_eq!(detail.target.bin.id, b1.id);
    assert_eq!(detail.target.product.code, product.code);
    assert_eq!(detail.supplier, Some(supplier.clone()));
    assert!(detail.source.is_none());
    assert!(detail.customer.is_none());

    let detail = engine.movement_detail(&ctx, &transfer.code).await.unwrap();
    assert_eq!(detail.source.map(|source| source.bin.id), Some(b1.id));
    assert_eq!(detail.target.bin.id, b2.id);

    let by_supplier = engine
        .movements_by_supplier(&ctx, &supplier.code)
        .await
        .unwrap();
    assert_eq!(by_supplier.len(), 1);
    assert_eq!(by_supplier[0].code, inbound.code);

    let by_bin = engine.movements_by_bin(&ctx, b1.id).await.unwrap();
    let codes: Vec<&str> = by_bin.iter().map(|movement| movement.code.as_str()).collect();
    assert_eq!(codes, vec![inbound.code.as_str(), transfer.code.as_str()]);
}

#[tokio::test]
async fn ledger_pages_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let mut codes = Vec::new();
    for qty in [1.0, 2.0, 3.0] {
        codes.push(stock_in(&engine, bin.id, qty).await);
    }

    let page = engine
        .list_movements(&ctx, PageRequest::new(Some(0), Some(2)))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.limit, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].code, codes[2]);

    let rest = engine
        .list_movements(&ctx, PageRequest::new(Some(2), Some(2)))
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].code, codes[0]);
}

#[tokio::test]
async fn recorded_quantities_convert_on_read() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Saffron").await;
    let bin = new_bin(&engine, &product, "stigmas").await;

    let movement = engine
        .create_movement(
            &OpContext::new(),
            CreateMovementCmd::inbound(bin.id, 2.5, UnitOfMass::Hg),
        )
        .await
        .unwrap();

    assert_eq!(movement.unit, UnitOfMass::Hg);
    assert!((movement.quantity_in(UnitOfMass::G) - 250.0).abs() < 1e-9);
    assert!((movement.quantity_in(UnitOfMass::Kg) - 0.25).abs() < 1e-9);
}

#[tokio::test]
async fn concurrent_inbound_movements_all_land() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .create_movement(
                    &OpContext::new(),
                    CreateMovementCmd::inbound(bin.id, 1.0, UnitOfMass::Kg),
                )
                .await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    assert_eq!(quantity(&engine, bin.id).await, 20.0);
    assert_eq!(ledger_size(&engine).await, 20);
}

#[tokio::test]
async fn concurrent_outbound_movements_never_overdraw() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    stock_in(&engine, bin.id, 10.0).await;
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..15 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .create_movement(
                    &OpContext::new(),
                    CreateMovementCmd::outbound(bin.id, 1.0, UnitOfMass::Kg),
                )
                .await
        });
    }
    let mut shipped = 0;
    let mut refused = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => shipped += 1,
            Err(EngineError::InsufficientStock(_)) => refused += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(shipped, 10);
    assert_eq!(refused, 5);
    assert_eq!(quantity(&engine, bin.id).await, 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn inbound_movements_over_a_shared_pool_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_pool(&dir).await;
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .create_movement(
                    &OpContext::new(),
                    CreateMovementCmd::inbound(bin.id, 1.0, UnitOfMass::Kg),
                )
                .await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    assert_eq!(quantity(&engine, bin.id).await, 20.0);
    assert_eq!(ledger_size(&engine).await, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_writers_over_a_shared_pool_keep_the_books() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_pool(&dir).await;
    let product = new_product(&engine, "Flour").await;
    let b1 = new_bin(&engine, &product, "00").await;
    let b2 = new_bin(&engine, &product, "0").await;
    stock_in(&engine, b1.id, 10.0).await;
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..15 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            let ctx = OpContext::new();
            if i % 3 == 0 {
                engine
                    .transfer_stock(&ctx, TransferStockCmd::new(b1.id, b2.id, 1.0))
                    .await
            } else {
                engine
                    .create_movement(
                        &ctx,
                        CreateMovementCmd::outbound(b1.id, 1.0, UnitOfMass::Kg),
                    )
                    .await
            }
        });
    }
    let mut moved = 0;
    let mut refused = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => moved += 1,
            Err(EngineError::InsufficientStock(_)) => refused += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(moved, 10);
    assert_eq!(refused, 5);
    assert_eq!(quantity(&engine, b1.id).await, 0.0);
    assert_eq!(ledger_size(&engine).await, 11);
    let transferred = quantity(&engine, b2.id).await;
    assert!((0.0..=5.0).contains(&transferred));
}

#[tokio::test]
async fn cancelled_operation_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let product = new_product(&engine, "Flour").await;
    let bin = new_bin(&engine, &product, "00").await;
    let token = CancellationToken::new();
    token.cancel();
    let ctx = OpContext::new().with_cancel(token);

    let err = engine
        .create_movement(&ctx, CreateMovementCmd::inbound(bin.id, 1.0, UnitOfMass::Kg))
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::Cancelled("operation cancelled".to_string()));
    assert_eq!(quantity(&engine, bin.id).await, 0.0);
    assert_eq!(ledger_size(&engine).await, 0);
}

#[tokio::test]
async fn recompute_repairs_drifted_bins() {
    let (engine, db) = engine_with_db().await;
    let ctx = OpContext::new();
    let product = new_product(&engine, "Flour").await;
    let b1 = new_bin(&engine, &product, "00").await;
    let b2 = new_bin(&engine, &product, "0").await;
    stock_in(&engine, b1.id, 10.0).await;
    engine
        .transfer_stock(&ctx, TransferStockCmd::new(b1.id, b2.id, 4.0))
        .await
        .unwrap();

    assert!(engine.recompute_stock(&ctx).await.unwrap().is_empty());

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE product_qualities SET quantity = ? WHERE id = ?",
        vec![99.0.into(), b2.id.into()],
    ))
    .await
    .unwrap();

    let corrected = engine.recompute_stock(&ctx).await.unwrap();
    assert_eq!(corrected.len(), 1);
    assert_eq!(corrected[0].id, b2.id);
    assert_eq!(corrected[0].quantity, 4.0);
    assert_eq!(quantity(&engine, b2.id).await, 4.0);
    assert_eq!(quantity(&engine, b1.id).await, 6.0);
}

#[tokio::test]
async fn referenced_catalogue_rows_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let flour = new_product(&engine, "Flour").await;
    let used = new_bin(&engine, &flour, "00").await;
    let unused = new_bin(&engine, &flour, "0").await;
    stock_in(&engine, used.id, 1.0).await;

    let err = engine.delete_bin(&ctx, used.id).await.unwrap_err();
    let EngineError::Validation(errors) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(errors.fields[0].rule, "unreferenced");
    assert!(engine.delete_product(&ctx, &flour.code).await.is_err());

    engine.delete_bin(&ctx, unused.id).await.unwrap();
    assert!(matches!(
        engine.bin(&ctx, unused.id).await,
        Err(EngineError::NotFound(_))
    ));

    let sugar = new_product(&engine, "Sugar").await;
    let cane = new_bin(&engine, &sugar, "cane").await;
    engine.delete_product(&ctx, &sugar.code).await.unwrap();
    assert!(matches!(
        engine.bin(&ctx, cane.id).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        engine.bins_by_product(&ctx, &sugar.code).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn catalogue_listing() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();
    let flour = new_product(&engine, "Flour").await;
    new_product(&engine, "Sugar").await;
    new_bin(&engine, &flour, "00").await;
    new_bin(&engine, &flour, "0").await;

    assert_eq!(engine.list_products(&ctx).await.unwrap().len(), 2);
    assert_eq!(engine.bins_by_product(&ctx, &flour.code).await.unwrap().len(), 2);
    let bins = engine.list_bins(&ctx).await.unwrap();
    assert_eq!(bins.len(), 2);
    assert!(bins.iter().all(|bin| bin.product.code == flour.code));

    let err = engine
        .new_bin(
            &ctx,
            NewBinCmd {
                product_code: "NOSUCHCODE".to_string(),
                quality: "x".to_string(),
                price: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn users_register_and_authenticate() {
    let (engine, _db) = engine_with_db().await;
    let ctx = OpContext::new();

    let user = engine
        .register_user(&ctx, "alice", "correct horse")
        .await
        .unwrap();
    assert_eq!(user.username, "alice");

    assert_eq!(
        engine.register_user(&ctx, "alice", "another one").await,
        Err(EngineError::UsernameExists("alice".to_string()))
    );
    assert_eq!(
        engine.register_user(&ctx, "bob", "short").await.unwrap_err().tag(),
        "validation"
    );

    assert_eq!(
        engine
            .authenticate(&ctx, "alice", "correct horse")
            .await
            .unwrap()
            .username,
        "alice"
    );
    assert_eq!(
        engine.authenticate(&ctx, "alice", "wrong").await,
        Err(EngineError::InvalidCredentials)
    );
    assert_eq!(
        engine.authenticate(&ctx, "mallory", "correct horse").await,
        Err(EngineError::InvalidCredentials)
    );
}
