//! Catalogue guards and persistence for products, bins and counterparties.
//!
//! The guards turn a dangling code into `NotFound` before the engine writes
//! anything that references it.

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Bin, Customer, EngineError, Product, ResultEngine, Supplier, UnitOfMass,
    code::insert_with_code, customers, product_qualities, products, suppliers,
};

/// Generates a `require_*` guard resolving a code into its domain record.
macro_rules! impl_require_by_code {
    ($fn_name:ident, $entity:ident, $record:ty, $label:literal, $convert:expr) => {
        pub(crate) async fn $fn_name<C: ConnectionTrait>(
            db: &C,
            code: &str,
        ) -> ResultEngine<$record> {
            let model = $entity::Entity::find()
                .filter($entity::Column::Code.eq(code))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("{} {code}", $label)))?;
            ($convert)(model)
        }
    };
}

impl_require_by_code!(require_product, products, Product, "product", Product::try_from);
impl_require_by_code!(require_supplier, suppliers, Supplier, "supplier", |model| Ok(
    Supplier::from(model)
));
impl_require_by_code!(require_customer, customers, Customer, "customer", |model| Ok(
    Customer::from(model)
));

pub(crate) async fn find_all_products<C: ConnectionTrait>(db: &C) -> ResultEngine<Vec<Product>> {
    products::Entity::find()
        .order_by_asc(products::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
}

pub(crate) async fn find_all_suppliers<C: ConnectionTrait>(
    db: &C,
) -> ResultEngine<Vec<Supplier>> {
    let models = suppliers::Entity::find()
        .order_by_asc(suppliers::Column::Id)
        .all(db)
        .await?;
    Ok(models.into_iter().map(Supplier::from).collect())
}

pub(crate) async fn find_all_customers<C: ConnectionTrait>(
    db: &C,
) -> ResultEngine<Vec<Customer>> {
    let models = customers::Entity::find()
        .order_by_asc(customers::Column::Id)
        .all(db)
        .await?;
    Ok(models.into_iter().map(Customer::from).collect())
}

pub(crate) async fn insert_product<C>(db: &C, name: &str, unit: UnitOfMass) -> ResultEngine<Product>
where
    C: ConnectionTrait + TransactionTrait,
{
    let now = Utc::now();
    let model = insert_with_code!(db, "products", |code| products::ActiveModel {
        id: ActiveValue::NotSet,
        code: ActiveValue::Set(code),
        name: ActiveValue::Set(name.to_string()),
        unit_acronym: ActiveValue::Set(unit.acronym().to_string()),
        unit_description: ActiveValue::Set(unit.description().to_string()),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    })?;
    Product::try_from(model)
}

/// Insert an empty bin for `product_code`.
pub(crate) async fn insert_bin<C: ConnectionTrait>(
    db: &C,
    product_code: &str,
    quality: &str,
    price: i64,
) -> ResultEngine<Bin> {
    let now = Utc::now();
    let model = product_qualities::ActiveModel {
        id: ActiveValue::NotSet,
        product_code: ActiveValue::Set(product_code.to_string()),
        quality: ActiveValue::Set(quality.to_string()),
        price: ActiveValue::Set(price),
        quantity: ActiveValue::Set(0.0),
        adjustment: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    }
    .insert(db)
    .await?;
    Bin::try_from(model)
}

pub(crate) async fn insert_supplier<C>(
    db: &C,
    name: &str,
    address: Option<String>,
    phone: Option<String>,
) -> ResultEngine<Supplier>
where
    C: ConnectionTrait + TransactionTrait,
{
    let now = Utc::now();
    let model = insert_with_code!(db, "suppliers", |code| suppliers::ActiveModel {
        id: ActiveValue::NotSet,
        code: ActiveValue::Set(code),
        name: ActiveValue::Set(name.to_string()),
        address: ActiveValue::Set(address.clone()),
        phone: ActiveValue::Set(phone.clone()),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    })?;
    Ok(model.into())
}

pub(crate) async fn insert_customer<C>(
    db: &C,
    name: &str,
    address: Option<String>,
    phone: Option<String>,
) -> ResultEngine<Customer>
where
    C: ConnectionTrait + TransactionTrait,
{
    let now = Utc::now();
    let model = insert_with_code!(db, "customers", |code| customers::ActiveModel {
        id: ActiveValue::NotSet,
        code: ActiveValue::Set(code),
        name: ActiveValue::Set(name.to_string()),
        address: ActiveValue::Set(address.clone()),
        phone: ActiveValue::Set(phone.clone()),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    })?;
    Ok(model.into())
}

/// Delete a product; its bins go with it.
pub(crate) async fn delete_product<C: ConnectionTrait>(db: &C, code: &str) -> ResultEngine<()> {
    product_qualities::Entity::delete_many()
        .filter(product_qualities::Column::ProductCode.eq(code))
        .exec(db)
        .await?;
    let result = products::Entity::delete_many()
        .filter(products::Column::Code.eq(code))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(EngineError::NotFound(format!("product {code}")));
    }
    Ok(())
}
