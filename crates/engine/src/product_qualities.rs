//! Product quality bins.
//!
//! A bin is the (product, quality) pair stock is held in. Its identity and
//! product never change; only the on-hand quantity moves, and only through
//! the engine.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Product};

/// Direction of the last stock adjustment applied to a bin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    Increase,
    Decrease,
}

impl Adjustment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

impl TryFrom<&str> for Adjustment {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "increase" => Ok(Self::Increase),
            "decrease" => Ok(Self::Decrease),
            other => Err(EngineError::invalid("adjustment", "oneof", format!(
                "increase decrease (got {other})"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub id: i32,
    pub product_code: String,
    pub quality: String,
    /// Unit price, in minor units.
    pub price: i64,
    /// On-hand quantity, never negative.
    pub quantity: f64,
    pub adjustment: Option<Adjustment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bin hydrated with its product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinWithProduct {
    pub bin: Bin,
    pub product: Product,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_qualities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_code: String,
    pub quality: String,
    pub price: i64,
    #[sea_orm(column_type = "Double")]
    pub quantity: f64,
    pub adjustment: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductCode",
        to = "super::products::Column::Code",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Products,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Bin {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            product_code: model.product_code,
            quality: model.quality,
            price: model.price,
            quantity: model.quantity,
            adjustment: model
                .adjustment
                .as_deref()
                .map(Adjustment::try_from)
                .transpose()?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
