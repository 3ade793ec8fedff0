//! Ledger entries (movements).
//!
//! A `Movement` records one stock event against a bin: goods received
//! (`IN`), goods shipped (`OUT`) or goods moved between two bins of the same
//! product (`TRANSFER`). The table keeps the historical name `transactions`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{BinWithProduct, Customer, EngineError, ResultEngine, Supplier, UnitOfMass};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    In,
    Out,
    Transfer,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Transfer => "TRANSFER",
        }
    }
}

impl TryFrom<&str> for MovementKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "TRANSFER" => Ok(Self::Transfer),
            other => Err(EngineError::invalid(
                "kind",
                "oneof",
                format!("IN OUT TRANSFER (got {other})"),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: i32,
    pub code: String,
    pub kind: MovementKind,
    pub target_bin_id: i32,
    /// Present iff `kind` is `TRANSFER`.
    pub source_bin_id: Option<i32>,
    /// Only on `IN`.
    pub supplier_code: Option<String>,
    /// Only on `OUT`.
    pub customer_code: Option<String>,
    pub description: Option<String>,
    pub quantity: f64,
    /// Unit the quantity was recorded in.
    pub unit: UnitOfMass,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movement {
    /// The recorded quantity expressed in another unit.
    pub fn quantity_in(&self, unit: UnitOfMass) -> f64 {
        self.unit.convert_to(unit, self.quantity)
    }
}

/// A movement hydrated with everything it references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementDetail {
    pub movement: Movement,
    pub target: BinWithProduct,
    pub source: Option<BinWithProduct>,
    pub supplier: Option<Supplier>,
    pub customer: Option<Customer>,
}

/// Fields of a movement about to be inserted; the code is minted on insert.
#[derive(Clone, Debug)]
pub(crate) struct NewMovement {
    pub kind: MovementKind,
    pub target_bin_id: i32,
    pub source_bin_id: Option<i32>,
    pub supplier_code: Option<String>,
    pub customer_code: Option<String>,
    pub description: Option<String>,
    pub quantity: f64,
    pub unit: UnitOfMass,
}

/// The mutable part of a movement.
#[derive(Clone, Debug)]
pub(crate) struct MovementChanges {
    pub quantity: f64,
    pub unit: UnitOfMass,
    pub description: Option<String>,
    pub supplier_code: Option<String>,
    pub customer_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub product_quality_id: i32,
    pub product_quality_id_source: Option<i32>,
    pub supplier_code: Option<String>,
    pub customer_code: Option<String>,
    pub description: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub quantity: f64,
    pub unit_mass_acronym: String,
    pub kind: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_qualities::Entity",
        from = "Column::ProductQualityId",
        to = "super::product_qualities::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Target,
    #[sea_orm(
        belongs_to = "super::product_qualities::Entity",
        from = "Column::ProductQualityIdSource",
        to = "super::product_qualities::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Source,
    #[sea_orm(
        belongs_to = "super::suppliers::Entity",
        from = "Column::SupplierCode",
        to = "super::suppliers::Column::Code",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Suppliers,
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerCode",
        to = "super::customers::Column::Code",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Customers,
}

impl Related<super::suppliers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Suppliers.def()
    }
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl NewMovement {
    pub(crate) fn into_active_model(self, code: String, now: DateTime<Utc>) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::NotSet,
            code: ActiveValue::Set(code),
            product_quality_id: ActiveValue::Set(self.target_bin_id),
            product_quality_id_source: ActiveValue::Set(self.source_bin_id),
            supplier_code: ActiveValue::Set(self.supplier_code),
            customer_code: ActiveValue::Set(self.customer_code),
            description: ActiveValue::Set(self.description),
            quantity: ActiveValue::Set(self.quantity),
            unit_mass_acronym: ActiveValue::Set(self.unit.acronym().to_string()),
            kind: ActiveValue::Set(self.kind.as_str().to_string()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}

impl TryFrom<Model> for Movement {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            code: model.code,
            kind: MovementKind::try_from(model.kind.as_str())?,
            target_bin_id: model.product_quality_id,
            source_bin_id: model.product_quality_id_source,
            supplier_code: model.supplier_code,
            customer_code: model.customer_code,
            description: model.description,
            quantity: model.quantity,
            unit: UnitOfMass::try_from(model.unit_mass_acronym.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
