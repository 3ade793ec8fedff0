//! Products of the catalogue.
//!
//! A product owns its quality bins (`product_qualities`) for life; deleting a
//! product removes its bins.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, UnitOfMass};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i32,
    pub code: String,
    pub name: String,
    /// Unit the product is measured in.
    pub unit: UnitOfMass,
    pub unit_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub unit_acronym: String,
    pub unit_description: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_qualities::Entity")]
    ProductQualities,
}

impl Related<super::product_qualities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductQualities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Product {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            code: model.code,
            name: model.name,
            unit: UnitOfMass::try_from(model.unit_acronym.as_str())?,
            unit_description: model.unit_description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
