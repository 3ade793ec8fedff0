//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create, update,
//! transfer and catalogue inserts), keeping call sites readable and avoiding
//! long argument lists.

use crate::{MovementKind, UnitOfMass};

/// Record goods received (`IN`) or shipped (`OUT`) on a bin.
#[derive(Clone, Debug)]
pub struct CreateMovementCmd {
    pub kind: MovementKind,
    pub target_bin_id: i32,
    pub quantity: f64,
    pub unit: UnitOfMass,
    pub supplier_code: Option<String>,
    pub customer_code: Option<String>,
    pub description: Option<String>,
}

impl CreateMovementCmd {
    #[must_use]
    pub fn inbound(target_bin_id: i32, quantity: f64, unit: UnitOfMass) -> Self {
        Self {
            kind: MovementKind::In,
            target_bin_id,
            quantity,
            unit,
            supplier_code: None,
            customer_code: None,
            description: None,
        }
    }

    #[must_use]
    pub fn outbound(target_bin_id: i32, quantity: f64, unit: UnitOfMass) -> Self {
        Self {
            kind: MovementKind::Out,
            ..Self::inbound(target_bin_id, quantity, unit)
        }
    }

    #[must_use]
    pub fn supplier(mut self, code: impl Into<String>) -> Self {
        self.supplier_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn customer(mut self, code: impl Into<String>) -> Self {
        self.customer_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Change the mutable fields of an existing movement.
///
/// Optional text fields are patches: `None` keeps the stored value, a blank
/// string clears it.
#[derive(Clone, Debug)]
pub struct UpdateMovementCmd {
    pub code: String,
    pub quantity: f64,
    pub unit: UnitOfMass,
    pub description: Option<String>,
    pub supplier_code: Option<String>,
    pub customer_code: Option<String>,
}

impl UpdateMovementCmd {
    #[must_use]
    pub fn new(code: impl Into<String>, quantity: f64, unit: UnitOfMass) -> Self {
        Self {
            code: code.into(),
            quantity,
            unit,
            description: None,
            supplier_code: None,
            customer_code: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn supplier(mut self, code: impl Into<String>) -> Self {
        self.supplier_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn customer(mut self, code: impl Into<String>) -> Self {
        self.customer_code = Some(code.into());
        self
    }
}

/// Move stock between two bins of the same product.
#[derive(Clone, Debug)]
pub struct TransferStockCmd {
    pub source_bin_id: i32,
    pub target_bin_id: i32,
    pub quantity: f64,
    pub description: Option<String>,
}

impl TransferStockCmd {
    #[must_use]
    pub fn new(source_bin_id: i32, target_bin_id: i32, quantity: f64) -> Self {
        Self {
            source_bin_id,
            target_bin_id,
            quantity,
            description: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Create a product.
#[derive(Clone, Debug)]
pub struct NewProductCmd {
    pub name: String,
    pub unit: UnitOfMass,
}

/// Create an empty bin for a product.
#[derive(Clone, Debug)]
pub struct NewBinCmd {
    pub product_code: String,
    pub quality: String,
    pub price: i64,
}

/// Create a supplier or a customer.
#[derive(Clone, Debug)]
pub struct NewPartyCmd {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl NewPartyCmd {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            phone: None,
        }
    }
}
