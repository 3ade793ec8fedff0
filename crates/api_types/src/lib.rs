use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short stable tag, e.g. `insufficient_stock`.
    pub tag: String,
    pub error: String,
    /// Failing fields of a rejected request; empty for other errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldErrorView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldErrorView {
    pub field: String,
    pub rule: String,
    pub param: String,
}

pub mod transaction {
    use super::*;
    use crate::{party::PartyView, product::ProductQualityDetail};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum TransactionKind {
        In,
        Out,
        Transfer,
    }

    /// Query string of `GET /api/transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub offset: Option<u64>,
        /// Clamped to `1..=200`, defaults to 50.
        pub limit: Option<u64>,
    }

    /// Body of `POST /api/transactions`. Only `IN` and `OUT` are accepted;
    /// transfers go through `POST /api/transactions/transfer`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        pub product_quality_id: i32,
        /// Must be > 0.
        pub quantity: f64,
        pub unit_mass_acronym: String,
        /// Only with `IN`.
        pub supplier_code: Option<String>,
        /// Only with `OUT`.
        pub customer_code: Option<String>,
        pub description: Option<String>,
    }

    /// Body of `PATCH /api/transactions/{code}`.
    ///
    /// Absent optional fields keep their value, empty strings clear it.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub quantity: f64,
        pub unit_mass_acronym: String,
        pub description: Option<String>,
        pub supplier_code: Option<String>,
        pub customer_code: Option<String>,
    }

    /// Body of `POST /api/transactions/transfer`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub product_quality_id_source: i32,
        pub product_quality_id: i32,
        pub quantity: f64,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub code: String,
        pub kind: TransactionKind,
        pub product_quality_id: i32,
        pub product_quality_id_source: Option<i32>,
        pub supplier_code: Option<String>,
        pub customer_code: Option<String>,
        pub description: Option<String>,
        pub quantity: f64,
        pub unit_mass_acronym: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Size of the whole ledger.
        pub total: u64,
        pub offset: u64,
        pub limit: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionDetailResponse {
        pub transaction: TransactionView,
        pub product_quality: ProductQualityDetail,
        pub product_quality_source: Option<ProductQualityDetail>,
        pub supplier: Option<PartyView>,
        pub customer: Option<PartyView>,
    }
}

pub mod product {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductNew {
        pub name: String,
        pub unit_mass_acronym: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductView {
        pub code: String,
        pub name: String,
        pub unit_mass_acronym: String,
        pub unit_mass_description: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    /// Body of `POST /api/products/{code}/qualities`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductQualityNew {
        pub quality: String,
        /// Unit price in minor units.
        pub price: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductQualityView {
        pub id: i32,
        pub product_code: String,
        pub quality: String,
        pub price: i64,
        pub quantity: f64,
        /// `increase` or `decrease`, absent until stock first moves.
        pub adjustment: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductQualityDetail {
        pub product_quality: ProductQualityView,
        pub product: ProductView,
    }
}

pub mod party {
    use super::*;

    /// Body creating a supplier or a customer.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PartyNew {
        pub name: String,
        pub address: Option<String>,
        pub phone: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PartyView {
        pub code: String,
        pub name: String,
        pub address: Option<String>,
        pub phone: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}
