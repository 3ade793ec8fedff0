//! Engine records to wire views.

use api_types::{
    party::PartyView,
    product::{ProductQualityDetail, ProductQualityView, ProductView},
    transaction::{TransactionKind as ApiKind, TransactionView},
};
use engine::{
    Bin, BinWithProduct, Customer, EngineError, Movement, MovementKind, Product, Supplier,
    UnitOfMass, ValidationErrors,
};

use crate::ServerError;

pub(crate) fn map_kind(kind: MovementKind) -> ApiKind {
    match kind {
        MovementKind::In => ApiKind::In,
        MovementKind::Out => ApiKind::Out,
        MovementKind::Transfer => ApiKind::Transfer,
    }
}

/// Unit acronym coming from a request body; unknown acronyms are a field
/// error of the request rather than a stock rule.
pub(crate) fn parse_unit(acronym: &str) -> Result<UnitOfMass, ServerError> {
    UnitOfMass::try_from(acronym.trim()).map_err(|_| {
        ServerError::Engine(EngineError::Validation(ValidationErrors::single(
            "unit_mass_acronym",
            "oneof",
            UnitOfMass::acronyms(),
        )))
    })
}

pub(crate) fn transaction_view(movement: Movement) -> TransactionView {
    TransactionView {
        code: movement.code,
        kind: map_kind(movement.kind),
        product_quality_id: movement.target_bin_id,
        product_quality_id_source: movement.source_bin_id,
        supplier_code: movement.supplier_code,
        customer_code: movement.customer_code,
        description: movement.description,
        quantity: movement.quantity,
        unit_mass_acronym: movement.unit.acronym().to_string(),
        created_at: movement.created_at,
        updated_at: movement.updated_at,
    }
}

pub(crate) fn product_view(product: Product) -> ProductView {
    ProductView {
        code: product.code,
        name: product.name,
        unit_mass_acronym: product.unit.acronym().to_string(),
        unit_mass_description: product.unit_description,
        created_at: product.created_at,
        updated_at: product.updated_at,
    }
}

pub(crate) fn bin_view(bin: Bin) -> ProductQualityView {
    ProductQualityView {
        id: bin.id,
        product_code: bin.product_code,
        quality: bin.quality,
        price: bin.price,
        quantity: bin.quantity,
        adjustment: bin.adjustment.map(|adjustment| adjustment.as_str().to_string()),
        created_at: bin.created_at,
        updated_at: bin.updated_at,
    }
}

pub(crate) fn bin_detail(bin: BinWithProduct) -> ProductQualityDetail {
    ProductQualityDetail {
        product_quality: bin_view(bin.bin),
        product: product_view(bin.product),
    }
}

pub(crate) fn supplier_view(supplier: Supplier) -> PartyView {
    PartyView {
        code: supplier.code,
        name: supplier.name,
        address: supplier.address,
        phone: supplier.phone,
        created_at: supplier.created_at,
        updated_at: supplier.updated_at,
    }
}

pub(crate) fn customer_view(customer: Customer) -> PartyView {
    PartyView {
        code: customer.code,
        name: customer.name,
        address: customer.address,
        phone: customer.phone,
        created_at: customer.created_at,
        updated_at: customer.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parsing_accepts_table_acronyms() {
        assert!(matches!(parse_unit("kg"), Ok(UnitOfMass::Kg)));
        assert!(matches!(parse_unit(" ton "), Ok(UnitOfMass::Ton)));
    }

    #[test]
    fn unknown_unit_is_a_field_error() {
        let Err(ServerError::Engine(EngineError::Validation(errors))) = parse_unit("lb") else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.fields[0].field, "unit_mass_acronym");
        assert_eq!(errors.fields[0].rule, "oneof");
    }
}
