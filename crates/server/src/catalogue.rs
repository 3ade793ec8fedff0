//! Products, product qualities, suppliers and customers.

use api_types::{
    party::{PartyNew, PartyView},
    product::{ProductNew, ProductQualityDetail, ProductQualityNew, ProductQualityView, ProductView},
    transaction::TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{NewBinCmd, NewPartyCmd, NewProductCmd, User};

use crate::{
    ServerError,
    server::ServerState,
    views::{
        bin_detail, bin_view, customer_view, parse_unit, product_view, supplier_view,
        transaction_view,
    },
};

fn party_cmd(payload: PartyNew) -> NewPartyCmd {
    NewPartyCmd {
        name: payload.name,
        address: payload.address,
        phone: payload.phone,
    }
}

pub async fn product_list(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<ProductView>>, ServerError> {
    let products = state.engine.list_products(&state.ctx()).await?;
    Ok(Json(products.into_iter().map(product_view).collect()))
}

pub async fn product_new(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ProductNew>,
) -> Result<(StatusCode, Json<ProductView>), ServerError> {
    let unit = parse_unit(&payload.unit_mass_acronym)?;
    let product = state
        .engine
        .new_product(
            &state.ctx(),
            NewProductCmd {
                name: payload.name,
                unit,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product_view(product))))
}

pub async fn product_get(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<Json<ProductView>, ServerError> {
    let product = state.engine.product(&state.ctx(), &code).await?;
    Ok(Json(product_view(product)))
}

pub async fn product_delete(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_product(&state.ctx(), &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn product_qualities(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<ProductQualityView>>, ServerError> {
    let bins = state.engine.bins_by_product(&state.ctx(), &code).await?;
    Ok(Json(bins.into_iter().map(bin_view).collect()))
}

pub async fn product_quality_new(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
    Json(payload): Json<ProductQualityNew>,
) -> Result<(StatusCode, Json<ProductQualityView>), ServerError> {
    let bin = state
        .engine
        .new_bin(
            &state.ctx(),
            NewBinCmd {
                product_code: code,
                quality: payload.quality,
                price: payload.price,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(bin_view(bin))))
}

pub async fn product_quality_list(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<ProductQualityDetail>>, ServerError> {
    let bins = state.engine.list_bins(&state.ctx()).await?;
    Ok(Json(bins.into_iter().map(bin_detail).collect()))
}

pub async fn product_quality_get(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductQualityDetail>, ServerError> {
    let bin = state.engine.bin(&state.ctx(), id).await?;
    Ok(Json(bin_detail(bin)))
}

pub async fn product_quality_delete(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_bin(&state.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Movements touching a product quality, oldest first.
pub async fn product_quality_transactions(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let movements = state.engine.movements_by_bin(&state.ctx(), id).await?;
    Ok(Json(movements.into_iter().map(transaction_view).collect()))
}

pub async fn supplier_list(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<PartyView>>, ServerError> {
    let suppliers = state.engine.list_suppliers(&state.ctx()).await?;
    Ok(Json(suppliers.into_iter().map(supplier_view).collect()))
}

pub async fn supplier_new(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<PartyNew>,
) -> Result<(StatusCode, Json<PartyView>), ServerError> {
    let supplier = state
        .engine
        .new_supplier(&state.ctx(), party_cmd(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(supplier_view(supplier))))
}

pub async fn supplier_get(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<Json<PartyView>, ServerError> {
    let supplier = state.engine.supplier(&state.ctx(), &code).await?;
    Ok(Json(supplier_view(supplier)))
}

pub async fn customer_list(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<PartyView>>, ServerError> {
    let customers = state.engine.list_customers(&state.ctx()).await?;
    Ok(Json(customers.into_iter().map(customer_view).collect()))
}

pub async fn customer_new(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<PartyNew>,
) -> Result<(StatusCode, Json<PartyView>), ServerError> {
    let customer = state
        .engine
        .new_customer(&state.ctx(), party_cmd(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(customer_view(customer))))
}

pub async fn customer_get(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<Json<PartyView>, ServerError> {
    let customer = state.engine.customer(&state.ctx(), &code).await?;
    Ok(Json(customer_view(customer)))
}
