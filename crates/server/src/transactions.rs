//! Transactions API endpoints

use api_types::transaction::{
    TransactionDetailResponse, TransactionKind as ApiKind, TransactionList,
    TransactionListResponse, TransactionNew, TransactionUpdate, TransactionView, TransferNew,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{
    CreateMovementCmd, EngineError, PageRequest, TransferStockCmd, UpdateMovementCmd, User,
    ValidationErrors,
};

use crate::{
    ServerError,
    server::ServerState,
    views::{bin_detail, customer_view, parse_unit, supplier_view, transaction_view},
};

pub async fn list(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let page = state
        .engine
        .list_movements(&state.ctx(), PageRequest::new(query.offset, query.limit))
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: page.items.into_iter().map(transaction_view).collect(),
        total: page.total,
        offset: page.offset,
        limit: page.limit,
    }))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let unit = parse_unit(&payload.unit_mass_acronym)?;
    let mut cmd = match payload.kind {
        ApiKind::In => {
            CreateMovementCmd::inbound(payload.product_quality_id, payload.quantity, unit)
        }
        ApiKind::Out => {
            CreateMovementCmd::outbound(payload.product_quality_id, payload.quantity, unit)
        }
        ApiKind::Transfer => {
            return Err(ServerError::Engine(EngineError::Validation(
                ValidationErrors::single("kind", "oneof", "IN OUT"),
            )));
        }
    };
    cmd.supplier_code = payload.supplier_code;
    cmd.customer_code = payload.customer_code;
    cmd.description = payload.description;

    let movement = state.engine.create_movement(&state.ctx(), cmd).await?;
    tracing::debug!("{} recorded transaction {}", user.username, movement.code);

    Ok((StatusCode::CREATED, Json(transaction_view(movement))))
}

pub async fn transfer(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let mut cmd = TransferStockCmd::new(
        payload.product_quality_id_source,
        payload.product_quality_id,
        payload.quantity,
    );
    cmd.description = payload.description;

    let movement = state.engine.transfer_stock(&state.ctx(), cmd).await?;
    tracing::debug!("{} recorded transfer {}", user.username, movement.code);

    Ok((StatusCode::CREATED, Json(transaction_view(movement))))
}

pub async fn get_detail(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<Json<TransactionDetailResponse>, ServerError> {
    let detail = state.engine.movement_detail(&state.ctx(), &code).await?;

    Ok(Json(TransactionDetailResponse {
        transaction: transaction_view(detail.movement),
        product_quality: bin_detail(detail.target),
        product_quality_source: detail.source.map(bin_detail),
        supplier: detail.supplier.map(supplier_view),
        customer: detail.customer.map(customer_view),
    }))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let unit = parse_unit(&payload.unit_mass_acronym)?;
    let mut cmd = UpdateMovementCmd::new(code, payload.quantity, unit);
    cmd.description = payload.description;
    cmd.supplier_code = payload.supplier_code;
    cmd.customer_code = payload.customer_code;

    let movement = state.engine.update_movement(&state.ctx(), cmd).await?;
    tracing::debug!("{} updated transaction {}", user.username, movement.code);

    Ok(Json(transaction_view(movement)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ServerError> {
    let movement = state.engine.delete_movement(&state.ctx(), &code).await?;
    tracing::debug!("{} deleted transaction {}", user.username, movement.code);

    Ok(StatusCode::NO_CONTENT)
}

/// Transactions recorded with the supplier `code`, newest first.
pub async fn list_by_supplier(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let movements = state
        .engine
        .movements_by_supplier(&state.ctx(), &code)
        .await?;

    Ok(Json(movements.into_iter().map(transaction_view).collect()))
}

/// Transactions recorded with the customer `code`, newest first.
pub async fn list_by_customer(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let movements = state
        .engine
        .movements_by_customer(&state.ctx(), &code)
        .await?;

    Ok(Json(movements.into_iter().map(transaction_view).collect()))
}
