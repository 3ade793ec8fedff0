use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use engine::{Engine, EngineError, OpContext};

use std::{net::SocketAddr, sync::Arc, time::Duration};

use crate::{ServerError, catalogue, transactions};

/// Listener address and per-request limits.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Deadline handed to the engine for every request.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub request_timeout: Duration,
}

impl ServerState {
    pub fn new(engine: Engine, request_timeout: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            request_timeout,
        }
    }

    /// Fresh operation context bounded by the request timeout.
    pub(crate) fn ctx(&self) -> OpContext {
        OpContext::new().with_timeout(self.request_timeout)
    }
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(credentials)) = auth_header else {
        return Err(EngineError::InvalidCredentials.into());
    };
    if credentials.username().is_empty() || credentials.password().is_empty() {
        return Err(EngineError::InvalidCredentials.into());
    }

    let user = state
        .engine
        .authenticate(&state.ctx(), credentials.username(), credentials.password())
        .await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/api/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/api/transactions/transfer",
            axum::routing::post(transactions::transfer),
        )
        .route(
            "/api/transactions/{code}",
            get(transactions::get_detail)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route(
            "/api/transactions/{code}/supplier",
            get(transactions::list_by_supplier),
        )
        .route(
            "/api/transactions/{code}/customer",
            get(transactions::list_by_customer),
        )
        .route(
            "/api/products",
            get(catalogue::product_list).post(catalogue::product_new),
        )
        .route(
            "/api/products/{code}",
            get(catalogue::product_get).delete(catalogue::product_delete),
        )
        .route(
            "/api/products/{code}/qualities",
            get(catalogue::product_qualities).post(catalogue::product_quality_new),
        )
        .route(
            "/api/product-qualities",
            get(catalogue::product_quality_list),
        )
        .route(
            "/api/product-qualities/{id}",
            get(catalogue::product_quality_get).delete(catalogue::product_quality_delete),
        )
        .route(
            "/api/product-qualities/{id}/transactions",
            get(catalogue::product_quality_transactions),
        )
        .route(
            "/api/suppliers",
            get(catalogue::supplier_list).post(catalogue::supplier_new),
        )
        .route("/api/suppliers/{code}", get(catalogue::supplier_get))
        .route(
            "/api/customers",
            get(catalogue::customer_list).post(catalogue::customer_new),
        )
        .route("/api/customers/{code}", get(catalogue::customer_get))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

pub async fn run(engine: Engine, config: ServerConfig) {
    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {}: {err}", config.bind);
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, config.request_timeout, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    request_timeout: Duration,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState::new(engine, request_timeout);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

pub fn spawn_with_listener(
    engine: Engine,
    request_timeout: Duration,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, request_timeout, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
