use api_types::{ErrorResponse, FieldErrorView};
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{ServerConfig, ServerState, router, run, run_with_listener, spawn_with_listener};

mod catalogue;
mod server;
mod transactions;
mod views;

pub mod types {
    pub mod transaction {
        pub use api_types::transaction::{
            TransactionDetailResponse, TransactionKind, TransactionList, TransactionListResponse,
            TransactionNew, TransactionUpdate, TransactionView, TransferNew,
        };
    }

    pub mod product {
        pub use api_types::product::{
            ProductNew, ProductQualityDetail, ProductQualityNew, ProductQualityView, ProductView,
        };
    }

    pub mod party {
        pub use api_types::party::{PartyNew, PartyView};
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::InsufficientStock(_)
        | EngineError::TransferAcrossProducts(_)
        | EngineError::CannotUpdateTransfer(_)
        | EngineError::UnknownUnit(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::UsernameExists(_) => StatusCode::CONFLICT,
        EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        EngineError::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
        EngineError::CodeMintFailed(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn body_for_engine_error(err: EngineError) -> ErrorResponse {
    let tag = err.tag().to_string();
    match err {
        EngineError::Database(_) | EngineError::CodeMintFailed(_) => {
            tracing::error!("backend error: {err}");
            ErrorResponse {
                tag,
                error: "internal server error".to_string(),
                fields: Vec::new(),
            }
        }
        EngineError::Validation(ref errors) => ErrorResponse {
            tag,
            error: err.to_string(),
            fields: errors
                .fields
                .iter()
                .map(|field| FieldErrorView {
                    field: field.field.clone(),
                    rule: field.rule.clone(),
                    param: field.param.clone(),
                })
                .collect(),
        },
        other => ErrorResponse {
            tag,
            error: other.to_string(),
            fields: Vec::new(),
        },
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), body_for_engine_error(err)),
            ServerError::Generic(error) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    tag: "bad_request".to_string(),
                    error,
                    fields: Vec::new(),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use engine::ValidationErrors;

    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        assert_eq!(status_of(EngineError::NotFound("x".to_string())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_validation_maps_to_400() {
        let err = EngineError::Validation(ValidationErrors::single("quantity", "gt", 0));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn stock_rules_map_to_422() {
        for err in [
            EngineError::InsufficientStock("x".to_string()),
            EngineError::TransferAcrossProducts("x".to_string()),
            EngineError::CannotUpdateTransfer("x".to_string()),
            EngineError::UnknownUnit("lb".to_string()),
        ] {
            assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn auth_errors() {
        assert_eq!(status_of(EngineError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(EngineError::UsernameExists("x".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn cancelled_maps_to_408() {
        assert_eq!(
            status_of(EngineError::Cancelled("deadline exceeded".to_string())),
            StatusCode::REQUEST_TIMEOUT
        );
    }

    #[test]
    fn backend_errors_are_opaque() {
        let body = body_for_engine_error(EngineError::CodeMintFailed("products".to_string()));
        assert_eq!(body.tag, "code_mint_failed");
        assert_eq!(body.error, "internal server error");
        assert_eq!(
            status_of(EngineError::CodeMintFailed("products".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_body_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("quantity", "gt", 0);
        errors.add("target_bin_id", "nefield", "source_bin_id");
        let body = body_for_engine_error(EngineError::Validation(errors));
        assert_eq!(body.tag, "validation");
        assert_eq!(body.fields.len(), 2);
        assert_eq!(body.fields[1].rule, "nefield");
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
