//! The module contains the error the engine can throw.
//!
//! Every variant maps to one kind of failure the callers can act on:
//!
//! - [`NotFound`] a referenced row is absent.
//! - [`Validation`] malformed input, with the list of failing fields.
//! - [`InsufficientStock`] a stock mutation would leave a bin below zero.
//! - [`TransferAcrossProducts`] source and target bins belong to different
//!   products.
//! - [`CannotUpdateTransfer`] an update was attempted on a transfer.
//! - [`Database`] the backend failed; the detail is opaque to end users.
//!
//! Each error exposes a short stable [`tag`](EngineError::tag) that adapters
//! can put on the wire.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`Validation`]: EngineError::Validation
//!  [`InsufficientStock`]: EngineError::InsufficientStock
//!  [`TransferAcrossProducts`]: EngineError::TransferAcrossProducts
//!  [`CannotUpdateTransfer`]: EngineError::CannotUpdateTransfer
//!  [`Database`]: EngineError::Database
use core::fmt;

use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

use crate::util::is_transient_db_error;

/// A single failing field of a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    /// Rule tag, e.g. `required`, `gt`, `oneof`.
    pub rule: String,
    /// Rule parameter, e.g. `0` for `gt`. Empty when the rule takes none.
    pub param: String,
}

/// Per-field validation failures collected while checking a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a validation error with a single failing field.
    pub fn single(field: &str, rule: &str, param: impl ToString) -> Self {
        let mut errors = Self::new();
        errors.add(field, rule, param);
        errors
    }

    pub fn add(&mut self, field: &str, rule: &str, param: impl ToString) {
        self.fields.push(FieldError {
            field: field.to_string(),
            rule: rule.to_string(),
            param: param.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok(())` when nothing failed, the collected errors otherwise.
    pub fn into_result(self) -> Result<(), EngineError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in &self.fields {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            if field.param.is_empty() {
                write!(f, "{} failed on '{}'", field.field, field.rule)?;
            } else {
                write!(
                    f,
                    "{} failed on '{}' ({})",
                    field.field, field.rule, field.param
                )?;
            }
        }
        Ok(())
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    Validation(ValidationErrors),
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),
    #[error("Transfer across products: {0}")]
    TransferAcrossProducts(String),
    #[error("Cannot update transfer: {0}")]
    CannotUpdateTransfer(String),
    #[error("\"{0}\" already present!")]
    UsernameExists(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unknown unit of mass: {0}")]
    UnknownUnit(String),
    #[error("Code minting failed: {0}")]
    CodeMintFailed(String),
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Short, stable tag identifying the error kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::InsufficientStock(_) => "insufficient_stock",
            Self::TransferAcrossProducts(_) => "transfer_across_products",
            Self::CannotUpdateTransfer(_) => "cannot_update_transfer",
            Self::UsernameExists(_) => "username_exists",
            Self::InvalidCredentials => "invalid_credentials",
            Self::UnknownUnit(_) => "unknown_unit",
            Self::CodeMintFailed(_) => "code_mint_failed",
            Self::Cancelled(_) => "cancelled",
            Self::Database(_) => "backend",
        }
    }

    /// Whether the failure is backend contention worth retrying the whole
    /// unit of work for (serialization failure, deadlock, busy database).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(err) => is_transient_db_error(err),
            _ => false,
        }
    }

    pub(crate) fn invalid(field: &str, rule: &str, param: impl ToString) -> Self {
        Self::Validation(ValidationErrors::single(field, rule, param))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::InsufficientStock(a), Self::InsufficientStock(b)) => a == b,
            (Self::TransferAcrossProducts(a), Self::TransferAcrossProducts(b)) => a == b,
            (Self::CannotUpdateTransfer(a), Self::CannotUpdateTransfer(b)) => a == b,
            (Self::UsernameExists(a), Self::UsernameExists(b)) => a == b,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::UnknownUnit(a), Self::UnknownUnit(b)) => a == b,
            (Self::CodeMintFailed(a), Self::CodeMintFailed(b)) => a == b,
            (Self::Cancelled(a), Self::Cancelled(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.add("quantity", "gt", 0);
        errors.add("unit", "oneof", "ton kg hg dag g dg cg mg");
        errors.add("target_bin_id", "required", "");

        let message = EngineError::Validation(errors).to_string();
        assert_eq!(
            message,
            "Invalid request: quantity failed on 'gt' (0), \
             unit failed on 'oneof' (ton kg hg dag g dg cg mg), \
             target_bin_id failed on 'required'"
        );
    }

    #[test]
    fn empty_validation_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let err = ValidationErrors::single("code", "len", 10).into_result();
        assert_eq!(err.unwrap_err().tag(), "validation");
    }

    #[test]
    fn tags_are_stable() {
        assert_eq!(EngineError::NotFound("x".into()).tag(), "not_found");
        assert_eq!(
            EngineError::InsufficientStock("x".into()).tag(),
            "insufficient_stock"
        );
        assert_eq!(
            EngineError::TransferAcrossProducts("x".into()).tag(),
            "transfer_across_products"
        );
        assert_eq!(
            EngineError::CannotUpdateTransfer("x".into()).tag(),
            "cannot_update_transfer"
        );
        assert_eq!(EngineError::InvalidCredentials.tag(), "invalid_credentials");
        assert_eq!(EngineError::Cancelled("x".into()).tag(), "cancelled");
        assert_eq!(
            EngineError::Database(DbErr::Custom("boom".into())).tag(),
            "backend"
        );
    }

    #[test]
    fn business_errors_are_not_transient() {
        assert!(!EngineError::InsufficientStock("x".into()).is_transient());
        assert!(!EngineError::Database(DbErr::Custom("boom".into())).is_transient());
    }
}
