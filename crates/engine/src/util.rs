//! Internal helpers for input normalization and backend error inspection.
//!
//! These utilities are **not** part of the public API.

use sea_orm::{DbErr, RuntimeErr, sqlx};

use crate::{EngineError, ResultEngine};

/// Tolerance used when comparing stored quantities (stored as doubles).
pub(crate) const QUANTITY_EPSILON: f64 = 1e-9;

/// Trim an optional text and map blank values to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Trim a required text, failing with a `required` validation error when blank.
pub(crate) fn normalize_required_text(value: &str, field: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid(field, "required", ""));
    }
    Ok(trimmed.to_string())
}

/// A movement quantity must be a finite number strictly greater than zero.
pub(crate) fn validate_quantity(quantity: f64, field: &str) -> ResultEngine<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(EngineError::invalid(field, "gt", 0));
    }
    Ok(())
}

/// A stock delta must be finite and non-negative.
pub(crate) fn validate_delta(delta: f64) -> ResultEngine<()> {
    if !delta.is_finite() || delta < 0.0 {
        return Err(EngineError::invalid("delta", "gte", 0));
    }
    Ok(())
}

/// Apply an optional text patch: `None` keeps the current value, a blank
/// string clears it.
pub(crate) fn apply_optional_text_patch(
    existing: Option<String>,
    patch: Option<&str>,
) -> Option<String> {
    match patch {
        None => existing,
        Some(value) => normalize_optional_text(Some(value)),
    }
}

/// Serialization failures, deadlocks and busy/locked SQLite databases.
///
/// Postgres reports `40001`/`40P01`; SQLite reports primary result codes
/// `5` (`SQLITE_BUSY`) and `6` (`SQLITE_LOCKED`), optionally extended.
pub(crate) fn is_transient_db_error(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Conn(runtime) | DbErr::Exec(runtime) | DbErr::Query(runtime) => runtime,
        _ => return false,
    };
    let RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) = runtime else {
        return false;
    };
    let Some(code) = db_err.code() else {
        return false;
    };
    match code.as_ref() {
        "40001" | "40P01" => true,
        other => other
            .parse::<i32>()
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),
    }
}
