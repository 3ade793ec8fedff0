//! Opaque codes for externally visible rows (products, suppliers, customers,
//! movements).
//!
//! A code is 10 characters drawn uniformly from `A-Z0-9` using the operating
//! system CSPRNG. Uniqueness is enforced by the database: callers insert,
//! and on a unique-key violation they mint again, at most
//! [`MAX_MINT_ATTEMPTS`] times.

use rand::{Rng, rngs::OsRng};

/// Length of every minted code.
pub const CODE_LEN: usize = 10;

/// Number of insert attempts before giving up with `CodeMintFailed`.
pub const MAX_MINT_ATTEMPTS: u32 = 5;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Mint a fresh random code.
pub fn mint_code() -> String {
    let mut rng = OsRng;
    (0..CODE_LEN)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

/// Whether `value` has the shape of a minted code.
pub fn is_valid_code(value: &str) -> bool {
    value.len() == CODE_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Insert an active model carrying a freshly minted code, minting again on a
/// unique-key violation.
///
/// Each attempt runs inside a savepoint so that a rejected insert does not
/// abort the caller's transaction on backends that poison it (Postgres).
/// Codes come from [`mint_code`] unless another minter is passed.
macro_rules! insert_with_code {
    ($db:expr, $label:expr, |$code:ident| $active:expr) => {
        $crate::code::insert_with_code!($db, $label, $crate::code::mint_code, |$code| $active)
    };
    ($db:expr, $label:expr, $mint:expr, |$code:ident| $active:expr) => {{
        let mut outcome = None;
        for attempt in 1..=$crate::code::MAX_MINT_ATTEMPTS {
            let $code = ($mint)();
            let savepoint = sea_orm::TransactionTrait::begin($db).await?;
            match sea_orm::ActiveModelTrait::insert($active, &savepoint).await {
                Ok(model) => {
                    savepoint.commit().await?;
                    outcome = Some(model);
                    break;
                }
                Err(err)
                    if matches!(
                        err.sql_err(),
                        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                    ) =>
                {
                    savepoint.rollback().await?;
                    tracing::warn!(entity = $label, attempt, "minted code collided, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        outcome.ok_or_else(|| {
            $crate::EngineError::CodeMintFailed(format!(
                "{}: {} attempts exhausted",
                $label,
                $crate::code::MAX_MINT_ATTEMPTS
            ))
        })
    }};
}

pub(crate) use insert_with_code;

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;
    use migration::MigratorTrait;
    use sea_orm::{
        ActiveModelTrait, ActiveValue, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    };

    use super::*;
    use crate::{EngineError, ResultEngine, suppliers};

    const TAKEN: &str = "TAKEN00001";

    fn supplier(code: String) -> suppliers::ActiveModel {
        let now = Utc::now();
        suppliers::ActiveModel {
            id: ActiveValue::NotSet,
            code: ActiveValue::Set(code),
            name: ActiveValue::Set("Mill".to_string()),
            address: ActiveValue::Set(None),
            phone: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }

    async fn db_with_taken_code() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        supplier(TAKEN.to_string()).insert(&db).await.unwrap();
        db
    }

    async fn insert_supplier(
        db: &DatabaseConnection,
        mut mint: impl FnMut() -> String,
    ) -> ResultEngine<suppliers::Model> {
        insert_with_code!(db, "suppliers", mint, |code| supplier(code))
    }

    #[tokio::test]
    async fn collision_mints_again() {
        let db = db_with_taken_code().await;
        let mut calls = 0;
        let model = insert_supplier(&db, || {
            calls += 1;
            if calls == 1 {
                TAKEN.to_string()
            } else {
                "FRESH00001".to_string()
            }
        })
        .await
        .unwrap();

        assert_eq!(model.code, "FRESH00001");
        assert_eq!(calls, 2);
        assert_eq!(suppliers::Entity::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn endless_collisions_give_up() {
        let db = db_with_taken_code().await;
        let mut calls = 0;
        let err = insert_supplier(&db, || {
            calls += 1;
            TAKEN.to_string()
        })
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::CodeMintFailed(_)));
        assert_eq!(calls, MAX_MINT_ATTEMPTS);
        assert_eq!(suppliers::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[test]
    fn minted_codes_have_the_expected_shape() {
        for _ in 0..1_000 {
            let code = mint_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(is_valid_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn minted_codes_do_not_repeat() {
        let codes: HashSet<String> = (0..10_000).map(|_| mint_code()).collect();
        assert_eq!(codes.len(), 10_000);
    }

    #[test]
    fn code_shape_check() {
        assert!(is_valid_code("AB12CD34EF"));
        assert!(!is_valid_code("ab12cd34ef"));
        assert!(!is_valid_code("AB12CD34E"));
        assert!(!is_valid_code("AB12CD34EF0"));
        assert!(!is_valid_code("AB12-D34EF"));
    }
}
