use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::{ActiveValue, DbErr, SqlErr, prelude::*};

use crate::{EngineError, OpContext, ResultEngine, User, users, util::normalize_required_text};

use super::{Engine, with_tx};

/// Shortest password accepted on registration.
const MIN_PASSWORD_LEN: usize = 8;

fn hash_password(password: &str) -> ResultEngine<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| DbErr::Custom(format!("password hashing failed: {err}")))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

impl Engine {
    /// Create a user allowed to call the stock engine.
    pub async fn register_user(
        &self,
        ctx: &OpContext,
        username: &str,
        password: &str,
    ) -> ResultEngine<User> {
        let username = normalize_required_text(username, "username")?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EngineError::invalid("password", "min", MIN_PASSWORD_LEN));
        }
        let password_hash = hash_password(password)?;

        let user = with_tx!(self, ctx, |db_tx| {
            if users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::UsernameExists(username.clone()));
            }
            let model = users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                password_hash: ActiveValue::Set(password_hash.clone()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    EngineError::UsernameExists(username.clone())
                }
                _ => err.into(),
            })?;
            Ok(User::from(model))
        })?;

        tracing::info!("user {} registered", user.username);
        Ok(user)
    }

    /// Check a username/password pair.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    pub async fn authenticate(
        &self,
        ctx: &OpContext,
        username: &str,
        password: &str,
    ) -> ResultEngine<User> {
        let model = ctx
            .guard(async {
                users::Entity::find_by_id(username.trim().to_string())
                    .one(&self.database)
                    .await
                    .map_err(EngineError::from)
            })
            .await?
            .ok_or(EngineError::InvalidCredentials)?;
        if !verify_password(password, &model.password_hash) {
            return Err(EngineError::InvalidCredentials);
        }
        Ok(User::from(model))
    }
}
