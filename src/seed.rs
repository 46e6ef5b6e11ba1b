//! Operator-managed accounts: the `user add` command and the startup seed file.
//!
//! ```toml
//! [[users]]
//! email = "ada@club.example"
//! display_name = "Ada"
//! role = "admin"
//! password = "change-me"
//! ```

use rusqlite::Connection;
use serde::Deserialize;

use std::path::Path;

use crate::auth::{self, AuthError};
use crate::db::queries::users::{self, NewUser};
use crate::db::{DbError, Store};
use crate::types::model::{Role, User};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid seed file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub display_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub password: String,
}

fn default_role() -> Role {
    Role::Member
}

pub fn load_seed(path: &Path) -> Result<SeedFile, SeedError> {
    let raw = std::fs::read_to_string(path)?;
    parse_seed(&raw)
}

pub(crate) fn parse_seed(raw: &str) -> Result<SeedFile, SeedError> {
    Ok(toml::from_str(raw)?)
}

/// Create one account. Emails are unique, case-insensitively.
pub fn add_user(conn: &Connection, user: &SeedUser) -> Result<User, SeedError> {
    let email = user.email.trim();
    let display_name = user.display_name.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(SeedError::Invalid(format!("invalid email '{}'", user.email)));
    }
    if display_name.is_empty() {
        return Err(SeedError::Invalid("display name cannot be empty".to_string()));
    }
    if user.password.len() < 8 {
        return Err(SeedError::Invalid(format!(
            "password for {email} must be at least 8 characters"
        )));
    }
    let password_hash = auth::hash_password(&user.password)?;
    Ok(users::insert(
        conn,
        &NewUser {
            email: email.to_string(),
            display_name: display_name.to_string(),
            role: user.role,
            password_hash,
        },
    )?)
}

/// Insert every seed account whose email is not registered yet. Returns how many were created.
pub fn apply_seed(store: &Store, seed: &SeedFile) -> Result<usize, SeedError> {
    let conn = store.lock();
    let mut created = 0;
    for user in &seed.users {
        if users::credentials_by_email(&conn, user.email.trim())?.is_some() {
            continue;
        }
        let user = add_user(&conn, user)?;
        tracing::info!(user = %user.id, email = %user.email, "seeded account");
        created += 1;
    }
    Ok(created)
}
