// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Users, password hashes and the session store.
//!
//! A user holds at most one live session: logging in revokes every other
//! session the user had.

use crate::error::MoneyError;
use crate::models::User;
use anyhow::{Context, Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::io::Write;
use std::path::Path;

const SESSION_TTL_DAYS: i64 = 14;
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct Session {
    pub key: String,
    pub user: User,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable password hash");
            false
        }
    }
}

fn user_by_username(conn: &Connection, username: &str) -> Result<Option<(User, String)>> {
    let row = conn
        .query_row(
            "SELECT id, username, email, password_hash FROM users WHERE username=?1",
            params![username],
            |r| {
                Ok((
                    User {
                        id: r.get(0)?,
                        username: r.get(1)?,
                        email: r.get(2)?,
                    },
                    r.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;
    Ok(row)
}

/// Registers a user and logs them in.
pub fn signup(
    conn: &Connection,
    username: &str,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<Session> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() || password.is_empty() || confirm.is_empty() {
        return Err(MoneyError::MissingFields("username, email, password, confirm".into()).into());
    }
    if password != confirm {
        return Err(MoneyError::PasswordMismatch.into());
    }
    if user_by_username(conn, username)?.is_some() {
        return Err(MoneyError::UsernameTaken.into());
    }
    let email_used: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE email=?1", params![email], |r| {
            r.get(0)
        })
        .optional()?;
    if email_used.is_some() {
        return Err(MoneyError::EmailTaken.into());
    }

    let hash = hash_password(password)?;
    conn.execute(
        "INSERT INTO users(username, email, password_hash) VALUES (?1, ?2, ?3)",
        params![username, email, hash],
    )?;
    let user = User {
        id: conn.last_insert_rowid(),
        username: username.to_string(),
        email: email.to_string(),
    };
    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    let key = create_session(conn, user.id, Utc::now())?;
    Ok(Session { key, user })
}

pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<User> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(MoneyError::MissingFields("username, password".into()).into());
    }
    match user_by_username(conn, username)? {
        Some((user, hash)) if verify_password(password, &hash) => Ok(user),
        _ => Err(MoneyError::InvalidCredentials.into()),
    }
}

pub fn login(conn: &Connection, username: &str, password: &str) -> Result<Session> {
    let user = authenticate(conn, username, password)?;
    let key = create_session(conn, user.id, Utc::now())?;
    tracing::info!(user_id = user.id, "logged in");
    Ok(Session { key, user })
}

/// Opens a session for `user_id`, dropping the user's other sessions and any
/// expired ones.
pub fn create_session(conn: &Connection, user_id: i64, now: DateTime<Utc>) -> Result<String> {
    let key = uuid::Uuid::new_v4().simple().to_string();
    let created = now.format(TS_FORMAT).to_string();
    let expires = (now + Duration::days(SESSION_TTL_DAYS))
        .format(TS_FORMAT)
        .to_string();
    conn.execute(
        "DELETE FROM sessions WHERE user_id=?1 OR expires_at<?2",
        params![user_id, created],
    )?;
    conn.execute(
        "INSERT INTO sessions(session_key, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![key, user_id, created, expires],
    )?;
    Ok(key)
}

pub fn resolve(conn: &Connection, key: &str) -> Result<Option<User>> {
    resolve_at(conn, key, Utc::now())
}

pub fn resolve_at(conn: &Connection, key: &str, now: DateTime<Utc>) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT u.id, u.username, u.email FROM sessions s JOIN users u ON s.user_id=u.id
             WHERE s.session_key=?1 AND s.expires_at>=?2",
            params![key, now.format(TS_FORMAT).to_string()],
            |r| {
                Ok(User {
                    id: r.get(0)?,
                    username: r.get(1)?,
                    email: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Revokes a session. Returns whether one existed.
pub fn logout(conn: &Connection, key: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM sessions WHERE session_key=?1", params![key])?;
    Ok(n > 0)
}

pub fn read_session_key(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading session file {}", path.display()))?;
    let key = raw.trim();
    Ok((!key.is_empty()).then(|| key.to_string()))
}

/// Writes the key, readable by the owner only on unix.
pub fn write_session_key(path: &Path, key: &str) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        // an older file keeps its mode on open, so tighten it explicitly
        if path.exists() {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Restricting session file {}", path.display()))?;
        }
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Writing session file {}", path.display()))?;
    file.write_all(key.as_bytes())
        .with_context(|| format!("Writing session file {}", path.display()))
}

pub fn clear_session_key(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Removing session file {}", path.display()))?;
    }
    Ok(())
}

/// User behind the session file, or `NotLoggedIn`.
pub fn current_user(conn: &Connection, session_path: &Path) -> Result<User> {
    let key = read_session_key(session_path)?.ok_or(MoneyError::NotLoggedIn)?;
    resolve(conn, &key)?.ok_or_else(|| MoneyError::NotLoggedIn.into())
}
