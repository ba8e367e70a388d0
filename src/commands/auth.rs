// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::auth::{self, clear_session_key, read_session_key, write_session_key};
use crate::models::User;
use crate::utils::required;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::io::{self, BufRead, IsTerminal};
use std::path::Path;

/// The argument's value, or the next line of `input` when it was omitted.
/// Both are trimmed and must be non-empty.
pub fn secret_or_line(
    field: &str,
    value: Option<&String>,
    input: &mut impl BufRead,
) -> Result<String> {
    if value.is_some() {
        return required(field, value).map(str::to_string);
    }
    let mut line = String::new();
    input
        .read_line(&mut line)
        .with_context(|| format!("Reading {field} from stdin"))?;
    required(field, Some(&line)).map(str::to_string)
}

/// Secret from argv or stdin; the prompt goes to stderr and only when a
/// person is typing.
fn secret(m: &clap::ArgMatches, field: &str, prompt: &str) -> Result<String> {
    let value = m.get_one::<String>(field);
    let stdin = io::stdin();
    if value.is_none() && stdin.is_terminal() {
        eprint!("{prompt}: ");
    }
    secret_or_line(field, value, &mut stdin.lock())
}

pub fn signup(conn: &Connection, session_path: &Path, m: &clap::ArgMatches) -> Result<()> {
    let username = required("username", m.get_one::<String>("username"))?;
    let email = required("email", m.get_one::<String>("email"))?;
    let password = secret(m, "password", "Password")?;
    let confirm = secret(m, "confirm", "Repeat password")?;
    let session = auth::signup(conn, username, email, &password, &confirm)?;
    write_session_key(session_path, &session.key)?;
    println!("Account created. Logged in as {}", session.user.username);
    Ok(())
}

pub fn login(conn: &Connection, session_path: &Path, m: &clap::ArgMatches) -> Result<()> {
    let username = required("username", m.get_one::<String>("username"))?;
    let password = secret(m, "password", "Password")?;
    let session = auth::login(conn, username, &password)?;
    write_session_key(session_path, &session.key)?;
    println!("Logged in as {}", session.user.username);
    Ok(())
}

pub fn logout(conn: &Connection, session_path: &Path) -> Result<()> {
    if let Some(key) = read_session_key(session_path)?
        && auth::logout(conn, &key)?
    {
        tracing::info!("session revoked");
    }
    clear_session_key(session_path)?;
    println!("You have been logged out.");
    Ok(())
}

pub fn whoami(user: &User) {
    println!("{} <{}>", user.username, user.email);
}
