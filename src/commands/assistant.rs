// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::assistant::{ChatClient, SYSTEM_PROMPT, analytics_summary, user_prompt};
use crate::config::Settings;
use crate::error::MoneyError;
use crate::forecast::{SqliteLedger, TransactionSource, build_snapshot, parse_months};
use crate::models::User;
use crate::utils::{get_currency_label, today};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

pub fn handle(
    conn: &Connection,
    user: &User,
    settings: &Settings,
    m: &clap::ArgMatches,
) -> Result<()> {
    let words: Vec<&str> = m
        .get_many::<String>("message")
        .map(|vals| vals.map(String::as_str).collect())
        .unwrap_or_default();
    let months = parse_months(m.get_one::<String>("months").map(String::as_str));
    let label = get_currency_label(conn)?;
    let prompt = build_prompt(
        &SqliteLedger::new(conn),
        user,
        &words.join(" "),
        months,
        today(),
        &label,
    )?;

    if m.get_flag("show-prompt") {
        println!("{}\n\n{}", SYSTEM_PROMPT, prompt);
        return Ok(());
    }
    let reply = ChatClient::from_settings(settings)?.complete(SYSTEM_PROMPT, &prompt)?;
    println!("{}", reply);
    Ok(())
}

/// User prompt for `message`, built from a fresh snapshot of the ledger.
pub fn build_prompt<S: TransactionSource + ?Sized>(
    source: &S,
    user: &User,
    message: &str,
    months: u32,
    today: NaiveDate,
    label: &str,
) -> Result<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(MoneyError::EmptyMessage.into());
    }
    let snapshot = build_snapshot(source, user.id, months, today)?;
    let summary = analytics_summary(&user.username, &snapshot, label);
    tracing::debug!(user_id = user.id, months, "built assistant prompt");
    Ok(user_prompt(&summary, message))
}
