// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::MoneyError;
use crate::models::{Account, TxKind, User};
use crate::utils::{
    fmt_money, get_currency_label, id_for_account, is_foreign_key_violation, maybe_print_json,
    parse_amount, parse_date, parse_decimal, pretty_table, required, stored_decimal,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub const TRANSFER_CATEGORY: &str = "Transfer";

pub fn handle(conn: &Connection, user: &User, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = required("name", sub.get_one::<String>("name"))?;
            let balance = parse_decimal(required("balance", sub.get_one::<String>("balance"))?)?;
            add(conn, user.id, name, balance)?;
            println!("Account created successfully: '{}' ({})", name, balance);
        }
        Some(("list", sub)) => list(conn, user.id, sub)?,
        Some(("edit", sub)) => {
            let name = required("name", sub.get_one::<String>("name"))?;
            let new_name = required("new-name", sub.get_one::<String>("new-name"))?;
            let balance = parse_decimal(required("balance", sub.get_one::<String>("balance"))?)?;
            edit(conn, user.id, name, new_name, balance)?;
            println!("Account updated successfully: '{}'", new_name);
        }
        Some(("rm", sub)) => {
            let name = required("name", sub.get_one::<String>("name"))?;
            remove(conn, user.id, name)?;
            println!("Removed account '{}'", name);
        }
        Some(("transfer", sub)) => {
            let from = required("from", sub.get_one::<String>("from"))?;
            let to = required("to", sub.get_one::<String>("to"))?;
            let amount = parse_amount(required("amount", sub.get_one::<String>("amount"))?)?;
            let date = parse_date(required("date", sub.get_one::<String>("date"))?)?;
            let note = sub.get_one::<String>("note").map(|s| s.trim()).unwrap_or("");
            transfer(conn, user.id, from, to, amount, date, note)?;
            println!("Transfer recorded: {} from '{}' to '{}'", amount, from, to);
        }
        _ => {}
    }
    Ok(())
}

pub fn add(conn: &Connection, user_id: i64, name: &str, balance: Decimal) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts(user_id, name, balance) VALUES (?1, ?2, ?3)",
        params![user_id, name, balance.to_string()],
    )
    .with_context(|| format!("Could not create account '{}'", name))?;
    let id = conn.last_insert_rowid();
    tracing::info!(user_id, account_id = id, name, "account created");
    Ok(id)
}

pub fn edit(
    conn: &Connection,
    user_id: i64,
    name: &str,
    new_name: &str,
    balance: Decimal,
) -> Result<()> {
    let id = id_for_account(conn, user_id, name)?;
    conn.execute(
        "UPDATE accounts SET name=?1, balance=?2 WHERE id=?3",
        params![new_name, balance.to_string(), id],
    )
    .with_context(|| format!("Could not rename account to '{}'", new_name))?;
    tracing::info!(user_id, account_id = id, "account updated");
    Ok(())
}

pub fn remove(conn: &Connection, user_id: i64, name: &str) -> Result<()> {
    let id = id_for_account(conn, user_id, name)?;
    match conn.execute("DELETE FROM accounts WHERE id=?1", params![id]) {
        Ok(_) => {
            tracing::info!(user_id, account_id = id, "account removed");
            Ok(())
        }
        Err(e) if is_foreign_key_violation(&e) => Err(MoneyError::InUse { what: "account" }.into()),
        Err(e) => Err(e.into()),
    }
}

/// Accounts by name with stored balance and opening + income - expense.
pub fn list_accounts(conn: &Connection, user_id: i64) -> Result<Vec<Account>> {
    let mut flows: HashMap<i64, Decimal> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT account_id, type, amount FROM transactions
             WHERE user_id=?1 AND type IN ('income','expense')",
        )?;
        let mut rows = stmt.query(params![user_id])?;
        while let Some(r) = rows.next()? {
            let account_id: i64 = r.get(0)?;
            let kind: String = r.get(1)?;
            let amount = stored_decimal(&r.get::<_, String>(2)?, "amount")?;
            let entry = flows.entry(account_id).or_insert(Decimal::ZERO);
            if kind == TxKind::Income.as_str() {
                *entry += amount;
            } else {
                *entry -= amount;
            }
        }
    }

    let mut stmt =
        conn.prepare("SELECT id, name, balance FROM accounts WHERE user_id=?1 ORDER BY name")?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (id, name, bal_s) = row?;
        let balance = stored_decimal(&bal_s, "account balance")?;
        let live_balance = balance + flows.get(&id).copied().unwrap_or(Decimal::ZERO);
        data.push(Account {
            id,
            name,
            balance,
            live_balance,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let data = list_accounts(conn, user_id)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let label = get_currency_label(conn)?;
        let rows = data
            .iter()
            .map(|a| {
                vec![
                    a.name.clone(),
                    fmt_money(&a.balance, &label),
                    fmt_money(&a.live_balance, &label),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Account", "Opening", "Live balance"], rows)
        );
    }
    Ok(())
}

/// Category used for one side of a transfer, created on first use.
fn transfer_category(conn: &Connection, user_id: i64, kind: TxKind) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE user_id=?1 AND name=?2 AND type=?3",
            params![user_id, TRANSFER_CATEGORY, kind.as_str()],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO categories(user_id, name, type) VALUES (?1, ?2, ?3)",
        params![user_id, TRANSFER_CATEGORY, kind.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Moves `amount` between two of the user's accounts: records an
/// out-transfer and an in-transfer and adjusts both stored balances.
pub fn transfer(
    conn: &Connection,
    user_id: i64,
    from: &str,
    to: &str,
    amount: Decimal,
    date: NaiveDate,
    note: &str,
) -> Result<()> {
    if from == to {
        return Err(MoneyError::SameAccount.into());
    }
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NonPositiveAmount.into());
    }
    let src_id = id_for_account(conn, user_id, from)?;
    let dst_id = id_for_account(conn, user_id, to)?;

    let accounts = list_accounts(conn, user_id)?;
    let available = accounts
        .iter()
        .find(|a| a.id == src_id)
        .map(|a| a.live_balance)
        .unwrap_or(Decimal::ZERO);
    if available < amount {
        return Err(MoneyError::InsufficientBalance {
            account: from.to_string(),
            available,
        }
        .into());
    }

    let tx = conn.unchecked_transaction()?;
    let cat_out = transfer_category(&tx, user_id, TxKind::TransferOut)?;
    let cat_in = transfer_category(&tx, user_id, TxKind::TransferIn)?;
    let insert = "INSERT INTO transactions(user_id, account_id, category_id, type, amount, date, note)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
    tx.execute(
        insert,
        params![
            user_id,
            src_id,
            cat_out,
            TxKind::TransferOut.as_str(),
            amount.to_string(),
            date.to_string(),
            format!("Transfer to {}. {}", to, note).trim()
        ],
    )?;
    tx.execute(
        insert,
        params![
            user_id,
            dst_id,
            cat_in,
            TxKind::TransferIn.as_str(),
            amount.to_string(),
            date.to_string(),
            format!("Transfer from {}. {}", from, note).trim()
        ],
    )?;

    for (id, delta) in [(src_id, -amount), (dst_id, amount)] {
        let bal_s: String = tx.query_row(
            "SELECT balance FROM accounts WHERE id=?1",
            params![id],
            |r| r.get(0),
        )?;
        let updated = stored_decimal(&bal_s, "account balance")? + delta;
        tx.execute(
            "UPDATE accounts SET balance=?1 WHERE id=?2",
            params![updated.to_string(), id],
        )?;
    }
    tx.commit()?;
    tracing::info!(user_id, from, to, %amount, "transfer recorded");
    Ok(())
}
