// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::MoneyError;
use crate::models::{Transaction, TxKind, User};
use crate::utils::{
    fmt_money, get_currency_label, id_for_account, id_for_category_of_kind, maybe_print_json,
    parse_amount, parse_date, pretty_table, required, stored_decimal,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, user: &User, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = TxInput::from_matches(conn, user.id, sub)?;
            add(conn, user.id, &input)?;
            println!(
                "Transaction added successfully: {} {} on {}",
                input.kind, input.amount, input.date
            );
        }
        Some(("list", sub)) => list(conn, user.id, sub)?,
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").context("id missing")?;
            let input = TxInput::from_matches(conn, user.id, sub)?;
            edit(conn, user.id, id, &input)?;
            println!("Transaction {} updated successfully", id);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").context("id missing")?;
            remove(conn, user.id, id)?;
            println!("Removed transaction {}", id);
        }
        _ => {}
    }
    Ok(())
}

/// Validated fields of an income/expense entry.
#[derive(Debug, Clone)]
pub struct TxInput {
    pub account_id: i64,
    pub category_id: i64,
    pub kind: TxKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub note: String,
}

impl TxInput {
    pub fn from_matches(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<Self> {
        let account = required("account", sub.get_one::<String>("account"))?;
        let category = required("category", sub.get_one::<String>("category"))?;
        let kind = TxKind::parse_user(required("type", sub.get_one::<String>("type"))?)?;
        let amount = parse_amount(required("amount", sub.get_one::<String>("amount"))?)?;
        let date = parse_date(required("date", sub.get_one::<String>("date"))?)?;
        let note = sub
            .get_one::<String>("note")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let account_id = id_for_account(conn, user_id, account)?;
        let category_id = id_for_category_of_kind(conn, user_id, category, kind)?;
        Ok(Self {
            account_id,
            category_id,
            kind,
            amount,
            date,
            note,
        })
    }
}

pub fn add(conn: &Connection, user_id: i64, input: &TxInput) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions(user_id, account_id, category_id, type, amount, date, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            input.account_id,
            input.category_id,
            input.kind.as_str(),
            input.amount.to_string(),
            input.date.to_string(),
            input.note
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(user_id, transaction_id = id, kind = %input.kind, "transaction added");
    Ok(id)
}

pub fn edit(conn: &Connection, user_id: i64, id: i64, input: &TxInput) -> Result<()> {
    let n = conn.execute(
        "UPDATE transactions SET account_id=?1, category_id=?2, type=?3, amount=?4, date=?5, note=?6
         WHERE id=?7 AND user_id=?8",
        params![
            input.account_id,
            input.category_id,
            input.kind.as_str(),
            input.amount.to_string(),
            input.date.to_string(),
            input.note,
            id,
            user_id
        ],
    )?;
    if n == 0 {
        return Err(not_found(id));
    }
    tracing::info!(user_id, transaction_id = id, "transaction updated");
    Ok(())
}

pub fn remove(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    let n = conn.execute(
        "DELETE FROM transactions WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    if n == 0 {
        return Err(not_found(id));
    }
    tracing::info!(user_id, transaction_id = id, "transaction removed");
    Ok(())
}

fn not_found(id: i64) -> anyhow::Error {
    MoneyError::NotFound {
        what: "Transaction",
        key: id.to_string(),
    }
    .into()
}

fn list(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, user_id, sub)?;
    if maybe_print_json(json_flag, jsonl_flag, &data)? {
        return Ok(());
    }
    let label = get_currency_label(conn)?;
    for group in group_by_month(&data) {
        println!("{}", group.label);
        let rows: Vec<Vec<String>> = group
            .transactions
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.date.to_string(),
                    t.account.clone(),
                    t.category.clone(),
                    t.kind.to_string(),
                    fmt_money(&t.amount, &label),
                    t.note.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Account", "Category", "Type", "Amount", "Note"],
                rows,
            )
        );
    }
    let years = years_with_activity(conn, user_id)?;
    if !years.is_empty() {
        let ys: Vec<String> = years.iter().map(|y| y.to_string()).collect();
        println!("Years with activity: {}", ys.join(", "));
    }
    Ok(())
}

/// Filtered transactions, newest first.
pub fn query_rows(
    conn: &Connection,
    user_id: i64,
    sub: &clap::ArgMatches,
) -> Result<Vec<Transaction>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, a.name, c.name, t.type, t.amount, t.note FROM transactions t LEFT JOIN accounts a ON t.account_id=a.id LEFT JOIN categories c ON t.category_id=c.id WHERE t.user_id=?",
    );
    let mut params_vec: Vec<String> = vec![user_id.to_string()];

    if let Some(q) = sub.get_one::<String>("q").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        sql.push_str(" AND (t.note LIKE ? OR c.name LIKE ?)");
        let pattern = format!("%{}%", q);
        params_vec.push(pattern.clone());
        params_vec.push(pattern);
    }
    if let Some(acct) = sub.get_one::<String>("account") {
        sql.push_str(" AND a.name=?");
        params_vec.push(acct.trim().into());
    }
    // An unparsable year is ignored rather than rejected.
    if let Some(year) = sub
        .get_one::<String>("year")
        .and_then(|s| s.trim().parse::<i32>().ok())
    {
        sql.push_str(" AND substr(t.date,1,4)=?");
        params_vec.push(format!("{:04}", year));
    }
    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(t.date,1,7)=?");
        params_vec.push(month.trim().into());
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let date: String = r.get(1)?;
        let account: Option<String> = r.get(2)?;
        let category: Option<String> = r.get(3)?;
        let kind: String = r.get(4)?;
        let amount: String = r.get(5)?;
        let note: String = r.get(6)?;
        data.push(Transaction {
            id,
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .with_context(|| format!("Invalid transaction date '{}'", date))?,
            account: account.unwrap_or_default(),
            category: category.unwrap_or_default(),
            kind: kind
                .parse::<TxKind>()
                .with_context(|| format!("Invalid transaction type '{}'", kind))?,
            amount: stored_decimal(&amount, "amount")?,
            note,
        });
    }
    Ok(data)
}

#[derive(Debug, Serialize)]
pub struct MonthGroup<'a> {
    pub key: String,   // YYYY-MM
    pub label: String, // e.g. "January 2025"
    pub transactions: Vec<&'a Transaction>,
}

/// Consecutive runs of rows sharing a calendar month, in input order.
pub fn group_by_month(rows: &[Transaction]) -> Vec<MonthGroup<'_>> {
    let mut groups: Vec<MonthGroup<'_>> = Vec::new();
    for t in rows {
        let key = t.date.format("%Y-%m").to_string();
        if let Some(g) = groups.last_mut().filter(|g| g.key == key) {
            g.transactions.push(t);
            continue;
        }
        groups.push(MonthGroup {
            label: t.date.format("%B %Y").to_string(),
            key,
            transactions: vec![t],
        });
    }
    groups
}

pub fn years_with_activity(conn: &Connection, user_id: i64) -> Result<Vec<i32>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT CAST(substr(date,1,4) AS INTEGER) AS y FROM transactions
         WHERE user_id=?1 ORDER BY y DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |r| r.get::<_, i32>(0))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
