// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::MoneyError;
use crate::models::{Budget, TxKind, User};
use crate::utils::{
    fmt_money, get_currency_label, id_for_category_preferring, maybe_print_json, month_bounds,
    parse_amount, parse_month_start, pretty_table, required, stored_decimal,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, user: &User, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let (month, category_id, amount) = budget_fields(conn, user.id, sub)?;
            set(conn, user.id, category_id, month, amount)?;
            println!(
                "Budget set for {} / {} = {}",
                month.format("%Y-%m"),
                sub.get_one::<String>("category").map(|s| s.trim()).unwrap_or_default(),
                amount
            );
        }
        Some(("list", sub)) => list(conn, user.id, sub)?,
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").context("id missing")?;
            let (month, category_id, amount) = budget_fields(conn, user.id, sub)?;
            edit(conn, user.id, id, category_id, month, amount)?;
            println!("Budget {} updated successfully", id);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").context("id missing")?;
            remove(conn, user.id, id)?;
            println!("Removed budget {}", id);
        }
        Some(("report", sub)) => report(conn, user.id, sub)?,
        _ => {}
    }
    Ok(())
}

fn budget_fields(
    conn: &Connection,
    user_id: i64,
    sub: &clap::ArgMatches,
) -> Result<(NaiveDate, i64, Decimal)> {
    let month = parse_month_start(required("month", sub.get_one::<String>("month"))?)?;
    let category = required("category", sub.get_one::<String>("category"))?;
    let amount = parse_amount(required("amount", sub.get_one::<String>("amount"))?)?;
    let category_id = id_for_category_preferring(conn, user_id, category, TxKind::Expense)?;
    Ok((month, category_id, amount))
}

/// Creates the budget or replaces the amount of an existing one.
pub fn set(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    month: NaiveDate,
    amount: Decimal,
) -> Result<()> {
    conn.execute(
        "INSERT INTO budgets(user_id, category_id, month, amount) VALUES (?1,?2,?3,?4)
         ON CONFLICT(user_id, category_id, month) DO UPDATE SET amount=excluded.amount",
        params![user_id, category_id, month.to_string(), amount.to_string()],
    )?;
    tracing::info!(user_id, category_id, %month, %amount, "budget set");
    Ok(())
}

pub fn edit(
    conn: &Connection,
    user_id: i64,
    id: i64,
    category_id: i64,
    month: NaiveDate,
    amount: Decimal,
) -> Result<()> {
    let n = conn
        .execute(
            "UPDATE budgets SET category_id=?1, month=?2, amount=?3 WHERE id=?4 AND user_id=?5",
            params![category_id, month.to_string(), amount.to_string(), id, user_id],
        )
        .with_context(|| format!("Could not update budget {}", id))?;
    if n == 0 {
        return Err(not_found(id));
    }
    tracing::info!(user_id, budget_id = id, "budget updated");
    Ok(())
}

pub fn remove(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    let n = conn.execute(
        "DELETE FROM budgets WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    if n == 0 {
        return Err(not_found(id));
    }
    tracing::info!(user_id, budget_id = id, "budget removed");
    Ok(())
}

fn not_found(id: i64) -> anyhow::Error {
    MoneyError::NotFound {
        what: "Budget",
        key: id.to_string(),
    }
    .into()
}

/// Budgets newest month first, optionally for one month.
pub fn list_budgets(
    conn: &Connection,
    user_id: i64,
    month: Option<NaiveDate>,
) -> Result<Vec<Budget>> {
    let mut sql = String::from(
        "SELECT b.id, b.month, c.name, b.amount FROM budgets b JOIN categories c ON b.category_id=c.id WHERE b.user_id=?1",
    );
    let month_s = month.map(|m| m.to_string());
    if month_s.is_some() {
        sql.push_str(" AND b.month=?2");
    }
    sql.push_str(" ORDER BY b.month DESC, c.name");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match &month_s {
        Some(m) => stmt.query(params![user_id, m])?,
        None => stmt.query(params![user_id])?,
    };
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let month_raw: String = r.get(1)?;
        let amount_raw: String = r.get(3)?;
        data.push(Budget {
            id: r.get(0)?,
            month: NaiveDate::parse_from_str(&month_raw, "%Y-%m-%d")
                .with_context(|| format!("Invalid budget month '{}'", month_raw))?,
            category: r.get(2)?,
            amount: stored_decimal(&amount_raw, "budget amount")?,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let month = sub
        .get_one::<String>("month")
        .map(|s| parse_month_start(s))
        .transpose()?;
    let data = list_budgets(conn, user_id, month)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let label = get_currency_label(conn)?;
        let rows = data
            .iter()
            .map(|b| {
                vec![
                    b.id.to_string(),
                    b.month.format("%Y-%m").to_string(),
                    b.category.clone(),
                    fmt_money(&b.amount, &label),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["ID", "Month", "Category", "Budget"], rows));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub category: String,
    pub budget: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
}

/// Budgeted categories of the month containing `month` with what was spent.
pub fn budget_status(conn: &Connection, user_id: i64, month: NaiveDate) -> Result<Vec<BudgetStatus>> {
    let (start, next) = month_bounds(month)?;
    let budgets = list_budgets(conn, user_id, Some(start))?;
    let mut spent_stmt = conn.prepare(
        "SELECT t.amount FROM transactions t JOIN budgets b ON b.category_id=t.category_id
         WHERE b.id=?1 AND t.user_id=?2 AND t.type='expense' AND t.date>=?3 AND t.date<?4",
    )?;
    let mut out = Vec::new();
    for b in budgets {
        let mut spent = Decimal::ZERO;
        let rows = spent_stmt.query_map(
            params![b.id, user_id, start.to_string(), next.to_string()],
            |r| r.get::<_, String>(0),
        )?;
        for row in rows {
            spent += stored_decimal(&row?, "amount")?;
        }
        out.push(BudgetStatus {
            remaining: b.amount - spent,
            category: b.category,
            budget: b.amount,
            spent,
        });
    }
    Ok(out)
}

fn report(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let month = parse_month_start(required("month", sub.get_one::<String>("month"))?)?;
    let data = budget_status(conn, user_id, month)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let label = get_currency_label(conn)?;
        let rows = data
            .iter()
            .map(|s| {
                vec![
                    s.category.clone(),
                    fmt_money(&s.budget, &label),
                    fmt_money(&s.spent, &label),
                    fmt_money(&s.remaining, &label),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Category", "Budget", "Spent", "Remaining"], rows)
        );
    }
    Ok(())
}
