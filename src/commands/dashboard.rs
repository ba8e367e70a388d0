// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::accounts::list_accounts;
use crate::commands::budgets::{BudgetStatus, budget_status};
use crate::forecast::{SqliteLedger, current_balance};
use crate::models::{Account, TxKind, User};
use crate::utils::{
    fmt_money, get_currency_label, maybe_print_json, month_bounds, pretty_table, stored_decimal,
    today,
};
use anyhow::{Context, Result};
use chrono::{Datelike, Months, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

const CHART_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: String, // YYYY-MM
    pub expense: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub month: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
    pub live_money: Decimal,
    pub daily_labels: Vec<String>,
    pub daily_expense: Vec<Decimal>,
    pub monthly_expense: Vec<MonthTotal>,
    pub budgets: Vec<BudgetStatus>,
    pub accounts: Vec<Account>,
}

pub fn handle(conn: &Connection, user: &User, m: &clap::ArgMatches) -> Result<()> {
    let dash = compute_dashboard(conn, user.id, today())?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &dash)? {
        return Ok(());
    }
    let label = get_currency_label(conn)?;
    println!("Dashboard for {} ({})", user.username, dash.month);
    println!(
        "{}",
        pretty_table(
            &["Income", "Expense", "Net", "Live money"],
            vec![vec![
                fmt_money(&dash.income, &label),
                fmt_money(&dash.expense, &label),
                fmt_money(&dash.net, &label),
                fmt_money(&dash.live_money, &label),
            ]],
        )
    );

    let daily = dash
        .daily_labels
        .iter()
        .zip(&dash.daily_expense)
        .filter(|(_, v)| !v.is_zero())
        .map(|(d, v)| vec![d.clone(), fmt_money(v, &label)])
        .collect::<Vec<_>>();
    if !daily.is_empty() {
        println!("{}", pretty_table(&["Day", "Expense"], daily));
    }

    let chart = dash
        .monthly_expense
        .iter()
        .map(|m| vec![m.month.clone(), fmt_money(&m.expense, &label)])
        .collect();
    println!("{}", pretty_table(&["Month", "Expense"], chart));

    if !dash.budgets.is_empty() {
        let rows = dash
            .budgets
            .iter()
            .map(|b| {
                vec![
                    b.category.clone(),
                    fmt_money(&b.budget, &label),
                    fmt_money(&b.spent, &label),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Category", "Budget", "Spent"], rows));
    }

    let rows = dash
        .accounts
        .iter()
        .map(|a| vec![a.name.clone(), fmt_money(&a.live_balance, &label)])
        .collect();
    println!("{}", pretty_table(&["Account", "Balance"], rows));
    Ok(())
}

/// `(date, kind, amount)` of income and expense rows within `[start, end)`.
fn flows_between(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(NaiveDate, TxKind, Decimal)>> {
    let mut stmt = conn.prepare(
        "SELECT date, type, amount FROM transactions
         WHERE user_id=?1 AND type IN ('income','expense') AND date>=?2 AND date<?3",
    )?;
    let mut rows = stmt.query(params![user_id, start.to_string(), end.to_string()])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let date_s: String = r.get(0)?;
        let kind_s: String = r.get(1)?;
        let amount_s: String = r.get(2)?;
        out.push((
            NaiveDate::parse_from_str(&date_s, "%Y-%m-%d")
                .with_context(|| format!("Invalid transaction date '{}'", date_s))?,
            kind_s.parse::<TxKind>()?,
            stored_decimal(&amount_s, "amount")?,
        ));
    }
    Ok(out)
}

pub fn compute_dashboard(conn: &Connection, user_id: i64, today: NaiveDate) -> Result<Dashboard> {
    let (start, next) = month_bounds(today)?;
    let flows = flows_between(conn, user_id, start, next)?;

    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    let days = (next - start).num_days() as usize;
    let mut daily_expense = vec![Decimal::ZERO; days];
    for (date, kind, amount) in &flows {
        match kind {
            TxKind::Income => income += *amount,
            TxKind::Expense => {
                expense += *amount;
                daily_expense[date.day0() as usize] += *amount;
            }
            TxKind::TransferIn | TxKind::TransferOut => {}
        }
    }
    let daily_labels = (1..=days).map(|d| format!("{:02}", d)).collect();

    let chart_start = start
        .checked_sub_months(Months::new(CHART_MONTHS - 1))
        .context("Dashboard chart starts before the calendar")?;
    let mut monthly_expense: Vec<MonthTotal> = (0..CHART_MONTHS)
        .filter_map(|i| chart_start.checked_add_months(Months::new(i)))
        .map(|m| MonthTotal {
            month: m.format("%Y-%m").to_string(),
            expense: Decimal::ZERO,
        })
        .collect();
    for (date, kind, amount) in flows_between(conn, user_id, chart_start, next)? {
        if kind != TxKind::Expense {
            continue;
        }
        let key = date.format("%Y-%m").to_string();
        if let Some(slot) = monthly_expense.iter_mut().find(|m| m.month == key) {
            slot.expense += amount;
        }
    }

    let live_money = current_balance(&SqliteLedger::new(conn), user_id)?;
    tracing::debug!(user_id, transactions = flows.len(), "computed dashboard");

    Ok(Dashboard {
        month: start.format("%Y-%m").to_string(),
        income,
        expense,
        net: income - expense,
        live_money,
        daily_labels,
        daily_expense,
        monthly_expense,
        budgets: budget_status(conn, user_id, start)?,
        accounts: list_accounts(conn, user_id)?,
    })
}
