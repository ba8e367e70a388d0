// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::forecast::{
    ForecastSnapshot, SeriesForecast, SqliteLedger, build_snapshot, parse_months,
};
use crate::models::User;
use crate::utils::{
    fmt_money, fmt_opt_money, get_currency_label, maybe_print_json, pretty_table, today,
};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, user: &User, m: &clap::ArgMatches) -> Result<()> {
    let months = parse_months(m.get_one::<String>("months").map(String::as_str));
    let snapshot = build_snapshot(&SqliteLedger::new(conn), user.id, months, today())?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &snapshot)? {
        return Ok(());
    }
    let label = get_currency_label(conn)?;
    render(&snapshot, &label);
    Ok(())
}

fn fmt_rmse(v: Option<f64>) -> String {
    v.map(|r| format!("{:.2}", r))
        .unwrap_or_else(|| "N/A".to_string())
}

fn render(s: &ForecastSnapshot, label: &str) {
    println!(
        "Analytics from {} to {} ({} month(s))",
        s.window_start, s.as_of, s.months
    );
    if !s.has_any_data {
        println!("No income or expense in this window yet.");
    }

    let summary = vec![
        vec!["Current balance".to_string(), fmt_money(&s.current_balance, label)],
        vec![
            "Predicted 30-day expense".to_string(),
            fmt_opt_money(s.predicted_30d_expense.as_ref(), label),
        ],
        vec![
            "Predicted 30-day income".to_string(),
            fmt_opt_money(s.predicted_30d_income.as_ref(), label),
        ],
        vec!["Net 30-day cash flow".to_string(), fmt_opt_money(s.net_30.as_ref(), label)],
        vec![
            "Expected balance in 30 days".to_string(),
            fmt_opt_money(s.expected_balance_30.as_ref(), label),
        ],
        vec![
            "Recommended expense budget".to_string(),
            fmt_opt_money(s.rec_budget.as_ref(), label),
        ],
        vec![
            "Saved by spending 10% less".to_string(),
            fmt_opt_money(s.saved_if_reduce_10.as_ref(), label),
        ],
        vec!["Expense model RMSE".to_string(), fmt_rmse(s.rmse_expense())],
        vec!["Income model RMSE".to_string(), fmt_rmse(s.rmse_income())],
    ];
    println!("{}", pretty_table(&["Metric", "Value"], summary));

    if s.has_any_data {
        println!(
            "{}",
            pretty_table(
                &["Date", "Expense", "Income"],
                forecast_rows(s.expense.as_ref(), s.income.as_ref()),
            )
        );
    }

    if !s.categories.is_empty() {
        let rows = s
            .categories
            .iter()
            .map(|c| vec![c.name.clone(), fmt_money(&c.total, label)])
            .collect();
        println!("{}", pretty_table(&["Category", "Spent"], rows));
    }
    if !s.kinds.is_empty() {
        let rows = s
            .kinds
            .iter()
            .map(|k| vec![k.label.clone(), k.count.to_string()])
            .collect();
        println!("{}", pretty_table(&["Type", "Count"], rows));
    }
}

/// One row per projected day; a missing series shows as `-`.
fn forecast_rows(
    expense: Option<&SeriesForecast>,
    income: Option<&SeriesForecast>,
) -> Vec<Vec<String>> {
    let labels = expense
        .or(income)
        .map(SeriesForecast::future_labels)
        .unwrap_or_default();
    let column = |s: Option<&SeriesForecast>, i: usize| {
        s.and_then(|f| f.future.get(i))
            .map(|p| format!("{:.2}", p.value))
            .unwrap_or_else(|| "-".to_string())
    };
    labels
        .into_iter()
        .enumerate()
        .map(|(i, date)| vec![date, column(expense, i), column(income, i)])
        .collect()
}
