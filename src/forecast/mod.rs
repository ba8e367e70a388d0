// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Spend/income forecasting over a user's ledger.
//!
//! [`build_snapshot`] reads raw rows through a [`TransactionSource`], then
//! hands them to the pure functions in [`series`]. The result is computed on
//! demand and never stored.

pub mod series;
pub mod store;

use crate::models::TxKind;
use crate::utils::title_case;
use anyhow::Result;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use std::collections::HashMap;

pub use series::{DailySeries, SeriesForecast, SeriesPoint, TrendModel, forecast_series};
pub use store::SqliteLedger;

pub const DEFAULT_MONTHS: u32 = 6;
const DAYS_PER_MONTH: u64 = 30;
const UNCATEGORISED: &str = "Uncategorised";
const TOP_CATEGORIES: usize = 3;

/// A transaction as the engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub kind: TxKind,
    pub category: Option<String>,
    pub account_id: i64,
}

/// Read-only access to one user's ledger.
pub trait TransactionSource {
    /// Transactions dated within `[start, end]`, ordered by date then id.
    fn transactions_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionRecord>>;

    fn all_transactions(&self, user_id: i64) -> Result<Vec<TransactionRecord>>;

    /// Sum of the stored balances of every account the user owns.
    fn opening_balance_total(&self, user_id: i64) -> Result<Decimal>;
}

/// Lookback window length from raw caller input. Anything that is not a
/// positive integer silently becomes [`DEFAULT_MONTHS`].
pub fn parse_months(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_MONTHS)
}

/// First day of the trailing `30 * months` day window ending at `today`.
pub fn window_start(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(DAYS_PER_MONTH * u64::from(months)))
        .unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSnapshot {
    pub has_any_data: bool,
    pub months: u32,
    pub as_of: NaiveDate,
    pub window_start: NaiveDate,

    pub expense: Option<SeriesForecast>,
    pub income: Option<SeriesForecast>,

    pub current_balance: Decimal,
    pub predicted_30d_expense: Option<Decimal>,
    pub predicted_30d_income: Option<Decimal>,
    pub net_30: Option<Decimal>,
    pub expected_balance_30: Option<Decimal>,
    pub rec_budget: Option<Decimal>,
    pub saved_if_reduce_10: Option<Decimal>,

    pub categories: Vec<CategoryTotal>,
    pub top_categories: Vec<CategoryTotal>,
    pub kinds: Vec<KindCount>,
}

impl ForecastSnapshot {
    pub fn rmse_expense(&self) -> Option<f64> {
        self.expense.as_ref().and_then(|s| s.rmse)
    }

    pub fn rmse_income(&self) -> Option<f64> {
        self.income.as_ref().and_then(|s| s.rmse)
    }

    pub fn has_income_data(&self) -> bool {
        self.income.is_some()
    }
}

/// Derived 30-day figures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Projection {
    pub net_30: Option<Decimal>,
    pub expected_balance_30: Option<Decimal>,
    pub rec_budget: Option<Decimal>,
    pub saved_if_reduce_10: Option<Decimal>,
}

/// A missing side counts as zero only while the other side is present; with
/// both missing every figure stays `None`.
pub fn project(
    current_balance: Decimal,
    expense: Option<Decimal>,
    income: Option<Decimal>,
) -> Projection {
    if expense.is_none() && income.is_none() {
        return Projection::default();
    }
    let e = expense.unwrap_or(Decimal::ZERO);
    let i = income.unwrap_or(Decimal::ZERO);
    let net = i - e;
    let rec_budget = expense.map(|e| e * Decimal::new(90, 2));
    Projection {
        net_30: Some(net),
        expected_balance_30: Some(current_balance + net),
        rec_budget,
        saved_if_reduce_10: expense.zip(rec_budget).map(|(e, r)| e - r),
    }
}

/// Opening balances plus all-time income minus all-time expense. Transfers
/// are already reflected in the stored balances.
pub fn current_balance<S: TransactionSource + ?Sized>(source: &S, user_id: i64) -> Result<Decimal> {
    let mut balance = source.opening_balance_total(user_id)?;
    for tx in source.all_transactions(user_id)? {
        match tx.kind {
            TxKind::Income => balance += tx.amount,
            TxKind::Expense => balance -= tx.amount,
            TxKind::TransferIn | TxKind::TransferOut => {}
        }
    }
    Ok(balance)
}

/// Expense totals per category name, largest first; ties keep first-seen order.
pub fn category_breakdown(records: &[TransactionRecord]) -> Vec<CategoryTotal> {
    let mut order: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for tx in records.iter().filter(|t| t.kind == TxKind::Expense) {
        let name = tx
            .category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNCATEGORISED)
            .to_string();
        match order.get(&name) {
            Some(&idx) => totals[idx].total += tx.amount,
            None => {
                order.insert(name.clone(), totals.len());
                totals.push(CategoryTotal {
                    name,
                    total: tx.amount,
                });
            }
        }
    }
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
}

/// Transaction counts per kind, most frequent first; ties keep first-seen order.
pub fn kind_breakdown(records: &[TransactionRecord]) -> Vec<KindCount> {
    let mut counts: Vec<(TxKind, usize)> = Vec::new();
    for tx in records {
        match counts.iter_mut().find(|(k, _)| *k == tx.kind) {
            Some((_, c)) => *c += 1,
            None => counts.push((tx.kind, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(kind, count)| KindCount {
            label: title_case(kind.as_str()),
            count,
        })
        .collect()
}

fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or_else(|| {
        tracing::warn!(value = v, "forecast total not representable as decimal");
        Decimal::ZERO
    })
}

pub fn build_snapshot<S: TransactionSource + ?Sized>(
    source: &S,
    user_id: i64,
    months: u32,
    today: NaiveDate,
) -> Result<ForecastSnapshot> {
    let months = if months == 0 { DEFAULT_MONTHS } else { months };
    let start = window_start(today, months);
    let window = source.transactions_between(user_id, start, today)?;

    let series_for = |kind: TxKind| {
        DailySeries::from_rows(
            window
                .iter()
                .filter(|t| t.kind == kind)
                .map(|t| (t.date, t.amount)),
        )
    };
    let expense = forecast_series(&series_for(TxKind::Expense), today);
    let income = forecast_series(&series_for(TxKind::Income), today);
    let has_any_data = expense.is_some() || income.is_some();

    let current_balance = current_balance(source, user_id)?;
    let predicted_30d_expense = expense.as_ref().map(|s| to_decimal(s.future_total()));
    let predicted_30d_income = income.as_ref().map(|s| to_decimal(s.future_total()));
    let projection = project(current_balance, predicted_30d_expense, predicted_30d_income);

    let categories = category_breakdown(&window);
    let top_categories = categories.iter().take(TOP_CATEGORIES).cloned().collect();
    let kinds = kind_breakdown(&window);

    tracing::debug!(
        user_id,
        months,
        transactions = window.len(),
        has_any_data,
        "built forecast snapshot"
    );

    Ok(ForecastSnapshot {
        has_any_data,
        months,
        as_of: today,
        window_start: start,
        expense,
        income,
        current_balance,
        predicted_30d_expense,
        predicted_30d_income,
        net_30: projection.net_30,
        expected_balance_30: projection.expected_balance_30,
        rec_budget: projection.rec_budget,
        saved_if_reduce_10: projection.saved_if_reduce_10,
        categories,
        top_categories,
        kinds,
    })
}
