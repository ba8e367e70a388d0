// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::MoneyError;
use crate::models::TxKind;
use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

const UA: &str = concat!(
    "moneymanager/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/moneymanager)"
);

pub const DEFAULT_CURRENCY_LABEL: &str = "RM";

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Trims a form value and rejects it when blank.
pub fn required<'a>(field: &str, value: Option<&'a String>) -> Result<&'a str> {
    match value.map(|s| s.trim()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(MoneyError::MissingFields(field.to_string()).into()),
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| MoneyError::InvalidDate(s.to_string()).into())
}

/// Accepts `YYYY-MM` or `YYYY-MM-DD` and returns the first day of that month.
pub fn parse_month_start(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    let full = if s.len() == 7 {
        format!("{}-01", s)
    } else {
        s.to_string()
    };
    let d = NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .map_err(|_| anyhow!(MoneyError::InvalidMonth(s.to_string())))?;
    Ok(d.with_day(1).unwrap_or(d))
}

/// `[first day, first day of next month)` for the month containing `d`.
pub fn month_bounds(d: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(d.year(), d.month(), 1)
        .ok_or_else(|| anyhow!("Invalid month for {}", d))?;
    let (y, m) = if d.month() == 12 {
        (d.year() + 1, 1)
    } else {
        (d.year(), d.month() + 1)
    };
    let next = NaiveDate::from_ymd_opt(y, m, 1).ok_or_else(|| anyhow!("Invalid month for {}", d))?;
    Ok((start, next))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let s = s.trim();
    s.parse::<Decimal>()
        .map_err(|_| MoneyError::InvalidAmount(s.to_string()).into())
}

/// Money entered on a form: must parse and be strictly positive.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let d = parse_decimal(s)?;
    if d <= Decimal::ZERO {
        return Err(MoneyError::NonPositiveAmount.into());
    }
    Ok(d)
}

/// Decimal stored as text in a column.
pub fn stored_decimal(raw: &str, what: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("Invalid {} '{}' in database", what, raw))
}

pub fn fmt_money(d: &Decimal, label: &str) -> String {
    format!("{} {:.2}", label, d.round_dp(2))
}

pub fn fmt_opt_money(d: Option<&Decimal>, label: &str) -> String {
    d.map(|v| fmt_money(v, label))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Capitalises the first letter of every alphabetic run: `in-transfer` -> `In-Transfer`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    if out.is_empty() {
        "Unknown".to_string()
    } else {
        out
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn id_for_account(conn: &Connection, user_id: i64, name: &str) -> Result<i64> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM accounts WHERE user_id=?1 AND name=?2",
            params![user_id, name],
            |r| r.get(0),
        )
        .optional()?;
    id.ok_or_else(|| {
        MoneyError::NotFound {
            what: "Account",
            key: name.to_string(),
        }
        .into()
    })
}

/// Looks a category up by name, narrowing by kind when given.
pub fn id_for_category(
    conn: &Connection,
    user_id: i64,
    name: &str,
    kind: Option<TxKind>,
) -> Result<i64> {
    let ids: Vec<i64> = match kind {
        Some(k) => {
            let mut stmt = conn
                .prepare("SELECT id FROM categories WHERE user_id=?1 AND name=?2 AND type=?3")?;
            let rows = stmt.query_map(params![user_id, name, k.as_str()], |r| r.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        }
        None => {
            let mut stmt =
                conn.prepare("SELECT id FROM categories WHERE user_id=?1 AND name=?2")?;
            let rows = stmt.query_map(params![user_id, name], |r| r.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        }
    };
    match ids.as_slice() {
        [id] => Ok(*id),
        [] => Err(MoneyError::NotFound {
            what: "Category",
            key: name.to_string(),
        }
        .into()),
        _ => Err(MoneyError::AmbiguousCategory {
            name: name.to_string(),
        }
        .into()),
    }
}

/// Category by name, preferring the one of `kind` when several share the name.
pub fn id_for_category_preferring(
    conn: &Connection,
    user_id: i64,
    name: &str,
    kind: TxKind,
) -> Result<i64> {
    match id_for_category(conn, user_id, name, Some(kind)) {
        Err(e) if matches!(e.downcast_ref::<MoneyError>(), Some(MoneyError::NotFound { .. })) => {
            id_for_category(conn, user_id, name, None)
        }
        other => other,
    }
}

/// Category by name that must be of `kind`. A same-named category of
/// another kind is reported as a mismatch instead of being picked.
pub fn id_for_category_of_kind(
    conn: &Connection,
    user_id: i64,
    name: &str,
    kind: TxKind,
) -> Result<i64> {
    match id_for_category(conn, user_id, name, Some(kind)) {
        Err(e) if matches!(e.downcast_ref::<MoneyError>(), Some(MoneyError::NotFound { .. })) => {
            let other: Option<String> = conn
                .query_row(
                    "SELECT type FROM categories WHERE user_id=?1 AND name=?2 LIMIT 1",
                    params![user_id, name],
                    |r| r.get(0),
                )
                .optional()?;
            match other {
                Some(found) => Err(MoneyError::CategoryKindMismatch {
                    category: name.to_string(),
                    category_kind: found,
                    kind: kind.as_str(),
                }
                .into()),
                None => Err(e),
            }
        }
        other => other,
    }
}

pub fn get_currency_label(conn: &Connection) -> Result<String> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='currency_label'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or_else(|| DEFAULT_CURRENCY_LABEL.to_string()))
}

pub fn set_currency_label(conn: &Connection, label: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('currency_label', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![label],
    )?;
    Ok(())
}

/// True when a statement failed on a foreign-key constraint.
///
/// `ON DELETE RESTRICT` is enforced through an internal trigger, so it
/// surfaces as `SQLITE_CONSTRAINT_TRIGGER` rather than `_FOREIGNKEY`.
pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER)
    )
}
