// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{TransactionRecord, TransactionSource};
use crate::models::TxKind;
use crate::utils::stored_decimal;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

const SELECT_RECORDS: &str = "SELECT t.date, t.amount, t.type, c.name, t.account_id
     FROM transactions t LEFT JOIN categories c ON t.category_id=c.id
     WHERE t.user_id=?1";

/// [`TransactionSource`] backed by the application database.
pub struct SqliteLedger<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteLedger<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            let d: String = r.get(0)?;
            let amount_s: String = r.get(1)?;
            let kind_s: String = r.get(2)?;
            let category: Option<String> = r.get(3)?;
            let account_id: i64 = r.get(4)?;
            let date = NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .with_context(|| format!("Invalid transaction date '{}' in database", d))?;
            let kind = kind_s
                .parse::<TxKind>()
                .with_context(|| format!("Invalid transaction type '{}' in database", kind_s))?;
            out.push(TransactionRecord {
                date,
                amount: stored_decimal(&amount_s, "amount")?,
                kind,
                category,
                account_id,
            });
        }
        Ok(out)
    }
}

impl TransactionSource for SqliteLedger<'_> {
    fn transactions_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionRecord>> {
        let sql = format!("{SELECT_RECORDS} AND t.date>=?2 AND t.date<=?3 ORDER BY t.date, t.id");
        self.query(&sql, params![user_id, start.to_string(), end.to_string()])
    }

    fn all_transactions(&self, user_id: i64) -> Result<Vec<TransactionRecord>> {
        let sql = format!("{SELECT_RECORDS} ORDER BY t.date, t.id");
        self.query(&sql, params![user_id])
    }

    fn opening_balance_total(&self, user_id: i64) -> Result<Decimal> {
        let mut stmt = self
            .conn
            .prepare("SELECT balance FROM accounts WHERE user_id=?1")?;
        let rows = stmt.query_map(params![user_id], |r| r.get::<_, String>(0))?;
        let mut total = Decimal::ZERO;
        for row in rows {
            total += stored_decimal(&row?, "account balance")?;
        }
        Ok(total)
    }
}
