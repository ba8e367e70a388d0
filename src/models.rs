// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::MoneyError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind shared by categories and transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "expense")]
    Expense,
    #[serde(rename = "in-transfer")]
    TransferIn,
    #[serde(rename = "out-transfer")]
    TransferOut,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Income => "income",
            TxKind::Expense => "expense",
            TxKind::TransferIn => "in-transfer",
            TxKind::TransferOut => "out-transfer",
        }
    }

    /// Parses a kind a user may enter by hand: only income or expense.
    pub fn parse_user(s: &str) -> Result<TxKind, MoneyError> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TxKind::Income),
            "expense" => Ok(TxKind::Expense),
            other => Err(MoneyError::InvalidKind {
                expected: "income or expense",
                got: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TxKind::Income),
            "expense" => Ok(TxKind::Expense),
            "in-transfer" => Ok(TxKind::TransferIn),
            "out-transfer" => Ok(TxKind::TransferOut),
            other => Err(MoneyError::InvalidKind {
                expected: "income, expense, in-transfer or out-transfer",
                got: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub balance: Decimal, // opening/stored balance
    pub live_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: TxKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub account: String,
    pub category: String,
    pub kind: TxKind,
    pub amount: Decimal,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub month: NaiveDate, // first day of the month
    pub category: String,
    pub amount: Decimal,
}
