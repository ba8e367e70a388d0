// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Domain errors raised by validation and bookkeeping.
//!
//! Handlers return `anyhow::Result`; these variants travel inside it so
//! callers (and tests) can `downcast_ref::<MoneyError>()` when they need the
//! precise reason.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MoneyError {
    #[error("Please fill in all required fields: {0}")]
    MissingFields(String),

    #[error("Invalid amount format: '{0}'")]
    InvalidAmount(String),

    #[error("Amount must be greater than zero.")]
    NonPositiveAmount,

    #[error("Invalid date format: '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid month: '{0}', expected YYYY-MM or YYYY-MM-DD")]
    InvalidMonth(String),

    #[error("Type must be {expected}, got '{got}'")]
    InvalidKind { expected: &'static str, got: String },

    #[error("You must select two different accounts.")]
    SameAccount,

    #[error("Insufficient balance in '{account}' (available {available})")]
    InsufficientBalance { account: String, available: Decimal },

    #[error("{what} '{key}' not found")]
    NotFound { what: &'static str, key: String },

    #[error("'{name}' matches several categories; pass --type to pick one")]
    AmbiguousCategory { name: String },

    #[error("Category '{category}' is an {category_kind} category; it can't hold an {kind} entry")]
    CategoryKindMismatch {
        category: String,
        category_kind: String,
        kind: &'static str,
    },

    #[error("You can't delete this {what} because it is used by one or more transactions.")]
    InUse { what: &'static str },

    #[error("This username is already taken.")]
    UsernameTaken,

    #[error("This email is already registered.")]
    EmailTaken,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Not logged in; run `moneymanager login` first.")]
    NotLoggedIn,

    #[error("Empty message.")]
    EmptyMessage,

    #[error("AI error: {0}")]
    Assistant(String),
}
