// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use moneymanager::commands::{accounts, categories, transactions};
use moneymanager::{cli, db, error::MoneyError, models::TxKind};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use std::str::FromStr;

fn setup() -> (Connection, i64) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute(
        "INSERT INTO users(username, email, password_hash) VALUES ('ana','ana@example.com','x')",
        [],
    )
    .unwrap();
    let uid = conn.last_insert_rowid();
    (conn, uid)
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn err_of(e: anyhow::Error) -> MoneyError {
    e.downcast_ref::<MoneyError>().cloned().unwrap()
}

fn stored_balance(conn: &Connection, name: &str) -> Decimal {
    let s: String = conn
        .query_row("SELECT balance FROM accounts WHERE name=?1", params![name], |r| r.get(0))
        .unwrap();
    dec(&s)
}

#[test]
fn live_balance_tracks_income_and_expense() {
    let (conn, uid) = setup();
    let bank = accounts::add(&conn, uid, "Bank", dec("100")).unwrap();
    let salary = categories::add(&conn, uid, "Salary", TxKind::Income).unwrap();
    let food = categories::add(&conn, uid, "Food", TxKind::Expense).unwrap();
    let flows = [
        (salary, TxKind::Income, "40"),
        (food, TxKind::Expense, "15.50"),
    ];
    for (category_id, kind, amount) in flows {
        transactions::add(
            &conn,
            uid,
            &transactions::TxInput {
                account_id: bank,
                category_id,
                kind,
                amount: dec(amount),
                date: date("2025-04-01"),
                note: String::new(),
            },
        )
        .unwrap();
    }
    let list = accounts::list_accounts(&conn, uid).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].balance, dec("100"));
    assert_eq!(list[0].live_balance, dec("124.50"));
}

#[test]
fn transfer_moves_stored_balances() {
    let (conn, uid) = setup();
    accounts::add(&conn, uid, "Bank", dec("100")).unwrap();
    accounts::add(&conn, uid, "Wallet", dec("5")).unwrap();
    accounts::transfer(&conn, uid, "Bank", "Wallet", dec("30"), date("2025-05-02"), "cash")
        .unwrap();

    assert_eq!(stored_balance(&conn, "Bank"), dec("70"));
    assert_eq!(stored_balance(&conn, "Wallet"), dec("35"));

    let mut stmt = conn
        .prepare("SELECT type, amount, note FROM transactions ORDER BY id")
        .unwrap();
    let rows: Vec<(String, String, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(
        rows,
        vec![
            ("out-transfer".into(), "30".into(), "Transfer to Wallet. cash".into()),
            ("in-transfer".into(), "30".into(), "Transfer from Bank. cash".into()),
        ]
    );

    // Transfer categories are created once and reused
    accounts::transfer(&conn, uid, "Wallet", "Bank", dec("1"), date("2025-05-03"), "").unwrap();
    let cats: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM categories WHERE name=?1",
            params![accounts::TRANSFER_CATEGORY],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(cats, 2);
    let note: String = conn
        .query_row(
            "SELECT note FROM transactions WHERE type='out-transfer' ORDER BY id DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(note, "Transfer to Bank.");
}

#[test]
fn transfer_validation() {
    let (conn, uid) = setup();
    accounts::add(&conn, uid, "Bank", dec("10")).unwrap();
    accounts::add(&conn, uid, "Wallet", dec("0")).unwrap();
    let d = date("2025-05-02");

    let e = accounts::transfer(&conn, uid, "Bank", "Bank", dec("1"), d, "").unwrap_err();
    assert_eq!(err_of(e), MoneyError::SameAccount);
    let e = accounts::transfer(&conn, uid, "Bank", "Wallet", dec("0"), d, "").unwrap_err();
    assert_eq!(err_of(e), MoneyError::NonPositiveAmount);
    let e = accounts::transfer(&conn, uid, "Bank", "Wallet", dec("10.01"), d, "").unwrap_err();
    assert_eq!(
        err_of(e),
        MoneyError::InsufficientBalance {
            account: "Bank".into(),
            available: dec("10"),
        }
    );
    let e = accounts::transfer(&conn, uid, "Bank", "Savings", dec("1"), d, "").unwrap_err();
    assert!(matches!(err_of(e), MoneyError::NotFound { what: "Account", .. }));

    // nothing was written by the failed attempts
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
    assert_eq!(stored_balance(&conn, "Bank"), dec("10"));
}

#[test]
fn used_account_and_category_cannot_be_removed() {
    let (conn, uid) = setup();
    let bank = accounts::add(&conn, uid, "Bank", dec("0")).unwrap();
    let food = categories::add(&conn, uid, "Food", TxKind::Expense).unwrap();
    let spare = categories::add(&conn, uid, "Spare", TxKind::Expense).unwrap();
    transactions::add(
        &conn,
        uid,
        &transactions::TxInput {
            account_id: bank,
            category_id: food,
            kind: TxKind::Expense,
            amount: dec("3"),
            date: date("2025-01-01"),
            note: String::new(),
        },
    )
    .unwrap();

    let e = accounts::remove(&conn, uid, "Bank").unwrap_err();
    assert_eq!(err_of(e), MoneyError::InUse { what: "account" });
    let e = categories::remove(&conn, food).unwrap_err();
    assert_eq!(err_of(e), MoneyError::InUse { what: "category" });
    categories::remove(&conn, spare).unwrap();
    assert_eq!(categories::list_categories(&conn, uid).unwrap().len(), 1);
}

#[test]
fn account_edit_and_category_lookup() {
    let (conn, uid) = setup();
    accounts::add(&conn, uid, "Bank", dec("1")).unwrap();
    accounts::edit(&conn, uid, "Bank", "Main bank", dec("2")).unwrap();
    let list = accounts::list_accounts(&conn, uid).unwrap();
    assert_eq!(list[0].name, "Main bank");
    assert_eq!(list[0].balance, dec("2"));

    categories::add(&conn, uid, "Gifts", TxKind::Income).unwrap();
    categories::add(&conn, uid, "Gifts", TxKind::Expense).unwrap();
    let e = moneymanager::utils::id_for_category(&conn, uid, "Gifts", None).unwrap_err();
    assert!(matches!(err_of(e), MoneyError::AmbiguousCategory { .. }));
    let expense =
        moneymanager::utils::id_for_category(&conn, uid, "Gifts", Some(TxKind::Expense)).unwrap();
    categories::edit(&conn, expense, "Presents", TxKind::Expense).unwrap();
    let names: Vec<String> = categories::list_categories(&conn, uid)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Gifts", "Presents"]);
}

#[test]
fn category_add_only_accepts_income_or_expense() {
    let matches = cli::build_cli().get_matches_from([
        "moneymanager",
        "category",
        "add",
        "--name",
        "Moves",
        "--type",
        "in-transfer",
    ]);
    let Some(("category", cat_m)) = matches.subcommand() else {
        panic!("no category subcommand");
    };
    let Some(("add", add_m)) = cat_m.subcommand() else {
        panic!("no add subcommand");
    };
    let raw = add_m.get_one::<String>("type").unwrap();
    assert!(matches!(
        TxKind::parse_user(raw),
        Err(MoneyError::InvalidKind { .. })
    ));
}
