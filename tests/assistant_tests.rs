// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use moneymanager::assistant::{ChatClient, SYSTEM_PROMPT, analytics_summary, user_prompt};
use moneymanager::commands::assistant::build_prompt;
use moneymanager::config::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, Settings};
use moneymanager::forecast::{SqliteLedger, build_snapshot};
use moneymanager::models::User;
use moneymanager::{cli, db, error::MoneyError};
use rusqlite::{Connection, params};

fn setup() -> (Connection, User) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO users(id, username, email, password_hash) VALUES (1, 'ana', 'ana@example.com', 'x');
        INSERT INTO accounts(id, user_id, name, balance) VALUES (1, 1, 'Bank', '100');
        INSERT INTO categories(id, user_id, name, type) VALUES (1, 1, 'Food', 'expense');
        INSERT INTO categories(id, user_id, name, type) VALUES (2, 1, 'Rent', 'expense');
        "#,
    )
    .unwrap();
    let user = User {
        id: 1,
        username: "ana".into(),
        email: "ana@example.com".into(),
    };
    (conn, user)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

fn add_expense(conn: &Connection, category_id: i64, amount: &str, date: &str) {
    conn.execute(
        "INSERT INTO transactions(user_id,account_id,category_id,type,amount,date,note) VALUES (1,1,?1,'expense',?2,?3,'')",
        params![category_id, amount, date],
    )
    .unwrap();
}

#[test]
fn summary_without_data_says_so() {
    let (conn, user) = setup();
    let snapshot = build_snapshot(&SqliteLedger::new(&conn), user.id, 6, today()).unwrap();
    let text = analytics_summary(&user.username, &snapshot, "RM");
    assert!(text.starts_with("User: ana | History window: last 6 month(s)."));
    assert!(text.contains("Current balance (all accounts combined): RM 100.00"));
    assert!(text.contains("- Expenses: N/A"));
    assert!(text.contains("- Income:   N/A"));
    assert!(text.contains("Expected balance in 30 days: N/A"));
    assert!(text.contains("No strong spending categories yet."));
    assert!(text.contains("- Expense model RMSE: N/A"));
    assert!(text.contains("- Income model RMSE:  N/A or no income data"));
}

#[test]
fn summary_lists_top_categories() {
    let (conn, user) = setup();
    add_expense(&conn, 1, "30", "2025-06-01");
    add_expense(&conn, 2, "500", "2025-06-02");
    add_expense(&conn, 1, "12.5", "2025-06-03");
    let snapshot = build_snapshot(&SqliteLedger::new(&conn), user.id, 3, today()).unwrap();
    let text = analytics_summary(&user.username, &snapshot, "$");
    assert!(text.contains("last 3 month(s)"));
    assert!(text.contains("Rent ($ 500.00), Food ($ 42.50)"));
    assert!(text.contains("Current balance (all accounts combined): $ -442.50"));
    assert!(!text.contains("- Expenses: N/A"));
    assert!(text.contains("- Income:   N/A"));
    // fewer than ten points: no held-out error
    assert!(text.contains("- Expense model RMSE: N/A"));
}

#[test]
fn prompt_wraps_question() {
    let (conn, user) = setup();
    let prompt = build_prompt(
        &SqliteLedger::new(&conn),
        &user,
        "  Can I afford a holiday?  ",
        6,
        today(),
        "RM",
    )
    .unwrap();
    assert!(prompt.starts_with("Here is my analytics summary:\n\nUser: ana"));
    assert!(prompt.ends_with("Now my question is:\nCan I afford a holiday?\n"));
    assert_eq!(user_prompt("S", "Q"), "Here is my analytics summary:\n\nS\n\nNow my question is:\nQ\n");
    assert!(SYSTEM_PROMPT.contains("not professional financial advice"));
}

#[test]
fn empty_message_is_rejected() {
    let (conn, user) = setup();
    let e = build_prompt(&SqliteLedger::new(&conn), &user, "   ", 6, today(), "RM").unwrap_err();
    assert_eq!(
        e.downcast_ref::<MoneyError>(),
        Some(&MoneyError::EmptyMessage)
    );
}

#[test]
fn ask_collects_words_and_raw_months() {
    let matches = cli::build_cli().get_matches_from([
        "moneymanager",
        "ask",
        "how",
        "am",
        "I",
        "doing",
        "--months",
        "abc",
        "--show-prompt",
    ]);
    let Some(("ask", ask_m)) = matches.subcommand() else {
        panic!("no ask subcommand");
    };
    let words: Vec<&str> = ask_m
        .get_many::<String>("message")
        .unwrap()
        .map(String::as_str)
        .collect();
    assert_eq!(words.join(" "), "how am I doing");
    assert_eq!(
        moneymanager::forecast::parse_months(ask_m.get_one::<String>("months").map(String::as_str)),
        6
    );
    assert!(ask_m.get_flag("show-prompt"));
}

#[test]
fn chat_client_needs_api_key() {
    let settings = Settings {
        data_dir: None,
        openai_api_key: None,
        openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        openai_model: DEFAULT_OPENAI_MODEL.to_string(),
    };
    let err = ChatClient::from_settings(&settings).err().unwrap();
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}
