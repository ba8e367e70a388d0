// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, TimeZone, Utc};
use moneymanager::commands::auth::secret_or_line;
use moneymanager::{auth, cli, db, error::MoneyError};
use rusqlite::Connection;
use std::io::Cursor;
use tempfile::tempdir;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn err_of(e: anyhow::Error) -> MoneyError {
    e.downcast_ref::<MoneyError>().cloned().unwrap()
}

#[test]
fn signup_logs_in_and_hashes_password() {
    let conn = setup();
    let session = auth::signup(&conn, " ana ", "ana@example.com", "s3cret", "s3cret").unwrap();
    assert_eq!(session.user.username, "ana");
    let stored: String = conn
        .query_row("SELECT password_hash FROM users WHERE id=?1", [session.user.id], |r| {
            r.get(0)
        })
        .unwrap();
    assert!(stored.starts_with("$argon2"));
    assert!(auth::verify_password("s3cret", &stored));
    assert!(!auth::verify_password("wrong", &stored));

    let user = auth::resolve(&conn, &session.key).unwrap().unwrap();
    assert_eq!(user.id, session.user.id);
}

#[test]
fn signup_rejects_bad_input() {
    let conn = setup();
    let e = auth::signup(&conn, "ana", "ana@example.com", "a", "b").unwrap_err();
    assert_eq!(err_of(e), MoneyError::PasswordMismatch);
    let e = auth::signup(&conn, "ana", "", "a", "a").unwrap_err();
    assert!(matches!(err_of(e), MoneyError::MissingFields(_)));

    auth::signup(&conn, "ana", "ana@example.com", "pw", "pw").unwrap();
    let e = auth::signup(&conn, "ANA", "other@example.com", "pw", "pw").unwrap_err();
    assert_eq!(err_of(e), MoneyError::UsernameTaken);
    let e = auth::signup(&conn, "bo", "Ana@Example.com", "pw", "pw").unwrap_err();
    assert_eq!(err_of(e), MoneyError::EmailTaken);
}

#[test]
fn login_evicts_previous_session() {
    let conn = setup();
    let first = auth::signup(&conn, "ana", "ana@example.com", "pw", "pw").unwrap();
    let second = auth::login(&conn, "ana", "pw").unwrap();
    assert_ne!(first.key, second.key);
    assert!(auth::resolve(&conn, &first.key).unwrap().is_none());
    assert!(auth::resolve(&conn, &second.key).unwrap().is_some());
    let sessions: i64 = conn
        .query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(sessions, 1);
}

#[test]
fn login_with_wrong_password_fails() {
    let conn = setup();
    auth::signup(&conn, "ana", "ana@example.com", "pw", "pw").unwrap();
    let e = auth::login(&conn, "ana", "nope").unwrap_err();
    assert_eq!(err_of(e), MoneyError::InvalidCredentials);
    let e = auth::login(&conn, "nobody", "pw").unwrap_err();
    assert_eq!(err_of(e), MoneyError::InvalidCredentials);
}

#[test]
fn sessions_expire() {
    let conn = setup();
    let session = auth::signup(&conn, "ana", "ana@example.com", "pw", "pw").unwrap();
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    let key = auth::create_session(&conn, session.user.id, t0).unwrap();
    assert!(auth::resolve_at(&conn, &key, t0 + Duration::days(13)).unwrap().is_some());
    assert!(auth::resolve_at(&conn, &key, t0 + Duration::days(15)).unwrap().is_none());
}

#[test]
fn logout_revokes_session_and_file() {
    let conn = setup();
    let dir = tempdir().unwrap();
    let path = dir.path().join("session");
    assert!(matches!(
        err_of(auth::current_user(&conn, &path).unwrap_err()),
        MoneyError::NotLoggedIn
    ));

    let session = auth::signup(&conn, "ana", "ana@example.com", "pw", "pw").unwrap();
    auth::write_session_key(&path, &session.key).unwrap();
    assert_eq!(auth::current_user(&conn, &path).unwrap().username, "ana");

    assert!(auth::logout(&conn, &session.key).unwrap());
    assert!(!auth::logout(&conn, &session.key).unwrap());
    assert!(matches!(
        err_of(auth::current_user(&conn, &path).unwrap_err()),
        MoneyError::NotLoggedIn
    ));
    auth::clear_session_key(&path).unwrap();
    assert_eq!(auth::read_session_key(&path).unwrap(), None);
}

#[test]
fn passwords_can_come_from_stdin() {
    let matches = cli::build_cli().get_matches_from(["moneymanager", "login", "--username", "ana"]);
    let Some(("login", login_m)) = matches.subcommand() else {
        panic!("no login subcommand");
    };
    assert_eq!(login_m.get_one::<String>("password"), None);

    let mut input = Cursor::new("s3cret\nrepeat\n");
    let first = secret_or_line("password", None, &mut input).unwrap();
    let second = secret_or_line("confirm", None, &mut input).unwrap();
    assert_eq!((first.as_str(), second.as_str()), ("s3cret", "repeat"));

    // an explicit value wins and stdin is left alone
    let given = "pw".to_string();
    let mut untouched = Cursor::new("ignored\n");
    assert_eq!(secret_or_line("password", Some(&given), &mut untouched).unwrap(), "pw");
    assert_eq!(untouched.position(), 0);

    let e = secret_or_line("password", None, &mut Cursor::new("")).unwrap_err();
    assert_eq!(err_of(e), MoneyError::MissingFields("password".into()));
}

#[cfg(unix)]
#[test]
fn session_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = dir.path().join("session");
    std::fs::write(&path, "stale").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    auth::write_session_key(&path, "fresh-key").unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(auth::read_session_key(&path).unwrap().as_deref(), Some("fresh-key"));

    let other = dir.path().join("new-session");
    auth::write_session_key(&other, "k").unwrap();
    assert_eq!(std::fs::metadata(&other).unwrap().permissions().mode() & 0o777, 0o600);
}
