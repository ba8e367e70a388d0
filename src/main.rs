// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use moneymanager::{auth, cli, commands, config::Settings, db};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if matches.get_flag("verbose") {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    let settings = Settings::from_env();
    let conn = db::open_or_init(&settings)?;
    let session_path = settings.session_path()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", settings.db_path()?.display());
        }
        Some(("signup", sub)) => commands::auth::signup(&conn, &session_path, sub)?,
        Some(("login", sub)) => commands::auth::login(&conn, &session_path, sub)?,
        Some(("logout", _)) => commands::auth::logout(&conn, &session_path)?,
        Some(("settings", sub)) => commands::settings::handle(&conn, &settings, sub)?,
        Some((name, sub)) => {
            let user = auth::current_user(&conn, &session_path)?;
            match name {
                "whoami" => commands::auth::whoami(&user),
                "account" => commands::accounts::handle(&conn, &user, sub)?,
                "category" => commands::categories::handle(&conn, &user, sub)?,
                "tx" => commands::transactions::handle(&conn, &user, sub)?,
                "budget" => commands::budgets::handle(&conn, &user, sub)?,
                "dashboard" => commands::dashboard::handle(&conn, &user, sub)?,
                "analytics" => commands::analytics::handle(&conn, &user, sub)?,
                "ask" => commands::assistant::handle(&conn, &user, &settings, sub)?,
                _ => {}
            }
        }
        None => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
