// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::utils::{get_currency_label, pretty_table, required, set_currency_label};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, settings: &Settings, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => {
            let rows = vec![
                vec!["Currency label".to_string(), get_currency_label(conn)?],
                vec!["Database".to_string(), settings.db_path()?.display().to_string()],
                vec!["Assistant endpoint".to_string(), settings.openai_base_url.clone()],
                vec!["Assistant model".to_string(), settings.openai_model.clone()],
                vec![
                    "OPENAI_API_KEY".to_string(),
                    if settings.openai_api_key.is_some() { "set" } else { "not set" }.to_string(),
                ],
            ];
            println!("{}", pretty_table(&["Setting", "Value"], rows));
        }
        Some(("set-currency", sub)) => {
            let label = required("label", sub.get_one::<String>("label"))?;
            set_currency_label(conn, label)?;
            tracing::info!(label, "currency label updated");
            println!("Currency label set to {}", label);
        }
        _ => {}
    }
    Ok(())
}
