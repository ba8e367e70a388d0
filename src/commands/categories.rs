// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::MoneyError;
use crate::models::{Category, TxKind, User};
use crate::utils::{
    id_for_category, is_foreign_key_violation, maybe_print_json, pretty_table, required,
};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, user: &User, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = required("name", sub.get_one::<String>("name"))?;
            let kind = TxKind::parse_user(required("type", sub.get_one::<String>("type"))?)?;
            add(conn, user.id, name, kind)?;
            println!("Category created successfully: '{}' ({})", name, kind);
        }
        Some(("list", sub)) => {
            let data = list_categories(conn, user.id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|c| vec![c.name, c.kind.to_string()])
                    .collect();
                println!("{}", pretty_table(&["Category", "Type"], rows));
            }
        }
        Some(("edit", sub)) => {
            let name = required("name", sub.get_one::<String>("name"))?;
            let current = sub
                .get_one::<String>("type")
                .map(|s| s.parse::<TxKind>())
                .transpose()?;
            let new_name = required("new-name", sub.get_one::<String>("new-name"))?;
            let new_kind =
                TxKind::parse_user(required("new-type", sub.get_one::<String>("new-type"))?)?;
            let id = id_for_category(conn, user.id, name, current)?;
            edit(conn, id, new_name, new_kind)?;
            println!("Category updated successfully: '{}' ({})", new_name, new_kind);
        }
        Some(("rm", sub)) => {
            let name = required("name", sub.get_one::<String>("name"))?;
            let kind = sub
                .get_one::<String>("type")
                .map(|s| s.parse::<TxKind>())
                .transpose()?;
            let id = id_for_category(conn, user.id, name, kind)?;
            remove(conn, id)?;
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

pub fn add(conn: &Connection, user_id: i64, name: &str, kind: TxKind) -> Result<i64> {
    conn.execute(
        "INSERT INTO categories(user_id, name, type) VALUES (?1, ?2, ?3)",
        params![user_id, name, kind.as_str()],
    )
    .with_context(|| format!("Could not create category '{}' ({})", name, kind))?;
    let id = conn.last_insert_rowid();
    tracing::info!(user_id, category_id = id, name, %kind, "category created");
    Ok(id)
}

pub fn edit(conn: &Connection, id: i64, new_name: &str, new_kind: TxKind) -> Result<()> {
    conn.execute(
        "UPDATE categories SET name=?1, type=?2 WHERE id=?3",
        params![new_name, new_kind.as_str(), id],
    )
    .with_context(|| format!("Could not update category to '{}'", new_name))?;
    tracing::info!(category_id = id, "category updated");
    Ok(())
}

pub fn remove(conn: &Connection, id: i64) -> Result<()> {
    match conn.execute("DELETE FROM categories WHERE id=?1", params![id]) {
        Ok(_) => {
            tracing::info!(category_id = id, "category removed");
            Ok(())
        }
        Err(e) if is_foreign_key_violation(&e) => {
            Err(MoneyError::InUse { what: "category" }.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn list_categories(conn: &Connection, user_id: i64) -> Result<Vec<Category>> {
    let mut stmt =
        conn.prepare("SELECT id, name, type FROM categories WHERE user_id=?1 ORDER BY name, type")?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (id, name, kind_s) = row?;
        let kind = kind_s
            .parse::<TxKind>()
            .with_context(|| format!("Invalid category type '{}' in database", kind_s))?;
        data.push(Category { id, name, kind });
    }
    Ok(data)
}
