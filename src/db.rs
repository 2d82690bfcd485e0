//! Catalog store: schema and operations

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use crate::models::{BuildSelection, Category, Component, SavedConfiguration, Specs};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Catalog entries; category-specific attributes live in specs_json
        CREATE TABLE IF NOT EXISTS components (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            stock INTEGER NOT NULL DEFAULT 0,
            specs_json TEXT NOT NULL DEFAULT '{}'
        );

        -- Named builds, stored as component ids per category
        CREATE TABLE IF NOT EXISTS saved_configurations (
            name TEXT PRIMARY KEY,
            selection_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        -- Submitted quote requests
        CREATE TABLE IF NOT EXISTS quote_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_name TEXT NOT NULL,
            email TEXT NOT NULL,
            selection_json TEXT NOT NULL,
            total_cents INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_components_category ON components(category);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a component
pub fn upsert_component(conn: &Connection, component: &Component) -> Result<()> {
    let specs = serde_json::to_string(&component.specs)?;
    conn.execute(
        "INSERT OR REPLACE INTO components (id, name, category, price_cents, stock, specs_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            &component.id,
            &component.name,
            component.category.as_str(),
            component.price_cents,
            component.stock,
            specs,
        ),
    )?;
    Ok(())
}

/// Clear the catalog (for re-import). Saved builds and quotes are kept.
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM components", [])?;
    Ok(())
}

type ComponentRow = (String, String, String, i64, u32, String);

const COMPONENT_COLUMNS: &str = "id, name, category, price_cents, stock, specs_json";

fn component_from_row(row: ComponentRow) -> Result<Component> {
    let (id, name, category, price_cents, stock, specs_json) = row;
    let category: Category = category
        .parse()
        .map_err(|e: String| anyhow!("component {}: {}", id, e))?;
    let specs: Specs = serde_json::from_str(&specs_json)
        .with_context(|| format!("component {}: malformed specs", id))?;
    Ok(Component {
        id,
        name,
        category,
        price_cents,
        stock,
        specs,
    })
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComponentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

/// Get a single component by id
pub fn get_component(conn: &Connection, id: &str) -> Result<Option<Component>> {
    let sql = format!("SELECT {} FROM components WHERE id = ?1", COMPONENT_COLUMNS);
    let row = conn.query_row(&sql, [id], read_row).optional()?;
    row.map(component_from_row).transpose()
}

/// List all components, optionally limited to one category
pub fn list_components(conn: &Connection, category: Option<Category>) -> Result<Vec<Component>> {
    let mut results = Vec::new();

    match category {
        Some(category) => {
            let sql = format!(
                "SELECT {} FROM components WHERE category = ?1 ORDER BY name",
                COMPONENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([category.as_str()], read_row)?;
            for row in rows {
                results.push(component_from_row(row?)?);
            }
        }
        None => {
            let sql = format!(
                "SELECT {} FROM components ORDER BY category, name",
                COMPONENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], read_row)?;
            for row in rows {
                results.push(component_from_row(row?)?);
            }
        }
    }

    Ok(results)
}

/// Rebuild a selection from component ids. Ids missing from the catalog are
/// dropped with a warning.
pub fn resolve_selection(
    conn: &Connection,
    ids: &BTreeMap<Category, Vec<String>>,
) -> Result<BuildSelection> {
    let mut selection = BuildSelection::new();

    for (category, ids) in ids {
        for id in ids {
            match get_component(conn, id)? {
                Some(component) if component.category == *category => selection.select(component),
                Some(component) => warn!(
                    "{} is a {}, not a {}; leaving it out of the build",
                    id, component.category, category
                ),
                None => warn!("{} is no longer in the catalog; leaving it out of the build", id),
            }
        }
    }

    Ok(selection)
}

/// Save (or overwrite) a named build
pub fn save_configuration(conn: &Connection, config: &SavedConfiguration) -> Result<()> {
    let json = serde_json::to_string(&config.components)?;
    conn.execute(
        "INSERT OR REPLACE INTO saved_configurations (name, selection_json) VALUES (?1, ?2)",
        (&config.name, json),
    )?;
    Ok(())
}

pub fn load_configuration(conn: &Connection, name: &str) -> Result<Option<SavedConfiguration>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT selection_json FROM saved_configurations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;

    json.map(|json| -> Result<SavedConfiguration> {
        let components = serde_json::from_str(&json)
            .with_context(|| format!("saved configuration '{}' is malformed", name))?;
        Ok(SavedConfiguration {
            name: name.to_string(),
            components,
        })
    })
    .transpose()
}

/// List saved build names with their creation time
pub fn list_configurations(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt =
        conn.prepare("SELECT name, created_at FROM saved_configurations ORDER BY name")?;

    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn delete_configuration(conn: &Connection, name: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM saved_configurations WHERE name = ?1", [name])?;
    Ok(removed > 0)
}

/// Record a quote request and return its row id
pub fn insert_quote_request(
    conn: &Connection,
    customer_name: &str,
    email: &str,
    components: &BTreeMap<Category, Vec<String>>,
    total_cents: i64,
) -> Result<i64> {
    let json = serde_json::to_string(components)?;
    conn.execute(
        "INSERT INTO quote_requests (customer_name, email, selection_json, total_cents)
         VALUES (?1, ?2, ?3, ?4)",
        (customer_name, email, json, total_cents),
    )?;
    Ok(conn.last_insert_rowid())
}
