//! Catalog ingestion from CMS exports
//!
//! Reads JSON entry exports (one entry or an array of entries per file),
//! validates them against the `Component` schema and normalizes the
//! free-form values editors type into the CMS ("850W", "2 TB", "$329.99").

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::db;
use crate::models::{Category, Component, FormFactor, Specs};

#[derive(Error, Debug, PartialEq)]
pub enum IngestError {
    #[error("entry {entry}: missing required field '{field}'")]
    MissingField { entry: String, field: &'static str },

    #[error("entry {entry}: invalid value {value} for '{field}'")]
    InvalidField {
        entry: String,
        field: &'static str,
        value: String,
    },

    #[error("entry {entry}: unknown category '{label}'")]
    UnknownCategory { entry: String, label: String },

    #[error("entry has no id")]
    MissingId,
}

/// Physical dimension a value is measured in
#[derive(Debug, Clone, Copy, PartialEq)]
enum Dimension {
    Power,
    Capacity,
    Length,
    Count,
}

/// Compiled patterns for CMS value normalization. Build once and reuse.
pub struct UnitParser {
    quantity: Regex,
    generation: Regex,
}

impl UnitParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            quantity: Regex::new(r"^\s*\$?\s*(\d[\d,]*(?:\.\d+)?|\.\d+)\s*([A-Za-z]*)\s*$")?,
            generation: Regex::new(r"(?i)^\s*(?:pci-?e\s*)?(?:gen\s*)?(\d+)(?:\.\d+)?\s*$")?,
        })
    }

    /// Parse "850W", "2 TB", "330 mm", "8" into the base unit of `dimension`
    fn measure(&self, text: &str, dimension: Dimension) -> Option<f64> {
        let cap = self.quantity.captures(text)?;
        let value: f64 = cap[1].replace(',', "").parse().ok()?;
        let unit = cap[2].to_ascii_lowercase();

        let factor = match (dimension, unit.as_str()) {
            (_, "") => 1.0,
            (Dimension::Power, "w") => 1.0,
            (Dimension::Power, "kw") => 1000.0,
            (Dimension::Capacity, "gb") => 1.0,
            (Dimension::Capacity, "tb") => 1024.0,
            (Dimension::Capacity, "mb") => 1.0 / 1024.0,
            (Dimension::Length, "mm") => 1.0,
            (Dimension::Length, "cm") => 10.0,
            (Dimension::Count, "cores" | "core" | "x" | "pcs" | "sticks") => 1.0,
            _ => return None,
        };
        Some(value * factor)
    }

    fn price_cents(&self, text: &str) -> Option<i64> {
        let dollars = self.measure(text, Dimension::Count)?;
        Some((dollars * 100.0).round() as i64)
    }

    fn pcie_generation(&self, text: &str) -> Option<u8> {
        let cap = self.generation.captures(text)?;
        cap[1].parse().ok()
    }
}

/// Unwrap Contentful-style `{ "en-US": value }` localized fields
fn unlocalized(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.len() == 1 => map.values().next().unwrap_or(value),
        _ => value,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match unlocalized(value) {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Validated view over one raw entry's fields
struct EntryFields<'a> {
    id: String,
    fields: &'a Map<String, Value>,
    units: &'a UnitParser,
}

impl<'a> EntryFields<'a> {
    fn text(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(as_text).filter(|s| !s.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, IngestError> {
        self.text(key).ok_or_else(|| IngestError::MissingField {
            entry: self.id.clone(),
            field: key,
        })
    }

    /// Optional attribute; garbled values degrade to absent
    fn optional<T>(&self, key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let raw = self.text(key)?;
        let parsed = parse(&raw);
        if parsed.is_none() {
            warn!("{}: ignoring unparseable {} '{}'", self.id, key, raw);
        }
        parsed
    }

    fn measure(&self, key: &str, dimension: Dimension) -> Option<f64> {
        self.optional(key, |s| self.units.measure(s, dimension))
    }
}

/// Turn one raw CMS entry into a catalog component
pub fn parse_entry(
    entry: &Value,
    ingest: &IngestConfig,
    units: &UnitParser,
) -> Result<Component, IngestError> {
    // Either { "sys": { "id" }, "fields": { ... } } or a flat object
    let (fields, id) = match entry.get("fields").and_then(Value::as_object) {
        Some(fields) => {
            let id = entry
                .pointer("/sys/id")
                .and_then(as_text)
                .or_else(|| fields.get("id").and_then(as_text));
            (fields, id)
        }
        None => {
            let fields = entry.as_object().ok_or(IngestError::MissingId)?;
            (fields, fields.get("id").and_then(as_text))
        }
    };
    let id = id.filter(|id| !id.is_empty()).ok_or(IngestError::MissingId)?;

    let e = EntryFields { id, fields, units };

    let name = e.required("name")?;
    let label = e.required("category")?;
    let category = ingest
        .resolve_category(&label)
        .ok_or_else(|| IngestError::UnknownCategory {
            entry: e.id.clone(),
            label: label.clone(),
        })?;
    let price_text = e.required("price")?;
    let price_cents = units
        .price_cents(&price_text)
        .ok_or_else(|| IngestError::InvalidField {
            entry: e.id.clone(),
            field: "price",
            value: price_text.clone(),
        })?;

    let stock = e
        .optional("stock", |s| units.measure(s, Dimension::Count))
        .map(|n| n.max(0.0) as u32)
        .unwrap_or(0);

    let specs = Specs {
        socket: e.text("socket"),
        memory_type: e.text("memoryType").map(|s| s.to_ascii_uppercase()),
        power_draw_watts: e.measure("powerDraw", Dimension::Power),
        wattage: e.measure("wattage", Dimension::Power),
        form_factor: e.optional("formFactor", |s| s.parse::<FormFactor>().ok()),
        max_form_factor: e.optional("maxFormFactor", |s| s.parse::<FormFactor>().ok()),
        length_mm: e.measure("length", Dimension::Length),
        max_gpu_length_mm: e.measure("maxGpuLength", Dimension::Length),
        height_mm: e.measure("height", Dimension::Length),
        max_cooler_height_mm: e.measure("maxCoolerHeight", Dimension::Length),
        cores: e.measure("cores", Dimension::Count).map(|n| n as u32),
        vram_gb: e.measure("vram", Dimension::Capacity),
        capacity_gb: e.measure("capacity", Dimension::Capacity),
        pcie_gen: e.optional("pcieGen", |s| units.pcie_generation(s)),
        modules: e.measure("modules", Dimension::Count).map(|n| n as u32),
    };

    Ok(Component {
        id: e.id,
        name,
        category,
        price_cents,
        stock,
        specs,
    })
}

/// Parse every entry in one export document
pub fn parse_export(
    document: &Value,
    ingest: &IngestConfig,
    units: &UnitParser,
) -> Vec<Result<Component, IngestError>> {
    // Contentful exports wrap entries in { "items": [...] }
    let entries = document
        .as_array()
        .or_else(|| document.get("items").and_then(Value::as_array));

    match entries {
        Some(entries) => entries.iter().map(|e| parse_entry(e, ingest, units)).collect(),
        None => vec![parse_entry(document, ingest, units)],
    }
}

/// Find all JSON exports under a directory
pub fn find_export_files(export_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(export_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// Import all exports under `export_dir` into the catalog
pub fn import_to_database(
    conn: &Connection,
    export_dir: &Path,
    ingest: &IngestConfig,
) -> Result<ImportStats> {
    let units = UnitParser::new()?;
    let mut stats = ImportStats::default();

    info!("Scanning {} for catalog exports", export_dir.display());
    let files = find_export_files(export_dir);
    info!("Found {} export files", files.len());

    for path in &files {
        let document = match read_document(path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                stats.skipped_files += 1;
                continue;
            }
        };
        stats.files += 1;

        for parsed in parse_export(&document, ingest, &units) {
            match parsed {
                Ok(component) => {
                    db::upsert_component(conn, &component)?;
                    debug!(
                        "Imported {} ({}, {} cents)",
                        component.id, component.category, component.price_cents
                    );
                    *stats.per_category.entry(component.category).or_default() += 1;
                    stats.components += 1;
                }
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    stats.errors += 1;
                }
            }
        }
    }

    Ok(stats)
}

fn read_document(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub components: usize,
    pub skipped_files: usize,
    pub errors: usize,
    pub per_category: std::collections::BTreeMap<Category, usize>,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} components from {} files. Skipped files: {}, Errors: {}",
            self.components, self.files, self.skipped_files, self.errors
        )?;
        for (category, count) in &self.per_category {
            write!(f, "\n  {:<12} {}", category, count)?;
        }
        Ok(())
    }
}
