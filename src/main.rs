//! Rig Insight CLI
//!
//! Compatibility checks and build insight for custom PC builds.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rig_insight::config::{self, InsightConfig};
use rig_insight::db;
use rig_insight::flow::{ContactInfo, ContactValidator, FlowError, OrderFlow};
use rig_insight::ingest;
use rig_insight::models::{BuildSelection, Category, SavedConfiguration};
use rig_insight::sample;
use rig_insight::{compatibility, synergy};

#[derive(Parser)]
#[command(name = "rig-insight")]
#[command(about = "Compatibility checks and build insight for custom PCs")]
struct Cli {
    /// Path to the SQLite catalog
    #[arg(short, long, default_value = "rig_catalog.db")]
    database: PathBuf,

    /// Engine configuration (defaults to ./rig-insight.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where a build comes from
#[derive(Args)]
struct BuildSource {
    /// JSON file mapping categories to component ids
    #[arg(short, long, conflicts_with = "saved")]
    build: Option<PathBuf>,

    /// Name of a saved configuration
    #[arg(short, long)]
    saved: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty catalog
    Init,

    /// Import CMS JSON exports from a directory
    Import {
        export_dir: PathBuf,

        /// Clear the catalog before importing
        #[arg(long)]
        clear: bool,
    },

    /// Replace the catalog with sample components
    LoadSample,

    /// List catalog components
    List {
        #[arg(short = 't', long)]
        category: Option<Category>,
    },

    /// Show one component
    Show { id: String },

    /// Show which catalog components in a category fit a build
    Check {
        #[command(flatten)]
        source: BuildSource,

        /// Category to filter
        category: Category,

        #[arg(long)]
        json: bool,
    },

    /// Score a build
    Insight {
        #[command(flatten)]
        source: BuildSource,

        /// Include advanced comments
        #[arg(short, long)]
        advanced: bool,

        /// Score even when fewer than three categories are filled
        #[arg(long)]
        force: bool,

        #[arg(long)]
        json: bool,
    },

    /// Save a build file under a name
    Save { name: String, build: PathBuf },

    /// List saved configurations
    Saved,

    /// Delete a saved configuration
    Forget { name: String },

    /// Request a quote for a build
    Quote {
        #[command(flatten)]
        source: BuildSource,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        notes: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let insight_config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_config_or_default(Path::new(".")),
    };

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    run(&conn, &insight_config, cli)
}

fn run(conn: &Connection, cfg: &InsightConfig, cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => {
            println!("Catalog initialized at: {}", cli.database.display());
        }

        Commands::Import { export_dir, clear } => {
            if clear {
                println!("Clearing existing catalog...");
                db::clear_catalog(conn)?;
            }
            let stats = ingest::import_to_database(conn, &export_dir, &cfg.ingest)?;
            println!("{}", stats);
        }

        Commands::LoadSample => {
            let count = sample::load_sample_data(conn)?;
            println!("Loaded {} sample components", count);
        }

        Commands::List { category } => {
            let components = db::list_components(conn, category)?;
            if components.is_empty() {
                println!("No components in catalog. Run 'import' or 'load-sample' first.");
            } else {
                println!(
                    "{:<16} {:<12} {:<34} {:>10} {:>6}",
                    "ID", "Category", "Name", "Price", "Stock"
                );
                println!("{}", "-".repeat(82));
                for c in components {
                    let stock = if c.in_stock() { c.stock.to_string() } else { "out".into() };
                    println!(
                        "{:<16} {:<12} {:<34} {:>10} {:>6}",
                        c.id,
                        c.category,
                        c.name,
                        dollars(c.price_cents),
                        stock
                    );
                }
            }
        }

        Commands::Show { id } => match db::get_component(conn, &id)? {
            Some(c) => {
                println!("Component: {}", c.name);
                println!("  ID: {}", c.id);
                println!("  Category: {}", c.category);
                println!("  Price: {}", dollars(c.price_cents));
                println!("  Stock: {}", c.stock);
                println!("  Specs: {}", serde_json::to_string_pretty(&c.specs)?);
            }
            None => println!("Component '{}' not found", id),
        },

        Commands::Check { source, category, json } => {
            let selection = load_build(conn, &source)?;
            let candidates = db::list_components(conn, Some(category))?;
            let report = compatibility::filter_compatible(
                &selection,
                &candidates,
                category,
                &cfg.compatibility,
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Compatible {}:", category.label());
                for c in &report.compatible {
                    println!("  {:<16} {} ({})", c.id, c.name, dollars(c.price_cents));
                }
                if !report.incompatible.is_empty() {
                    println!("\nIncompatible:");
                    for i in &report.incompatible {
                        println!("  {:<16} {}", i.component.id, i.reason);
                    }
                }
            }
        }

        Commands::Insight {
            source,
            advanced,
            force,
            json,
        } => {
            let selection = load_build(conn, &source)?;
            let result = if force {
                Some(synergy::compute_synergy(&selection, &cfg.scoring))
            } else {
                synergy::compute_insight(&selection, &cfg.scoring)
            };

            let Some(result) = result else {
                println!(
                    "Select at least {} categories to see build insight ({} so far).",
                    synergy::INSIGHT_MIN_CATEGORIES,
                    synergy::filled_categories(&selection)
                );
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("=== Build Insight ===");
                println!("Score:   {}/100 (grade {})", result.score, result.grade);
                println!("Profile: {}", result.profile);
                for (category, score) in result.sub_scores.present() {
                    println!("  {:<8} {:>5.1}", category, score);
                }
                println!();
                for comment in result.visible_comments(advanced) {
                    let marker = if comment.advanced { "*" } else { "-" };
                    println!("{} {}", marker, comment.text);
                }
            }
        }

        Commands::Save { name, build } => {
            let components = read_build_file(&build)?;
            let selection = db::resolve_selection(conn, &components)?;
            let saved = SavedConfiguration {
                name: name.clone(),
                components: selection.to_ids(),
            };
            db::save_configuration(conn, &saved)?;
            println!("Saved '{}' ({} components)", name, selection.components().count());
        }

        Commands::Saved => {
            let saved = db::list_configurations(conn)?;
            if saved.is_empty() {
                println!("No saved configurations.");
            }
            for (name, created_at) in saved {
                println!("  {:<24} {}", name, created_at);
            }
        }

        Commands::Forget { name } => {
            if db::delete_configuration(conn, &name)? {
                println!("Deleted '{}'", name);
            } else {
                println!("No saved configuration named '{}'", name);
            }
        }

        Commands::Quote {
            source,
            name,
            email,
            notes,
        } => {
            let selection = load_build(conn, &source)?;
            let contact = ContactInfo { name, email, notes };
            let reference = request_quote(conn, cfg, selection, contact)?;
            println!("Quote request submitted. Reference: {}", reference);
        }
    }

    Ok(())
}

/// Drive the quote flow through to submission, recording the request
fn request_quote(
    conn: &Connection,
    cfg: &InsightConfig,
    selection: BuildSelection,
    contact: ContactInfo,
) -> Result<String> {
    let validator = ContactValidator::new()?;
    let mut flow = OrderFlow::with_selection(selection);

    if let Err(e) = flow.confirm_components(&cfg.compatibility) {
        if let FlowError::Conflicts(conflicts) = &e {
            for c in conflicts {
                eprintln!("  {} ({}): {}", c.component_id, c.category, c.reason);
            }
        }
        return Err(e.into());
    }

    let request = flow.submit_contact(contact, &validator)?.clone();
    match db::insert_quote_request(
        conn,
        &request.contact.name,
        &request.contact.email,
        &request.components,
        request.total_price_cents,
    ) {
        Ok(id) => {
            let reference = format!("Q-{:06}", id);
            flow.complete(reference.clone())?;
            Ok(reference)
        }
        Err(e) => {
            flow.fail(e.to_string())?;
            Err(e.context("Failed to record quote request"))
        }
    }
}

fn read_build_file(path: &Path) -> Result<BTreeMap<Category, Vec<String>>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid build file", path.display()))
}

fn load_build(conn: &Connection, source: &BuildSource) -> Result<BuildSelection> {
    let ids = match (&source.build, &source.saved) {
        (Some(path), _) => read_build_file(path)?,
        (None, Some(name)) => match db::load_configuration(conn, name)? {
            Some(saved) => saved.components,
            None => bail!("No saved configuration named '{}'", name),
        },
        (None, None) => BTreeMap::new(),
    };
    db::resolve_selection(conn, &ids)
}

fn dollars(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}
