//! Rig Insight
//!
//! Compatibility filtering and synergy scoring for custom PC builds, with a
//! small SQLite-backed catalog and a quote request flow around them.

pub mod compatibility;
pub mod config;
pub mod db;
pub mod flow;
pub mod ingest;
pub mod models;
pub mod sample;
pub mod synergy;

pub use compatibility::{check_build, filter_compatible};
pub use config::{CompatibilityRules, InsightConfig, ScoringPolicy};
pub use models::{
    BuildSelection, Category, CompatibilityReport, Component, Grade, Profile, SynergyResult,
};
pub use synergy::{compute_insight, compute_synergy, filled_categories, should_display_insight};
