//! Engine configuration
//!
//! Loaded once from `rig-insight.toml` and passed by reference into the
//! compatibility filter, the scorer and the ingester.
//!
//! ```toml
//! [compatibility]
//! psu_safety_margin = 0.8
//!
//! [scoring]
//! bottleneck_threshold = 30.0
//! weights = { cpu = 0.35, gpu = 0.35, ram = 0.2, storage = 0.1 }
//! grade_bands = { a = 90, b = 75, c = 60, d = 45, e = 30 }
//!
//! [ingest.category_aliases]
//! "graphics card" = "gpu"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Category;

pub const CONFIG_FILE_NAME: &str = "rig-insight.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub compatibility: CompatibilityRules,
    pub scoring: ScoringPolicy,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompatibilityRules {
    /// Fraction of PSU wattage the build may draw
    pub psu_safety_margin: f64,
}

impl Default for CompatibilityRules {
    fn default() -> Self {
        Self { psu_safety_margin: 0.8 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Cap for any single sub-score
    pub sub_score_cap: f64,
    pub cpu_reference_cores: f64,
    pub gpu_reference_vram_gb: f64,
    pub ram_reference_gb: f64,
    pub storage_reference_gb: f64,
    pub weights: ScoreWeights,
    /// Gap in points above which two sub-scores count as a bottleneck
    pub bottleneck_threshold: f64,
    /// Points deducted from the aggregate per bottleneck
    pub bottleneck_penalty: f64,
    pub high_tier: f64,
    pub low_tier: f64,
    pub grade_bands: GradeBands,
    /// CPU draw above which a dedicated cooler is recommended
    pub hot_cpu_watts: f64,
    /// PSU load fraction above which the panel warns about headroom
    pub comfortable_psu_load: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            sub_score_cap: 95.0,
            cpu_reference_cores: 16.0,
            gpu_reference_vram_gb: 24.0,
            ram_reference_gb: 128.0,
            storage_reference_gb: 4096.0,
            weights: ScoreWeights::default(),
            bottleneck_threshold: 30.0,
            bottleneck_penalty: 5.0,
            high_tier: 60.0,
            low_tier: 35.0,
            grade_bands: GradeBands::default(),
            hot_cpu_watts: 125.0,
            comfortable_psu_load: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub cpu: f64,
    pub gpu: f64,
    pub ram: f64,
    pub storage: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            cpu: 0.35,
            gpu: 0.35,
            ram: 0.20,
            storage: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn for_category(&self, category: Category) -> f64 {
        match category {
            Category::Cpu => self.cpu,
            Category::Gpu => self.gpu,
            Category::Ram => self.ram,
            Category::Storage => self.storage,
            _ => 0.0,
        }
    }
}

/// Lower bound (inclusive) of each grade; anything below `e` is F
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GradeBands {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
}

impl Default for GradeBands {
    fn default() -> Self {
        Self {
            a: 90,
            b: 75,
            c: 60,
            d: 45,
            e: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Lowercased CMS category label -> catalog category
    pub category_aliases: BTreeMap<String, Category>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let aliases = [
            ("chassis", Category::Case),
            ("pc case", Category::Case),
            ("mainboard", Category::Motherboard),
            ("mobo", Category::Motherboard),
            ("processor", Category::Cpu),
            ("graphics card", Category::Gpu),
            ("video card", Category::Gpu),
            ("memory", Category::Ram),
            ("ssd", Category::Storage),
            ("hdd", Category::Storage),
            ("power supply", Category::Psu),
            ("cooler", Category::Cooling),
            ("cpu cooler", Category::Cooling),
        ];
        Self {
            category_aliases: aliases
                .into_iter()
                .map(|(label, category)| (label.to_string(), category))
                .collect(),
        }
    }
}

impl IngestConfig {
    /// Resolve a CMS category label through the canonical names, then aliases
    pub fn resolve_category(&self, label: &str) -> Option<Category> {
        if let Ok(category) = label.parse::<Category>() {
            return Some(category);
        }
        let key = label.trim().to_ascii_lowercase();
        self.category_aliases.get(&key).copied()
    }
}

impl InsightConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let margin = self.compatibility.psu_safety_margin;
        if !(margin > 0.0 && margin <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "psu_safety_margin must be in (0, 1], got {}",
                margin
            )));
        }

        let s = &self.scoring;
        let w = &s.weights;
        let weights = [w.cpu, w.gpu, w.ram, w.storage];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(
                "score weights must be finite and not negative".into(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::Invalid("score weights must not all be zero".into()));
        }
        if [
            s.cpu_reference_cores,
            s.gpu_reference_vram_gb,
            s.ram_reference_gb,
            s.storage_reference_gb,
        ]
        .iter()
        .any(|r| !(r.is_finite() && *r > 0.0))
        {
            return Err(ConfigError::Invalid("reference ceilings must be positive".into()));
        }
        if !(0.0..=100.0).contains(&s.sub_score_cap) {
            return Err(ConfigError::Invalid("sub_score_cap must be within 0..=100".into()));
        }
        for (name, value) in [
            ("bottleneck_threshold", s.bottleneck_threshold),
            ("bottleneck_penalty", s.bottleneck_penalty),
            ("high_tier", s.high_tier),
            ("low_tier", s.low_tier),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }
        if s.low_tier > s.high_tier {
            return Err(ConfigError::Invalid(format!(
                "low_tier ({}) must not exceed high_tier ({})",
                s.low_tier, s.high_tier
            )));
        }
        if !(s.hot_cpu_watts.is_finite() && s.hot_cpu_watts > 0.0) {
            return Err(ConfigError::Invalid("hot_cpu_watts must be positive".into()));
        }
        if !(s.comfortable_psu_load > 0.0 && s.comfortable_psu_load <= 1.0) {
            return Err(ConfigError::Invalid("comfortable_psu_load must be in (0, 1]".into()));
        }

        let b = &s.grade_bands;
        if !(b.a > b.b && b.b > b.c && b.c > b.d && b.d > b.e && b.a <= 100) {
            return Err(ConfigError::Invalid(
                "grade bands must be strictly decreasing from A to E and at most 100".into(),
            ));
        }
        Ok(())
    }
}

/// Load and validate an explicit configuration file
pub fn load_config(path: &Path) -> Result<InsightConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: InsightConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `rig-insight.toml` from a directory, falling back to defaults
pub fn load_config_or_default(dir: &Path) -> InsightConfig {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
        return InsightConfig::default();
    }
    match load_config(&path) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Ignoring {}: {}", path.display(), e);
            InsightConfig::default()
        }
    }
}
