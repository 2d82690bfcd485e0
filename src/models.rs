//! Data models for catalog components and builds

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Component slot in a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Case,
    Motherboard,
    Cpu,
    Gpu,
    Ram,
    Storage,
    Psu,
    Cooling,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Case,
        Category::Motherboard,
        Category::Cpu,
        Category::Gpu,
        Category::Ram,
        Category::Storage,
        Category::Psu,
        Category::Cooling,
    ];

    /// RAM is the only slot that takes more than one component
    pub fn allows_multiple(self) -> bool {
        matches!(self, Category::Ram)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Case => "case",
            Category::Motherboard => "motherboard",
            Category::Cpu => "cpu",
            Category::Gpu => "gpu",
            Category::Ram => "ram",
            Category::Storage => "storage",
            Category::Psu => "psu",
            Category::Cooling => "cooling",
        }
    }

    /// Human-facing name used in reasons and comments
    pub fn label(self) -> &'static str {
        match self {
            Category::Case => "case",
            Category::Motherboard => "motherboard",
            Category::Cpu => "CPU",
            Category::Gpu => "GPU",
            Category::Ram => "memory",
            Category::Storage => "storage",
            Category::Psu => "power supply",
            Category::Cooling => "cooler",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| format!("unknown category '{}'", s.trim()))
    }
}

/// Motherboard form factors, ordered smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormFactor {
    #[serde(rename = "mini-itx")]
    MiniItx,
    #[serde(rename = "micro-atx")]
    MicroAtx,
    #[serde(rename = "atx")]
    Atx,
    #[serde(rename = "e-atx")]
    EAtx,
}

impl fmt::Display for FormFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormFactor::MiniItx => write!(f, "Mini-ITX"),
            FormFactor::MicroAtx => write!(f, "Micro-ATX"),
            FormFactor::Atx => write!(f, "ATX"),
            FormFactor::EAtx => write!(f, "E-ATX"),
        }
    }
}

impl FromStr for FormFactor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "miniitx" | "itx" => Ok(FormFactor::MiniItx),
            "microatx" | "matx" | "uatx" => Ok(FormFactor::MicroAtx),
            "atx" => Ok(FormFactor::Atx),
            "eatx" | "extendedatx" => Ok(FormFactor::EAtx),
            _ => Err(format!("unknown form factor '{}'", s.trim())),
        }
    }
}

/// Category-specific attributes. Every field is optional; rules treat a
/// missing value as "not constrained" and scoring treats it as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Specs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    /// DDR4, DDR5, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_draw_watts: Option<f64>,
    /// PSU rated output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wattage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_factor: Option<FormFactor>,
    /// Largest board a case accepts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_form_factor: Option<FormFactor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gpu_length_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cooler_height_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vram_gb: Option<f64>,
    /// RAM kit or drive capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcie_gen: Option<u8>,
    /// Sticks in a RAM kit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<u32>,
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub specs: Specs,
}

impl Component {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            price_cents: 0,
            stock: 0,
            specs: Specs::default(),
        }
    }

    pub fn with_price(mut self, price_cents: i64) -> Self {
        self.price_cents = price_cents;
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_specs(mut self, specs: Specs) -> Self {
        self.specs = specs;
        self
    }

    /// Power draw, zero when the catalog did not provide it
    pub fn power_draw(&self) -> f64 {
        self.specs.power_draw_watts.unwrap_or(0.0)
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// The user's in-progress build: one component per category, several for RAM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildSelection {
    slots: BTreeMap<Category, Vec<Component>>,
}

impl BuildSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component. Single-slot categories replace their current pick;
    /// RAM kits are kept sorted by id so the selection order never shows.
    pub fn select(&mut self, component: Component) {
        let slot = self.slots.entry(component.category).or_default();
        if !component.category.allows_multiple() {
            slot.clear();
        }
        let index = slot.partition_point(|c| c.id <= component.id);
        slot.insert(index, component);
    }

    pub fn with(mut self, component: Component) -> Self {
        self.select(component);
        self
    }

    /// Drop a single component by id, returning it if it was selected
    pub fn remove_component(&mut self, id: &str) -> Option<Component> {
        let (category, index) = self.slots.iter().find_map(|(category, items)| {
            items.iter().position(|c| c.id == id).map(|i| (*category, i))
        })?;
        let slot = self.slots.get_mut(&category)?;
        let removed = slot.remove(index);
        if slot.is_empty() {
            self.slots.remove(&category);
        }
        Some(removed)
    }

    /// First (for single-slot categories, only) component in a category
    pub fn get(&self, category: Category) -> Option<&Component> {
        self.slots.get(&category).and_then(|items| items.first())
    }

    pub fn all(&self, category: Category) -> &[Component] {
        self.slots.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, category: Category) -> bool {
        !self.all(category).is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.slots.values().flatten()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.slots
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(category, _)| *category)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.values().all(Vec::is_empty)
    }

    pub fn total_price_cents(&self) -> i64 {
        self.components().map(|c| c.price_cents).sum()
    }

    /// Component ids per category, the persisted form of a build
    pub fn to_ids(&self) -> BTreeMap<Category, Vec<String>> {
        self.slots
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(category, items)| (*category, items.iter().map(|c| c.id.clone()).collect()))
            .collect()
    }
}

/// A named build persisted by id only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedConfiguration {
    pub name: String,
    pub components: BTreeMap<Category, Vec<String>>,
}

/// Which compatibility rule rejected a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Interface,
    PhysicalFit,
    PowerBudget,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Interface => write!(f, "interface"),
            Rule::PhysicalFit => write!(f, "physical fit"),
            Rule::PowerBudget => write!(f, "power budget"),
        }
    }
}

/// A rejected candidate and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incompatibility {
    pub component: Component,
    pub rule: Rule,
    pub reason: String,
}

/// Compatibility verdict for one category's candidates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub compatible: Vec<Component>,
    pub incompatible: Vec<Incompatibility>,
}

impl CompatibilityReport {
    pub fn is_compatible(&self, id: &str) -> bool {
        self.compatible.iter().any(|c| c.id == id)
    }

    pub fn reason_for(&self, id: &str) -> Option<&str> {
        self.incompatible
            .iter()
            .find(|i| i.component.id == id)
            .map(|i| i.reason.as_str())
    }
}

/// A selected component that clashes with the rest of the build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub component_id: String,
    pub category: Category,
    pub rule: Rule,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Profile {
    #[serde(rename = "Gaming Powerhouse")]
    GamingPowerhouse,
    #[serde(rename = "Workstation Beast")]
    WorkstationBeast,
    #[serde(rename = "Balanced All-Rounder")]
    BalancedAllRounder,
    #[serde(rename = "Entry Gaming")]
    EntryGaming,
    Unclassified,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::GamingPowerhouse => write!(f, "Gaming Powerhouse"),
            Profile::WorkstationBeast => write!(f, "Workstation Beast"),
            Profile::BalancedAllRounder => write!(f, "Balanced All-Rounder"),
            Profile::EntryGaming => write!(f, "Entry Gaming"),
            Profile::Unclassified => write!(f, "Unclassified"),
        }
    }
}

/// An advisory line in the insight panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(default)]
    pub advanced: bool,
}

impl Comment {
    pub fn basic(text: impl Into<String>) -> Self {
        Self { text: text.into(), advanced: false }
    }

    pub fn advanced(text: impl Into<String>) -> Self {
        Self { text: text.into(), advanced: true }
    }
}

/// One component under-using another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub limiting: Category,
    pub limited: Category,
    pub gap: f64,
}

/// Sub-scores per scored category, absent when the category is empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub cpu: Option<f64>,
    pub gpu: Option<f64>,
    pub ram: Option<f64>,
    pub storage: Option<f64>,
}

impl SubScores {
    pub fn get(&self, category: Category) -> Option<f64> {
        match category {
            Category::Cpu => self.cpu,
            Category::Gpu => self.gpu,
            Category::Ram => self.ram,
            Category::Storage => self.storage,
            _ => None,
        }
    }

    pub fn present(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        [Category::Cpu, Category::Gpu, Category::Ram, Category::Storage]
            .into_iter()
            .filter_map(|c| self.get(c).map(|score| (c, score)))
    }
}

/// Derived harmony score for a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyResult {
    pub score: u8,
    pub grade: Grade,
    pub profile: Profile,
    pub sub_scores: SubScores,
    pub bottlenecks: Vec<Bottleneck>,
    pub comments: Vec<Comment>,
}

impl SynergyResult {
    /// Comments the panel shows, honoring the viewer's "advanced" preference
    pub fn visible_comments(&self, show_advanced: bool) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(move |c| show_advanced || !c.advanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(id: &str) -> Component {
        Component::new(id, id, Category::Ram)
    }

    #[test]
    fn test_single_slot_replaces() {
        let mut build = BuildSelection::new();
        build.select(Component::new("a", "A", Category::Cpu));
        build.select(Component::new("b", "B", Category::Cpu));
        assert_eq!(build.all(Category::Cpu).len(), 1);
        assert_eq!(build.get(Category::Cpu).map(|c| c.id.as_str()), Some("b"));
    }

    #[test]
    fn test_ram_accumulates_and_removes() {
        let mut build = BuildSelection::new().with(ram("r1")).with(ram("r2"));
        assert_eq!(build.all(Category::Ram).len(), 2);

        assert!(build.remove_component("r1").is_some());
        assert_eq!(build.all(Category::Ram).len(), 1);
        assert!(build.remove_component("r2").is_some());
        assert!(!build.contains(Category::Ram));
        assert!(build.is_empty());
        assert!(build.remove_component("missing").is_none());
    }

    #[test]
    fn test_ram_kits_kept_in_id_order() {
        let build = BuildSelection::new()
            .with(ram("r2"))
            .with(ram("r1"))
            .with(ram("r3"));
        let ids: Vec<&str> = build.all(Category::Ram).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["r1", "r2", "r3"]);

        let shuffled = BuildSelection::new()
            .with(ram("r3"))
            .with(ram("r1"))
            .with(ram("r2"));
        assert_eq!(build, shuffled);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("GPU".parse::<Category>(), Ok(Category::Gpu));
        assert_eq!(" psu ".parse::<Category>(), Ok(Category::Psu));
        assert!("monitor".parse::<Category>().is_err());
    }

    #[test]
    fn test_form_factor_ordering() {
        assert!(FormFactor::MiniItx < FormFactor::MicroAtx);
        assert!(FormFactor::Atx < FormFactor::EAtx);
        assert_eq!("Micro-ATX".parse::<FormFactor>(), Ok(FormFactor::MicroAtx));
        assert_eq!("mATX".parse::<FormFactor>(), Ok(FormFactor::MicroAtx));
    }

    #[test]
    fn test_selection_serializes_as_map() {
        let build = BuildSelection::new().with(Component::new("c1", "Chip", Category::Cpu));
        let json = serde_json::to_value(&build).unwrap();
        assert!(json.get("cpu").is_some());
        let back: BuildSelection = serde_json::from_value(json).unwrap();
        assert_eq!(back, build);
    }
}
