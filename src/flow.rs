//! Quote request wizard
//!
//! ```text
//! CollectingComponents -> CollectingContactInfo -> Submitting -> Submitted
//!          ^                      |   ^               |
//!          +------- back ---------+   +---- fail -----+
//! ```
//!
//! A rejected transition leaves the flow in the state it was in.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::compatibility::check_build;
use crate::config::CompatibilityRules;
use crate::models::{BuildSelection, Category, Component, Conflict};

/// Slots a build needs before a quote can be requested
pub const REQUIRED_CATEGORIES: [Category; 6] = [
    Category::Case,
    Category::Motherboard,
    Category::Cpu,
    Category::Ram,
    Category::Storage,
    Category::Psu,
];

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("build is missing: {}", join(.0))]
    MissingCategories(Vec<Category>),

    #[error("build has {} compatibility conflict(s)", .0.len())]
    Conflicts(Vec<Conflict>),

    #[error("invalid contact details: {0}")]
    InvalidContact(String),
}

fn join(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub contact: ContactInfo,
    pub components: BTreeMap<Category, Vec<String>>,
    pub total_price_cents: i64,
}

/// Checks contact details; holds its compiled pattern for reuse
pub struct ContactValidator {
    email: Regex,
}

impl ContactValidator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            email: Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$")?,
        })
    }

    pub fn validate(&self, contact: &ContactInfo) -> Result<(), FlowError> {
        if contact.name.trim().is_empty() {
            return Err(FlowError::InvalidContact("name is required".into()));
        }
        if !self.email.is_match(contact.email.trim()) {
            return Err(FlowError::InvalidContact(format!(
                "'{}' is not an email address",
                contact.email
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderState {
    CollectingComponents {
        selection: BuildSelection,
    },
    CollectingContactInfo {
        selection: BuildSelection,
        last_error: Option<String>,
    },
    Submitting {
        selection: BuildSelection,
        request: QuoteRequest,
    },
    Submitted {
        request: QuoteRequest,
        reference: String,
    },
}

impl OrderState {
    pub fn name(&self) -> &'static str {
        match self {
            OrderState::CollectingComponents { .. } => "collecting components",
            OrderState::CollectingContactInfo { .. } => "collecting contact info",
            OrderState::Submitting { .. } => "submitting",
            OrderState::Submitted { .. } => "submitted",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderFlow {
    state: OrderState,
}

impl Default for OrderFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderFlow {
    pub fn new() -> Self {
        Self::with_selection(BuildSelection::new())
    }

    /// Start from an existing build, e.g. a saved configuration
    pub fn with_selection(selection: BuildSelection) -> Self {
        Self {
            state: OrderState::CollectingComponents { selection },
        }
    }

    pub fn state(&self) -> &OrderState {
        &self.state
    }

    pub fn selection(&self) -> Option<&BuildSelection> {
        match &self.state {
            OrderState::CollectingComponents { selection }
            | OrderState::CollectingContactInfo { selection, .. }
            | OrderState::Submitting { selection, .. } => Some(selection),
            OrderState::Submitted { .. } => None,
        }
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }

    fn take_state(&mut self) -> OrderState {
        std::mem::replace(
            &mut self.state,
            OrderState::CollectingComponents {
                selection: BuildSelection::new(),
            },
        )
    }

    pub fn select(&mut self, component: Component) -> Result<(), FlowError> {
        if let OrderState::CollectingComponents { selection } = &mut self.state {
            selection.select(component);
            return Ok(());
        }
        Err(self.invalid("change components"))
    }

    pub fn remove(&mut self, id: &str) -> Result<Option<Component>, FlowError> {
        if let OrderState::CollectingComponents { selection } = &mut self.state {
            return Ok(selection.remove_component(id));
        }
        Err(self.invalid("change components"))
    }

    /// CollectingComponents -> CollectingContactInfo
    pub fn confirm_components(&mut self, rules: &CompatibilityRules) -> Result<(), FlowError> {
        let OrderState::CollectingComponents { selection } = &self.state else {
            return Err(self.invalid("confirm components"));
        };

        let missing: Vec<Category> = REQUIRED_CATEGORIES
            .into_iter()
            .filter(|c| !selection.contains(*c))
            .collect();
        if !missing.is_empty() {
            return Err(FlowError::MissingCategories(missing));
        }

        let conflicts = check_build(selection, rules);
        if !conflicts.is_empty() {
            return Err(FlowError::Conflicts(conflicts));
        }

        if let OrderState::CollectingComponents { selection } = self.take_state() {
            self.state = OrderState::CollectingContactInfo {
                selection,
                last_error: None,
            };
        }
        Ok(())
    }

    /// CollectingContactInfo -> Submitting
    pub fn submit_contact(
        &mut self,
        contact: ContactInfo,
        validator: &ContactValidator,
    ) -> Result<&QuoteRequest, FlowError> {
        if !matches!(self.state, OrderState::CollectingContactInfo { .. }) {
            return Err(self.invalid("submit contact details"));
        }
        validator.validate(&contact)?;

        if let OrderState::CollectingContactInfo { selection, .. } = self.take_state() {
            let request = QuoteRequest {
                contact,
                components: selection.to_ids(),
                total_price_cents: selection.total_price_cents(),
            };
            self.state = OrderState::Submitting { selection, request };
        }

        match &self.state {
            OrderState::Submitting { request, .. } => Ok(request),
            _ => Err(self.invalid("submit contact details")),
        }
    }

    /// Submitting -> Submitted
    pub fn complete(&mut self, reference: impl Into<String>) -> Result<(), FlowError> {
        if !matches!(self.state, OrderState::Submitting { .. }) {
            return Err(self.invalid("complete a submission"));
        }
        if let OrderState::Submitting { request, .. } = self.take_state() {
            let reference = reference.into();
            info!("Quote request {} submitted for {}", reference, request.contact.email);
            self.state = OrderState::Submitted { request, reference };
        }
        Ok(())
    }

    /// Submitting -> CollectingContactInfo, keeping the failure for display
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), FlowError> {
        if !matches!(self.state, OrderState::Submitting { .. }) {
            return Err(self.invalid("fail a submission"));
        }
        if let OrderState::Submitting { selection, .. } = self.take_state() {
            self.state = OrderState::CollectingContactInfo {
                selection,
                last_error: Some(reason.into()),
            };
        }
        Ok(())
    }

    /// CollectingContactInfo -> CollectingComponents
    pub fn back(&mut self) -> Result<(), FlowError> {
        if !matches!(self.state, OrderState::CollectingContactInfo { .. }) {
            return Err(self.invalid("go back"));
        }
        if let OrderState::CollectingContactInfo { selection, .. } = self.take_state() {
            self.state = OrderState::CollectingComponents { selection };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormFactor, Specs};

    fn part(id: &str, category: Category, specs: Specs) -> Component {
        Component::new(id, id, category).with_price(10000).with_specs(specs)
    }

    fn complete_build() -> BuildSelection {
        BuildSelection::new()
            .with(part("case", Category::Case, Specs {
                max_form_factor: Some(FormFactor::Atx),
                ..Default::default()
            }))
            .with(part("board", Category::Motherboard, Specs {
                socket: Some("AM5".into()),
                form_factor: Some(FormFactor::Atx),
                ..Default::default()
            }))
            .with(part("cpu", Category::Cpu, Specs {
                socket: Some("AM5".into()),
                power_draw_watts: Some(105.0),
                ..Default::default()
            }))
            .with(part("ram", Category::Ram, Specs::default()))
            .with(part("ssd", Category::Storage, Specs::default()))
            .with(part("psu", Category::Psu, Specs {
                wattage: Some(650.0),
                ..Default::default()
            }))
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            notes: None,
        }
    }

    #[test]
    fn test_happy_path() {
        let validator = ContactValidator::new().unwrap();
        let mut flow = OrderFlow::with_selection(complete_build());

        flow.confirm_components(&CompatibilityRules::default()).unwrap();
        assert_eq!(flow.state().name(), "collecting contact info");

        let request = flow.submit_contact(contact(), &validator).unwrap();
        assert_eq!(request.total_price_cents, 60000);
        assert_eq!(request.components.len(), 6);

        flow.complete("Q-000001").unwrap();
        match flow.state() {
            OrderState::Submitted { reference, .. } => assert_eq!(reference, "Q-000001"),
            other => panic!("unexpected state {other}"),
        }
        assert!(flow.selection().is_none());
    }

    #[test]
    fn test_missing_categories_block_confirmation() {
        let mut flow = OrderFlow::new();
        flow.select(part("cpu", Category::Cpu, Specs::default())).unwrap();

        let err = flow.confirm_components(&CompatibilityRules::default()).unwrap_err();
        match err {
            FlowError::MissingCategories(missing) => {
                assert!(missing.contains(&Category::Psu));
                assert!(!missing.contains(&Category::Cpu));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(flow.state().name(), "collecting components");
    }

    #[test]
    fn test_conflicts_block_confirmation() {
        let mut build = complete_build();
        build.select(part("intel", Category::Cpu, Specs {
            socket: Some("LGA1700".into()),
            ..Default::default()
        }));
        let mut flow = OrderFlow::with_selection(build);

        let err = flow.confirm_components(&CompatibilityRules::default()).unwrap_err();
        assert!(matches!(err, FlowError::Conflicts(_)));
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn test_invalid_contact_keeps_state() {
        let validator = ContactValidator::new().unwrap();
        let mut flow = OrderFlow::with_selection(complete_build());
        flow.confirm_components(&CompatibilityRules::default()).unwrap();

        let mut bad = contact();
        bad.email = "not-an-email".into();
        assert!(matches!(
            flow.submit_contact(bad, &validator),
            Err(FlowError::InvalidContact(_))
        ));
        assert_eq!(flow.state().name(), "collecting contact info");
    }

    #[test]
    fn test_fail_returns_to_contact_info() {
        let validator = ContactValidator::new().unwrap();
        let mut flow = OrderFlow::with_selection(complete_build());
        flow.confirm_components(&CompatibilityRules::default()).unwrap();
        flow.submit_contact(contact(), &validator).unwrap();

        flow.fail("store unavailable").unwrap();
        match flow.state() {
            OrderState::CollectingContactInfo { last_error, .. } => {
                assert_eq!(last_error.as_deref(), Some("store unavailable"));
            }
            other => panic!("unexpected state {other}"),
        }

        flow.back().unwrap();
        assert_eq!(flow.state().name(), "collecting components");
        assert_eq!(flow.selection().map(|s| s.components().count()), Some(6));
    }

    #[test]
    fn test_invalid_transitions() {
        let mut flow = OrderFlow::new();
        assert!(matches!(
            flow.complete("Q-1"),
            Err(FlowError::InvalidTransition { action: "complete a submission", .. })
        ));
        assert!(flow.back().is_err());
        assert!(flow.fail("x").is_err());

        let validator = ContactValidator::new().unwrap();
        assert!(flow.submit_contact(contact(), &validator).is_err());
    }

    #[test]
    fn test_components_locked_after_confirmation() {
        let mut flow = OrderFlow::with_selection(complete_build());
        flow.confirm_components(&CompatibilityRules::default()).unwrap();
        assert!(flow.select(part("gpu", Category::Gpu, Specs::default())).is_err());
        assert!(flow.remove("cpu").is_err());
    }
}
