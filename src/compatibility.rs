//! Compatibility filtering
//!
//! Decides which candidates in a category still fit the current build.
//! Rules run in a fixed order (interface, physical fit, power budget) and
//! stop at the first failure. A rule whose inputs are missing, either an
//! unselected dependency or an attribute the catalog never provided, does
//! not constrain the candidate.

use tracing::debug;

use crate::config::CompatibilityRules;
use crate::models::{
    BuildSelection, Category, CompatibilityReport, Component, Conflict, Incompatibility, Rule,
};

/// Split `candidates` for `category` into compatible and rejected sets
pub fn filter_compatible(
    selection: &BuildSelection,
    candidates: &[Component],
    category: Category,
    rules: &CompatibilityRules,
) -> CompatibilityReport {
    let mut report = CompatibilityReport::default();

    for candidate in candidates {
        if candidate.category != category {
            debug!(
                "Skipping {} ({}) while filtering {}",
                candidate.id, candidate.category, category
            );
            continue;
        }

        match evaluate(selection, candidate, rules) {
            None => report.compatible.push(candidate.clone()),
            Some((rule, reason)) => report.incompatible.push(Incompatibility {
                component: candidate.clone(),
                rule,
                reason,
            }),
        }
    }

    debug!(
        "{}: {} compatible, {} incompatible",
        category,
        report.compatible.len(),
        report.incompatible.len()
    );
    report
}

/// Check every selected component against the rest of the build
pub fn check_build(selection: &BuildSelection, rules: &CompatibilityRules) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for component in selection.components() {
        let mut rest = selection.clone();
        rest.remove_component(&component.id);

        if let Some((rule, reason)) = evaluate(&rest, component, rules) {
            conflicts.push(Conflict {
                component_id: component.id.clone(),
                category: component.category,
                rule,
                reason,
            });
        }
    }

    conflicts.sort_by(|a, b| (a.category, &a.component_id).cmp(&(b.category, &b.component_id)));
    conflicts
}

fn evaluate(
    selection: &BuildSelection,
    candidate: &Component,
    rules: &CompatibilityRules,
) -> Option<(Rule, String)> {
    if let Some(reason) = interface_violation(selection, candidate) {
        return Some((Rule::Interface, reason));
    }
    if let Some(reason) = fit_violation(selection, candidate) {
        return Some((Rule::PhysicalFit, reason));
    }
    power_violation(selection, candidate, rules).map(|reason| (Rule::PowerBudget, reason))
}

fn same_label(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn interface_violation(selection: &BuildSelection, candidate: &Component) -> Option<String> {
    match candidate.category {
        Category::Cpu => {
            let board = selection.get(Category::Motherboard)?;
            socket_mismatch(candidate, board)
        }
        Category::Motherboard => {
            let socket = selection
                .get(Category::Cpu)
                .and_then(|cpu| socket_mismatch(cpu, candidate));
            socket.or_else(|| {
                selection
                    .all(Category::Ram)
                    .iter()
                    .filter(|ram| memory_mismatch(ram, candidate).is_some())
                    .min_by(|a, b| a.id.cmp(&b.id))
                    .and_then(|ram| memory_mismatch(ram, candidate))
            })
        }
        Category::Ram => {
            let board = selection.get(Category::Motherboard)?;
            memory_mismatch(candidate, board)
        }
        _ => None,
    }
}

fn socket_mismatch(cpu: &Component, board: &Component) -> Option<String> {
    let cpu_socket = cpu.specs.socket.as_deref()?;
    let board_socket = board.specs.socket.as_deref()?;
    if same_label(cpu_socket, board_socket) {
        return None;
    }
    Some(format!(
        "Socket mismatch: {} uses {} but {} has a {} socket",
        cpu.name, cpu_socket, board.name, board_socket
    ))
}

fn memory_mismatch(ram: &Component, board: &Component) -> Option<String> {
    let ram_type = ram.specs.memory_type.as_deref()?;
    let board_type = board.specs.memory_type.as_deref()?;
    if same_label(ram_type, board_type) {
        return None;
    }
    Some(format!(
        "Memory type mismatch: {} is {} but {} supports {}",
        ram.name, ram_type, board.name, board_type
    ))
}

fn fit_violation(selection: &BuildSelection, candidate: &Component) -> Option<String> {
    match candidate.category {
        Category::Motherboard | Category::Gpu | Category::Cooling => {
            let case = selection.get(Category::Case)?;
            case_rejects(case, candidate)
        }
        Category::Case => [Category::Motherboard, Category::Gpu, Category::Cooling]
            .into_iter()
            .filter_map(|category| selection.get(category))
            .find_map(|part| case_rejects(candidate, part)),
        _ => None,
    }
}

fn case_rejects(case: &Component, part: &Component) -> Option<String> {
    match part.category {
        Category::Motherboard => {
            let board = part.specs.form_factor?;
            let max = case.specs.max_form_factor?;
            (board > max).then(|| {
                format!(
                    "{} is {} but {} only fits up to {}",
                    part.name, board, case.name, max
                )
            })
        }
        Category::Gpu => {
            let length = part.specs.length_mm?;
            let max = case.specs.max_gpu_length_mm?;
            (length > max).then(|| {
                format!(
                    "{} is {:.0}mm long but {} fits GPUs up to {:.0}mm",
                    part.name, length, case.name, max
                )
            })
        }
        Category::Cooling => {
            let height = part.specs.height_mm?;
            let max = case.specs.max_cooler_height_mm?;
            (height > max).then(|| {
                format!(
                    "{} is {:.0}mm tall but {} clears coolers up to {:.0}mm",
                    part.name, height, case.name, max
                )
            })
        }
        _ => None,
    }
}

/// Draw of the build once `candidate` is added. The PSU itself never counts,
/// and in single-slot categories the candidate replaces the current pick.
fn projected_draw(selection: &BuildSelection, candidate: &Component) -> f64 {
    let replaced = (!candidate.category.allows_multiple()).then_some(candidate.category);
    let existing: f64 = selection
        .components()
        .filter(|c| c.category != Category::Psu && Some(c.category) != replaced)
        .map(Component::power_draw)
        .sum();

    if candidate.category == Category::Psu {
        existing
    } else {
        existing + candidate.power_draw()
    }
}

fn power_violation(
    selection: &BuildSelection,
    candidate: &Component,
    rules: &CompatibilityRules,
) -> Option<String> {
    let psu = if candidate.category == Category::Psu {
        candidate
    } else {
        selection.get(Category::Psu)?
    };
    let wattage = psu.specs.wattage?;
    let budget = wattage * rules.psu_safety_margin;
    let draw = projected_draw(selection, candidate);

    if draw <= budget {
        return None;
    }
    Some(format!(
        "Power budget exceeded: build would draw {:.0}W, above the {:.0}W safe limit of {} ({:.0}W at {:.0}%)",
        draw,
        budget,
        psu.name,
        wattage,
        rules.psu_safety_margin * 100.0
    ))
}
