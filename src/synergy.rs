//! Synergy scoring
//!
//! Turns a build into a 0-100 harmony score, a letter grade, a profile and
//! an ordered list of advisory comments.
//!
//! ```text
//! sub-score  = min(cap, attribute / reference * 100)
//! aggregate  = weighted mean of present sub-scores - penalty * bottlenecks
//! ```

use tracing::debug;

use crate::config::{GradeBands, ScoringPolicy};
use crate::models::{
    Bottleneck, BuildSelection, Category, Comment, Grade, Profile, SubScores, SynergyResult,
};

/// Categories that must be filled before the insight panel is shown
pub const INSIGHT_MIN_CATEGORIES: usize = 3;

/// Pairs checked for bottlenecks
const BOTTLENECK_PAIRS: [(Category, Category); 3] = [
    (Category::Cpu, Category::Gpu),
    (Category::Cpu, Category::Ram),
    (Category::Gpu, Category::Ram),
];

pub fn filled_categories(selection: &BuildSelection) -> usize {
    selection.categories().count()
}

pub fn should_display_insight(selection: &BuildSelection) -> bool {
    filled_categories(selection) >= INSIGHT_MIN_CATEGORIES
}

/// Score for the insight panel, `None` while the panel stays hidden
pub fn compute_insight(
    selection: &BuildSelection,
    policy: &ScoringPolicy,
) -> Option<SynergyResult> {
    should_display_insight(selection).then(|| compute_synergy(selection, policy))
}

/// Score a build. Never fails; missing parts only reduce what can be said.
pub fn compute_synergy(selection: &BuildSelection, policy: &ScoringPolicy) -> SynergyResult {
    let sub_scores = sub_scores(selection, policy);
    let bottlenecks = detect_bottlenecks(&sub_scores, policy.bottleneck_threshold);
    let score = aggregate(&sub_scores, bottlenecks.len(), policy);
    let grade = grade_for(score, &policy.grade_bands);
    let profile = classify(
        selection.components().count(),
        &sub_scores,
        !bottlenecks.is_empty(),
        policy,
    );

    debug!(
        "Synergy: score={} grade={} profile={} bottlenecks={}",
        score,
        grade,
        profile,
        bottlenecks.len()
    );

    let comments = if selection.is_empty() {
        Vec::new()
    } else {
        comments(selection, &sub_scores, &bottlenecks, score, grade, profile, policy)
    };

    SynergyResult {
        score,
        grade,
        profile,
        sub_scores,
        bottlenecks,
        comments,
    }
}

/// Percentage of `reference`, floored at zero and held under `cap`. NaN
/// inputs collapse to zero.
fn scaled(value: f64, reference: f64, cap: f64) -> f64 {
    (value / reference * 100.0).max(0.0).min(cap.max(0.0))
}

pub fn sub_scores(selection: &BuildSelection, policy: &ScoringPolicy) -> SubScores {
    let cap = policy.sub_score_cap;

    let cpu = selection.get(Category::Cpu).map(|cpu| {
        let cores = f64::from(cpu.specs.cores.unwrap_or(0));
        scaled(cores, policy.cpu_reference_cores, cap)
    });
    let gpu = selection
        .get(Category::Gpu)
        .map(|gpu| scaled(gpu.specs.vram_gb.unwrap_or(0.0), policy.gpu_reference_vram_gb, cap));
    let ram = selection.contains(Category::Ram).then(|| {
        let total: f64 = selection
            .all(Category::Ram)
            .iter()
            .map(|kit| kit.specs.capacity_gb.unwrap_or(0.0))
            .sum();
        scaled(total, policy.ram_reference_gb, cap)
    });
    let storage = selection.get(Category::Storage).map(|drive| {
        scaled(drive.specs.capacity_gb.unwrap_or(0.0), policy.storage_reference_gb, cap)
    });

    SubScores { cpu, gpu, ram, storage }
}

pub fn detect_bottlenecks(scores: &SubScores, threshold: f64) -> Vec<Bottleneck> {
    BOTTLENECK_PAIRS
        .into_iter()
        .filter_map(|(a, b)| {
            let (sa, sb) = (scores.get(a)?, scores.get(b)?);
            let gap = (sa - sb).abs();
            if threshold.is_nan() || gap <= threshold {
                return None;
            }
            let (limiting, limited) = if sa < sb { (a, b) } else { (b, a) };
            Some(Bottleneck { limiting, limited, gap })
        })
        .collect()
}

fn aggregate(scores: &SubScores, bottlenecks: usize, policy: &ScoringPolicy) -> u8 {
    let (weighted, total_weight) = scores
        .present()
        .fold((0.0, 0.0), |(sum, weight), (category, score)| {
            let w = policy.weights.for_category(category);
            (sum + score * w, weight + w)
        });

    if total_weight.is_nan() || total_weight <= 0.0 {
        return 0;
    }

    let raw = weighted / total_weight - policy.bottleneck_penalty * bottlenecks as f64;
    raw.clamp(0.0, 100.0).round() as u8
}

pub fn grade_for(score: u8, bands: &GradeBands) -> Grade {
    if score >= bands.a {
        Grade::A
    } else if score >= bands.b {
        Grade::B
    } else if score >= bands.c {
        Grade::C
    } else if score >= bands.d {
        Grade::D
    } else if score >= bands.e {
        Grade::E
    } else {
        Grade::F
    }
}

/// Profile from the sub-score tiers. Counts components, not categories, so
/// two memory kits alone are enough to classify.
fn classify(
    components: usize,
    scores: &SubScores,
    has_bottleneck: bool,
    policy: &ScoringPolicy,
) -> Profile {
    if components < 2 {
        return Profile::Unclassified;
    }
    let present: Vec<f64> = scores.present().map(|(_, score)| score).collect();
    if present.is_empty() {
        return Profile::Unclassified;
    }

    let high = |score: Option<f64>| score.is_some_and(|s| s >= policy.high_tier);

    if high(scores.cpu) && high(scores.gpu) {
        return Profile::GamingPowerhouse;
    }
    if high(scores.cpu) && high(scores.ram) {
        return Profile::WorkstationBeast;
    }
    if present.iter().all(|s| *s < policy.low_tier) {
        return Profile::EntryGaming;
    }
    if present.iter().all(|s| (policy.low_tier..policy.high_tier).contains(s)) {
        return Profile::BalancedAllRounder;
    }
    if has_bottleneck {
        Profile::Unclassified
    } else {
        Profile::BalancedAllRounder
    }
}

fn comments(
    selection: &BuildSelection,
    scores: &SubScores,
    bottlenecks: &[Bottleneck],
    score: u8,
    grade: Grade,
    profile: Profile,
    policy: &ScoringPolicy,
) -> Vec<Comment> {
    let mut out = Vec::new();

    if scores.present().next().is_some() {
        out.push(Comment::basic(tier_comment(score, grade, profile)));
    }

    for b in bottlenecks {
        out.push(Comment::basic(format!(
            "The {} may hold back the {} ({:.0} point gap).",
            b.limiting.label(),
            b.limited.label(),
            b.gap
        )));
        out.push(Comment::advanced(bottleneck_detail(b)));
    }

    let core_parts = [Category::Cpu, Category::Gpu, Category::Ram]
        .into_iter()
        .filter(|c| scores.get(*c).is_some())
        .count();
    if bottlenecks.is_empty() && core_parts >= 2 {
        out.push(Comment::basic("Core components are well balanced for each other."));
    }

    power_comments(selection, policy, &mut out);

    if let Some(cpu) = selection.get(Category::Cpu) {
        let draw = cpu.power_draw();
        if draw >= policy.hot_cpu_watts && !selection.contains(Category::Cooling) {
            out.push(Comment::basic(format!(
                "{} is rated at {:.0}W; add a dedicated cooler to avoid thermal throttling.",
                cpu.name, draw
            )));
        }
    }

    if should_display_insight(selection) && !selection.contains(Category::Storage) {
        out.push(Comment::basic("No storage selected yet."));
    }

    if let Some(comment) = memory_channel_comment(selection) {
        out.push(comment);
    }
    if let Some(comment) = pcie_comment(selection) {
        out.push(comment);
    }

    out
}

fn tier_comment(score: u8, grade: Grade, profile: Profile) -> String {
    match profile {
        Profile::Unclassified => format!("Harmony score {}/100 (grade {}).", score, grade),
        _ => format!("{} build with a harmony score of {}/100 (grade {}).", profile, score, grade),
    }
}

fn bottleneck_detail(b: &Bottleneck) -> String {
    match (b.limiting, b.limited) {
        (Category::Cpu, Category::Gpu) => {
            "CPU-bound frames leave GPU headroom unused, most visibly in minimum FPS at high refresh rates."
                .to_string()
        }
        (Category::Gpu, Category::Cpu) => {
            "GPU-bound workloads will not scale with the extra cores; raise the GPU tier before the CPU."
                .to_string()
        }
        (Category::Ram, _) => format!(
            "Memory capacity below the {}'s working set forces paging to storage under load.",
            b.limited.label()
        ),
        (limiting, limited) => format!(
            "The {} tier trails the {} by {:.0} points.",
            limiting.label(),
            limited.label(),
            b.gap
        ),
    }
}

fn power_comments(selection: &BuildSelection, policy: &ScoringPolicy, out: &mut Vec<Comment>) {
    let Some(psu) = selection.get(Category::Psu) else {
        out.push(Comment::basic(
            "No power supply selected yet, so power headroom is unverified.",
        ));
        return;
    };
    let Some(wattage) = psu.specs.wattage.filter(|w| *w > 0.0) else {
        return;
    };

    let draw: f64 = selection
        .components()
        .filter(|c| c.category != Category::Psu)
        .map(|c| c.power_draw())
        .sum();
    let load = draw / wattage;

    if load > policy.comfortable_psu_load {
        out.push(Comment::basic(format!(
            "Estimated draw of {:.0}W is {:.0}% of the {:.0}W power supply; consider more headroom.",
            draw,
            load * 100.0,
            wattage
        )));
    } else {
        out.push(Comment::basic(format!(
            "Estimated draw of {:.0}W leaves comfortable headroom on the {:.0}W power supply.",
            draw, wattage
        )));
    }
}

fn memory_channel_comment(selection: &BuildSelection) -> Option<Comment> {
    let kits = selection.all(Category::Ram);
    if kits.is_empty() {
        return None;
    }
    let modules: u32 = kits.iter().map(|k| k.specs.modules.unwrap_or(1)).sum();

    let text = match modules {
        1 => {
            "A single memory module runs in single-channel mode; a matched pair doubles memory bandwidth."
                .to_string()
        }
        n if n % 2 == 0 => format!(
            "{} memory modules populate both channels evenly for dual-channel bandwidth.",
            n
        ),
        n => format!(
            "{} memory modules leave the channels unevenly populated; the remainder runs in single-channel mode.",
            n
        ),
    };
    Some(Comment::advanced(text))
}

fn pcie_comment(selection: &BuildSelection) -> Option<Comment> {
    let gpu = selection.get(Category::Gpu)?;
    let board = selection.get(Category::Motherboard)?;
    let (gpu_gen, board_gen) = (gpu.specs.pcie_gen?, board.specs.pcie_gen?);

    let text = if gpu_gen > board_gen {
        format!(
            "{} supports PCIe {}.0 but the x16 slot on {} runs at PCIe {}.0, halving peak link bandwidth per generation.",
            gpu.name, gpu_gen, board.name, board_gen
        )
    } else {
        format!(
            "{} runs at its full PCIe {}.0 x16 link on {}.",
            gpu.name, gpu_gen, board.name
        )
    };
    Some(Comment::advanced(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreWeights;
    use crate::models::{Component, Specs};

    fn cpu(cores: u32) -> Component {
        Component::new("cpu", "Test CPU", Category::Cpu).with_specs(Specs {
            cores: Some(cores),
            socket: Some("AM5".into()),
            ..Default::default()
        })
    }

    fn gpu(vram: f64) -> Component {
        Component::new("gpu", "Test GPU", Category::Gpu).with_specs(Specs {
            vram_gb: Some(vram),
            ..Default::default()
        })
    }

    fn ram(id: &str, capacity: f64, modules: u32) -> Component {
        Component::new(id, id, Category::Ram).with_specs(Specs {
            capacity_gb: Some(capacity),
            modules: Some(modules),
            ..Default::default()
        })
    }

    fn board() -> Component {
        Component::new("board", "Test Board", Category::Motherboard).with_specs(Specs {
            socket: Some("AM5".into()),
            pcie_gen: Some(4),
            ..Default::default()
        })
    }

    fn policy() -> ScoringPolicy {
        ScoringPolicy::default()
    }

    #[test]
    fn test_example_scenario() {
        let selection = BuildSelection::new().with(cpu(6)).with(gpu(12.0)).with(board());
        let result = compute_synergy(&selection, &policy());

        assert_eq!(result.sub_scores.cpu, Some(37.5));
        assert_eq!(result.sub_scores.gpu, Some(50.0));
        assert!(result.bottlenecks.is_empty());
        // (37.5 * 0.35 + 50 * 0.35) / 0.7 = 43.75
        assert_eq!(result.score, 44);
        assert_eq!(result.grade, Grade::E);
        assert_eq!(result.profile, Profile::BalancedAllRounder);
        assert!(should_display_insight(&selection));
    }

    #[test]
    fn test_empty_selection() {
        let result = compute_synergy(&BuildSelection::new(), &policy());
        assert_eq!(result.profile, Profile::Unclassified);
        assert_eq!(result.score, 0);
        assert_eq!(result.grade, Grade::F);
        assert!(result.comments.is_empty());
        assert!(compute_insight(&BuildSelection::new(), &policy()).is_none());
    }

    #[test]
    fn test_panel_hidden_below_three_categories() {
        let selection = BuildSelection::new().with(cpu(8)).with(gpu(8.0));
        assert_eq!(filled_categories(&selection), 2);
        assert!(!should_display_insight(&selection));
        assert!(compute_insight(&selection, &policy()).is_none());
    }

    #[test]
    fn test_sub_scores_are_capped() {
        let selection = BuildSelection::new().with(cpu(64)).with(gpu(48.0));
        let scores = sub_scores(&selection, &policy());
        assert_eq!(scores.cpu, Some(95.0));
        assert_eq!(scores.gpu, Some(95.0));
    }

    #[test]
    fn test_ram_capacity_sums_kits() {
        let selection = BuildSelection::new()
            .with(ram("a", 32.0, 2))
            .with(ram("b", 32.0, 2));
        assert_eq!(sub_scores(&selection, &policy()).ram, Some(50.0));
    }

    #[test]
    fn test_score_is_bounded() {
        for cores in [0, 1, 4, 8, 16, 32, 128] {
            for vram in [0.0, 4.0, 12.0, 24.0, 80.0] {
                for capacity in [0.0, 8.0, 64.0, 512.0] {
                    let selection = BuildSelection::new()
                        .with(cpu(cores))
                        .with(gpu(vram))
                        .with(ram("r", capacity, 2));
                    let result = compute_synergy(&selection, &policy());
                    assert!(result.score <= 100, "score={}", result.score);
                }
            }
        }
    }

    #[test]
    fn test_bottleneck_detection_and_penalty() {
        // cpu 25, gpu 95
        let selection = BuildSelection::new().with(cpu(4)).with(gpu(24.0)).with(board());
        let result = compute_synergy(&selection, &policy());

        assert_eq!(result.bottlenecks.len(), 1);
        let b = &result.bottlenecks[0];
        assert_eq!(b.limiting, Category::Cpu);
        assert_eq!(b.limited, Category::Gpu);
        assert_eq!(b.gap, 70.0);
        // mean 60 minus one 5 point penalty
        assert_eq!(result.score, 55);
        assert_eq!(result.profile, Profile::Unclassified);
        assert!(result.comments.iter().any(|c| c.text.contains("may hold back the GPU")));
    }

    #[test]
    fn test_gap_at_threshold_is_not_a_bottleneck() {
        let scores = SubScores {
            cpu: Some(20.0),
            gpu: Some(50.0),
            ..Default::default()
        };
        assert!(detect_bottlenecks(&scores, 30.0).is_empty());
    }

    #[test]
    fn test_grade_bands() {
        let bands = GradeBands::default();
        assert_eq!(grade_for(100, &bands), Grade::A);
        assert_eq!(grade_for(90, &bands), Grade::A);
        assert_eq!(grade_for(89, &bands), Grade::B);
        assert_eq!(grade_for(75, &bands), Grade::B);
        assert_eq!(grade_for(60, &bands), Grade::C);
        assert_eq!(grade_for(45, &bands), Grade::D);
        assert_eq!(grade_for(30, &bands), Grade::E);
        assert_eq!(grade_for(29, &bands), Grade::F);
        assert_eq!(grade_for(0, &bands), Grade::F);
    }

    #[test]
    fn test_profiles() {
        let gaming = BuildSelection::new().with(cpu(12)).with(gpu(16.0));
        assert_eq!(compute_synergy(&gaming, &policy()).profile, Profile::GamingPowerhouse);

        let workstation = BuildSelection::new()
            .with(cpu(16))
            .with(ram("r", 96.0, 4))
            .with(board());
        assert_eq!(
            compute_synergy(&workstation, &policy()).profile,
            Profile::WorkstationBeast
        );

        let entry = BuildSelection::new().with(cpu(4)).with(gpu(6.0)).with(ram("r", 16.0, 2));
        assert_eq!(compute_synergy(&entry, &policy()).profile, Profile::EntryGaming);

        let single = BuildSelection::new().with(cpu(16));
        assert_eq!(compute_synergy(&single, &policy()).profile, Profile::Unclassified);

        let no_scored_parts = BuildSelection::new().with(board()).with(
            Component::new("case", "Case", Category::Case),
        );
        assert_eq!(
            compute_synergy(&no_scored_parts, &policy()).profile,
            Profile::Unclassified
        );
    }

    #[test]
    fn test_workstation_with_modest_gpu() {
        // cpu 95, ram 75, gpu 33
        let selection = BuildSelection::new()
            .with(cpu(16))
            .with(gpu(8.0))
            .with(ram("r", 96.0, 4));
        assert_eq!(
            compute_synergy(&selection, &policy()).profile,
            Profile::WorkstationBeast
        );
    }

    #[test]
    fn test_profile_counts_components() {
        let one_kit = BuildSelection::new().with(ram("a", 32.0, 2));
        assert_eq!(compute_synergy(&one_kit, &policy()).profile, Profile::Unclassified);

        // 64GB across two kits scores 50, inside the moderate band
        let two_kits = one_kit.with(ram("b", 32.0, 2));
        assert_eq!(filled_categories(&two_kits), 1);
        assert_eq!(
            compute_synergy(&two_kits, &policy()).profile,
            Profile::BalancedAllRounder
        );
    }

    #[test]
    fn test_degenerate_policy_does_not_panic() {
        let selection = BuildSelection::new().with(cpu(8)).with(gpu(24.0));

        let mut negative_cap = policy();
        negative_cap.sub_score_cap = -1.0;
        let result = compute_synergy(&selection, &negative_cap);
        assert_eq!(result.sub_scores.cpu, Some(0.0));
        assert_eq!(result.score, 0);

        let mut nan_threshold = policy();
        nan_threshold.bottleneck_threshold = f64::NAN;
        assert!(compute_synergy(&selection, &nan_threshold).bottlenecks.is_empty());

        let mut no_weights = policy();
        no_weights.weights = ScoreWeights {
            cpu: 0.0,
            gpu: 0.0,
            ram: 0.0,
            storage: 0.0,
        };
        assert_eq!(compute_synergy(&selection, &no_weights).score, 0);

        let mut nan_reference = policy();
        nan_reference.cpu_reference_cores = f64::NAN;
        assert_eq!(
            compute_synergy(&selection, &nan_reference).sub_scores.cpu,
            Some(0.0)
        );
    }

    #[test]
    fn test_advanced_comments() {
        let mut fast_gpu = gpu(12.0);
        fast_gpu.specs.pcie_gen = Some(5);
        let selection = BuildSelection::new()
            .with(cpu(8))
            .with(fast_gpu)
            .with(board())
            .with(ram("r", 16.0, 1));
        let result = compute_synergy(&selection, &policy());

        let advanced: Vec<_> = result.comments.iter().filter(|c| c.advanced).collect();
        assert!(advanced.iter().any(|c| c.text.contains("single-channel")));
        assert!(advanced.iter().any(|c| c.text.contains("PCIe 5.0")));

        let basic_only = result.visible_comments(false).count();
        assert_eq!(basic_only + advanced.len(), result.comments.len());
        assert!(result.visible_comments(false).all(|c| !c.advanced));
    }

    #[test]
    fn test_power_and_cooling_comments() {
        let mut hot = cpu(16);
        hot.specs.power_draw_watts = Some(170.0);
        let psu = Component::new("psu", "PSU", Category::Psu).with_specs(Specs {
            wattage: Some(200.0),
            ..Default::default()
        });
        let selection = BuildSelection::new().with(hot).with(psu).with(gpu(16.0));
        let result = compute_synergy(&selection, &policy());

        assert!(result.comments.iter().any(|c| c.text.contains("dedicated cooler")));
        assert!(result.comments.iter().any(|c| c.text.contains("85% of the 200W")));
        assert!(result.comments.iter().any(|c| c.text == "No storage selected yet."));
    }

    #[test]
    fn test_synergy_is_order_independent() {
        let a = BuildSelection::new().with(cpu(8)).with(gpu(16.0)).with(ram("r", 32.0, 2));
        let b = BuildSelection::new().with(ram("r", 32.0, 2)).with(gpu(16.0)).with(cpu(8));
        assert_eq!(compute_synergy(&a, &policy()), compute_synergy(&b, &policy()));
    }
}
