//! Multi-signal scoring: combines normalized signals with
//! perspective-specific weights and text boosts into one final score.

use std::collections::HashMap;

use librarian_core::model::EntityType;

/// The perspective lens a caller asked the engine to score candidates
/// through. Closed enumeration per the source's task-type extension-point
/// design note — new values are added here, never carried as open strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Perspective {
    Debugging,
    Security,
    Performance,
    Architecture,
    Modification,
    Testing,
    Understanding,
}

/// One normalized signal in [0,1] contributing to a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Semantic,
    Keyword,
    Structural,
    Dependency,
    History,
    Recency,
    Risk,
    Test,
    Domain,
    Ownership,
}

const SIGNALS: [Signal; 10] = [
    Signal::Semantic,
    Signal::Keyword,
    Signal::Structural,
    Signal::Dependency,
    Signal::History,
    Signal::Recency,
    Signal::Risk,
    Signal::Test,
    Signal::Domain,
    Signal::Ownership,
];

/// Raw, normalized signal values for one candidate; missing signals read
/// as 0.
#[derive(Debug, Clone, Default)]
pub struct SignalVector(pub HashMap<Signal, f64>);

impl SignalVector {
    pub fn get(&self, signal: Signal) -> f64 {
        self.0.get(&signal).copied().unwrap_or(0.0).clamp(0.0, 1.0)
    }
}

fn base_weights() -> HashMap<Signal, f64> {
    SIGNALS.iter().map(|s| (*s, 0.1)).collect()
}

fn entity_weight(perspective: Perspective, entity_type: EntityType) -> f64 {
    let (function, module, document) = match perspective {
        Perspective::Debugging => (1.0, 0.7, 0.3),
        Perspective::Security => (1.0, 0.8, 0.5),
        Perspective::Performance => (1.0, 0.6, 0.2),
        Perspective::Architecture => (0.6, 1.0, 0.7),
        Perspective::Modification => (1.0, 0.8, 0.4),
        Perspective::Testing => (1.0, 0.7, 0.3),
        Perspective::Understanding => (1.0, 0.9, 0.9),
    };
    match entity_type {
        EntityType::Function => function,
        EntityType::Module => module,
        EntityType::File => document,
    }
}

/// Signal boosts applied before re-normalization, per the perspective table.
fn signal_boosts(perspective: Perspective) -> Vec<(Signal, f64)> {
    match perspective {
        Perspective::Debugging => vec![(Signal::History, 1.3), (Signal::Risk, 1.5), (Signal::Test, 1.2)],
        Perspective::Security => vec![(Signal::Risk, 2.0), (Signal::Domain, 1.3)],
        Perspective::Performance => vec![(Signal::History, 1.2), (Signal::Structural, 1.2)],
        Perspective::Architecture => vec![(Signal::Structural, 1.5), (Signal::Dependency, 1.5)],
        Perspective::Modification => vec![(Signal::Dependency, 1.3), (Signal::Test, 1.3)],
        Perspective::Testing => vec![(Signal::Test, 2.0)],
        Perspective::Understanding => vec![(Signal::Semantic, 1.3), (Signal::Keyword, 1.2)],
    }
}

/// Boost terms for text matching against the query; a hit multiplies the
/// score, a penalty term divides it.
fn text_boost_terms(perspective: Perspective) -> (&'static [&'static str], &'static [&'static str]) {
    match perspective {
        Perspective::Debugging => (&["error", "bug", "race", "leak"], &["test", "mock"]),
        Perspective::Security => (&["auth", "crypto", "inject"], &[]),
        Perspective::Performance => (&["async", "cache", "io"], &[]),
        Perspective::Architecture => (&["module", "layer", "boundary"], &[]),
        Perspective::Modification => (&["usage", "caller", "impact"], &[]),
        Perspective::Testing => (&["test", "spec", "coverage"], &[]),
        Perspective::Understanding => (&["what", "how", "why"], &[]),
    }
}

fn text_boost(perspective: Perspective, text: &str) -> f64 {
    let lower = text.to_lowercase();
    let (boosts, penalties) = text_boost_terms(perspective);

    let mut multiplier = 1.0;
    if boosts.iter().any(|term| lower.contains(term)) {
        multiplier *= 1.2;
    }
    if penalties.iter().any(|term| lower.contains(term)) {
        multiplier *= 0.8;
    }
    multiplier
}

/// Final score for one candidate: perspective-weighted signals times the
/// entity-type weight times the text boost, clamped to [0,1].
pub fn score(
    perspective: Perspective,
    entity_type: EntityType,
    signals: &SignalVector,
    candidate_text: &str,
) -> f64 {
    let mut weights = base_weights();
    for (signal, multiplier) in signal_boosts(perspective) {
        *weights.entry(signal).or_insert(0.1) *= multiplier;
    }

    let total_weight: f64 = weights.values().sum();
    let weighted_sum: f64 = SIGNALS
        .iter()
        .map(|signal| (weights[signal] / total_weight) * signals.get(*signal))
        .sum();

    let entity_factor = entity_weight(perspective, entity_type);
    let boost = text_boost(perspective, candidate_text);

    (weighted_sum * entity_factor * boost).clamp(0.0, 1.0)
}
