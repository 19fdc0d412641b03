//! Regex-driven intent classification: decides whether a query asks about
//! structure, architecture, how to do a task, or neither.

use regex::Regex;
use std::sync::OnceLock;

/// Which side of a structural relationship the caller asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// "what imports X" / "what depends on X" / "what calls X"
    Dependents,
    /// "what does X import" / "X's dependencies"
    Dependencies,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Structural { direction: Direction, target: String, exhaustive: bool },
    Architectural,
    TaskPlanning { description: String },
    General,
}

struct Patterns {
    dependents: Regex,
    dependencies: Regex,
    architectural: Regex,
    task_planning: Regex,
    exhaustive: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        dependents: Regex::new(r"(?i)what\s+(?:imports|depends on|calls|uses)\s+(.+?)[\?\.]?$").unwrap(),
        dependencies: Regex::new(r"(?i)what\s+does\s+(.+?)\s+(?:import|depend on|call|use)[\?\.]?$").unwrap(),
        architectural: Regex::new(r"(?i)\b(architecture|layers?|module structure|system design)\b").unwrap(),
        task_planning: Regex::new(r"(?i)^\s*how\s+(?:do i|to|can i)\b").unwrap(),
        exhaustive: Regex::new(r"(?i)\b(all|every|transitive|impact analysis)\b").unwrap(),
    })
}

/// Classifies free-text into one of four intents. Structural intents
/// additionally extract a direction and the raw target string (not yet
/// resolved to an entity id).
pub fn classify(text: &str) -> Intent {
    let p = patterns();

    if p.architectural.is_match(text) {
        return Intent::Architectural;
    }

    if let Some(captures) = p.dependents.captures(text) {
        return Intent::Structural {
            direction: Direction::Dependents,
            target: captures[1].trim().to_string(),
            exhaustive: p.exhaustive.is_match(text),
        };
    }

    if let Some(captures) = p.dependencies.captures(text) {
        return Intent::Structural {
            direction: Direction::Dependencies,
            target: captures[1].trim().to_string(),
            exhaustive: p.exhaustive.is_match(text),
        };
    }

    if p.task_planning.is_match(text) {
        return Intent::TaskPlanning { description: text.trim().to_string() };
    }

    Intent::General
}
