//! Verdict policy
//!
//! Reduces per-SCT outcomes to a single verdict:
//!
//! | valid | invalid | level   |
//! |-------|---------|---------|
//! | > 0   | 0       | OK      |
//! | 0     | any     | Error   |
//! | > 0   | > 0     | Warning |

use std::collections::HashSet;
use std::fmt;

use super::verifier::{LogRef, VerificationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Warning => "Warning",
            Self::Error => "Error",
        })
    }
}

/// Final judgment on an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub level: Level,
    pub message: String,
    pub valid: usize,
    pub invalid: usize,
    /// Logs cited by the SCTs, first-seen order, no repeats.
    pub logs: Vec<LogRef>,
}

impl Verdict {
    pub fn total(&self) -> usize {
        self.valid + self.invalid
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

pub fn level_for(valid: usize, invalid: usize) -> Level {
    match (valid, invalid) {
        (0, _) => Level::Error,
        (_, 0) => Level::Ok,
        _ => Level::Warning,
    }
}

/// Build the verdict for a set of outcomes.
pub fn evaluate(outcomes: &[VerificationOutcome]) -> Verdict {
    let valid = outcomes.iter().filter(|o| o.is_valid()).count();
    let invalid = outcomes.len() - valid;
    let level = level_for(valid, invalid);

    let mut seen = HashSet::new();
    let logs: Vec<LogRef> = outcomes
        .iter()
        .filter_map(VerificationOutcome::log)
        .filter(|log| seen.insert(log.id))
        .cloned()
        .collect();

    let mut message = format!("validated {}/{} SCTs", valid, outcomes.len());
    if !logs.is_empty() {
        let names: Vec<&str> = logs.iter().map(|l| l.description.as_str()).collect();
        message.push_str(&format!(" in logs {:?}", names.join(", ")));
    }
    if level == Level::Error {
        message = format!("no valid SCTs: {}", message);
    }

    Verdict {
        level,
        message,
        valid,
        invalid,
        logs,
    }
}
