use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ScrapeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Pending => "pending",
            ScrapeStatus::Processing => "processing",
            ScrapeStatus::Completed => "completed",
            ScrapeStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScrapeStatus::Completed | ScrapeStatus::Failed)
    }

    /// pending -> (processing) -> completed | failed. Terminal states never move.
    pub fn can_transition_to(&self, next: ScrapeStatus) -> bool {
        match (self, next) {
            (ScrapeStatus::Pending, ScrapeStatus::Processing) => true,
            (ScrapeStatus::Pending | ScrapeStatus::Processing, next) => next.is_terminal(),
            _ => false,
        }
    }

    /// States a row may be in right before moving to `next`.
    pub fn sources_of(next: ScrapeStatus) -> &'static [ScrapeStatus] {
        match next {
            ScrapeStatus::Pending => &[],
            ScrapeStatus::Processing => &[ScrapeStatus::Pending],
            ScrapeStatus::Completed | ScrapeStatus::Failed => {
                &[ScrapeStatus::Pending, ScrapeStatus::Processing]
            }
        }
    }
}

impl FromStr for ScrapeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ScrapeStatus::Pending),
            "processing" => Ok(ScrapeStatus::Processing),
            "completed" => Ok(ScrapeStatus::Completed),
            "failed" => Ok(ScrapeStatus::Failed),
            other => Err(format!("Unknown status '{}'", other)),
        }
    }
}

impl std::fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ScrapeStatus::{self, *};

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
    }

    #[test]
    fn terminal_states_never_move() {
        for from in [Completed, Failed] {
            for to in [Pending, Processing, Completed, Failed] {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn no_transition_back_to_pending() {
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn sources_match_transition_table() {
        for next in [Pending, Processing, Completed, Failed] {
            for from in ScrapeStatus::sources_of(next) {
                assert!(from.can_transition_to(next));
            }
        }
    }
}
