//! Processing stage of a feed item.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an item stands in the fetch → summarize → draft → publish flow.
///
/// Stages only move forward one step at a time, or jump to [`Stage::Failed`].
/// [`Stage::Published`] and [`Stage::Failed`] are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Pulled from the feed, nothing done yet.
    #[default]
    Fetched,
    /// A summary has been produced.
    Summarized,
    /// The item's batch has been drafted into an article.
    Drafted,
    /// The article containing this item was published.
    Published,
    /// Processing gave up on this item for this run.
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetched => write!(f, "fetched"),
            Self::Summarized => write!(f, "summarized"),
            Self::Drafted => write!(f, "drafted"),
            Self::Published => write!(f, "published"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl Stage {
    /// Returns true if no further transitions are allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }

    /// The next stage on the success path.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Fetched => Some(Self::Summarized),
            Self::Summarized => Some(Self::Drafted),
            Self::Drafted => Some(Self::Published),
            Self::Published | Self::Failed => None,
        }
    }

    /// Returns true if moving from `self` to `to` keeps the stage monotonic.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 5] = [
        Stage::Fetched,
        Stage::Summarized,
        Stage::Drafted,
        Stage::Published,
        Stage::Failed,
    ];

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Fetched.to_string(), "fetched");
        assert_eq!(Stage::Published.to_string(), "published");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }

    #[test]
    fn test_default_stage_is_fetched() {
        assert_eq!(Stage::default(), Stage::Fetched);
    }

    #[test]
    fn test_stage_is_terminal() {
        assert!(Stage::Published.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Fetched.is_terminal());
        assert!(!Stage::Drafted.is_terminal());
    }

    #[test]
    fn test_forward_path() {
        assert!(Stage::Fetched.can_transition_to(Stage::Summarized));
        assert!(Stage::Summarized.can_transition_to(Stage::Drafted));
        assert!(Stage::Drafted.can_transition_to(Stage::Published));
    }

    #[test]
    fn test_no_skipping_or_regression() {
        assert!(!Stage::Fetched.can_transition_to(Stage::Drafted));
        assert!(!Stage::Fetched.can_transition_to(Stage::Published));
        assert!(!Stage::Drafted.can_transition_to(Stage::Summarized));
        assert!(!Stage::Summarized.can_transition_to(Stage::Summarized));
    }

    #[test]
    fn test_terminal_stages_accept_nothing() {
        for to in ALL {
            assert!(!Stage::Published.can_transition_to(to));
            assert!(!Stage::Failed.can_transition_to(to));
        }
    }

    #[test]
    fn test_any_open_stage_can_fail() {
        for from in [Stage::Fetched, Stage::Summarized, Stage::Drafted] {
            assert!(from.can_transition_to(Stage::Failed));
        }
    }

    #[test]
    fn test_stage_serialize() {
        let json = serde_json::to_string(&Stage::Summarized).unwrap();
        assert_eq!(json, r#""summarized""#);

        let back: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Stage::Summarized);
    }
}
