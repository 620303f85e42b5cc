//! Per-item processing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PostId, Stage};
use crate::errors::{CollaboratorError, ErrorKind, TransitionError};

/// One applied stage transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Stage before the transition.
    pub from: Stage,
    /// Stage after the transition.
    pub to: Stage,
    /// Collaborator attempts spent to get here.
    pub attempts: u32,
    /// When the transition was applied.
    pub at: DateTime<Utc>,
}

/// State of one feed item within a run.
///
/// The stage can only be changed through [`advance`](Self::advance),
/// [`mark_published`](Self::mark_published) and [`fail`](Self::fail), which
/// reject non-monotonic transitions. A post id is only ever set together
/// with [`Stage::Published`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    item_id: String,
    stage: Stage,
    attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published_post_id: Option<PostId>,
    #[serde(default)]
    history: Vec<Transition>,
}

impl ProcessingRecord {
    /// Creates a record for a freshly fetched item.
    #[must_use]
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            stage: Stage::Fetched,
            attempts: 0,
            last_error: None,
            last_error_kind: None,
            published_post_id: None,
            history: Vec::new(),
        }
    }

    /// Feed item id.
    #[must_use]
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Attempts consumed by the most recent collaborator call.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Message of the last failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Kind of the last failure.
    #[must_use]
    pub fn last_error_kind(&self) -> Option<ErrorKind> {
        self.last_error_kind
    }

    /// Post the item ended up in.
    #[must_use]
    pub fn published_post_id(&self) -> Option<&PostId> {
        self.published_post_id.as_ref()
    }

    /// Every transition applied so far.
    #[must_use]
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Returns true if the record is `Published` or `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Returns true if the item passed through `stage` at some point.
    #[must_use]
    pub fn has_reached(&self, stage: Stage) -> bool {
        self.stage == stage || self.history.iter().any(|t| t.to == stage)
    }

    /// Checks the invariants that the transition methods uphold.
    ///
    /// Records built in memory always pass. A record read back from storage
    /// may not, if the document was edited by hand.
    pub fn check_consistency(&self) -> Result<(), String> {
        match (self.stage, &self.published_post_id) {
            (Stage::Published, None) => {
                return Err(format!("item '{}' is published without a post id", self.item_id));
            }
            (stage, Some(post_id)) if stage != Stage::Published => {
                return Err(format!(
                    "item '{}' has post id {post_id} but is {stage}",
                    self.item_id
                ));
            }
            _ => {}
        }
        if let Some(last) = self.history.last() {
            if last.to != self.stage {
                return Err(format!(
                    "item '{}' is {} but its last transition went to {}",
                    self.item_id, self.stage, last.to
                ));
            }
        }
        Ok(())
    }

    /// Moves one step forward on the success path.
    ///
    /// `Published` is reached through [`mark_published`](Self::mark_published) only.
    pub fn advance(&mut self, to: Stage, attempts: u32) -> Result<(), TransitionError> {
        if to == Stage::Published || to == Stage::Failed {
            return Err(self.rejected(to));
        }
        self.transition(to, attempts)
    }

    /// Marks the item as published in `post_id`.
    pub fn mark_published(&mut self, post_id: PostId, attempts: u32) -> Result<(), TransitionError> {
        self.transition(Stage::Published, attempts)?;
        self.published_post_id = Some(post_id);
        Ok(())
    }

    /// Moves the item to `Failed`, keeping the error for the report.
    pub fn fail(&mut self, error: &CollaboratorError, attempts: u32) -> Result<(), TransitionError> {
        self.fail_with(error.kind(), error.to_string(), attempts)
    }

    /// Moves the item to `Failed` with an explicit kind and message.
    pub fn fail_with(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
        attempts: u32,
    ) -> Result<(), TransitionError> {
        self.transition(Stage::Failed, attempts)?;
        self.last_error = Some(message.into());
        self.last_error_kind = Some(kind);
        Ok(())
    }

    fn transition(&mut self, to: Stage, attempts: u32) -> Result<(), TransitionError> {
        if !self.stage.can_transition_to(to) {
            return Err(self.rejected(to));
        }
        self.history.push(Transition {
            from: self.stage,
            to,
            attempts,
            at: Utc::now(),
        });
        self.stage = to;
        self.attempts = attempts;
        Ok(())
    }

    fn rejected(&self, to: Stage) -> TransitionError {
        TransitionError {
            item_id: self.item_id.clone(),
            from: self.stage,
            to,
        }
    }
}
