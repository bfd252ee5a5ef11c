//! Core types for the delete flow

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one delete attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Confirmation was activated
    Deleted,

    /// No visible menu trigger on the item
    SkippedNoMenu,

    /// Menu opened but no item reads as a delete action
    SkippedNoDeleteOption,

    /// Delete chosen but nothing to confirm with
    SkippedNoConfirm,

    /// A host interaction failed part way through
    Errored(String),
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            DeleteOutcome::SkippedNoMenu
                | DeleteOutcome::SkippedNoDeleteOption
                | DeleteOutcome::SkippedNoConfirm
        )
    }

    /// Stable label, used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteOutcome::Deleted => "deleted",
            DeleteOutcome::SkippedNoMenu => "skipped_no_menu",
            DeleteOutcome::SkippedNoDeleteOption => "skipped_no_delete_option",
            DeleteOutcome::SkippedNoConfirm => "skipped_no_confirm",
            DeleteOutcome::Errored(_) => "errored",
        }
    }
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteOutcome::Errored(reason) => write!(f, "errored: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Steps of the delete flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStep {
    LocateMenu,
    OpenMenu,
    LocateDelete,
    ChooseDelete,
    LocateConfirm,
    Confirm,
}

impl DeleteStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteStep::LocateMenu => "locate_menu",
            DeleteStep::OpenMenu => "open_menu",
            DeleteStep::LocateDelete => "locate_delete",
            DeleteStep::ChooseDelete => "choose_delete",
            DeleteStep::LocateConfirm => "locate_confirm",
            DeleteStep::Confirm => "confirm",
        }
    }
}

impl fmt::Display for DeleteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_reason() {
        let json = serde_json::to_value(DeleteOutcome::Errored("boom".into())).unwrap();
        assert_eq!(json["outcome"], "errored");
        assert_eq!(json["reason"], "boom");

        let json = serde_json::to_value(DeleteOutcome::SkippedNoConfirm).unwrap();
        assert_eq!(json["outcome"], "skipped_no_confirm");
    }

    #[test]
    fn only_skips_are_skipped() {
        assert!(DeleteOutcome::SkippedNoMenu.is_skipped());
        assert!(!DeleteOutcome::Deleted.is_skipped());
        assert!(!DeleteOutcome::Errored("x".into()).is_skipped());
        assert!(DeleteOutcome::Deleted.is_deleted());
    }
}
