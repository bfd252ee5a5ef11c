//! Matching of localized "delete" labels.

use regex::Regex;

use crate::errors::ActionError;

/// Labels recognized when no site configuration overrides them.
pub const DEFAULT_DELETE_LABELS: &[&str] = &["delete", "মুছে"];

/// Case-insensitive substring matcher over a list of delete labels.
#[derive(Clone, Debug)]
pub struct DeleteIntent {
    pattern: Regex,
}

impl DeleteIntent {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Result<Self, ActionError> {
        let alternation: Vec<String> = labels
            .iter()
            .map(|label| label.as_ref().trim())
            .filter(|label| !label.is_empty())
            .map(regex::escape)
            .collect();
        if alternation.is_empty() {
            return Err(ActionError::Internal(
                "at least one delete label is required".to_string(),
            ));
        }
        let pattern = Regex::new(&format!("(?i)(?:{})", alternation.join("|")))
            .map_err(|err| ActionError::Internal(format!("invalid delete label pattern: {err}")))?;
        Ok(Self { pattern })
    }

    pub fn with_defaults() -> Result<Self, ActionError> {
        Self::new(DEFAULT_DELETE_LABELS)
    }

    pub fn matches(&self, label: &str) -> bool {
        self.pattern.is_match(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_default_labels() {
        let intent = DeleteIntent::with_defaults().unwrap();
        assert!(intent.matches("Delete"));
        assert!(intent.matches("DELETE post"));
        assert!(intent.matches("পোস্ট মুছে ফেলুন"));
        assert!(!intent.matches("Pin to your profile"));
        assert!(!intent.matches(""));
    }

    #[test]
    fn escapes_metacharacters() {
        let intent = DeleteIntent::new(&["remove (forever)"]).unwrap();
        assert!(intent.matches("Remove (forever)"));
        assert!(!intent.matches("remove forever"));
    }

    #[test]
    fn rejects_empty_label_list() {
        assert!(DeleteIntent::new::<&str>(&[]).is_err());
        assert!(DeleteIntent::new(&["  "]).is_err());
    }
}
