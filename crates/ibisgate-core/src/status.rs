//! Record lifecycle

use serde::{Deserialize, Serialize};

/// Position of a record in the processing pipeline.
///
/// Transitions are strictly sequential:
/// `Unclassified -> Classified -> Resolved -> Validated -> Finalized`,
/// with any stage able to move the record to `Rejected` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Unclassified,
    Classified,
    Resolved,
    Validated,
    Finalized,
    Rejected,
}

impl RecordStatus {
    /// Terminal states end processing
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Rejected)
    }

    /// The state a successful stage leads to
    pub fn advance(self) -> Self {
        match self {
            Self::Unclassified => Self::Classified,
            Self::Classified => Self::Resolved,
            Self::Resolved => Self::Validated,
            Self::Validated => Self::Finalized,
            terminal => terminal,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unclassified => "unclassified",
            Self::Classified => "classified",
            Self::Resolved => "resolved",
            Self::Validated => "validated",
            Self::Finalized => "finalized",
            Self::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Pipeline stage that can reject a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolve,
    Validate,
    Finalize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve => write!(f, "resolve"),
            Self::Validate => write!(f, "validate"),
            Self::Finalize => write!(f, "finalize"),
        }
    }
}
