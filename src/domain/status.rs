use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review state shared by teacher requests and classes.
///
/// `Pending` is the only state a new document is created in. Both decisions
/// are terminal: the only transition out of them is re-applying the same
/// decision, which is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Accepted => "accepted",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    pub fn can_transition_to(&self, next: ApprovalStatus) -> bool {
        match self {
            ApprovalStatus::Pending => true,
            decided => *decided == next,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "accepted" => Ok(ApprovalStatus::Accepted),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(WorkflowError::validation(format!(
                "Unknown status '{other}', expected one of pending, accepted, rejected"
            ))),
        }
    }
}
