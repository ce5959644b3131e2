//! Results of orchestrator transitions.
//!
//! Invalid requests are absorbed: the session is left untouched and the
//! reason is reported back instead of raised.

use serde::Serialize;

/// Why a transition left the session unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    #[error("no usable flow source")]
    InvalidSource,

    #[error("no failed nodes marked")]
    EmptyFailureSet,

    #[error("graph has nothing to run chaos against")]
    DegenerateGraph,

    #[error("chaos tick belongs to a stopped or replaced run")]
    StaleTimer,

    #[error("operation does not apply to the active mode")]
    WrongMode,

    #[error("node is not an architecture node in the current graph")]
    UnknownNode,

    #[error("nothing to pause, resume or step")]
    NothingToResume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum TransitionOutcome {
    Applied,
    Ignored(NoOpReason),
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied)
    }

    pub fn reason(&self) -> Option<NoOpReason> {
        match self {
            TransitionOutcome::Applied => None,
            TransitionOutcome::Ignored(reason) => Some(*reason),
        }
    }
}

impl From<Result<(), NoOpReason>> for TransitionOutcome {
    fn from(result: Result<(), NoOpReason>) -> Self {
        match result {
            Ok(()) => TransitionOutcome::Applied,
            Err(reason) => TransitionOutcome::Ignored(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        assert!(TransitionOutcome::from(Ok(())).is_applied());
        let ignored = TransitionOutcome::from(Err(NoOpReason::StaleTimer));
        assert_eq!(ignored.reason(), Some(NoOpReason::StaleTimer));
    }

    #[test]
    fn test_outcome_serializes_with_reason() {
        let json = serde_json::to_value(TransitionOutcome::Ignored(NoOpReason::EmptyFailureSet))
            .unwrap();
        assert_eq!(json["status"], "ignored");
        assert_eq!(json["reason"], "empty_failure_set");
    }
}
