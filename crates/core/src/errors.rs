use thiserror::Error;

/// Failure taxonomy for a single turn of the workflow.
///
/// Parsing and selection failures are never retried within a turn; lookup
/// and persistence failures are retried by the collaborator wrappers before
/// they surface here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("could not parse user input: {0}")]
    ParsingFailed(String),
    #[error("selection output violated its contract: {0}")]
    SelectionInvalid(String),
    #[error("food database lookup failed: {0}")]
    Lookup(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl AgentError {
    /// A safe, user-facing apology for each failure class. Internal detail
    /// stays in logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ParsingFailed(_) => {
                "Sorry, I couldn't make sense of that. Could you rephrase what you ate?"
            }
            Self::SelectionInvalid(_) => {
                "Sorry, I couldn't confidently match that food. Nothing was logged - please try describing it differently."
            }
            Self::Lookup(_) => {
                "The food database is temporarily unreachable. Nothing was logged - please try again shortly."
            }
            Self::Persistence(_) => "I couldn't save that entry. Please try again shortly.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AgentError;

    #[test]
    fn user_messages_never_leak_internal_detail() {
        let error = AgentError::Persistence("daily_logs UNIQUE constraint".to_string());
        assert!(!error.user_message().contains("UNIQUE"));

        let error = AgentError::ParsingFailed("missing field `action`".to_string());
        assert!(!error.user_message().contains("field"));
    }

    #[test]
    fn display_keeps_internal_detail_for_logs() {
        let error = AgentError::Lookup("connection refused".to_string());
        assert!(error.to_string().contains("connection refused"));
    }
}
