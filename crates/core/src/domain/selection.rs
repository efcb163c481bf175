use serde::{Deserialize, Serialize};

use crate::domain::food::{FoodCandidate, FoodId, MacroProfile};
use crate::errors::AgentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionStatus {
    /// A database candidate was chosen.
    Selected,
    /// Candidates existed but none fit the described food.
    NoMatch,
    /// No candidates; macros were estimated by the collaborator.
    Estimated,
}

/// Structured output of the selection collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodSelectionResult {
    pub status: SelectionStatus,
    /// Present iff status is `Selected`.
    #[serde(default)]
    pub food_id: Option<FoodId>,
    /// Reasoning for the decision, for transparency in replies.
    #[serde(default)]
    pub confidence: Option<String>,
    /// Per-100g estimate, present iff status is `Estimated`.
    #[serde(default)]
    pub estimated: Option<MacroProfile>,
}

impl FoodSelectionResult {
    pub fn selected(food_id: FoodId, confidence: impl Into<String>) -> Self {
        Self {
            status: SelectionStatus::Selected,
            food_id: Some(food_id),
            confidence: Some(confidence.into()),
            estimated: None,
        }
    }

    pub fn no_match(confidence: impl Into<String>) -> Self {
        Self {
            status: SelectionStatus::NoMatch,
            food_id: None,
            confidence: Some(confidence.into()),
            estimated: None,
        }
    }

    pub fn estimated(macros: MacroProfile, confidence: impl Into<String>) -> Self {
        Self {
            status: SelectionStatus::Estimated,
            food_id: None,
            confidence: Some(confidence.into()),
            estimated: Some(macros),
        }
    }

    /// Enforce the selection contract against the candidate set the
    /// collaborator was shown.
    ///
    /// Non-empty candidates admit only `Selected` (with a `food_id` from the
    /// set) or `NoMatch`. Empty candidates admit only `Estimated` with all
    /// macro fields populated. Anything else is a contract violation and
    /// must not reach the log writer.
    pub fn validate(&self, candidates: &[FoodCandidate]) -> Result<(), AgentError> {
        match self.status {
            SelectionStatus::Selected => {
                let Some(food_id) = self.food_id else {
                    return Err(AgentError::SelectionInvalid(
                        "SELECTED result is missing food_id".to_string(),
                    ));
                };
                if candidates.is_empty() {
                    return Err(AgentError::SelectionInvalid(
                        "SELECTED returned with no search results".to_string(),
                    ));
                }
                if !candidates.iter().any(|candidate| candidate.id == food_id) {
                    return Err(AgentError::SelectionInvalid(format!(
                        "food_id {} is not among the offered candidates",
                        food_id.0
                    )));
                }
                Ok(())
            }
            SelectionStatus::NoMatch => {
                if candidates.is_empty() {
                    return Err(AgentError::SelectionInvalid(
                        "NO_MATCH returned with no search results; expected ESTIMATED".to_string(),
                    ));
                }
                Ok(())
            }
            SelectionStatus::Estimated => {
                if !candidates.is_empty() {
                    return Err(AgentError::SelectionInvalid(
                        "ESTIMATED returned despite available search results".to_string(),
                    ));
                }
                if self.estimated.is_none() {
                    return Err(AgentError::SelectionInvalid(
                        "ESTIMATED result is missing macro estimates".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}
