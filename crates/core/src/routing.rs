use serde::{Deserialize, Serialize};

use crate::domain::intake::UserIntent;
use crate::domain::selection::SelectionStatus;
use crate::errors::AgentError;
use crate::state::SessionState;

/// Identifier of a processing node in the workflow graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeId {
    InputParser,
    FoodSearch,
    AgentSelection,
    CalculateLog,
    StatsLookup,
    Respond,
}

/// Outcome of the confirmation gate after agent selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Selection is final; proceed to the log writer.
    Proceed,
    /// Estimated item: suspend the graph, persist state, and ask the user
    /// before anything is written.
    Suspend,
}

/// Route after the input parser has classified the turn.
///
/// `ConfirmEstimation` resumes the suspended iteration only while a
/// selection result is actually parked at the gate; a stray "yes" with
/// nothing awaiting falls through to a plain reply.
pub fn route_after_parse(intent: UserIntent, state: &SessionState) -> NodeId {
    match intent {
        UserIntent::LogFood => NodeId::FoodSearch,
        UserIntent::QueryDailyStats => NodeId::StatsLookup,
        UserIntent::Chitchat => NodeId::Respond,
        UserIntent::ConfirmEstimation => {
            if state.current_item.is_some() && state.selection_result.is_some() {
                NodeId::CalculateLog
            } else {
                NodeId::Respond
            }
        }
    }
}

/// The HITL gate: decide whether the selected item may be written now.
///
/// A missing selection result here is a contract violation by the selection
/// node, not a routable state.
pub fn route_after_selection(state: &SessionState) -> Result<GateDecision, AgentError> {
    let Some(selection) = &state.selection_result else {
        return Err(AgentError::SelectionInvalid(
            "routing reached the gate without a selection result".to_string(),
        ));
    };

    match selection.status {
        SelectionStatus::Selected | SelectionStatus::NoMatch => Ok(GateDecision::Proceed),
        SelectionStatus::Estimated => Ok(GateDecision::Suspend),
    }
}

/// The multi-item loop controller: after a completed item, re-enter the
/// search cycle while work remains, otherwise finish the turn.
pub fn route_after_calculate(state: &SessionState) -> NodeId {
    if state.pending_food_items.is_empty() {
        NodeId::Respond
    } else {
        NodeId::FoodSearch
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::domain::food::{FoodId, MacroProfile};
    use crate::domain::intake::{FoodIntakeItem, Unit, UserIntent};
    use crate::domain::selection::{FoodSelectionResult, SelectionStatus};
    use crate::errors::AgentError;
    use crate::state::SessionState;

    use super::{route_after_calculate, route_after_parse, route_after_selection};
    use super::{GateDecision, NodeId};

    fn state() -> SessionState {
        SessionState::new("t-route", NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date"))
    }

    fn item(name: &str) -> FoodIntakeItem {
        FoodIntakeItem {
            food_name: name.to_string(),
            amount_g: 100.0,
            unit: Unit::Grams,
            original_text: name.to_string(),
        }
    }

    #[test]
    fn parse_routes_cover_every_intent() {
        let state = state();
        assert_eq!(route_after_parse(UserIntent::LogFood, &state), NodeId::FoodSearch);
        assert_eq!(route_after_parse(UserIntent::QueryDailyStats, &state), NodeId::StatsLookup);
        assert_eq!(route_after_parse(UserIntent::Chitchat, &state), NodeId::Respond);
    }

    #[test]
    fn confirmation_resumes_only_a_parked_selection() {
        let mut state = state();
        // Nothing parked: a stray confirmation is just a reply.
        assert_eq!(route_after_parse(UserIntent::ConfirmEstimation, &state), NodeId::Respond);

        state.current_item = Some(item("unicorn steak"));
        state.selection_result = Some(FoodSelectionResult::estimated(
            MacroProfile::new(250.0, 26.0, 0.0, 15.0),
            "estimated",
        ));
        assert_eq!(
            route_after_parse(UserIntent::ConfirmEstimation, &state),
            NodeId::CalculateLog
        );
    }

    #[test]
    fn gate_proceeds_for_selected_and_no_match() {
        let mut state = state();
        state.selection_result = Some(FoodSelectionResult::selected(FoodId(1), "sole candidate"));
        assert_eq!(route_after_selection(&state).expect("routable"), GateDecision::Proceed);

        state.selection_result = Some(FoodSelectionResult::no_match("nothing fits"));
        assert_eq!(route_after_selection(&state).expect("routable"), GateDecision::Proceed);
    }

    #[test]
    fn gate_suspends_for_estimated() {
        let mut state = state();
        state.selection_result = Some(FoodSelectionResult::estimated(
            MacroProfile::new(100.0, 1.0, 2.0, 3.0),
            "off-menu",
        ));
        assert_eq!(route_after_selection(&state).expect("routable"), GateDecision::Suspend);
    }

    #[test]
    fn gate_rejects_a_missing_selection_result() {
        let state = state();
        assert!(matches!(
            route_after_selection(&state),
            Err(AgentError::SelectionInvalid(_))
        ));
    }

    #[test]
    fn loop_controller_drains_then_finishes() {
        let mut state = state();
        state.pending_food_items.push_back(item("cheese"));
        assert_eq!(route_after_calculate(&state), NodeId::FoodSearch);

        state.pending_food_items.clear();
        assert_eq!(route_after_calculate(&state), NodeId::Respond);
    }

    #[test]
    fn selection_status_is_exhaustively_routed() {
        let mut state = state();
        for status in [
            SelectionStatus::Selected,
            SelectionStatus::NoMatch,
            SelectionStatus::Estimated,
        ] {
            state.selection_result = Some(FoodSelectionResult {
                status,
                food_id: Some(FoodId(1)),
                confidence: None,
                estimated: Some(MacroProfile::default()),
            });
            assert!(route_after_selection(&state).is_ok());
        }
    }
}
