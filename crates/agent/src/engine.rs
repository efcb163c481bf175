use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use foodlog_core::collab::{CheckpointStore, FoodDatabase, NutritionLog};
use foodlog_core::errors::AgentError;
use foodlog_core::routing::{
    route_after_calculate, route_after_parse, route_after_selection, GateDecision, NodeId,
};
use foodlog_core::state::{ChatMessage, SessionState};

use crate::llm::LlmClient;
use crate::nodes;

/// What a completed turn hands back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub awaiting_confirmation: bool,
}

/// The assembled workflow graph: nodes, routers, and the checkpoint
/// discipline, wired over injectable collaborators.
///
/// One logical thread of control per conversation: turns for the same
/// thread id are serialized behind a per-thread lock, while distinct
/// conversations proceed concurrently. State is persisted at every
/// suspension point - the end of a turn and the confirmation gate.
pub struct Workflow {
    llm: Arc<dyn LlmClient>,
    food_db: Arc<dyn FoodDatabase>,
    nutrition_log: Arc<dyn NutritionLog>,
    checkpoints: Arc<dyn CheckpointStore>,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Workflow {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        food_db: Arc<dyn FoodDatabase>,
        nutrition_log: Arc<dyn NutritionLog>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self { llm, food_db, nutrition_log, checkpoints, thread_locks: Mutex::new(HashMap::new()) }
    }

    /// Run one full turn for a conversation: rehydrate state, step the graph
    /// until it reaches the terminal node or suspends at the gate, persist,
    /// and reply.
    ///
    /// Node failures do not lose completed work: the in-flight item returns
    /// to the front of the queue, everything already written stays written,
    /// and the user gets an apology instead of a partial log.
    pub async fn handle_message(
        &self,
        thread_id: &str,
        message: &str,
    ) -> Result<TurnOutcome, AgentError> {
        let lock = self.thread_lock(thread_id).await;
        let _turn_guard = lock.lock().await;

        let today = Utc::now().date_naive();
        let mut state = match self.checkpoints.load(thread_id).await? {
            Some(state) => state,
            None => SessionState::new(thread_id, today),
        };
        state.messages.push(ChatMessage::user(message));
        state.response_text = None;

        if let Err(error) = self.run_turn(&mut state, message, today).await {
            warn!(
                event_name = "workflow.turn_failed",
                thread_id = %thread_id,
                error = %error,
                "turn failed; restoring work queue and apologizing"
            );
            state.requeue_current();
            state.awaiting_confirmation = false;
            let apology = error.user_message().to_string();
            state.messages.push(ChatMessage::assistant(apology.clone()));
            state.response_text = Some(apology);
        }

        self.checkpoints.save(&state).await?;

        Ok(TurnOutcome {
            reply: state.response_text.clone().unwrap_or_default(),
            awaiting_confirmation: state.awaiting_confirmation,
        })
    }

    async fn run_turn(
        &self,
        state: &mut SessionState,
        message: &str,
        today: NaiveDate,
    ) -> Result<(), AgentError> {
        nodes::input_parser(state, self.llm.as_ref(), message, today).await?;
        let intent = state.last_action.ok_or_else(|| {
            AgentError::ParsingFailed("parser finished without setting an intent".to_string())
        })?;

        let mut node = route_after_parse(intent, state);
        loop {
            info!(
                event_name = "workflow.node_entered",
                thread_id = %state.thread_id,
                node = ?node,
                pending = state.pending_food_items.len(),
            );

            node = match node {
                NodeId::InputParser => {
                    return Err(AgentError::SelectionInvalid(
                        "router looped back to the entry node".to_string(),
                    ));
                }
                NodeId::FoodSearch => {
                    nodes::food_search(state, self.food_db.as_ref()).await?;
                    NodeId::AgentSelection
                }
                NodeId::AgentSelection => {
                    nodes::agent_selection(state, self.llm.as_ref()).await?;
                    match route_after_selection(state)? {
                        GateDecision::Proceed => NodeId::CalculateLog,
                        GateDecision::Suspend => {
                            state.awaiting_confirmation = true;
                            info!(
                                event_name = "workflow.gate_suspended",
                                thread_id = %state.thread_id,
                                "estimated item parked for user confirmation"
                            );
                            NodeId::Respond
                        }
                    }
                }
                NodeId::CalculateLog => {
                    nodes::calculate_log(state, self.food_db.as_ref(), self.nutrition_log.as_ref())
                        .await?;
                    route_after_calculate(state)
                }
                NodeId::StatsLookup => {
                    nodes::stats_lookup(state, self.nutrition_log.as_ref()).await?;
                    NodeId::Respond
                }
                NodeId::Respond => {
                    nodes::respond(state, self.llm.as_ref()).await?;
                    break;
                }
            };
        }

        info!(
            event_name = "workflow.turn_completed",
            thread_id = %state.thread_id,
            awaiting_confirmation = state.awaiting_confirmation,
            processed = state.processing_results.len(),
        );
        Ok(())
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks.entry(thread_id.to_string()).or_default().clone()
    }
}
