//! Workflow engine for the foodlog conversational agent.
//!
//! This crate turns free-text food descriptions into persisted log entries
//! by stepping a directed graph of processing nodes over a single shared
//! session state:
//!
//! 1. **Input parsing** (`nodes::input_parser`) - LLM decomposes the message
//!    into grams-normalized food items or classifies the turn.
//! 2. **Resolution loop** (`nodes::{food_search, agent_selection}`) - each
//!    pending item is searched against the food database and matched, or
//!    estimated when the database has nothing.
//! 3. **Confirmation gate** - estimated items suspend the graph and wait for
//!    an explicit user go-ahead before anything is written.
//! 4. **Logging** (`nodes::calculate_log`) - exactly one scaled write per
//!    resolved item, totals refreshed read-after-write.
//!
//! Routing lives in `foodlog-core::routing` as pure functions; this crate
//! supplies the node bodies, the LLM collaborator (`llm`), and the turn
//! loop with its checkpoint discipline (`engine`).
//!
//! # Safety principle
//!
//! The LLM is strictly a translator. It never routes the graph, never
//! writes data, and its structured outputs are validated against the
//! candidate set before they can influence a log entry.

pub mod engine;
pub mod llm;
pub mod nodes;

pub use engine::{TurnOutcome, Workflow};
pub use llm::{HttpLlmClient, LlmClient, LlmError};
