pub mod collab;
pub mod config;
pub mod domain;
pub mod errors;
pub mod routing;
pub mod state;

pub use collab::{CheckpointStore, FoodDatabase, NutritionLog};
pub use domain::food::{FoodCandidate, FoodId, MacroProfile};
pub use domain::intake::{FoodIntakeEvent, FoodIntakeItem, Unit, UserIntent};
pub use domain::log::{LogEntry, MacroTotals, NewLogEntry};
pub use domain::selection::{FoodSelectionResult, SelectionStatus};
pub use errors::AgentError;
pub use routing::{route_after_calculate, route_after_parse, route_after_selection};
pub use routing::{GateDecision, NodeId};
pub use state::{ChatMessage, ItemOutcome, ProcessedItem, Role, SessionState};
