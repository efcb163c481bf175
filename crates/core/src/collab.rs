use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::food::{FoodCandidate, FoodId};
use crate::domain::log::{LogEntry, MacroTotals, NewLogEntry};
use crate::errors::AgentError;
use crate::state::SessionState;

/// Ranked lookup over the food reference table. An empty result set is a
/// valid outcome and signals the estimation path, never an error.
#[async_trait]
pub trait FoodDatabase: Send + Sync {
    async fn search(&self, name: &str) -> Result<Vec<FoodCandidate>, AgentError>;
    async fn find_by_id(&self, id: FoodId) -> Result<Option<FoodCandidate>, AgentError>;
}

/// Persisted daily intake log. Idempotency of retried writes is the
/// caller's responsibility, not the store's.
#[async_trait]
pub trait NutritionLog: Send + Sync {
    async fn create_log_entry(&self, entry: NewLogEntry) -> Result<LogEntry, AgentError>;
    async fn logs_by_date(&self, date: NaiveDate) -> Result<Vec<LogEntry>, AgentError>;
    async fn logs_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, AgentError>;
    async fn daily_totals(&self, date: NaiveDate) -> Result<MacroTotals, AgentError>;
}

/// Durable session state keyed by conversation thread. Pluggable so tests
/// run against an in-memory store and production against SQLite.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<Option<SessionState>, AgentError>;
    async fn save(&self, state: &SessionState) -> Result<(), AgentError>;
}
