use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use foodlog_core::collab::CheckpointStore;
use foodlog_core::errors::AgentError;
use foodlog_core::state::SessionState;

use super::RepositoryError;
use crate::DbPool;

/// Durable per-thread session state, stored as a JSON document so the state
/// shape can evolve without schema migrations.
pub struct SqlCheckpointStore {
    pool: DbPool,
}

impl SqlCheckpointStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn read(&self, thread_id: &str) -> Result<Option<SessionState>, RepositoryError> {
        let row = sqlx::query("SELECT state FROM checkpoints WHERE thread_id = ?1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row
            .try_get("state")
            .map_err(|err| RepositoryError::Decode(format!("checkpoints.state: {err}")))?;
        let state = serde_json::from_str(&raw).map_err(|err| {
            RepositoryError::Decode(format!("checkpoint for `{thread_id}` is corrupt: {err}"))
        })?;

        Ok(Some(state))
    }

    pub async fn write(&self, state: &SessionState) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(state)
            .map_err(|err| RepositoryError::Decode(format!("serialize checkpoint: {err}")))?;

        sqlx::query(
            "INSERT INTO checkpoints (thread_id, state, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(thread_id) DO UPDATE SET \
                 state = excluded.state, updated_at = excluded.updated_at",
        )
        .bind(&state.thread_id)
        .bind(&raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SqlCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<SessionState>, AgentError> {
        self.read(thread_id).await.map_err(|err| AgentError::Persistence(err.to_string()))
    }

    async fn save(&self, state: &SessionState) -> Result<(), AgentError> {
        self.write(state).await.map_err(|err| AgentError::Persistence(err.to_string()))
    }
}
