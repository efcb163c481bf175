use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use foodlog_core::collab::{CheckpointStore, FoodDatabase, NutritionLog};
use foodlog_core::domain::food::{FoodCandidate, FoodId};
use foodlog_core::domain::log::{LogEntry, MacroTotals, NewLogEntry};
use foodlog_core::errors::AgentError;
use foodlog_core::state::SessionState;

/// In-memory food table for tests. Ranking mirrors the SQL repository:
/// exact match, then prefix, then substring, shortest name first.
#[derive(Default)]
pub struct InMemoryFoodDatabase {
    foods: Vec<FoodCandidate>,
}

impl InMemoryFoodDatabase {
    pub fn with_foods(foods: Vec<FoodCandidate>) -> Self {
        Self { foods }
    }
}

#[async_trait]
impl FoodDatabase for InMemoryFoodDatabase {
    async fn search(&self, name: &str) -> Result<Vec<FoodCandidate>, AgentError> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<&FoodCandidate> = self
            .foods
            .iter()
            .filter(|candidate| candidate.name.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by_key(|candidate| {
            let lowered = candidate.name.to_lowercase();
            let tier = if lowered == needle {
                0
            } else if lowered.starts_with(&needle) {
                1
            } else {
                2
            };
            (tier, candidate.name.len())
        });

        Ok(hits.into_iter().take(5).cloned().collect())
    }

    async fn find_by_id(&self, id: FoodId) -> Result<Option<FoodCandidate>, AgentError> {
        Ok(self.foods.iter().find(|candidate| candidate.id == id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryNutritionLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryNutritionLog {
    pub async fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl NutritionLog for InMemoryNutritionLog {
    async fn create_log_entry(&self, entry: NewLogEntry) -> Result<LogEntry, AgentError> {
        let mut entries = self.entries.write().await;
        let written = LogEntry {
            id: entries.len() as i64 + 1,
            food_id: entry.food_id,
            amount_g: entry.amount_g,
            macros: entry.macros,
            consumed_at: entry.consumed_at,
            meal_type: entry.meal_type,
            original_text: entry.original_text,
            created_at: Utc::now(),
        };
        entries.push(written.clone());
        Ok(written)
    }

    async fn logs_by_date(&self, date: NaiveDate) -> Result<Vec<LogEntry>, AgentError> {
        let entries = self.entries.read().await;
        let mut logs: Vec<LogEntry> = entries
            .iter()
            .filter(|entry| entry.consumed_at.date_naive() == date)
            .cloned()
            .collect();
        logs.sort_by_key(|entry| entry.consumed_at);
        Ok(logs)
    }

    async fn logs_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, AgentError> {
        let entries = self.entries.read().await;
        let mut logs: Vec<LogEntry> = entries
            .iter()
            .filter(|entry| {
                let date = entry.consumed_at.date_naive();
                date >= start && date <= end
            })
            .cloned()
            .collect();
        logs.sort_by_key(|entry| entry.consumed_at);
        Ok(logs)
    }

    async fn daily_totals(&self, date: NaiveDate) -> Result<MacroTotals, AgentError> {
        let mut totals = MacroTotals::default();
        for entry in self.logs_by_date(date).await? {
            totals.add(&entry.macros);
        }
        Ok(totals)
    }
}

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    states: RwLock<HashMap<String, SessionState>>,
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<SessionState>, AgentError> {
        let states = self.states.read().await;
        Ok(states.get(thread_id).cloned())
    }

    async fn save(&self, state: &SessionState) -> Result<(), AgentError> {
        let mut states = self.states.write().await;
        states.insert(state.thread_id.clone(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use foodlog_core::collab::{CheckpointStore, FoodDatabase, NutritionLog};
    use foodlog_core::domain::food::{FoodCandidate, FoodId, MacroProfile};
    use foodlog_core::domain::log::NewLogEntry;
    use foodlog_core::state::SessionState;

    use super::{InMemoryCheckpointStore, InMemoryFoodDatabase, InMemoryNutritionLog};

    fn foods() -> Vec<FoodCandidate> {
        vec![
            FoodCandidate {
                id: FoodId(1),
                name: "Chicken breast, cooked".to_string(),
                macros: MacroProfile::new(165.0, 31.0, 0.0, 3.6),
            },
            FoodCandidate {
                id: FoodId(2),
                name: "Apple".to_string(),
                macros: MacroProfile::new(52.0, 0.3, 14.0, 0.2),
            },
        ]
    }

    #[tokio::test]
    async fn search_matches_case_insensitively() {
        let db = InMemoryFoodDatabase::with_foods(foods());
        let hits = db.search("CHICKEN").await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, FoodId(1));

        let none = db.search("unicorn").await.expect("search");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn log_round_trip_and_totals() {
        let log = InMemoryNutritionLog::default();
        log.create_log_entry(NewLogEntry {
            food_id: Some(FoodId(2)),
            amount_g: 150.0,
            macros: MacroProfile::new(78.0, 0.45, 21.0, 0.3),
            consumed_at: Utc
                .with_ymd_and_hms(2026, 8, 7, 8, 0, 0)
                .single()
                .expect("valid timestamp"),
            meal_type: Some("breakfast".to_string()),
            original_text: None,
        })
        .await
        .expect("write");

        let date = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");
        let totals = log.daily_totals(date).await.expect("totals");
        assert_eq!(totals.calories, 78.0);

        let other = NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date");
        assert_eq!(log.daily_totals(other).await.expect("totals").calories, 0.0);
    }

    #[tokio::test]
    async fn checkpoint_round_trip() {
        let store = InMemoryCheckpointStore::default();
        let state = SessionState::new(
            "t-mem",
            NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date"),
        );

        store.save(&state).await.expect("save");
        let loaded = store.load("t-mem").await.expect("load");
        assert_eq!(loaded, Some(state));
        assert!(store.load("other").await.expect("load").is_none());
    }
}
