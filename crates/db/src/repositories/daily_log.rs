use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use foodlog_core::collab::NutritionLog;
use foodlog_core::domain::food::{FoodId, MacroProfile};
use foodlog_core::domain::log::{LogEntry, MacroTotals, NewLogEntry};
use foodlog_core::errors::AgentError;

use super::RepositoryError;
use crate::DbPool;

pub struct SqlNutritionLog {
    pool: DbPool,
}

impl SqlNutritionLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: NewLogEntry) -> Result<LogEntry, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO daily_logs \
             (food_id, amount_g, calories, protein, carbs, fat, consumed_at, meal_type, original_text, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(entry.food_id.map(|id| id.0))
        .bind(entry.amount_g)
        .bind(entry.macros.calories)
        .bind(entry.macros.protein)
        .bind(entry.macros.carbs)
        .bind(entry.macros.fat)
        .bind(entry.consumed_at)
        .bind(&entry.meal_type)
        .bind(&entry.original_text)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(LogEntry {
            id: result.last_insert_rowid(),
            food_id: entry.food_id,
            amount_g: entry.amount_g,
            macros: entry.macros,
            consumed_at: entry.consumed_at,
            meal_type: entry.meal_type,
            original_text: entry.original_text,
            created_at,
        })
    }

    pub async fn fetch_by_date(&self, date: NaiveDate) -> Result<Vec<LogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, food_id, amount_g, calories, protein, carbs, fat, \
                    consumed_at, meal_type, original_text, created_at \
             FROM daily_logs WHERE date(consumed_at) = ?1 ORDER BY consumed_at ASC",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn fetch_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, food_id, amount_g, calories, protein, carbs, fat, \
                    consumed_at, meal_type, original_text, created_at \
             FROM daily_logs WHERE date(consumed_at) >= ?1 AND date(consumed_at) <= ?2 \
             ORDER BY consumed_at ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn totals_for_date(&self, date: NaiveDate) -> Result<MacroTotals, RepositoryError> {
        let (calories, protein, carbs, fat): (f64, f64, f64, f64) = sqlx::query_as(
            "SELECT COALESCE(SUM(calories), 0.0), COALESCE(SUM(protein), 0.0), \
                    COALESCE(SUM(carbs), 0.0), COALESCE(SUM(fat), 0.0) \
             FROM daily_logs WHERE date(consumed_at) = ?1",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(MacroTotals { calories, protein, carbs, fat })
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<LogEntry, RepositoryError> {
    let decode = |column: &str, err: sqlx::Error| {
        RepositoryError::Decode(format!("daily_logs.{column}: {err}"))
    };

    Ok(LogEntry {
        id: row.try_get::<i64, _>("id").map_err(|err| decode("id", err))?,
        food_id: row
            .try_get::<Option<i64>, _>("food_id")
            .map_err(|err| decode("food_id", err))?
            .map(FoodId),
        amount_g: row.try_get::<f64, _>("amount_g").map_err(|err| decode("amount_g", err))?,
        macros: MacroProfile {
            calories: row.try_get::<f64, _>("calories").map_err(|err| decode("calories", err))?,
            protein: row.try_get::<f64, _>("protein").map_err(|err| decode("protein", err))?,
            carbs: row.try_get::<f64, _>("carbs").map_err(|err| decode("carbs", err))?,
            fat: row.try_get::<f64, _>("fat").map_err(|err| decode("fat", err))?,
        },
        consumed_at: row
            .try_get::<DateTime<Utc>, _>("consumed_at")
            .map_err(|err| decode("consumed_at", err))?,
        meal_type: row
            .try_get::<Option<String>, _>("meal_type")
            .map_err(|err| decode("meal_type", err))?,
        original_text: row
            .try_get::<Option<String>, _>("original_text")
            .map_err(|err| decode("original_text", err))?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|err| decode("created_at", err))?,
    })
}

#[async_trait]
impl NutritionLog for SqlNutritionLog {
    async fn create_log_entry(&self, entry: NewLogEntry) -> Result<LogEntry, AgentError> {
        self.insert(entry).await.map_err(|err| AgentError::Persistence(err.to_string()))
    }

    async fn logs_by_date(&self, date: NaiveDate) -> Result<Vec<LogEntry>, AgentError> {
        self.fetch_by_date(date).await.map_err(|err| AgentError::Persistence(err.to_string()))
    }

    async fn logs_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, AgentError> {
        self.fetch_by_date_range(start, end)
            .await
            .map_err(|err| AgentError::Persistence(err.to_string()))
    }

    async fn daily_totals(&self, date: NaiveDate) -> Result<MacroTotals, AgentError> {
        self.totals_for_date(date).await.map_err(|err| AgentError::Persistence(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use foodlog_core::domain::food::{FoodId, MacroProfile};
    use foodlog_core::domain::log::NewLogEntry;

    use crate::{connect, migrations};

    use super::SqlNutritionLog;

    async fn log_store() -> SqlNutritionLog {
        let pool = connect("sqlite::memory:").await.expect("in-memory pool");
        migrations::run_pending(&pool).await.expect("migrations");
        sqlx::query(
            "INSERT INTO food_items (id, name, calories, protein, carbs, fat) \
             VALUES (1, 'Apple', 52, 0.3, 14, 0.2)",
        )
        .execute(&pool)
        .await
        .expect("seed food");
        SqlNutritionLog::new(pool)
    }

    fn entry_on(day: u32, calories: f64) -> NewLogEntry {
        NewLogEntry {
            food_id: Some(FoodId(1)),
            amount_g: 150.0,
            macros: MacroProfile { calories, protein: 0.45, carbs: 21.0, fat: 0.3 },
            consumed_at: Utc
                .with_ymd_and_hms(2026, 8, day, 12, 30, 0)
                .single()
                .expect("valid timestamp"),
            meal_type: Some("lunch".to_string()),
            original_text: Some("an apple".to_string()),
        }
    }

    #[tokio::test]
    async fn insert_and_read_back_by_date() {
        let store = log_store().await;
        let written = store.insert(entry_on(7, 78.0)).await.expect("insert");
        assert!(written.id > 0);

        let date = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");
        let logs = store.fetch_by_date(date).await.expect("fetch");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].food_id, Some(FoodId(1)));
        assert_eq!(logs[0].macros.calories, 78.0);
        assert_eq!(logs[0].meal_type.as_deref(), Some("lunch"));
    }

    #[tokio::test]
    async fn estimated_entries_persist_without_food_id() {
        let store = log_store().await;
        let mut entry = entry_on(7, 250.0);
        entry.food_id = None;
        let written = store.insert(entry).await.expect("insert");
        assert!(written.food_id.is_none());

        let date = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");
        let logs = store.fetch_by_date(date).await.expect("fetch");
        assert!(logs[0].food_id.is_none());
    }

    #[tokio::test]
    async fn totals_aggregate_only_the_requested_date() {
        let store = log_store().await;
        store.insert(entry_on(6, 100.0)).await.expect("insert");
        store.insert(entry_on(7, 78.0)).await.expect("insert");
        store.insert(entry_on(7, 22.0)).await.expect("insert");

        let date = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");
        let totals = store.totals_for_date(date).await.expect("totals");
        assert_eq!(totals.calories, 100.0);
        assert_eq!(totals.carbs, 42.0);
    }

    #[tokio::test]
    async fn totals_default_to_zero_for_an_empty_date() {
        let store = log_store().await;
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
        let totals = store.totals_for_date(date).await.expect("totals");
        assert_eq!(totals.calories, 0.0);
    }

    #[tokio::test]
    async fn range_query_is_inclusive_and_ordered() {
        let store = log_store().await;
        store.insert(entry_on(5, 10.0)).await.expect("insert");
        store.insert(entry_on(6, 20.0)).await.expect("insert");
        store.insert(entry_on(7, 30.0)).await.expect("insert");

        let start = NaiveDate::from_ymd_opt(2026, 8, 5).expect("valid date");
        let end = NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date");
        let logs = store.fetch_by_date_range(start, end).await.expect("fetch");

        assert_eq!(logs.len(), 2);
        assert!(logs[0].consumed_at < logs[1].consumed_at);
    }
}
