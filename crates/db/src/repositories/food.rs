use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use foodlog_core::collab::FoodDatabase;
use foodlog_core::domain::food::{FoodCandidate, FoodId, MacroProfile};
use foodlog_core::errors::AgentError;

use super::RepositoryError;
use crate::DbPool;

const SEARCH_LIMIT: i64 = 5;

pub struct SqlFoodRepository {
    pool: DbPool,
}

impl SqlFoodRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Ranked substring search: exact name first, then prefix matches, then
    /// the rest, shortest names winning within a tier.
    pub async fn search_ranked(&self, name: &str) -> Result<Vec<FoodCandidate>, RepositoryError> {
        let needle = name.trim();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{needle}%");

        let rows = sqlx::query(
            "SELECT id, name, calories, protein, carbs, fat FROM food_items \
             WHERE name LIKE ?1 \
             ORDER BY CASE \
                 WHEN lower(name) = lower(?2) THEN 0 \
                 WHEN lower(name) LIKE lower(?2) || '%' THEN 1 \
                 ELSE 2 END, \
                 length(name) ASC, id ASC \
             LIMIT ?3",
        )
        .bind(&pattern)
        .bind(needle)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(candidate_from_row).collect()
    }

    pub async fn fetch_by_id(&self, id: FoodId) -> Result<Option<FoodCandidate>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, calories, protein, carbs, fat FROM food_items WHERE id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(candidate_from_row).transpose()
    }
}

fn candidate_from_row(row: &SqliteRow) -> Result<FoodCandidate, RepositoryError> {
    let get = |column: &str| -> Result<f64, RepositoryError> {
        row.try_get::<f64, _>(column)
            .map_err(|err| RepositoryError::Decode(format!("food_items.{column}: {err}")))
    };

    Ok(FoodCandidate {
        id: FoodId(
            row.try_get::<i64, _>("id")
                .map_err(|err| RepositoryError::Decode(format!("food_items.id: {err}")))?,
        ),
        name: row
            .try_get::<String, _>("name")
            .map_err(|err| RepositoryError::Decode(format!("food_items.name: {err}")))?,
        macros: MacroProfile {
            calories: get("calories")?,
            protein: get("protein")?,
            carbs: get("carbs")?,
            fat: get("fat")?,
        },
    })
}

#[async_trait]
impl FoodDatabase for SqlFoodRepository {
    async fn search(&self, name: &str) -> Result<Vec<FoodCandidate>, AgentError> {
        self.search_ranked(name).await.map_err(|err| AgentError::Lookup(err.to_string()))
    }

    async fn find_by_id(&self, id: FoodId) -> Result<Option<FoodCandidate>, AgentError> {
        self.fetch_by_id(id).await.map_err(|err| AgentError::Lookup(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use foodlog_core::collab::FoodDatabase;
    use foodlog_core::domain::food::FoodId;

    use crate::{connect, migrations};

    use super::SqlFoodRepository;

    async fn repo_with_foods() -> SqlFoodRepository {
        let pool = connect("sqlite::memory:").await.expect("in-memory pool");
        migrations::run_pending(&pool).await.expect("migrations");

        for (id, name) in [
            (1, "Chicken breast, cooked"),
            (2, "Chicken breast, raw"),
            (3, "Chicken thigh, cooked"),
            (4, "Apple"),
        ] {
            sqlx::query(
                "INSERT INTO food_items (id, name, calories, protein, carbs, fat) \
                 VALUES (?1, ?2, 100, 10, 5, 2)",
            )
            .bind(id)
            .bind(name)
            .execute(&pool)
            .await
            .expect("seed row");
        }

        SqlFoodRepository::new(pool)
    }

    #[tokio::test]
    async fn search_ranks_exact_and_prefix_matches_first() {
        let repo = repo_with_foods().await;
        let results = repo.search("chicken breast").await.expect("search");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Chicken breast, raw");

        let exact = repo.search("Apple").await.expect("search");
        assert_eq!(exact[0].id, FoodId(4));
    }

    #[tokio::test]
    async fn empty_result_set_is_ok_not_error() {
        let repo = repo_with_foods().await;
        let results = repo.search("unicorn steak").await.expect("search");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn blank_query_short_circuits() {
        let repo = repo_with_foods().await;
        let results = repo.search("   ").await.expect("search");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn find_by_id_round_trips_macros() {
        let repo = repo_with_foods().await;
        let found = repo.find_by_id(FoodId(1)).await.expect("lookup").expect("row exists");
        assert_eq!(found.name, "Chicken breast, cooked");
        assert_eq!(found.macros.calories, 100.0);

        let missing = repo.find_by_id(FoodId(99)).await.expect("lookup");
        assert!(missing.is_none());
    }
}
