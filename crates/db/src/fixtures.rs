use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Names that must resolve through ranked search after seeding. Kept small
/// and stable so `foodlog seed` can verify its own work.
const VERIFIED_FOOD_NAMES: &[&str] =
    &["Chicken breast, cooked", "Apple", "Egg, whole, cooked", "Pasta, cooked", "Cheddar cheese"];

/// Deterministic food reference dataset loaded by the `seed` command.
pub struct SeedDataset;

#[derive(Debug)]
pub struct SeedResult {
    pub foods_seeded: i64,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl SeedDataset {
    /// SQL fixture content for the food reference table.
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_foods.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let (foods_seeded,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM food_items")
            .fetch_one(pool)
            .await?;

        Ok(SeedResult { foods_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for name in VERIFIED_FOOD_NAMES {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM food_items WHERE name = ?1")
                    .bind(name)
                    .fetch_one(pool)
                    .await?;
            checks.push((*name, count == 1));
        }

        let (macro_holes,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM food_items \
             WHERE calories < 0 OR protein < 0 OR carbs < 0 OR fat < 0",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("non-negative-macros", macro_holes == 0));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

#[cfg(test)]
mod tests {
    use crate::{connect, migrations};

    use super::SeedDataset;

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = connect("sqlite::memory:").await.expect("in-memory pool");
        migrations::run_pending(&pool).await.expect("migrations");

        let result = SeedDataset::load(&pool).await.expect("seed");
        assert!(result.foods_seeded >= 20);

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = connect("sqlite::memory:").await.expect("in-memory pool");
        migrations::run_pending(&pool).await.expect("migrations");

        let first = SeedDataset::load(&pool).await.expect("first seed");
        let second = SeedDataset::load(&pool).await.expect("second seed");
        assert_eq!(first.foods_seeded, second.foods_seeded);
    }
}
