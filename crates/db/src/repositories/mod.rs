use thiserror::Error;

pub mod checkpoint;
pub mod daily_log;
pub mod food;
pub mod memory;

pub use checkpoint::SqlCheckpointStore;
pub use daily_log::SqlNutritionLog;
pub use food::SqlFoodRepository;
pub use memory::{InMemoryCheckpointStore, InMemoryFoodDatabase, InMemoryNutritionLog};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}
