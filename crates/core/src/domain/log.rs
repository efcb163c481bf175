use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::food::{FoodId, MacroProfile};

/// A log entry ready to be written. `food_id` is `None` for confirmed
/// estimates, which have no database row to reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub food_id: Option<FoodId>,
    pub amount_g: f64,
    pub macros: MacroProfile,
    pub consumed_at: DateTime<Utc>,
    pub meal_type: Option<String>,
    pub original_text: Option<String>,
}

/// A persisted log row. Macro values are denormalized for fast aggregation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub food_id: Option<FoodId>,
    pub amount_g: f64,
    pub macros: MacroProfile,
    pub consumed_at: DateTime<Utc>,
    pub meal_type: Option<String>,
    pub original_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated totals for a date or date range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    pub fn add(&mut self, macros: &MacroProfile) {
        self.calories += macros.calories;
        self.protein += macros.protein;
        self.carbs += macros.carbs;
        self.fat += macros.fat;
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::food::MacroProfile;

    use super::MacroTotals;

    #[test]
    fn totals_accumulate_across_entries() {
        let mut totals = MacroTotals::default();
        totals.add(&MacroProfile::new(330.0, 62.0, 0.0, 7.2));
        totals.add(&MacroProfile::new(78.0, 0.45, 21.0, 0.3));

        assert_eq!(totals.calories, 408.0);
        assert_eq!(totals.protein, 62.45);
        assert_eq!(totals.carbs, 21.0);
        assert_eq!(totals.fat, 7.5);
    }
}
