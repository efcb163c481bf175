use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Intent classified by the input parser for a single user turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserIntent {
    LogFood,
    QueryDailyStats,
    Chitchat,
    ConfirmEstimation,
}

/// Unit of measurement for parsed quantities. The parser normalizes every
/// amount to grams before an item enters the work queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    #[serde(rename = "g")]
    Grams,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodIntakeItem {
    /// Normalized name for database lookup.
    pub food_name: String,
    /// Estimated weight in grams.
    pub amount_g: f64,
    #[serde(default)]
    pub unit: Unit,
    /// The user's original wording for this item.
    pub original_text: String,
}

/// Structured output of the language-understanding collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodIntakeEvent {
    pub action: UserIntent,
    #[serde(default)]
    pub items: Vec<FoodIntakeItem>,
    #[serde(default)]
    pub meal_type: Option<String>,
    /// Specific date for the query or log ("yesterday", "2026-08-01").
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    /// Inclusive range bounds for stats queries ("last week").
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// When the food was consumed, if the user said so.
    #[serde(default)]
    pub consumed_at: Option<DateTime<Utc>>,
}

impl FoodIntakeEvent {
    pub fn chitchat() -> Self {
        Self {
            action: UserIntent::Chitchat,
            items: Vec::new(),
            meal_type: None,
            target_date: None,
            start_date: None,
            end_date: None,
            consumed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FoodIntakeEvent, UserIntent};

    #[test]
    fn intent_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&UserIntent::QueryDailyStats).expect("serialize");
        assert_eq!(json, "\"QUERY_DAILY_STATS\"");

        let parsed: UserIntent =
            serde_json::from_str("\"CONFIRM_ESTIMATION\"").expect("deserialize");
        assert_eq!(parsed, UserIntent::ConfirmEstimation);
    }

    #[test]
    fn event_deserializes_with_optional_fields_absent() {
        let event: FoodIntakeEvent = serde_json::from_str(
            r#"{"action": "LOG_FOOD", "items": [{"food_name": "apple", "amount_g": 150.0, "unit": "g", "original_text": "an apple"}]}"#,
        )
        .expect("deserialize");

        assert_eq!(event.action, UserIntent::LogFood);
        assert_eq!(event.items.len(), 1);
        assert_eq!(event.items[0].food_name, "apple");
        assert!(event.target_date.is_none());
        assert!(event.meal_type.is_none());
    }

    #[test]
    fn unknown_intent_is_rejected() {
        let result = serde_json::from_str::<UserIntent>("\"EAT_MORE\"");
        assert!(result.is_err());
    }
}
