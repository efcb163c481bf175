use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::food::FoodCandidate;
use crate::domain::intake::{FoodIntakeEvent, FoodIntakeItem, UserIntent};
use crate::domain::log::{LogEntry, MacroTotals};
use crate::domain::selection::FoodSelectionResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Per-item outcome recorded while draining the work queue. Feeds the final
/// reply so the user sees what happened to each thing they mentioned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemOutcome {
    Logged { calories: f64 },
    Skipped { reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedItem {
    pub item: FoodIntakeItem,
    pub outcome: ItemOutcome,
}

impl ProcessedItem {
    pub fn summary(&self) -> String {
        match &self.outcome {
            ItemOutcome::Logged { calories } => {
                format!("Logged {} ({:.0} kcal)", self.item.food_name, calories)
            }
            ItemOutcome::Skipped { reason } => {
                format!("Skipped {}: {}", self.item.food_name, reason)
            }
        }
    }
}

/// The single mutable record threaded through every node of a turn and
/// persisted between turns. No other type carries conversation state.
///
/// `pending_food_items` and `current_item` together form a FIFO work queue
/// with at most one in-flight element; `current_item` is non-empty exactly
/// while the search/select/log cycle is mid-iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
    pub last_action: Option<UserIntent>,
    pub pending_food_items: VecDeque<FoodIntakeItem>,
    pub current_item: Option<FoodIntakeItem>,
    pub search_results: Vec<FoodCandidate>,
    pub selection_result: Option<FoodSelectionResult>,
    pub awaiting_confirmation: bool,
    pub current_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub meal_type: Option<String>,
    pub processing_results: Vec<ProcessedItem>,
    pub daily_log_report: Vec<LogEntry>,
    /// Owned by the persistence layer; the graph only reads it.
    pub daily_totals: MacroTotals,
    pub response_text: Option<String>,
}

impl SessionState {
    pub fn new(thread_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            last_action: None,
            pending_food_items: VecDeque::new(),
            current_item: None,
            search_results: Vec::new(),
            selection_result: None,
            awaiting_confirmation: false,
            current_date: today,
            start_date: None,
            end_date: None,
            consumed_at: None,
            meal_type: None,
            processing_results: Vec::new(),
            daily_log_report: Vec::new(),
            daily_totals: MacroTotals::default(),
            response_text: None,
        }
    }

    /// Fold a parsed intake event into the state, replacing any stale
    /// in-flight work from a previous turn.
    pub fn apply_intake_event(&mut self, event: FoodIntakeEvent, today: NaiveDate) {
        self.last_action = Some(event.action);
        self.pending_food_items = event.items.into();
        self.current_item = None;
        self.search_results.clear();
        self.selection_result = None;
        self.processing_results.clear();
        self.daily_log_report.clear();
        self.response_text = None;
        self.meal_type = event.meal_type;
        self.consumed_at = event.consumed_at;

        if let (Some(start), Some(end)) = (event.start_date, event.end_date) {
            self.start_date = Some(start);
            self.end_date = Some(end);
            self.current_date = today;
        } else if let Some(target) = event.target_date {
            self.current_date = target;
            self.start_date = None;
            self.end_date = None;
        } else {
            self.current_date = today;
            self.start_date = None;
            self.end_date = None;
        }
    }

    /// Pop the next pending item into the in-flight slot. Returns false when
    /// an item is already in flight or the queue is empty.
    pub fn begin_next_item(&mut self) -> bool {
        if self.current_item.is_some() {
            return false;
        }
        match self.pending_food_items.pop_front() {
            Some(item) => {
                self.current_item = Some(item);
                true
            }
            None => false,
        }
    }

    /// Return the in-flight item to the FRONT of the queue, discarding its
    /// search and selection artifacts. Used when a turn fails mid-iteration
    /// so no partial pop is observable afterwards.
    pub fn requeue_current(&mut self) {
        if let Some(item) = self.current_item.take() {
            self.pending_food_items.push_front(item);
        }
        self.search_results.clear();
        self.selection_result = None;
    }

    /// Complete the in-flight item, recording its outcome.
    pub fn finish_current(&mut self, outcome: ItemOutcome) {
        if let Some(item) = self.current_item.take() {
            self.processing_results.push(ProcessedItem { item, outcome });
        }
        self.search_results.clear();
        self.selection_result = None;
    }

    pub fn drained(&self) -> bool {
        self.pending_food_items.is_empty() && self.current_item.is_none()
    }
}
