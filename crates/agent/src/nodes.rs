use chrono::{NaiveDate, Utc};

use foodlog_core::collab::{FoodDatabase, NutritionLog};
use foodlog_core::domain::intake::UserIntent;
use foodlog_core::domain::log::NewLogEntry;
use foodlog_core::domain::selection::SelectionStatus;
use foodlog_core::errors::AgentError;
use foodlog_core::state::{ItemOutcome, SessionState};

use crate::llm::{LlmClient, LlmError};

/// Parse the latest user message into structured intake data and fold it
/// into the session state.
///
/// While a confirmation is pending, the parsed intent decides between
/// resuming the suspended iteration (`ConfirmEstimation`) and implicitly
/// cancelling it (anything else). Only the cancellation path re-enters
/// normal parsing; the resume path must not touch the parked item.
pub async fn input_parser(
    state: &mut SessionState,
    llm: &dyn LlmClient,
    message: &str,
    today: NaiveDate,
) -> Result<(), AgentError> {
    let history_end = state.messages.len().saturating_sub(1);
    let history = &state.messages[..history_end];

    let event = llm
        .parse_intake(history, message)
        .await
        .map_err(|err| AgentError::ParsingFailed(err.to_string()))?;

    if event.action == UserIntent::LogFood {
        if event.items.is_empty() {
            return Err(AgentError::ParsingFailed(
                "LOG_FOOD event carried no food items".to_string(),
            ));
        }
        if event.items.iter().any(|item| !item.amount_g.is_finite() || item.amount_g <= 0.0) {
            return Err(AgentError::ParsingFailed(
                "food item amounts must be positive gram values".to_string(),
            ));
        }
    }

    if state.awaiting_confirmation {
        if event.action == UserIntent::ConfirmEstimation {
            state.last_action = Some(UserIntent::ConfirmEstimation);
            state.awaiting_confirmation = false;
            state.response_text = None;
            return Ok(());
        }

        // Implicit cancellation: the user moved on without confirming.
        let cancelled = state.current_item.take();
        state.awaiting_confirmation = false;
        state.selection_result = None;
        state.apply_intake_event(event, today);
        if let Some(item) = cancelled {
            tracing::info!(
                event_name = "workflow.estimation_cancelled",
                thread_id = %state.thread_id,
                food_name = %item.food_name,
                "pending estimate dropped after an unrelated message"
            );
            state.processing_results.push(foodlog_core::state::ProcessedItem {
                item,
                outcome: ItemOutcome::Skipped { reason: "estimate was not confirmed".to_string() },
            });
        }
        return Ok(());
    }

    state.apply_intake_event(event, today);
    Ok(())
}

/// Query the food database for the item at the head of the work queue,
/// pulling it into the in-flight slot first. An empty result set is a valid
/// outcome that routes to the estimation path.
pub async fn food_search(
    state: &mut SessionState,
    food_db: &dyn FoodDatabase,
) -> Result<(), AgentError> {
    state.search_results.clear();

    if state.current_item.is_none() {
        state.begin_next_item();
    }
    let Some(item) = state.current_item.as_ref() else {
        return Err(AgentError::SelectionInvalid(
            "food search reached with an empty work queue".to_string(),
        ));
    };
    let food_name = item.food_name.clone();

    state.search_results = food_db.search(&food_name).await?;
    Ok(())
}

/// Resolve the in-flight item against its search results. A sole candidate
/// is selected without a collaborator round-trip; otherwise the selection
/// collaborator decides and its output is validated against the candidate
/// set before it may influence routing.
pub async fn agent_selection(
    state: &mut SessionState,
    llm: &dyn LlmClient,
) -> Result<(), AgentError> {
    let Some(item) = state.current_item.clone() else {
        return Err(AgentError::SelectionInvalid(
            "selection reached without an in-flight item".to_string(),
        ));
    };

    let selection = if state.search_results.len() == 1 {
        foodlog_core::domain::selection::FoodSelectionResult::selected(
            state.search_results[0].id,
            "sole candidate",
        )
    } else {
        llm.select_food(&item, &state.search_results).await.map_err(|err| match err {
            LlmError::SchemaInvalid(detail) => AgentError::SelectionInvalid(detail),
            other => AgentError::SelectionInvalid(other.to_string()),
        })?
    };

    selection.validate(&state.search_results)?;
    state.selection_result = Some(selection);
    Ok(())
}

/// Write exactly one log entry for the resolved in-flight item, then
/// complete it. `NoMatch` completes the item with no write so the drain can
/// continue. Totals are refreshed read-after-write.
pub async fn calculate_log(
    state: &mut SessionState,
    food_db: &dyn FoodDatabase,
    nutrition_log: &dyn NutritionLog,
) -> Result<(), AgentError> {
    let Some(item) = state.current_item.clone() else {
        return Err(AgentError::SelectionInvalid(
            "log calculation reached without an in-flight item".to_string(),
        ));
    };
    let Some(selection) = state.selection_result.clone() else {
        return Err(AgentError::SelectionInvalid(
            "log calculation reached without a selection result".to_string(),
        ));
    };

    let (food_id, per_100g) = match selection.status {
        SelectionStatus::NoMatch => {
            let reason = selection
                .confidence
                .unwrap_or_else(|| "no suitable database match".to_string());
            state.finish_current(ItemOutcome::Skipped { reason });
            return Ok(());
        }
        SelectionStatus::Selected => {
            let food_id = selection.food_id.ok_or_else(|| {
                AgentError::SelectionInvalid("SELECTED result lost its food_id".to_string())
            })?;
            let food = food_db.find_by_id(food_id).await?.ok_or_else(|| {
                AgentError::Lookup(format!(
                    "food {} disappeared between search and logging",
                    food_id.0
                ))
            })?;
            (Some(food_id), food.macros)
        }
        SelectionStatus::Estimated => {
            let estimate = selection.estimated.ok_or_else(|| {
                AgentError::SelectionInvalid("ESTIMATED result lost its macros".to_string())
            })?;
            (None, estimate)
        }
    };

    let macros = per_100g.scale(item.amount_g);
    let consumed_at = state.consumed_at.unwrap_or_else(Utc::now);
    let written = nutrition_log
        .create_log_entry(NewLogEntry {
            food_id,
            amount_g: item.amount_g,
            macros,
            consumed_at,
            meal_type: state.meal_type.clone(),
            original_text: Some(item.original_text.clone()),
        })
        .await?;

    state.daily_totals = nutrition_log.daily_totals(written.consumed_at.date_naive()).await?;
    state.finish_current(ItemOutcome::Logged { calories: written.macros.calories });
    Ok(())
}

/// Read the log for the active date or range and stage it for the reply.
/// The work queue is never touched here.
pub async fn stats_lookup(
    state: &mut SessionState,
    nutrition_log: &dyn NutritionLog,
) -> Result<(), AgentError> {
    let logs = match (state.start_date, state.end_date) {
        (Some(start), Some(end)) => nutrition_log.logs_by_date_range(start, end).await?,
        _ => nutrition_log.logs_by_date(state.current_date).await?,
    };

    let mut totals = foodlog_core::domain::log::MacroTotals::default();
    for entry in &logs {
        totals.add(&entry.macros);
    }

    state.daily_log_report = logs;
    state.daily_totals = totals;
    Ok(())
}

/// Terminal node: render the reply for whatever the turn produced and
/// append it to the conversation.
pub async fn respond(state: &mut SessionState, llm: &dyn LlmClient) -> Result<(), AgentError> {
    let text = if state.awaiting_confirmation {
        confirmation_prompt(state)?
    } else {
        match state.last_action {
            Some(UserIntent::Chitchat) => llm
                .small_talk(&state.messages)
                .await
                .map_err(|err| AgentError::ParsingFailed(err.to_string()))?,
            Some(UserIntent::QueryDailyStats) => stats_summary(state),
            Some(UserIntent::LogFood) | Some(UserIntent::ConfirmEstimation) => {
                processing_summary(state)
            }
            None => "Hi! Tell me what you ate and I'll log it.".to_string(),
        }
    };

    state.messages.push(foodlog_core::state::ChatMessage::assistant(text.clone()));
    state.response_text = Some(text);
    Ok(())
}

fn confirmation_prompt(state: &SessionState) -> Result<String, AgentError> {
    let (Some(item), Some(selection)) = (&state.current_item, &state.selection_result) else {
        return Err(AgentError::SelectionInvalid(
            "suspended at the gate without a parked item and estimate".to_string(),
        ));
    };
    let Some(estimate) = &selection.estimated else {
        return Err(AgentError::SelectionInvalid(
            "suspended at the gate without estimated macros".to_string(),
        ));
    };

    let scaled = estimate.scale(item.amount_g);
    Ok(format!(
        "I couldn't find \"{}\" in the food database, so I estimated it: \
         {:.0} kcal, {:.1}g protein, {:.1}g carbs, {:.1}g fat for {:.0}g. \
         Should I log that? (yes / no)",
        item.food_name, scaled.calories, scaled.protein, scaled.carbs, scaled.fat, item.amount_g
    ))
}

fn processing_summary(state: &SessionState) -> String {
    if state.processing_results.is_empty() {
        return "There's nothing waiting on a confirmation right now. Tell me what you ate and I'll log it.".to_string();
    }

    let mut lines: Vec<String> =
        state.processing_results.iter().map(|result| result.summary()).collect();

    let logged_any = state
        .processing_results
        .iter()
        .any(|result| matches!(result.outcome, ItemOutcome::Logged { .. }));
    if logged_any {
        let totals = &state.daily_totals;
        lines.push(format!(
            "Today so far: {:.0} kcal, {:.1}g protein, {:.1}g carbs, {:.1}g fat.",
            totals.calories, totals.protein, totals.carbs, totals.fat
        ));
    }

    lines.join("\n")
}

fn stats_summary(state: &SessionState) -> String {
    let period = match (state.start_date, state.end_date) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        _ => state.current_date.to_string(),
    };

    if state.daily_log_report.is_empty() {
        return format!("No entries logged for {period}.");
    }

    let totals = &state.daily_totals;
    format!(
        "{} entries for {period}: {:.0} kcal, {:.1}g protein, {:.1}g carbs, {:.1}g fat.",
        state.daily_log_report.len(),
        totals.calories,
        totals.protein,
        totals.carbs,
        totals.fat
    )
}
