use chrono::{NaiveDate, Utc};

use crate::commands::{current_thread_runtime, CommandResult};
use foodlog_core::collab::NutritionLog;
use foodlog_core::config::{AppConfig, LoadOptions};
use foodlog_db::{connect_with_settings, migrations, SqlNutritionLog};

pub fn run(date: Option<String>) -> CommandResult {
    let target_date = match resolve_date(date.as_deref()) {
        Ok(date) => date,
        Err(message) => return CommandResult::failure("stats", "invalid_date", message, 2),
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "stats",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "stats",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let log = SqlNutritionLog::new(pool.clone());
        let entries = log
            .logs_by_date(target_date)
            .await
            .map_err(|error| ("log_query", error.to_string(), 4u8))?;
        let totals = log
            .daily_totals(target_date)
            .await
            .map_err(|error| ("log_query", error.to_string(), 4u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>((entries, totals))
    });

    match result {
        Ok((entries, totals)) => CommandResult::success(
            "stats",
            format!(
                "{target_date}: {} entries, {:.0} kcal, {:.1}g protein, {:.1}g carbs, {:.1}g fat",
                entries.len(),
                totals.calories,
                totals.protein,
                totals.carbs,
                totals.fat
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("stats", error_class, message, exit_code)
        }
    }
}

fn resolve_date(raw: Option<&str>) -> Result<NaiveDate, String> {
    match raw {
        None => Ok(Utc::now().date_naive()),
        Some(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|_| format!("invalid date `{value}` (expected YYYY-MM-DD)")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::resolve_date;

    #[test]
    fn explicit_date_is_parsed() {
        let date = resolve_date(Some("2026-08-07")).expect("valid date");
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid"));
    }

    #[test]
    fn malformed_date_is_rejected_with_a_hint() {
        let error = resolve_date(Some("08/07/2026")).expect_err("invalid format");
        assert!(error.contains("YYYY-MM-DD"));
    }

    #[test]
    fn missing_date_defaults_to_today() {
        assert!(resolve_date(None).is_ok());
    }
}
