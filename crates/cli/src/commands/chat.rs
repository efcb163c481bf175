use std::io::{self, BufRead, Write};
use std::sync::Arc;

use uuid::Uuid;

use crate::commands::{current_thread_runtime, CommandResult};
use foodlog_agent::{HttpLlmClient, Workflow};
use foodlog_core::config::{AppConfig, LoadOptions};
use foodlog_db::{
    connect_with_settings, migrations, SqlCheckpointStore, SqlFoodRepository, SqlNutritionLog,
};

/// Run one message through the workflow, or an interactive loop when no
/// message is given. The thread id keys the conversation's checkpoints, so
/// reusing it resumes a suspended confirmation across process restarts.
pub fn run(thread: Option<String>, message: Option<String>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
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
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let thread_id = thread.unwrap_or_else(|| Uuid::new_v4().to_string());

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

        let llm = HttpLlmClient::from_config(&config.llm)
            .map_err(|error| ("llm_init", error.to_string(), 3u8))?;
        let workflow = Workflow::new(
            Arc::new(llm),
            Arc::new(SqlFoodRepository::new(pool.clone())),
            Arc::new(SqlNutritionLog::new(pool.clone())),
            Arc::new(SqlCheckpointStore::new(pool.clone())),
        );

        let summary = match message {
            Some(message) => {
                let outcome = workflow
                    .handle_message(&thread_id, &message)
                    .await
                    .map_err(|error| ("turn_failed", error.to_string(), 4u8))?;
                println!("{}", outcome.reply);
                format!("thread {thread_id}: turn completed")
            }
            None => {
                run_interactive(&workflow, &thread_id)
                    .await
                    .map_err(|error| ("turn_failed", error.to_string(), 4u8))?;
                format!("thread {thread_id}: conversation ended")
            }
        };

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success("chat", summary),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}

async fn run_interactive(
    workflow: &Workflow,
    thread_id: &str,
) -> Result<(), foodlog_core::errors::AgentError> {
    println!("foodlog chat - thread {thread_id} (type `quit` to exit)");

    let stdin = io::stdin();
    loop {
        print!("you> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        let outcome = workflow.handle_message(thread_id, trimmed).await?;
        println!("foodlog> {}", outcome.reply);
    }

    Ok(())
}
