pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "foodlog",
    about = "Conversational nutrition tracking agent",
    long_about = "Chat with the foodlog agent, manage its database, and inspect daily totals.",
    after_help = "Examples:\n  foodlog chat -m \"I had 200g of chicken breast\"\n  foodlog chat --thread breakfast-club\n  foodlog stats --date 2026-08-01\n  foodlog doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Talk to the agent; omit --message for an interactive session")]
    Chat {
        #[arg(long, help = "Conversation thread id; reuse it to resume a conversation")]
        thread: Option<String>,
        #[arg(short, long, help = "Send a single message instead of starting a session")]
        message: Option<String>,
    },
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the deterministic food reference dataset")]
    Seed,
    #[command(about = "Show logged entries and macro totals for a date")]
    Stats {
        #[arg(long, help = "Date to report on (YYYY-MM-DD, defaults to today)")]
        date: Option<String>,
    },
    #[command(about = "Validate config, LLM readiness, and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Chat { thread, message } => commands::chat::run(thread, message),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Stats { date } => commands::stats::run(date),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging() {
    use foodlog_core::config::LogFormat::{Compact, Json, Pretty};
    use foodlog_core::config::{AppConfig, LoadOptions};
    use tracing::Level;

    // Logging must not block a command from running; fall back to defaults
    // when the config cannot load (the command will report the real error).
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(log_level);
    let init_result = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
    let _ = init_result;
}
