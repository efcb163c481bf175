use std::process::ExitCode;

fn main() -> ExitCode {
    foodlog_cli::run()
}
