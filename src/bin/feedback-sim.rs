#[path = "feedback-sim/app.rs"]
mod app;
#[path = "feedback-sim/cli.rs"]
mod cli;
#[path = "feedback-sim/scenario.rs"]
mod scenario;

use std::error::Error as StdError;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = cli::Cli::parse_args();
    match app::run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            let code = if err.is_user_error() { 2 } else { 1 };
            std::process::ExitCode::from(code)
        }
    }
}

fn report_error(err: &ui_feedback::error::Error) {
    eprintln!("Error: {err}");
    let mut source: Option<&dyn StdError> = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
