//! Binary entry point: loads `.env`, installs logging and runs the
//! interactive assistant.

use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use jarvis::assistant;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    // Logs go to stderr so the console transcript on stdout stays readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match assistant::run_assistant().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{:#}", err), "assistant stopped with an error");
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
