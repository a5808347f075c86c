use anyhow::Result;
use scholarstream::cli;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    // Flush spans before exit
    cli::telemetry::shutdown_tracer();

    result
}
