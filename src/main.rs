//! Binary entry point that wires environment bootstrap, logging, and the
//! voice/text assistant loop.

use anyhow::Result;

use jarvis::assistant;

#[tokio::main]
/// Bootstraps environment variables and tracing, then launches the
/// asynchronous assistant loop alongside the console frontend.
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();
    assistant::run_assistant().await
}
