use anyhow::Result;
use clap::Parser;
use warden_cli::bootstrap_helpers::init_tracing;
use warden_cli::{default_console, run_cli, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let summary = run_cli(cli, default_console()).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
