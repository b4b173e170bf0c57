mod bootstrap_helpers;

use anyhow::Result;
use clap::Parser;
use tfia_cli::Cli;
use tfia_gateway::run_action_server;

use crate::bootstrap_helpers::{build_action_server_config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_action_server_config(&cli)?;
    run_action_server(config).await
}
