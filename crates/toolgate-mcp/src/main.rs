//! toolgate - @keyword tool gateway
//!
//! Usage:
//!   toolgate serve            HTTP gateway
//!   toolgate stdio            MCP over stdio (JSON-RPC 2.0)
//!   toolgate query '@osname'  one-shot prompt

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the stdio protocol and command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    cli::run(Cli::parse()).await
}
