mod args;
mod client;
mod error;
mod tail_logs;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::Args;
use crate::client::CloudWatchLogs;
use crate::tail_logs::StdoutSink;

#[tokio::main]
async fn main() {
    init_tracing();
    // Fatal errors go to stdout, like everything else this tool prints. If
    // stdout itself is gone there is nobody left to tell.
    if let Err(err) = run().await {
        let _ = writeln!(io::stdout().lock(), "{err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "cwtail=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let client = CloudWatchLogs::connect()
        .await
        .context("failed to initialise cloudwatch logs client")?;

    let never = tail_logs::run(Arc::new(client), args.groups.as_deref(), Arc::new(StdoutSink)).await?;
    match never {}
}
