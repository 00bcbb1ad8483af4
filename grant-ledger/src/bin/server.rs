//! Grant ledger line-protocol server
//!
//! Reads one JSON [`Operation`] per line on stdin and answers each with one
//! JSON line on stdout: `{"ok": <response>}` or `{"error": "<message>"}`.
//! Logs go to stderr.
//!
//! Configuration comes from the TOML file named by the first argument, or
//! from `GRANT_LEDGER_*` environment variables when no argument is given.

use anyhow::Context;
use grant_ledger::{spawn_ledger_writer, Config, Ledger, Operation};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::from_env().context("Failed to load config from environment")?,
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        data_dir = ?config.data_dir,
        "Starting grant ledger"
    );

    let mailbox_capacity = config.writer.mailbox_capacity;
    let ledger = Arc::new(Ledger::open(config).context("Failed to open ledger")?);
    let handle = spawn_ledger_writer(ledger, mailbox_capacity);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Operation>(line) {
            Ok(operation) => match handle.execute(operation).await {
                Ok(response) => json!({ "ok": response }),
                Err(e) => json!({ "error": e.to_string() }),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Malformed request");
                json!({ "error": format!("Malformed request: {}", e) })
            }
        };

        let mut out = serde_json::to_vec(&reply)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    handle.shutdown().await?;
    tracing::info!("Shutting down grant ledger");
    Ok(())
}
