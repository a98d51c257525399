pub mod commands;
pub mod config;
pub mod state;

use config::WorkbenchConfig;
use serde_json::Value;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Run the workbench: JSON commands in on stdin, responses and events out on
/// stdout, logs on stderr.
pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = WorkbenchConfig::load()?;
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let state = Arc::new(AppState::new(&config, tx.clone()));
    tracing::info!(project = %config.project_name, "workbench ready");

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            let mut bytes = line.to_string().into_bytes();
            bytes.push(b'\n');
            if let Err(e) = stdout.write_all(&bytes).await {
                tracing::error!("stdout closed: {e}");
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = commands::handle_line(&state, &line);
        let _ = tx.send(response);
    }

    tracing::info!("input closed, shutting down");
    state.cancel_jobs();
    drop(state);
    drop(tx);
    let _ = tokio::time::timeout(Duration::from_millis(500), writer).await;
    Ok(())
}
