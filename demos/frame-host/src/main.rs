//! Terminal stand-in for the host page embedding the widget.
//!
//! Run with: cargo run -p frame-host-demo
//!
//! Requires `WS_LINK`, `BASE` and `FB_APP_ID` (a `.env` file is honored).
//! Each stdin line is posted to the widget as a cross-frame message, e.g.
//! `{"type":"loggedIn","userToken":"..."}`. Messages the widget posts back
//! are printed.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use widget_bridge_core::{BridgeConfig, BridgeContext, CredentialStore, MemoryStore, Redirect};
use widget_bridge_session::{FileCredentialStore, MemoryCredentialStore};
use widget_bridge_transport::{frame_pair, init};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }
    let config = BridgeConfig::from_env().context("loading bridge configuration")?;

    let credentials: Arc<dyn CredentialStore> = match FileCredentialStore::open_default() {
        Ok(store) => {
            tracing::info!(path = %store.path().display(), "using file credential store");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "file credential store unavailable, using memory");
            Arc::new(MemoryCredentialStore::new())
        }
    };

    let store = Arc::new(MemoryStore::with_credentials(Arc::clone(&credentials)));
    let redirect: Redirect = Arc::new(|target: &str| {
        tracing::info!(%target, "widget navigated");
    });
    let ctx = BridgeContext::new(store, redirect, credentials);

    let (widget, mut parent) = frame_pair();
    let bridge = init(ctx, &config, widget);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if parent.post_message(line).is_err() {
                    tracing::warn!("widget frame closed");
                    break;
                }
            }
            Some(message) = parent.recv() => {
                println!("widget -> parent: {message}");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!(state = ?bridge.connection().state(), "shutting down");
    bridge.shutdown();
    Ok(())
}
