//! slpopd - Straylight POP3 Daemon
//!
//! Wires the built-in credential and maildrop backends from a TOML
//! config and serves POP3 until killed.

use std::sync::Arc;
use std::time::Duration;

use slpopd::auth::StaticCredentials;
use slpopd::config::Config;
use slpopd::server::{Server, ServerOptions};
use slpopd::store::MemoryStore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "slpopd.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        "Starting slpopd"
    );

    // Built-in credential backend from the [[account]] blocks
    let mut credentials = StaticCredentials::new();
    for account in &config.accounts {
        credentials.add(account.user.clone(), account.password.clone());
    }
    if credentials.is_empty() {
        warn!("No accounts configured; every login will be rejected");
    }

    // Built-in in-memory maildrops, seeded from the spool when present
    let store = MemoryStore::new();
    if let Some(spool) = &config.spool {
        for account in &config.accounts {
            let user_dir = spool.directory.join(&account.user);
            if !user_dir.is_dir() {
                continue;
            }
            match store.seed_from_dir(&account.user, &user_dir) {
                Ok(count) => {
                    info!(user = %account.user, count, "Seeded maildrop from spool");
                }
                Err(e) => {
                    warn!(user = %account.user, error = %e, "Failed to read spool directory");
                }
            }
        }
    }

    let options = ServerOptions {
        name: Some(config.server.name.clone()),
        verifier: Some(Arc::new(credentials)),
        maildrops: Some(Arc::new(store)),
        idle_timeout: Duration::from_secs(config.timeouts.inactivity_secs),
        ..Default::default()
    };

    let server = Server::bind(config.listen.address, options).await?;
    server.run().await?;

    Ok(())
}
