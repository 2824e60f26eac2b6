//! Test server management.
//!
//! Binds in-process server instances on ephemeral ports for
//! integration testing. Each spawn gets its own state, accounts and
//! seeded maildrops, so tests cannot interfere with each other.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use slpopd::auth::StaticCredentials;
use slpopd::server::{Server, ServerOptions};
use slpopd::store::MemoryStore;

use super::client::TestClient;

/// Password accepted for every seeded test account.
pub const PASSWORD: &str = "correct_password";

/// Seeded message bodies, 8 octets each.
pub const MESSAGES: [&[u8]; 3] = [b"message1", b"message2", b"message3"];

/// A test server bound to an ephemeral port.
pub struct TestServer {
    address: SocketAddr,
}

impl TestServer {
    /// Spawn a server with the default accounts and timeout.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with_options(Self::default_options()).await
    }

    /// Spawn a server with a custom inactivity timeout.
    pub async fn spawn_with_idle(idle: Duration) -> anyhow::Result<Self> {
        let mut options = Self::default_options();
        options.idle_timeout = idle;
        Self::spawn_with_options(options).await
    }

    /// Spawn a server from explicit options.
    pub async fn spawn_with_options(options: ServerOptions) -> anyhow::Result<Self> {
        let server = Server::bind("127.0.0.1:0".parse()?, options).await?;
        let address = server.local_addr()?;
        tokio::spawn(server.run());
        Ok(Self { address })
    }

    /// Options with accounts `jdoe` and `jdoe2`, three messages each.
    pub fn default_options() -> ServerOptions {
        let mut credentials = StaticCredentials::new();
        credentials.add("jdoe", PASSWORD);
        credentials.add("jdoe2", PASSWORD);

        let store = MemoryStore::new();
        for user in ["jdoe", "jdoe2"] {
            store.seed(user, MESSAGES.iter().map(|m| m.to_vec()).collect());
        }

        ServerOptions {
            name: Some("test.pop".to_string()),
            verifier: Some(Arc::new(credentials)),
            maildrops: Some(Arc::new(store)),
            ..Default::default()
        }
    }

    /// The server's bound address.
    pub fn address(&self) -> String {
        self.address.to_string()
    }

    /// Connect a client and consume the greeting.
    pub async fn connect(&self) -> anyhow::Result<TestClient> {
        let mut client = TestClient::connect(&self.address()).await?;
        client.greeting().await?;
        Ok(client)
    }
}
