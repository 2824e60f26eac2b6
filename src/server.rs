//! Server assembly: options, shared state, listener loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use slpop_proto::SessionStage;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::auth::{AuthMechanism, CredentialVerifier, PlainMechanism};
use crate::connection::Connection;
use crate::handlers::Registry;
use crate::registry::SessionRegistry;
use crate::store::MaildropFactory;

/// Default inactivity timeout. RFC 1939 requires an autologout timer
/// of at least 10 minutes.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Greeting banner name when none is configured.
const DEFAULT_NAME: &str = "localhost";

/// Construction options for [`Server::bind`].
pub struct ServerOptions {
    /// Name shown in the greeting banner.
    pub name: Option<String>,
    /// Credential backend; without one every login attempt fails.
    pub verifier: Option<Arc<dyn CredentialVerifier>>,
    /// Maildrop backend; without one logins fail after verification.
    pub maildrops: Option<Arc<dyn MaildropFactory>>,
    /// Additional SASL mechanisms, registered over the built-in set.
    pub mechanisms: Vec<(String, Arc<dyn AuthMechanism>)>,
    /// Inactivity timeout for established connections.
    pub idle_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            name: None,
            verifier: None,
            maildrops: None,
            mechanisms: Vec::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Capability lines advertised by CAPA, per stage.
pub struct CapabilityTable {
    pub authentication: Vec<String>,
    pub transaction: Vec<String>,
    pub update: Vec<String>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self {
            authentication: vec![
                "UIDL".to_string(),
                "USER".to_string(),
                "RESP-CODES".to_string(),
                "AUTH-RESP-CODE".to_string(),
            ],
            transaction: vec![
                "UIDL".to_string(),
                "EXPIRE NEVER".to_string(),
                "LOGIN-DELAY 0".to_string(),
                format!("IMPLEMENTATION slpopd-{}", env!("CARGO_PKG_VERSION")),
            ],
            update: Vec::new(),
        }
    }
}

impl CapabilityTable {
    /// Lines to advertise in the given stage.
    pub fn for_stage(&self, stage: SessionStage) -> &[String] {
        match stage {
            SessionStage::Authentication => &self.authentication,
            SessionStage::Transaction => &self.transaction,
            SessionStage::Update => &self.update,
        }
    }
}

/// Registered SASL mechanisms, in advertisement order.
pub struct MechanismSet {
    entries: Vec<(String, Arc<dyn AuthMechanism>)>,
}

impl MechanismSet {
    fn with_defaults() -> Self {
        Self {
            entries: vec![(
                "PLAIN".to_string(),
                Arc::new(PlainMechanism) as Arc<dyn AuthMechanism>,
            )],
        }
    }

    /// Register a mechanism under an upper-cased name. An existing
    /// entry of the same name is replaced in place, keeping its
    /// advertisement position.
    pub fn register(&mut self, name: impl Into<String>, mechanism: Arc<dyn AuthMechanism>) {
        let name = name.into().to_uppercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = mechanism,
            None => self.entries.push((name, mechanism)),
        }
    }

    /// Look up a mechanism by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AuthMechanism>> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, mechanism)| mechanism.clone())
    }

    /// Advertised names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared server state, one instance per listener.
pub struct ServerState {
    /// Name shown in the greeting banner.
    pub name: String,
    /// CAPA tables.
    pub capabilities: CapabilityTable,
    /// SASL mechanisms.
    pub mechanisms: MechanismSet,
    /// One-session-per-user registry.
    pub sessions: SessionRegistry,
    /// Credential backend.
    pub verifier: Option<Arc<dyn CredentialVerifier>>,
    /// Maildrop backend.
    pub maildrops: Option<Arc<dyn MaildropFactory>>,
    /// Inactivity timeout for established connections.
    pub idle_timeout: Duration,
    counter: AtomicU64,
}

impl ServerState {
    pub fn from_options(options: ServerOptions) -> Self {
        let mut mechanisms = MechanismSet::with_defaults();
        for (name, mechanism) in options.mechanisms {
            mechanisms.register(name, mechanism);
        }

        Self {
            name: options.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            capabilities: CapabilityTable::default(),
            mechanisms,
            sessions: SessionRegistry::new(),
            verifier: options.verifier,
            maildrops: options.maildrops,
            idle_timeout: options.idle_timeout,
            counter: AtomicU64::new(0),
        }
    }

    /// Next connection UID: accept counter, a dot, accept time in
    /// milliseconds since the epoch.
    pub fn next_uid(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}.{}", n, chrono::Utc::now().timestamp_millis())
    }
}

/// A bound POP3 listener.
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
    registry: Arc<Registry>,
}

impl Server {
    /// Bind the listener and assemble the shared state.
    pub async fn bind(addr: SocketAddr, options: ServerOptions) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "POP3 listener bound");

        Ok(Self {
            listener,
            state: Arc::new(ServerState::from_options(options)),
            registry: Arc::new(Registry::new()),
        })
    }

    /// The bound address; useful after binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let uid = self.state.next_uid();
                    info!(%uid, %addr, "Connection accepted");

                    let state = Arc::clone(&self.state);
                    let registry = Arc::clone(&self.registry);

                    tokio::spawn(async move {
                        let connection = Connection::new(uid.clone(), stream, addr, state, registry);
                        if let Err(e) = connection.run().await {
                            error!(%uid, %addr, error = %e, "Connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
