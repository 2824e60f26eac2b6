//! # slpopd
//!
//! A POP3 (RFC 1939) mail-retrieval server engine: connection
//! admission with CRLF framing, the authentication/transaction/update
//! stage machine, USER/PASS and SASL PLAIN logins, and the maildrop
//! command set over pluggable credential and storage backends.
//!
//! The daemon binary wires the built-in backends from a TOML config.
//! Embedders build a [`Server`] directly, supplying their own
//! collaborators through [`ServerOptions`].

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod store;

pub use auth::{AuthMechanism, CredentialVerifier, Identity, StaticCredentials};
pub use config::{Config, ConfigError};
pub use connection::{Connection, Session};
pub use error::{HandlerError, HandlerResult, LoginError, StoreError};
pub use registry::SessionRegistry;
pub use server::{DEFAULT_IDLE_TIMEOUT, Server, ServerOptions, ServerState};
pub use store::{Listing, Maildrop, MaildropFactory, MemoryStore};
