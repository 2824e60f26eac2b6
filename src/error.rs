//! Unified error handling for slpopd.
//!
//! Server-side error taxonomy: control-flow errors raised by command
//! handlers, login failures with their response-code renderings, and
//! collaborator failures. Transport errors live in `slpop_proto`.

use slpop_proto::{Reply, RespCode};
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Handler errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
///
/// These are control flow, not client-visible failures: a handler that
/// wants to reject a command queues an `-ERR` reply and returns `Ok`.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Orderly close requested; the sign-off reply is already queued.
    #[error("client quit")]
    Quit,

    #[error("send error: {0}")]
    Send(#[from] mpsc::error::SendError<Reply>),
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Login errors (shared USER/PASS and AUTH sequence)
// ============================================================================

/// Failures of the login sequence, after the credential check passed.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The verifier returned a username that canonicalizes to nothing.
    #[error("canonical username is empty")]
    EmptyUser,

    /// Another connection already holds a session for this user.
    #[error("user already has an active session")]
    InUse,

    /// No maildrop factory was configured on the server.
    #[error("no maildrop backend configured")]
    NoBackend,

    /// The maildrop factory failed to open the user's maildrop.
    #[error("maildrop open failed: {0}")]
    Maildrop(#[from] StoreError),
}

impl LoginError {
    /// The client-visible reply for this failure.
    pub fn to_reply(&self) -> Reply {
        match self {
            Self::EmptyUser => Reply::coded(RespCode::Sys, "Invalid user"),
            Self::InUse => {
                Reply::coded(RespCode::InUse, "You already have a POP session running")
            }
            Self::NoBackend => Reply::coded(RespCode::Sys, "No maildrop backend configured"),
            Self::Maildrop(_) => Reply::coded(RespCode::Sys, "Maildrop initialization failed"),
        }
    }
}

// ============================================================================
// Credential rejection
// ============================================================================

/// A credential verifier rejected a login attempt.
///
/// The reason is client-visible, rendered after `Invalid login: `.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct AuthReject {
    /// Human-readable rejection reason.
    pub reason: String,
}

impl AuthReject {
    /// Rejection with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The client-visible reply for this rejection.
    pub fn to_reply(&self) -> Reply {
        Reply::coded(RespCode::Auth, format!("Invalid login: {}", self.reason))
    }
}

// ============================================================================
// SASL mechanism failures
// ============================================================================

/// Terminal failures of an AUTH mechanism exchange.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MechanismError {
    /// The client aborted the exchange with a `*` line.
    #[error("SASL authentication aborted")]
    Aborted,

    /// The continuation data was structurally invalid for the mechanism.
    #[error("Invalid authentication data")]
    BadData,
}

impl MechanismError {
    /// The client-visible reply for this failure.
    pub fn to_reply(&self) -> Reply {
        Reply::coded(RespCode::Auth, self.to_string())
    }
}

// ============================================================================
// Maildrop operation failures
// ============================================================================

/// A maildrop backend operation failed.
///
/// The text goes to the log, never to the client. The client sees the
/// per-command `-ERR <VERB> command failed` rendering.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    /// Failure with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
