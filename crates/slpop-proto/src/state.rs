//! Session stage and receiver mode types shared with server code.

use std::fmt;

/// POP3 session stages, in forward order.
///
/// A session only ever moves forward: `Authentication` to `Transaction`
/// on a successful login, then to `Update` when it ends. It never
/// regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionStage {
    /// Client has connected but not yet proven an identity.
    Authentication,
    /// Client is logged in and may operate on its maildrop.
    Transaction,
    /// Session is over; pending deletions are applied and the
    /// connection is torn down.
    Update,
}

impl SessionStage {
    /// Lower-case stage name, as used in wrong-stage error replies.
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionStage::Authentication => "authentication",
            SessionStage::Transaction => "transaction",
            SessionStage::Update => "update",
        }
    }
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the next received line on a connection is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverMode {
    /// Lines are protocol commands.
    #[default]
    Command,
    /// Lines are raw continuation data for an in-progress AUTH
    /// exchange; command dispatch is bypassed.
    ResponseAwait,
}
