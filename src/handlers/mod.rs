//! POP3 command handlers.
//!
//! This module contains the Handler trait and command registry for
//! dispatching received command lines to appropriate handlers. The
//! registry is built once at startup and is complete over the verb
//! set; stage legality is enforced centrally here, so a handler only
//! runs when its declared stage requirement holds.

mod auth;
mod maildrop;
mod session;

pub use auth::{AuthHandler, PassHandler, UserHandler, continue_sasl};
pub use maildrop::{
    DeleHandler, ListHandler, NoopHandler, RetrHandler, RsetHandler, StatHandler, UidlHandler,
};
pub use session::{CapaHandler, QuitHandler};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use slpop_proto::{Reply, Request, SessionStage, Verb};
use tokio::sync::mpsc;

use crate::connection::Session;
use crate::server::ServerState;

pub use crate::error::{HandlerError, HandlerResult};

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// Shared server state.
    pub state: &'a Arc<ServerState>,
    /// This connection's session state.
    pub session: &'a mut Session,
    /// Queue of outgoing replies, drained by the connection loop after
    /// each handled line.
    pub sender: &'a mpsc::UnboundedSender<Reply>,
}

impl Context<'_> {
    /// Queue a reply for this client.
    pub fn send(&self, reply: Reply) -> Result<(), HandlerError> {
        self.sender.send(reply)?;
        Ok(())
    }
}

/// Trait implemented by all command handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The stage this command is legal in; `None` means any stage.
    fn stage(&self) -> Option<SessionStage> {
        None
    }

    /// Handle a parsed command.
    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult;
}

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<Verb, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<Verb, Box<dyn Handler>> = HashMap::new();

        // Session handlers
        handlers.insert(Verb::Capa, Box::new(CapaHandler));
        handlers.insert(Verb::Quit, Box::new(QuitHandler));

        // Authentication handlers
        handlers.insert(Verb::User, Box::new(UserHandler));
        handlers.insert(Verb::Pass, Box::new(PassHandler));
        handlers.insert(Verb::Auth, Box::new(AuthHandler));

        // Maildrop handlers
        handlers.insert(Verb::Noop, Box::new(NoopHandler));
        handlers.insert(Verb::Stat, Box::new(StatHandler));
        handlers.insert(Verb::List, Box::new(ListHandler));
        handlers.insert(Verb::Uidl, Box::new(UidlHandler));
        handlers.insert(Verb::Retr, Box::new(RetrHandler));
        handlers.insert(Verb::Dele, Box::new(DeleHandler));
        handlers.insert(Verb::Rset, Box::new(RsetHandler));

        Self { handlers }
    }

    /// Dispatch a received line to the appropriate handler.
    ///
    /// A line with no leading alphabetic token is not a command and
    /// draws a bare `-ERR`; an unrecognized verb echoes the token as
    /// the client sent it. Neither changes session state.
    pub async fn dispatch(&self, ctx: &mut Context<'_>, line: &str) -> HandlerResult {
        let Some(req) = Request::parse(line) else {
            ctx.send(Reply::err(""))?;
            return Ok(());
        };

        let Some(verb) = req.verb() else {
            ctx.send(Reply::err(format!(
                "[{}] Command not supported",
                req.token()
            )))?;
            return Ok(());
        };

        // The registry is complete over the verb enum; a miss here is a
        // logic error in Registry::new().
        let handler = self
            .handlers
            .get(&verb)
            .expect("handler missing for registered verb");

        if let Some(required) = handler.stage() {
            if ctx.session.stage != required {
                ctx.send(Reply::err(format!("Only allowed in {required} mode")))?;
                return Ok(());
            }
        }

        handler.handle(ctx, &req).await
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// `-ERR <VERB> command failed`, the normalized rendering for a
/// maildrop backend failure during a command.
pub(crate) fn command_failed(verb: Verb) -> Reply {
    Reply::err(format!("{verb} command failed"))
}

/// `-ERR Invalid message ID`, for absent or malformed message indices.
pub(crate) fn invalid_message_id() -> Reply {
    Reply::err("Invalid message ID")
}
