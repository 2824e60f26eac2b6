//! Per-connection session loop.
//!
//! Each accepted socket gets one task running [`Connection::run`]:
//! greet, then read CRLF lines through the codec, dispatch each to a
//! handler (or feed it to an open SASL exchange), and write out the
//! queued replies in order. The inactivity clock rearms on every
//! completed line; when it fires the connection is dropped without a
//! reply.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use slpop_proto::{Pop3Codec, ProtocolError, ReceiverMode, Reply, SessionStage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::auth::PendingSasl;
use crate::handlers::{continue_sasl, Context, HandlerError, Registry};
use crate::server::ServerState;
use crate::store::Maildrop;

/// Why a connection left its read loop.
#[derive(Debug, Clone, Copy)]
enum CloseReason {
    /// The client sent QUIT.
    Quit,
    /// The peer closed the stream.
    Disconnect,
    /// The inactivity timeout fired.
    Timeout,
    /// A transport-level read or write fault.
    Fault,
}

impl CloseReason {
    fn as_str(self) -> &'static str {
        match self {
            CloseReason::Quit => "quit",
            CloseReason::Disconnect => "disconnect",
            CloseReason::Timeout => "timeout",
            CloseReason::Fault => "fault",
        }
    }
}

/// Mutable per-session state threaded through the handlers.
pub struct Session {
    /// Connection UID, unique for the lifetime of the process.
    pub uid: String,
    /// Protocol stage.
    pub stage: SessionStage,
    /// Username recorded by USER, awaiting PASS.
    pub pending_user: Option<String>,
    /// Canonical username once logged in.
    pub user: Option<String>,
    /// Opaque identity payload returned by the credential backend.
    pub user_info: serde_json::Value,
    /// Maildrop bound at login.
    pub maildrop: Option<Arc<dyn Maildrop>>,
    /// Open SASL exchange; while set, inbound lines feed it instead of
    /// command dispatch.
    pub sasl: Option<PendingSasl>,
}

impl Session {
    pub fn new(uid: String) -> Self {
        Self {
            uid,
            stage: SessionStage::Authentication,
            pending_user: None,
            user: None,
            user_info: serde_json::Value::Null,
            maildrop: None,
            sasl: None,
        }
    }

    /// Current receiver mode, derived from the SASL slot.
    pub fn receiver_mode(&self) -> ReceiverMode {
        if self.sasl.is_some() {
            ReceiverMode::ResponseAwait
        } else {
            ReceiverMode::Command
        }
    }
}

/// One client connection and its session.
pub struct Connection {
    session: Session,
    framed: Framed<TcpStream, Pop3Codec>,
    addr: SocketAddr,
    state: Arc<ServerState>,
    registry: Arc<Registry>,
}

impl Connection {
    pub fn new(
        uid: String,
        stream: TcpStream,
        addr: SocketAddr,
        state: Arc<ServerState>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            session: Session::new(uid),
            framed: Framed::new(stream, Pop3Codec::new()),
            addr,
            state,
            registry,
        }
    }

    /// Run the session to completion.
    pub async fn run(mut self) -> Result<(), ProtocolError> {
        let greeting = format!(
            "POP3 Server ready <{}@{}>",
            self.session.uid, self.state.name
        );
        self.framed.send(Reply::ok(greeting)).await?;

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        let idle = self.state.idle_timeout;

        let reason = loop {
            match tokio::time::timeout(idle, self.framed.next()).await {
                Ok(Some(Ok(line))) => {
                    debug!(uid = %self.session.uid, raw = %line, "Received line");

                    let result = {
                        let mut ctx = Context {
                            state: &self.state,
                            session: &mut self.session,
                            sender: &reply_tx,
                        };
                        match ctx.session.receiver_mode() {
                            ReceiverMode::ResponseAwait => continue_sasl(&mut ctx, &line).await,
                            ReceiverMode::Command => self.registry.dispatch(&mut ctx, &line).await,
                        }
                    };

                    let quit = match result {
                        Ok(()) => false,
                        Err(HandlerError::Quit) => true,
                        Err(HandlerError::Send(e)) => {
                            warn!(uid = %self.session.uid, error = %e, "Reply queue closed");
                            break CloseReason::Fault;
                        }
                    };

                    // Queued replies go out in dispatch order before the
                    // next line is read.
                    if let Err(e) = self.flush_replies(&mut reply_rx).await {
                        warn!(uid = %self.session.uid, error = %e, "Write failed");
                        break CloseReason::Fault;
                    }

                    if quit {
                        break CloseReason::Quit;
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!(uid = %self.session.uid, error = %e, "Transport fault");
                    break CloseReason::Fault;
                }
                Ok(None) => {
                    break CloseReason::Disconnect;
                }
                Err(_) => {
                    break CloseReason::Timeout;
                }
            }
        };

        self.teardown(reason);
        Ok(())
    }

    async fn flush_replies(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Reply>,
    ) -> Result<(), ProtocolError> {
        while let Ok(reply) = rx.try_recv() {
            self.framed.send(reply).await?;
        }
        Ok(())
    }

    /// Release per-user resources on the way out.
    ///
    /// Deletion marks are not purged here: only QUIT runs the purge,
    /// so an abrupt close leaves the maildrop intact. The session slot
    /// release is UID-guarded against a racing successor login.
    fn teardown(&mut self, reason: CloseReason) {
        // A session that timed out before authenticating never touched
        // the maildrop; it has no update stage to enter.
        let enter_update = !(matches!(reason, CloseReason::Timeout)
            && self.session.stage == SessionStage::Authentication);
        if enter_update {
            self.session.stage = SessionStage::Update;
        }

        self.session.sasl = None;
        self.session.maildrop = None;

        if let Some(user) = self.session.user.take() {
            if self.state.sessions.release(&user, &self.session.uid) {
                debug!(uid = %self.session.uid, user = %user, "Session slot released");
            }
        }

        info!(
            uid = %self.session.uid,
            addr = %self.addr,
            reason = reason.as_str(),
            stage = self.session.stage.as_str(),
            "Connection closed"
        );
    }
}
