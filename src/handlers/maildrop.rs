//! Transaction stage handlers (NOOP, STAT, LIST, UIDL, RETR, DELE,
//! RSET).
//!
//! All of these require the transaction stage, enforced by the
//! dispatcher. Message arguments are positional indices into the
//! live (not deletion-marked) messages, 1-based; the backend decides
//! which positions exist.

use std::sync::Arc;

use async_trait::async_trait;
use slpop_proto::{Reply, Request, SessionStage, Verb};
use tracing::warn;

use super::{command_failed, invalid_message_id, Context, Handler, HandlerResult};
use crate::error::StoreError;
use crate::store::{Listing, Maildrop};

/// Parse a message-number argument. POP3 message numbers start at 1;
/// zero and non-numeric input are rejected before the backend sees
/// them.
fn parse_index(args: &str) -> Option<usize> {
    args.parse().ok().filter(|&n| n >= 1)
}

/// The bound maildrop, or `None` when the session has none.
fn maildrop_of(ctx: &Context<'_>) -> Option<Arc<dyn Maildrop>> {
    ctx.session.maildrop.clone()
}

/// Send a LIST/UIDL outcome in its wire shape.
async fn send_listing(
    ctx: &mut Context<'_>,
    verb: Verb,
    outcome: Result<Listing, StoreError>,
) -> HandlerResult {
    match outcome {
        Ok(Listing::All(lines)) => {
            ctx.send(Reply::ok(""))?;
            for line in lines {
                ctx.send(Reply::line(line))?;
            }
            ctx.send(Reply::End)?;
        }
        Ok(Listing::One(line)) => {
            ctx.send(Reply::ok(line))?;
        }
        Ok(Listing::Missing) => {
            ctx.send(invalid_message_id())?;
        }
        Err(e) => {
            warn!(uid = %ctx.session.uid, error = %e, "Maildrop scan failed");
            ctx.send(command_failed(verb))?;
        }
    }
    Ok(())
}

/// NOOP - always responds with `+OK`.
pub struct NoopHandler;

#[async_trait]
impl Handler for NoopHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Transaction)
    }

    async fn handle(&self, ctx: &mut Context<'_>, _req: &Request<'_>) -> HandlerResult {
        ctx.send(Reply::ok(""))?;
        Ok(())
    }
}

/// STAT - message count and total octet size of the maildrop.
pub struct StatHandler;

#[async_trait]
impl Handler for StatHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Transaction)
    }

    async fn handle(&self, ctx: &mut Context<'_>, _req: &Request<'_>) -> HandlerResult {
        let Some(maildrop) = maildrop_of(ctx) else {
            ctx.send(command_failed(Verb::Stat))?;
            return Ok(());
        };
        match maildrop.stat().await {
            Ok((count, octets)) => ctx.send(Reply::ok(format!("{count} {octets}")))?,
            Err(e) => {
                warn!(uid = %ctx.session.uid, error = %e, "Maildrop stat failed");
                ctx.send(command_failed(Verb::Stat))?;
            }
        }
        Ok(())
    }
}

/// LIST [msg] - message sizes, all or one.
pub struct ListHandler;

#[async_trait]
impl Handler for ListHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Transaction)
    }

    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult {
        let Some(maildrop) = maildrop_of(ctx) else {
            ctx.send(command_failed(Verb::List))?;
            return Ok(());
        };
        let index = if req.args().is_empty() {
            None
        } else {
            match parse_index(req.args()) {
                Some(index) => Some(index),
                None => {
                    ctx.send(invalid_message_id())?;
                    return Ok(());
                }
            }
        };
        let outcome = maildrop.list(index).await;
        send_listing(ctx, Verb::List, outcome).await
    }
}

/// UIDL [msg] - stable unique identifiers, all or one.
pub struct UidlHandler;

#[async_trait]
impl Handler for UidlHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Transaction)
    }

    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult {
        let Some(maildrop) = maildrop_of(ctx) else {
            ctx.send(command_failed(Verb::Uidl))?;
            return Ok(());
        };
        let index = if req.args().is_empty() {
            None
        } else {
            match parse_index(req.args()) {
                Some(index) => Some(index),
                None => {
                    ctx.send(invalid_message_id())?;
                    return Ok(());
                }
            }
        };
        let outcome = maildrop.uidl(index).await;
        send_listing(ctx, Verb::Uidl, outcome).await
    }
}

/// RETR msg - streams a stored message.
pub struct RetrHandler;

#[async_trait]
impl Handler for RetrHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Transaction)
    }

    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult {
        let Some(maildrop) = maildrop_of(ctx) else {
            ctx.send(command_failed(Verb::Retr))?;
            return Ok(());
        };
        let Some(index) = parse_index(req.args()) else {
            ctx.send(invalid_message_id())?;
            return Ok(());
        };
        match maildrop.retr(index).await {
            Ok(Some(message)) => {
                ctx.send(Reply::ok(format!("{} octets", message.len())))?;
                ctx.send(Reply::Raw(message))?;
                ctx.send(Reply::End)?;
            }
            Ok(None) => {
                ctx.send(invalid_message_id())?;
            }
            Err(e) => {
                warn!(uid = %ctx.session.uid, error = %e, "Maildrop retrieve failed");
                ctx.send(command_failed(Verb::Retr))?;
            }
        }
        Ok(())
    }
}

/// DELE msg - marks a message for deletion at QUIT.
pub struct DeleHandler;

#[async_trait]
impl Handler for DeleHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Transaction)
    }

    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult {
        let Some(maildrop) = maildrop_of(ctx) else {
            ctx.send(command_failed(Verb::Dele))?;
            return Ok(());
        };
        let Some(index) = parse_index(req.args()) else {
            ctx.send(invalid_message_id())?;
            return Ok(());
        };
        match maildrop.dele(index).await {
            Ok(true) => ctx.send(Reply::ok("msg deleted"))?,
            Ok(false) => ctx.send(invalid_message_id())?,
            Err(e) => {
                warn!(uid = %ctx.session.uid, error = %e, "Maildrop delete failed");
                ctx.send(command_failed(Verb::Dele))?;
            }
        }
        Ok(())
    }
}

/// RSET - clears all deletion marks.
pub struct RsetHandler;

#[async_trait]
impl Handler for RsetHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Transaction)
    }

    async fn handle(&self, ctx: &mut Context<'_>, _req: &Request<'_>) -> HandlerResult {
        let Some(maildrop) = maildrop_of(ctx) else {
            ctx.send(command_failed(Verb::Rset))?;
            return Ok(());
        };
        match maildrop.rset().await {
            Ok(()) => ctx.send(Reply::ok(""))?,
            Err(e) => {
                warn!(uid = %ctx.session.uid, error = %e, "Maildrop reset failed");
                ctx.send(command_failed(Verb::Rset))?;
            }
        }
        Ok(())
    }
}
