//! Session housekeeping handlers (CAPA, QUIT).

use async_trait::async_trait;
use slpop_proto::{Reply, Request, SessionStage};
use tracing::warn;

use super::{Context, Handler, HandlerError, HandlerResult};

/// CAPA - reveals server capabilities to the client.
///
/// Legal in every stage; the advertised list depends on the current
/// stage, and the SASL line is only shown before login.
pub struct CapaHandler;

#[async_trait]
impl Handler for CapaHandler {
    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult {
        if !req.args().is_empty() {
            ctx.send(Reply::err("Try: CAPA"))?;
            return Ok(());
        }

        ctx.send(Reply::ok("Capability list follows"))?;
        for capability in ctx.state.capabilities.for_stage(ctx.session.stage) {
            ctx.send(Reply::line(capability.clone()))?;
        }
        if ctx.session.stage == SessionStage::Authentication && !ctx.state.mechanisms.is_empty() {
            let names = ctx.state.mechanisms.names().join(" ");
            ctx.send(Reply::line(format!("SASL {names}")))?;
        }
        ctx.send(Reply::End)?;
        Ok(())
    }
}

/// QUIT - signs off and closes the connection.
///
/// From the transaction stage this enters the update stage and purges
/// messages marked for deletion before the sign-off. A purge failure
/// is logged but does not block the close.
pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, ctx: &mut Context<'_>, _req: &Request<'_>) -> HandlerResult {
        let purge = ctx.session.stage == SessionStage::Transaction;
        ctx.session.stage = SessionStage::Update;

        if purge {
            if let Some(maildrop) = ctx.session.maildrop.clone() {
                if let Err(e) = maildrop.remove_deleted().await {
                    warn!(uid = %ctx.session.uid, error = %e, "Failed to purge deleted messages");
                }
            }
        }

        ctx.send(Reply::ok("POP3 Server signing off"))?;
        Err(HandlerError::Quit)
    }
}
