//! Authentication stage handlers (USER, PASS, AUTH) and the SASL
//! continuation path.
//!
//! USER/PASS and AUTH both funnel into the same login sequence:
//! canonicalize the username, claim the per-user session slot, open
//! the maildrop, then move the session to the transaction stage.

use async_trait::async_trait;
use slpop_proto::{Reply, Request, RespCode, SessionStage};
use tracing::{debug, info, warn};

use super::{Context, Handler, HandlerResult};
use crate::auth::{Identity, MechanismStep, PendingSasl};
use crate::error::{LoginError, MechanismError};

/// USER - records the username for a following PASS.
pub struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Authentication)
    }

    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult {
        let user = req.args();
        if user.is_empty() {
            ctx.send(Reply::err("User not set, try: USER <username>"))?;
            return Ok(());
        }
        ctx.session.pending_user = Some(user.to_string());
        ctx.send(Reply::ok("User accepted"))?;
        Ok(())
    }
}

/// PASS - verifies the USER/PASS pair against the credential backend.
pub struct PassHandler;

#[async_trait]
impl Handler for PassHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Authentication)
    }

    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult {
        let Some(user) = ctx.session.pending_user.clone() else {
            ctx.send(Reply::err("USER not yet set"))?;
            return Ok(());
        };
        attempt_login(ctx, &user, req.args()).await
    }
}

/// AUTH - starts a SASL exchange with the named mechanism.
pub struct AuthHandler;

#[async_trait]
impl Handler for AuthHandler {
    fn stage(&self) -> Option<SessionStage> {
        Some(SessionStage::Authentication)
    }

    async fn handle(&self, ctx: &mut Context<'_>, req: &Request<'_>) -> HandlerResult {
        let args = req.args();
        if args.is_empty() {
            ctx.send(Reply::err("Invalid authentication method"))?;
            return Ok(());
        }

        let (name, initial) = match args.split_once(' ') {
            Some((name, rest)) => (name, Some(rest.trim())),
            None => (args, None),
        };
        let mechanism = name.to_uppercase();

        let Some(implementation) = ctx.state.mechanisms.get(&mechanism) else {
            ctx.send(Reply::err("Unrecognized authentication type"))?;
            return Ok(());
        };

        let step = implementation.begin(initial);
        advance_sasl(ctx, mechanism, step).await
    }
}

/// Feed one client line into the pending SASL exchange.
///
/// Called by the connection loop instead of command dispatch while an
/// exchange is open. Taking the exchange out of the session up front
/// returns the connection to command mode on every path; only a fresh
/// challenge re-arms it.
pub async fn continue_sasl(ctx: &mut Context<'_>, line: &str) -> HandlerResult {
    let Some(mut pending) = ctx.session.sasl.take() else {
        return Ok(());
    };

    if line.trim() == "*" {
        ctx.send(MechanismError::Aborted.to_reply())?;
        return Ok(());
    }

    let step = pending.session.feed(line);
    advance_sasl(ctx, pending.mechanism, step).await
}

/// Apply one mechanism step: park a challenge or finish the exchange.
async fn advance_sasl(
    ctx: &mut Context<'_>,
    mechanism: String,
    step: MechanismStep,
) -> HandlerResult {
    match step {
        MechanismStep::Challenge { prompt, next } => {
            ctx.session.sasl = Some(PendingSasl {
                mechanism,
                session: next,
            });
            ctx.send(Reply::Continue(prompt))?;
            Ok(())
        }
        MechanismStep::Done(Ok(request)) => {
            // An authorization identity is honored only when it names
            // the authenticating user.
            if !request.authzid.is_empty() && request.authzid != request.authcid {
                ctx.send(Reply::coded(
                    RespCode::Auth,
                    "Not authorized to requested authorization identity",
                ))?;
                return Ok(());
            }
            attempt_login(ctx, &request.authcid, &request.password).await
        }
        MechanismStep::Done(Err(e)) => {
            ctx.send(e.to_reply())?;
            Ok(())
        }
    }
}

/// Verify a username/password pair and log the session in on success.
async fn attempt_login(ctx: &mut Context<'_>, username: &str, password: &str) -> HandlerResult {
    let Some(verifier) = ctx.state.verifier.clone() else {
        ctx.send(Reply::coded(
            RespCode::Auth,
            "Invalid login: no credential backend configured",
        ))?;
        return Ok(());
    };

    match verifier.verify(username, password).await {
        Ok(identity) => login(ctx, identity).await,
        Err(reject) => {
            debug!(uid = %ctx.session.uid, user = username, "Authentication rejected");
            ctx.send(reject.to_reply())?;
            Ok(())
        }
    }
}

/// Bind a verified identity to this session and enter the transaction
/// stage.
///
/// The session-registry claim happens before the maildrop is opened,
/// so a concurrent second login observes IN-USE rather than a backend
/// error; every failure path after the claim releases it again.
async fn login(ctx: &mut Context<'_>, identity: Identity) -> HandlerResult {
    let user = identity.username.trim().to_lowercase();
    if user.is_empty() {
        ctx.send(LoginError::EmptyUser.to_reply())?;
        return Ok(());
    }

    if !ctx.state.sessions.claim(&user, &ctx.session.uid) {
        ctx.send(LoginError::InUse.to_reply())?;
        return Ok(());
    }

    let Some(factory) = ctx.state.maildrops.clone() else {
        ctx.state.sessions.release(&user, &ctx.session.uid);
        ctx.send(LoginError::NoBackend.to_reply())?;
        return Ok(());
    };

    match factory.open(&user, &identity.info).await {
        Ok(maildrop) => {
            ctx.session.user = Some(user.clone());
            ctx.session.user_info = identity.info;
            ctx.session.maildrop = Some(maildrop);
            ctx.session.stage = SessionStage::Transaction;
            info!(uid = %ctx.session.uid, user = %user, "Login successful");
            ctx.send(Reply::ok("You are now logged in"))?;
            Ok(())
        }
        Err(e) => {
            ctx.state.sessions.release(&user, &ctx.session.uid);
            warn!(uid = %ctx.session.uid, user = %user, error = %e, "Failed to open maildrop");
            ctx.send(LoginError::Maildrop(e).to_reply())?;
            Ok(())
        }
    }
}
