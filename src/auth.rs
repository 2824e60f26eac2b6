//! Credential verification and AUTH mechanism negotiation.
//!
//! Two collaborator seams live here. [`CredentialVerifier`] is the
//! pluggable backend that decides whether a username/password pair is
//! valid; both the USER/PASS flow and every AUTH mechanism funnel into
//! it. [`AuthMechanism`] is the per-mechanism exchange logic: it turns
//! command arguments and continuation lines into either another
//! challenge or a final [`AuthRequest`]. Mechanisms never talk to the
//! verifier themselves; the handler layer does, so the login sequence
//! is identical regardless of how the credentials arrived.
//!
//! The built-in [`PlainMechanism`] implements SASL PLAIN (RFC 4616)
//! over the POP3 AUTH command (RFC 5034).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use slpop_proto::PlainCredentials;

use crate::error::{AuthReject, MechanismError};

// ============================================================================
// Credential verification
// ============================================================================

/// A verified identity: the canonical username plus an opaque payload
/// the backend wants handed to the maildrop factory.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Canonical username as the backend knows it. The login sequence
    /// trims and lower-cases this before it becomes the session user.
    pub username: String,
    /// Opaque identity payload, forwarded to the maildrop factory.
    pub info: serde_json::Value,
}

/// Pluggable credential backend.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Check a username/password pair. `username` arrives exactly as
    /// the client sent it (trimmed); canonicalization happens after
    /// acceptance, on the returned identity.
    async fn verify(&self, username: &str, password: &str) -> Result<Identity, AuthReject>;
}

/// In-memory username/password table, the built-in verifier.
///
/// Lookup is an exact match on the stored key; the canonical username
/// is the stored key itself.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    accounts: HashMap<String, String>,
}

impl StaticCredentials {
    /// Create an empty credential table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account.
    pub fn add(&mut self, user: impl Into<String>, password: impl Into<String>) {
        self.accounts.insert(user.into(), password.into());
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no accounts exist.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, username: &str, password: &str) -> Result<Identity, AuthReject> {
        match self.accounts.get_key_value(username) {
            Some((stored_user, stored_password)) if stored_password == password => Ok(Identity {
                username: stored_user.clone(),
                info: json!({ "username": stored_user }),
            }),
            _ => Err(AuthReject::new("Invalid username or password")),
        }
    }
}

// ============================================================================
// Mechanism framework
// ============================================================================

/// Credentials extracted by a mechanism, ready for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// Authorization identity; empty means "same as `authcid`".
    pub authzid: String,
    /// Authentication identity, handed to the verifier as the username.
    pub authcid: String,
    /// Password, handed to the verifier verbatim.
    pub password: String,
}

/// One step of an AUTH exchange.
pub enum MechanismStep {
    /// The mechanism needs another line from the client. The prompt is
    /// rendered after `+ `; the boxed continuation consumes the line.
    Challenge {
        /// Challenge data for the continuation prompt; usually empty.
        prompt: String,
        /// Consumer for the client's next line.
        next: Box<dyn MechanismSession>,
    },
    /// The exchange is over, successfully or not.
    Done(Result<AuthRequest, MechanismError>),
}

/// An AUTH mechanism as registered on the server.
pub trait AuthMechanism: Send + Sync {
    /// Start an exchange. `initial` is the optional inline parameter
    /// from the AUTH command line.
    fn begin(&self, initial: Option<&str>) -> MechanismStep;
}

/// An in-progress exchange awaiting a continuation line.
pub trait MechanismSession: Send + Sync {
    /// Consume the client's continuation line.
    fn feed(&mut self, line: &str) -> MechanismStep;
}

/// An in-progress AUTH exchange parked on a connection.
///
/// While one of these is stored the connection is in response-await
/// mode: received lines bypass command dispatch and go to `session`.
pub struct PendingSasl {
    /// Upper-cased mechanism name, for logging.
    pub mechanism: String,
    /// The parked continuation.
    pub session: Box<dyn MechanismSession>,
}

// ============================================================================
// PLAIN (RFC 4616)
// ============================================================================

/// SASL PLAIN: a single base64 blob of `authzid NUL authcid NUL passwd`,
/// either inline on the AUTH command or as one continuation line.
pub struct PlainMechanism;

impl AuthMechanism for PlainMechanism {
    fn begin(&self, initial: Option<&str>) -> MechanismStep {
        match initial {
            Some(blob) => decode_plain(blob),
            None => MechanismStep::Challenge {
                prompt: String::new(),
                next: Box::new(PlainSession),
            },
        }
    }
}

struct PlainSession;

impl MechanismSession for PlainSession {
    fn feed(&mut self, line: &str) -> MechanismStep {
        decode_plain(line)
    }
}

fn decode_plain(blob: &str) -> MechanismStep {
    let outcome = match PlainCredentials::parse(blob) {
        Ok(creds) => Ok(AuthRequest {
            authzid: creds.authzid,
            authcid: creds.authcid,
            password: creds.password,
        }),
        Err(_) => Err(MechanismError::BadData),
    };
    MechanismStep::Done(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slpop_proto::{encode_plain, encode_plain_with_authzid};

    fn finish(step: MechanismStep) -> Result<AuthRequest, MechanismError> {
        match step {
            MechanismStep::Done(outcome) => outcome,
            MechanismStep::Challenge { .. } => panic!("expected a final step"),
        }
    }

    #[tokio::test]
    async fn test_static_credentials_accept() {
        let mut creds = StaticCredentials::new();
        creds.add("jdoe", "correct_password");

        let identity = creds.verify("jdoe", "correct_password").await.unwrap();
        assert_eq!(identity.username, "jdoe");
        assert_eq!(identity.info["username"], "jdoe");
    }

    #[tokio::test]
    async fn test_static_credentials_reject() {
        let mut creds = StaticCredentials::new();
        creds.add("jdoe", "correct_password");

        let err = creds.verify("jdoe", "wrong_password").await.unwrap_err();
        assert_eq!(err.reason, "Invalid username or password");

        let err = creds.verify("nobody", "correct_password").await.unwrap_err();
        assert_eq!(err.reason, "Invalid username or password");
    }

    #[tokio::test]
    async fn test_static_credentials_exact_match() {
        let mut creds = StaticCredentials::new();
        creds.add("jdoe", "pw");

        // The built-in table does not case-fold; that is the verifier's
        // call, not the server's.
        assert!(creds.verify("JDOE", "pw").await.is_err());
    }

    #[test]
    fn test_plain_inline_parameter() {
        let blob = encode_plain("jdoe", "correct_password");
        let request = finish(PlainMechanism.begin(Some(&blob))).unwrap();
        assert_eq!(request.authzid, "");
        assert_eq!(request.authcid, "jdoe");
        assert_eq!(request.password, "correct_password");
    }

    #[test]
    fn test_plain_challenge_then_line() {
        let MechanismStep::Challenge { prompt, mut next } = PlainMechanism.begin(None) else {
            panic!("expected a challenge");
        };
        assert!(prompt.is_empty());

        let blob = encode_plain_with_authzid("jdoe", "jdoe", "pw");
        let request = finish(next.feed(&blob)).unwrap();
        assert_eq!(request.authzid, "jdoe");
        assert_eq!(request.authcid, "jdoe");
        assert_eq!(request.password, "pw");
    }

    #[test]
    fn test_plain_rejects_garbage() {
        let err = finish(PlainMechanism.begin(Some("!!not-base64!!"))).unwrap_err();
        assert_eq!(err, MechanismError::BadData);
    }

    #[test]
    fn test_plain_rejects_wrong_field_count() {
        // Two fields only.
        let blob = slpop_proto::encode_base64(b"jdoe\0pw");
        let err = finish(PlainMechanism.begin(Some(&blob))).unwrap_err();
        assert_eq!(err, MechanismError::BadData);
    }

    #[test]
    fn test_plain_rejects_empty_authcid() {
        let blob = slpop_proto::encode_base64(b"\0\0pw");
        let err = finish(PlainMechanism.begin(Some(&blob))).unwrap_err();
        assert_eq!(err, MechanismError::BadData);
    }
}
