//! SASL payload handling for the AUTH command.
//!
//! Only the PLAIN mechanism (RFC 4616) ships with the server, but the
//! base64 plumbing here serves any line-based mechanism. Decoding checks
//! structure only; whether a non-empty authorization identity is honored
//! is acceptance policy and belongs to the server.
//!
//! # Reference
//! - RFC 5034 (POP3 SASL): <https://tools.ietf.org/html/rfc5034>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

/// Structural errors while decoding SASL payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SaslError {
    /// Payload was not valid base64.
    #[error("invalid base64 payload")]
    InvalidBase64,

    /// Decoded payload did not have the PLAIN three-field shape, or the
    /// authentication identity was empty.
    #[error("malformed PLAIN credentials")]
    MalformedCredentials,
}

/// Decode one base64 exchange line strictly.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, SaslError> {
    BASE64
        .decode(data.trim())
        .map_err(|_| SaslError::InvalidBase64)
}

/// Encode bytes for one base64 exchange line.
pub fn encode_base64(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Build a PLAIN payload for `authcid`/`password` with no authorization
/// identity (the common client case).
pub fn encode_plain(authcid: &str, password: &str) -> String {
    encode_plain_with_authzid("", authcid, password)
}

/// Build a PLAIN payload with an explicit authorization identity.
pub fn encode_plain_with_authzid(authzid: &str, authcid: &str, password: &str) -> String {
    let mut raw = Vec::with_capacity(authzid.len() + authcid.len() + password.len() + 2);
    raw.extend_from_slice(authzid.as_bytes());
    raw.push(0);
    raw.extend_from_slice(authcid.as_bytes());
    raw.push(0);
    raw.extend_from_slice(password.as_bytes());
    BASE64.encode(raw)
}

/// The three fields of a decoded PLAIN payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainCredentials {
    /// Authorization identity: on whose behalf the client acts.
    /// Usually empty, meaning "derive it from `authcid`".
    pub authzid: String,
    /// Authentication identity: who is proving their identity.
    pub authcid: String,
    /// Password for `authcid`.
    pub password: String,
}

impl PlainCredentials {
    /// Parse a base64 PLAIN payload into its three NUL-separated fields.
    ///
    /// Fails unless exactly three fields are present and `authcid` is
    /// non-empty. An empty password is legal and passed through.
    pub fn parse(payload: &str) -> Result<Self, SaslError> {
        let raw = decode_base64(payload)?;
        let fields: Vec<&[u8]> = raw.split(|&byte| byte == 0).collect();
        let &[authzid, authcid, password] = &fields[..] else {
            return Err(SaslError::MalformedCredentials);
        };
        if authcid.is_empty() {
            return Err(SaslError::MalformedCredentials);
        }
        Ok(Self {
            authzid: latin1(authzid),
            authcid: latin1(authcid),
            password: latin1(password),
        })
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}
