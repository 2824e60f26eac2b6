//! Typed server replies and their wire rendering.
//!
//! [`Reply`] covers every unit of server output a POP3 session produces:
//! status lines, coded failures, multi-line payload lines, raw message
//! bytes and the SASL continuation prompt. `Display` renders the exact
//! wire text without the CRLF terminator; the codec appends that.

use std::fmt;

/// Machine-readable response codes carried in `-ERR` replies.
///
/// Advertised through the `RESP-CODES` and `AUTH-RESP-CODE` capabilities
/// (RFC 2449, RFC 3206).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespCode {
    /// Credentials were rejected or the SASL exchange failed.
    Auth,
    /// Server-side misconfiguration or failure, not the client's fault.
    Sys,
    /// The account already has an active session elsewhere.
    InUse,
}

impl RespCode {
    /// The code's name without brackets.
    pub const fn as_str(self) -> &'static str {
        match self {
            RespCode::Auth => "AUTH",
            RespCode::Sys => "SYS",
            RespCode::InUse => "IN-USE",
        }
    }
}

impl fmt::Display for RespCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of server output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Success status line; an empty detail renders as bare `+OK`.
    Ok(String),
    /// Failure status line; an empty detail renders as bare `-ERR`.
    Err(String),
    /// Failure status line with a bracketed response code.
    Coded(RespCode, String),
    /// SASL continuation request: `+ ` followed by server data, which
    /// for the shipped mechanisms is always empty.
    Continue(String),
    /// One line of a multi-line payload, written as-is.
    Line(String),
    /// Raw bytes written verbatim, used for RETR message payloads.
    Raw(Vec<u8>),
    /// The multi-line terminator, a line holding a single dot.
    End,
}

impl Reply {
    /// Success with detail text.
    pub fn ok(text: impl Into<String>) -> Self {
        Reply::Ok(text.into())
    }

    /// Failure with detail text.
    pub fn err(text: impl Into<String>) -> Self {
        Reply::Err(text.into())
    }

    /// Coded failure with detail text.
    pub fn coded(code: RespCode, text: impl Into<String>) -> Self {
        Reply::Coded(code, text.into())
    }

    /// One payload line of a multi-line response.
    pub fn line(text: impl Into<String>) -> Self {
        Reply::Line(text.into())
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok(text) if text.is_empty() => f.write_str("+OK"),
            Reply::Ok(text) => write!(f, "+OK {text}"),
            Reply::Err(text) if text.is_empty() => f.write_str("-ERR"),
            Reply::Err(text) => write!(f, "-ERR {text}"),
            Reply::Coded(code, text) if text.is_empty() => write!(f, "-ERR [{code}]"),
            Reply::Coded(code, text) => write!(f, "-ERR [{code}] {text}"),
            Reply::Continue(text) => write!(f, "+ {text}"),
            Reply::Line(text) => f.write_str(text),
            Reply::Raw(bytes) => {
                use fmt::Write;
                for &byte in bytes {
                    f.write_char(char::from(byte))?;
                }
                Ok(())
            }
            Reply::End => f.write_str("."),
        }
    }
}
