//! # slpop-proto
//!
//! A Rust library for the wire side of POP3 (RFC 1939): client command
//! parsing, typed server replies with exact rendering, and the SASL
//! payload handling used by the AUTH command.
//!
//! ## Features
//!
//! - Command parsing into a closed verb set, with the raw token and
//!   argument string preserved for error echoes
//! - Typed server replies covering status lines, response codes
//!   (RFC 2449), multi-line payloads and the SASL continuation prompt
//! - PLAIN credential decoding and encoding (RFC 4616)
//! - Session stage and receiver mode types shared with server code
//! - Optional Tokio integration: a CRLF line codec for framed transports

#![deny(clippy::all)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing commands
//!
//! ```rust
//! use slpop_proto::{Request, Verb};
//!
//! let req = Request::parse("retr 2").expect("line starts with a verb");
//! assert_eq!(req.verb(), Some(Verb::Retr));
//! assert_eq!(req.token(), "retr");
//! assert_eq!(req.args(), "2");
//! ```
//!
//! ### Rendering replies
//!
//! ```rust
//! use slpop_proto::{Reply, RespCode};
//!
//! assert_eq!(Reply::ok("User accepted").to_string(), "+OK User accepted");
//! assert_eq!(
//!     Reply::coded(RespCode::InUse, "You already have a POP session running").to_string(),
//!     "-ERR [IN-USE] You already have a POP session running",
//! );
//! assert_eq!(Reply::Continue(String::new()).to_string(), "+ ");
//! ```

pub mod command;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod response;
pub mod sasl;
pub mod state;

pub use self::command::{Request, Verb};
pub use self::error::ProtocolError;
#[cfg(feature = "tokio")]
pub use self::line::Pop3Codec;
pub use self::response::{Reply, RespCode};
pub use self::sasl::{
    decode_base64, encode_base64, encode_plain, encode_plain_with_authzid, PlainCredentials,
    SaslError,
};
pub use self::state::{ReceiverMode, SessionStage};
