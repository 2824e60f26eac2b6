//! CRLF line codec for tokio.
//!
//! Decodes a stream of byte chunks into CRLF-terminated lines and
//! encodes [`Reply`] values back to the wire. Only the two-byte CR LF
//! sequence terminates a line; a lone LF is payload. Inbound bytes are
//! decoded one-to-one into chars, so no byte sequence is lossy. Text
//! replies encode the same way, one byte per char, with chars above
//! U+00FF rendered as `?`; raw payloads pass through untouched.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error;
use crate::response::Reply;

/// Default maximum line length, terminator included.
///
/// Generous enough for AUTH exchanges carrying base64 blobs while still
/// bounding a hostile peer's buffer growth.
pub const DEFAULT_MAX_LINE_LEN: usize = 8192;

/// Line codec for POP3 sessions.
pub struct Pop3Codec {
    /// Index of the next byte to check for the line terminator.
    next_index: usize,
    /// Maximum line length.
    max_len: usize,
}

impl Pop3Codec {
    /// Create a codec with the default line length limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Create a codec with a custom line length limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for Pop3Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for Pop3Codec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        // Resume one byte early in case the previous chunk ended on a CR.
        let start = self.next_index.saturating_sub(1);
        if let Some(offset) = src[start..].windows(2).position(|pair| pair == b"\r\n") {
            let line = src.split_to(start + offset + 2);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(error::ProtocolError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let body = &line[..line.len() - 2];
            Ok(Some(body.iter().map(|&byte| char::from(byte)).collect()))
        } else {
            // No complete line yet - remember where we stopped.
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(error::ProtocolError::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                // An unterminated fragment never became a command.
                src.clear();
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Reply> for Pop3Codec {
    type Error = error::ProtocolError;

    fn encode(&mut self, reply: Reply, dst: &mut BytesMut) -> error::Result<()> {
        match &reply {
            Reply::Raw(bytes) => dst.extend_from_slice(bytes),
            other => {
                let text = other.to_string();
                dst.reserve(text.len() + 2);
                // Mirror decode: one byte per char. Chars above U+00FF
                // have no single-byte form and render as '?'.
                dst.extend(text.chars().map(|ch| u8::try_from(ch).unwrap_or(b'?')));
            }
        }
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
