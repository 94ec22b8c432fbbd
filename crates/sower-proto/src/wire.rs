//! JSONL wire framing for the plugin protocol.
//!
//! Every call and reply is one serde-tagged JSON object on a single
//! newline-terminated line. The operation set is closed: a plugin serves
//! `Ping` and `UserData` and nothing else, so neither side performs any
//! dynamic method lookup. Messages are bounded by [`MAX_MESSAGE_BYTES`] to
//! keep a misbehaving peer from exhausting memory.

use std::io::{BufRead, Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::{PingRequest, PingResponse, UserDataRequest, UserDataResponse};

/// Upper bound for a single wire message. Generous enough for large
/// cloud-init documents.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Remote operations a plugin serves.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PluginCall {
    /// Identity and liveness check.
    Ping(PingRequest),
    /// User-data generation.
    UserData(Box<UserDataRequest>),
}

/// Replies a plugin sends back, one per call.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum PluginReply {
    /// Answer to [`PluginCall::Ping`].
    Ping(PingResponse),
    /// Answer to [`PluginCall::UserData`].
    UserData(UserDataResponse),
    /// Protocol-level failure: the call could not be decoded or served.
    Error {
        /// Description of the protocol violation.
        message: String,
    },
}

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// The peer closed the stream before a full message arrived.
    #[error("connection closed by peer")]
    ConnectionClosed,
    /// A message exceeded [`MAX_MESSAGE_BYTES`].
    #[error("message of {size} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit")]
    MessageTooLarge {
        /// Observed message size in bytes.
        size: usize,
    },
    /// The peer reported a protocol-level failure.
    #[error("peer reported protocol error: {message}")]
    Peer {
        /// Message carried by the peer's error reply.
        message: String,
    },
    /// The peer answered a different operation than the one called.
    #[error("unexpected reply to '{operation}' call")]
    UnexpectedReply {
        /// Operation that was called.
        operation: &'static str,
    },
    /// Reading or writing the underlying stream failed.
    #[error("wire I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A message failed to encode or decode as JSON.
    #[error("wire serialisation failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Writes `message` as one JSONL line and flushes the writer.
///
/// # Errors
///
/// Returns [`WireError::Serde`] when encoding fails and [`WireError::Io`]
/// when the stream rejects the write.
pub fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), WireError>
where
    W: Write,
    T: Serialize,
{
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads one JSONL line from `reader` and decodes it as `T`.
///
/// # Errors
///
/// Returns [`WireError::ConnectionClosed`] on a clean end of stream,
/// [`WireError::MessageTooLarge`] when the line exceeds
/// [`MAX_MESSAGE_BYTES`], and [`WireError::Io`] / [`WireError::Serde`] for
/// stream and decoding failures.
pub fn read_message<R, T>(reader: &mut R) -> Result<T, WireError>
where
    R: BufRead,
    T: DeserializeOwned,
{
    let mut line = String::new();
    // The extra byte lets an oversized message be detected instead of
    // silently truncating exactly at the limit.
    let limit = MAX_MESSAGE_BYTES as u64 + 1;
    let bytes_read = reader.by_ref().take(limit).read_line(&mut line)?;
    if bytes_read == 0 {
        return Err(WireError::ConnectionClosed);
    }
    if bytes_read > MAX_MESSAGE_BYTES {
        return Err(WireError::MessageTooLarge { size: bytes_read });
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn encode<T: Serialize>(message: &T) -> String {
        let mut buffer = Vec::new();
        write_message(&mut buffer, message).expect("encode message");
        String::from_utf8(buffer).expect("utf8 line")
    }

    #[test]
    fn ping_call_uses_the_call_tag() {
        let line = encode(&PluginCall::Ping(PingRequest::default()));
        assert_eq!(line, "{\"call\":\"ping\"}\n");
    }

    #[test]
    fn error_reply_round_trips_through_a_stream() {
        let line = encode(&PluginReply::Error {
            message: "bad call".into(),
        });
        let mut reader = BufReader::new(line.as_bytes());
        let reply: PluginReply = read_message(&mut reader).expect("decode reply");
        assert_eq!(
            reply,
            PluginReply::Error {
                message: "bad call".into()
            }
        );
    }

    #[test]
    fn unknown_call_name_is_a_serde_error() {
        let mut reader = BufReader::new("{\"call\":\"reboot\"}\n".as_bytes());
        let result: Result<PluginCall, WireError> = read_message(&mut reader);
        assert!(matches!(result, Err(WireError::Serde(_))));
    }

    #[test]
    fn end_of_stream_reads_as_connection_closed() {
        let mut reader = BufReader::new("".as_bytes());
        let result: Result<PluginReply, WireError> = read_message(&mut reader);
        assert!(matches!(result, Err(WireError::ConnectionClosed)));
    }

    #[test]
    fn consecutive_messages_decode_from_one_stream() {
        let mut lines = encode(&PluginCall::Ping(PingRequest::default()));
        lines.push_str(&encode(&PluginCall::Ping(PingRequest::default())));
        let mut reader = BufReader::new(lines.as_bytes());
        for _ in 0..2 {
            let call: PluginCall = read_message(&mut reader).expect("decode call");
            assert!(matches!(call, PluginCall::Ping(_)));
        }
    }
}
