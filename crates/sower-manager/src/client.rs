//! Synchronous JSONL client for the plugin protocol.

use std::io::BufReader;
use std::os::unix::net::UnixStream;

use tracing::debug;

use sower_proto::{
    PingRequest, PingResponse, PluginCall, PluginReply, UserDataRequest, UserDataResponse,
    WireError, read_message, write_message,
};

use crate::error::PluginError;

const CLIENT_TARGET: &str = "sower_manager::client";

/// Client side of one plugin connection.
///
/// Calls are strict request/reply: one JSONL line out, one line back. The
/// connection carries one call at a time; the manager serialises access
/// with a per-handle lock.
#[derive(Debug)]
pub struct PluginClient {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl PluginClient {
    /// Wraps an established connection.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Transport`] when the stream cannot be cloned
    /// into read and write halves.
    pub fn new(stream: UnixStream) -> Result<Self, PluginError> {
        let reader = stream
            .try_clone()
            .map_err(|source| PluginError::Transport {
                source: WireError::Io(source),
            })?;
        Ok(Self {
            reader: BufReader::new(reader),
            writer: stream,
        })
    }

    /// Issues the identity check.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Transport`] for connection-level failures
    /// and unexpected replies.
    pub fn ping(&mut self) -> Result<PingResponse, PluginError> {
        match self.call(&PluginCall::Ping(PingRequest::default()))? {
            PluginReply::Ping(response) => Ok(response),
            reply => Err(unexpected_reply("ping", &reply)),
        }
    }

    /// Issues a user-data generation call and unwraps the response.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Application`] when the plugin answers with a
    /// non-empty `err` field and [`PluginError::Transport`] for
    /// connection-level failures and unexpected replies.
    pub fn user_data(&mut self, request: UserDataRequest) -> Result<String, PluginError> {
        match self.call(&PluginCall::UserData(Box::new(request)))? {
            PluginReply::UserData(UserDataResponse { user_data, err }) if err.is_empty() => {
                Ok(user_data)
            }
            PluginReply::UserData(UserDataResponse { err, .. }) => {
                Err(PluginError::Application { message: err })
            }
            reply => Err(unexpected_reply("user_data", &reply)),
        }
    }

    fn call(&mut self, call: &PluginCall) -> Result<PluginReply, PluginError> {
        write_message(&mut self.writer, call)?;
        let reply: PluginReply = read_message(&mut self.reader)?;
        if let PluginReply::Error { message } = reply {
            debug!(
                target: CLIENT_TARGET,
                message = %message,
                "plugin reported a protocol error"
            );
            return Err(PluginError::Transport {
                source: WireError::Peer { message },
            });
        }
        Ok(reply)
    }
}

fn unexpected_reply(operation: &'static str, reply: &PluginReply) -> PluginError {
    debug!(
        target: CLIENT_TARGET,
        operation,
        reply = ?reply,
        "plugin answered a different operation"
    );
    PluginError::Transport {
        source: WireError::UnexpectedReply { operation },
    }
}
