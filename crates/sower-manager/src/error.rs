//! Error taxonomy for plugin lifecycle operations.
//!
//! All errors use `thiserror`-derived enums with structured context so
//! callers can distinguish the failure classes that matter to them:
//! transport failures (connection-level) are separate from application
//! failures (the plugin answered, but with an error message).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use sower_proto::WireError;

/// Errors raised by the plugin manager and its collaborators.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No search directory contained the plugin binary.
    #[error("plugin binary '{name}' not found in any search directory")]
    NotFound {
        /// Binary file name that was looked up.
        name: String,
    },

    /// A process is listening on the plugin socket but reports a different
    /// executable than the one the resolver found.
    #[error(
        "cannot reuse plugin at '{}': want executable '{}', got '{}'",
        address.display(), want.display(), got.display()
    )]
    ExecutableMismatch {
        /// Socket address the foreign process is bound to.
        address: PathBuf,
        /// Executable path the resolver expects.
        want: PathBuf,
        /// Executable path the running process reported.
        got: PathBuf,
    },

    /// The plugin listener did not become reachable before the deadline.
    #[error(
        "timed out after {timeout_ms} ms waiting for plugin socket '{}'",
        address.display()
    )]
    ConnectTimeout {
        /// Socket address that was probed.
        address: PathBuf,
        /// Configured probe deadline in milliseconds.
        timeout_ms: u64,
    },

    /// Spawning the plugin binary failed.
    #[error("failed to spawn plugin '{}': {source}", executable.display())]
    Spawn {
        /// Binary that could not be started.
        executable: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The remote call failed below the application layer.
    #[error("plugin transport failed: {source}")]
    Transport {
        /// Underlying wire failure.
        #[from]
        source: WireError,
    },

    /// The plugin answered the call with an application-level failure.
    #[error("plugin reported failure: {message}")]
    Application {
        /// Message carried in the response's `err` field.
        message: String,
    },

    /// Terminating the plugin process group failed.
    #[error("failed to terminate plugin process group {pgid}: {source}")]
    Terminate {
        /// Process group that was signalled.
        pgid: i32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The manager's own executable path could not be determined.
    #[error("failed to determine manager executable path: {source}")]
    CurrentExe {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The manager's working directory could not be determined.
    #[error("failed to determine working directory: {source}")]
    WorkingDir {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl PluginError {
    /// Returns `true` for connection-level failures, as opposed to
    /// application-level failures reported by a healthy plugin.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
