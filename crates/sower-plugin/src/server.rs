//! Unix domain socket server loop for plugin processes.
//!
//! [`PluginServer`] binds the deterministic socket address, replacing a
//! stale socket file left behind by a crashed predecessor, and serves one
//! thread per connection. Each connection carries a sequence of JSONL
//! calls answered in order until the peer hangs up.

use std::env;
use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use sower_proto::{
    PingResponse, PluginCall, PluginReply, UserDataResponse, WireError, read_message, write_message,
};

use crate::provider::UserDataProvider;

const SERVER_TARGET: &str = "sower_plugin::server";
const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Errors raised while binding or running a plugin server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The process's own executable path could not be determined.
    #[error("failed to determine own executable path: {source}")]
    CurrentExe {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// An existing file at the socket path could not be inspected.
    #[error("failed to inspect existing socket file '{}': {source}", path.display())]
    SocketMetadata {
        /// Socket path that was inspected.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The socket path is occupied by something that is not a socket.
    #[error("refusing to replace non-socket file '{}'", path.display())]
    NotASocket {
        /// Offending path.
        path: PathBuf,
    },
    /// Another process is already serving the socket.
    #[error("socket '{}' is already served by another process", path.display())]
    AddressInUse {
        /// Socket path that is in use.
        path: PathBuf,
    },
    /// Probing an existing socket file failed for a reason other than an
    /// absent listener.
    #[error("failed to probe existing socket '{}': {source}", path.display())]
    SocketProbe {
        /// Socket path that was probed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale socket file failed.
    #[error("failed to remove stale socket file '{}': {source}", path.display())]
    RemoveStale {
        /// Socket path that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Binding the listener failed.
    #[error("failed to bind socket '{}': {source}", path.display())]
    Bind {
        /// Socket path that could not be bound.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to nonblocking mode failed.
    #[error("failed to configure listener: {source}")]
    NonBlocking {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The accept-loop thread panicked.
    #[error("plugin server thread panicked")]
    ThreadPanic,
}

/// Serves the plugin protocol on a Unix domain socket.
pub struct PluginServer {
    provider: Arc<dyn UserDataProvider>,
    address: PathBuf,
    executable: PathBuf,
    listener: UnixListener,
}

impl std::fmt::Debug for PluginServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginServer")
            .field("address", &self.address)
            .field("executable", &self.executable)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

impl PluginServer {
    /// Binds the server socket, replacing a stale socket file left behind
    /// by a previous process.
    ///
    /// # Errors
    ///
    /// Returns a [`ServeError`] when the executable path cannot be
    /// determined, the socket path is occupied by a live listener or a
    /// non-socket file, or binding fails.
    pub fn bind(
        provider: impl UserDataProvider,
        address: impl Into<PathBuf>,
    ) -> Result<Self, ServeError> {
        let executable = env::current_exe().map_err(|source| ServeError::CurrentExe { source })?;
        Self::bind_with_executable(provider, address, executable)
    }

    /// Binds the server socket and reports `executable` from `Ping` instead
    /// of the process's own path. Exists for harnesses that serve the
    /// protocol in-process.
    ///
    /// # Errors
    ///
    /// Returns a [`ServeError`] when the socket path is occupied or
    /// binding fails.
    pub fn bind_with_executable(
        provider: impl UserDataProvider,
        address: impl Into<PathBuf>,
        executable: impl Into<PathBuf>,
    ) -> Result<Self, ServeError> {
        let address = address.into();
        let listener = bind_unix(&address)?;
        Ok(Self {
            provider: Arc::new(provider),
            address,
            executable: executable.into(),
            listener,
        })
    }

    /// Returns the socket address the server is bound to.
    #[must_use]
    pub fn address(&self) -> &Path {
        &self.address
    }

    /// Serves connections on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::NonBlocking`] when the listener cannot be
    /// switched to the polled accept mode.
    pub fn start(self) -> Result<ServerHandle, ServeError> {
        if let Err(source) = self.listener.set_nonblocking(true) {
            cleanup_socket(&self.address);
            return Err(ServeError::NonBlocking { source });
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || run_accept_loop(&self, &flag));
        Ok(ServerHandle {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Serves connections until the process is terminated.
    ///
    /// Plugin binaries call this from `main`; the process exits when the
    /// manager terminates its process group.
    ///
    /// # Errors
    ///
    /// Returns a [`ServeError`] when the accept loop cannot be started or
    /// its thread panics.
    pub fn run(self) -> Result<(), ServeError> {
        let handle = self.start()?;
        handle.join()
    }
}

/// Handle to a plugin server running on a background thread.
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signals the accept loop to stop after its next poll.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::ThreadPanic`] when the loop thread panicked.
    pub fn join(mut self) -> Result<(), ServeError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| ServeError::ThreadPanic)?;
        }
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(server: &PluginServer, shutdown: &AtomicBool) {
    info!(
        target: SERVER_TARGET,
        address = %server.address.display(),
        "plugin server listening"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match server.listener.accept() {
            Ok((stream, _)) => {
                last_error = None;
                if let Err(error) = stream.set_nonblocking(false) {
                    warn!(
                        target: SERVER_TARGET,
                        error = %error,
                        "failed to configure accepted connection"
                    );
                    continue;
                }
                let provider = Arc::clone(&server.provider);
                let executable = server.executable.clone();
                thread::spawn(move || serve_connection(&stream, provider.as_ref(), &executable));
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: SERVER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    cleanup_socket(&server.address);
}

fn serve_connection(stream: &UnixStream, provider: &dyn UserDataProvider, executable: &Path) {
    let mut reader = match stream.try_clone() {
        Ok(clone) => io::BufReader::new(clone),
        Err(error) => {
            warn!(
                target: SERVER_TARGET,
                error = %error,
                "failed to clone connection stream"
            );
            return;
        }
    };
    let mut writer = match stream.try_clone() {
        Ok(clone) => clone,
        Err(error) => {
            warn!(
                target: SERVER_TARGET,
                error = %error,
                "failed to clone connection stream"
            );
            return;
        }
    };
    loop {
        let call: PluginCall = match read_message(&mut reader) {
            Ok(call) => call,
            Err(WireError::ConnectionClosed) => return,
            Err(error) => {
                debug!(
                    target: SERVER_TARGET,
                    error = %error,
                    "dropping connection after undecodable call"
                );
                let _ = write_message(
                    &mut writer,
                    &PluginReply::Error {
                        message: error.to_string(),
                    },
                );
                return;
            }
        };
        let reply = match call {
            PluginCall::Ping(_) => PluginReply::Ping(PingResponse {
                executable: executable.to_path_buf(),
            }),
            PluginCall::UserData(request) => {
                PluginReply::UserData(match provider.user_data(&request) {
                    Ok(user_data) => UserDataResponse::data(user_data),
                    Err(error) => {
                        debug!(
                            target: SERVER_TARGET,
                            error = %error,
                            "provider rejected user-data request"
                        );
                        UserDataResponse::error(error.to_string())
                    }
                })
            }
        };
        if let Err(error) = write_message(&mut writer, &reply) {
            debug!(
                target: SERVER_TARGET,
                error = %error,
                "failed to write reply, dropping connection"
            );
            return;
        }
    }
}

/// Binds `path`, clearing a stale socket file when nothing answers it.
///
/// A path occupied by a non-socket file is never deleted; a path with a
/// live listener is reported as in use so two plugins cannot fight over
/// one address.
fn bind_unix(path: &Path) -> Result<UnixListener, ServeError> {
    if path.exists() {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| ServeError::SocketMetadata {
                path: path.to_path_buf(),
                source,
            })?;
        if !metadata.file_type().is_socket() {
            return Err(ServeError::NotASocket {
                path: path.to_path_buf(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ServeError::AddressInUse {
                    path: path.to_path_buf(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                debug!(
                    target: SERVER_TARGET,
                    address = %path.display(),
                    "removing stale socket file"
                );
                fs::remove_file(path).map_err(|source| ServeError::RemoveStale {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(ServeError::SocketProbe {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ServeError::Bind {
        path: path.to_path_buf(),
        source,
    })
}

fn cleanup_socket(path: &Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: SERVER_TARGET,
            address = %path.display(),
            error = %error,
            "failed to remove socket file"
        );
    }
}
