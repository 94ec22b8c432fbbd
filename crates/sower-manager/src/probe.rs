//! Bounded retry loop for connecting to a plugin socket.

use std::io;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use socket2::{Domain, SockAddr, Socket, Type};
use tracing::debug;

use crate::error::PluginError;

const PROBE_TARGET: &str = "sower_manager::probe";
const CONNECT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Polls `address` until a connection succeeds or `timeout` elapses.
///
/// A single failed attempt is not fatal: a freshly launched plugin may
/// still be initialising its listener. The first attempt happens
/// immediately; subsequent attempts wait `interval` between them.
///
/// # Errors
///
/// Returns [`PluginError::ConnectTimeout`] once the deadline passes
/// without a successful connection.
pub fn probe(
    address: &Path,
    interval: Duration,
    timeout: Duration,
) -> Result<UnixStream, PluginError> {
    let deadline = Instant::now() + timeout;
    loop {
        match connect(address) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                if Instant::now() >= deadline {
                    debug!(
                        target: PROBE_TARGET,
                        address = %address.display(),
                        error = %error,
                        "probe deadline exceeded"
                    );
                    return Err(PluginError::ConnectTimeout {
                        address: address.to_path_buf(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                thread::sleep(interval);
            }
        }
    }
}

/// Single connection attempt with a bounded per-attempt timeout.
pub(crate) fn connect(address: &Path) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let sock_addr = SockAddr::unix(address)?;
    socket.connect_timeout(&sock_addr, CONNECT_ATTEMPT_TIMEOUT)?;
    Ok(UnixStream::from(std::os::fd::OwnedFd::from(socket)))
}
