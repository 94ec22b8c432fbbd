//! Per-plugin connection handle with reuse negotiation.
//!
//! A handle is created lazily by the manager on the first request for an
//! operating system. Creation prefers adopting an already-running plugin:
//! a short connect-and-ping probe is cheaper than a duplicate process, and
//! it lets a restarted manager reattach to a warm plugin instead of
//! leaking one per restart.

use std::path::Path;
use std::process::Child;

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use sower_proto::{OperatingSystem, plugin_binary_name, socket_path_in};

use crate::client::PluginClient;
use crate::error::PluginError;
use crate::launcher::{LaunchSpec, PluginLauncher};
use crate::probe;
use crate::resolver;
use crate::settings::ManagerSettings;

const HANDLE_TARGET: &str = "sower_manager::handle";

/// Manager-side state for one plugin process.
#[derive(Debug)]
pub struct PluginHandle {
    os: OperatingSystem,
    client: PluginClient,
    /// Present only when this manager spawned the process. A reused
    /// foreign process is never owned and never terminated.
    child: Option<Child>,
}

impl PluginHandle {
    /// Connects to the plugin for `os`, reusing a running process when its
    /// identity matches and launching a fresh one otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when the binary cannot be
    /// resolved, [`PluginError::ExecutableMismatch`] when an unrelated
    /// process occupies the socket, [`PluginError::Spawn`] and
    /// [`PluginError::ConnectTimeout`] for launch failures, and
    /// [`PluginError::Transport`] when the identity check itself fails.
    pub fn connect(
        os: OperatingSystem,
        settings: &ManagerSettings,
        launcher: &dyn PluginLauncher,
    ) -> Result<Self, PluginError> {
        let name = plugin_binary_name(os);
        let dirs = settings.search_dirs()?;
        let executable = resolver::resolve(&name, &dirs)?;
        let address = socket_path_in(settings.socket_dir(), os);

        if let Some(client) = try_reuse(&address, &executable)? {
            info!(
                target: HANDLE_TARGET,
                os = %os,
                address = %address.display(),
                "reusing running plugin"
            );
            return Ok(Self {
                os,
                client,
                child: None,
            });
        }

        let spec = LaunchSpec {
            executable,
            address: address.clone(),
            debug: settings.debug(),
        };
        let child = launcher.launch(&spec)?;
        let stream = probe::probe(&address, settings.poll_interval(), settings.poll_timeout())?;
        let client = PluginClient::new(stream)?;
        info!(
            target: HANDLE_TARGET,
            os = %os,
            pid = child.id(),
            address = %address.display(),
            "started plugin process"
        );
        Ok(Self {
            os,
            client,
            child: Some(child),
        })
    }

    /// Returns the operating system this handle serves.
    #[must_use]
    pub fn operating_system(&self) -> OperatingSystem {
        self.os
    }

    /// Returns the RPC client. Access is serialised by the manager.
    pub(crate) fn client_mut(&mut self) -> &mut PluginClient {
        &mut self.client
    }

    /// Closes the connection and, when this manager owns the process,
    /// terminates its process group.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Terminate`] when signalling the process
    /// group fails for a reason other than the group being gone already.
    pub fn stop(mut self) -> Result<(), PluginError> {
        let Some(mut child) = self.child.take() else {
            debug!(
                target: HANDLE_TARGET,
                os = %self.os,
                "closing reused plugin connection, process left running"
            );
            return Ok(());
        };
        // The child was given its own process group at spawn, so the group
        // id equals its pid.
        let pgid = child.id() as i32;
        match killpg(Pid::from_raw(pgid), Signal::SIGTERM) {
            Ok(()) => {}
            Err(nix::errno::Errno::ESRCH) => {
                debug!(
                    target: HANDLE_TARGET,
                    os = %self.os,
                    pgid,
                    "plugin process group already gone"
                );
            }
            Err(errno) => {
                return Err(PluginError::Terminate {
                    pgid,
                    source: errno.into(),
                });
            }
        }
        if let Err(error) = child.wait() {
            warn!(
                target: HANDLE_TARGET,
                os = %self.os,
                error = %error,
                "failed to reap plugin process"
            );
        }
        info!(
            target: HANDLE_TARGET,
            os = %self.os,
            pgid,
            "terminated plugin process group"
        );
        Ok(())
    }
}

/// Attempts to adopt a plugin already listening on `address`.
///
/// Returns `Ok(None)` when nothing answers the socket. A reachable
/// listener whose reported executable differs from `executable` is an
/// [`PluginError::ExecutableMismatch`]; the foreign process is left alone.
fn try_reuse(address: &Path, executable: &Path) -> Result<Option<PluginClient>, PluginError> {
    let stream = match probe::connect(address) {
        Ok(stream) => stream,
        Err(error) => {
            debug!(
                target: HANDLE_TARGET,
                address = %address.display(),
                error = %error,
                "no running plugin to reuse"
            );
            return Ok(None);
        }
    };
    let mut client = PluginClient::new(stream)?;
    let response = client.ping()?;
    if resolver::same_executable(executable, &response.executable) {
        return Ok(Some(client));
    }
    Err(PluginError::ExecutableMismatch {
        address: address.to_path_buf(),
        want: executable.to_path_buf(),
        got: response.executable,
    })
}
