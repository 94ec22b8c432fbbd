//! Lazily-started plugin pool keyed by operating system.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use sower_proto::{OperatingSystem, UserDataRequest};

use crate::error::PluginError;
use crate::handle::PluginHandle;
use crate::launcher::{PluginLauncher, ProcessLauncher};
use crate::settings::ManagerSettings;

const MANAGER_TARGET: &str = "sower_manager::manager";

type HandleSlot = Arc<Mutex<Option<PluginHandle>>>;

/// Orchestrates one plugin handle per operating system.
///
/// Handles are created on first use and kept for the manager's lifetime
/// or until [`Manager::stop`]. Calls for distinct operating systems
/// proceed in parallel; calls for the same operating system are
/// serialised, because handle creation must not race against itself on
/// one socket address and the connection carries one call at a time.
pub struct Manager {
    settings: ManagerSettings,
    launcher: Arc<dyn PluginLauncher>,
    handles: Mutex<HashMap<OperatingSystem, HandleSlot>>,
}

impl Manager {
    /// Creates a manager that spawns real plugin processes.
    #[must_use]
    pub fn new(settings: ManagerSettings) -> Self {
        Self::with_launcher(settings, Arc::new(ProcessLauncher))
    }

    /// Creates a manager with a custom launcher, letting tests observe or
    /// suppress process spawns.
    #[must_use]
    pub fn with_launcher(settings: ManagerSettings, launcher: Arc<dyn PluginLauncher>) -> Self {
        Self {
            settings,
            launcher,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Requests user data for `os`, starting or reusing its plugin first.
    ///
    /// The manager never retries. A failed handle creation leaves no state
    /// behind, and a transport failure discards the handle, so the
    /// caller's next attempt starts from a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns any handle-creation failure (resolution, identity mismatch,
    /// spawn, probe timeout), [`PluginError::Transport`] for
    /// connection-level failures, or [`PluginError::Application`] when the
    /// plugin reports a generation failure.
    pub fn user_data(
        &self,
        os: OperatingSystem,
        request: UserDataRequest,
    ) -> Result<String, PluginError> {
        let slot = self.slot(os);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let mut handle = match guard.take() {
            Some(handle) => handle,
            None => PluginHandle::connect(os, &self.settings, self.launcher.as_ref())?,
        };
        let result = handle.client_mut().user_data(request);
        if result.as_ref().is_err_and(|error| error.is_transport()) {
            warn!(
                target: MANAGER_TARGET,
                os = %os,
                "discarding plugin handle after transport failure"
            );
            if let Err(error) = handle.stop() {
                debug!(
                    target: MANAGER_TARGET,
                    os = %os,
                    error = %error,
                    "failed to stop plugin after transport failure"
                );
            }
        } else {
            *guard = Some(handle);
        }
        result
    }

    /// Closes the handle for `os` and terminates the plugin process when
    /// this manager started it. Waits for an in-flight call on the handle
    /// to finish first. A missing handle is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Terminate`] when the process group cannot be
    /// signalled.
    pub fn stop(&self, os: OperatingSystem) -> Result<(), PluginError> {
        let slot = {
            let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            handles.remove(&os)
        };
        let Some(slot) = slot else {
            debug!(target: MANAGER_TARGET, os = %os, "no plugin handle to stop");
            return Ok(());
        };
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.take() {
            Some(handle) => handle.stop(),
            None => Ok(()),
        }
    }

    /// Fetches or creates the per-OS slot. The map lock is held only for
    /// the lookup; connection establishment happens under the slot lock so
    /// other operating systems are never blocked behind it.
    fn slot(&self, os: OperatingSystem) -> HandleSlot {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(handles.entry(os).or_default())
    }
}
