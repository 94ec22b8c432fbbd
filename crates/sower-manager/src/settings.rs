//! Manager configuration.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PluginError;
use crate::resolver;

/// Default interval between connection probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Default deadline for a freshly launched plugin to become reachable.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for plugin discovery and connection establishment.
///
/// The defaults match production use; tests shrink the probe timings and
/// pin the socket and search directories to temporary locations.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    debug: bool,
    socket_dir: PathBuf,
    poll_interval: Duration,
    poll_timeout: Duration,
    search_dirs: Option<Vec<PathBuf>>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            debug: false,
            socket_dir: env::temp_dir(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            search_dirs: None,
        }
    }
}

impl ManagerSettings {
    /// Creates settings with production defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables verbose logging in launched plugins.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Overrides the directory socket addresses are derived in.
    #[must_use]
    pub fn with_socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    /// Overrides the interval between connection probes.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the deadline for a launched plugin to become reachable.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Overrides the binary search directories.
    ///
    /// Without an override the resolver searches the directory of the
    /// manager executable, the working directory, and each `PATH` entry.
    #[must_use]
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = Some(dirs);
        self
    }

    /// Returns whether launched plugins log verbosely.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Returns the directory socket addresses are derived in.
    #[must_use]
    pub fn socket_dir(&self) -> &Path {
        &self.socket_dir
    }

    /// Returns the interval between connection probes.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the deadline for a launched plugin to become reachable.
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Returns the effective binary search directories.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::CurrentExe`] or [`PluginError::WorkingDir`]
    /// when the default directories cannot be determined.
    pub fn search_dirs(&self) -> Result<Vec<PathBuf>, PluginError> {
        match &self.search_dirs {
            Some(dirs) => Ok(dirs.clone()),
            None => resolver::default_search_dirs(),
        }
    }
}
