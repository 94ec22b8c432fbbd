//! Spawns plugin binaries as detached child processes.

use std::fs;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::error::PluginError;

const LAUNCHER_TARGET: &str = "sower_manager::launcher";

/// Everything needed to start one plugin process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Resolved plugin binary path.
    pub executable: PathBuf,
    /// Socket address the plugin must serve.
    pub address: PathBuf,
    /// Whether the plugin should log verbosely.
    pub debug: bool,
}

/// Starts plugin processes.
///
/// The trait seam lets tests count spawns or substitute fakes; production
/// code uses [`ProcessLauncher`].
pub trait PluginLauncher: Send + Sync {
    /// Starts the plugin described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Spawn`] when the binary cannot be started.
    fn launch(&self, spec: &LaunchSpec) -> Result<Child, PluginError>;
}

/// Production launcher that spawns the plugin binary directly.
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl PluginLauncher for ProcessLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<Child, PluginError> {
        remove_stale_socket(&spec.address);

        let mut command = Command::new(&spec.executable);
        command.arg("--address").arg(&spec.address);
        if spec.debug {
            command.arg("--debug");
        }
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        // The plugin must outlive the manager's terminal session: a fresh
        // process group keeps foreground signals such as an interactive
        // interrupt from reaching it.
        command.process_group(0);

        let child = command.spawn().map_err(|source| PluginError::Spawn {
            executable: spec.executable.clone(),
            source,
        })?;
        debug!(
            target: LAUNCHER_TARGET,
            pid = child.id(),
            executable = %spec.executable.display(),
            address = %spec.address.display(),
            "spawned plugin process"
        );
        Ok(child)
    }
}

/// Best-effort removal of a socket file left behind by a dead plugin. The
/// new process could not bind over it otherwise.
fn remove_stale_socket(address: &Path) {
    match fs::remove_file(address) {
        Ok(()) => debug!(
            target: LAUNCHER_TARGET,
            address = %address.display(),
            "removed stale socket file"
        ),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => debug!(
            target: LAUNCHER_TARGET,
            address = %address.display(),
            error = %error,
            "failed to remove stale socket file"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn spawn_failure_names_the_executable() {
        let dir = TempDir::new().expect("temp dir");
        let spec = LaunchSpec {
            executable: dir.path().join("no-such-plugin"),
            address: dir.path().join("plugin.sock"),
            debug: false,
        };

        let error = ProcessLauncher.launch(&spec).expect_err("spawn should fail");
        assert!(matches!(
            error,
            PluginError::Spawn { executable, .. } if executable == dir.path().join("no-such-plugin")
        ));
    }

    #[test]
    fn launch_clears_a_stale_socket_file() {
        let dir = TempDir::new().expect("temp dir");
        let address = dir.path().join("plugin.sock");
        fs::write(&address, b"").expect("write stale file");
        let spec = LaunchSpec {
            executable: PathBuf::from("/bin/true"),
            address: address.clone(),
            debug: false,
        };

        let mut child = ProcessLauncher.launch(&spec).expect("launch /bin/true");
        child.wait().expect("wait for child");
        assert!(!address.exists(), "stale socket file should be removed");
    }

    #[test]
    fn missing_socket_file_is_not_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let spec = LaunchSpec {
            executable: PathBuf::from("/bin/true"),
            address: dir.path().join("plugin.sock"),
            debug: true,
        };

        let mut child = ProcessLauncher.launch(&spec).expect("launch /bin/true");
        child.wait().expect("wait for child");
    }
}
