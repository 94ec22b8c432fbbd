//! Deterministic plugin naming and socket address derivation.
//!
//! The manager and the plugins never exchange addresses out of band: both
//! derive the binary name and the socket path from the operating-system
//! identifier. The socket path is stable across restarts, which is what
//! makes reuse detection possible at all.

use std::env;
use std::path::{Path, PathBuf};

use crate::os::OperatingSystem;

/// Prefix shared by every plugin binary name and socket file name.
pub const PLUGIN_PREFIX: &str = "sower-userdata-";

/// Returns the file name of the plugin binary for `os`.
#[must_use]
pub fn plugin_binary_name(os: OperatingSystem) -> String {
    format!("{PLUGIN_PREFIX}{os}")
}

/// Derives the socket address for the plugin of `os` inside `dir`.
#[must_use]
pub fn socket_path_in(dir: &Path, os: OperatingSystem) -> PathBuf {
    dir.join(format!("{PLUGIN_PREFIX}{os}.sock"))
}

/// Derives the socket address for the plugin of `os` in the system
/// temporary directory.
#[must_use]
pub fn socket_path(os: OperatingSystem) -> PathBuf {
    socket_path_in(&env::temp_dir(), os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_name_carries_prefix_and_identifier() {
        assert_eq!(
            plugin_binary_name(OperatingSystem::Ubuntu),
            "sower-userdata-ubuntu"
        );
    }

    #[test]
    fn socket_path_is_stable_for_an_identifier() {
        let dir = Path::new("/run/sower");
        let first = socket_path_in(dir, OperatingSystem::Centos);
        let second = socket_path_in(dir, OperatingSystem::Centos);
        assert_eq!(first, second);
        assert_eq!(first, Path::new("/run/sower/sower-userdata-centos.sock"));
    }

    #[test]
    fn socket_paths_differ_per_identifier() {
        let dir = Path::new("/tmp");
        assert_ne!(
            socket_path_in(dir, OperatingSystem::Ubuntu),
            socket_path_in(dir, OperatingSystem::Rhel)
        );
    }
}
