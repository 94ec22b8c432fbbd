//! Locates plugin binaries on the filesystem.
//!
//! The search order mirrors how operators deploy plugins: next to the
//! manager binary first, then the working directory, then every `PATH`
//! entry in order. The first directory containing the file wins.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PluginError;

const RESOLVER_TARGET: &str = "sower_manager::resolver";

/// Returns the default search directories: the directory containing the
/// current executable, the working directory, then each `PATH` entry.
///
/// # Errors
///
/// Returns [`PluginError::CurrentExe`] or [`PluginError::WorkingDir`] when
/// the process's own location cannot be determined.
pub fn default_search_dirs() -> Result<Vec<PathBuf>, PluginError> {
    let executable = env::current_exe().map_err(|source| PluginError::CurrentExe { source })?;
    let working_dir = env::current_dir().map_err(|source| PluginError::WorkingDir { source })?;

    let mut dirs = Vec::new();
    if let Some(own_dir) = executable.parent() {
        dirs.push(own_dir.to_path_buf());
    }
    dirs.push(working_dir);
    if let Some(path) = env::var_os("PATH") {
        dirs.extend(env::split_paths(&path));
    }
    Ok(dirs)
}

/// Finds `name` in the first directory of `dirs` that contains it.
///
/// # Errors
///
/// Returns [`PluginError::NotFound`] when no directory contains a file
/// named `name`.
pub fn resolve(name: &str, dirs: &[PathBuf]) -> Result<PathBuf, PluginError> {
    for dir in dirs {
        let candidate = dir.join(name);
        if candidate.is_file() {
            debug!(
                target: RESOLVER_TARGET,
                binary = %candidate.display(),
                "resolved plugin binary"
            );
            return Ok(candidate);
        }
    }
    Err(PluginError::NotFound {
        name: name.to_owned(),
    })
}

/// Compares two executable paths, falling back to canonicalisation so a
/// symlinked deployment directory does not defeat reuse detection.
#[must_use]
pub(crate) fn same_executable(want: &Path, got: &Path) -> bool {
    if want == got {
        return true;
    }
    match (want.canonicalize(), got.canonicalize()) {
        (Ok(want), Ok(got)) => want == got,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::TempDir;

    fn dir_with_file(name: &str) -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join(name), b"#!/bin/sh\n").expect("write file");
        dir
    }

    #[test]
    fn first_matching_directory_wins() {
        let first = dir_with_file("sower-userdata-ubuntu");
        let second = dir_with_file("sower-userdata-ubuntu");
        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];

        let resolved = resolve("sower-userdata-ubuntu", &dirs).expect("resolve binary");
        assert_eq!(resolved, first.path().join("sower-userdata-ubuntu"));
    }

    #[test]
    fn directories_without_the_file_are_skipped() {
        let empty = TempDir::new().expect("temp dir");
        let populated = dir_with_file("sower-userdata-rhel");
        let dirs = vec![empty.path().to_path_buf(), populated.path().to_path_buf()];

        let resolved = resolve("sower-userdata-rhel", &dirs).expect("resolve binary");
        assert_eq!(resolved, populated.path().join("sower-userdata-rhel"));
    }

    #[test]
    fn exhausted_search_is_not_found() {
        let empty = TempDir::new().expect("temp dir");
        let dirs = vec![empty.path().to_path_buf()];

        let error = resolve("sower-userdata-sles", &dirs).expect_err("should not resolve");
        assert!(matches!(
            error,
            PluginError::NotFound { name } if name == "sower-userdata-sles"
        ));
    }

    #[test]
    fn a_directory_of_the_same_name_is_not_a_match() {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir(dir.path().join("sower-userdata-centos")).expect("create dir");
        let dirs = vec![dir.path().to_path_buf()];

        assert!(resolve("sower-userdata-centos", &dirs).is_err());
    }

    #[test]
    fn default_search_starts_next_to_the_executable() {
        let dirs = default_search_dirs().expect("default dirs");
        let own_dir = env::current_exe()
            .expect("current exe")
            .parent()
            .expect("parent dir")
            .to_path_buf();
        assert_eq!(dirs.first(), Some(&own_dir));
    }

    #[test]
    fn same_executable_sees_through_symlinks() {
        let dir = dir_with_file("sower-userdata-ubuntu");
        let real = dir.path().join("sower-userdata-ubuntu");
        let link = dir.path().join("alias");
        std::os::unix::fs::symlink(&real, &link).expect("create symlink");

        assert!(same_executable(&real, &link));
        assert!(!same_executable(&real, &dir.path().join("missing")));
    }
}
