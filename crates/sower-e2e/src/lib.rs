//! End-to-end fixtures for the plugin lifecycle.
//!
//! The crate ships two plugin binaries the integration tests spawn as real
//! child processes: `sower-userdata-ubuntu` serves a minimal cloud-init
//! document, and `sower-userdata-flatcar` accepts the standard flags but
//! never binds its listener, which is exactly what a connect-timeout test
//! needs.

pub mod fixtures;
pub mod logging;
pub mod provider;
