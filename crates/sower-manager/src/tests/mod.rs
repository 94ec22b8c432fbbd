//! Crate-level behaviour tests for the plugin manager.
//!
//! These tests drive [`crate::Manager`] against in-process fake plugins
//! listening on real Unix sockets, so the reuse negotiation and the error
//! taxonomy are exercised without spawning plugin binaries. Spawning real
//! processes is covered by the `sower-e2e` crate.

mod support;
