//! Lifecycle management for sower user-data plugins.
//!
//! The manager locates the plugin binary for an operating system, starts
//! it as a detached child process serving a Unix domain socket, reattaches
//! to an already-running instance when its identity matches, and exposes
//! the two remote operations (`ping` and `user_data`) to the rest of the
//! system.
//!
//! # Architecture
//!
//! [`Manager`] keeps one lazily-created [`PluginHandle`] per
//! [`OperatingSystem`](sower_proto::OperatingSystem). Creating a handle
//! runs the resolve → reuse-check → launch → probe sequence: the binary is
//! looked up next to the manager executable, in the working directory, and
//! on `PATH`; a listener already bound to the deterministic socket address
//! is adopted when its `Ping` reply names the same executable; otherwise a
//! fresh process is spawned in its own process group and the socket is
//! polled until it answers.

pub mod client;
pub mod error;
pub mod handle;
pub mod launcher;
pub mod manager;
pub mod probe;
pub mod resolver;
pub mod settings;

#[cfg(test)]
mod tests;

pub use self::client::PluginClient;
pub use self::error::PluginError;
pub use self::handle::PluginHandle;
pub use self::launcher::{LaunchSpec, PluginLauncher, ProcessLauncher};
pub use self::manager::Manager;
pub use self::settings::ManagerSettings;
