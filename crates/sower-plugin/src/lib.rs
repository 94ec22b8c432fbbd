//! Server-side support for sower user-data plugins.
//!
//! A plugin binary wraps its [`UserDataProvider`] implementation in a
//! [`PluginServer`]: the server owns the Unix domain socket listener,
//! decodes calls, answers `Ping` with the executable path the process was
//! started from, and forwards `UserData` to the provider. The manager on
//! the other side of the socket is a pure client of this protocol.

mod provider;
mod server;

pub use self::provider::{ProviderError, UserDataProvider};
pub use self::server::{PluginServer, ServeError, ServerHandle};
