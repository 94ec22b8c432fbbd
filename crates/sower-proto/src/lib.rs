//! Shared protocol definitions for sower user-data plugins.
//!
//! Both sides of the plugin boundary depend on this crate: the manager
//! (`sower-manager`) encodes calls and decodes replies, while plugin
//! processes (`sower-plugin`) do the reverse. The crate also owns the
//! deterministic naming scheme: plugin binary names and socket addresses
//! derive from the operating-system identifier alone, so a restarted
//! manager can locate a plugin that is already running without any
//! out-of-band coordination.

pub mod address;
pub mod message;
pub mod os;
pub mod wire;

pub use self::address::{PLUGIN_PREFIX, plugin_binary_name, socket_path, socket_path_in};
pub use self::message::{
    CloudConfigPayload, PingRequest, PingResponse, UserDataRequest, UserDataResponse,
};
pub use self::os::OperatingSystem;
pub use self::wire::{
    MAX_MESSAGE_BYTES, PluginCall, PluginReply, WireError, read_message, write_message,
};
