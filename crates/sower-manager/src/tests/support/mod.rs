//! Test doubles shared by the behaviour tests.

mod fake_plugin;
mod launchers;

pub(crate) use self::fake_plugin::{FakeBehaviour, FakePlugin};
pub(crate) use self::launchers::{CountingLauncher, LaunchAction};
