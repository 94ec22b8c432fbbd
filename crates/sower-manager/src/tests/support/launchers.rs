//! Launcher test doubles that observe spawn attempts.

use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::PluginError;
use crate::launcher::{LaunchSpec, PluginLauncher};

use super::fake_plugin::{FakeBehaviour, FakePlugin};

/// What a [`CountingLauncher`] does when asked to launch.
pub(crate) enum LaunchAction {
    /// Fail the launch. Used by tests that must never spawn.
    Refuse,
    /// Bind a [`FakePlugin`] at the requested address, standing in for the
    /// plugin process becoming reachable.
    BindFake(FakeBehaviour),
    /// Spawn the dummy child but bind nothing, so the probe times out.
    NeverBind,
}

/// Counts launch attempts and performs the configured [`LaunchAction`].
pub(crate) struct CountingLauncher {
    action: LaunchAction,
    spawns: AtomicUsize,
    fakes: Mutex<Vec<FakePlugin>>,
}

impl CountingLauncher {
    pub(crate) fn new(action: LaunchAction) -> Arc<Self> {
        Arc::new(Self {
            action,
            spawns: AtomicUsize::new(0),
            fakes: Mutex::new(Vec::new()),
        })
    }

    /// Returns how many launches were attempted.
    pub(crate) fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }
}

impl PluginLauncher for CountingLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<Child, PluginError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        match &self.action {
            LaunchAction::Refuse => Err(PluginError::Spawn {
                executable: spec.executable.clone(),
                source: io::Error::new(io::ErrorKind::Unsupported, "spawning is disabled"),
            }),
            LaunchAction::BindFake(behaviour) => {
                let fake = FakePlugin::spawn(
                    spec.address.clone(),
                    spec.executable.clone(),
                    behaviour.clone(),
                );
                self.fakes
                    .lock()
                    .expect("lock fakes")
                    .push(fake);
                dummy_child(spec)
            }
            LaunchAction::NeverBind => dummy_child(spec),
        }
    }
}

/// Spawns a short-lived placeholder process in its own process group, the
/// same way the production launcher detaches real plugins.
fn dummy_child(spec: &LaunchSpec) -> Result<Child, PluginError> {
    let mut command = Command::new("/bin/true");
    command.process_group(0);
    command.spawn().map_err(|source| PluginError::Spawn {
        executable: spec.executable.clone(),
        source,
    })
}
