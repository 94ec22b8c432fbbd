//! In-process fake plugin serving the wire protocol on a Unix socket.
//!
//! The fake lets tests control the executable path reported by `Ping` and
//! the outcome of `UserData` calls, covering reuse negotiation without
//! spawning a single process.

use std::io::{self, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use sower_proto::{
    PingResponse, PluginCall, PluginReply, UserDataResponse, read_message, write_message,
};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
const STALL_POLL: Duration = Duration::from_millis(10);

/// How the fake answers `UserData` calls.
#[derive(Debug, Clone)]
pub(crate) enum FakeBehaviour {
    /// Reply with this document.
    Data(String),
    /// Reply with an application-level failure.
    Fail(String),
    /// Accept the call and never reply, holding the connection open until
    /// the fake shuts down.
    Stall,
    /// Accept the call and drop the connection without replying.
    Disconnect,
}

/// A fake plugin listening on a Unix socket.
pub(crate) struct FakePlugin {
    shutdown: Arc<AtomicBool>,
    pings: Arc<AtomicUsize>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakePlugin {
    /// Binds `address` and serves connections on a background thread,
    /// reporting `executable` from `Ping`.
    pub(crate) fn spawn(
        address: PathBuf,
        executable: PathBuf,
        behaviour: FakeBehaviour,
    ) -> Self {
        let listener = UnixListener::bind(&address).expect("bind fake plugin socket");
        listener
            .set_nonblocking(true)
            .expect("fake plugin nonblocking");
        let shutdown = Arc::new(AtomicBool::new(false));
        let pings = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&shutdown);
        let ping_counter = Arc::clone(&pings);
        let handle = thread::spawn(move || {
            accept_loop(&listener, &flag, &ping_counter, &executable, &behaviour);
        });
        Self {
            shutdown,
            pings,
            handle: Some(handle),
        }
    }

    /// Returns how many `Ping` calls the fake has answered.
    pub(crate) fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

impl Drop for FakePlugin {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn accept_loop(
    listener: &UnixListener,
    shutdown: &Arc<AtomicBool>,
    pings: &Arc<AtomicUsize>,
    executable: &Path,
    behaviour: &FakeBehaviour,
) {
    let mut connections = Vec::new();
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                stream
                    .set_nonblocking(false)
                    .expect("configure fake connection");
                let flag = Arc::clone(shutdown);
                let ping_counter = Arc::clone(pings);
                let reported = executable.to_path_buf();
                let outcome = behaviour.clone();
                connections.push(thread::spawn(move || {
                    serve_connection(&stream, &flag, &ping_counter, reported, &outcome);
                }));
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(_) => return,
        }
    }
    for connection in connections {
        let _ = connection.join();
    }
}

fn serve_connection(
    stream: &UnixStream,
    shutdown: &AtomicBool,
    pings: &AtomicUsize,
    executable: PathBuf,
    behaviour: &FakeBehaviour,
) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone fake stream"));
    let mut writer = stream.try_clone().expect("clone fake stream");
    loop {
        let call: PluginCall = match read_message(&mut reader) {
            Ok(call) => call,
            Err(_) => return,
        };
        let reply = match call {
            PluginCall::Ping(_) => {
                pings.fetch_add(1, Ordering::SeqCst);
                PluginReply::Ping(PingResponse {
                    executable: executable.clone(),
                })
            }
            PluginCall::UserData(_) => match behaviour {
                FakeBehaviour::Data(document) => {
                    PluginReply::UserData(UserDataResponse::data(document.clone()))
                }
                FakeBehaviour::Fail(message) => {
                    PluginReply::UserData(UserDataResponse::error(message.clone()))
                }
                FakeBehaviour::Stall => {
                    while !shutdown.load(Ordering::SeqCst) {
                        thread::sleep(STALL_POLL);
                    }
                    return;
                }
                FakeBehaviour::Disconnect => return,
            },
        };
        if write_message(&mut writer, &reply).is_err() {
            return;
        }
    }
}
