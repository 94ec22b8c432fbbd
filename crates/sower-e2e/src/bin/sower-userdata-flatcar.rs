//! A plugin impostor that accepts the standard flags but never binds its
//! listener. Exists solely so the connect-timeout path can be exercised
//! against a real child process.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use sower_e2e::logging;

/// Pretends to be the Flatcar user-data plugin.
#[derive(Debug, Parser)]
struct Args {
    /// Unix domain socket address the plugin claims it will serve.
    #[arg(long)]
    address: PathBuf,
    /// Enables verbose logging.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.debug);
    info!(
        address = %args.address.display(),
        "flatcar impostor started, never binding"
    );
    // Outlive any probe deadline a test configures, then exit on our own
    // so a leaked child does not linger.
    thread::sleep(Duration::from_secs(30));
    ExitCode::SUCCESS
}
