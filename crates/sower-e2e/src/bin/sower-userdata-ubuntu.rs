//! Ubuntu user-data plugin used by the end-to-end tests.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use sower_e2e::logging;
use sower_e2e::provider::UbuntuProvider;
use sower_plugin::PluginServer;

/// Serves Ubuntu user data over a Unix domain socket.
#[derive(Debug, Parser)]
struct Args {
    /// Unix domain socket address to serve.
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
        debug = args.debug,
        "starting ubuntu user-data plugin"
    );

    let server = match PluginServer::bind(UbuntuProvider, args.address) {
        Ok(server) => server,
        Err(bind_error) => {
            error!(error = %bind_error, "failed to bind plugin socket");
            return ExitCode::FAILURE;
        }
    };
    if let Err(serve_error) = server.run() {
        error!(error = %serve_error, "plugin server ended");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
