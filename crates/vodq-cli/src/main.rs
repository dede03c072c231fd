mod adapters;
mod cli;

use vodq_core::logging;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; fall back to stderr-only if
    // the XDG state directory isn't writable rather than aborting startup.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = cli::Cli::run_from_args().await {
        eprintln!("vodq error: {:#}", err);
        std::process::exit(1);
    }
}
