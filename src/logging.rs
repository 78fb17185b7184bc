//! Tracing setup for the CLI binary.

use tracing_subscriber::EnvFilter;

pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("recordvault=debug")
    } else {
        EnvFilter::new("recordvault=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
