//! Log subscriber setup
//!
//! Logs go to stderr so stdout stays reserved for run output. The logging
//! section lives in the configuration, so configuration loading itself is
//! logged through a scoped [`bootstrap`] subscriber before [`init`] installs
//! the configured one.

use labflow_team::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        config.level.clone()
    }
}

fn filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbose)))
}

/// Compact subscriber with default settings, for use before the configuration is known
pub fn bootstrap(verbose: bool) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(filter(&LoggingConfig::default(), verbose))
        .with_writer(std::io::stderr)
        .compact()
        .with_target(false)
        .finish()
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config, verbose))
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Compact => builder.compact().with_target(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(err) = result {
        eprintln!("labflow: logging already initialised: {}", err);
    }
}
