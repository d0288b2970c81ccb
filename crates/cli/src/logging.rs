//! Diagnostic logging setup.
//!
//! Library crates log through the `log` facade; the fmt subscriber
//! installed here picks those records up and writes them to stderr.

use tracing_subscriber::EnvFilter;

/// Env var checked before `RUST_LOG`.
pub const LOG_ENV: &str = "OXLDUT_LOG";

/// Level used when neither env var is set.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

/// Filter directives for a run.
///
/// An explicit `-q` or `-v` wins; otherwise `OXLDUT_LOG`, then `RUST_LOG`,
/// then the quiet-by-default `warn`.
pub fn directives(verbose: u8, quiet: bool, env: Option<String>) -> String {
    if quiet || verbose > 0 {
        return default_directive(verbose, quiet).to_string();
    }
    env.filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_directive(verbose, quiet).to_string())
}

fn env_directives() -> Option<String> {
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|s| !s.trim().is_empty())
}

pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_new(directives(verbose, quiet, env_directives()))
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    // A subscriber may already be set (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
