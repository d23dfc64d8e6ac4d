//! # Observability & Tracing
//!
//! Every handler call runs inside a `pipeline` span carrying the resource and the
//! action, so the state-machine logs of one request nest under it:
//!
//! ```text
//! INFO pipeline{resource="User" action="show"}: Request completed status=200
//! ```
//!
//! Levels:
//!
//! - **info**: request outcome, store writes, actor lifecycle
//! - **debug**: each state transition and each store call with its full operation
//! - **warn**: requests that end in an error, failed store operations
//!
//! Filtering follows `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=resource_framework::pipeline=debug cargo run
//! ```

/// Installs the compact subscriber used by the demo binary.
///
/// Panics if a global subscriber is already set; use [`try_setup_tracing`] from
/// tests, where several may race to install one.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`], but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_setup_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_test_writer()
        .try_init()
        .is_ok()
}
