//! Integration test crate for the Mentora earnings ledger.
//!
//! This crate has no library logic - it only contains integration tests
//! that exercise end-to-end ledger flows across multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p mentora-integration-tests
//! ```

/// Install a tracing subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
