// crates/test-utils/src/lib.rs

//! Shared fixtures for `testagent` tests: scripted fakes for every
//! controller collaborator and builders for result trees and options.

pub mod builders;
pub mod fakes;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Longest a controller or transport future may run in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Route `testagent` tracing output through the test harness.
///
/// Output is captured per test and only shown for failures (or with
/// `-- --nocapture`). Defaults to `testagent=debug`; override with `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("testagent=debug,info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Drive a controller run (or any agent future) to completion, failing the
/// test instead of hanging when it overruns [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("agent future still running after {TEST_TIMEOUT:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_timeout_returns_the_output() {
        init_tracing();
        assert_eq!(with_timeout(async { 7 }).await, 7);
    }
}
