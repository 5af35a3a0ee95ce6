#![forbid(unsafe_code)]

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

pub mod fixtures;
pub mod graphql_test_utils;
pub mod mock_datastore;

pub use unimock;

#[macro_export]
macro_rules! expect_eq {
    (expected = $expected:expr, actual = $actual:expr $(,)?) => {
        pretty_assertions::assert_eq!($expected, $actual);
    };
    (actual = $actual:expr, expected = $expected:expr $(,)?) => {
        pretty_assertions::assert_eq!($expected, $actual);
    };
}

/// Install a subscriber printing to the test output, filtered by `RUST_LOG`.
///
/// Safe to call from every test, only the first call has an effect.
pub fn init_test_tracing() {
    let span_events = match std::env::var("RUST_LOG_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("active") => FmtSpan::ACTIVE,
        Ok("close") => FmtSpan::CLOSE,
        _ => FmtSpan::NONE,
    };

    let _ = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(span_events)
        .with_test_writer()
        .try_init();
}
