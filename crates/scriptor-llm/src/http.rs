//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client with the standard Scriptor configuration.
///
/// Config: 30s connect timeout, `timeout` request timeout, rustls TLS,
/// `scriptor/{version}` user-agent, redirect limit 10.
#[must_use]
pub fn default_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .user_agent(concat!("scriptor/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}
