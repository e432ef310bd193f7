//! Page and asset retrieval.
//!
//! - [`Fetch`]: one retrieval attempt; [`HttpFetcher`] is the real transport
//! - [`RetryPolicy`] and [`fetch_with_retry`]: bounded retry with a fixed
//!   backoff for connection resets and timeouts
//! - [`FetchError`]: why an attempt failed, and whether it is transient

mod client;
mod error;
mod retry;

use std::future::Future;

use url::Url;

pub use client::{DEFAULT_TIMEOUT, HttpFetcher, USER_AGENT};
pub use error::FetchError;
pub use retry::{DEFAULT_BACKOFF, DEFAULT_MAX_RETRIES, RetryPolicy, fetch_with_retry};

/// A single retrieval attempt.
///
/// Implementations must not retry on their own; retrying is the caller's
/// decision via [`fetch_with_retry`].
pub trait Fetch {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}
