use std::time::Duration;

use log::{debug, warn};
use url::Url;

use super::{Fetch, FetchError};

/// Default number of additional attempts after the first one fails.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Bounded retry with a fixed delay.
///
/// The source servers are flaky but generally reachable, so a constant
/// backoff is enough; there is no exponential growth or jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first, so at most `1 + max_retries` calls.
    pub max_retries: u32,
    /// Sleep before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Whether `err` should be retried with `retries_left` attempts remaining.
    pub fn should_retry(&self, err: &FetchError, retries_left: u32) -> bool {
        retries_left > 0 && err.is_transient()
    }
}

/// Fetch `url`, retrying transient failures according to `policy`.
///
/// When the budget runs out the last error is returned unchanged.
pub async fn fetch_with_retry<F: Fetch>(
    fetcher: &F,
    url: &Url,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, FetchError> {
    let mut retries_left = policy.max_retries;
    loop {
        debug!("fetching {url}");
        match fetcher.fetch(url).await {
            Ok(bytes) => return Ok(bytes),
            Err(err) if policy.should_retry(&err, retries_left) => {
                warn!("{url} {}. Retrying {retries_left} more times.", causes(&err));
                tokio::time::sleep(policy.backoff).await;
                retries_left -= 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `err` and its sources on one line.
fn causes(err: &FetchError) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
