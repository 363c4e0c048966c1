//! Rate limit header parsing.
//!
//! The API signals back-pressure with `Retry-After` on 429 and 503
//! responses. The wait it asks for is used as a floor on the retry delay.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Information extracted from rate limit headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// When the rate limit window resets (`x-ratelimit-reset`).
    pub reset_at: Option<SystemTime>,

    /// How long to wait before retrying (`retry-after-ms` or `retry-after`).
    pub retry_after: Option<Duration>,

    /// Requests remaining in the current window (`x-ratelimit-remaining`).
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Extracts rate limit information from response headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use telnyx::rate_limit::RateLimitInfo;
    /// use http::HeaderMap;
    /// use std::time::Duration;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "60".parse().unwrap());
    ///
    /// let info = RateLimitInfo::from_headers(&headers);
    /// assert_eq!(info.retry_after, Some(Duration::from_secs(60)));
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            reset_at: parse_rate_limit_reset(headers),
            retry_after: parse_retry_after(headers),
            remaining: parse_rate_limit_remaining(headers),
        }
    }

    /// Returns the wait the server asked for, capped by `max_wait`.
    ///
    /// Prefers an explicit retry-after value and falls back to the reset
    /// time. Returns `None` when neither header is present.
    pub fn delay(&self, max_wait: Duration) -> Option<Duration> {
        if let Some(retry_after) = self.retry_after {
            return Some(retry_after.min(max_wait));
        }

        let until_reset = self.reset_at?.duration_since(SystemTime::now()).ok()?;
        Some(until_reset.min(max_wait))
    }

    /// Returns `true` if the headers describe an active rate limit.
    pub fn is_rate_limited(&self) -> bool {
        self.retry_after.is_some() || self.remaining == Some(0)
    }
}

/// How the dispatcher reacts to rate limit headers.
///
/// # Examples
///
/// ```
/// use telnyx::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::default().max_wait(Duration::from_secs(10));
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether server-requested waits are honored as a floor on backoff.
    pub enabled: bool,

    /// Upper bound on a server-requested wait. Defaults to 60 seconds.
    pub max_wait: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_wait: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Creates a configuration that ignores rate limit headers.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Sets the upper bound on a server-requested wait.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Parses `retry-after-ms`, then `retry-after` as seconds or an HTTP date.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(millis) = header_str(headers, "retry-after-ms").and_then(|v| v.parse::<f64>().ok())
    {
        if millis.is_finite() && millis >= 0.0 {
            return Some(Duration::from_secs_f64(millis / 1000.0));
        }
    }

    let header = header_str(headers, "retry-after")?;
    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    httpdate::parse_http_date(header)
        .ok()?
        .duration_since(SystemTime::now())
        .ok()
}

fn parse_rate_limit_reset(headers: &HeaderMap) -> Option<SystemTime> {
    let timestamp = header_str(headers, "x-ratelimit-reset")?.parse::<u64>().ok()?;
    Some(UNIX_EPOCH + Duration::from_secs(timestamp))
}

fn parse_rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, "x-ratelimit-remaining")?.parse().ok()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}
