//! Per-call and client-wide request options.
//!
//! A [`RequestOptions`] value carries only the fields a caller chose to set.
//! The client keeps one as its defaults; each call may supply another that
//! is layered on top with [`RequestOptions::merge`] and then resolved into
//! an [`EffectiveOptions`] with every field filled in.

use std::collections::BTreeMap;
use std::time::Duration;

/// Deadline for a whole call, retries included, when nothing else is set.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Number of retries after the first attempt when nothing else is set.
pub const DEFAULT_MAX_RETRIES: usize = 2;

/// Options that tune a single request or, held by the client, every request.
///
/// # Examples
///
/// ```
/// use telnyx::RequestOptions;
/// use std::time::Duration;
///
/// let defaults = RequestOptions::new().timeout(Duration::from_secs(30));
/// let call = RequestOptions::new().max_retries(0).header("x-trace", "abc");
///
/// let effective = defaults.merge(&call).resolve();
/// assert_eq!(effective.timeout, Duration::from_secs(30));
/// assert_eq!(effective.max_retries, 0);
/// assert_eq!(effective.extra_headers["x-trace"], "abc");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overall deadline for the call, including every retry and backoff.
    pub timeout: Option<Duration>,

    /// Maximum number of retries after the first attempt.
    pub max_retries: Option<usize>,

    /// Headers added on top of the client's default headers.
    pub extra_headers: BTreeMap<String, String>,

    /// Query parameters appended after the normalized query payload.
    pub extra_query: BTreeMap<String, String>,

    /// Replaces the client's base URL for this call.
    pub base_url: Option<String>,
}

impl RequestOptions {
    /// Creates options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overall deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the retry budget.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Adds an extra header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Adds an extra query parameter.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_query.insert(key.into(), value.into());
        self
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Layers `overrides` on top of `self` without mutating either.
    ///
    /// Scalar fields set in `overrides` win. Header and query maps are
    /// merged key by key, with `overrides` winning on conflicts.
    pub fn merge(&self, overrides: &RequestOptions) -> RequestOptions {
        let mut extra_headers = self.extra_headers.clone();
        extra_headers.extend(overrides.extra_headers.clone());
        let mut extra_query = self.extra_query.clone();
        extra_query.extend(overrides.extra_query.clone());

        RequestOptions {
            timeout: overrides.timeout.or(self.timeout),
            max_retries: overrides.max_retries.or(self.max_retries),
            extra_headers,
            extra_query,
            base_url: overrides.base_url.clone().or_else(|| self.base_url.clone()),
        }
    }

    /// Fills unset fields with the library defaults.
    pub fn resolve(&self) -> EffectiveOptions {
        EffectiveOptions {
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            extra_headers: self.extra_headers.clone(),
            extra_query: self.extra_query.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Fully resolved options for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveOptions {
    /// Overall deadline for the call.
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt.
    pub max_retries: usize,
    /// Extra headers to send.
    pub extra_headers: BTreeMap<String, String>,
    /// Extra query parameters to send.
    pub extra_query: BTreeMap<String, String>,
    /// Base URL override, if any.
    pub base_url: Option<String>,
}

impl Default for EffectiveOptions {
    fn default() -> Self {
        RequestOptions::default().resolve()
    }
}
