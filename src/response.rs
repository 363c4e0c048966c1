//! Decoded response wrapper.
//!
//! A [`Response`] carries the decoded value together with the raw body and
//! transport details, so callers that need the unparsed payload (document
//! downloads, debugging) never have to issue the call twice.

use http::{HeaderMap, StatusCode};
use std::borrow::Cow;
use std::time::Duration;

/// A successful, decoded response.
///
/// # Examples
///
/// ```no_run
/// use serde::Deserialize;
/// use telnyx::{decode::Json, Client, RequestSpec};
///
/// #[derive(Deserialize)]
/// struct Envelope<T> {
///     data: T,
/// }
///
/// #[derive(Deserialize)]
/// struct Balance {
///     balance: String,
///     currency: String,
/// }
///
/// # async fn example() -> Result<(), telnyx::Error> {
/// let client = Client::builder().api_key("KEY").build()?;
/// let response = client
///     .request::<Json<Envelope<Balance>>>(&RequestSpec::get("balance"))
///     .await?;
///
/// println!("{} {}", response.data.data.balance, response.data.data.currency);
/// println!("took {:?} over {} attempt(s)", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded value.
    pub data: T,

    /// The raw response body.
    pub raw_body: Vec<u8>,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until this response was decoded.
    pub latency: Duration,

    /// Number of attempts made, `1` when no retry was needed.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: Vec<u8>,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the decoded value, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use telnyx::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     b"42".to_vec(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the request required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use telnyx::Response;
    /// # use http::{HeaderMap, HeaderValue, StatusCode};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("x-request-id", HeaderValue::from_static("req-1"));
    ///
    /// let response = Response::new((), Vec::new(), StatusCode::OK, headers, Duration::ZERO, 1);
    /// assert_eq!(response.header("x-request-id"), Some("req-1"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns the raw body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw_body)
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
