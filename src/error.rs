//! Error types for API calls.
//!
//! Every failed call ends in exactly one [`Error`]. Non-2xx responses are
//! categorized by status into [`Error::RateLimited`], [`Error::Server`] and
//! [`Error::Client`], each carrying an [`ErrorEnvelope`] with the status,
//! the server's error code and message, the request id and the raw body.

use crate::decode::DecodeError;
use crate::rate_limit::RateLimitInfo;
use crate::retry::is_retryable_status;
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// The main error type for API calls.
///
/// # Examples
///
/// ```no_run
/// use telnyx::{decode::Json, Client, Error, RequestSpec};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().api_key("KEY").build()?;
/// let spec = RequestSpec::get("phone_numbers/%1$s").path_arg("123");
///
/// match client.request::<Json<serde_json::Value>>(&spec).await {
///     Ok(response) => println!("Number: {}", response.data),
///     Err(Error::Client { envelope }) => {
///         eprintln!("Rejected ({}): {}", envelope.http_status, envelope.message);
///     }
///     Err(Error::Decode { source, .. }) => {
///         eprintln!("Unexpected body near `{}`", source.fragment);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No response was received (DNS, connect, TLS or socket failure).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The overall call deadline expired, retries included.
    #[error("Request timed out after {elapsed:?}")]
    Timeout {
        /// Time spent before giving up.
        elapsed: Duration,
    },

    /// The server answered 429.
    #[error("Rate limited: {envelope}")]
    RateLimited {
        /// The parsed error response.
        envelope: ErrorEnvelope,
        /// Rate limit headers found on the response.
        rate_limit_info: Option<RateLimitInfo>,
    },

    /// The server answered with a 5xx status.
    #[error("Server error: {envelope}")]
    Server {
        /// The parsed error response.
        envelope: ErrorEnvelope,
    },

    /// The server answered with a 4xx status other than 429, or any other
    /// non-2xx status. These point at a bad request and are never retried.
    #[error("Client error: {envelope}")]
    Client {
        /// The parsed error response.
        envelope: ErrorEnvelope,
    },

    /// A 2xx body did not match the declared target shape.
    #[error("Failed to decode response (status {status}): {source}")]
    Decode {
        /// The HTTP status code.
        status: StatusCode,
        /// What went wrong and where.
        #[source]
        source: DecodeError,
        /// The full response body, lossily converted to text.
        raw_body: String,
    },

    /// Parameters or body could not be serialized.
    #[error("Failed to serialize request: {0}")]
    Serialization(String),

    /// The path template and its arguments do not line up.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The client or a request was configured with invalid values.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Coarse category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Transport`].
    Transport,
    /// See [`Error::Timeout`].
    Timeout,
    /// See [`Error::RateLimited`].
    RateLimited,
    /// See [`Error::Server`].
    Server,
    /// See [`Error::Client`].
    Client,
    /// See [`Error::Decode`].
    Decode,
    /// The request never left the process.
    InvalidRequest,
}

impl Error {
    /// Builds the categorized error for a non-2xx response.
    pub fn from_response(status: StatusCode, headers: HeaderMap, raw_body: String) -> Self {
        let envelope = ErrorEnvelope::parse(status, headers, raw_body);
        if status == StatusCode::TOO_MANY_REQUESTS {
            let info = RateLimitInfo::from_headers(&envelope.headers);
            let rate_limit_info = info.is_rate_limited().then_some(info);
            Error::RateLimited {
                envelope,
                rate_limit_info,
            }
        } else if status.is_server_error() {
            Error::Server { envelope }
        } else {
            Error::Client { envelope }
        }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Server { .. } => ErrorKind::Server,
            Error::Client { .. } => ErrorKind::Client,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Serialization(_)
            | Error::InvalidPath(_)
            | Error::Configuration(_)
            | Error::InvalidUrl(_) => ErrorKind::InvalidRequest,
        }
    }

    /// Returns `true` if the dispatcher may retry after this error.
    ///
    /// Transport failures, 429 and 500/502/503/504 are retryable. Timeouts,
    /// other statuses and decode failures are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use telnyx::Error;
    /// use http::{HeaderMap, StatusCode};
    ///
    /// let err = Error::from_response(
    ///     StatusCode::SERVICE_UNAVAILABLE,
    ///     HeaderMap::new(),
    ///     "Service unavailable".to_string(),
    /// );
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::from_response(
    ///     StatusCode::UNPROCESSABLE_ENTITY,
    ///     HeaderMap::new(),
    ///     r#"{"errors":[{"code":"10015","title":"Bad Request"}]}"#.to_string(),
    /// );
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::RateLimited { .. } => true,
            Error::Server { envelope } => is_retryable_status(envelope.http_status),
            _ => false,
        }
    }

    /// Returns the error envelope for HTTP errors.
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Error::RateLimited { envelope, .. }
            | Error::Server { envelope }
            | Error::Client { envelope } => Some(envelope),
            _ => None,
        }
    }

    /// Returns the HTTP status code if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Decode { status, .. } => Some(*status),
            _ => self.envelope().map(|envelope| envelope.http_status),
        }
    }

    /// Returns the raw response body if a response was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Decode { raw_body, .. } => Some(raw_body),
            _ => self.envelope().map(|envelope| envelope.raw_body.as_str()),
        }
    }

    /// Returns the server-assigned request identifier, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.envelope()?.request_id.as_deref()
    }

    /// Returns rate limit information for [`Error::RateLimited`].
    pub fn rate_limit_info(&self) -> Option<&RateLimitInfo> {
        match self {
            Error::RateLimited {
                rate_limit_info, ..
            } => rate_limit_info.as_ref(),
            _ => None,
        }
    }

    /// Returns the server-requested wait before retrying, capped by `max_wait`.
    ///
    /// A 429 honors `Retry-After` and falls back to the rate limit reset
    /// time. Other HTTP errors honor only an explicit `Retry-After` (or
    /// `retry-after-ms`), so a 503 asking for a pause is respected while a
    /// routine `x-ratelimit-reset` on a 500 is not.
    pub fn rate_limit_delay(&self, max_wait: Duration) -> Option<Duration> {
        if let Some(info) = self.rate_limit_info() {
            return info.delay(max_wait);
        }
        let retry_after = RateLimitInfo::from_headers(&self.envelope()?.headers).retry_after?;
        Some(retry_after.min(max_wait))
    }
}

/// A non-2xx response, parsed for diagnosis.
#[derive(Debug, Clone)]
pub struct ErrorEnvelope {
    /// The HTTP status code.
    pub http_status: StatusCode,
    /// The server-defined error code, when the body carries one.
    pub error_code: Option<String>,
    /// A human readable message: the server's detail, or the raw body.
    pub message: String,
    /// The request identifier from `x-request-id` or the body's `meta`.
    pub request_id: Option<String>,
    /// The raw response body.
    pub raw_body: String,
    /// The response headers.
    pub headers: HeaderMap,
}

impl ErrorEnvelope {
    /// Parses an error response.
    ///
    /// Recognizes `{"errors":[{"code","title","detail"}]}`,
    /// `{"error":{"code","message"}}`, `{"error":"..."}` and `{"message"}`.
    /// Anything else keeps the trimmed raw body as the message.
    pub fn parse(http_status: StatusCode, headers: HeaderMap, raw_body: String) -> Self {
        let parsed = serde_json::from_str::<Value>(&raw_body).ok();
        let (error_code, message) = parsed.as_ref().map(describe).unwrap_or_default();

        let request_id = headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .or_else(|| {
                parsed
                    .as_ref()?
                    .pointer("/meta/request_id")?
                    .as_str()
                    .map(str::to_owned)
            });

        let message = message.unwrap_or_else(|| {
            let trimmed = raw_body.trim();
            if trimmed.is_empty() {
                http_status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

        Self {
            http_status,
            error_code,
            message,
            request_id,
            raw_body,
            headers,
        }
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.http_status)?;
        if let Some(code) = &self.error_code {
            write!(f, " [{code}]")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(request_id) = &self.request_id {
            write!(f, " (request id {request_id})")?;
        }
        Ok(())
    }
}

fn describe(body: &Value) -> (Option<String>, Option<String>) {
    if let Some(first) = body
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    {
        return (code_of(first), message_of(first));
    }
    match body.get("error") {
        Some(Value::String(message)) => return (None, Some(message.clone())),
        Some(error @ Value::Object(_)) => return (code_of(error), message_of(error)),
        _ => {}
    }
    (code_of(body), message_of(body))
}

fn code_of(value: &Value) -> Option<String> {
    match value.get("code")? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

fn message_of(value: &Value) -> Option<String> {
    ["detail", "message", "title"]
        .iter()
        .find_map(|key| value.get(*key)?.as_str())
        .map(str::to_owned)
}

/// A specialized `Result` type for API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_envelope_from_errors_array() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-42"));

        let envelope = ErrorEnvelope::parse(
            StatusCode::UNPROCESSABLE_ENTITY,
            headers,
            r#"{"errors":[{"code":"10015","title":"Invalid value","detail":"The phone number is invalid"}]}"#
                .to_string(),
        );

        assert_eq!(envelope.error_code.as_deref(), Some("10015"));
        assert_eq!(envelope.message, "The phone number is invalid");
        assert_eq!(envelope.request_id.as_deref(), Some("req-42"));
    }

    #[test]
    fn test_envelope_from_error_object_with_numeric_code() {
        let envelope = ErrorEnvelope::parse(
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            r#"{"error":{"code":40001,"message":"bad"},"meta":{"request_id":"r-1"}}"#.to_string(),
        );

        assert_eq!(envelope.error_code.as_deref(), Some("40001"));
        assert_eq!(envelope.message, "bad");
        assert_eq!(envelope.request_id.as_deref(), Some("r-1"));
    }

    #[test]
    fn test_envelope_falls_back_to_raw_text() {
        let envelope = ErrorEnvelope::parse(
            StatusCode::BAD_GATEWAY,
            HeaderMap::new(),
            "  upstream unavailable \n".to_string(),
        );

        assert!(envelope.error_code.is_none());
        assert_eq!(envelope.message, "upstream unavailable");
        assert_eq!(envelope.raw_body, "  upstream unavailable \n");
    }

    #[test]
    fn test_envelope_empty_body_uses_reason() {
        let envelope =
            ErrorEnvelope::parse(StatusCode::NOT_FOUND, HeaderMap::new(), String::new());
        assert_eq!(envelope.message, "Not Found");
    }

    #[test]
    fn test_categorization_by_status() {
        let categorize = |code: u16| {
            Error::from_response(
                StatusCode::from_u16(code).unwrap(),
                HeaderMap::new(),
                String::new(),
            )
            .kind()
        };

        assert_eq!(categorize(429), ErrorKind::RateLimited);
        assert_eq!(categorize(500), ErrorKind::Server);
        assert_eq!(categorize(501), ErrorKind::Server);
        assert_eq!(categorize(404), ErrorKind::Client);
        assert_eq!(categorize(409), ErrorKind::Client);
    }

    #[test]
    fn test_retryable_statuses() {
        let retryable = |code: u16| {
            Error::from_response(
                StatusCode::from_u16(code).unwrap(),
                HeaderMap::new(),
                String::new(),
            )
            .is_retryable()
        };

        for code in [429, 500, 502, 503, 504] {
            assert!(retryable(code), "{code} should be retryable");
        }
        for code in [400, 401, 403, 404, 422, 501] {
            assert!(!retryable(code), "{code} should not be retryable");
        }
        assert!(!Error::Timeout {
            elapsed: Duration::from_millis(50)
        }
        .is_retryable());
    }

    #[test]
    fn test_rate_limit_delay_from_server_error_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        let err = Error::from_response(StatusCode::SERVICE_UNAVAILABLE, headers, String::new());

        assert_eq!(
            err.rate_limit_delay(Duration::from_secs(60)),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_reset_header_floors_only_rate_limited_errors() {
        let reset = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 30;
        let headers = || {
            let mut headers = HeaderMap::new();
            headers.insert(
                "x-ratelimit-reset",
                HeaderValue::from_str(&reset.to_string()).unwrap(),
            );
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("99"));
            headers
        };

        let err = Error::from_response(StatusCode::INTERNAL_SERVER_ERROR, headers(), String::new());
        assert!(err.rate_limit_delay(Duration::from_secs(60)).is_none());

        let mut limited = headers();
        limited.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        let err = Error::from_response(StatusCode::TOO_MANY_REQUESTS, limited, String::new());
        let delay = err.rate_limit_delay(Duration::from_secs(60)).unwrap();
        assert!(delay > Duration::from_secs(25) && delay <= Duration::from_secs(30));
    }

    #[test]
    fn test_display_includes_code_and_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        let err = Error::from_response(
            StatusCode::FORBIDDEN,
            headers,
            r#"{"errors":[{"code":"10010","title":"Forbidden"}]}"#.to_string(),
        );

        assert_eq!(
            err.to_string(),
            "Client error: 403 Forbidden [10010]: Forbidden (request id abc)"
        );
    }
}
