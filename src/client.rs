//! The request dispatcher.
//!
//! [`Client`] turns a [`RequestSpec`] into an HTTP exchange: it expands the
//! path, flattens the query, layers headers, encodes the body, retries
//! transient failures with backoff, and hands successful bodies to the
//! declared [`Decoder`]. Use [`ClientBuilder`] to configure one.

use crate::{
    decode::{Decoder, Json, NoContent},
    options::{EffectiveOptions, RequestOptions},
    pagination::{CursorPage, CursorPageBody, FlatPage, FlatPageBody},
    rate_limit::RateLimitConfig,
    request::{Body, MultipartPart, RequestSpec},
    retry::RetryStrategy,
    Error, Response, Result,
};
use http::{header, HeaderMap, HeaderName, HeaderValue};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.telnyx.com/v2";

/// Environment variable read by [`ClientBuilder::from_env`] for the API key.
pub const API_KEY_ENV: &str = "TELNYX_API_KEY";

/// Environment variable read by [`ClientBuilder::from_env`] for the base URL.
pub const BASE_URL_ENV: &str = "TELNYX_BASE_URL";

/// A client for the API, holding the read-only configuration every call
/// shares.
///
/// Cloning is cheap; clones share the connection pool and configuration.
///
/// # Examples
///
/// ```no_run
/// use serde::Deserialize;
/// use telnyx::{decode::Json, Client, RequestOptions, RequestSpec};
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct Envelope<T> {
///     data: T,
/// }
///
/// #[derive(Deserialize)]
/// struct PhoneNumber {
///     id: String,
///     phone_number: String,
/// }
///
/// # async fn example() -> Result<(), telnyx::Error> {
/// let client = Client::builder()
///     .api_key("KEY")
///     .timeout(Duration::from_secs(30))
///     .max_retries(3)
///     .build()?;
///
/// let spec = RequestSpec::get("phone_numbers/%1$s")
///     .path_arg("1293384261075731499")
///     .options(RequestOptions::new().max_retries(0));
/// let number = client.request::<Json<Envelope<PhoneNumber>>>(&spec).await?;
/// println!("{}", number.data.data.phone_number);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    default_options: RequestOptions,
    retry_strategy: RetryStrategy,
    rate_limit_config: RateLimitConfig,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("default_options", &self.inner.default_options)
            .field("retry_strategy", &self.inner.retry_strategy)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new `ClientBuilder`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The client-wide base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The client-wide default options.
    pub fn default_options(&self) -> &RequestOptions {
        &self.inner.default_options
    }

    /// Resolves the options for `spec`: client defaults overridden by the
    /// spec's own options.
    pub fn effective_options(&self, spec: &RequestSpec) -> EffectiveOptions {
        match &spec.options {
            Some(call) => self.inner.default_options.merge(call).resolve(),
            None => self.inner.default_options.resolve(),
        }
    }

    /// Sends `spec` and decodes the body with `D`.
    ///
    /// Transport failures, 429 and 500/502/503/504 are retried up to the
    /// effective `max_retries`. The effective `timeout` bounds the whole
    /// call, backoff sleeps included, and ends it with [`Error::Timeout`].
    pub async fn request<D>(&self, spec: &RequestSpec) -> Result<Response<D::Output>>
    where
        D: Decoder,
    {
        let options = self.effective_options(spec);
        let start_time = Instant::now();

        match tokio::time::timeout(options.timeout, self.dispatch::<D>(spec, &options, start_time))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                let elapsed = start_time.elapsed();
                tracing::warn!(
                    method = %spec.method,
                    path = %spec.path_template,
                    timeout_ms = options.timeout.as_millis(),
                    "Request deadline exceeded"
                );
                Err(Error::Timeout { elapsed })
            }
        }
    }

    /// Sends a list request and wraps the first page for cursor pagination.
    pub async fn request_cursor_page<T>(&self, spec: RequestSpec) -> Result<CursorPage<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.request::<Json<CursorPageBody<T>>>(&spec).await?;
        Ok(CursorPage::new(self.clone(), spec, response.data))
    }

    /// Sends a list request and wraps the first page for page-number
    /// pagination.
    pub async fn request_flat_page<T>(&self, spec: RequestSpec) -> Result<FlatPage<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.request::<Json<FlatPageBody<T>>>(&spec).await?;
        Ok(FlatPage::new(self.clone(), spec, response.data))
    }

    async fn dispatch<D>(
        &self,
        spec: &RequestSpec,
        options: &EffectiveOptions,
        start_time: Instant,
    ) -> Result<Response<D::Output>>
    where
        D: Decoder,
    {
        let url = self.build_url(spec, options)?;
        let headers = self.build_headers(spec, options)?;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match self.execute_request(spec, &url, &headers, attempt).await {
                Ok(response) => self.parse_response::<D>(response, start_time, attempt).await,
                Err(e) => Err(e),
            };

            let error = match result {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            let retries_used = attempt - 1;
            if !error.is_retryable() || retries_used >= options.max_retries {
                tracing::warn!(
                    error = %error,
                    attempt = attempt,
                    method = %spec.method,
                    path = %spec.path_template,
                    "Request failed"
                );
                return Err(error);
            }

            let floor = if self.inner.rate_limit_config.enabled {
                error.rate_limit_delay(self.inner.rate_limit_config.max_wait)
            } else {
                None
            };
            let delay = self.inner.retry_strategy.delay_with_floor(attempt, floor);

            tracing::info!(
                error = %error,
                delay_ms = delay.as_millis(),
                attempt = attempt,
                server_requested = floor.is_some(),
                "Retrying request after delay"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn build_url(&self, spec: &RequestSpec, options: &EffectiveOptions) -> Result<Url> {
        let mut url = match &options.base_url {
            Some(base_url) => Url::parse(base_url)?,
            None => self.inner.base_url.clone(),
        };

        let path = spec.path()?;
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);

        let pairs = spec.query.to_query_pairs();
        if !pairs.is_empty() || !options.extra_query.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
            for (key, value) in &options.extra_query {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Client defaults, then option headers, then spec overrides.
    fn build_headers(&self, spec: &RequestSpec, options: &EffectiveOptions) -> Result<HeaderMap> {
        let mut headers = self.inner.default_headers.clone();
        for (name, value) in &options.extra_headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }
        for (name, value) in &spec.headers {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Executes a single request attempt.
    async fn execute_request(
        &self,
        spec: &RequestSpec,
        url: &Url,
        headers: &HeaderMap,
        attempt: usize,
    ) -> Result<reqwest::Response> {
        tracing::debug!(
            method = %spec.method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let request = self
            .inner
            .http_client
            .request(spec.method.clone(), url.clone())
            .headers(headers.clone());

        let request = match &spec.body {
            Body::None => request,
            Body::Json(value) => request.json(value),
            Body::Form(payload) => request.form(&payload.to_query_pairs()),
            Body::Multipart(parts) => request.multipart(multipart_form(parts)?),
        };

        Ok(request.send().await?)
    }

    /// Checks the status and decodes a successful body with `D`.
    async fn parse_response<D>(
        &self,
        response: reqwest::Response,
        start_time: Instant,
        attempts: usize,
    ) -> Result<Response<D::Output>>
    where
        D: Decoder,
    {
        let status = response.status();
        let headers = response.headers().clone();
        let raw_body = response.bytes().await?;
        let latency = start_time.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempts,
            "Received HTTP response"
        );

        if !status.is_success() {
            let raw_response = String::from_utf8_lossy(&raw_body).into_owned();

            if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Server error (5xx)"
                );
            } else {
                tracing::error!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Client error"
                );
            }

            return Err(Error::from_response(status, headers, raw_response));
        }

        match D::decode(&raw_body) {
            Ok(data) => Ok(Response::new(
                data,
                raw_body.to_vec(),
                status,
                headers,
                latency,
                attempts,
            )),
            Err(source) => {
                let raw_body = String::from_utf8_lossy(&raw_body).into_owned();
                tracing::error!(
                    error = %source,
                    decoder = ?D::TARGET,
                    raw_response = %raw_body,
                    "Failed to decode response"
                );

                Err(Error::Decode {
                    status,
                    source,
                    raw_body,
                })
            }
        }
    }

    /// Makes a GET request and decodes a JSON body.
    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.request::<Json<Res>>(&RequestSpec::get(path)).await
    }

    /// Makes a POST request with a JSON body and decodes a JSON body.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let spec = RequestSpec::post(path).json_body(body)?;
        self.request::<Json<Res>>(&spec).await
    }

    /// Makes a PUT request with a JSON body and decodes a JSON body.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let spec = RequestSpec::put(path).json_body(body)?;
        self.request::<Json<Res>>(&spec).await
    }

    /// Makes a PATCH request with a JSON body and decodes a JSON body.
    pub async fn patch<Req, Res>(
        &self,
        path: impl Into<String>,
        body: &Req,
    ) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let spec = RequestSpec::patch(path).json_body(body)?;
        self.request::<Json<Res>>(&spec).await
    }

    /// Makes a DELETE request and discards the body.
    pub async fn delete(&self, path: impl Into<String>) -> Result<Response<()>> {
        self.request::<NoContent>(&RequestSpec::delete(path)).await
    }
}

fn multipart_form(parts: &[MultipartPart]) -> Result<reqwest::multipart::Form> {
    parts.iter().try_fold(reqwest::multipart::Form::new(), |form, part| {
        Ok(form.part(part.name().to_owned(), part.to_part()?))
    })
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use telnyx::{ClientBuilder, RetryStrategy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), telnyx::Error> {
/// let client = ClientBuilder::new()
///     .api_key("KEY")
///     .timeout(Duration::from_secs(30))
///     .retry_strategy(RetryStrategy::ExponentialBackoff {
///         initial_delay: Duration::from_millis(100),
///         max_delay: Duration::from_secs(10),
///         jitter: true,
///     })
///     .default_header("X-Client", "dialer/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    user_agent: Option<String>,
    default_headers: HeaderMap,
    default_options: RequestOptions,
    retry_strategy: RetryStrategy,
    rate_limit_config: RateLimitConfig,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            user_agent: None,
            default_headers: HeaderMap::new(),
            default_options: RequestOptions::default(),
            retry_strategy: RetryStrategy::default(),
            rate_limit_config: RateLimitConfig::default(),
            http_client: None,
        }
    }

    /// Creates a builder seeded from `TELNYX_API_KEY` and, when set,
    /// `TELNYX_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the base URL is invalid.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Configuration(format!("{API_KEY_ENV} is not set")))?;
        let builder = Self::new().api_key(api_key);
        match std::env::var(BASE_URL_ENV) {
            Ok(base_url) => builder.base_url(base_url),
            Err(_) => Ok(builder),
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the API key sent as a bearer token.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the `User-Agent` sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the default deadline for each call, retries included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_options.timeout = Some(timeout);
        self
    }

    /// Sets the default retry budget.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.default_options.max_retries = Some(max_retries);
        self
    }

    /// Replaces the client-wide default options.
    pub fn default_options(mut self, options: RequestOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Sets the backoff between retries.
    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Sets how rate limit headers are honored.
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Uses a preconfigured `reqwest::Client` as the transport.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key cannot be sent as a header or the
    /// HTTP client cannot be created.
    pub fn build(self) -> Result<Client> {
        let base_url = match self.base_url {
            Some(base_url) => base_url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        let mut default_headers = HeaderMap::new();
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = match &self.user_agent {
            Some(user_agent) => HeaderValue::try_from(user_agent.as_str())
                .map_err(|_| Error::Configuration("User agent is not a valid header value".into()))?,
            None => HeaderValue::from_static(concat!("telnyx-rust/", env!("CARGO_PKG_VERSION"))),
        };
        default_headers.insert(header::USER_AGENT, user_agent);
        if let Some(api_key) = &self.api_key {
            let mut value = HeaderValue::try_from(format!("Bearer {api_key}"))
                .map_err(|_| Error::Configuration("API key is not a valid header value".into()))?;
            value.set_sensitive(true);
            default_headers.insert(header::AUTHORIZATION, value);
        }
        for (name, value) in &self.default_headers {
            default_headers.insert(name.clone(), value.clone());
        }

        let http_client = match self.http_client {
            Some(http_client) => http_client,
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::Configuration(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                default_headers,
                default_options: self.default_options,
                retry_strategy: self.retry_strategy,
                rate_limit_config: self.rate_limit_config,
            }),
        })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("default_options", &self.default_options)
            .field("retry_strategy", &self.retry_strategy)
            .field("rate_limit_config", &self.rate_limit_config)
            .finish_non_exhaustive()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: &str) -> Client {
        Client::builder()
            .base_url(base_url)
            .unwrap()
            .api_key("KEY")
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_url_joins_base_path() {
        let client = client("https://api.example.com/v2/");
        let spec = RequestSpec::get("widgets/%1$s").path_arg("abc");
        let url = client.build_url(&spec, &client.effective_options(&spec)).unwrap();

        assert_eq!(url.as_str(), "https://api.example.com/v2/widgets/abc");
    }

    #[test]
    fn test_build_url_flattens_query_and_appends_extras() {
        let client = client("https://api.example.com/v2");
        let spec = RequestSpec::get("messaging_profiles")
            .query_params(&json!({
                "filter": {"name": {"contains": "foo"}},
                "page": {"number": 2, "size": 10},
            }))
            .unwrap()
            .options(RequestOptions::new().query_param("debug", "1"));
        let url = client.build_url(&spec, &client.effective_options(&spec)).unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("filter[name][contains]".to_string(), "foo".to_string()),
                ("page[number]".to_string(), "2".to_string()),
                ("page[size]".to_string(), "10".to_string()),
                ("debug".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_url_honors_base_url_override() {
        let client = client("https://api.example.com/v2");
        let spec = RequestSpec::get("balance")
            .options(RequestOptions::new().base_url("https://eu.example.com/v2"));
        let url = client.build_url(&spec, &client.effective_options(&spec)).unwrap();

        assert_eq!(url.as_str(), "https://eu.example.com/v2/balance");
    }

    #[test]
    fn test_header_precedence() {
        let client = Client::builder()
            .default_header("x-layer", "client")
            .unwrap()
            .api_key("KEY")
            .build()
            .unwrap();
        let spec = RequestSpec::get("x")
            .with_header("x-layer", "spec")
            .unwrap()
            .options(RequestOptions::new().header("x-layer", "options").header("x-extra", "1"));

        let headers = client
            .build_headers(&spec, &client.effective_options(&spec))
            .unwrap();

        assert_eq!(headers["x-layer"], "spec");
        assert_eq!(headers["x-extra"], "1");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer KEY");
        assert!(headers[header::AUTHORIZATION].is_sensitive());
        assert_eq!(headers[header::ACCEPT], "application/json");
    }

    #[test]
    fn test_invalid_option_header_rejected() {
        let client = client("https://api.example.com");
        let spec = RequestSpec::get("x").options(RequestOptions::new().header("bad header", "v"));

        assert!(matches!(
            client.build_headers(&spec, &client.effective_options(&spec)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_user_agent_default_and_override() {
        let spec = RequestSpec::get("x");

        let client = client("https://api.example.com");
        let headers = client.build_headers(&spec, &client.effective_options(&spec)).unwrap();
        assert!(headers[header::USER_AGENT].to_str().unwrap().starts_with("telnyx-rust/"));

        let client = Client::builder().user_agent("dialer/2.1").build().unwrap();
        let headers = client.build_headers(&spec, &client.effective_options(&spec)).unwrap();
        assert_eq!(headers[header::USER_AGENT], "dialer/2.1");
    }

    #[test]
    fn test_default_base_url() {
        let client = Client::builder().build().unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_effective_options_merge_client_and_call() {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .max_retries(4)
            .build()
            .unwrap();
        let spec = RequestSpec::get("x").options(RequestOptions::new().max_retries(0));

        let options = client.effective_options(&spec);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.max_retries, 0);
        assert_eq!(client.default_options().max_retries, Some(4));
    }
}
