//! # Telnyx - request pipeline for the Telnyx REST API
//!
//! This crate is the transport core the generated service methods sit on:
//! it normalizes parameters, builds URLs and headers, sends requests with
//! retries and an overall deadline, decodes bodies into typed values, and
//! walks paginated listings.
//!
//! ## Quick Start
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use telnyx::{decode::Json, Client, Field, RequestSpec};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct UpdateNumber {
//!     #[serde(skip_serializing_if = "Field::is_unset")]
//!     connection_id: Field<String>,
//!     #[serde(skip_serializing_if = "Field::is_unset")]
//!     billing_group_id: Field<String>,
//! }
//!
//! #[derive(Deserialize)]
//! struct Envelope<T> {
//!     data: T,
//! }
//!
//! #[derive(Deserialize)]
//! struct PhoneNumber {
//!     id: String,
//!     phone_number: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), telnyx::Error> {
//!     let client = Client::builder()
//!         .api_key("KEY")
//!         .timeout(Duration::from_secs(30))
//!         .max_retries(3)
//!         .build()?;
//!
//!     // Sends {"connection_id": "1494404757140276705", "billing_group_id": null}
//!     let spec = RequestSpec::patch("phone_numbers/%1$s")
//!         .path_arg("1293384261075731499")
//!         .json_body(&UpdateNumber {
//!             connection_id: Field::Value("1494404757140276705".to_string()),
//!             billing_group_id: Field::Null,
//!         })?;
//!
//!     let number = client.request::<Json<Envelope<PhoneNumber>>>(&spec).await?;
//!     println!("{} ({})", number.data.data.phone_number, number.data.data.id);
//!     println!("Request took {:?}", number.latency);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Three-state fields** - [`Field`] tells "not set" apart from "set to null"
//! - **Bracketed query strings** - nested params flatten to `filter[name][contains]=...`
//! - **Compile-time decoders** - pick [`decode::Json`], [`decode::JsonList`], [`decode::Bytes`] and friends per call
//! - **Retries with backoff** - transport failures, 429 and 5xx are retried, honoring `Retry-After`
//! - **Overall deadlines** - the timeout covers every attempt and every backoff sleep
//! - **Pagination** - cursor and page-number listings, page by page or as a lazy stream
//! - **Structured logging** - every attempt, retry and failure is traced with `tracing`
//!
//! ## Error Handling
//!
//! Failed calls carry the parsed error envelope and the raw body:
//!
//! ```no_run
//! use telnyx::{decode::Json, Client, Error, RequestSpec};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().api_key("KEY").build()?;
//! let spec = RequestSpec::get("balance");
//! match client.request::<Json<serde_json::Value>>(&spec).await {
//!     Ok(response) => println!("Balance: {}", response.data),
//!     Err(Error::Client { envelope }) => {
//!         eprintln!("{} [{:?}]", envelope.message, envelope.error_code);
//!         eprintln!("  Request id: {:?}", envelope.request_id);
//!     }
//!     Err(Error::RateLimited { rate_limit_info, .. }) => {
//!         eprintln!("Still rate limited: {:?}", rate_limit_info);
//!     }
//!     Err(Error::Decode { raw_body, source, .. }) => {
//!         eprintln!("Unexpected body: {}", raw_body);
//!         eprintln!("  Near: {}", source.fragment);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry Strategies
//!
//! ```no_run
//! use telnyx::{rate_limit::RateLimitConfig, Client, RetryStrategy};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), telnyx::Error> {
//! let client = Client::builder()
//!     .api_key("KEY")
//!     .max_retries(5)
//!     .retry_strategy(RetryStrategy::ExponentialBackoff {
//!         initial_delay: Duration::from_millis(100),
//!         max_delay: Duration::from_secs(30),
//!         jitter: true,
//!     })
//!     .rate_limit_config(RateLimitConfig::default().max_wait(Duration::from_secs(10)))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod decode;
mod error;
pub mod options;
pub mod pagination;
pub mod params;
pub mod path;
pub mod rate_limit;
pub mod request;
mod response;
pub mod retry;

pub use client::{Client, ClientBuilder, API_KEY_ENV, BASE_URL_ENV, DEFAULT_BASE_URL};
pub use error::{Error, ErrorEnvelope, ErrorKind, Result};
pub use options::{EffectiveOptions, RequestOptions};
pub use pagination::{CursorPage, FlatPage};
pub use params::{Field, Params, Payload};
pub use request::{Body, MultipartPart, RequestSpec};
pub use response::Response;
pub use retry::RetryStrategy;
