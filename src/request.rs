//! Request descriptions.
//!
//! A [`RequestSpec`] is everything one API call needs: the verb, a path
//! template with its positional arguments, a normalized query payload, an
//! optional body, header overrides and per-call options. Service methods
//! build one and hand it to [`Client::request`](crate::Client::request).

use crate::options::RequestOptions;
use crate::params::{normalize, Payload};
use crate::path::expand_path;
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;

/// The body of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body.
    #[default]
    None,
    /// A JSON body, sent as `application/json`.
    Json(Value),
    /// A form body, sent as `application/x-www-form-urlencoded` with the
    /// same bracketed keys as query strings.
    Form(Payload),
    /// A `multipart/form-data` upload.
    Multipart(Vec<MultipartPart>),
}

/// One part of a multipart upload.
///
/// Parts are plain data so the whole form can be rebuilt for every retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    name: String,
    content: PartContent,
    file_name: Option<String>,
    mime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PartContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl MultipartPart {
    /// A text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::Text(value.into()),
            file_name: None,
            mime: None,
        }
    }

    /// A binary field, typically a file.
    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::Bytes(data.into()),
            file_name: None,
            mime: None,
        }
    }

    /// Sets the file name reported for this part.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the MIME type of this part.
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// The form field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn to_part(&self) -> Result<reqwest::multipart::Part> {
        let mut part = match &self.content {
            PartContent::Text(text) => reqwest::multipart::Part::text(text.clone()),
            PartContent::Bytes(data) => reqwest::multipart::Part::bytes(data.clone()),
        };
        if let Some(file_name) = &self.file_name {
            part = part.file_name(file_name.clone());
        }
        if let Some(mime) = &self.mime {
            part = part.mime_str(mime).map_err(|e| {
                Error::Configuration(format!("Invalid MIME type `{}`: {}", mime, e))
            })?;
        }
        Ok(part)
    }
}

/// A fully described API call.
///
/// # Examples
///
/// ```
/// use serde::Serialize;
/// use telnyx::RequestSpec;
///
/// #[derive(Serialize)]
/// struct Page {
///     number: u32,
///     size: u32,
/// }
///
/// #[derive(Serialize)]
/// struct ListParams {
///     page: Page,
/// }
///
/// let spec = RequestSpec::get("calls/%1$s/recordings")
///     .path_arg("v3:abc")
///     .query_params(&ListParams { page: Page { number: 2, size: 10 } })
///     .unwrap();
///
/// assert_eq!(spec.path().unwrap(), "calls/v3%3Aabc/recordings");
/// assert_eq!(spec.query.to_query_pairs().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// The HTTP method.
    pub method: Method,

    /// The path template, relative to the base URL, with `%N$s` placeholders.
    pub path_template: String,

    /// Arguments substituted into the template, in order.
    pub path_args: Vec<String>,

    /// The normalized query payload.
    pub query: Payload,

    /// The request body.
    pub body: Body,

    /// Headers that override every other header source.
    pub headers: HeaderMap,

    /// Per-call options layered over the client defaults.
    pub options: Option<RequestOptions>,
}

impl RequestSpec {
    /// Creates a spec with no arguments, query, body or overrides.
    pub fn new(method: Method, path_template: impl Into<String>) -> Self {
        Self {
            method,
            path_template: path_template.into(),
            path_args: Vec::new(),
            query: Payload::new(),
            body: Body::None,
            headers: HeaderMap::new(),
            options: None,
        }
    }

    /// Shorthand for a GET spec.
    pub fn get(path_template: impl Into<String>) -> Self {
        Self::new(Method::GET, path_template)
    }

    /// Shorthand for a POST spec.
    pub fn post(path_template: impl Into<String>) -> Self {
        Self::new(Method::POST, path_template)
    }

    /// Shorthand for a PUT spec.
    pub fn put(path_template: impl Into<String>) -> Self {
        Self::new(Method::PUT, path_template)
    }

    /// Shorthand for a PATCH spec.
    pub fn patch(path_template: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path_template)
    }

    /// Shorthand for a DELETE spec.
    pub fn delete(path_template: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path_template)
    }

    /// Appends a path argument.
    pub fn path_arg(mut self, arg: impl Into<String>) -> Self {
        self.path_args.push(arg.into());
        self
    }

    /// Sets an already normalized query payload.
    pub fn query(mut self, query: Payload) -> Self {
        self.query = query;
        self
    }

    /// Normalizes `params` and uses them as the query payload.
    pub fn query_params<P>(self, params: &P) -> Result<Self>
    where
        P: Serialize + ?Sized,
    {
        Ok(self.query(normalize(params)?))
    }

    /// Serializes `body` as the JSON body.
    ///
    /// Unset [`Field`](crate::Field)s are dropped and explicit nulls kept.
    pub fn json_body<B>(mut self, body: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let value = serde_json::to_value(body).map_err(|e| Error::Serialization(e.to_string()))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    /// Normalizes `params` and sends them form-encoded.
    pub fn form_body<P>(mut self, params: &P) -> Result<Self>
    where
        P: Serialize + ?Sized,
    {
        self.body = Body::Form(normalize(params)?);
        Ok(self)
    }

    /// Sends `parts` as a multipart upload.
    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }

    /// Adds a header override.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets per-call options.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Expands the path template with the path arguments.
    pub fn path(&self) -> Result<String> {
        expand_path(&self.path_template, &self.path_args)
    }

    /// Returns a copy with one nested query key replaced, as used when
    /// requesting the next page.
    pub(crate) fn with_query_value(&self, keys: &[&str], value: Value) -> Self {
        let mut next = self.clone();
        next.query.set_nested(keys, value);
        next
    }
}
