//! Response decoding.
//!
//! Each call site picks a decoder type at compile time; the dispatcher
//! calls [`Decoder::decode`] on the raw 2xx body. The set of shapes is
//! closed and described by [`Target`]:
//!
//! | Decoder | Target | Output |
//! |---|---|---|
//! | [`NoContent`] | [`Target::None`] | `()` |
//! | [`Text`] | [`Target::Raw`] | `String` |
//! | [`Bytes`] | [`Target::Raw`] | `Vec<u8>` |
//! | [`Json<T>`] | [`Target::Shape`] | `T` |
//! | [`JsonList<T>`] | [`Target::ListOf`] | `Vec<T>` |
//!
//! Structured shapes are plain `serde` types: unknown fields are ignored,
//! optional fields marked `#[serde(default)]` default when missing, and a
//! missing required field is an error.

use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Characters of context kept on each side of a decode failure.
const FRAGMENT_RADIUS: usize = 40;

/// The shape a decoder turns a response body into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The body is discarded.
    None,
    /// The body is returned untouched, as text or bytes.
    Raw,
    /// The body is a JSON object decoded into a typed value.
    Shape,
    /// The body is a JSON array decoded element by element.
    ListOf,
}

/// Converts a raw response body into a typed value. Pure, no I/O.
pub trait Decoder {
    /// The decoded value.
    type Output;

    /// The shape this decoder expects.
    const TARGET: Target;

    /// Decodes `raw`.
    fn decode(raw: &[u8]) -> Result<Self::Output, DecodeError>;
}

/// A body that did not match the declared shape.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} near `{fragment}`")]
pub struct DecodeError {
    /// What went wrong.
    pub message: String,
    /// The part of the body around the failure.
    pub fragment: String,
}

impl DecodeError {
    fn from_serde(err: &serde_json::Error, raw: &[u8]) -> Self {
        Self {
            message: err.to_string(),
            fragment: fragment_at(raw, err.line(), err.column()),
        }
    }
}

/// Discards the body.
#[derive(Debug, Clone, Copy)]
pub struct NoContent;

impl Decoder for NoContent {
    type Output = ();
    const TARGET: Target = Target::None;

    fn decode(_raw: &[u8]) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// Returns the body as UTF-8 text.
#[derive(Debug, Clone, Copy)]
pub struct Text;

impl Decoder for Text {
    type Output = String;
    const TARGET: Target = Target::Raw;

    fn decode(raw: &[u8]) -> Result<String, DecodeError> {
        String::from_utf8(raw.to_vec()).map_err(|e| DecodeError {
            message: format!("body is not valid UTF-8: {e}"),
            fragment: fragment_at(raw, 1, e.utf8_error().valid_up_to() + 1),
        })
    }
}

/// Returns the body bytes untouched, e.g. for document downloads.
#[derive(Debug, Clone, Copy)]
pub struct Bytes;

impl Decoder for Bytes {
    type Output = Vec<u8>;
    const TARGET: Target = Target::Raw;

    fn decode(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Ok(raw.to_vec())
    }
}

/// Decodes a JSON body into `T`.
#[derive(Debug, Clone, Copy)]
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T: DeserializeOwned> Decoder for Json<T> {
    type Output = T;
    const TARGET: Target = Target::Shape;

    fn decode(raw: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(raw).map_err(|e| DecodeError::from_serde(&e, raw))
    }
}

/// Decodes a JSON array body into `Vec<T>`, preserving order.
#[derive(Debug, Clone, Copy)]
pub struct JsonList<T>(PhantomData<fn() -> T>);

impl<T: DeserializeOwned> Decoder for JsonList<T> {
    type Output = Vec<T>;
    const TARGET: Target = Target::ListOf;

    fn decode(raw: &[u8]) -> Result<Vec<T>, DecodeError> {
        serde_json::from_slice(raw).map_err(|e| DecodeError::from_serde(&e, raw))
    }
}

/// Decodes `raw` with decoder `D`.
///
/// # Examples
///
/// ```
/// use serde::Deserialize;
/// use telnyx::decode::{decode, Json};
///
/// #[derive(Deserialize)]
/// struct Balance {
///     currency: String,
///     #[serde(default)]
///     pending: Option<String>,
/// }
///
/// let balance = decode::<Json<Balance>>(br#"{"currency":"USD","extra":1}"#).unwrap();
/// assert_eq!(balance.currency, "USD");
/// assert!(balance.pending.is_none());
/// ```
pub fn decode<D: Decoder>(raw: &[u8]) -> Result<D::Output, DecodeError> {
    D::decode(raw)
}

/// Cuts the text around a 1-indexed line/column position.
fn fragment_at(raw: &[u8], line: usize, column: usize) -> String {
    let text = String::from_utf8_lossy(raw);
    let Some(line_text) = text.lines().nth(line.saturating_sub(1)) else {
        return text.chars().take(2 * FRAGMENT_RADIUS).collect();
    };
    let chars: Vec<char> = line_text.chars().collect();
    let center = column.saturating_sub(1).min(chars.len());
    let start = center.saturating_sub(FRAGMENT_RADIUS);
    let end = (center + FRAGMENT_RADIUS).min(chars.len());
    chars[start..end].iter().collect()
}
