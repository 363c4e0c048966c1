//! Paginated list responses.
//!
//! List endpoints answer with `{"data": [...], "meta": {...}}`. Two flavors
//! of `meta` exist:
//!
//! - cursor pages carry `{"cursors": {"after": "..."}}`; the next page is
//!   requested with `page[after]` set to that cursor, and a missing cursor
//!   or an empty page means the listing is done ([`CursorPage`]).
//! - flat pages carry `page_number`, `page_size`, `total_pages` and
//!   `total_results`; the next page is requested with `page[number]`
//!   incremented, and an empty page always ends the listing ([`FlatPage`]).
//!
//! Both wrappers keep the [`RequestSpec`] that produced them, so fetching
//! the next page replays the original call with only the page key changed.
//! Restarting a listing means issuing the original list call again.
//!
//! ```no_run
//! use futures_util::TryStreamExt;
//! use serde::Deserialize;
//! use telnyx::{Client, RequestSpec};
//!
//! #[derive(Deserialize)]
//! struct Message {
//!     id: String,
//! }
//!
//! # async fn example() -> Result<(), telnyx::Error> {
//! let client = Client::builder().api_key("KEY").build()?;
//! let first = client
//!     .request_flat_page::<Message>(RequestSpec::get("messaging_profiles"))
//!     .await?;
//!
//! let messages = first.into_stream();
//! futures_util::pin_mut!(messages);
//! while let Some(message) = messages.try_next().await? {
//!     println!("{}", message.id);
//! }
//! # Ok(())
//! # }
//! ```

use crate::{Client, RequestSpec, Result};
use futures_util::{stream, Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Query keys carrying the cursor of the next page: `page[after]`.
pub const CURSOR_PARAM: [&str; 2] = ["page", "after"];

/// Query keys carrying the page number: `page[number]`.
pub const PAGE_NUMBER_PARAM: [&str; 2] = ["page", "number"];

/// Query keys carrying the page size: `page[size]`.
pub const PAGE_SIZE_PARAM: [&str; 2] = ["page", "size"];

/// Wire shape of a cursor-paginated list body.
#[derive(Debug, Clone, Deserialize)]
pub struct CursorPageBody<T> {
    /// The items of this page.
    pub data: Vec<T>,
    /// Pagination metadata.
    #[serde(default)]
    pub meta: Option<CursorMeta>,
}

/// Cursor pagination metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorMeta {
    /// Cursors around this page.
    #[serde(default)]
    pub cursors: Option<Cursors>,
}

/// Opaque cursors pointing at neighboring pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cursors {
    /// Cursor of the next page, absent on the last page.
    #[serde(default)]
    pub after: Option<String>,
    /// Cursor of the previous page.
    #[serde(default)]
    pub before: Option<String>,
}

/// Wire shape of a page-number-paginated list body.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatPageBody<T> {
    /// The items of this page.
    pub data: Vec<T>,
    /// Pagination metadata.
    #[serde(default)]
    pub meta: Option<FlatMeta>,
}

/// Page-number pagination metadata. Not every endpoint reports totals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatMeta {
    /// 1-indexed number of this page.
    #[serde(default)]
    pub page_number: Option<u64>,
    /// Requested page size.
    #[serde(default)]
    pub page_size: Option<u64>,
    /// Number of pages in the listing.
    #[serde(default)]
    pub total_pages: Option<u64>,
    /// Number of items in the listing.
    #[serde(default)]
    pub total_results: Option<u64>,
}

/// One page of a cursor-paginated listing.
#[derive(Debug)]
pub struct CursorPage<T> {
    items: Vec<T>,
    received: usize,
    next_cursor: Option<String>,
    client: Client,
    spec: RequestSpec,
}

impl<T> CursorPage<T>
where
    T: DeserializeOwned,
{
    pub(crate) fn new(client: Client, spec: RequestSpec, body: CursorPageBody<T>) -> Self {
        let next_cursor = body
            .meta
            .and_then(|meta| meta.cursors)
            .and_then(|cursors| cursors.after)
            .filter(|cursor| !cursor.is_empty());

        Self {
            received: body.data.len(),
            items: body.data,
            next_cursor,
            client,
            spec,
        }
    }

    /// The items of this page, in server order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the page, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The cursor of the next page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Returns `true` exactly when a next cursor is present.
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// Returns `true` if [`next_page`](Self::next_page) would issue a request.
    ///
    /// An empty page ends the listing even when it still carries a cursor.
    pub fn has_next_page(&self) -> bool {
        self.received > 0 && self.has_more()
    }

    /// Fetches the page after this one, or `None` when the listing is done.
    pub async fn next_page(&self) -> Result<Option<CursorPage<T>>> {
        if self.received == 0 {
            return Ok(None);
        }
        let Some(cursor) = &self.next_cursor else {
            return Ok(None);
        };

        tracing::debug!(
            path = %self.spec.path_template,
            cursor = %cursor,
            "Fetching next cursor page"
        );
        let spec = self.spec.with_query_value(&CURSOR_PARAM, json!(cursor));
        self.client.request_cursor_page(spec).await.map(Some)
    }

    /// Streams every item from this page onward, fetching pages lazily.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        item_stream(self)
    }

    /// Collects every item from this page onward.
    pub async fn collect_all(self) -> Result<Vec<T>> {
        self.into_stream().try_collect().await
    }
}

/// One page of a page-number-paginated listing.
#[derive(Debug)]
pub struct FlatPage<T> {
    items: Vec<T>,
    received: usize,
    page_number: u64,
    page_size: Option<u64>,
    total_pages: Option<u64>,
    total_items: Option<u64>,
    client: Client,
    spec: RequestSpec,
}

impl<T> FlatPage<T>
where
    T: DeserializeOwned,
{
    pub(crate) fn new(client: Client, spec: RequestSpec, body: FlatPageBody<T>) -> Self {
        let meta = body.meta.unwrap_or_default();
        let requested = |keys: &[&str]| spec.query.get_nested(keys).and_then(as_u64);

        let page_number = meta
            .page_number
            .or_else(|| requested(&PAGE_NUMBER_PARAM))
            .unwrap_or(1);
        let page_size = meta.page_size.or_else(|| requested(&PAGE_SIZE_PARAM));

        Self {
            received: body.data.len(),
            items: body.data,
            page_number,
            page_size,
            total_pages: meta.total_pages,
            total_items: meta.total_results,
            client,
            spec,
        }
    }

    /// The items of this page, in server order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the page, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// 1-indexed number of this page.
    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    /// Page size, as reported by the server or requested by the caller.
    pub fn page_size(&self) -> Option<u64> {
        self.page_size
    }

    /// Number of pages in the listing, when the server reports it.
    pub fn total_pages(&self) -> Option<u64> {
        self.total_pages
    }

    /// Number of items in the listing, when the server reports it.
    pub fn total_items(&self) -> Option<u64> {
        self.total_items
    }

    /// Returns `true` if [`next_page`](Self::next_page) would issue a request.
    ///
    /// An empty page ends the listing. Otherwise the listing continues
    /// unless the reported total says this was the last page.
    pub fn has_next_page(&self) -> bool {
        if self.received == 0 {
            return false;
        }
        self.total_pages
            .map_or(true, |total_pages| self.page_number < total_pages)
    }

    /// Fetches the page after this one, or `None` when the listing is done.
    pub async fn next_page(&self) -> Result<Option<FlatPage<T>>> {
        if !self.has_next_page() {
            return Ok(None);
        }

        let next_number = self.page_number + 1;
        tracing::debug!(
            path = %self.spec.path_template,
            page_number = next_number,
            "Fetching next page"
        );
        let spec = self
            .spec
            .with_query_value(&PAGE_NUMBER_PARAM, json!(next_number));
        self.client.request_flat_page(spec).await.map(Some)
    }

    /// Streams every item from this page onward, fetching pages lazily.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        item_stream(self)
    }

    /// Collects every item from this page onward.
    pub async fn collect_all(self) -> Result<Vec<T>> {
        self.into_stream().try_collect().await
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

/// A page that knows how to fetch its successor.
trait Paged: Sized {
    type Item;

    fn take_items(&mut self) -> Vec<Self::Item>;

    async fn fetch_next(&self) -> Result<Option<Self>>;
}

impl<T: DeserializeOwned> Paged for CursorPage<T> {
    type Item = T;

    fn take_items(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    async fn fetch_next(&self) -> Result<Option<Self>> {
        self.next_page().await
    }
}

impl<T: DeserializeOwned> Paged for FlatPage<T> {
    type Item = T;

    fn take_items(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    async fn fetch_next(&self) -> Result<Option<Self>> {
        self.next_page().await
    }
}

/// Yields buffered items and fetches the next page only once the buffer
/// is empty, so pages are requested strictly in order.
struct Pager<P: Paged> {
    items: std::vec::IntoIter<P::Item>,
    page: Option<P>,
}

impl<P: Paged> Pager<P> {
    fn new(mut page: P) -> Self {
        Self {
            items: page.take_items().into_iter(),
            page: Some(page),
        }
    }

    async fn advance(mut self) -> Result<Option<(P::Item, Self)>> {
        loop {
            if let Some(item) = self.items.next() {
                return Ok(Some((item, self)));
            }
            let Some(page) = self.page.take() else {
                return Ok(None);
            };
            let Some(mut next) = page.fetch_next().await? else {
                return Ok(None);
            };
            self.items = next.take_items().into_iter();
            self.page = Some(next);
        }
    }
}

fn item_stream<P: Paged>(page: P) -> impl Stream<Item = Result<P::Item>> {
    stream::try_unfold(Pager::new(page), Pager::<P>::advance)
}
