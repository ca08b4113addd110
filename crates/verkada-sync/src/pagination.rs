//! Drains paginated list endpoints into complete collections.
//!
//! Every list endpoint is modelled as a [`PageSource`]: given the cursor for the page to fetch
//! (`None` for the first page) it returns that page's items plus what to request next. The two
//! upstream pagination protocols only differ in how that "next" is decided:
//!
//! * token cursor: the vendor returns an opaque `next_page_token`. Iteration stops when the
//!   token is absent **or** identical to the token that was just sent, since some responses echo
//!   the final token back indefinitely.
//! * offset count: the registry returns `total`; pages are requested as `page=0,1,2..` with a
//!   fixed `limit` until `limit * pages_fetched >= total`.
//!
//! Pages are fetched strictly one after another. Cursors are single-use, so a page stream cannot
//! be restarted; a failed page aborts the stream and nothing collected so far is returned.

use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{cameras::Camera, ids::Id, leases::LeaseRecord};
use futures::{Stream, TryStreamExt};
use tracing::debug;

use crate::registry::LeaseRegistry;
use crate::vendor::{VendorApi, VendorToken};

/// Page size requested from the lease registry.
pub const LEASE_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next<C> {
    Cursor(C),
    Done,
}

#[derive(Debug, Clone)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Next<C>,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;
    type Cursor: Send;

    /// Collection name used in logs and errors.
    fn collection(&self) -> &'static str;

    async fn fetch_page(&self, cursor: Option<Self::Cursor>) -> Result<Page<Self::Item, Self::Cursor>>;
}

/// Token-cursor protocol: continue only with a present token that differs from the one sent.
pub fn token_cursor_page<T>(items: Vec<T>, sent: Option<&Id>, returned: Option<Id>) -> Page<T, Id> {
    let next = match returned {
        Some(token) if token.is_empty() => Next::Done,
        Some(token) if Some(&token) == sent => Next::Done,
        Some(token) => Next::Cursor(token),
        None => Next::Done,
    };
    Page { items, next }
}

/// Offset-count protocol: `page` is the zero-based page just fetched.
pub fn offset_count_page<T>(items: Vec<T>, page: u32, limit: u32, total: u64) -> Page<T, u32> {
    let fetched = u64::from(page) + 1;
    let next = if total > u64::from(limit.max(1)) * fetched {
        Next::Cursor(page + 1)
    } else {
        Next::Done
    };
    Page { items, next }
}

enum Position<C> {
    Start,
    At(C),
    Finished,
}

async fn step<S: PageSource>(
    source: &S,
    position: Position<S::Cursor>,
) -> Result<Option<(Vec<S::Item>, Position<S::Cursor>)>> {
    let cursor = match position {
        Position::Start => None,
        Position::At(cursor) => Some(cursor),
        Position::Finished => return Ok(None),
    };

    let page = source.fetch_page(cursor).await?;
    let position = match page.next {
        Next::Cursor(cursor) => Position::At(cursor),
        Next::Done => Position::Finished,
    };
    Ok(Some((page.items, position)))
}

/// Lazy stream of pages. Ends after the last page or the first error.
pub fn pages<S: PageSource>(source: &S) -> impl Stream<Item = Result<Vec<S::Item>>> + Send + '_ {
    futures::stream::try_unfold(Position::Start, move |position| step(source, position))
}

/// Fetch every page and concatenate the items in page order.
pub async fn fetch_all<S: PageSource>(source: &S) -> Result<Vec<S::Item>> {
    let mut items = Vec::new();
    let mut stream = Box::pin(pages(source));
    let mut fetched = 0usize;

    while let Some(page) = stream
        .try_next()
        .await
        .with_context(|| format!("{} page {} request failed", source.collection(), fetched))?
    {
        fetched += 1;
        debug!(
            collection = source.collection(),
            page = fetched,
            items = page.len(),
            "fetched page"
        );
        items.extend(page);
    }

    debug!(
        collection = source.collection(),
        pages = fetched,
        items = items.len(),
        "collection complete"
    );
    Ok(items)
}

/// Vendor device inventory, token-cursor paginated.
pub struct CameraPages<'a> {
    vendor: &'a dyn VendorApi,
    token: &'a VendorToken,
}

impl<'a> CameraPages<'a> {
    pub fn new(vendor: &'a dyn VendorApi, token: &'a VendorToken) -> Self {
        Self { vendor, token }
    }
}

#[async_trait]
impl<'a> PageSource for CameraPages<'a> {
    type Item = Camera;
    type Cursor = Id;

    fn collection(&self) -> &'static str {
        "cameras"
    }

    async fn fetch_page(&self, cursor: Option<Id>) -> Result<Page<Camera, Id>> {
        let page = self.vendor.list_cameras(self.token, cursor.as_ref()).await?;
        Ok(token_cursor_page(page.cameras, cursor.as_ref(), page.next_page_token))
    }
}

/// Registry leases for one connection, offset-count paginated.
pub struct LeasePages<'a> {
    registry: &'a dyn LeaseRegistry,
    limit: u32,
}

impl<'a> LeasePages<'a> {
    pub fn new(registry: &'a dyn LeaseRegistry) -> Self {
        Self::with_limit(registry, LEASE_PAGE_LIMIT)
    }

    pub fn with_limit(registry: &'a dyn LeaseRegistry, limit: u32) -> Self {
        Self {
            registry,
            limit: limit.max(1),
        }
    }
}

#[async_trait]
impl<'a> PageSource for LeasePages<'a> {
    type Item = LeaseRecord;
    type Cursor = u32;

    fn collection(&self) -> &'static str {
        "leases"
    }

    async fn fetch_page(&self, cursor: Option<u32>) -> Result<Page<LeaseRecord, u32>> {
        let page = cursor.unwrap_or(0);
        let list = self.registry.list_leases(page, self.limit).await?;
        Ok(offset_count_page(list.items, page, self.limit, list.total))
    }
}
