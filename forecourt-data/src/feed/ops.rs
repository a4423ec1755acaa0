use forecourt_core::RawListing;
use futures_util::stream::{self, Stream, TryStreamExt};
use serde_json::Value;

use super::source::FeedSource;
use super::{
    AuthError, FeedCredentials, FeedError, FetchError, FetchFailure, FetchOptions, PageRequest,
    PagingConfig, TransportError,
};

/// One decoded page of provider listings.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    /// Page number as requested from the provider.
    pub number: u32,
    /// Listings in provider order.
    pub listings: Vec<RawListing>,
}

/// Start iterating over every page exposed by `source`.
///
/// Credentials are checked before any request is made. The returned
/// [`FeedPager`] issues requests lazily, one page at a time, starting from
/// [`PagingConfig::first_page`] on every call.
pub fn fetch_all<'a, S: FeedSource + ?Sized>(
    source: &'a S,
    credentials: &FeedCredentials,
    options: FetchOptions,
) -> Result<FeedPager<'a, S>, FeedError> {
    if !credentials.is_complete() {
        return Err(AuthError::MissingCredentials.into());
    }
    log::debug!(
        "fetching feed from {} with {} listings per page",
        source.endpoint(),
        options.paging.page_size
    );
    Ok(FeedPager {
        source,
        credentials: credentials.clone(),
        next: Some(options.paging.first_page),
        options,
        pages_fetched: 0,
        last_retrieved: None,
    })
}

/// Lazy, non-restartable cursor over the pages of a provider feed.
///
/// The pager stops at the first empty page or when the page carries a false
/// end-of-data marker. After an error it is exhausted.
#[derive(Debug)]
pub struct FeedPager<'a, S: FeedSource + ?Sized> {
    source: &'a S,
    credentials: FeedCredentials,
    options: FetchOptions,
    next: Option<u32>,
    pages_fetched: u32,
    last_retrieved: Option<u32>,
}

impl<S: FeedSource + ?Sized> FeedPager<'_, S> {
    /// Fetch the next non-empty page, or `None` at end of data.
    pub async fn next_page(&mut self) -> Result<Option<FeedPage>, FeedError> {
        let Some(number) = self.next.take() else {
            return Ok(None);
        };
        let paging = &self.options.paging;
        if self.pages_fetched >= paging.max_pages {
            return Err(self
                .failure(number, 0, FetchFailure::PageLimit {
                    limit: paging.max_pages,
                })
                .into());
        }

        let request = PageRequest {
            number,
            size: paging.page_size,
        };
        let (mut body, attempts) = self.fetch_with_retry(request).await?;
        let decoded = decode_page(&mut body, &self.options.paging)
            .map_err(|message| self.failure(number, attempts, FetchFailure::Malformed { message }))?;

        self.pages_fetched += 1;
        self.last_retrieved = Some(number);
        log::debug!(
            "feed page {number} returned {} listing(s)",
            decoded.listings.len()
        );
        if decoded.listings.is_empty() {
            return Ok(None);
        }
        if decoded.has_more {
            self.next = number.checked_add(1);
        }
        Ok(Some(FeedPage {
            number,
            listings: decoded.listings,
        }))
    }

    /// Number of pages retrieved successfully so far, including a final
    /// empty page.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Number of the last page retrieved successfully.
    pub fn last_retrieved(&self) -> Option<u32> {
        self.last_retrieved
    }

    /// Drain the feed into a single vector of listings.
    pub async fn collect_all(mut self) -> Result<Vec<RawListing>, FeedError> {
        let mut listings = Vec::new();
        while let Some(page) = self.next_page().await? {
            listings.extend(page.listings);
        }
        Ok(listings)
    }

    /// Expose the feed as a stream of individual listings.
    pub fn into_stream(self) -> impl Stream<Item = Result<RawListing, FeedError>> {
        stream::try_unfold(self, |mut pager| async move {
            let page = pager.next_page().await?;
            Ok::<_, FeedError>(page.map(|page| {
                let listings = stream::iter(page.listings.into_iter().map(Ok::<_, FeedError>));
                (listings, pager)
            }))
        })
        .try_flatten()
    }

    async fn fetch_with_retry(&self, request: PageRequest) -> Result<(Vec<u8>, u32), FeedError> {
        let policy = self.options.retry;
        let mut attempt = 1;
        loop {
            match self.source.fetch_page(&self.credentials, request).await {
                Ok(body) => return Ok((body, attempt)),
                Err(err) if err.is_auth_rejection() => {
                    return Err(AuthError::Rejected {
                        url: self.source.endpoint().to_string(),
                        status: err.status().unwrap_or_default(),
                    }
                    .into());
                }
                Err(err) if err.is_transient() && attempt < policy.attempts() => {
                    attempt += 1;
                    let delay = policy.delay_before(attempt);
                    let delay = err
                        .retry_after()
                        .map_or(delay, |hint| hint.min(policy.max_delay).max(delay));
                    log::warn!(
                        "feed page {} failed on attempt {}: {err}; retrying in {delay:?}",
                        request.number,
                        attempt - 1
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(self.transport_failure(request.number, attempt, err)),
            }
        }
    }

    fn transport_failure(&self, page: u32, attempts: u32, err: TransportError) -> FeedError {
        self.failure(page, attempts, FetchFailure::Transport(err))
            .into()
    }

    fn failure(&self, page: u32, attempts: u32, source: FetchFailure) -> FetchError {
        FetchError {
            page,
            last_retrieved: self.last_retrieved,
            attempts,
            source,
        }
    }
}

#[derive(Debug)]
struct DecodedPage {
    listings: Vec<RawListing>,
    has_more: bool,
}

fn decode_page(body: &mut [u8], paging: &PagingConfig) -> Result<DecodedPage, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DecodedPage {
            listings: Vec::new(),
            has_more: false,
        });
    }
    let value: Value = simd_json::serde::from_slice(body).map_err(|err| err.to_string())?;
    let (items, has_more) = match value {
        Value::Array(items) => (items, true),
        Value::Object(mut envelope) => {
            let has_more = match envelope.get(&paging.has_more_key) {
                None | Some(Value::Null) => true,
                Some(Value::Bool(flag)) => *flag,
                Some(other) => {
                    return Err(format!(
                        "`{}` should be a boolean, found {other}",
                        paging.has_more_key
                    ));
                }
            };
            match envelope.remove(&paging.items_key) {
                Some(Value::Array(items)) => (items, has_more),
                Some(Value::Null) | None => (Vec::new(), false),
                Some(_) => {
                    return Err(format!("`{}` should be an array", paging.items_key));
                }
            }
        }
        _ => return Err("expected a JSON array or object".to_owned()),
    };

    let listings = items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            RawListing::from_value(item)
                .ok_or_else(|| format!("listing at position {position} is not a JSON object"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DecodedPage { listings, has_more })
}
