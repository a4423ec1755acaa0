//! Paginated, authenticated client for the provider listing export.
#![forbid(unsafe_code)]

mod error;
mod ops;
mod source;
mod types;

#[cfg(any(test, feature = "test-support"))]
mod test_support;
#[cfg(any(test, feature = "test-support"))]
pub use test_support::{StubFeedSource, StubResponse, block_on_for_tests};

pub use error::{AuthError, FeedError, FetchError, FetchFailure, TransportError};
pub use ops::{FeedPage, FeedPager, fetch_all};
pub use source::{DEFAULT_USER_AGENT, FeedSource, HttpFeedSource};
pub use types::{
    DEFAULT_FEED_URL, FeedCredentials, FeedUrl, FetchOptions, PageRequest, PagingConfig,
    RetryPolicy,
};
