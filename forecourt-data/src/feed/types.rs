//! Domain wrappers and settings for the provider feed.

use std::{fmt, ops::Deref, time::Duration};

use url::Url;

/// Export endpoint of the bilinfo listing API.
pub const DEFAULT_FEED_URL: &str = "https://gw.bilinfo.net/listingapi/api/export";

/// Absolute URL of a provider feed endpoint.
///
/// # Examples
/// ```
/// # use forecourt_data::feed::FeedUrl;
/// let url = FeedUrl::parse("https://feeds.example.test/export/").expect("valid URL");
/// assert_eq!(url.as_ref(), "https://feeds.example.test/export");
/// assert!(FeedUrl::parse("not a url").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUrl(String);

impl FeedUrl {
    /// Validate and wrap an absolute URL, trimming trailing slashes.
    pub fn parse(value: &str) -> Result<Self, url::ParseError> {
        let trimmed = value.trim().trim_end_matches('/');
        Url::parse(trimmed)?;
        Ok(Self(trimmed.to_owned()))
    }

    /// Consume the wrapper and return the inner [`String`].
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Render the URL for a page request, including its query parameters.
    pub(crate) fn with_query(&self, pairs: &[(&str, String)]) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.0)?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

impl Default for FeedUrl {
    fn default() -> Self {
        Self(DEFAULT_FEED_URL.to_owned())
    }
}

impl TryFrom<&str> for FeedUrl {
    type Error = url::ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl AsRef<str> for FeedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for FeedUrl {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for FeedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP basic-auth credentials for the provider feed.
///
/// The password never appears in `Debug` output.
///
/// # Examples
/// ```
/// # use forecourt_data::feed::FeedCredentials;
/// let credentials = FeedCredentials::new("dealer", "s3cret");
/// assert!(credentials.is_complete());
/// assert!(!format!("{credentials:?}").contains("s3cret"));
/// assert!(!FeedCredentials::new("dealer", "").is_complete());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FeedCredentials {
    username: String,
    password: String,
}

impl FeedCredentials {
    /// Pair a username with its password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Account name sent to the provider.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Secret sent to the provider. Keep it out of logs.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether both username and password are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for FeedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A single page request issued to a [`FeedSource`](super::FeedSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, counted from [`PagingConfig::first_page`].
    pub number: u32,
    /// Number of listings requested per page.
    pub size: u32,
}

/// How the provider paginates its export.
///
/// The defaults match the bilinfo export: 1-based page numbers, listings
/// under a `Vehicles` key and an optional `HasMore` end marker. Bare JSON
/// arrays are accepted as pages too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingConfig {
    /// Query parameter carrying the page number.
    pub page_param: String,
    /// Query parameter carrying the page size.
    pub size_param: String,
    /// Listings requested per page.
    pub page_size: u32,
    /// Number of the first page.
    pub first_page: u32,
    /// Object key holding the listings of a page.
    pub items_key: String,
    /// Object key holding a boolean "more pages follow" marker.
    pub has_more_key: String,
    /// Upper bound on pages fetched in one run.
    pub max_pages: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_param: "page".to_owned(),
            size_param: "pageSize".to_owned(),
            page_size: 100,
            first_page: 1,
            items_key: "Vehicles".to_owned(),
            has_more_key: "HasMore".to_owned(),
            max_pages: 10_000,
        }
    }
}

impl PagingConfig {
    /// Override the number of listings requested per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override the query parameter names.
    #[must_use]
    pub fn with_query_params(
        mut self,
        page_param: impl Into<String>,
        size_param: impl Into<String>,
    ) -> Self {
        self.page_param = page_param.into();
        self.size_param = size_param.into();
        self
    }

    /// Override the key holding listings inside a page object.
    #[must_use]
    pub fn with_items_key(mut self, items_key: impl Into<String>) -> Self {
        self.items_key = items_key.into();
        self
    }

    /// Override the key holding the "more pages follow" marker.
    #[must_use]
    pub fn with_has_more_key(mut self, has_more_key: impl Into<String>) -> Self {
        self.has_more_key = has_more_key.into();
        self
    }
}

/// Bounded exponential backoff applied to transient page failures.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use forecourt_data::feed::RetryPolicy;
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.delay_before(2), Duration::from_millis(500));
/// assert_eq!(policy.delay_before(3), Duration::from_secs(1));
/// assert_eq!(RetryPolicy::immediate(4).delay_before(4), Duration::ZERO);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_attempts` times without sleeping in between.
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Override the attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay to wait before attempt number `attempt` (1-based).
    ///
    /// The first attempt never waits; each later one doubles the previous
    /// delay, capped at [`RetryPolicy::max_delay`].
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let doublings = attempt.saturating_sub(2).min(16);
        self.initial_delay
            .saturating_mul(1_u32 << doublings)
            .min(self.max_delay)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Settings applied to a full feed traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Pagination settings.
    pub paging: PagingConfig,
    /// Backoff applied to transient failures.
    pub retry: RetryPolicy,
}

impl FetchOptions {
    /// Replace the pagination settings.
    #[must_use]
    pub fn with_paging(mut self, paging: PagingConfig) -> Self {
        self.paging = paging;
        self
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
