//! Error types produced by the provider feed client.

use std::{io, time::Duration};

use thiserror::Error;

/// Transport-level errors encountered while requesting a feed page.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server answered with a non-success HTTP status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Request URL, without credentials.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description.
        message: String,
        /// Delay requested by a `Retry-After` header, when present.
        retry_after: Option<Duration>,
    },
    /// The request failed before a response arrived.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Request URL, without credentials.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// Underlying client error.
        source: reqwest::Error,
    },
}

impl TransportError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether repeating the request might succeed.
    ///
    /// Network failures, timeouts, throttling and server errors are transient;
    /// other client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Http { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            Self::Client { .. } => false,
        }
    }

    /// Whether the provider refused the supplied credentials.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    pub(crate) fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// The provider refused access, or no usable credentials were configured.
///
/// Authentication failures are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Username or password was empty.
    #[error("feed credentials are missing; configure a username and password")]
    MissingCredentials,
    /// The provider answered 401 or 403.
    #[error("feed at {url} rejected the supplied credentials (status {status})")]
    Rejected {
        /// Request URL, without credentials.
        url: String,
        /// HTTP status code.
        status: u16,
    },
}

/// Why a page could not be retrieved.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchFailure {
    /// Every attempt failed at the transport level.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The page body was not a recognisable listing page.
    #[error("malformed page: {message}")]
    Malformed {
        /// What was wrong with the body.
        message: String,
    },
    /// The provider kept returning data past the configured page limit.
    #[error("feed did not signal end of data within {limit} pages")]
    PageLimit {
        /// Configured maximum number of pages.
        limit: u32,
    },
}

/// A page could not be fetched after exhausting retries.
///
/// Carries the page that failed and the last page retrieved successfully so
/// the caller can report how far the fetch got.
#[derive(Debug, Error)]
#[error("failed to fetch feed page {page} after {attempts} attempt(s): {source}")]
pub struct FetchError {
    /// Page number that failed.
    pub page: u32,
    /// Last page retrieved successfully, if any.
    pub last_retrieved: Option<u32>,
    /// Number of requests made for the failing page.
    pub attempts: u32,
    /// Final failure.
    #[source]
    pub source: FetchFailure,
}

/// Errors surfaced while iterating over the provider feed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedError {
    /// Credentials were missing or rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// A page could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
