use async_trait::async_trait;
use reqwest::header::{RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response};
use std::io;
use std::time::Duration;

use super::{FeedCredentials, FeedUrl, PageRequest, PagingConfig, TransportError};

pub const DEFAULT_USER_AGENT: &str = "forecourt-import/0.1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A paginated provider export.
#[async_trait(?Send)]
pub trait FeedSource {
    /// Endpoint the pages are requested from.
    fn endpoint(&self) -> &FeedUrl;
    /// Fetch the raw body of one page.
    async fn fetch_page(
        &self,
        credentials: &FeedCredentials,
        request: PageRequest,
    ) -> Result<Vec<u8>, TransportError>;
}

/// HTTP implementation of [`FeedSource`] using basic authentication.
#[derive(Debug)]
pub struct HttpFeedSource {
    client: Client,
    endpoint: FeedUrl,
    user_agent: String,
    page_param: String,
    size_param: String,
}

impl HttpFeedSource {
    /// Construct an HTTP-backed feed source for `endpoint`.
    pub fn new(endpoint: FeedUrl) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| TransportError::Client { source })?;
        let paging = PagingConfig::default();
        Ok(Self {
            client,
            endpoint,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            page_param: paging.page_param,
            size_param: paging.size_param,
        })
    }

    /// Override the default user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use the query parameter names configured in `paging`.
    #[must_use]
    pub fn with_paging(mut self, paging: &PagingConfig) -> Self {
        self.page_param.clone_from(&paging.page_param);
        self.size_param.clone_from(&paging.size_param);
        self
    }

    fn page_url(&self, request: PageRequest) -> Result<String, TransportError> {
        let pairs = [
            (self.page_param.as_str(), request.number.to_string()),
            (self.size_param.as_str(), request.size.to_string()),
        ];
        self.endpoint
            .with_query(&pairs)
            .map(String::from)
            .map_err(|err| TransportError::Network {
                url: self.endpoint.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, err),
            })
    }
}

#[async_trait(?Send)]
impl FeedSource for HttpFeedSource {
    fn endpoint(&self) -> &FeedUrl {
        &self.endpoint
    }

    async fn fetch_page(
        &self,
        credentials: &FeedCredentials,
        request: PageRequest,
    ) -> Result<Vec<u8>, TransportError> {
        let url = self.page_url(request)?;
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, self.user_agent.as_str())
            .basic_auth(credentials.username(), Some(credentials.password()))
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, &url))?;
        let response = check_status(response, &url)?;
        let body = response
            .bytes()
            .await
            .map_err(|err| convert_reqwest_error(err, &url))?;
        Ok(body.to_vec())
    }
}

fn check_status(response: Response, url: &str) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    Err(TransportError::Http {
        url: url.to_owned(),
        status: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_owned(),
        retry_after,
    })
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
            retry_after: None,
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}
