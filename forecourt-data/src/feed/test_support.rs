//! Shared fixtures for feed tests.
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::io;

use async_trait::async_trait;

use super::{FeedCredentials, FeedSource, FeedUrl, PageRequest, TransportError};

/// Scripted outcome of a single stub page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubResponse {
    /// Successful response with the given body.
    Body(Vec<u8>),
    /// Non-success HTTP status.
    Status(u16),
    /// Connection failure before any response.
    NetworkFailure,
}

/// Stub [`FeedSource`] serving scripted pages from memory.
///
/// Each page holds a queue of responses consumed one request at a time; the
/// final response repeats once the queue is drained. Pages without a script
/// answer with an empty array.
#[derive(Debug)]
pub struct StubFeedSource {
    endpoint: FeedUrl,
    accepted: Option<FeedCredentials>,
    pages: RefCell<BTreeMap<u32, VecDeque<StubResponse>>>,
    requests: RefCell<Vec<PageRequest>>,
}

impl Default for StubFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StubFeedSource {
    /// Construct a stub with no scripted pages.
    pub fn new() -> Self {
        Self {
            endpoint: FeedUrl::parse("https://feeds.example.test/export")
                .unwrap_or_default(),
            accepted: None,
            pages: RefCell::new(BTreeMap::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Serve `body` for page `number`.
    #[must_use]
    pub fn with_page(self, number: u32, body: Vec<u8>) -> Self {
        self.with_response(number, StubResponse::Body(body))
    }

    /// Append a scripted response for page `number`.
    #[must_use]
    pub fn with_response(self, number: u32, response: StubResponse) -> Self {
        self.pages
            .borrow_mut()
            .entry(number)
            .or_default()
            .push_back(response);
        self
    }

    /// Answer 401 unless the request carries exactly these credentials.
    #[must_use]
    pub fn accepting(mut self, credentials: FeedCredentials) -> Self {
        self.accepted = Some(credentials);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.borrow().clone()
    }

    /// Page numbers requested so far, in order.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requests.borrow().iter().map(|r| r.number).collect()
    }

    fn next_response(&self, number: u32) -> StubResponse {
        let mut pages = self.pages.borrow_mut();
        let Some(queue) = pages.get_mut(&number) else {
            return StubResponse::Body(b"[]".to_vec());
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(StubResponse::NetworkFailure)
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| StubResponse::Body(b"[]".to_vec()))
        }
    }
}

#[async_trait(?Send)]
impl FeedSource for StubFeedSource {
    fn endpoint(&self) -> &FeedUrl {
        &self.endpoint
    }

    async fn fetch_page(
        &self,
        credentials: &FeedCredentials,
        request: PageRequest,
    ) -> Result<Vec<u8>, TransportError> {
        self.requests.borrow_mut().push(request);
        let url = format!("{}?page={}", self.endpoint, request.number);
        if let Some(accepted) = &self.accepted
            && accepted != credentials
        {
            return Err(TransportError::Http {
                url,
                status: 401,
                message: "Unauthorized".to_owned(),
                retry_after: None,
            });
        }
        match self.next_response(request.number) {
            StubResponse::Body(body) => Ok(body),
            StubResponse::Status(status) => Err(TransportError::Http {
                url,
                status,
                message: "scripted failure".to_owned(),
                retry_after: None,
            }),
            StubResponse::NetworkFailure => Err(TransportError::Network {
                url,
                source: io::Error::new(io::ErrorKind::ConnectionReset, "scripted failure"),
            }),
        }
    }
}

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// # Panics
/// Panics when the runtime cannot be constructed.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("create Tokio runtime")
        .block_on(future)
}
