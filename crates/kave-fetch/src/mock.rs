use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::error::{FetchError, Result};
use crate::fetcher::Fetcher;

enum Response {
    Body(Bytes),
    Fail(FetchError),
}

/// In-memory [`Fetcher`] keyed by absolute URL.
///
/// Unknown URLs answer `404`. Every call is counted, including failed ones.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Response>>,
    hits:      Mutex<HashMap<String, usize>>,
    delay:     Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every response for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, url: &str, body: impl Into<Bytes>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Response::Body(body.into()));
        self
    }

    pub fn fail(&self, url: &str, error: FetchError) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Response::Fail(error));
        self
    }

    /// Number of fetches of `url` so far.
    pub fn hits(&self, url: &str) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    pub fn reset_hits(&self) {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        *self
            .hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_string())
            .or_default() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        match responses.get(url.as_str()) {
            Some(Response::Body(body)) => Ok(body.clone()),
            Some(Response::Fail(e)) => Err(e.clone()),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
