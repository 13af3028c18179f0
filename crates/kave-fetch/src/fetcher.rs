use std::future::Future;

use bytes::Bytes;
use url::Url;

use crate::error::Result;

/// Transport capability used by the sync engine.
///
/// One call, one attempt: implementations fetch the whole body of `url` or
/// report why they could not. Redirects and timeouts are the implementation's
/// business.
///
/// # Implementations
///
/// - [`ReqwestFetcher`]: production implementation using `reqwest`
/// - [`MockFetcher`](crate::MockFetcher): in-memory responses for tests
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Bytes>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use super::*;
    use crate::error::FetchError;

    /// Production fetcher backed by a shared `reqwest::Client`.
    #[derive(Clone)]
    pub struct ReqwestFetcher {
        client: reqwest::Client,
    }

    impl ReqwestFetcher {
        /// Client with no request timeout.
        pub fn new() -> Result<Self> {
            Self::with_timeout(None)
        }

        /// Client whose requests give up after `timeout`.
        pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
            let mut builder = reqwest::Client::builder()
                .user_agent(concat!("kave/", env!("CARGO_PKG_VERSION")));
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            let client = builder
                .build()
                .map_err(|e| FetchError::Client(e.to_string()))?;
            Ok(Self { client })
        }

        fn map_error(url: &Url, e: reqwest::Error) -> FetchError {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else if let Some(status) = e.status() {
                FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                }
            } else {
                FetchError::transport(url.as_str(), e.to_string())
            }
        }
    }

    impl Fetcher for ReqwestFetcher {
        async fn fetch(&self, url: &Url) -> Result<Bytes> {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| Self::map_error(url, e))?;

            response.bytes().await.map_err(|e| Self::map_error(url, e))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestFetcher;
