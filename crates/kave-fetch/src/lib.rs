//! Fetching remote documents into a local mirror.
//!
//! # Architecture
//!
//! - [`Fetcher`] - the transport capability: URL in, bytes or [`FetchError`] out
//! - [`VerifiedRegistry`] - per-run record of paths known to hold a good digest
//! - [`FetchCoordinator`] - runs [`FetchTask`]s on a bounded pool, one writer per path
//!
//! Each task gets one attempt; there is no retry or resume.

mod coordinator;
mod error;
mod fetcher;
mod mock;
mod registry;
mod task;

pub use coordinator::{CoordinatorOptions, FetchCoordinator, default_workers};
pub use error::{FetchError, Result, TaskError};
pub use fetcher::Fetcher;
pub use mock::MockFetcher;
pub use registry::VerifiedRegistry;
pub use task::{FetchTask, TaskOutcome, TaskReport, dedup_by_destination};

#[cfg(feature = "reqwest")]
pub use fetcher::ReqwestFetcher;
