//! Incremental mirroring of a remote document tree.
//!
//! # Architecture
//!
//! - [`path`] - URL-relative path normalization, traversal rejection
//! - [`Manifest`] - the trusted `(digest, path)` listing
//! - [`plan`] - local-first staleness decisions, no network
//! - [`melt`] - prune files the manifest no longer lists
//! - [`LinkRewriter`] - point same-origin references in the root document at local paths
//! - [`Mirror`] - one sync run, in order: manifest, plan, fetch, sidecars, melt, root document
//!
//! Transport lives behind [`kave_fetch::Fetcher`]; this crate never talks HTTP itself.

pub mod path;

mod config;
mod error;
mod manifest;
mod mirror;
mod planner;
mod prune;
mod report;
mod rewrite;

pub use config::{CONFIG_FILE, Layout, SyncConfig};
pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestEntry};
pub use mirror::Mirror;
pub use planner::{SyncDecision, SyncPlan, plan};
pub use prune::{MeltReport, melt};
pub use report::SyncReport;
pub use rewrite::{
    AttributeScanner, InlineScriptScanner, LinkRewriter, Reference, ReferenceScanner, Rewritten,
};
