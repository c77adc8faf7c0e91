//! The backend seam.
//!
//! Everything the orchestrator knows about a reporting backend is this trait:
//! given a site and one fully-resolved call, produce a frame. Pagination,
//! quotas, auth, and retries all live behind implementations; the core stays
//! free of I/O concerns.

use thiserror::Error;

use crate::frame::Frame;
use crate::query::resolve::{ResolvedDimension, ResolvedFilter, ResolvedMetric};
use crate::query::site::Site;

/// Failures surfaced by a backend implementation.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("backend call failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("no fixture for site `{site}`")]
    MissingFixture { site: String },

    #[error("no fixture entry matches filter_d={filter_d:?} filter_m={filter_m:?}")]
    NoMatchingEntry {
        filter_d: Option<String>,
        filter_m: Option<String>,
    },
}

/// One backend call, with every per-site indirection already resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceCall {
    pub dimensions: Vec<ResolvedDimension>,
    pub metrics: Vec<ResolvedMetric>,
    pub filter: ResolvedFilter,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
}

/// A queryable reporting backend.
///
/// The returned frame names its columns by backend field; aliasing and
/// missing-column repair happen in the orchestrator. Implementations should
/// be idempotent per call so callers may retry.
pub trait QuerySource {
    fn fetch(&self, site: &Site, call: &SourceCall) -> Result<Frame, SourceError>;
}
