//! # Tributary
//!
//! A multi-site reporting pipeline: one query fans out over a table of
//! sites, comes back as a single tagged table, and flows through chainable
//! aggregation-aware transforms.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │           Query (dimensions, metrics, options)           │
//! │        names may point into the site: `site.<key>`       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolver - per site]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Resolved fields + call groups (one backend        │
//! │          call per distinct resolved filter)              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query source - fetch]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Frames: joined within a site, concatenated and       │
//! │          identifier-tagged across the fleet              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [report - chained transforms]
//! ┌─────────────────────────────────────────────────────────┐
//! │   ReportFrame (dimensions vs metrics, group/normalize/   │
//! │         classify/filter, render as table or JSON)        │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod classify;
pub mod config;
pub mod frame;
pub mod query;
pub mod report;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::classify::ColumnClassifier;
    pub use crate::frame::{Frame, FrameError, Value};
    pub use crate::query::{
        DimensionInput, DimensionSpec, FieldRef, FixtureSource, MergeMode, MetricInput,
        MetricSpec, QueryError, QuerySource, RunOptions, Runner, Site, SiteFilter, SourceCall,
        SourceError,
    };
    pub use crate::report::{
        AggregateMethod, AggregatePolicy, CategoryOptions, CategoryRule, ClickFilter,
        GroupOptions, ImpressionFilter, NormalizeMode, NormalizeOptions, ReportError,
        ReportFrame, TransformOp,
    };
}

// Also export at crate root for convenience
pub use frame::{Frame, Value};
pub use query::{RunOptions, Runner, Site};
pub use report::ReportFrame;
