//! Aggregation of many independently produced tileset fragments into one
//! tileset: a flat combination, or a level-of-detail hierarchy inferred from
//! spatial containment of per-fragment extent boxes.
//!
//! # Invariants
//! - Per-file reading and extraction are independent; every shared
//!   accumulation (region bounds, fragment list, first-seen transform) is a
//!   deterministic single-threaded fold in discovery order.
//! - The containment forest is an owned tree: every fragment is owned by at
//!   most one parent, and construction cursors never live on nodes.
//! - Consumed extent files are deleted at most once, and only after the
//!   aggregate document has been written.

mod fragment;
mod hierarchy;
mod inspect;
mod pipeline;

pub use fragment::{EXTENT_ERROR_DIVISOR, Extraction, Fragment, extract_fragment};
pub use hierarchy::{
    Forest, HierarchyNode, MisorderPolicy, build_hierarchy, containment_sort, delete_consumed,
    link_forest,
};
pub use inspect::{TilesetSummary, inspect_file, summarize};
pub use pipeline::{
    CombineOptions, CombineSummary, DEFAULT_GEOMETRIC_ERROR, MergeOptions, MergeSummary,
    combine_tilesets, merge_tilesets,
};

use std::path::PathBuf;
use tilefuse_schema::SchemaError;

/// Errors that abort an aggregation batch. No retries anywhere: a batch
/// either produces a complete aggregate or nothing.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("document error: {0}")]
    Schema(#[from] SchemaError),
    #[error("no fragment contributed a bounding region under {input_dir}")]
    EmptyAggregate { input_dir: PathBuf },
    #[error("failed to delete consumed extent file {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}
