//! Tileset wire model plus the disk-facing collaborators: fragment
//! discovery, tolerant fragment parsing, batch-table resolution, and
//! aggregate output.
//!
//! Reading and writing deliberately use different strictness. Fragment
//! documents come from other generators and are parsed leniently
//! ([`TilesetDoc`]): fields the aggregation does not consume are ignored,
//! fields it does consume are optional so incomplete documents can be
//! skipped instead of failing a whole batch. The aggregate we emit is fully
//! typed ([`Tileset`]).

mod batch;
mod discover;
mod doc;
mod tileset;

pub use batch::{BATCH_TABLE_SUFFIX, BatchTable, batch_table_path, read_batch_table};
pub use discover::{discover_fragments, relative_url};
pub use doc::{DocContent, RootTile, TilesetDoc, read_tileset_doc};
pub use tileset::{
    Asset, BoundingVolume, Content, Refine, TILESET_VERSION, Tile, Tileset, read_tileset,
    write_tileset,
};

use std::path::PathBuf;

/// Errors from document parsing and disk access. Every variant names the
/// file it came from; a batch run touches many files and an unlocated error
/// is useless.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
