use crate::MergeError;
use std::fmt;
use std::path::Path;
use tilefuse_schema::{Tile, Tileset, read_tileset};

/// Structural summary of an aggregate tileset, for quick sanity checks on
/// what a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetSummary {
    pub tile_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    pub min_geometric_error: f64,
    pub max_geometric_error: f64,
    /// Root bounding region, when the root uses the region shape.
    pub region: Option<[f64; 6]>,
}

/// Summarize a parsed aggregate by walking its tile tree.
pub fn summarize(tileset: &Tileset) -> TilesetSummary {
    let mut summary = TilesetSummary {
        tile_count: 0,
        leaf_count: 0,
        max_depth: 0,
        min_geometric_error: f64::INFINITY,
        max_geometric_error: f64::NEG_INFINITY,
        region: tileset.root.bounding_volume.region,
    };
    walk(&tileset.root, 1, &mut summary);
    summary
}

/// Read an aggregate from disk and summarize it.
pub fn inspect_file(path: &Path) -> Result<TilesetSummary, MergeError> {
    let tileset = read_tileset(path)?;
    Ok(summarize(&tileset))
}

fn walk(tile: &Tile, depth: usize, summary: &mut TilesetSummary) {
    summary.tile_count += 1;
    summary.max_depth = summary.max_depth.max(depth);
    summary.min_geometric_error = summary.min_geometric_error.min(tile.geometric_error);
    summary.max_geometric_error = summary.max_geometric_error.max(tile.geometric_error);
    if tile.children.is_empty() {
        summary.leaf_count += 1;
    }
    for child in &tile.children {
        walk(child, depth + 1, summary);
    }
}

impl fmt::Display for TilesetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tiles={} leaves={} depth={} error=[{:.2}, {:.2}]",
            self.tile_count,
            self.leaf_count,
            self.max_depth,
            self.min_geometric_error,
            self.max_geometric_error
        )
    }
}
