use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::Path;

/// Tool stamp written into every aggregate we produce.
pub const TILESET_VERSION: &str = "1.0.0-tilefuse";

/// Schema version of the tileset format itself.
const ASSET_VERSION: &str = "0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tileset_version: Option<String>,
}

impl Asset {
    /// Asset block for aggregates produced by this tool.
    pub fn current() -> Self {
        Self {
            version: ASSET_VERSION.to_string(),
            tileset_version: Some(TILESET_VERSION.to_string()),
        }
    }
}

/// Refinement policy understood by tileset consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Refine {
    Add,
    Replace,
}

/// Bounding volume carrying exactly one shape in well-formed data. Only
/// `region` participates in aggregation; the other shapes are passed through
/// opaquely where the assembler allows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<[f64; 6]>,
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub box_: Option<[f64; 12]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sphere: Option<[f64; 4]>,
}

impl BoundingVolume {
    pub fn from_region(region: [f64; 6]) -> Self {
        Self {
            region: Some(region),
            box_: None,
            sphere: None,
        }
    }
}

/// Content reference of an aggregate tile. Merged children repeat their
/// bounding volume here so consumers can cull content without walking up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_volume: Option<BoundingVolume>,
}

/// One tile of an aggregate tileset. Optional fields and empty child lists
/// are omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub bounding_volume: BoundingVolume,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refine: Option<Refine>,
    pub geometric_error: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Tile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 16]>,
}

/// A fully-formed aggregate tileset document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tileset {
    pub asset: Asset,
    pub geometric_error: f64,
    pub root: Tile,
}

/// Write an aggregate tileset as pretty-printed JSON.
pub fn write_tileset(path: &Path, tileset: &Tileset) -> Result<(), SchemaError> {
    let file = std::fs::File::create(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(file, tileset).map_err(|source| SchemaError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read back a fully-formed aggregate tileset, for inspection.
pub fn read_tileset(path: &Path) -> Result<Tileset, SchemaError> {
    let file = std::fs::File::open(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| SchemaError::Json {
        path: path.to_path_buf(),
        source,
    })
}
