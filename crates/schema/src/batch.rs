use crate::SchemaError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Filename suffix of the companion document carrying per-sub-tile data
/// next to a fragment's binary content.
pub const BATCH_TABLE_SUFFIX: &str = "_batchTable.json";

/// Extent samples from a companion batch table. Any per-feature arrays
/// other than the two point sets are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchTable {
    #[serde(default, rename = "minPoint")]
    pub min_point: Vec<[f64; 3]>,
    #[serde(default, rename = "maxPoint")]
    pub max_point: Vec<[f64; 3]>,
}

impl BatchTable {
    /// Whether the table actually carries extent samples.
    pub fn has_extent_samples(&self) -> bool {
        !self.min_point.is_empty() && !self.max_point.is_empty()
    }
}

/// Derive the companion batch-table path for a content reference: same base
/// name as the content, fixed suffix, resolved against the fragment's
/// directory.
pub fn batch_table_path(fragment_dir: &Path, content_url: &str) -> PathBuf {
    let name_start = content_url.rfind('/').map_or(0, |slash| slash + 1);
    let (dir, name) = content_url.split_at(name_start);
    let stem = name.rfind('.').map_or(name, |dot| &name[..dot]);
    fragment_dir.join(format!("{dir}{stem}{BATCH_TABLE_SUFFIX}"))
}

/// Load the companion batch table for a fragment, if one exists. Absence is
/// not an error; a present-but-malformed table fails the batch.
pub fn read_batch_table(path: &Path) -> Result<Option<BatchTable>, SchemaError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SchemaError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let table = serde_json::from_slice(&data).map_err(|source| SchemaError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(table))
}
