use std::path::{Path, PathBuf};
use tilefuse_common::{ExtentBox, Region};
use tilefuse_schema::{SchemaError, TilesetDoc, batch_table_path, read_batch_table, relative_url};

/// Divisor applied to a fragment's longest extent edge when deriving its
/// geometric error from extent samples.
pub const EXTENT_ERROR_DIVISOR: f64 = 20.0;

/// Normalized record of one discovered fragment that participates in
/// hierarchical aggregation.
///
/// Immutable after extraction, except that hierarchy assembly consumes
/// `extent` and `aux_path` when the fragment is folded into the tree.
/// The two are always both present or both absent.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Geographic bounding region from the fragment's root tile.
    pub region: Region,
    /// Extent box derived from companion samples, when they exist.
    pub extent: Option<ExtentBox>,
    /// The fragment's own document-level error, or the derived extent error
    /// when samples exist.
    pub geometric_error: f64,
    /// Content URL rewritten relative to the aggregate output location.
    pub content_url: String,
    /// Path of the fragment description this record came from.
    pub source_path: PathBuf,
    /// Companion extent-sample file, deleted once the fragment has been
    /// folded into a hierarchy.
    pub aux_path: Option<PathBuf>,
}

/// Outcome of extracting one fragment description.
///
/// The root transform is surfaced even when the description is otherwise
/// unusable: the first transform seen in discovery order is propagated to
/// the aggregate root regardless of which fragment carried it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub fragment: Option<Fragment>,
    pub transform: Option<[f64; 16]>,
}

impl Extraction {
    fn skip(transform: Option<[f64; 16]>) -> Self {
        Self {
            fragment: None,
            transform,
        }
    }
}

/// Extract a normalized fragment from one parsed description.
///
/// Descriptions missing a root, a region-shaped bounding volume, an error
/// metric, or a content reference contribute nothing and are skipped.
/// Reading a present-but-malformed companion table fails the batch; an
/// absent one only means the fragment is not LOD.
pub fn extract_fragment(
    doc: &TilesetDoc,
    source_path: &Path,
    output_dir: &Path,
) -> Result<Extraction, SchemaError> {
    let Some(root) = &doc.root else {
        tracing::debug!(path = %source_path.display(), "skipping description without root");
        return Ok(Extraction::skip(None));
    };
    let transform = root.transform;

    let Some(region) = root.bounding_volume.as_ref().and_then(|volume| volume.region) else {
        tracing::debug!(
            path = %source_path.display(),
            "skipping description without region bounding volume"
        );
        return Ok(Extraction::skip(transform));
    };
    let Some(document_error) = doc.geometric_error else {
        tracing::debug!(path = %source_path.display(), "skipping description without error metric");
        return Ok(Extraction::skip(transform));
    };
    let Some(content_url) = root.content.as_ref().and_then(|content| content.url.as_deref())
    else {
        tracing::warn!(
            path = %source_path.display(),
            "skipping fragment without content reference"
        );
        return Ok(Extraction::skip(transform));
    };

    let fragment_dir = source_path.parent().unwrap_or_else(|| Path::new(""));
    let table_path = batch_table_path(fragment_dir, content_url);
    let extent = read_batch_table(&table_path)?
        .and_then(|table| ExtentBox::from_sample_points(&table.min_point, &table.max_point));
    let (geometric_error, aux_path) = match &extent {
        Some(extent) => (extent.longest_edge() / EXTENT_ERROR_DIVISOR, Some(table_path)),
        None => (document_error, None),
    };

    Ok(Extraction {
        fragment: Some(Fragment {
            region: Region::from_array(region),
            extent,
            geometric_error,
            content_url: rewrite_content_url(output_dir, source_path, content_url),
            source_path: source_path.to_path_buf(),
            aux_path,
        }),
        transform,
    })
}

/// Replace the fragment's own filename in its output-relative path with the
/// content reference found inside it.
fn rewrite_content_url(output_dir: &Path, source_path: &Path, content_url: &str) -> String {
    let fragment_rel = relative_url(output_dir, source_path);
    match fragment_rel.rfind('/') {
        Some(slash) => format!("{}{}", &fragment_rel[..slash + 1], content_url),
        None => content_url.to_string(),
    }
}
