use crate::{
    Extraction, Fragment, Forest, HierarchyNode, MergeError, MisorderPolicy, build_hierarchy,
    delete_consumed, extract_fragment,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tilefuse_common::{Region, RegionBounds};
use tilefuse_schema::{
    Asset, BoundingVolume, Content, Refine, RootTile, SchemaError, Tile, Tileset, TilesetDoc,
    discover_fragments, read_tileset_doc, relative_url, write_tileset,
};

/// Error metric assigned to the synthetic aggregate root unless overridden.
pub const DEFAULT_GEOMETRIC_ERROR: f64 = 500.0;

/// Output file name when no explicit path is given, written directly inside
/// the input directory. Discovery never descends into top-level files, so an
/// aggregate from a previous run is not re-consumed as a fragment.
const DEFAULT_OUTPUT_NAME: &str = "tileset.json";

/// Configuration for flat aggregation.
#[derive(Debug, Clone)]
pub struct CombineOptions {
    pub input_dir: PathBuf,
    /// Destination path; defaults to `tileset.json` in `input_dir`.
    pub output: Option<PathBuf>,
    pub base_error: f64,
}

impl CombineOptions {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output: None,
            base_error: DEFAULT_GEOMETRIC_ERROR,
        }
    }

    fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self.input_dir.join(DEFAULT_OUTPUT_NAME),
        }
    }
}

/// Configuration for hierarchical aggregation.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub input_dir: PathBuf,
    /// Destination path; defaults to `tileset.json` in `input_dir`.
    pub output: Option<PathBuf>,
    pub base_error: f64,
    pub misorder: MisorderPolicy,
}

impl MergeOptions {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output: None,
            base_error: DEFAULT_GEOMETRIC_ERROR,
            misorder: MisorderPolicy::default(),
        }
    }

    fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self.input_dir.join(DEFAULT_OUTPUT_NAME),
        }
    }
}

/// What a flat aggregation run produced.
#[derive(Debug)]
pub struct CombineSummary {
    pub output: PathBuf,
    pub children: usize,
    pub skipped: usize,
    pub region: [f64; 6],
}

/// What a hierarchical aggregation run produced.
#[derive(Debug)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub fragments: usize,
    pub skipped: usize,
    /// Top-level children of the synthetic root.
    pub roots: usize,
    pub lod: bool,
    pub deleted_extent_files: usize,
    /// Fragments left unreachable by the misorder policy, including any
    /// orphaned beneath a dropped fragment.
    pub dropped: usize,
}

/// Aggregate every discovered fragment as a direct child of one synthetic
/// root, in discovery order.
///
/// Children keep their own bounding volume (any shape, passed through
/// opaquely), document-level error metric, and refine flag; their content
/// points at the fragment description file itself, so consumers load each
/// fragment as an external tileset. Only `region` volumes contribute to the
/// aggregate bounding region. Input and output paths are resolved against
/// the working directory first, so a relative input can be combined with an
/// absolute output path.
pub fn combine_tilesets(options: &CombineOptions) -> Result<CombineSummary, MergeError> {
    let _span = tracing::info_span!("combine", input = %options.input_dir.display()).entered();
    let output = absolutize(&options.output_path())?;
    let output_dir = parent_dir(&output).to_path_buf();
    let input_dir = absolutize(&options.input_dir)?;

    let paths = discover_fragments(&input_dir)?;
    let docs = paths
        .par_iter()
        .map(|path| read_tileset_doc(path))
        .collect::<Result<Vec<TilesetDoc>, _>>()?;

    let mut bounds = RegionBounds::default();
    let mut children = Vec::new();
    let mut skipped = 0usize;
    for (path, doc) in paths.iter().zip(docs) {
        let Some(root) = doc.root else {
            tracing::debug!(path = %path.display(), "skipping description without root");
            skipped += 1;
            continue;
        };
        let RootTile {
            bounding_volume,
            refine,
            ..
        } = root;
        let (Some(volume), Some(error)) = (bounding_volume, doc.geometric_error) else {
            tracing::debug!(
                path = %path.display(),
                "skipping description without bounding volume or error metric"
            );
            skipped += 1;
            continue;
        };
        if let Some(region) = volume.region {
            bounds.include(&Region::from_array(region));
        }
        children.push(Tile {
            bounding_volume: volume,
            refine,
            geometric_error: error,
            content: Some(Content {
                url: relative_url(&output_dir, path),
                bounding_volume: None,
            }),
            children: Vec::new(),
            transform: None,
        });
    }

    let Some(region) = bounds.enclosing() else {
        return Err(MergeError::EmptyAggregate {
            input_dir: options.input_dir.clone(),
        });
    };

    let child_count = children.len();
    let tileset = Tileset {
        asset: Asset::current(),
        geometric_error: options.base_error,
        root: Tile {
            bounding_volume: BoundingVolume::from_region(region.to_array()),
            refine: Some(Refine::Add),
            geometric_error: options.base_error,
            content: None,
            children,
            transform: None,
        },
    };
    ensure_parent_dir(&output)?;
    write_tileset(&output, &tileset)?;
    tracing::info!(
        output = %output.display(),
        children = child_count,
        skipped,
        "wrote flat aggregate"
    );

    Ok(CombineSummary {
        output,
        children: child_count,
        skipped,
        region: region.to_array(),
    })
}

/// Aggregate discovered fragments into one tileset, nesting them into a
/// containment hierarchy when extent samples are present.
///
/// Each fragment's content URL is rewritten to reach the content from the
/// output location. The first root transform seen in discovery order, even
/// one from an otherwise skipped description, is propagated to the aggregate
/// root. With at least one extent box the run is in LOD mode: fragments are
/// nested per containment, the root error metric is halved, and consumed
/// extent-sample files are deleted after the output is written. Input and
/// output paths are resolved against the working directory before any URL is
/// computed, so mixed relative and absolute invocations stay correct.
pub fn merge_tilesets(options: &MergeOptions) -> Result<MergeSummary, MergeError> {
    let _span = tracing::info_span!("merge", input = %options.input_dir.display()).entered();
    let output = absolutize(&options.output_path())?;
    let output_dir = parent_dir(&output).to_path_buf();
    let input_dir = absolutize(&options.input_dir)?;

    let paths = discover_fragments(&input_dir)?;
    let extractions = paths
        .par_iter()
        .map(|path| {
            let doc = read_tileset_doc(path)?;
            extract_fragment(&doc, path, &output_dir)
        })
        .collect::<Result<Vec<Extraction>, SchemaError>>()?;

    let transform = extractions.iter().find_map(|extraction| extraction.transform);
    let mut bounds = RegionBounds::default();
    let mut fragments = Vec::new();
    let mut skipped = 0usize;
    for extraction in extractions {
        match extraction.fragment {
            Some(fragment) => {
                bounds.include(&fragment.region);
                fragments.push(fragment);
            }
            None => skipped += 1,
        }
    }

    let Some(region) = bounds.enclosing() else {
        return Err(MergeError::EmptyAggregate {
            input_dir: options.input_dir.clone(),
        });
    };

    let fragment_count = fragments.len();
    let lod = fragments.iter().any(|fragment| fragment.extent.is_some());
    let (children, consumed, dropped) = if lod {
        let forest = build_hierarchy(fragments, options.misorder);
        // Count the total loss, not just direct drops: attachments made while
        // the cursor still targeted a dropped fragment are unreachable too.
        let dropped = fragment_count - forest.node_count();
        let Forest { roots, consumed, .. } = forest;
        let children = roots.into_iter().map(node_to_tile).collect::<Vec<Tile>>();
        (children, consumed, dropped)
    } else {
        let children = fragments
            .into_iter()
            .map(fragment_to_tile)
            .collect::<Vec<Tile>>();
        (children, Vec::new(), 0)
    };

    let root_error = if lod {
        options.base_error / 2.0
    } else {
        options.base_error
    };
    let roots = children.len();
    let tileset = Tileset {
        asset: Asset::current(),
        geometric_error: options.base_error,
        root: Tile {
            bounding_volume: BoundingVolume::from_region(region.to_array()),
            refine: Some(Refine::Add),
            geometric_error: root_error,
            content: None,
            children,
            transform,
        },
    };
    ensure_parent_dir(&output)?;
    write_tileset(&output, &tileset)?;
    delete_consumed(&consumed)?;
    tracing::info!(
        output = %output.display(),
        fragments = fragment_count,
        skipped,
        lod,
        roots,
        "wrote merged aggregate"
    );

    Ok(MergeSummary {
        output,
        fragments: fragment_count,
        skipped,
        roots,
        lod,
        deleted_extent_files: consumed.len(),
        dropped,
    })
}

fn node_to_tile(node: HierarchyNode) -> Tile {
    let mut tile = fragment_to_tile(node.fragment);
    tile.children = node.children.into_iter().map(node_to_tile).collect();
    tile
}

/// A merged child repeats its bounding volume on the content reference and
/// carries no refine flag of its own.
fn fragment_to_tile(fragment: Fragment) -> Tile {
    let volume = BoundingVolume::from_region(fragment.region.to_array());
    Tile {
        bounding_volume: volume.clone(),
        refine: None,
        geometric_error: fragment.geometric_error,
        content: Some(Content {
            url: fragment.content_url,
            bounding_volume: Some(volume),
        }),
        children: Vec::new(),
        transform: None,
    }
}

/// Directory the aggregate lands in, the base for every relative URL. An
/// output path without a parent resolves against the working directory.
fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

/// Resolve a path against the working directory. `relative_url` needs the
/// discovery paths and the output location to share a root.
fn absolutize(path: &Path) -> Result<PathBuf, SchemaError> {
    std::path::absolute(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_parent_dir(path: &Path) -> Result<(), SchemaError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| SchemaError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}
