use crate::SchemaError;
use crate::tileset::{BoundingVolume, Refine};
use serde::Deserialize;
use std::io::BufReader;
use std::path::Path;

/// Tolerant view of one fragment description as found on disk.
///
/// Every consumed field is optional: a description missing its root, region,
/// or error metric is a skip-decision for the caller, not a parse failure.
/// Unparseable JSON is still fatal for the whole batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetDoc {
    pub geometric_error: Option<f64>,
    pub root: Option<RootTile>,
}

/// Root tile header of a fragment description. Nested children of the
/// fragment are not traversed; the aggregate references the fragment as a
/// whole.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootTile {
    pub bounding_volume: Option<BoundingVolume>,
    pub refine: Option<Refine>,
    pub content: Option<DocContent>,
    pub transform: Option<[f64; 16]>,
}

/// Content reference inside a fragment description.
#[derive(Debug, Clone, Deserialize)]
pub struct DocContent {
    pub url: Option<String>,
}

/// Parse one fragment description from disk.
pub fn read_tileset_doc(path: &Path) -> Result<TilesetDoc, SchemaError> {
    let file = std::fs::File::open(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| SchemaError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_doc(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_full_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(
            dir.path(),
            "tileset.json",
            r#"{
                "asset": {"version": "0.0", "gltfUpAxis": "Y"},
                "geometricError": 200.0,
                "root": {
                    "boundingVolume": {"region": [0.0, 0.0, 1.0, 1.0, 0.0, 10.0]},
                    "refine": "ADD",
                    "geometricError": 200.0,
                    "content": {"url": "model.b3dm"}
                }
            }"#,
        );
        let doc = read_tileset_doc(&path).unwrap();
        assert_eq!(doc.geometric_error, Some(200.0));
        let root = doc.root.unwrap();
        assert_eq!(root.refine, Some(Refine::Add));
        assert_eq!(
            root.bounding_volume.unwrap().region,
            Some([0.0, 0.0, 1.0, 1.0, 0.0, 10.0])
        );
        assert_eq!(root.content.unwrap().url.as_deref(), Some("model.b3dm"));
    }

    #[test]
    fn missing_sections_parse_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(dir.path(), "bare.json", r#"{"asset": {"version": "1.0"}}"#);
        let doc = read_tileset_doc(&path).unwrap();
        assert!(doc.root.is_none());
        assert!(doc.geometric_error.is_none());
    }

    #[test]
    fn garbage_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(dir.path(), "broken.json", "{not json");
        let err = read_tileset_doc(&path).unwrap_err();
        assert!(matches!(err, SchemaError::Json { .. }));
    }

    #[test]
    fn transform_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let mut cells = [0.0f64; 16];
        for (i, cell) in cells.iter_mut().enumerate() {
            *cell = i as f64;
        }
        let body = format!(
            r#"{{"geometricError": 1.0, "root": {{"transform": {:?}}}}}"#,
            cells
        );
        let path = write_doc(dir.path(), "t.json", &body);
        let doc = read_tileset_doc(&path).unwrap();
        assert_eq!(doc.root.unwrap().transform, Some(cells));
    }
}
