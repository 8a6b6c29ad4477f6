use crate::SchemaError;
use std::path::{Component, Path, PathBuf};

/// Collect candidate fragment descriptions under `input_dir`.
///
/// Only subdirectories are searched: files sitting directly in `input_dir`
/// are reserved for the aggregate output and must never be re-consumed as
/// fragments. Entries are visited in name order so discovery order is
/// deterministic across platforms.
pub fn discover_fragments(input_dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    let mut found = Vec::new();
    for entry in sorted_entries(input_dir)? {
        if entry.is_dir() {
            collect_json_files(&entry, &mut found)?;
        }
    }
    tracing::debug!(
        count = found.len(),
        dir = %input_dir.display(),
        "discovered fragment candidates"
    );
    Ok(found)
}

fn collect_json_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), SchemaError> {
    for entry in sorted_entries(dir)? {
        if entry.is_dir() {
            collect_json_files(&entry, found)?;
        } else if entry.extension().is_some_and(|ext| ext == "json") {
            found.push(entry);
        }
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    let reader = std::fs::read_dir(dir).map_err(|source| SchemaError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|source| SchemaError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

/// Express `target` relative to `base_dir` as a forward-slash URL, falling
/// back to `..` components when `target` is not under `base_dir`. Both paths
/// must share a root (both relative or both absolute).
pub fn relative_url(base_dir: &Path, target: &Path) -> String {
    let base: Vec<Component> = base_dir.components().collect();
    let goal: Vec<Component> = target.components().collect();
    let shared = base
        .iter()
        .zip(goal.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<String> = Vec::new();
    for _ in shared..base.len() {
        parts.push("..".to_string());
    }
    for component in &goal[shared..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn top_level_files_are_not_fragments() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("tileset.json"));
        touch(&dir.path().join("a/tileset.json"));
        let found = discover_fragments(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("a/tileset.json")]);
    }

    #[test]
    fn nested_directories_are_searched_recursively() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/deep/er/tileset.json"));
        touch(&dir.path().join("a/tileset.json"));
        touch(&dir.path().join("b/tileset.json"));
        touch(&dir.path().join("b/readme.txt"));
        let found = discover_fragments(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("a/deep/er/tileset.json"),
                dir.path().join("a/tileset.json"),
                dir.path().join("b/tileset.json"),
            ]
        );
    }

    #[test]
    fn discovery_order_is_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            touch(&dir.path().join(name).join("tileset.json"));
        }
        let found = discover_fragments(dir.path()).unwrap();
        let dirs: Vec<_> = found
            .iter()
            .map(|p| p.parent().unwrap().file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(dirs, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn relative_url_strips_shared_prefix() {
        assert_eq!(
            relative_url(Path::new("/data/out"), Path::new("/data/out/a/tileset.json")),
            "a/tileset.json"
        );
    }

    #[test]
    fn relative_url_climbs_out_of_unshared_dirs() {
        assert_eq!(
            relative_url(Path::new("/data/out"), Path::new("/data/frags/a/tileset.json")),
            "../frags/a/tileset.json"
        );
    }

    #[test]
    fn relative_url_handles_relative_inputs() {
        assert_eq!(
            relative_url(Path::new("out"), Path::new("out/b/model.b3dm")),
            "b/model.b3dm"
        );
    }
}
