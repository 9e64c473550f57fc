use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

/// Read and parse a whole JSON document from disk.
pub fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse JSON in {}", path.display()))
}

/// Label each file by its parent directory relative to the deepest directory
/// shared by all of them.
///
/// `runs/CALL/observation1.json` and `runs/CDA/observation1.json` become
/// `CALL` and `CDA`. When every file lives in the same directory that
/// directory's own name is used.
pub fn run_labels(paths: &[PathBuf]) -> Result<Vec<String>> {
    let parents = paths
        .iter()
        .map(|path| {
            let absolute = std::path::absolute(path)
                .with_context(|| format!("failed to resolve {}", path.display()))?;
            Ok(absolute.parent().map(Path::to_path_buf).unwrap_or(absolute))
        })
        .collect::<Result<Vec<PathBuf>>>()?;

    let split: Vec<Vec<Component<'_>>> = parents.iter().map(|p| p.components().collect()).collect();
    let mut shared = split.iter().map(Vec::len).min().unwrap_or(0);
    if let Some(first) = split.first() {
        for other in &split[1..] {
            shared = shared.min(
                first
                    .iter()
                    .zip(other)
                    .take_while(|(a, b)| a == b)
                    .count(),
            );
        }
    }
    if split.iter().any(|components| components.len() == shared) {
        shared = shared.saturating_sub(1);
    }

    Ok(split
        .iter()
        .map(|components| {
            components[shared..]
                .iter()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect())
}

/// Render a JSON scalar the way it should appear in a flat text column.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_are_relative_to_common_directory() {
        let paths = vec![
            PathBuf::from("/data/runs/CALL/observation1.json"),
            PathBuf::from("/data/runs/CDA/observation1.json"),
            PathBuf::from("/data/runs/TWOMARKET/deep/observation1.json"),
        ];
        let labels = run_labels(&paths).unwrap();
        assert_eq!(labels, vec!["CALL", "CDA", "TWOMARKET/deep"]);
    }

    #[test]
    fn single_directory_uses_its_own_name() {
        let paths = vec![
            PathBuf::from("/data/runs/CALL/observation1.json"),
            PathBuf::from("/data/runs/CALL/observation2.json"),
        ];
        assert_eq!(run_labels(&paths).unwrap(), vec!["CALL", "CALL"]);
    }

    #[test]
    fn nested_directory_keeps_full_suffix() {
        let paths = vec![
            PathBuf::from("/data/CALL/obs.json"),
            PathBuf::from("/data/CALL/extra/obs.json"),
        ];
        assert_eq!(run_labels(&paths).unwrap(), vec!["CALL", "CALL/extra"]);
    }

    #[test]
    fn scalar_text_unquotes_strings() {
        assert_eq!(scalar_text(&json!("CDA")), "CDA");
        assert_eq!(scalar_text(&json!(2.5)), "2.5");
        assert_eq!(scalar_text(&json!(10)), "10");
        assert_eq!(scalar_text(&json!(true)), "true");
    }

    #[test]
    fn read_json_reports_missing_files() {
        let missing = std::env::temp_dir().join("obsmerge-util-missing.json");
        let err = read_json(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("failed to open"));
    }
}
