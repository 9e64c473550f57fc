//! Flatten the `features` object of observation or report files into CSV.
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::util::{read_json, scalar_text};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Column order derived from the first file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    config_keys: Vec<String>,
    feature_keys: Vec<String>,
}

impl CsvLayout {
    /// Config keys sort lexicographically; feature names sort by their
    /// reversed spelling so related suffixes (`_surplus`, `_spread`) cluster.
    pub fn from_features(features: &Map<String, Value>, config_key: &str) -> Self {
        let mut config_keys: Vec<String> = match features.get(config_key) {
            Some(Value::Object(config)) => config.keys().cloned().collect(),
            _ => Vec::new(),
        };
        config_keys.sort();
        let mut feature_keys: Vec<String> = features
            .keys()
            .filter(|key| key.as_str() != config_key)
            .cloned()
            .collect();
        feature_keys.sort_by_cached_key(|key| key.chars().rev().collect::<String>());
        Self {
            config_keys,
            feature_keys,
        }
    }

    pub fn header(&self) -> String {
        std::iter::once("obs")
            .chain(self.config_keys.iter().map(String::as_str))
            .chain(self.feature_keys.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn row(
        &self,
        label: &str,
        features: &Map<String, Value>,
        config_key: &str,
    ) -> Result<String> {
        let mut cells = vec![label.to_string()];
        if !self.config_keys.is_empty() {
            let config = features
                .get(config_key)
                .and_then(Value::as_object)
                .ok_or_else(|| anyhow!("missing `features.{config_key}` object"))?;
            for key in &self.config_keys {
                let value = config
                    .get(key)
                    .ok_or_else(|| anyhow!("missing config key `{key}`"))?;
                cells.push(scalar_text(value));
            }
        }
        for key in &self.feature_keys {
            let value = features
                .get(key)
                .ok_or_else(|| anyhow!("missing feature `{key}`"))?;
            cells.push(scalar_text(value));
        }
        Ok(cells.join(","))
    }
}

/// Row label: the first run of digits in the file name, else the file stem.
pub fn observation_label(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    DIGITS.find(&name).map_or_else(
        || {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        },
        |m| m.as_str().to_string(),
    )
}

fn features_of(path: &Path) -> Result<Map<String, Value>> {
    match read_json(path)? {
        Value::Object(mut root) => match root.remove("features") {
            Some(Value::Object(features)) => Ok(features),
            _ => Err(anyhow!("{} has no `features` object", path.display())),
        },
        _ => Err(anyhow!("{} is not a JSON object", path.display())),
    }
}

/// Write one CSV row per file, with columns taken from the first file.
pub fn write_features_csv<W: Write>(
    out: &mut W,
    files: &[PathBuf],
    config_key: &str,
) -> Result<()> {
    let Some(first) = files.first() else {
        return Ok(());
    };
    let layout = CsvLayout::from_features(&features_of(first)?, config_key);
    writeln!(out, "{}", layout.header())?;
    for path in files {
        let features = features_of(path)?;
        let row = layout
            .row(&observation_label(path), &features, config_key)
            .with_context(|| format!("cannot project {}", path.display()))?;
        writeln!(out, "{row}")?;
    }
    Ok(())
}
