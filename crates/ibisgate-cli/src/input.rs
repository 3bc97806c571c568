//! Loading model records from JSON files and directories

use anyhow::{Context, Result};
use ibisgate_core::ModelRecord;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Accepted layouts of a record file
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Wrapped { models: Vec<ModelRecord> },
    Many(Vec<ModelRecord>),
    One(ModelRecord),
}

impl RecordFile {
    fn into_records(self) -> Vec<ModelRecord> {
        match self {
            Self::Wrapped { models } => models,
            Self::Many(records) => records,
            Self::One(record) => vec![record],
        }
    }
}

/// Expand inputs into JSON files; directories are walked recursively
pub fn collect_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            found.sort();
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            anyhow::bail!("Input not found: {}", input.display());
        }
    }

    Ok(files)
}

/// Parse one record file
pub fn parse_records(json: &str) -> Result<Vec<ModelRecord>> {
    let file: RecordFile = serde_json::from_str(json)
        .context("expected a model record, an array of records, or {\"models\": [...]}")?;
    Ok(file.into_records())
}

/// Load every record from a file
pub fn load_file(path: &Path) -> Result<Vec<ModelRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_records(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load records from all inputs, in input order
pub fn load_records(inputs: &[PathBuf]) -> Result<Vec<ModelRecord>> {
    let mut records = Vec::new();
    for path in collect_files(inputs)? {
        let loaded = load_file(&path)?;
        tracing::debug!(path = %path.display(), records = loaded.len(), "loaded record file");
        records.extend(loaded);
    }
    Ok(records)
}
