//! Project JSON store.
//!
//! Each bucket is one JSON document per project directory, shaped as
//! `{ "<type>": [entry, ...] }` with entries sorted by `name`. Entries
//! with the same name are replaced.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use hydrolink_core::submission::{DataFormat, SubmissionEnvelope};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// Keys stripped from stored DSS metadata; the series themselves live in
/// the DSS file.
const BULK_KEYS: &[&str] = &["values", "times", "startDateTime"];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown bucket '{0}'")]
    InvalidBucket(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Data,
    Analyses,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Data => "data",
            Bucket::Analyses => "analyses",
        }
    }
}

impl FromStr for Bucket {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(Bucket::Data),
            "analyses" => Ok(Bucket::Analyses),
            other => Err(StoreError::InvalidBucket(other.to_string())),
        }
    }
}

/// File-backed store rooted at the configured data directory.
pub struct JsonStore {
    data_root: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory holding a project's documents and output files: `dir`
    /// when given, otherwise `{data_root}/{project}`.
    pub fn project_dir(&self, project: &str, dir: Option<&str>) -> Result<PathBuf, StoreError> {
        if let Some(dir) = dir.map(str::trim).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let project = project.trim();
        if project.is_empty() || !is_plain_relative(Path::new(project)) || project.contains('/') {
            return Err(StoreError::InvalidPath(format!("bad project name '{project}'")));
        }
        Ok(self.data_root.join(project))
    }

    /// Resolve an output file inside the project directory. Absolute
    /// paths and parent components are rejected.
    pub fn resolve_file(&self, project_dir: &Path, filepath: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(filepath);
        if filepath.trim().is_empty() || !is_plain_relative(relative) {
            return Err(StoreError::InvalidPath(format!("bad output file '{filepath}'")));
        }
        Ok(project_dir.join(relative))
    }

    fn document_path(&self, project_dir: &Path, bucket: Bucket) -> PathBuf {
        project_dir.join(format!("{}.json", bucket.as_str()))
    }

    /// The whole bucket document; an empty object when nothing was stored.
    pub async fn load(&self, project_dir: &Path, bucket: Bucket) -> Result<Value, StoreError> {
        let path = self.document_path(project_dir, bucket);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Object(Map::new())),
            Err(e) => Err(e.into()),
        }
    }

    /// Add the submission to the bucket under its `type`.
    pub async fn append(
        &self,
        project_dir: &Path,
        bucket: Bucket,
        envelope: &SubmissionEnvelope,
    ) -> Result<(), StoreError> {
        let entry = stored_entry(&envelope.data);
        let name = entry_name(&entry).to_string();

        let _guard = self.write_lock.lock().await;
        let mut document = match self.load(project_dir, bucket).await? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let entries = document
            .entry(envelope.category.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entries.is_array() {
            *entries = Value::Array(Vec::new());
        }
        if let Value::Array(list) = entries {
            list.retain(|e| entry_name(e) != name);
            list.push(entry);
            list.sort_by(|a, b| entry_name(a).cmp(entry_name(b)));
        }

        tokio::fs::create_dir_all(project_dir).await?;
        let path = self.document_path(project_dir, bucket);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(document))?).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(
            path = %path.display(),
            category = %envelope.category,
            name = %name,
            "Store entry saved",
        );
        Ok(())
    }
}

/// What is kept for a submission: DSS payloads lose their bulk arrays,
/// JSON payloads are kept whole.
pub fn stored_entry(data: &Value) -> Value {
    if data_format(data) == DataFormat::Json {
        return data.clone();
    }
    let mut entry = data.clone();
    if let Value::Object(map) = &mut entry {
        for key in BULK_KEYS {
            map.remove(*key);
        }
        if let Some(Value::Array(series)) = map.get_mut("series") {
            for item in series.iter_mut() {
                if let Value::Object(s) = item {
                    s.remove("values");
                    s.remove("times");
                }
            }
        }
    }
    entry
}

/// Declared format of a submission's `data`; DSS when absent.
pub fn data_format(data: &Value) -> DataFormat {
    data.get("dataFormat")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn entry_name(entry: &Value) -> &str {
    entry.get("name").and_then(Value::as_str).unwrap_or("")
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
