//! Test fixture utilities for building job documents and job directories.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use stylemix_spec::{BandName, CompositionMode};
use tempfile::TempDir;

/// Deterministic, all-positive test values: `1.0, 1.1, ..., 1.9, 1.0, ...`.
pub fn ramp(len: usize) -> Vec<f32> {
    (0..len).map(|i| 1.0 + (i % 10) as f32 * 0.1).collect()
}

/// A `{shape, data}` tensor payload.
pub fn tensor(shape: &[usize], data: Vec<f32>) -> Value {
    json!({ "shape": shape, "data": data })
}

/// A conditioning entry `[groups, seq_len, dim]` filled with zeros.
pub fn conditioning_entry(groups: usize, seq_len: usize, dim: usize, tag: &str) -> Value {
    json!({
        "embedding": tensor(&[groups, seq_len, dim], vec![0.0; groups * seq_len * dim]),
        "metadata": { "tag": tag, "pooled_output": [0.25, 0.5] }
    })
}

/// Builds job documents field by field.
#[derive(Debug, Clone)]
pub struct JobBuilder {
    doc: Value,
}

impl JobBuilder {
    /// A weighted job with a `[batch, dim]` ramp style embedding and one
    /// `[1, 2, dim]` conditioning entry.
    pub fn new(job_id: &str, batch: usize, dim: usize) -> Self {
        Self {
            doc: json!({
                "job_version": 1,
                "job_id": job_id,
                "style_embedding": tensor(&[batch, dim], ramp(batch * dim)),
                "conditioning": [conditioning_entry(1, 2, dim, "base")],
            }),
        }
    }

    /// Sets the composition mode.
    pub fn mode(mut self, mode: CompositionMode) -> Self {
        self.doc["mode"] = json!(mode.as_str());
        self
    }

    /// Sets one params field.
    pub fn param(mut self, name: &str, value: Value) -> Self {
        if !self.doc["params"].is_object() {
            self.doc["params"] = json!({});
        }
        self.doc["params"][name] = value;
        self
    }

    /// Replaces the conditioning sequence.
    pub fn conditioning(mut self, entries: Vec<Value>) -> Self {
        self.doc["conditioning"] = Value::Array(entries);
        self
    }

    /// Adds text conditioning `[1, seq_len, dim]` with ramp values.
    pub fn text(mut self, seq_len: usize, dim: usize) -> Self {
        self.doc["text_conditioning"] = json!([{
            "embedding": tensor(&[1, seq_len, dim], ramp(seq_len * dim)),
        }]);
        self
    }

    /// Adds auxiliary embeddings with a constant value per band.
    pub fn auxiliary(mut self, dim: usize, primary: f32, secondary: Option<f32>) -> Self {
        let table = |value: f32| {
            let mut map = serde_json::Map::new();
            for band in BandName::ALL {
                map.insert(band.as_str().to_string(), tensor(&[1, dim], vec![value; dim]));
            }
            Value::Object(map)
        };
        let mut aux = json!({ "primary": table(primary) });
        if let Some(value) = secondary {
            aux["secondary"] = table(value);
        }
        self.doc["auxiliary"] = aux;
        self
    }

    /// Sets the projector.
    pub fn projector(mut self, projector: Value) -> Self {
        self.doc["projector"] = projector;
        self
    }

    /// The document as JSON.
    pub fn build(self) -> Value {
        self.doc
    }
}

/// A temporary directory of job files.
pub struct JobDir {
    pub root: TempDir,
}

impl JobDir {
    /// Creates an empty job directory.
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Root path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Writes a job document as `<name>.json`.
    pub fn add_job(&self, name: &str, doc: &Value) -> PathBuf {
        let path = self.path().join(format!("{}.json", name));
        let json = serde_json::to_string_pretty(doc).expect("Failed to serialize job");
        fs::write(&path, json).expect("Failed to write job file");
        path
    }

    /// Writes raw text as a job file.
    pub fn add_raw(&self, file_name: &str, content: &str) -> PathBuf {
        let path = self.path().join(file_name);
        fs::write(&path, content).expect("Failed to write job file");
        path
    }
}

impl Default for JobDir {
    fn default() -> Self {
        Self::new()
    }
}
