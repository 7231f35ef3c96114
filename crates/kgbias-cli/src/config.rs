//! Run configuration (`kgbias.json`).
//!
//! ```json
//! {
//!   "dataset_dir": "NELL-995",
//!   "split_prefix": "resplit_",
//!   "output_dir": "out",
//!   "k": 5,
//!   "corruption": "local",
//!   "centrality": { "damping": 0.85, "max_iterations": 200, "tolerance": 1e-10 },
//!   "progress_every": 500,
//!   "models": {
//!     "transe": { "embeddings": "models/transe.json" },
//!     "rotate": { "embeddings": "models/rotate.cbor", "scoring": "rotate" }
//!   }
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use kgbias_graph::CentralityConfig;
use kgbias_predict::{CorruptionMode, ScoringFunction};

pub const CONFIG_ENV: &str = "KGBIAS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "kgbias.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// `kgbias_embeddings_v1` file (JSON or CBOR).
    pub embeddings: PathBuf,
    /// Overrides the scoring function recorded in the embeddings file.
    #[serde(default)]
    pub scoring: Option<ScoringFunction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub dataset_dir: PathBuf,
    #[serde(default)]
    pub split_prefix: String,
    pub output_dir: PathBuf,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub corruption: CorruptionMode,
    #[serde(default)]
    pub centrality: CentralityConfig,
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    /// Rayon pool size; the rayon default when absent.
    #[serde(default)]
    pub threads: Option<usize>,
    pub models: BTreeMap<String, ModelConfig>,
}

fn default_k() -> usize {
    5
}

fn default_progress_every() -> usize {
    500
}

/// `--config`, else `$KGBIAS_CONFIG`, else `./kgbias.json`.
pub fn locate(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config `{}`", path.display()))?;
        let mut config: RunConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config `{}`", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        config
            .validate()
            .with_context(|| format!("invalid config `{}`", path.display()))?;
        tracing::debug!(path = %path.display(), models = config.models.len(), "loaded config");
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.dataset_dir);
        resolve(&mut self.output_dir);
        for model in self.models.values_mut() {
            resolve(&mut model.embeddings);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.centrality.validate()?;
        if self.k == 0 {
            return Err(anyhow!("k must be at least 1"));
        }
        if self.models.is_empty() {
            return Err(anyhow!("no models configured"));
        }
        if self.threads == Some(0) {
            return Err(anyhow!("threads must be at least 1 when set"));
        }
        Ok(())
    }

    pub fn model(&self, name: &str) -> Result<&ModelConfig> {
        self.models.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.models.keys().map(String::as_str).collect();
            anyhow!("unknown model `{name}` (configured: {})", known.join(", "))
        })
    }

    pub fn predictions_path(&self, model: &str) -> PathBuf {
        self.output_dir.join(format!("{model}_predictions.kgbp"))
    }

    pub fn log_path(&self, model: &str) -> PathBuf {
        self.output_dir.join(format!("{model}.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("kgbias.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_and_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{"dataset_dir": "data", "output_dir": "/abs/out",
                "models": {"transe": {"embeddings": "emb/transe.json"}}}"#,
        );
        let cfg = RunConfig::load(&path).unwrap();
        assert_eq!(cfg.k, 5);
        assert_eq!(cfg.progress_every, 500);
        assert_eq!(cfg.corruption, CorruptionMode::Local);
        assert_eq!(cfg.centrality, CentralityConfig::default());
        assert_eq!(cfg.dataset_dir, dir.path().join("data"));
        assert_eq!(cfg.output_dir, PathBuf::from("/abs/out"));
        assert_eq!(cfg.models["transe"].embeddings, dir.path().join("emb/transe.json"));
        assert_eq!(cfg.predictions_path("transe"), PathBuf::from("/abs/out/transe_predictions.kgbp"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for body in [
            r#"{"dataset_dir": "d", "output_dir": "o", "k": 0, "models": {"m": {"embeddings": "e"}}}"#,
            r#"{"dataset_dir": "d", "output_dir": "o", "models": {}}"#,
            r#"{"dataset_dir": "d", "output_dir": "o", "centrality": {"damping": 1.5}, "models": {"m": {"embeddings": "e"}}}"#,
        ] {
            assert!(RunConfig::load(&write(dir.path(), body)).is_err(), "{body}");
        }
    }

    #[test]
    fn unknown_model_lists_configured_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{"dataset_dir": "d", "output_dir": "o", "corruption": "global",
                "models": {"transe": {"embeddings": "a"}, "rotate": {"embeddings": "b", "scoring": "rotate"}}}"#,
        );
        let cfg = RunConfig::load(&path).unwrap();
        assert_eq!(cfg.models["rotate"].scoring, Some(ScoringFunction::RotatE));
        let err = cfg.model("hole").unwrap_err().to_string();
        assert!(err.contains("rotate, transe"), "{err}");
    }

    #[test]
    fn explicit_path_wins() {
        assert_eq!(locate(Some(Path::new("x.json"))), PathBuf::from("x.json"));
    }
}
