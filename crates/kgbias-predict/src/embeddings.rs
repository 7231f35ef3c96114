//! Trained KGE embeddings as a [`Scorer`].
//!
//! The file is a versioned envelope (`kgbias_embeddings_v1`) holding one row
//! per entity ID and per relation ID. `.json` files are read as JSON; anything
//! else is read as CBOR.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use kgbias_graph::Triple;

use crate::capability::Scorer;
use crate::error::PredictError;

pub const EMBEDDINGS_FILE_VERSION_V1: &str = "kgbias_embeddings_v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringFunction {
    /// -||h + r - t||
    TransE,
    /// <h, r, t>
    DistMult,
    /// Re(<h, r, conj(t)>), interleaved (re, im) pairs.
    ComplEx,
    /// -||h ∘ r - t||, interleaved (re, im) pairs.
    RotatE,
}

impl ScoringFunction {
    pub fn score(&self, head: &[f32], relation: &[f32], tail: &[f32]) -> f64 {
        match self {
            Self::TransE => score_transe(head, relation, tail),
            Self::DistMult => score_distmult(head, relation, tail),
            Self::ComplEx => score_complex(head, relation, tail),
            Self::RotatE => score_rotate(head, relation, tail),
        }
    }

    fn is_complex(&self) -> bool {
        matches!(self, Self::ComplEx | Self::RotatE)
    }
}

fn score_transe(head: &[f32], relation: &[f32], tail: &[f32]) -> f64 {
    let sum_sq: f64 = head
        .iter()
        .zip(relation)
        .zip(tail)
        .map(|((&h, &r), &t)| {
            let d = f64::from(h) + f64::from(r) - f64::from(t);
            d * d
        })
        .sum();
    -sum_sq.sqrt()
}

fn score_distmult(head: &[f32], relation: &[f32], tail: &[f32]) -> f64 {
    head.iter()
        .zip(relation)
        .zip(tail)
        .map(|((&h, &r), &t)| f64::from(h) * f64::from(r) * f64::from(t))
        .sum()
}

/// (h ∘ r) per complex coordinate.
fn rotate_pairs<'a>(
    head: &'a [f32],
    relation: &'a [f32],
    tail: &'a [f32],
) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + 'a {
    head.chunks_exact(2)
        .zip(relation.chunks_exact(2))
        .zip(tail.chunks_exact(2))
        .map(|((h, r), t)| {
            let (h_re, h_im) = (f64::from(h[0]), f64::from(h[1]));
            let (r_re, r_im) = (f64::from(r[0]), f64::from(r[1]));
            let rot = (h_re * r_re - h_im * r_im, h_re * r_im + h_im * r_re);
            (rot, (f64::from(t[0]), f64::from(t[1])))
        })
}

fn score_complex(head: &[f32], relation: &[f32], tail: &[f32]) -> f64 {
    rotate_pairs(head, relation, tail)
        .map(|((x, y), (t_re, t_im))| x * t_re + y * t_im)
        .sum()
}

fn score_rotate(head: &[f32], relation: &[f32], tail: &[f32]) -> f64 {
    let sum_sq: f64 = rotate_pairs(head, relation, tail)
        .map(|((x, y), (t_re, t_im))| {
            let (d_re, d_im) = (x - t_re, y - t_im);
            d_re * d_re + d_im * d_im
        })
        .sum();
    -sum_sq.sqrt()
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsFileV1 {
    pub version: String,
    pub model: String,
    pub scoring: ScoringFunction,
    pub dim: usize,
    /// Row `i` is entity ID `i`.
    pub entities: Vec<Vec<f32>>,
    /// Row `i` is relation ID `i`.
    pub relations: Vec<Vec<f32>>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl EmbeddingsFileV1 {
    pub fn new(
        model: impl Into<String>,
        scoring: ScoringFunction,
        entities: Vec<Vec<f32>>,
        relations: Vec<Vec<f32>>,
    ) -> Self {
        let dim = entities.first().map(Vec::len).unwrap_or(0);
        Self {
            version: EMBEDDINGS_FILE_VERSION_V1.to_string(),
            model: model.into(),
            scoring,
            dim,
            entities,
            relations,
            metadata: HashMap::new(),
        }
    }

    /// Checks version, row widths, and complex-pair alignment.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != EMBEDDINGS_FILE_VERSION_V1 {
            return Err(format!(
                "unsupported embeddings file version: {} (expected {EMBEDDINGS_FILE_VERSION_V1})",
                self.version
            ));
        }
        if self.dim == 0 {
            return Err("dim must be positive".to_string());
        }
        if self.scoring.is_complex() && self.dim % 2 != 0 {
            return Err(format!(
                "{:?} needs an even dim (interleaved re/im), got {}",
                self.scoring, self.dim
            ));
        }
        let rows = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, v)| ("entity", i, v))
            .chain(self.relations.iter().enumerate().map(|(i, v)| ("relation", i, v)));
        for (kind, i, v) in rows {
            if v.len() != self.dim {
                return Err(format!(
                    "{kind} {i} has dim {} (expected {})",
                    v.len(),
                    self.dim
                ));
            }
        }
        Ok(())
    }

    pub fn encode_cbor(&self) -> Result<Vec<u8>, String> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(self, &mut out)
            .map_err(|e| format!("failed to CBOR-encode embeddings file: {e}"))?;
        Ok(out)
    }
}

/// Embedding lookup plus a scoring function.
#[derive(Debug, Clone)]
pub struct EmbeddingScorer {
    scoring: ScoringFunction,
    file: EmbeddingsFileV1,
}

impl EmbeddingScorer {
    pub fn from_file(file: EmbeddingsFileV1) -> Result<Self, String> {
        file.validate()?;
        Ok(Self {
            scoring: file.scoring,
            file,
        })
    }

    /// Reads and validates an embeddings file (JSON when the extension is
    /// `.json`, CBOR otherwise).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PredictError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PredictError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let invalid = |message: String| PredictError::InvalidEmbeddings {
            path: path.to_path_buf(),
            message,
        };

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let file: EmbeddingsFileV1 = if is_json {
            serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?
        } else {
            ciborium::de::from_reader(bytes.as_slice()).map_err(|e| invalid(e.to_string()))?
        };

        let scorer = Self::from_file(file).map_err(invalid)?;
        tracing::info!(
            path = %path.display(),
            model = %scorer.file.model,
            scoring = ?scorer.scoring,
            dim = scorer.file.dim,
            entities = scorer.file.entities.len(),
            relations = scorer.file.relations.len(),
            "loaded embeddings"
        );
        Ok(scorer)
    }

    /// Replaces the scoring function recorded in the file.
    pub fn with_scoring(mut self, scoring: ScoringFunction) -> Result<Self, String> {
        if scoring.is_complex() && self.file.dim % 2 != 0 {
            return Err(format!(
                "{scoring:?} needs an even dim (interleaved re/im), got {}",
                self.file.dim
            ));
        }
        self.scoring = scoring;
        Ok(self)
    }

    pub fn scoring(&self) -> ScoringFunction {
        self.scoring
    }

    pub fn model(&self) -> &str {
        &self.file.model
    }

    fn entity(&self, id: u32) -> Result<&[f32], PredictError> {
        self.file
            .entities
            .get(id as usize)
            .map(Vec::as_slice)
            .ok_or(PredictError::UnknownEntity(id))
    }

    fn relation(&self, id: u32) -> Result<&[f32], PredictError> {
        self.file
            .relations
            .get(id as usize)
            .map(Vec::as_slice)
            .ok_or(PredictError::UnknownRelation(id))
    }
}

impl Scorer for EmbeddingScorer {
    fn score(&self, batch: &[Triple]) -> Result<Vec<f64>, PredictError> {
        batch
            .iter()
            .map(|t| {
                let h = self.entity(t.head)?;
                let r = self.relation(t.relation)?;
                let tl = self.entity(t.tail)?;
                Ok(self.scoring.score(h, r, tl))
            })
            .collect()
    }
}
