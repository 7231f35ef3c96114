use std::path::PathBuf;

use thiserror::Error;

use kgbias_graph::{EntityId, RelationId};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("scorer returned {got} scores for a batch of {expected}")]
    ScoreCountMismatch { expected: usize, got: usize },

    #[error("entity {0} has no embedding")]
    UnknownEntity(EntityId),

    #[error("relation {0} has no embedding")]
    UnknownRelation(RelationId),

    #[error("invalid embeddings file `{}`: {message}", path.display())]
    InvalidEmbeddings { path: PathBuf, message: String },

    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scorer failed: {0}")]
    Scorer(String),
}
