//! kgbias-predict: top-K alternative predictions for held-out triples.
//!
//! The ranker depends on two capabilities only:
//! - [`Scorer`]: a batch of triples → one plausibility score per triple
//! - [`CandidateSource`]: a true triple + side → corrupted candidate entities
//!
//! [`ClosedWorldSampler`] and [`EmbeddingScorer`] are the stock
//! implementations; anything else (an ONNX session, a remote model) plugs in
//! behind the same traits.

pub mod artifact;
pub mod capability;
pub mod embeddings;
pub mod error;
pub mod ranker;
pub mod sampler;

pub use artifact::{read_prediction_set, write_prediction_set, ArtifactError, PredictionSet};
pub use capability::{CandidateSource, Scorer, Side};
pub use embeddings::{EmbeddingScorer, EmbeddingsFileV1, ScoringFunction};
pub use error::PredictError;
pub use ranker::{novel_predictions, rank, rank_all, Prediction, PredictionRecord};
pub use sampler::{ClosedWorldSampler, CorruptionMode};
