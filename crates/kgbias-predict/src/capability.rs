use std::fmt;

use serde::{Deserialize, Serialize};

use kgbias_graph::{EntityId, Triple};

use crate::error::PredictError;

/// Which end of a triple is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Head,
    Tail,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Head, Side::Tail];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Head => "head",
            Side::Tail => "tail",
        }
    }

    /// The entity on this side of `triple`.
    pub fn entity(self, triple: &Triple) -> EntityId {
        match self {
            Side::Head => triple.head,
            Side::Tail => triple.tail,
        }
    }

    /// The entity held fixed while this side is replaced.
    pub fn opposite(self, triple: &Triple) -> EntityId {
        match self {
            Side::Head => triple.tail,
            Side::Tail => triple.head,
        }
    }

    /// `triple` with this side replaced by `entity`.
    pub fn substitute(self, triple: &Triple, entity: EntityId) -> Triple {
        match self {
            Side::Head => Triple::new(entity, triple.tail, triple.relation),
            Side::Tail => Triple::new(triple.head, entity, triple.relation),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plausibility model. Higher scores mean more plausible.
pub trait Scorer {
    /// Exactly one score per input triple, in input order.
    fn score(&self, batch: &[Triple]) -> Result<Vec<f64>, PredictError>;
}

impl<F> Scorer for F
where
    F: Fn(&[Triple]) -> Result<Vec<f64>, PredictError>,
{
    fn score(&self, batch: &[Triple]) -> Result<Vec<f64>, PredictError> {
        self(batch)
    }
}

/// Negative-candidate generator under a closed-world assumption.
pub trait CandidateSource {
    /// Entities that may replace `side` of `triple` without recreating a
    /// known-true triple. The true entity itself is never included.
    fn corrupted(&self, triple: &Triple, side: Side) -> Vec<EntityId>;
}
