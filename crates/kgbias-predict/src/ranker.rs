//! Top-K alternatives for held-out triples.
//!
//! For each side the batch is `[truth, candidates...]`, scored in one call.
//! Ordering: score descending under IEEE total order with NaN last, then
//! entity ID ascending. The truth is kept in the ranking and flagged
//! `is_original`.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use kgbias_graph::{EntityId, Progress, RelationId, Triple};

use crate::capability::{CandidateSource, Scorer, Side};
use crate::error::PredictError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub head: EntityId,
    pub relation: RelationId,
    pub tail: EntityId,
    pub score: f64,
    pub is_original: bool,
}

impl Prediction {
    pub fn triple(&self) -> Triple {
        Triple::new(self.head, self.tail, self.relation)
    }

    /// The entity placed on `side`.
    pub fn substituted(&self, side: Side) -> EntityId {
        side.entity(&self.triple())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub original: Triple,
    pub head_predictions: Vec<Prediction>,
    pub tail_predictions: Vec<Prediction>,
}

impl PredictionRecord {
    pub fn predictions(&self, side: Side) -> &[Prediction] {
        match side {
            Side::Head => &self.head_predictions,
            Side::Tail => &self.tail_predictions,
        }
    }

    /// Non-original predictions on `side`.
    pub fn alternatives(&self, side: Side) -> impl Iterator<Item = &Prediction> + '_ {
        self.predictions(side).iter().filter(|p| !p.is_original)
    }
}

fn by_score_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

fn rank_side<S, C>(
    triple: &Triple,
    side: Side,
    scorer: &S,
    candidates: &C,
    k: usize,
) -> Result<Vec<Prediction>, PredictError>
where
    S: Scorer + ?Sized,
    C: CandidateSource + ?Sized,
{
    let truth = side.entity(triple);
    let mut pool = candidates.corrupted(triple, side);
    pool.sort_unstable();
    pool.dedup();
    pool.retain(|&e| e != truth);
    if pool.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let entities: Vec<EntityId> = std::iter::once(truth).chain(pool).collect();
    let batch: Vec<Triple> = entities
        .iter()
        .map(|&e| side.substitute(triple, e))
        .collect();
    let scores = scorer.score(&batch)?;
    if scores.len() != batch.len() {
        return Err(PredictError::ScoreCountMismatch {
            expected: batch.len(),
            got: scores.len(),
        });
    }

    let mut order: Vec<usize> = (0..batch.len()).collect();
    order.sort_by(|&i, &j| {
        by_score_desc(scores[i], scores[j]).then_with(|| entities[i].cmp(&entities[j]))
    });

    Ok(order
        .into_iter()
        .take(k)
        .map(|i| Prediction {
            head: batch[i].head,
            relation: batch[i].relation,
            tail: batch[i].tail,
            score: scores[i],
            is_original: i == 0,
        })
        .collect())
}

/// Top-`k` head-side and tail-side predictions for one true triple.
///
/// An empty candidate pool yields an empty list for that side.
pub fn rank<S, C>(
    triple: &Triple,
    scorer: &S,
    candidates: &C,
    k: usize,
) -> Result<PredictionRecord, PredictError>
where
    S: Scorer + ?Sized,
    C: CandidateSource + ?Sized,
{
    Ok(PredictionRecord {
        original: *triple,
        head_predictions: rank_side(triple, Side::Head, scorer, candidates, k)?,
        tail_predictions: rank_side(triple, Side::Tail, scorer, candidates, k)?,
    })
}

/// [`rank`] over every triple on the rayon pool. Output order matches input.
pub fn rank_all<S, C>(
    triples: &[Triple],
    scorer: &S,
    candidates: &C,
    k: usize,
    progress_every: usize,
) -> Result<Vec<PredictionRecord>, PredictError>
where
    S: Scorer + Sync + ?Sized,
    C: CandidateSource + Sync + ?Sized,
{
    let progress = Progress::new("ranking", triples.len(), progress_every);
    let records = triples
        .par_iter()
        .map(|t| {
            let record = rank(t, scorer, candidates, k);
            progress.tick();
            record
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(
        triples = records.len(),
        k,
        elapsed_s = %format!("{:.1}", progress.elapsed().as_secs_f64()),
        "ranking complete"
    );
    Ok(records)
}

/// Distinct non-original predicted triples that are not in `known`.
pub fn novel_predictions(records: &[PredictionRecord], known: &HashSet<Triple>) -> BTreeSet<Triple> {
    records
        .iter()
        .flat_map(|r| Side::BOTH.into_iter().flat_map(move |s| r.alternatives(s)))
        .map(Prediction::triple)
        .filter(|t| !known.contains(t))
        .collect()
}
