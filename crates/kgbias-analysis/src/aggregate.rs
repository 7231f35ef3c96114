//! Per-prediction centrality deltas and their aggregation into a bias report.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use kgbias_graph::{CentralityMap, IdMap};
use kgbias_predict::{PredictionRecord, Side};

use crate::stats::{DeltaStats, SignedStats, SliceStats};
use crate::wire::{quantize, sanitize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphVariant {
    Original,
    Augmented,
}

impl GraphVariant {
    pub const ALL: [GraphVariant; 2] = [GraphVariant::Original, GraphVariant::Augmented];

    pub fn as_str(self) -> &'static str {
        match self {
            GraphVariant::Original => "original",
            GraphVariant::Augmented => "augmented",
        }
    }
}

impl fmt::Display for GraphVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One non-original prediction, as written to (and read back from) a
/// `[TAIL]`/`[HEAD]` line. Floats are already at wire precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub side: Side,
    /// 1-based index of the evaluated triple.
    pub test: usize,
    pub rel: String,
    pub real: String,
    pub pred: String,
    /// Centrality of the true entity on the original graph.
    pub pr_real: f64,
    /// Centrality of the predicted entity on the original graph.
    pub pr_pred: f64,
    pub err_orig: f64,
    pub err_aug: f64,
}

impl DeltaRecord {
    pub fn delta(&self, variant: GraphVariant) -> f64 {
        match variant {
            GraphVariant::Original => self.err_orig,
            GraphVariant::Augmented => self.err_aug,
        }
    }

    /// `pr_pred - pr_real`; positive when the wrong answer is more central.
    pub fn signed_diff(&self) -> f64 {
        self.pr_pred - self.pr_real
    }
}

// ============================================================================
// Report
// ============================================================================

/// Statistics for one side (or both sides together).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceReport {
    pub original: SliceStats<DeltaStats>,
    pub augmented: SliceStats<DeltaStats>,
    pub bias: SliceStats<SignedStats>,
}

impl SliceReport {
    fn from_records<'a>(records: impl Iterator<Item = &'a DeltaRecord> + Clone) -> Self {
        let deltas = |variant| {
            records.clone().map(|r| r.delta(variant)).collect::<Vec<_>>()
        };
        let pairs: Vec<(f64, f64)> = records.clone().map(|r| (r.pr_real, r.pr_pred)).collect();
        Self {
            original: DeltaStats::of(&deltas(GraphVariant::Original)),
            augmented: DeltaStats::of(&deltas(GraphVariant::Augmented)),
            bias: SignedStats::of(&pairs),
        }
    }

    pub fn delta(&self, variant: GraphVariant) -> &SliceStats<DeltaStats> {
        match variant {
            GraphVariant::Original => &self.original,
            GraphVariant::Augmented => &self.augmented,
        }
    }
}

/// Tail-side bias for one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationBias {
    pub relation: String,
    /// Deltas on the original graph.
    pub errors: DeltaStats,
    pub signed: SignedStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub model: String,
    pub tail: SliceReport,
    pub head: SliceReport,
    /// Tail samples followed by head samples.
    pub overall: SliceReport,
    /// Sorted by mean signed difference, descending; ties by name.
    pub relations: Vec<RelationBias>,
}

impl BiasReport {
    pub fn from_deltas(model: impl Into<String>, records: &[DeltaRecord]) -> Self {
        let model = model.into();
        let on = |side: Side| records.iter().filter(move |r| r.side == side);

        let tail = SliceReport::from_records(on(Side::Tail));
        let head = SliceReport::from_records(on(Side::Head));
        let overall = SliceReport::from_records(on(Side::Tail).chain(on(Side::Head)));

        let mut by_relation: BTreeMap<&str, Vec<&DeltaRecord>> = BTreeMap::new();
        for r in on(Side::Tail) {
            by_relation.entry(r.rel.as_str()).or_default().push(r);
        }
        let mut relations: Vec<RelationBias> = by_relation
            .into_iter()
            .filter_map(|(rel, rs)| {
                let errors: Vec<f64> = rs.iter().map(|r| r.err_orig).collect();
                let pairs: Vec<(f64, f64)> = rs.iter().map(|r| (r.pr_real, r.pr_pred)).collect();
                Some(RelationBias {
                    relation: rel.to_string(),
                    errors: DeltaStats::compute(&errors)?,
                    signed: SignedStats::compute(&pairs)?,
                })
            })
            .collect();
        relations.sort_by(|a, b| {
            b.signed
                .signed_diff
                .total_cmp(&a.signed.signed_diff)
                .then_with(|| a.relation.cmp(&b.relation))
        });

        for (label, slice) in [("tail", &tail), ("head", &head), ("overall", &overall)] {
            if slice.bias.is_no_data() {
                tracing::warn!(model = %model, slice = label, "no predictions evaluated for slice");
            }
        }

        Self {
            model,
            tail,
            head,
            overall,
            relations,
        }
    }
}

// ============================================================================
// Live aggregation
// ============================================================================

/// Turns prediction records plus two centrality maps into [`DeltaRecord`]s.
///
/// Missing centrality entries count as 0.0; missing names fall back to the id.
#[derive(Debug, Clone, Copy)]
pub struct BiasAggregator<'a> {
    original: &'a CentralityMap,
    augmented: &'a CentralityMap,
    entities: &'a IdMap,
    relations: &'a IdMap,
}

impl<'a> BiasAggregator<'a> {
    pub fn new(
        original: &'a CentralityMap,
        augmented: &'a CentralityMap,
        entities: &'a IdMap,
        relations: &'a IdMap,
    ) -> Self {
        Self {
            original,
            augmented,
            entities,
            relations,
        }
    }

    /// Tail alternatives then head alternatives, record by record.
    pub fn deltas(&self, records: &[PredictionRecord]) -> Vec<DeltaRecord> {
        let mut out = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            let rel = sanitize(&self.relations.display(record.original.relation)).into_owned();
            for side in [Side::Tail, Side::Head] {
                let truth = side.entity(&record.original);
                for p in record.alternatives(side) {
                    let pred = p.substituted(side);
                    let (o_real, o_pred) = (self.original.get(truth), self.original.get(pred));
                    let (a_real, a_pred) = (self.augmented.get(truth), self.augmented.get(pred));
                    out.push(DeltaRecord {
                        side,
                        test: idx + 1,
                        rel: rel.clone(),
                        real: sanitize(&self.entities.display(truth)).into_owned(),
                        pred: sanitize(&self.entities.display(pred)).into_owned(),
                        pr_real: quantize(o_real),
                        pr_pred: quantize(o_pred),
                        err_orig: quantize((o_real - o_pred).abs()),
                        err_aug: quantize((a_real - a_pred).abs()),
                    });
                }
            }
        }
        tracing::debug!(records = records.len(), samples = out.len(), "computed centrality deltas");
        out
    }

    pub fn aggregate(&self, model: &str, records: &[PredictionRecord]) -> BiasReport {
        BiasReport::from_deltas(model, &self.deltas(records))
    }
}
