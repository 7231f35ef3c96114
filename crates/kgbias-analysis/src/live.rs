//! One live analysis run: original vs. augmented graph, centrality on both,
//! per-prediction deltas, and the aggregated report.

use serde::Serialize;

use kgbias_graph::{pagerank, CentralityConfig, CentralityResult, KnowledgeGraph, Triple, TripleStore};
use kgbias_predict::{novel_predictions, PredictionSet};

use crate::aggregate::{BiasAggregator, BiasReport, DeltaRecord, GraphVariant};
use crate::wire;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub variant: GraphVariant,
    pub nodes: usize,
    pub edges: usize,
    /// Predicted triples added on top of the known set.
    pub new_edges: Option<usize>,
    pub iterations: usize,
    pub converged: bool,
    pub residual: f64,
}

impl GraphSummary {
    fn new(
        variant: GraphVariant,
        graph: &KnowledgeGraph,
        new_edges: Option<usize>,
        centrality: &CentralityResult,
    ) -> Self {
        Self {
            variant,
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            new_edges,
            iterations: centrality.iterations,
            converged: centrality.converged,
            residual: centrality.residual,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveRun {
    pub model: String,
    pub entities: usize,
    pub relations: usize,
    pub train: usize,
    pub test: usize,
    pub valid: usize,
    pub prediction_sets: usize,
    pub original: GraphSummary,
    pub augmented: GraphSummary,
    pub deltas: Vec<DeltaRecord>,
    pub report: BiasReport,
}

/// Builds both graphs, ranks their nodes, and aggregates the deltas.
///
/// The augmented graph is the known triples plus every distinct non-original
/// prediction that is not already known.
pub fn analyze_run(
    model: &str,
    store: &TripleStore,
    predictions: &PredictionSet,
    centrality: &CentralityConfig,
) -> LiveRun {
    let model = wire::sanitize(model).into_owned();
    let known = store.known();
    let new: Vec<Triple> = novel_predictions(&predictions.records, &store.known_set())
        .into_iter()
        .collect();

    let g_orig = KnowledgeGraph::build(&known, &store.entities, &store.relations);
    let g_aug = KnowledgeGraph::build(known.iter().chain(&new), &store.entities, &store.relations);
    tracing::info!(
        model = %model,
        nodes = g_orig.node_count(),
        edges = g_orig.edge_count(),
        augmented_edges = g_aug.edge_count(),
        new = new.len(),
        "built graphs"
    );

    let pr_orig = pagerank(&g_orig, centrality);
    let pr_aug = pagerank(&g_aug, centrality);

    let aggregator = BiasAggregator::new(&pr_orig.scores, &pr_aug.scores, &store.entities, &store.relations);
    let deltas = aggregator.deltas(&predictions.records);
    let report = BiasReport::from_deltas(model.clone(), &deltas);

    LiveRun {
        model,
        entities: store.entities.len(),
        relations: store.relations.len(),
        train: store.train.len(),
        test: store.test.len(),
        valid: store.valid.len(),
        prediction_sets: predictions.records.len(),
        original: GraphSummary::new(GraphVariant::Original, &g_orig, None, &pr_orig),
        augmented: GraphSummary::new(GraphVariant::Augmented, &g_aug, Some(new.len()), &pr_aug),
        deltas,
        report,
    }
}

impl LiveRun {
    /// The full tagged log, line by line.
    pub fn render(&self) -> Vec<String> {
        let mut out = vec![
            format!("[CONFIG] model={}", self.model),
            format!(
                "[DATA] entities={} relations={} train={} test={} valid={} total={}",
                self.entities,
                self.relations,
                self.train,
                self.test,
                self.valid,
                self.train + self.test + self.valid
            ),
            format!("[DATA] prediction_sets={}", self.prediction_sets),
        ];
        for g in [&self.original, &self.augmented] {
            let mut line = format!("[GRAPH] type={} nodes={} edges={}", g.variant, g.nodes, g.edges);
            if let Some(new) = g.new_edges {
                line.push_str(&format!(" new={new}"));
            }
            out.push(line);
        }
        for g in [&self.original, &self.augmented] {
            out.push(format!(
                "[PAGERANK] type={} iterations={} converged={}",
                g.variant, g.iterations, g.converged
            ));
        }
        out.extend(self.deltas.iter().map(wire::render_sample));
        out.extend(wire::render_report(&self.report));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reparse::reparse;
    use kgbias_graph::IdMap;
    use kgbias_predict::{Prediction, PredictionRecord};

    fn store() -> TripleStore {
        let entities: IdMap = [(0, "a".to_string()), (1, "b".to_string()), (2, "c".to_string())]
            .into_iter()
            .collect();
        let relations: IdMap = [(0, "r0".to_string())].into_iter().collect();
        TripleStore {
            entities,
            relations,
            train: vec![Triple::new(0, 1, 0)],
            valid: vec![],
            test: vec![Triple::new(1, 2, 0)],
        }
    }

    fn set() -> PredictionSet {
        PredictionSet {
            model: "toy".into(),
            k: 2,
            created_at_unix_secs: 0,
            records: vec![PredictionRecord {
                original: Triple::new(0, 1, 0),
                head_predictions: vec![],
                tail_predictions: vec![
                    Prediction { head: 0, relation: 0, tail: 2, score: 1.0, is_original: false },
                    Prediction { head: 0, relation: 0, tail: 1, score: 0.5, is_original: true },
                ],
            }],
        }
    }

    #[test]
    fn augmented_graph_gains_the_novel_edge() {
        let run = analyze_run("toy", &store(), &set(), &CentralityConfig::default());
        assert_eq!(run.original.edges, 2);
        assert_eq!(run.augmented.edges, 3);
        assert_eq!(run.augmented.new_edges, Some(1));
        assert_eq!(run.deltas.len(), 1);
        assert_ne!(run.deltas[0].err_orig, run.deltas[0].err_aug);
    }

    #[test]
    fn rendered_log_reaggregates_to_the_same_report() {
        let run = analyze_run("toy", &store(), &set(), &CentralityConfig::default());
        let text = run.render().join("\n");
        assert!(text.starts_with("[CONFIG] model=toy\n[DATA] entities=3"));
        assert!(text.contains("[GRAPH] type=augmented nodes=3 edges=3 new=1"));
        assert_eq!(reparse(&text, "fallback").unwrap(), run.report);
    }
}
