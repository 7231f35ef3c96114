//! Centrality engine: PageRank by power iteration over a multigraph.
//!
//! - Edge multiplicity is transition weight: a node with three edges to `v`
//!   and one to `w` sends 3/4 of its mass to `v`.
//! - Dangling nodes (no outgoing edges) spread their mass uniformly over all
//!   nodes, the same way for every graph, so original and augmented maps are
//!   comparable.
//! - Convergence is the L1 change of one iteration dropping below
//!   `tolerance`. Hitting `max_iterations` is not an error; the last estimate
//!   comes back with `converged = false`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::KnowledgeGraph;
use crate::progress::Progress;
use crate::EntityId;

pub const DEFAULT_DAMPING: f64 = 0.85;

/// Iterations between progress records.
const PROGRESS_EVERY: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    /// Probability of following an edge instead of teleporting.
    pub damping: f64,
    pub max_iterations: usize,
    /// L1 residual below which the iteration stops.
    pub tolerance: f64,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

impl CentralityConfig {
    pub fn validate(&self) -> Result<(), GraphError> {
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(GraphError::InvalidConfig(format!(
                "damping must be in [0,1], got {}",
                self.damping
            )));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(GraphError::InvalidConfig(format!(
                "tolerance must be a positive finite number, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(GraphError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Entity id → centrality. Sums to 1 over the graph it was computed on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentralityMap {
    scores: HashMap<EntityId, f64>,
}

impl CentralityMap {
    /// Centrality of `id`; ids absent from the graph read as 0.0.
    pub fn get(&self, id: EntityId) -> f64 {
        self.scores.get(&id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.scores.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.scores.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, f64)> + '_ {
        self.scores.iter().map(|(&id, &s)| (id, s))
    }
}

impl FromIterator<(EntityId, f64)> for CentralityMap {
    fn from_iter<I: IntoIterator<Item = (EntityId, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CentralityResult {
    pub scores: CentralityMap,
    /// Iterations actually run (equals `max_iterations` when not converged).
    pub iterations: usize,
    pub converged: bool,
    /// L1 change of the last iteration.
    pub residual: f64,
}

pub fn pagerank(graph: &KnowledgeGraph, config: &CentralityConfig) -> CentralityResult {
    let progress = Progress::new("centrality", config.max_iterations, PROGRESS_EVERY);
    power_iterate(graph, config, &progress)
}

/// One `progress` tick per iteration.
fn power_iterate(
    graph: &KnowledgeGraph,
    config: &CentralityConfig,
    progress: &Progress,
) -> CentralityResult {
    let (ids, out_adj) = graph.out_adjacency();
    let n = ids.len();
    if n == 0 {
        return CentralityResult {
            scores: CentralityMap::default(),
            iterations: 0,
            converged: true,
            residual: 0.0,
        };
    }

    let damping = config.damping;
    let teleport = (1.0 - damping) / n as f64;
    let mut rank = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;
    let mut residual = f64::INFINITY;
    let mut converged = false;

    for iter in 1..=config.max_iterations {
        next.iter_mut().for_each(|x| *x = 0.0);
        let mut dangling_mass = 0.0;

        for (u, out) in out_adj.iter().enumerate() {
            if out.is_empty() {
                dangling_mass += rank[u];
                continue;
            }
            let share = rank[u] / out.len() as f64;
            for &v in out {
                next[v as usize] += share;
            }
        }

        let dangling_share = dangling_mass / n as f64;
        for x in next.iter_mut() {
            *x = teleport + damping * (*x + dangling_share);
        }

        residual = rank.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut rank, &mut next);
        iterations = iter;
        progress.tick();
        tracing::debug!(iteration = iter, residual, "centrality iteration");

        if residual < config.tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        tracing::info!(
            nodes = n,
            edges = graph.edge_count(),
            iterations,
            residual,
            elapsed_s = %format!("{:.1}", progress.elapsed().as_secs_f64()),
            "centrality converged"
        );
    } else {
        tracing::warn!(
            nodes = n,
            edges = graph.edge_count(),
            iterations,
            residual,
            tolerance = config.tolerance,
            elapsed_s = %format!("{:.1}", progress.elapsed().as_secs_f64()),
            "centrality hit the iteration cap; using the last estimate"
        );
    }

    CentralityResult {
        scores: ids.into_iter().zip(rank).collect(),
        iterations,
        converged,
        residual,
    }
}
