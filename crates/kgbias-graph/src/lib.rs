//! kgbias-graph: the graph side of the centrality-bias analysis.
//!
//! - `triples`: integer triple files and `name<TAB>id` maps (OpenKE layout)
//! - `graph`: directed multigraph keyed by entity id, one edge per triple
//! - `centrality`: PageRank-style power iteration over that multigraph
//! - `progress`: periodic progress records for long batch loops
//!
//! Nothing here mutates after construction: a run loads its triples once,
//! builds the original and augmented graphs once, and derives one
//! centrality map per graph.

pub mod centrality;
pub mod error;
pub mod graph;
pub mod progress;
pub mod triples;

pub use centrality::{pagerank, CentralityConfig, CentralityMap, CentralityResult};
pub use error::{GraphError, LoadError};
pub use graph::{Edge, KnowledgeGraph};
pub use progress::Progress;
pub use triples::{load_id_map, load_triples, IdMap, Triple, TripleStore};

/// Entity identifier as it appears in `entity2id.txt`.
pub type EntityId = u32;

/// Relation identifier as it appears in `relation2id.txt`.
pub type RelationId = u32;
