//! Directed multigraph over entity ids.
//!
//! One node per known entity (plus any id that only shows up as a triple
//! endpoint), one edge per triple. Parallel edges are kept: two triples
//! between the same pair under different relations, or the same triple
//! listed twice, produce two edges.

use std::collections::{BTreeMap, HashMap};

use crate::triples::{IdMap, Triple};
use crate::{EntityId, RelationId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub head: EntityId,
    pub tail: EntityId,
    pub relation: RelationId,
    pub relation_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: BTreeMap<EntityId, String>,
    edges: Vec<Edge>,
}

impl KnowledgeGraph {
    /// Build from a triple collection. Names fall back to the id's string form.
    pub fn build<'a, I>(triples: I, entities: &IdMap, relations: &IdMap) -> Self
    where
        I: IntoIterator<Item = &'a Triple>,
    {
        let mut nodes: BTreeMap<EntityId, String> = entities
            .ids()
            .map(|id| (id, entities.display(id).into_owned()))
            .collect();

        let mut edges = Vec::new();
        for t in triples {
            for endpoint in [t.head, t.tail] {
                nodes
                    .entry(endpoint)
                    .or_insert_with(|| endpoint.to_string());
            }
            edges.push(Edge {
                head: t.head,
                tail: t.tail,
                relation: t.relation,
                relation_name: relations.display(t.relation).into_owned(),
            });
        }

        Self { nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.nodes.get(&id).map(String::as_str)
    }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Dense view for iterative algorithms: `ids[i]` is node `i`, and
    /// `out_adj[i]` lists one target index per outgoing edge (repeats kept).
    pub fn out_adjacency(&self) -> (Vec<EntityId>, Vec<Vec<u32>>) {
        let ids: Vec<EntityId> = self.node_ids().collect();
        let index: HashMap<EntityId, u32> = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i as u32))
            .collect();

        let mut out_adj: Vec<Vec<u32>> = vec![Vec::new(); ids.len()];
        for e in &self.edges {
            let u = index[&e.head] as usize;
            out_adj[u].push(index[&e.tail]);
        }
        (ids, out_adj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps() -> (IdMap, IdMap) {
        let entities: IdMap = [(0, "a".to_string()), (1, "b".to_string()), (2, "c".to_string())]
            .into_iter()
            .collect();
        let relations: IdMap = [(0, "r0".to_string())].into_iter().collect();
        (entities, relations)
    }

    #[test]
    fn every_known_entity_is_a_node() {
        let (entities, relations) = maps();
        let g = KnowledgeGraph::build(&[Triple::new(0, 1, 0)], &entities, &relations);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.name(2), Some("c"));
    }

    #[test]
    fn parallel_edges_are_not_collapsed() {
        let (entities, relations) = maps();
        let triples = [Triple::new(0, 1, 0), Triple::new(0, 1, 7), Triple::new(0, 1, 0)];
        let g = KnowledgeGraph::build(&triples, &entities, &relations);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.edges()[1].relation_name, "7");

        let (ids, out_adj) = g.out_adjacency();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(out_adj[0], vec![1, 1, 1]);
    }

    #[test]
    fn unmapped_endpoint_becomes_named_by_id() {
        let (entities, relations) = maps();
        let g = KnowledgeGraph::build(&[Triple::new(2, 9, 0)], &entities, &relations);
        assert!(g.contains(9));
        assert_eq!(g.name(9), Some("9"));
        assert_eq!(g.node_count(), 4);
    }
}
