//! Closed-world candidate generation.
//!
//! Only listed triples are true. A candidate replaces one side of a true
//! triple and survives if the result is not itself listed.
//!
//! `Local` mode (LCWA) additionally restricts the pool to entities that
//! occur on the same side of the same relation somewhere in the known set,
//! which keeps type-incompatible entities out of the ranking.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use kgbias_graph::{EntityId, RelationId, Triple, TripleStore};

use crate::capability::{CandidateSource, Side};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptionMode {
    /// Every known entity is a candidate.
    Global,
    /// Entities seen on that side of the relation.
    #[default]
    Local,
}

impl CorruptionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClosedWorldSampler {
    mode: CorruptionMode,
    known: HashSet<Triple>,
    entities: Vec<EntityId>,
    heads_by_relation: HashMap<RelationId, Vec<EntityId>>,
    tails_by_relation: HashMap<RelationId, Vec<EntityId>>,
}

impl ClosedWorldSampler {
    pub fn new<T, E>(known: T, entities: E, mode: CorruptionMode) -> Self
    where
        T: IntoIterator<Item = Triple>,
        E: IntoIterator<Item = EntityId>,
    {
        let known: HashSet<Triple> = known.into_iter().collect();

        let mut all: BTreeSet<EntityId> = entities.into_iter().collect();
        let mut heads: HashMap<RelationId, BTreeSet<EntityId>> = HashMap::new();
        let mut tails: HashMap<RelationId, BTreeSet<EntityId>> = HashMap::new();
        for t in &known {
            all.insert(t.head);
            all.insert(t.tail);
            heads.entry(t.relation).or_default().insert(t.head);
            tails.entry(t.relation).or_default().insert(t.tail);
        }

        let flatten = |m: HashMap<RelationId, BTreeSet<EntityId>>| {
            m.into_iter()
                .map(|(r, set)| (r, set.into_iter().collect::<Vec<_>>()))
                .collect::<HashMap<_, _>>()
        };

        Self {
            mode,
            known,
            entities: all.into_iter().collect(),
            heads_by_relation: flatten(heads),
            tails_by_relation: flatten(tails),
        }
    }

    /// Sampler over train ∪ valid ∪ test and every mapped entity.
    pub fn from_store(store: &TripleStore, mode: CorruptionMode) -> Self {
        Self::new(store.known(), store.entities.ids(), mode)
    }

    pub fn is_known(&self, triple: &Triple) -> bool {
        self.known.contains(triple)
    }

    fn pool(&self, relation: RelationId, side: Side) -> &[EntityId] {
        match self.mode {
            CorruptionMode::Global => &self.entities,
            CorruptionMode::Local => {
                let by_relation = match side {
                    Side::Head => &self.heads_by_relation,
                    Side::Tail => &self.tails_by_relation,
                };
                by_relation.get(&relation).map(Vec::as_slice).unwrap_or(&[])
            }
        }
    }
}

impl CandidateSource for ClosedWorldSampler {
    fn corrupted(&self, triple: &Triple, side: Side) -> Vec<EntityId> {
        let truth = side.entity(triple);
        self.pool(triple.relation, side)
            .iter()
            .copied()
            .filter(|&e| e != truth && !self.is_known(&side.substitute(triple, e)))
            .collect()
    }
}
