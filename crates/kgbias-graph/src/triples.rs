//! Dataset loading: integer triple files and id → name maps.
//!
//! Layout (OpenKE style, as shipped with NELL-995 / FB15k splits):
//!
//! ```text
//! entity2id.txt      <count>\n<name>\t<id>\n...
//! relation2id.txt    <count>\n<name>\t<id>\n...
//! {prefix}train2id.txt  <count>\n<head> <tail> <relation>\n...
//! {prefix}valid2id.txt
//! {prefix}test2id.txt
//! ```
//!
//! The first line of every file is a header and is skipped. Lines with the
//! wrong number of fields are skipped; a field that is present but not an
//! integer fails the load.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::{EntityId, RelationId};

/// A (head, tail, relation) fact, in the field order of the `*2id.txt` files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub head: EntityId,
    pub tail: EntityId,
    pub relation: RelationId,
}

impl Triple {
    pub const fn new(head: EntityId, tail: EntityId, relation: RelationId) -> Self {
        Self {
            head,
            tail,
            relation,
        }
    }
}

/// Id → display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    names: BTreeMap<u32, String>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Name for `id`, falling back to the id's decimal form.
    pub fn display(&self, id: u32) -> Cow<'_, str> {
        match self.names.get(&id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(id.to_string()),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.names.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(u32, String)> for IdMap {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_u32(field: &str, path: &Path, line: usize) -> Result<u32, LoadError> {
    field.parse::<u32>().map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        line,
        message: format!("`{field}` is not an id: {e}"),
    })
}

/// Parse `head tail relation` lines (whitespace separated, header skipped).
pub fn parse_triples(text: &str, path: &Path) -> Result<Vec<Triple>, LoadError> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            continue;
        }
        let line_no = idx + 1;
        out.push(Triple::new(
            parse_u32(fields[0], path, line_no)?,
            parse_u32(fields[1], path, line_no)?,
            parse_u32(fields[2], path, line_no)?,
        ));
    }
    Ok(out)
}

/// Parse `name<TAB>id` lines (header skipped).
pub fn parse_id_map(text: &str, path: &Path) -> Result<IdMap, LoadError> {
    let mut map = IdMap::new();
    for (idx, line) in text.lines().enumerate().skip(1) {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() != 2 {
            continue;
        }
        let id = parse_u32(fields[1].trim(), path, idx + 1)?;
        map.insert(id, fields[0]);
    }
    Ok(map)
}

pub fn load_triples(path: &Path) -> Result<Vec<Triple>, LoadError> {
    parse_triples(&read_text(path)?, path)
}

pub fn load_id_map(path: &Path) -> Result<IdMap, LoadError> {
    parse_id_map(&read_text(path)?, path)
}

/// All inputs of one analysis run, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TripleStore {
    pub entities: IdMap,
    pub relations: IdMap,
    pub train: Vec<Triple>,
    pub valid: Vec<Triple>,
    pub test: Vec<Triple>,
}

impl TripleStore {
    pub fn load(dataset_dir: &Path, split_prefix: &str) -> Result<Self, LoadError> {
        let split = |name: &str| -> PathBuf {
            dataset_dir.join(format!("{split_prefix}{name}2id.txt"))
        };

        let store = Self {
            entities: load_id_map(&dataset_dir.join("entity2id.txt"))?,
            relations: load_id_map(&dataset_dir.join("relation2id.txt"))?,
            train: load_triples(&split("train"))?,
            valid: load_triples(&split("valid"))?,
            test: load_triples(&split("test"))?,
        };

        tracing::info!(
            dir = %dataset_dir.display(),
            entities = store.entities.len(),
            relations = store.relations.len(),
            train = store.train.len(),
            valid = store.valid.len(),
            test = store.test.len(),
            "dataset loaded"
        );
        Ok(store)
    }

    /// The known-true triples: train, then test, then valid.
    pub fn known(&self) -> Vec<Triple> {
        let mut all = Vec::with_capacity(self.train.len() + self.test.len() + self.valid.len());
        all.extend_from_slice(&self.train);
        all.extend_from_slice(&self.test);
        all.extend_from_slice(&self.valid);
        all
    }

    pub fn known_set(&self) -> HashSet<Triple> {
        self.train
            .iter()
            .chain(&self.test)
            .chain(&self.valid)
            .copied()
            .collect()
    }
}
