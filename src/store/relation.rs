//! Relation tuple store: an append-only set of fixed-arity value tuples
//! per relation symbol, with declared secondary hash indexes for O(1)
//! lookup by join key.
//!
//! # Architecture
//!
//! ```text
//! RelationStore
//!   `-- DashMap<TableSym, RelationData>      (per-table write serialization)
//!         `-- RelationData
//!               |-- HashSet<Arc<[Value]>>    (the tuple set)
//!               `-- Vec<RelationIndex>       (declared column subsets)
//!                     `-- HashMap<Vec<Value>, Vec<Arc<[Value]>>>
//! ```
//!
//! Inserts update every index of the owning table under the same entry
//! lock, so readers observe either the pre- or post-insert state, never an
//! index out of step with its tuple set. The store only grows; nothing is
//! ever removed.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::symbol::TableSym;
use crate::value::Value;

/// A secondary index over a declared column subset. Columns are
/// normalized to ascending order at construction, so the order a user
/// declares them in never decides whether a probe can hit.
#[derive(Debug, Clone, Default)]
struct RelationIndex {
    columns: Vec<usize>,
    map: HashMap<Vec<Value>, Vec<Arc<[Value]>>>,
}

impl RelationIndex {
    fn new(mut columns: Vec<usize>) -> Self {
        columns.sort_unstable();
        RelationIndex {
            columns,
            map: HashMap::new(),
        }
    }

    fn key_of(&self, tuple: &[Value]) -> Vec<Value> {
        self.columns.iter().map(|&c| tuple[c].clone()).collect()
    }

    fn add(&mut self, tuple: &Arc<[Value]>) {
        let key = self.key_of(tuple);
        self.map.entry(key).or_default().push(tuple.clone());
    }
}

#[derive(Debug, Clone, Default)]
struct RelationData {
    tuples: HashSet<Arc<[Value]>>,
    indexes: Vec<RelationIndex>,
}

/// The relation half of the fact database.
#[derive(Debug, Default)]
pub struct RelationStore {
    tables: DashMap<TableSym, RelationData>,
}

impl RelationStore {
    pub fn new() -> Self {
        RelationStore::default()
    }

    /// Declare a table and its index column subsets. Column subsets are
    /// normalized to ascending order, so declaration order is irrelevant.
    /// Tables may also come into existence lazily on first insert, without
    /// indexes.
    pub fn declare(&self, table: TableSym, index_columns: &[Vec<usize>]) {
        let data = RelationData {
            tuples: HashSet::new(),
            indexes: index_columns
                .iter()
                .map(|cols| RelationIndex::new(cols.clone()))
                .collect(),
        };
        self.tables.entry(table).or_insert(data);
    }

    /// Insert a tuple. Returns whether the table changed; duplicate
    /// inserts report `false`.
    pub fn insert(&self, table: &TableSym, tuple: Vec<Value>) -> bool {
        let mut entry = self.tables.entry(table.clone()).or_default();
        let tuple: Arc<[Value]> = Arc::from(tuple);
        if !entry.tuples.insert(tuple.clone()) {
            return false;
        }
        for index in &mut entry.indexes {
            index.add(&tuple);
        }
        true
    }

    /// A snapshot of all tuples of a table.
    pub fn scan(&self, table: &TableSym) -> Vec<Arc<[Value]>> {
        self.tables
            .get(table)
            .map(|data| data.tuples.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Probe a declared index for the tuples whose indexed columns equal
    /// `key`. The column list may be given in any order; it is matched
    /// against declared indexes as a set, with the key permuted to match.
    /// Returns `None` when no index exists on exactly these columns
    /// (callers fall back to [`scan`](Self::scan)).
    pub fn probe(
        &self,
        table: &TableSym,
        columns: &[usize],
        key: &[Value],
    ) -> Option<Vec<Arc<[Value]>>> {
        let data = self.tables.get(table)?;
        let (columns, key) = normalize_key(columns, key);
        let index = data.indexes.iter().find(|ix| ix.columns == columns)?;
        Some(index.map.get(&key).cloned().unwrap_or_default())
    }

    /// Whether the table has an index on exactly these columns, in any
    /// order.
    pub fn has_index(&self, table: &TableSym, columns: &[usize]) -> bool {
        let mut columns = columns.to_vec();
        columns.sort_unstable();
        self.tables
            .get(table)
            .is_some_and(|data| data.indexes.iter().any(|ix| ix.columns == columns))
    }

    /// Number of tuples in a table.
    pub fn len(&self, table: &TableSym) -> usize {
        self.tables.get(table).map_or(0, |data| data.tuples.len())
    }

    pub fn is_empty(&self, table: &TableSym) -> bool {
        self.len(table) == 0
    }

    /// The symbols of all known tables.
    pub fn tables(&self) -> Vec<TableSym> {
        self.tables.iter().map(|e| e.key().clone()).collect()
    }

    /// Whether a tuple is present.
    pub fn contains(&self, table: &TableSym, tuple: &[Value]) -> bool {
        self.tables
            .get(table)
            .is_some_and(|data| data.tuples.contains(tuple))
    }
}

/// Sort a (columns, key) pair by column so a probe lines up with the
/// normalized declaration regardless of the order the caller bound the
/// columns in.
fn normalize_key(columns: &[usize], key: &[Value]) -> (Vec<usize>, Vec<Value>) {
    let mut pairs: Vec<(usize, Value)> = columns
        .iter()
        .copied()
        .zip(key.iter().cloned())
        .collect();
    pairs.sort_by_key(|(col, _)| *col);
    pairs.into_iter().unzip()
}
