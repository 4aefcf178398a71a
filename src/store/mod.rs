//! # Fact Database
//!
//! The two mutable stores of the runtime: relation tuple sets and lattice
//! key/value maps. Both are created empty (or from initial facts), grow
//! monotonically during saturation, and are read-only thereafter.
//!
//! Per-table write serialization comes from the sharded map each store is
//! built on; within a single rule pass every insert/upsert is atomic, so
//! readers observe either the pre- or post-update state.

pub mod lattice;
pub mod relation;

pub use lattice::LatticeStore;
pub use relation::RelationStore;

use crate::ir::Root;
use crate::symbol::TableSym;
use crate::value::Value;

/// An initial fact supplied to the driver before stratum 0 runs.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialFact {
    Relation {
        table: TableSym,
        tuple: Vec<Value>,
    },
    Lattice {
        table: TableSym,
        keys: Vec<Value>,
        value: Value,
    },
}

/// Both halves of the fact database.
#[derive(Debug, Default)]
pub struct Stores {
    pub relations: RelationStore,
    pub lattices: LatticeStore,
}

impl Stores {
    /// Create empty stores with every table of the root declared, so that
    /// relations carry their index structures from the first insert and
    /// empty tables show up in output views.
    pub fn new(root: &Root) -> Self {
        let stores = Stores {
            relations: RelationStore::new(),
            lattices: LatticeStore::new(),
        };
        for table in root.tables.values() {
            if table.is_lattice() {
                stores.lattices.declare(table.sym().clone());
            } else {
                stores
                    .relations
                    .declare(table.sym().clone(), root.indexes_of(table.sym()));
            }
        }
        stores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Attribute, MonoType, Table};

    #[test]
    fn test_new_declares_tables_from_the_root() {
        let mut root = Root::new();
        let edge = TableSym::new(1, "edge");
        root.add_table(Table::Relation {
            sym: edge.clone(),
            attributes: vec![
                Attribute {
                    name: "x".to_string(),
                    tpe: MonoType::Int64,
                },
                Attribute {
                    name: "y".to_string(),
                    tpe: MonoType::Int64,
                },
            ],
        });
        root.add_index(edge.clone(), vec![0]);

        let best = TableSym::new(2, "best");
        root.add_table(Table::Lattice {
            sym: best.clone(),
            keys: vec![Attribute {
                name: "k".to_string(),
                tpe: MonoType::Int64,
            }],
            value: Attribute {
                name: "v".to_string(),
                tpe: MonoType::Int64,
            },
        });

        let stores = Stores::new(&root);
        assert!(stores.relations.has_index(&edge, &[0]));
        assert!(stores.relations.is_empty(&edge));
        assert!(stores.lattices.is_empty(&best));
        assert_eq!(stores.lattices.tables(), vec![best]);
    }
}
