//! # IR and Fact Import
//!
//! JSON entry points for the two inputs the runtime consumes: a compiled
//! [`Root`] and a set of initial facts.
//!
//! The IR types serialize directly; [`RootDoc`] is the flat document shape
//! (symbol-keyed maps become plain lists in transport). Facts use the
//! dedicated [`FactValue`] mirror because runtime values are not generally
//! serializable: closures and boxes cannot appear in an imported fact.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ir::{
    Definition, EnumDef, LatticeOps, MonoType, Property, Root, Stratum, Table,
};
use crate::store::InitialFact;
use crate::symbol::{DefnSym, TableSym};
use crate::value::Value;

// ============================================================================
// Root Documents
// ============================================================================

/// A lattice declaration: the value type and its operator bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeDecl {
    pub tpe: MonoType,
    pub ops: LatticeOps,
}

/// An index declaration: ordered column subsets for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDecl {
    pub table: TableSym,
    pub columns: Vec<Vec<usize>>,
}

/// The transport shape of a [`Root`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootDoc {
    #[serde(default)]
    pub defs: Vec<Definition>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub lattices: Vec<LatticeDecl>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub indexes: Vec<IndexDecl>,
    #[serde(default)]
    pub strata: Vec<Stratum>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub reachable: Vec<DefnSym>,
}

impl From<RootDoc> for Root {
    fn from(doc: RootDoc) -> Root {
        let mut root = Root::new();
        for def in doc.defs {
            root.add_def(def);
        }
        for en in doc.enums {
            root.add_enum(en);
        }
        for lattice in doc.lattices {
            root.add_lattice(lattice.tpe, lattice.ops);
        }
        for table in doc.tables {
            root.add_table(table);
        }
        for index in doc.indexes {
            for columns in index.columns {
                root.add_index(index.table.clone(), columns);
            }
        }
        for stratum in doc.strata {
            root.add_stratum(stratum);
        }
        root.properties = doc.properties;
        root.reachable = doc.reachable.into_iter().collect();
        root
    }
}

/// Decode a compiled program from JSON.
pub fn root_from_json(json: &str) -> Result<Root> {
    let doc: RootDoc = serde_json::from_str(json)?;
    Ok(doc.into())
}

// ============================================================================
// Fact Documents
// ============================================================================

/// A first-order value in a fact document. Mirrors [`Value`] minus the
/// variants that cannot cross a process boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactValue {
    Unit,
    Bool(bool),
    Char(char),
    Float32(f32),
    Float64(f64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    BigInt(BigInt),
    Str(String),
    Tag {
        name: String,
        payload: Box<FactValue>,
    },
    Tuple(Vec<FactValue>),
}

impl From<FactValue> for Value {
    fn from(fv: FactValue) -> Value {
        match fv {
            FactValue::Unit => Value::Unit,
            FactValue::Bool(b) => Value::Bool(b),
            FactValue::Char(c) => Value::Char(c),
            FactValue::Float32(f) => Value::Float32(f),
            FactValue::Float64(f) => Value::Float64(f),
            FactValue::Int8(i) => Value::Int8(i),
            FactValue::Int16(i) => Value::Int16(i),
            FactValue::Int32(i) => Value::Int32(i),
            FactValue::Int64(i) => Value::Int64(i),
            FactValue::BigInt(i) => Value::BigInt(i),
            FactValue::Str(s) => Value::string(s),
            FactValue::Tag { name, payload } => Value::tag(name, Value::from(*payload)),
            FactValue::Tuple(elms) => Value::tuple(elms.into_iter().map(Value::from).collect()),
        }
    }
}

impl TryFrom<&Value> for FactValue {
    type Error = Error;

    /// Render a first-order runtime value, e.g. to export a saturated
    /// store. Closures and boxes are not representable.
    fn try_from(value: &Value) -> Result<FactValue> {
        let out = match value {
            Value::Unit => FactValue::Unit,
            Value::Bool(b) => FactValue::Bool(*b),
            Value::Char(c) => FactValue::Char(*c),
            Value::Float32(f) => FactValue::Float32(*f),
            Value::Float64(f) => FactValue::Float64(*f),
            Value::Int8(i) => FactValue::Int8(*i),
            Value::Int16(i) => FactValue::Int16(*i),
            Value::Int32(i) => FactValue::Int32(*i),
            Value::Int64(i) => FactValue::Int64(*i),
            Value::BigInt(i) => FactValue::BigInt(i.clone()),
            Value::Str(s) => FactValue::Str(s.to_string()),
            Value::Tag(tag) => FactValue::Tag {
                name: tag.name.clone(),
                payload: Box::new(FactValue::try_from(&tag.payload)?),
            },
            Value::Tuple(elms) => FactValue::Tuple(
                elms.iter()
                    .map(FactValue::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Closure(_) | Value::Box(_) => {
                return Err(Error::Import(format!(
                    "{} values cannot be exported as facts",
                    value.kind()
                )))
            }
        };
        Ok(out)
    }
}

/// Rows for one relation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationFacts {
    pub table: TableSym,
    pub rows: Vec<Vec<FactValue>>,
}

/// One lattice entry: key columns and a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeRow {
    pub keys: Vec<FactValue>,
    pub value: FactValue,
}

/// Rows for one lattice table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeFacts {
    pub table: TableSym,
    pub rows: Vec<LatticeRow>,
}

/// The transport shape of an initial fact set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactsDoc {
    #[serde(default)]
    pub relations: Vec<RelationFacts>,
    #[serde(default)]
    pub lattices: Vec<LatticeFacts>,
}

impl From<FactsDoc> for Vec<InitialFact> {
    fn from(doc: FactsDoc) -> Vec<InitialFact> {
        let mut out = Vec::new();
        for rel in doc.relations {
            for row in rel.rows {
                out.push(InitialFact::Relation {
                    table: rel.table.clone(),
                    tuple: row.into_iter().map(Value::from).collect(),
                });
            }
        }
        for lat in doc.lattices {
            for row in lat.rows {
                out.push(InitialFact::Lattice {
                    table: lat.table.clone(),
                    keys: row.keys.into_iter().map(Value::from).collect(),
                    value: Value::from(row.value),
                });
            }
        }
        out
    }
}

/// Decode an initial fact set from JSON.
pub fn facts_from_json(json: &str) -> Result<Vec<InitialFact>> {
    let doc: FactsDoc = serde_json::from_str(json)?;
    Ok(doc.into())
}
