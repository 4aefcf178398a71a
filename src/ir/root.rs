//! # Program Root
//!
//! The immutable bundle handed over by the upstream compiler: definitions,
//! enums, lattice operator bundles, table schemas, declared indexes, and
//! the stratified constraint system. A `Root` is created once per program
//! and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::ir::{Expr, FormalParam, MonoType, SourceLoc};
use crate::symbol::{DefnSym, EnumSym, TableSym, VarSym};

// ============================================================================
// Definitions and Enums
// ============================================================================

/// A top-level definition: formal parameters and a body expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub sym: DefnSym,
    pub formals: Vec<FormalParam>,
    pub body: Expr,
    pub tpe: MonoType,
}

impl Definition {
    /// Number of formal parameters.
    pub fn arity(&self) -> usize {
        self.formals.len()
    }
}

/// One case of an enum: a tag name and its payload type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumCase {
    pub tag: String,
    pub tpe: MonoType,
}

/// A declared enum and its cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub sym: EnumSym,
    pub cases: Vec<EnumCase>,
}

impl EnumDef {
    /// Look up a case by tag name.
    pub fn case(&self, tag: &str) -> Option<&EnumCase> {
        self.cases.iter().find(|c| c.tag == tag)
    }
}

// ============================================================================
// Lattices and Tables
// ============================================================================

/// The operator bundle attached to a lattice-typed value. Each member is an
/// IR expression: `bot` and `top` evaluate to the extreme elements, the
/// remaining three evaluate to binary functions. The store never inspects a
/// bundle beyond evaluating `bot`, `leq`, and `lub`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeOps {
    pub bot: Expr,
    pub top: Expr,
    pub leq: Expr,
    pub lub: Expr,
    pub glb: Expr,
}

/// A named, typed column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub tpe: MonoType,
}

/// A table schema: either a relation (a set of tuples) or a lattice map
/// (key columns plus a single lattice-valued column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Table {
    Relation {
        sym: TableSym,
        attributes: Vec<Attribute>,
    },
    Lattice {
        sym: TableSym,
        keys: Vec<Attribute>,
        value: Attribute,
    },
}

impl Table {
    pub fn sym(&self) -> &TableSym {
        match self {
            Table::Relation { sym, .. } | Table::Lattice { sym, .. } => sym,
        }
    }

    pub fn is_lattice(&self) -> bool {
        matches!(self, Table::Lattice { .. })
    }

    /// Total column count: attribute count for relations, key columns plus
    /// the value column for lattices.
    pub fn arity(&self) -> usize {
        match self {
            Table::Relation { attributes, .. } => attributes.len(),
            Table::Lattice { keys, .. } => keys.len() + 1,
        }
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// Polarity of an atom occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
}

/// The head of a constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeadPredicate {
    /// Trivially satisfied; derives nothing.
    True { loc: SourceLoc },
    /// An integrity constraint: any derivation reaching this head is a
    /// violation.
    False { loc: SourceLoc },
    Atom {
        table: TableSym,
        polarity: Polarity,
        terms: Vec<HeadTerm>,
        loc: SourceLoc,
    },
}

/// A predicate in a constraint body, evaluated in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyPredicate {
    Atom {
        table: TableSym,
        polarity: Polarity,
        terms: Vec<BodyTerm>,
        loc: SourceLoc,
    },
    /// A built-in filter: apply the definition to the term values and keep
    /// the binding iff the result is `true`.
    Filter {
        defn: DefnSym,
        terms: Vec<BodyTerm>,
        loc: SourceLoc,
    },
    /// A loop generator: evaluate the term to a collection value and bind
    /// the variable to each element in turn.
    Loop {
        var: VarSym,
        term: HeadTerm,
        loc: SourceLoc,
    },
}

impl BodyPredicate {
    pub fn loc(&self) -> &SourceLoc {
        match self {
            BodyPredicate::Atom { loc, .. }
            | BodyPredicate::Filter { loc, .. }
            | BodyPredicate::Loop { loc, .. } => loc,
        }
    }

    /// The table this predicate reads, if it is an atom.
    pub fn table(&self) -> Option<&TableSym> {
        match self {
            BodyPredicate::Atom { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn is_negative_atom(&self) -> bool {
        matches!(
            self,
            BodyPredicate::Atom {
                polarity: Polarity::Negative,
                ..
            }
        )
    }
}

/// A term in head position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeadTerm {
    Var { sym: VarSym, loc: SourceLoc },
    Lit { exp: Expr, loc: SourceLoc },
    /// Apply a definition to the values of the listed variables.
    App {
        defn: DefnSym,
        args: Vec<VarSym>,
        loc: SourceLoc,
    },
}

/// A term in body position, unified against a tuple column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyTerm {
    /// Matches any column value without binding.
    Wild { loc: SourceLoc },
    Var { sym: VarSym, loc: SourceLoc },
    Lit { exp: Expr, loc: SourceLoc },
    Pat { pat: Pattern, loc: SourceLoc },
}

/// A structural pattern matched against a column value, binding any
/// sub-variables on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    Wild {
        loc: SourceLoc,
    },
    Var {
        sym: VarSym,
        loc: SourceLoc,
    },
    Lit {
        exp: Expr,
        loc: SourceLoc,
    },
    Tag {
        sym: EnumSym,
        tag: String,
        pat: Box<Pattern>,
        loc: SourceLoc,
    },
    Tuple {
        elms: Vec<Pattern>,
        loc: SourceLoc,
    },
}

impl Pattern {
    /// Collect the variables bound by this pattern.
    pub fn variables(&self) -> Vec<VarSym> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<VarSym>) {
        match self {
            Pattern::Wild { .. } | Pattern::Lit { .. } => {}
            Pattern::Var { sym, .. } => out.push(sym.clone()),
            Pattern::Tag { pat, .. } => pat.collect_variables(out),
            Pattern::Tuple { elms, .. } => {
                for p in elms {
                    p.collect_variables(out);
                }
            }
        }
    }
}

/// A Horn-like rule: one head predicate, a sequence of body predicates, and
/// the rule's parameter variables in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub head: HeadPredicate,
    pub body: Vec<BodyPredicate>,
    pub params: Vec<VarSym>,
}

impl Constraint {
    pub fn new(head: HeadPredicate, body: Vec<BodyPredicate>, params: Vec<VarSym>) -> Self {
        Constraint { head, body, params }
    }

    /// A fact is a constraint with an empty body.
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// The table derived by this constraint, if the head is an atom.
    pub fn head_table(&self) -> Option<&TableSym> {
        match &self.head {
            HeadPredicate::Atom { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// A group of constraints saturated together. Strata are linearly ordered;
/// negation only crosses stratum boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stratum {
    pub constraints: Vec<Constraint>,
}

/// A law stub carried through for tooling; the solver ignores these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub law: DefnSym,
    pub defn: DefnSym,
    pub exp: Expr,
    pub loc: SourceLoc,
}

// ============================================================================
// Root
// ============================================================================

/// The compiled program bundle. See the module docs for lifecycle.
#[derive(Debug, Clone, Default)]
pub struct Root {
    pub defs: HashMap<DefnSym, Definition>,
    pub enums: HashMap<EnumSym, EnumDef>,
    /// Lattice operator bundles keyed by value type. Linear scan: programs
    /// declare a handful of lattices at most.
    pub lattices: Vec<(MonoType, LatticeOps)>,
    pub tables: HashMap<TableSym, Table>,
    /// User-declared index column subsets per table.
    pub indexes: HashMap<TableSym, Vec<Vec<usize>>>,
    pub strata: Vec<Stratum>,
    pub properties: Vec<Property>,
    /// Pruning hint from upstream dead-code analysis.
    pub reachable: HashSet<DefnSym>,
}

impl Root {
    pub fn new() -> Self {
        Root::default()
    }

    pub fn add_def(&mut self, def: Definition) {
        self.defs.insert(def.sym.clone(), def);
    }

    pub fn add_enum(&mut self, def: EnumDef) {
        self.enums.insert(def.sym.clone(), def);
    }

    pub fn add_lattice(&mut self, tpe: MonoType, ops: LatticeOps) {
        self.lattices.push((tpe, ops));
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.sym().clone(), table);
    }

    pub fn add_index(&mut self, table: TableSym, columns: Vec<usize>) {
        self.indexes.entry(table).or_default().push(columns);
    }

    pub fn add_stratum(&mut self, stratum: Stratum) {
        self.strata.push(stratum);
    }

    /// Look up a definition.
    pub fn def(&self, sym: &DefnSym) -> Option<&Definition> {
        self.defs.get(sym)
    }

    /// Look up a table schema.
    pub fn table(&self, sym: &TableSym) -> Option<&Table> {
        self.tables.get(sym)
    }

    /// Look up the lattice operator bundle for a value type.
    pub fn lattice_ops(&self, tpe: &MonoType) -> Option<&LatticeOps> {
        self.lattices
            .iter()
            .find(|(t, _)| t == tpe)
            .map(|(_, ops)| ops)
    }

    /// The declared index column subsets for a table (empty if none).
    pub fn indexes_of(&self, sym: &TableSym) -> &[Vec<usize>] {
        self.indexes.get(sym).map_or(&[], Vec::as_slice)
    }

    /// All constraints across all strata, in stratum order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.strata.iter().flat_map(|s| s.constraints.iter())
    }
}
