//! Lattice tuple store: per lattice table, a map from key tuple to a
//! single lattice value, updated by least upper bound.
//!
//! The store never inspects a lattice beyond calling the `bot`, `leq`, and
//! `lub` members of the table's operator bundle through the expression
//! evaluator. Two invariants hold at all times:
//!
//! - no stored value is bot (bot is absorbing and pruned), and
//! - the store is monotone: no operation ever decreases an entry under the
//!   lattice's partial order.

use dashmap::DashMap;
use std::collections::HashMap;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::EvalContext;
use crate::ir::{Expr, LatticeOps};
use crate::symbol::TableSym;
use crate::value::Value;

/// The lattice half of the fact database.
#[derive(Debug, Default)]
pub struct LatticeStore {
    tables: DashMap<TableSym, HashMap<Vec<Value>, Value>>,
}

impl LatticeStore {
    pub fn new() -> Self {
        LatticeStore::default()
    }

    /// Declare a table so it shows up in scans even while empty.
    pub fn declare(&self, table: TableSym) {
        self.tables.entry(table).or_default();
    }

    /// Join `incoming` into the entry at `keys`: the new entry is
    /// `lub(current_or_bot, incoming)`. A result equivalent to bot is not
    /// stored. Returns whether the stored value changed (under `leq`
    /// equivalence).
    pub fn upsert(
        &self,
        table: &TableSym,
        keys: Vec<Value>,
        incoming: Value,
        ops: &LatticeOps,
        ctx: &EvalContext<'_>,
    ) -> Result<bool> {
        let bot = eval_element(ctx, &ops.bot)?;
        let mut entry = self.tables.entry(table.clone()).or_default();

        let current = entry.get(&keys).cloned();
        let joined = match &current {
            Some(cur) => call_binary(ctx, &ops.lub, cur, &incoming)?,
            None => call_binary(ctx, &ops.lub, &bot, &incoming)?,
        };

        // bot is absorbing: an entry at bot is an absent entry.
        if leq(ctx, ops, &joined, &bot)? {
            return Ok(false);
        }

        let changed = match &current {
            Some(cur) => !equivalent(ctx, ops, &joined, cur)?,
            None => true,
        };
        if changed {
            entry.insert(keys, joined);
        }
        Ok(changed)
    }

    /// The value stored at `keys`, if present.
    pub fn get(&self, table: &TableSym, keys: &[Value]) -> Option<Value> {
        self.tables.get(table)?.get(keys).cloned()
    }

    /// A snapshot of all entries of a table.
    pub fn scan(&self, table: &TableSym) -> Vec<(Vec<Value>, Value)> {
        self.tables
            .get(table)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Number of entries in a table.
    pub fn len(&self, table: &TableSym) -> usize {
        self.tables.get(table).map_or(0, |map| map.len())
    }

    pub fn is_empty(&self, table: &TableSym) -> bool {
        self.len(table) == 0
    }

    /// The symbols of all known tables.
    pub fn tables(&self) -> Vec<TableSym> {
        self.tables.iter().map(|e| e.key().clone()).collect()
    }
}

/// Evaluate a bundle member that denotes an element (bot, top).
fn eval_element(ctx: &EvalContext<'_>, exp: &Expr) -> Result<Value> {
    ctx.eval(exp, &Environment::new())
}

/// Evaluate a bundle member that denotes a binary function and apply it.
fn call_binary(ctx: &EvalContext<'_>, op: &Expr, a: &Value, b: &Value) -> Result<Value> {
    let f = ctx.eval(op, &Environment::new())?;
    ctx.apply(&f, &[a.clone(), b.clone()], op.loc())
}

/// Partial-order test through the bundle's `leq`.
fn leq(ctx: &EvalContext<'_>, ops: &LatticeOps, a: &Value, b: &Value) -> Result<bool> {
    let out = call_binary(ctx, &ops.leq, a, b)?;
    out.as_bool().ok_or_else(|| Error::TypeMismatch {
        expected: "bool from lattice leq".to_string(),
        found: out.kind().to_string(),
        loc: ops.leq.loc().clone(),
    })
}

/// Equivalence under the partial order: `a leq b` and `b leq a`.
fn equivalent(ctx: &EvalContext<'_>, ops: &LatticeOps, a: &Value, b: &Value) -> Result<bool> {
    Ok(leq(ctx, ops, a, b)? && leq(ctx, ops, b, a)?)
}
