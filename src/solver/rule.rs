//! Single-rule evaluation.
//!
//! A rule body is a join/filter pipeline over *bindings* (partial maps from
//! rule variables to values). Evaluation starts from one empty binding and
//! folds the body predicates in declaration order; each surviving binding
//! is then pushed through the head to produce emissions. The evaluator
//! never reorders predicates and never writes to the stores itself, so a
//! rule pass is a pure function of the store state it reads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::eval::EvalContext;
use crate::ir::{
    BodyPredicate, BodyTerm, Constraint, Expr, HeadPredicate, HeadTerm, Pattern, Polarity,
    SourceLoc, Table,
};
use crate::store::Stores;
use crate::symbol::{TableSym, VarSym};
use crate::value::Value;

/// A partial mapping from body-scope variables to values.
pub(crate) type Binding = HashMap<VarSym, Value>;

/// A derived store update, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// A tuple for a relation table.
    Fact { table: TableSym, tuple: Vec<Value> },
    /// A key/value join for a lattice table.
    Join {
        table: TableSym,
        keys: Vec<Value>,
        value: Value,
    },
}

/// Evaluates one constraint against a snapshot of the stores.
pub(crate) struct RuleEvaluator<'a> {
    ctx: EvalContext<'a>,
    stores: &'a Stores,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(ctx: EvalContext<'a>, stores: &'a Stores) -> Self {
        RuleEvaluator { ctx, stores }
    }

    /// All emissions derivable from the current stores for one rule.
    /// Idempotent given unchanged stores.
    pub fn emissions(&self, constraint: &Constraint) -> Result<Vec<Emission>> {
        let mut bindings = vec![Binding::new()];
        for pred in &constraint.body {
            bindings = self.step(pred, bindings)?;
            if bindings.is_empty() {
                break;
            }
        }
        self.head_emissions(&constraint.head, &bindings)
    }

    /// Extend/filter the binding stream through one body predicate.
    fn step(&self, pred: &BodyPredicate, bindings: Vec<Binding>) -> Result<Vec<Binding>> {
        match pred {
            BodyPredicate::Atom {
                table,
                polarity: Polarity::Positive,
                terms,
                loc,
            } => {
                let mut out = Vec::new();
                for binding in &bindings {
                    out.extend(self.matches(table, terms, binding, loc)?);
                }
                Ok(out)
            }
            // Fail-close: keep the incoming binding iff nothing matches.
            // All variable terms are bound at this point (body invariant).
            BodyPredicate::Atom {
                table,
                polarity: Polarity::Negative,
                terms,
                loc,
            } => {
                let mut out = Vec::new();
                for binding in bindings {
                    if self.matches(table, terms, &binding, loc)?.is_empty() {
                        out.push(binding);
                    }
                }
                Ok(out)
            }
            BodyPredicate::Filter { defn, terms, loc } => {
                let mut out = Vec::new();
                for binding in bindings {
                    let args = terms
                        .iter()
                        .map(|t| self.filter_arg(t, &binding))
                        .collect::<Result<Vec<_>>>()?;
                    let verdict = self.ctx.invoke(defn, args, loc)?;
                    match verdict.as_bool() {
                        Some(true) => out.push(binding),
                        Some(false) => {}
                        None => {
                            return Err(Error::TypeMismatch {
                                expected: "bool from filter".to_string(),
                                found: verdict.kind().to_string(),
                                loc: loc.clone(),
                            })
                        }
                    }
                }
                Ok(out)
            }
            BodyPredicate::Loop { var, term, loc } => {
                let mut out = Vec::new();
                for binding in bindings {
                    let collection = self.head_term(term, &binding)?;
                    for element in iter_collection(&collection, loc)? {
                        let mut extended = binding.clone();
                        extended.insert(var.clone(), element);
                        out.push(extended);
                    }
                }
                Ok(out)
            }
        }
    }

    /// All extensions of `binding` matching the atom against the store.
    fn matches(
        &self,
        table: &TableSym,
        terms: &[BodyTerm],
        binding: &Binding,
        loc: &SourceLoc,
    ) -> Result<Vec<Binding>> {
        let mut out = Vec::new();
        match self.table(table, loc)? {
            Table::Relation { .. } => {
                for tuple in self.candidates(table, terms, binding)? {
                    if let Some(extended) = self.unify_tuple(terms, &tuple, binding)? {
                        out.push(extended);
                    }
                }
            }
            Table::Lattice { .. } => {
                for (keys, value) in self.stores.lattices.scan(table) {
                    let mut row = keys;
                    row.push(value);
                    if let Some(extended) = self.unify_tuple(terms, &row, binding)? {
                        out.push(extended);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Candidate tuples for a relation atom: an index probe when the bound
    /// term positions form the column set of a declared index (in any
    /// order), a full scan otherwise.
    fn candidates(
        &self,
        table: &TableSym,
        terms: &[BodyTerm],
        binding: &Binding,
    ) -> Result<Vec<Arc<[Value]>>> {
        let mut columns = Vec::new();
        let mut key = Vec::new();
        for (col, term) in terms.iter().enumerate() {
            match term {
                BodyTerm::Var { sym, .. } => {
                    if let Some(v) = binding.get(sym) {
                        columns.push(col);
                        key.push(v.clone());
                    }
                }
                BodyTerm::Lit { exp, .. } => {
                    columns.push(col);
                    key.push(self.eval_closed(exp)?);
                }
                BodyTerm::Wild { .. } | BodyTerm::Pat { .. } => {}
            }
        }
        if !columns.is_empty() {
            if let Some(hits) = self.stores.relations.probe(table, &columns, &key) {
                return Ok(hits);
            }
        }
        Ok(self.stores.relations.scan(table))
    }

    /// Unify every term with the corresponding tuple column. Returns the
    /// extended binding on success.
    fn unify_tuple(
        &self,
        terms: &[BodyTerm],
        tuple: &[Value],
        binding: &Binding,
    ) -> Result<Option<Binding>> {
        if terms.len() != tuple.len() {
            return Ok(None);
        }
        let mut extended = binding.clone();
        for (term, column) in terms.iter().zip(tuple) {
            match term {
                BodyTerm::Wild { .. } => {}
                BodyTerm::Var { sym, .. } => match extended.get(sym) {
                    Some(bound) => {
                        if bound != column {
                            return Ok(None);
                        }
                    }
                    None => {
                        extended.insert(sym.clone(), column.clone());
                    }
                },
                BodyTerm::Lit { exp, .. } => {
                    if self.eval_closed(exp)? != *column {
                        return Ok(None);
                    }
                }
                BodyTerm::Pat { pat, .. } => {
                    if !self.match_pattern(pat, column, &mut extended)? {
                        return Ok(None);
                    }
                }
            }
        }
        Ok(Some(extended))
    }

    /// Match a structural pattern against a value, binding sub-variables.
    fn match_pattern(&self, pat: &Pattern, value: &Value, binding: &mut Binding) -> Result<bool> {
        match pat {
            Pattern::Wild { .. } => Ok(true),
            Pattern::Var { sym, .. } => match binding.get(sym) {
                Some(bound) => Ok(bound == value),
                None => {
                    binding.insert(sym.clone(), value.clone());
                    Ok(true)
                }
            },
            Pattern::Lit { exp, .. } => Ok(self.eval_closed(exp)? == *value),
            Pattern::Tag { tag, pat, .. } => match value.as_tag() {
                Some(tv) if tv.name == *tag => self.match_pattern(pat, &tv.payload, binding),
                _ => Ok(false),
            },
            Pattern::Tuple { elms, .. } => match value.as_tuple() {
                Some(columns) if columns.len() == elms.len() => {
                    for (p, v) in elms.iter().zip(columns) {
                        if !self.match_pattern(p, v, binding)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }

    /// Process the head for every surviving binding.
    fn head_emissions(
        &self,
        head: &HeadPredicate,
        bindings: &[Binding],
    ) -> Result<Vec<Emission>> {
        match head {
            HeadPredicate::True { .. } => Ok(Vec::new()),
            HeadPredicate::False { loc } => {
                if bindings.is_empty() {
                    Ok(Vec::new())
                } else {
                    Err(Error::IntegrityViolation { loc: loc.clone() })
                }
            }
            // Negative heads are used by dependency analysis only; they
            // derive nothing.
            HeadPredicate::Atom {
                polarity: Polarity::Negative,
                ..
            } => Ok(Vec::new()),
            HeadPredicate::Atom {
                table,
                polarity: Polarity::Positive,
                terms,
                loc,
            } => {
                let schema = self.table(table, loc)?;
                let mut out = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    let values = terms
                        .iter()
                        .map(|t| self.head_term(t, binding))
                        .collect::<Result<Vec<_>>>()?;
                    out.push(split_emission(schema, table, values, loc)?);
                }
                Ok(out)
            }
        }
    }

    /// Evaluate a head term under a binding.
    fn head_term(&self, term: &HeadTerm, binding: &Binding) -> Result<Value> {
        match term {
            HeadTerm::Var { sym, loc } => {
                binding
                    .get(sym)
                    .cloned()
                    .ok_or_else(|| Error::UnboundVariable {
                        name: sym.text.clone(),
                        loc: loc.clone(),
                    })
            }
            HeadTerm::Lit { exp, .. } => self.eval_closed(exp),
            HeadTerm::App { defn, args, loc } => {
                let argv = args
                    .iter()
                    .map(|sym| {
                        binding
                            .get(sym)
                            .cloned()
                            .ok_or_else(|| Error::UnboundVariable {
                                name: sym.text.clone(),
                                loc: loc.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.ctx.invoke(defn, argv, loc)
            }
        }
    }

    /// Value of a filter argument term. Wildcards cannot appear here.
    fn filter_arg(&self, term: &BodyTerm, binding: &Binding) -> Result<Value> {
        match term {
            BodyTerm::Var { sym, loc } => {
                binding
                    .get(sym)
                    .cloned()
                    .ok_or_else(|| Error::UnboundVariable {
                        name: sym.text.clone(),
                        loc: loc.clone(),
                    })
            }
            BodyTerm::Lit { exp, .. } => self.eval_closed(exp),
            BodyTerm::Wild { loc } | BodyTerm::Pat { loc, .. } => Err(Error::TypeMismatch {
                expected: "variable or literal filter argument".to_string(),
                found: "wildcard or pattern".to_string(),
                loc: loc.clone(),
            }),
        }
    }

    /// Literal term expressions are closed; evaluate under the empty
    /// environment.
    fn eval_closed(&self, exp: &Expr) -> Result<Value> {
        self.ctx.eval(exp, &crate::env::Environment::new())
    }

    fn table(&self, sym: &TableSym, loc: &SourceLoc) -> Result<&'a Table> {
        self.ctx.root.table(sym).ok_or_else(|| Error::TypeMismatch {
            expected: format!("a declared table '{sym}'"),
            found: "no schema".to_string(),
            loc: loc.clone(),
        })
    }
}

/// Split an evaluated head tuple into a store update according to the
/// table schema.
fn split_emission(
    schema: &Table,
    table: &TableSym,
    mut values: Vec<Value>,
    loc: &SourceLoc,
) -> Result<Emission> {
    match schema {
        Table::Relation { attributes, .. } => {
            if values.len() != attributes.len() {
                return Err(Error::TypeMismatch {
                    expected: format!("{} head columns for '{table}'", attributes.len()),
                    found: format!("{} columns", values.len()),
                    loc: loc.clone(),
                });
            }
            Ok(Emission::Fact {
                table: table.clone(),
                tuple: values,
            })
        }
        Table::Lattice { keys, .. } => {
            if values.len() != keys.len() + 1 {
                return Err(Error::TypeMismatch {
                    expected: format!("{} head columns for '{table}'", keys.len() + 1),
                    found: format!("{} columns", values.len()),
                    loc: loc.clone(),
                });
            }
            let value = values
                .pop()
                .ok_or_else(|| Error::TypeMismatch {
                    expected: "a lattice value column".to_string(),
                    found: "empty head".to_string(),
                    loc: loc.clone(),
                })?;
            Ok(Emission::Join {
                table: table.clone(),
                keys: values,
                value,
            })
        }
    }
}

/// Elements of a collection value: tuple elements in order, or the spine of
/// a `Cons`/`Nil` tag list.
fn iter_collection(value: &Value, loc: &SourceLoc) -> Result<Vec<Value>> {
    match value {
        Value::Tuple(elms) => Ok(elms.to_vec()),
        Value::Tag(_) => {
            let mut out = Vec::new();
            let mut cursor = value.clone();
            loop {
                let next = {
                    let tag = cursor.as_tag().ok_or_else(|| list_mismatch(&cursor, loc))?;
                    match tag.name.as_str() {
                        "Nil" => None,
                        "Cons" => {
                            let cell = tag
                                .payload
                                .as_tuple()
                                .filter(|t| t.len() == 2)
                                .ok_or_else(|| list_mismatch(&tag.payload, loc))?;
                            out.push(cell[0].clone());
                            Some(cell[1].clone())
                        }
                        _ => return Err(list_mismatch(&cursor, loc)),
                    }
                };
                match next {
                    Some(tail) => cursor = tail,
                    None => return Ok(out),
                }
            }
        }
        other => Err(list_mismatch(other, loc)),
    }
}

fn list_mismatch(found: &Value, loc: &SourceLoc) -> Error {
    Error::TypeMismatch {
        expected: "a collection (tuple or Cons/Nil list)".to_string(),
        found: found.kind().to_string(),
        loc: loc.clone(),
    }
}
