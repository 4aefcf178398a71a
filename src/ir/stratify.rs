//! Stratification checking.
//!
//! The stratum order is computed upstream and the solver trusts it, but the
//! invariant it encodes is cheap to verify at ingest: a negated body atom
//! may only refer to a table whose defining rules all live in strictly
//! earlier strata. Verification catches IR corrupted in transport before it
//! can produce unsound saturations.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ir::{BodyPredicate, HeadPredicate, Root};
use crate::symbol::TableSym;

/// Kind of dependency a rule places on a table it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    /// Read through a positive atom; same or later stratum is fine.
    Positive,
    /// Read through a negated atom; the table must be fully computed, so
    /// every rule defining it must sit in a strictly earlier stratum.
    Negative,
}

/// The last stratum in which each table appears as a rule head. Tables
/// absent from the map are extensional (populated only by initial facts)
/// and may be negated anywhere.
fn defining_strata(root: &Root) -> HashMap<TableSym, usize> {
    let mut last = HashMap::new();
    for (index, stratum) in root.strata.iter().enumerate() {
        for constraint in &stratum.constraints {
            if let HeadPredicate::Atom { table, .. } = &constraint.head {
                last.insert(table.clone(), index);
            }
        }
    }
    last
}

/// Verify that negation only crosses stratum boundaries downward.
pub fn verify_stratification(root: &Root) -> Result<()> {
    let defined = defining_strata(root);

    for (index, stratum) in root.strata.iter().enumerate() {
        for constraint in &stratum.constraints {
            for pred in &constraint.body {
                let BodyPredicate::Atom {
                    table,
                    polarity: crate::ir::Polarity::Negative,
                    loc,
                    ..
                } = pred
                else {
                    continue;
                };
                if let Some(&def_stratum) = defined.get(table) {
                    if def_stratum >= index {
                        return Err(Error::Stratification {
                            message: format!(
                                "{loc}: table '{table}' is negated in stratum {index} \
                                 but defined in stratum {def_stratum}"
                            ),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}
