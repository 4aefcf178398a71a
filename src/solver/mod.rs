//! # Fixed-Point Driver
//!
//! Stratified saturation of the constraint system.
//!
//! ```text
//! Root + initial facts
//!     ↓
//! [stratification check]        → rejects corrupt stratum orders
//!     ↓
//! for each stratum, in order:
//!     repeat
//!         [rule evaluator]      → emissions per constraint
//!         [apply emissions]     → relation inserts / lattice joins
//!     until no store changed
//!     ↓
//! saturated stores + statistics
//! ```
//!
//! Within one stratum iteration the emissions are a pure function of the
//! store state at iteration entry, so the constraints of an iteration may
//! be evaluated in parallel (gated by [`SolverConfig::parallel`]); the
//! collected emissions are applied serially afterwards. Termination is
//! guaranteed by store monotonicity together with the contract that user
//! lattices have finite height for any concrete key; the configurable
//! iteration ceiling exists as a safety valve for programs that break that
//! contract.

pub mod rule;

pub use rule::Emission;

use rayon::prelude::*;
use std::time::{Duration, Instant};

use crate::config::SolverConfig;
use crate::env::Linker;
use crate::error::{Error, Result};
use crate::eval::EvalContext;
use crate::ir::stratify::verify_stratification;
use crate::ir::{Root, Stratum, Table};
use crate::store::{InitialFact, Stores};
use crate::symbol::TableSym;

use rule::RuleEvaluator;

/// Per-stratum saturation counters.
#[derive(Debug, Clone, Default)]
pub struct StratumStats {
    /// Iterations until the stratum reported no change (at least one).
    pub iterations: usize,
    /// Emissions produced across all iterations.
    pub emissions: usize,
    /// Emissions that actually changed a store.
    pub changes: usize,
    pub elapsed: Duration,
}

/// Observational statistics for one saturation run.
#[derive(Debug, Clone, Default)]
pub struct SaturationStats {
    pub strata: Vec<StratumStats>,
    pub elapsed: Duration,
}

/// The result of a successful saturation: the saturated stores plus run
/// statistics. The stores are read-only from here on.
#[derive(Debug)]
pub struct Saturation {
    pub stores: Stores,
    pub stats: SaturationStats,
}

/// The stratified fixed-point driver.
pub struct Solver<'a> {
    root: &'a Root,
    linker: &'a Linker,
    config: SolverConfig,
}

impl<'a> Solver<'a> {
    pub fn new(root: &'a Root, linker: &'a Linker) -> Self {
        Solver {
            root,
            linker,
            config: SolverConfig::default(),
        }
    }

    pub fn with_config(root: &'a Root, linker: &'a Linker, config: SolverConfig) -> Self {
        Solver {
            root,
            linker,
            config,
        }
    }

    /// Materialize all derivable facts: insert the initial facts, then run
    /// every stratum to saturation in order. Any failure aborts the run;
    /// no partial store is returned.
    pub fn saturate(&self, facts: Vec<InitialFact>) -> Result<Saturation> {
        verify_stratification(self.root)?;

        let started = Instant::now();
        let ctx = EvalContext::new(self.root, self.linker);
        let stores = Stores::new(self.root);

        for fact in facts {
            self.apply(fact_emission(fact), &stores, &ctx)?;
        }

        let mut stats = SaturationStats::default();
        for (index, stratum) in self.root.strata.iter().enumerate() {
            let stratum_stats = self.saturate_stratum(index, stratum, &stores, &ctx)?;
            stats.strata.push(stratum_stats);
        }
        stats.elapsed = started.elapsed();

        tracing::info!(
            strata = stats.strata.len(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "saturation complete"
        );
        Ok(Saturation { stores, stats })
    }

    fn saturate_stratum(
        &self,
        index: usize,
        stratum: &Stratum,
        stores: &Stores,
        ctx: &EvalContext<'a>,
    ) -> Result<StratumStats> {
        let started = Instant::now();
        let mut stats = StratumStats::default();

        loop {
            stats.iterations += 1;
            if let Some(limit) = self.config.max_iterations {
                if stats.iterations > limit {
                    tracing::warn!(stratum = index, limit, "iteration ceiling tripped");
                    return Err(Error::IterationLimit { limit });
                }
            }

            let emissions = self.collect_emissions(stratum, stores, ctx)?;
            stats.emissions += emissions.len();

            let mut changed = false;
            for emission in emissions {
                if self.apply(emission, stores, ctx)? {
                    stats.changes += 1;
                    changed = true;
                }
            }

            tracing::debug!(
                stratum = index,
                iteration = stats.iterations,
                changed,
                "saturation pass"
            );
            if !changed {
                break;
            }
        }

        stats.elapsed = started.elapsed();
        Ok(stats)
    }

    /// Evaluate every constraint of the stratum against the current store
    /// snapshot. Store writes only happen after collection, so sequential
    /// and parallel evaluation derive the same emissions.
    fn collect_emissions(
        &self,
        stratum: &Stratum,
        stores: &Stores,
        ctx: &EvalContext<'a>,
    ) -> Result<Vec<Emission>> {
        let evaluator = RuleEvaluator::new(*ctx, stores);
        let per_constraint: Vec<Vec<Emission>> = if self.config.parallel {
            stratum
                .constraints
                .par_iter()
                .map(|c| evaluator.emissions(c))
                .collect::<Result<_>>()?
        } else {
            stratum
                .constraints
                .iter()
                .map(|c| evaluator.emissions(c))
                .collect::<Result<_>>()?
        };
        Ok(per_constraint.into_iter().flatten().collect())
    }

    /// Apply one emission; returns whether a store changed.
    fn apply(&self, emission: Emission, stores: &Stores, ctx: &EvalContext<'a>) -> Result<bool> {
        match emission {
            Emission::Fact { table, tuple } => Ok(stores.relations.insert(&table, tuple)),
            Emission::Join {
                table,
                keys,
                value,
            } => {
                let ops = self.lattice_ops_of(&table)?;
                stores.lattices.upsert(&table, keys, value, ops, ctx)
            }
        }
    }

    fn lattice_ops_of(&self, table: &TableSym) -> Result<&'a crate::ir::LatticeOps> {
        let schema = self.root.table(table).ok_or_else(|| Error::TypeMismatch {
            expected: format!("a declared table '{table}'"),
            found: "no schema".to_string(),
            loc: crate::ir::SourceLoc::unknown(),
        })?;
        let Table::Lattice { value, .. } = schema else {
            return Err(Error::TypeMismatch {
                expected: format!("a lattice table '{table}'"),
                found: "a relation".to_string(),
                loc: crate::ir::SourceLoc::unknown(),
            });
        };
        self.root
            .lattice_ops(&value.tpe)
            .ok_or_else(|| Error::MissingLatticeOps {
                tpe: value.tpe.clone(),
            })
    }
}

fn fact_emission(fact: InitialFact) -> Emission {
    match fact {
        InitialFact::Relation { table, tuple } => Emission::Fact { table, tuple },
        InitialFact::Lattice {
            table,
            keys,
            value,
        } => Emission::Join {
            table,
            keys,
            value,
        },
    }
}
