//! # Fixlog Runtime
//!
//! The runtime back end of a compiler for a strict, statically-typed
//! functional language with stratified Datalog-style constraints over
//! user-defined lattices. The upstream pipeline (parse → weed →
//! name-resolve → type-check → simplify → closure-convert) produces a
//! compiled [`Root`]; this crate evaluates expressions of that IR and
//! saturates the constraint system.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Root (compiled IR) + initial facts
//!     ↓
//! [Stratification check]        → rejects negation inside a stratum
//!     ↓
//! [Fixed-point driver]          → runs strata in order
//!     ↓           ↑
//! [Rule evaluator]              → joins, filters, loop generators
//!     ↓           ↑
//! [Expression evaluator]        → filter bodies, head applications,
//!     ↓                           lattice operator bundles
//! [Relation store | Lattice store]
//!     ↓
//! Saturated read-only stores + statistics
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fixlog::{Config, Linker, Solver};
//!
//! let root = fixlog::import::root_from_json(&program_json)?;
//! let facts = fixlog::import::facts_from_json(&facts_json)?;
//!
//! let linker = Linker::new();
//! let config = Config::load()?;
//! let solver = Solver::with_config(&root, &linker, config.solver);
//!
//! let saturation = solver.saturate(facts)?;
//! for tuple in saturation.stores.relations.scan(&path_table) {
//!     println!("{tuple:?}");
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `symbol` | Interned variable/definition/enum/table symbols |
//! | `value` | Tagged runtime values |
//! | `ir` | Expressions, types, tables, constraints, the Root bundle |
//! | `env` | Variable environments and the host linker |
//! | `eval` | The expression evaluator |
//! | `store` | Relation and lattice fact stores |
//! | `solver` | Rule evaluation and the stratified fixed-point driver |
//! | `config` | Layered configuration (defaults / toml / env) |
//! | `import` | JSON import of programs and initial facts |

pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod import;
pub mod ir;
pub mod solver;
pub mod store;
pub mod symbol;
pub mod value;

// Re-export the types a host embedding the runtime touches directly.
pub use config::{Config, LoggingConfig, SolverConfig};
pub use env::{Environment, HostFn, Linker};
pub use error::{Error, Result};
pub use eval::EvalContext;
pub use ir::{Expr, MonoType, Root, SourceLoc};
pub use solver::{Emission, Saturation, SaturationStats, Solver, StratumStats};
pub use store::{InitialFact, LatticeStore, RelationStore, Stores};
pub use symbol::{DefnSym, EnumSym, TableSym, VarSym};
pub use value::Value;
