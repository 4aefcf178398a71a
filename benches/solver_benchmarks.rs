//! Saturation benchmarks: transitive closure over chains and grids.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use fixlog::ir::{
    Attribute, BodyPredicate, BodyTerm, Constraint, HeadPredicate, HeadTerm, MonoType, Polarity,
    Root, SourceLoc, Stratum, Table,
};
use fixlog::{InitialFact, Linker, Solver, SolverConfig, TableSym, Value, VarSym};

fn loc() -> SourceLoc {
    SourceLoc::unknown()
}

fn int64_relation(sym: &TableSym, columns: &[&str]) -> Table {
    Table::Relation {
        sym: sym.clone(),
        attributes: columns
            .iter()
            .map(|name| Attribute {
                name: (*name).to_string(),
                tpe: MonoType::Int64,
            })
            .collect(),
    }
}

/// `path(x,y) :- edge(x,y). path(x,z) :- edge(x,y), path(y,z).`
fn transitive_closure_root() -> (Root, TableSym, TableSym) {
    let edge = TableSym::new(1, "edge");
    let path = TableSym::new(2, "path");
    let x = VarSym::new(1, "x", 0);
    let y = VarSym::new(2, "y", 1);
    let z = VarSym::new(3, "z", 2);

    let body_var = |sym: &VarSym| BodyTerm::Var {
        sym: sym.clone(),
        loc: loc(),
    };
    let head_var = |sym: &VarSym| HeadTerm::Var {
        sym: sym.clone(),
        loc: loc(),
    };
    let atom = |table: &TableSym, terms: Vec<BodyTerm>| BodyPredicate::Atom {
        table: table.clone(),
        polarity: Polarity::Positive,
        terms,
        loc: loc(),
    };
    let head = |table: &TableSym, terms: Vec<HeadTerm>| HeadPredicate::Atom {
        table: table.clone(),
        polarity: Polarity::Positive,
        terms,
        loc: loc(),
    };

    let mut root = Root::new();
    root.add_table(int64_relation(&edge, &["x", "y"]));
    root.add_table(int64_relation(&path, &["x", "y"]));
    root.add_index(edge.clone(), vec![0]);

    root.add_stratum(Stratum {
        constraints: vec![
            Constraint::new(
                head(&path, vec![head_var(&x), head_var(&y)]),
                vec![atom(&edge, vec![body_var(&x), body_var(&y)])],
                vec![x.clone(), y.clone()],
            ),
            Constraint::new(
                head(&path, vec![head_var(&x), head_var(&z)]),
                vec![
                    atom(&edge, vec![body_var(&x), body_var(&y)]),
                    atom(&path, vec![body_var(&y), body_var(&z)]),
                ],
                vec![x, y, z],
            ),
        ],
    });

    (root, edge, path)
}

fn chain_facts(edge: &TableSym, n: i64) -> Vec<InitialFact> {
    (0..n)
        .map(|i| InitialFact::Relation {
            table: edge.clone(),
            tuple: vec![Value::Int64(i), Value::Int64(i + 1)],
        })
        .collect()
}

fn bench_chain_closure(c: &mut Criterion) {
    let (root, edge, path) = transitive_closure_root();
    let linker = Linker::new();

    let mut group = c.benchmark_group("chain_closure");
    for n in [8i64, 16, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let solver = Solver::new(&root, &linker);
                let saturation = solver.saturate(chain_facts(&edge, n)).expect("saturates");
                assert_eq!(
                    saturation.stores.relations.len(&path) as i64,
                    n * (n + 1) / 2
                );
            });
        });
    }
    group.finish();
}

fn bench_parallel_vs_sequential(c: &mut Criterion) {
    let (root, edge, path) = transitive_closure_root();
    let linker = Linker::new();
    let n = 24i64;

    let mut group = c.benchmark_group("constraint_evaluation");
    for (label, parallel) in [("sequential", false), ("parallel", true)] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let solver = Solver::with_config(
                    &root,
                    &linker,
                    SolverConfig {
                        parallel,
                        max_iterations: None,
                    },
                );
                let saturation = solver.saturate(chain_facts(&edge, n)).expect("saturates");
                assert_eq!(
                    saturation.stores.relations.len(&path) as i64,
                    n * (n + 1) / 2
                );
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain_closure, bench_parallel_vs_sequential);
criterion_main!(benches);
