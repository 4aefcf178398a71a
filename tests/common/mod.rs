//! Shared IR builders for the integration suites.

#![allow(dead_code)]

use fixlog::ir::{
    Attribute, BinaryOp, BodyPredicate, BodyTerm, Constraint, Definition, EnumCase, EnumDef, Expr,
    FormalParam, HeadPredicate, HeadTerm, LatticeOps, MonoType, Polarity, Root, SourceLoc, Stratum,
    Table,
};
use fixlog::{DefnSym, EnumSym, TableSym, Value, VarSym};

pub fn loc() -> SourceLoc {
    SourceLoc::unknown()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Expression builders
// ============================================================================

pub fn int32(lit: i32) -> Expr {
    Expr::Int32 { lit, loc: loc() }
}

pub fn int64(lit: i64) -> Expr {
    Expr::Int64 { lit, loc: loc() }
}

pub fn var(sym: &VarSym, tpe: MonoType) -> Expr {
    Expr::Var {
        sym: sym.clone(),
        tpe,
        loc: loc(),
    }
}

pub fn binary(op: BinaryOp, exp1: Expr, exp2: Expr, tpe: MonoType) -> Expr {
    Expr::Binary {
        op,
        exp1: Box::new(exp1),
        exp2: Box::new(exp2),
        tpe,
        loc: loc(),
    }
}

pub fn is_tag(sym: &EnumSym, tag: &str, exp: Expr) -> Expr {
    Expr::Is {
        sym: sym.clone(),
        tag: tag.to_string(),
        exp: Box::new(exp),
        loc: loc(),
    }
}

pub fn mk_tag(sym: &EnumSym, tag: &str, exp: Expr, tpe: MonoType) -> Expr {
    Expr::Tag {
        sym: sym.clone(),
        tag: tag.to_string(),
        exp: Box::new(exp),
        tpe,
        loc: loc(),
    }
}

pub fn ite(cond: Expr, then: Expr, otherwise: Expr, tpe: MonoType) -> Expr {
    Expr::IfThenElse {
        exp1: Box::new(cond),
        exp2: Box::new(then),
        exp3: Box::new(otherwise),
        tpe,
        loc: loc(),
    }
}

pub fn or(exp1: Expr, exp2: Expr) -> Expr {
    binary(BinaryOp::LogicalOr, exp1, exp2, MonoType::Bool)
}

pub fn and(exp1: Expr, exp2: Expr) -> Expr {
    binary(BinaryOp::LogicalAnd, exp1, exp2, MonoType::Bool)
}

// ============================================================================
// Constraint builders
// ============================================================================

pub fn body_var(sym: &VarSym) -> BodyTerm {
    BodyTerm::Var {
        sym: sym.clone(),
        loc: loc(),
    }
}

pub fn body_wild() -> BodyTerm {
    BodyTerm::Wild { loc: loc() }
}

pub fn head_var(sym: &VarSym) -> HeadTerm {
    HeadTerm::Var {
        sym: sym.clone(),
        loc: loc(),
    }
}

pub fn pos_atom(table: &TableSym, terms: Vec<BodyTerm>) -> BodyPredicate {
    BodyPredicate::Atom {
        table: table.clone(),
        polarity: Polarity::Positive,
        terms,
        loc: loc(),
    }
}

pub fn neg_atom(table: &TableSym, terms: Vec<BodyTerm>) -> BodyPredicate {
    BodyPredicate::Atom {
        table: table.clone(),
        polarity: Polarity::Negative,
        terms,
        loc: loc(),
    }
}

pub fn head_atom(table: &TableSym, terms: Vec<HeadTerm>) -> HeadPredicate {
    HeadPredicate::Atom {
        table: table.clone(),
        polarity: Polarity::Positive,
        terms,
        loc: loc(),
    }
}

pub fn rule(head: HeadPredicate, body: Vec<BodyPredicate>, params: Vec<VarSym>) -> Constraint {
    Constraint::new(head, body, params)
}

pub fn int64_relation(sym: &TableSym, columns: &[&str]) -> Table {
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

// ============================================================================
// Transitive closure program
// ============================================================================

/// The classic program: `path(x,y) :- edge(x,y).` and
/// `path(x,z) :- edge(x,y), path(y,z).` in one stratum, with an index on
/// `edge` column 0.
pub struct TransitiveClosure {
    pub root: Root,
    pub edge: TableSym,
    pub path: TableSym,
}

pub fn transitive_closure() -> TransitiveClosure {
    let edge = TableSym::new(1, "edge");
    let path = TableSym::new(2, "path");

    let x = VarSym::new(1, "x", 0);
    let y = VarSym::new(2, "y", 1);
    let z = VarSym::new(3, "z", 2);

    let mut root = Root::new();
    root.add_table(int64_relation(&edge, &["x", "y"]));
    root.add_table(int64_relation(&path, &["x", "y"]));
    root.add_index(edge.clone(), vec![0]);
    root.add_index(path.clone(), vec![0]);

    let seed = rule(
        head_atom(&path, vec![head_var(&x), head_var(&y)]),
        vec![pos_atom(&edge, vec![body_var(&x), body_var(&y)])],
        vec![x.clone(), y.clone()],
    );
    let step = rule(
        head_atom(&path, vec![head_var(&x), head_var(&z)]),
        vec![
            pos_atom(&edge, vec![body_var(&x), body_var(&y)]),
            pos_atom(&path, vec![body_var(&y), body_var(&z)]),
        ],
        vec![x, y, z],
    );
    root.add_stratum(Stratum {
        constraints: vec![seed, step],
    });

    TransitiveClosure { root, edge, path }
}

pub fn edge_fact(table: &TableSym, a: i64, b: i64) -> fixlog::InitialFact {
    fixlog::InitialFact::Relation {
        table: table.clone(),
        tuple: vec![Value::Int64(a), Value::Int64(b)],
    }
}

// ============================================================================
// Lattices
// ============================================================================

/// The max lattice over Int64: bot = i64::MIN, leq = `<=`, lub = max,
/// glb = min. Definition ids start at `id_base`.
pub fn max_lattice(root: &mut Root, id_base: u32) -> LatticeOps {
    let fun_tpe = MonoType::Arrow(
        vec![MonoType::Int64, MonoType::Int64],
        Box::new(MonoType::Int64),
    );
    let a = VarSym::new(9000 + id_base, "a", 0);
    let b = VarSym::new(9001 + id_base, "b", 1);
    let formals = vec![
        FormalParam {
            sym: a.clone(),
            tpe: MonoType::Int64,
        },
        FormalParam {
            sym: b.clone(),
            tpe: MonoType::Int64,
        },
    ];
    let le = |e1: Expr, e2: Expr| binary(BinaryOp::LessEqual, e1, e2, MonoType::Bool);
    let int = MonoType::Int64;

    let leq_sym = DefnSym::new(id_base, "int64Leq");
    let lub_sym = DefnSym::new(id_base + 1, "int64Max");
    let glb_sym = DefnSym::new(id_base + 2, "int64Min");

    root.add_def(Definition {
        sym: leq_sym.clone(),
        formals: formals.clone(),
        body: le(var(&a, int.clone()), var(&b, int.clone())),
        tpe: fun_tpe.clone(),
    });
    root.add_def(Definition {
        sym: lub_sym.clone(),
        formals: formals.clone(),
        body: ite(
            le(var(&a, int.clone()), var(&b, int.clone())),
            var(&b, int.clone()),
            var(&a, int.clone()),
            int.clone(),
        ),
        tpe: fun_tpe.clone(),
    });
    root.add_def(Definition {
        sym: glb_sym.clone(),
        formals,
        body: ite(
            le(var(&a, int.clone()), var(&b, int.clone())),
            var(&a, int.clone()),
            var(&b, int.clone()),
            int.clone(),
        ),
        tpe: fun_tpe.clone(),
    });

    let closure = |defn: &DefnSym| Expr::MkClosureDef {
        defn: defn.clone(),
        free_vars: vec![],
        tpe: fun_tpe.clone(),
        loc: loc(),
    };

    LatticeOps {
        bot: int64(i64::MIN),
        top: int64(i64::MAX),
        leq: closure(&leq_sym),
        lub: closure(&lub_sym),
        glb: closure(&glb_sym),
    }
}

/// A Belnap-style four-point lattice over the enum
/// `Truth { Bot, True, False, Top }`, with the operator bundle written in
/// the IR itself. Definition ids start at `id_base`.
pub struct BelnapLattice {
    pub enum_sym: EnumSym,
    pub tpe: MonoType,
    pub ops: LatticeOps,
}

pub fn belnap_lattice(root: &mut Root, id_base: u32) -> BelnapLattice {
    let enum_sym = EnumSym::new(id_base, "Truth");
    let tpe = MonoType::Enum("Truth".to_string());
    let fun_tpe = MonoType::Arrow(vec![tpe.clone(), tpe.clone()], Box::new(tpe.clone()));

    root.add_enum(EnumDef {
        sym: enum_sym.clone(),
        cases: ["Bot", "True", "False", "Top"]
            .iter()
            .map(|tag| EnumCase {
                tag: (*tag).to_string(),
                tpe: MonoType::Unit,
            })
            .collect(),
    });

    let a = VarSym::new(9100 + id_base, "a", 0);
    let b = VarSym::new(9101 + id_base, "b", 1);
    let formals = vec![
        FormalParam {
            sym: a.clone(),
            tpe: tpe.clone(),
        },
        FormalParam {
            sym: b.clone(),
            tpe: tpe.clone(),
        },
    ];

    let point =
        |tag: &str| mk_tag(&enum_sym, tag, Expr::Unit { loc: loc() }, tpe.clone());
    let va = || var(&a, tpe.clone());
    let vb = || var(&b, tpe.clone());
    let isa = |tag: &str| is_tag(&enum_sym, tag, va());
    let isb = |tag: &str| is_tag(&enum_sym, tag, vb());

    // leq(a, b) = a == Bot || b == Top || (a == True && b == True)
    //          || (a == False && b == False)
    let leq_body = or(
        or(isa("Bot"), isb("Top")),
        or(and(isa("True"), isb("True")), and(isa("False"), isb("False"))),
    );

    // lub(a, b) = if a == Bot then b else if b == Bot then a
    //             else if a == b (pointwise) then a else Top
    let lub_body = ite(
        isa("Bot"),
        vb(),
        ite(
            isb("Bot"),
            va(),
            ite(
                or(and(isa("True"), isb("True")), and(isa("False"), isb("False"))),
                va(),
                point("Top"),
                tpe.clone(),
            ),
            tpe.clone(),
        ),
        tpe.clone(),
    );

    // glb is dual to lub.
    let glb_body = ite(
        isa("Top"),
        vb(),
        ite(
            isb("Top"),
            va(),
            ite(
                or(and(isa("True"), isb("True")), and(isa("False"), isb("False"))),
                va(),
                point("Bot"),
                tpe.clone(),
            ),
            tpe.clone(),
        ),
        tpe.clone(),
    );

    let leq_sym = DefnSym::new(id_base + 1, "truthLeq");
    let lub_sym = DefnSym::new(id_base + 2, "truthLub");
    let glb_sym = DefnSym::new(id_base + 3, "truthGlb");

    root.add_def(Definition {
        sym: leq_sym.clone(),
        formals: formals.clone(),
        body: leq_body,
        tpe: MonoType::Arrow(vec![tpe.clone(), tpe.clone()], Box::new(MonoType::Bool)),
    });
    root.add_def(Definition {
        sym: lub_sym.clone(),
        formals: formals.clone(),
        body: lub_body,
        tpe: fun_tpe.clone(),
    });
    root.add_def(Definition {
        sym: glb_sym.clone(),
        formals,
        body: glb_body,
        tpe: fun_tpe.clone(),
    });

    let closure = |defn: &DefnSym| Expr::MkClosureDef {
        defn: defn.clone(),
        free_vars: vec![],
        tpe: fun_tpe.clone(),
        loc: loc(),
    };

    let ops = LatticeOps {
        bot: point("Bot"),
        top: point("Top"),
        leq: closure(&leq_sym),
        lub: closure(&lub_sym),
        glb: closure(&glb_sym),
    };

    BelnapLattice { enum_sym, tpe, ops }
}

/// A Belnap point as a runtime value.
pub fn truth(tag: &str) -> Value {
    Value::tag(tag, Value::Unit)
}
