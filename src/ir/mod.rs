//! # Simplified IR
//!
//! Expression types for the simplified intermediate representation consumed
//! by the evaluator. The IR is produced upstream (after type checking,
//! lambda lifting, and closure conversion) and arrives fully resolved:
//! every variable occurrence carries its symbol, every expression carries a
//! static type tag and a source location.
//!
//! The type tag drives arithmetic dispatch (`Int32 + Int32` is evaluated
//! with 32-bit wrapping semantics, `BigInt + BigInt` with arbitrary
//! precision); the source location is used only for error reporting.
//!
//! All types derive serde traits, so any self-describing format that
//! preserves variant discriminants and sub-term order can transport a
//! compiled program. See [`crate::import`] for the JSON entry point.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::symbol::{DefnSym, EnumSym, VarSym};

pub mod root;
pub mod stratify;

pub use root::{
    Attribute, BodyPredicate, BodyTerm, Constraint, Definition, EnumCase, EnumDef, HeadPredicate,
    HeadTerm, LatticeOps, Pattern, Polarity, Property, Root, Stratum, Table,
};

// ============================================================================
// Source Locations
// ============================================================================

/// A position in the original source program. Carried on every expression
/// and predicate for error reporting; never inspected during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLoc {
    pub source: String,
    pub line: u32,
    pub col: u32,
}

impl SourceLoc {
    pub fn new(source: impl Into<String>, line: u32, col: u32) -> Self {
        SourceLoc {
            source: source.into(),
            line,
            col,
        }
    }

    /// A location for synthesized expressions with no source counterpart.
    pub fn unknown() -> Self {
        SourceLoc {
            source: "<unknown>".to_string(),
            line: 0,
            col: 0,
        }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.col)
    }
}

// ============================================================================
// Types
// ============================================================================

/// A monomorphic type tag.
///
/// By the time the IR reaches this crate every type variable has been
/// eliminated, so a flat enum suffices. Used as the arithmetic dispatch key
/// and as the lookup key for lattice operator bundles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonoType {
    Unit,
    Bool,
    Char,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    BigInt,
    Str,
    /// A declared enum, by name.
    Enum(String),
    /// An n-ary tuple.
    Tuple(Vec<MonoType>),
    /// A mutable reference cell.
    Ref(Box<MonoType>),
    /// A function type (argument types, result type).
    Arrow(Vec<MonoType>, Box<MonoType>),
    /// An opaque host-level type crossing the native boundary.
    Native(String),
}

impl MonoType {
    /// Whether this is one of the fixed-width integer types.
    pub fn is_fixed_int(&self) -> bool {
        matches!(
            self,
            MonoType::Int8 | MonoType::Int16 | MonoType::Int32 | MonoType::Int64
        )
    }

    /// Whether values of this type participate in arithmetic.
    pub fn is_numeric(&self) -> bool {
        self.is_fixed_int()
            || matches!(self, MonoType::BigInt | MonoType::Float32 | MonoType::Float64)
    }
}

impl fmt::Display for MonoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonoType::Unit => write!(f, "Unit"),
            MonoType::Bool => write!(f, "Bool"),
            MonoType::Char => write!(f, "Char"),
            MonoType::Float32 => write!(f, "Float32"),
            MonoType::Float64 => write!(f, "Float64"),
            MonoType::Int8 => write!(f, "Int8"),
            MonoType::Int16 => write!(f, "Int16"),
            MonoType::Int32 => write!(f, "Int32"),
            MonoType::Int64 => write!(f, "Int64"),
            MonoType::BigInt => write!(f, "BigInt"),
            MonoType::Str => write!(f, "Str"),
            MonoType::Enum(name) => write!(f, "{name}"),
            MonoType::Tuple(elms) => {
                write!(f, "(")?;
                for (i, t) in elms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
            MonoType::Ref(t) => write!(f, "Ref[{t}]"),
            MonoType::Arrow(args, ret) => {
                write!(f, "(")?;
                for (i, t) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ") -> {ret}")
            }
            MonoType::Native(name) => write!(f, "Native[{name}]"),
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Boolean negation.
    LogicalNot,
    /// Numeric identity.
    Plus,
    /// Numeric negation.
    Minus,
    /// Bitwise complement on integer types.
    BitwiseNegate,
}

/// Binary operators, in four classes: arithmetic, comparison, logical, and
/// bitwise. The evaluator dispatches on the class first and on the static
/// type tag of the left operand second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
    Exponentiate,
    // Comparison
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    // Logical (short-circuit)
    LogicalAnd,
    LogicalOr,
    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseLeftShift,
    BitwiseRightShift,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Plus
                | BinaryOp::Minus
                | BinaryOp::Times
                | BinaryOp::Divide
                | BinaryOp::Modulo
                | BinaryOp::Exponentiate
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            BinaryOp::BitwiseAnd
                | BinaryOp::BitwiseOr
                | BinaryOp::BitwiseXor
                | BinaryOp::BitwiseLeftShift
                | BinaryOp::BitwiseRightShift
        )
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// A formal parameter of a definition or quantifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormalParam {
    pub sym: VarSym,
    pub tpe: MonoType,
}

/// An expression of the simplified IR.
///
/// The tree is immutable once constructed. Every variant carries a source
/// location; variants whose type is not implied by the variant itself also
/// carry a static type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    // --- Literals ---
    Unit {
        loc: SourceLoc,
    },
    True {
        loc: SourceLoc,
    },
    False {
        loc: SourceLoc,
    },
    Char {
        lit: char,
        loc: SourceLoc,
    },
    Float32 {
        lit: f32,
        loc: SourceLoc,
    },
    Float64 {
        lit: f64,
        loc: SourceLoc,
    },
    Int8 {
        lit: i8,
        loc: SourceLoc,
    },
    Int16 {
        lit: i16,
        loc: SourceLoc,
    },
    Int32 {
        lit: i32,
        loc: SourceLoc,
    },
    Int64 {
        lit: i64,
        loc: SourceLoc,
    },
    BigInt {
        lit: BigInt,
        loc: SourceLoc,
    },
    Str {
        lit: String,
        loc: SourceLoc,
    },

    // --- Variables and definitions ---
    /// A variable occurrence, resolved in the runtime environment.
    Var {
        sym: VarSym,
        tpe: MonoType,
        loc: SourceLoc,
    },
    /// A direct reference to a zero-argument specialization: evaluates the
    /// definition body in the current environment. Ordinary calls go
    /// through [`Expr::ApplyDef`].
    Def {
        sym: DefnSym,
        tpe: MonoType,
        loc: SourceLoc,
    },

    // --- Closures and application ---
    /// Allocate a closure over `defn` with one capture slot per listed
    /// free variable. Slots for variables absent from the environment are
    /// left empty and back-patched by the enclosing [`Expr::LetRec`].
    MkClosureDef {
        defn: DefnSym,
        free_vars: Vec<VarSym>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    /// First-order call of a definition.
    ApplyDef {
        defn: DefnSym,
        args: Vec<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    /// Same semantics as `ApplyDef`; the variant marks a call in tail
    /// position so upstream tooling round-trips, and changes no observable
    /// behavior here.
    ApplyTail {
        defn: DefnSym,
        args: Vec<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    /// Call of a host-provided hook registered in the linker.
    ApplyHook {
        hook: DefnSym,
        args: Vec<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    /// Call of a first-class closure value.
    ApplyClosure {
        exp: Box<Expr>,
        args: Vec<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },

    // --- Operators ---
    Unary {
        op: UnaryOp,
        exp: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    Binary {
        op: BinaryOp,
        exp1: Box<Expr>,
        exp2: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },

    // --- Control flow and binding ---
    IfThenElse {
        exp1: Box<Expr>,
        exp2: Box<Expr>,
        exp3: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    Let {
        sym: VarSym,
        exp1: Box<Expr>,
        exp2: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    /// Recursive let. `exp1` must be a `MkClosureDef`; after allocation the
    /// closure is written into its own capture slot at `sym`'s stack
    /// offset, enabling direct recursion without a runtime cycle.
    LetRec {
        sym: VarSym,
        exp1: Box<Expr>,
        exp2: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },

    // --- Tags and tuples ---
    /// Test whether `exp` evaluates to a tag value with the given tag name.
    Is {
        sym: EnumSym,
        tag: String,
        exp: Box<Expr>,
        loc: SourceLoc,
    },
    /// Construct a tag value.
    Tag {
        sym: EnumSym,
        tag: String,
        exp: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    /// Extract the payload of a tag value with the given tag name.
    Untag {
        sym: EnumSym,
        tag: String,
        exp: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    /// Project a tuple element. Offsets are bounds-checked upstream.
    Index {
        base: Box<Expr>,
        offset: usize,
        tpe: MonoType,
        loc: SourceLoc,
    },
    Tuple {
        elms: Vec<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },

    // --- Reference cells ---
    Ref {
        exp: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    Deref {
        exp: Box<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    Assign {
        exp1: Box<Expr>,
        exp2: Box<Expr>,
        loc: SourceLoc,
    },

    // --- Quantifiers (illegal at run time) ---
    Existential {
        params: Vec<FormalParam>,
        exp: Box<Expr>,
        loc: SourceLoc,
    },
    Universal {
        params: Vec<FormalParam>,
        exp: Box<Expr>,
        loc: SourceLoc,
    },

    // --- Native boundary ---
    NativeConstructor {
        name: String,
        args: Vec<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },
    NativeField {
        name: String,
        tpe: MonoType,
        loc: SourceLoc,
    },
    NativeMethod {
        name: String,
        args: Vec<Expr>,
        tpe: MonoType,
        loc: SourceLoc,
    },

    // --- Unconditional failures ---
    UserError {
        tpe: MonoType,
        loc: SourceLoc,
    },
    MatchError {
        tpe: MonoType,
        loc: SourceLoc,
    },
    SwitchError {
        tpe: MonoType,
        loc: SourceLoc,
    },
}

impl Expr {
    /// The static type tag of this expression.
    pub fn tpe(&self) -> MonoType {
        match self {
            Expr::Unit { .. } => MonoType::Unit,
            Expr::True { .. } | Expr::False { .. } | Expr::Is { .. } => MonoType::Bool,
            Expr::Char { .. } => MonoType::Char,
            Expr::Float32 { .. } => MonoType::Float32,
            Expr::Float64 { .. } => MonoType::Float64,
            Expr::Int8 { .. } => MonoType::Int8,
            Expr::Int16 { .. } => MonoType::Int16,
            Expr::Int32 { .. } => MonoType::Int32,
            Expr::Int64 { .. } => MonoType::Int64,
            Expr::BigInt { .. } => MonoType::BigInt,
            Expr::Str { .. } => MonoType::Str,
            Expr::Assign { .. } => MonoType::Unit,
            Expr::Existential { .. } | Expr::Universal { .. } => MonoType::Bool,
            Expr::Var { tpe, .. }
            | Expr::Def { tpe, .. }
            | Expr::MkClosureDef { tpe, .. }
            | Expr::ApplyDef { tpe, .. }
            | Expr::ApplyTail { tpe, .. }
            | Expr::ApplyHook { tpe, .. }
            | Expr::ApplyClosure { tpe, .. }
            | Expr::Unary { tpe, .. }
            | Expr::Binary { tpe, .. }
            | Expr::IfThenElse { tpe, .. }
            | Expr::Let { tpe, .. }
            | Expr::LetRec { tpe, .. }
            | Expr::Tag { tpe, .. }
            | Expr::Untag { tpe, .. }
            | Expr::Index { tpe, .. }
            | Expr::Tuple { tpe, .. }
            | Expr::Ref { tpe, .. }
            | Expr::Deref { tpe, .. }
            | Expr::NativeConstructor { tpe, .. }
            | Expr::NativeField { tpe, .. }
            | Expr::NativeMethod { tpe, .. }
            | Expr::UserError { tpe, .. }
            | Expr::MatchError { tpe, .. }
            | Expr::SwitchError { tpe, .. } => tpe.clone(),
        }
    }

    /// The source location of this expression.
    pub fn loc(&self) -> &SourceLoc {
        match self {
            Expr::Unit { loc }
            | Expr::True { loc }
            | Expr::False { loc }
            | Expr::Char { loc, .. }
            | Expr::Float32 { loc, .. }
            | Expr::Float64 { loc, .. }
            | Expr::Int8 { loc, .. }
            | Expr::Int16 { loc, .. }
            | Expr::Int32 { loc, .. }
            | Expr::Int64 { loc, .. }
            | Expr::BigInt { loc, .. }
            | Expr::Str { loc, .. }
            | Expr::Var { loc, .. }
            | Expr::Def { loc, .. }
            | Expr::MkClosureDef { loc, .. }
            | Expr::ApplyDef { loc, .. }
            | Expr::ApplyTail { loc, .. }
            | Expr::ApplyHook { loc, .. }
            | Expr::ApplyClosure { loc, .. }
            | Expr::Unary { loc, .. }
            | Expr::Binary { loc, .. }
            | Expr::IfThenElse { loc, .. }
            | Expr::Let { loc, .. }
            | Expr::LetRec { loc, .. }
            | Expr::Is { loc, .. }
            | Expr::Tag { loc, .. }
            | Expr::Untag { loc, .. }
            | Expr::Index { loc, .. }
            | Expr::Tuple { loc, .. }
            | Expr::Ref { loc, .. }
            | Expr::Deref { loc, .. }
            | Expr::Assign { loc, .. }
            | Expr::Existential { loc, .. }
            | Expr::Universal { loc, .. }
            | Expr::NativeConstructor { loc, .. }
            | Expr::NativeField { loc, .. }
            | Expr::NativeMethod { loc, .. }
            | Expr::UserError { loc, .. }
            | Expr::MatchError { loc, .. }
            | Expr::SwitchError { loc, .. } => loc,
        }
    }

    /// Whether this expression is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Unit { .. }
                | Expr::True { .. }
                | Expr::False { .. }
                | Expr::Char { .. }
                | Expr::Float32 { .. }
                | Expr::Float64 { .. }
                | Expr::Int8 { .. }
                | Expr::Int16 { .. }
                | Expr::Int32 { .. }
                | Expr::Int64 { .. }
                | Expr::BigInt { .. }
                | Expr::Str { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLoc {
        SourceLoc::new("test.src", 1, 1)
    }

    #[test]
    fn test_literal_types_are_implied() {
        assert_eq!(Expr::True { loc: loc() }.tpe(), MonoType::Bool);
        assert_eq!(Expr::Int32 { lit: 5, loc: loc() }.tpe(), MonoType::Int32);
        assert_eq!(
            Expr::Str {
                lit: "a".to_string(),
                loc: loc()
            }
            .tpe(),
            MonoType::Str
        );
    }

    #[test]
    fn test_operator_classes_are_disjoint() {
        let ops = [
            BinaryOp::Plus,
            BinaryOp::Less,
            BinaryOp::Equal,
            BinaryOp::LogicalAnd,
            BinaryOp::BitwiseXor,
            BinaryOp::BitwiseLeftShift,
        ];
        for op in ops {
            let classes = [
                op.is_arithmetic(),
                op.is_comparison(),
                op.is_logical(),
                op.is_bitwise(),
            ];
            assert_eq!(classes.iter().filter(|c| **c).count(), 1, "{op:?}");
        }
    }

    #[test]
    fn test_source_loc_display() {
        assert_eq!(loc().to_string(), "test.src:1:1");
        assert_eq!(SourceLoc::unknown().to_string(), "<unknown>:0:0");
    }

    #[test]
    fn test_expr_round_trips_through_json() {
        let exp = Expr::Binary {
            op: BinaryOp::Plus,
            exp1: Box::new(Expr::Int32 { lit: 2, loc: loc() }),
            exp2: Box::new(Expr::Int32 { lit: 3, loc: loc() }),
            tpe: MonoType::Int32,
            loc: loc(),
        };
        let json = serde_json::to_string(&exp).expect("serialize");
        let back: Expr = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, exp);
    }
}
