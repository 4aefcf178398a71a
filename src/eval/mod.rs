//! # Expression Evaluator
//!
//! A recursive tree interpreter for the simplified IR. Evaluation is pure
//! except for box cells and host calls; recursion depth is bounded by
//! source nesting. The solver calls back into this module for filter
//! bodies, head-term applications, and lattice operator bundles.
//!
//! Arithmetic on the fixed-width integer types uses two's-complement
//! wrapping semantics; division and modulo by zero fail with an arithmetic
//! error, floats follow IEEE-754. Exponentiation goes through a generic
//! power function and rounds back to the integer width when applicable.
//!
//! All failures are immediate; there is no recovery inside the evaluator.

use num_bigint::BigInt;
use num_traits::{One, Pow, ToPrimitive, Zero};
use std::sync::Arc;

use crate::env::{Environment, Linker};
use crate::error::{Error, Result};
use crate::ir::{BinaryOp, Definition, Expr, Root, SourceLoc, UnaryOp};
use crate::symbol::DefnSym;
use crate::value::{BoxValue, ClosureValue, Value};

/// Shared evaluation context: the program root and the host linker.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub root: &'a Root,
    pub linker: &'a Linker,
}

impl<'a> EvalContext<'a> {
    pub fn new(root: &'a Root, linker: &'a Linker) -> Self {
        EvalContext { root, linker }
    }

    /// Evaluate an expression to a value under an environment.
    pub fn eval(&self, exp: &Expr, env: &Environment) -> Result<Value> {
        match exp {
            // --- Literals ---
            Expr::Unit { .. } => Ok(Value::Unit),
            Expr::True { .. } => Ok(Value::Bool(true)),
            Expr::False { .. } => Ok(Value::Bool(false)),
            Expr::Char { lit, .. } => Ok(Value::Char(*lit)),
            Expr::Float32 { lit, .. } => Ok(Value::Float32(*lit)),
            Expr::Float64 { lit, .. } => Ok(Value::Float64(*lit)),
            Expr::Int8 { lit, .. } => Ok(Value::Int8(*lit)),
            Expr::Int16 { lit, .. } => Ok(Value::Int16(*lit)),
            Expr::Int32 { lit, .. } => Ok(Value::Int32(*lit)),
            Expr::Int64 { lit, .. } => Ok(Value::Int64(*lit)),
            Expr::BigInt { lit, .. } => Ok(Value::BigInt(lit.clone())),
            Expr::Str { lit, .. } => Ok(Value::string(lit)),

            // --- Variables and definitions ---
            Expr::Var { sym, loc, .. } => env.get(sym).cloned().ok_or_else(|| {
                Error::UnboundVariable {
                    name: sym.text.clone(),
                    loc: loc.clone(),
                }
            }),
            Expr::Def { sym, loc, .. } => {
                let def = self.def(sym, loc)?;
                self.eval(&def.body, env)
            }

            // --- Closures and application ---
            Expr::MkClosureDef {
                defn, free_vars, ..
            } => {
                let captures = free_vars.iter().map(|fv| env.get(fv).cloned()).collect();
                Ok(Value::Closure(Arc::new(ClosureValue::new(
                    defn.clone(),
                    captures,
                ))))
            }
            Expr::ApplyDef {
                defn, args, loc, ..
            }
            | Expr::ApplyTail {
                defn, args, loc, ..
            } => {
                let argv = self.eval_all(args, env)?;
                self.invoke(defn, argv, loc)
            }
            Expr::ApplyHook {
                hook, args, loc, ..
            } => {
                let argv = self.eval_all(args, env)?;
                let f = self.linker.hook(hook).ok_or_else(|| Error::Host {
                    message: format!("{loc}: no hook registered for '{hook}'"),
                })?;
                f(&argv).map_err(|message| Error::Host { message })
            }
            Expr::ApplyClosure { exp, args, loc, .. } => {
                let fun = self.eval(exp, env)?;
                let argv = self.eval_all(args, env)?;
                self.apply(&fun, &argv, loc)
            }

            // --- Operators ---
            Expr::Unary { op, exp, loc, .. } => {
                let v = self.eval(exp, env)?;
                self.eval_unary(*op, v, loc)
            }
            Expr::Binary {
                op,
                exp1,
                exp2,
                loc,
                ..
            } => {
                if op.is_logical() {
                    return self.eval_logical(*op, exp1, exp2, env, loc);
                }
                let v1 = self.eval(exp1, env)?;
                let v2 = self.eval(exp2, env)?;
                if op.is_arithmetic() {
                    self.eval_arithmetic(*op, v1, v2, loc)
                } else if op.is_comparison() {
                    self.eval_comparison(*op, v1, v2, loc)
                } else {
                    self.eval_bitwise(*op, v1, v2, loc)
                }
            }

            // --- Control flow and binding ---
            Expr::IfThenElse {
                exp1,
                exp2,
                exp3,
                loc,
                ..
            } => {
                let cond = self.eval(exp1, env)?;
                match cond.as_bool() {
                    Some(true) => self.eval(exp2, env),
                    Some(false) => self.eval(exp3, env),
                    None => Err(self.mismatch("bool", &cond, loc)),
                }
            }
            Expr::Let {
                sym, exp1, exp2, ..
            } => {
                let v1 = self.eval(exp1, env)?;
                self.eval(exp2, &env.extended(sym.clone(), v1))
            }
            Expr::LetRec {
                sym,
                exp1,
                exp2,
                loc,
                ..
            } => {
                let Expr::MkClosureDef {
                    defn, free_vars, ..
                } = &**exp1
                else {
                    return Err(Error::TypeMismatch {
                        expected: "closure allocation".to_string(),
                        found: "other expression".to_string(),
                        loc: loc.clone(),
                    });
                };
                let captures = free_vars.iter().map(|fv| env.get(fv).cloned()).collect();
                let clo = Arc::new(ClosureValue::new(defn.clone(), captures));
                // Write the closure into its own capture slot so the body
                // can call itself through the capture.
                clo.fill_capture(sym.offset, Value::Closure(clo.clone()));
                self.eval(exp2, &env.extended(sym.clone(), Value::Closure(clo)))
            }

            // --- Tags and tuples ---
            Expr::Is { tag, exp, loc, .. } => {
                let v = self.eval(exp, env)?;
                let tv = v.as_tag().ok_or_else(|| self.mismatch("tag", &v, loc))?;
                Ok(Value::Bool(tv.name == *tag))
            }
            Expr::Tag { tag, exp, .. } => {
                let v = self.eval(exp, env)?;
                Ok(Value::tag(tag.clone(), v))
            }
            Expr::Untag { tag, exp, loc, .. } => {
                let v = self.eval(exp, env)?;
                let tv = v.as_tag().ok_or_else(|| self.mismatch("tag", &v, loc))?;
                if tv.name == *tag {
                    Ok(tv.payload.clone())
                } else {
                    Err(Error::TypeMismatch {
                        expected: format!("tag '{tag}'"),
                        found: format!("tag '{}'", tv.name),
                        loc: loc.clone(),
                    })
                }
            }
            Expr::Index {
                base, offset, loc, ..
            } => {
                let v = self.eval(base, env)?;
                let elms = v.as_tuple().ok_or_else(|| self.mismatch("tuple", &v, loc))?;
                elms.get(*offset).cloned().ok_or_else(|| Error::TypeMismatch {
                    expected: format!("tuple of arity > {offset}"),
                    found: format!("tuple of arity {}", elms.len()),
                    loc: loc.clone(),
                })
            }
            Expr::Tuple { elms, .. } => Ok(Value::tuple(self.eval_all(elms, env)?)),

            // --- Reference cells ---
            Expr::Ref { exp, .. } => {
                let v = self.eval(exp, env)?;
                Ok(Value::Box(BoxValue::new(v)))
            }
            Expr::Deref { exp, loc, .. } => {
                let v = self.eval(exp, env)?;
                let cell = v.as_box().ok_or_else(|| self.mismatch("box", &v, loc))?;
                Ok(cell.get())
            }
            Expr::Assign { exp1, exp2, loc } => {
                let v1 = self.eval(exp1, env)?;
                let cell = v1.as_box().ok_or_else(|| self.mismatch("box", &v1, loc))?;
                let v2 = self.eval(exp2, env)?;
                cell.set(v2);
                Ok(Value::Unit)
            }

            // --- Quantifiers are eliminated upstream ---
            Expr::Existential { loc, .. } | Expr::Universal { loc, .. } => {
                Err(Error::TypeMismatch {
                    expected: "simplified expression".to_string(),
                    found: "quantifier".to_string(),
                    loc: loc.clone(),
                })
            }

            // --- Native boundary ---
            Expr::NativeConstructor {
                name, args, loc, ..
            }
            | Expr::NativeMethod {
                name, args, loc, ..
            } => {
                let argv = self.eval_all(args, env)?;
                self.call_native(name, &argv, loc)
            }
            Expr::NativeField { name, loc, .. } => self.call_native(name, &[], loc),

            // --- Unconditional failures ---
            Expr::UserError { loc, .. } => Err(Error::User { loc: loc.clone() }),
            Expr::MatchError { loc, .. } => Err(Error::NonExhaustiveMatch { loc: loc.clone() }),
            Expr::SwitchError { loc, .. } => Err(Error::NonExhaustiveSwitch { loc: loc.clone() }),
        }
    }

    /// Invoke a definition with an argument vector, resolving host hooks
    /// first.
    pub fn invoke(&self, defn: &DefnSym, args: Vec<Value>, loc: &SourceLoc) -> Result<Value> {
        if let Some(hook) = self.linker.hook(defn) {
            return hook(&args).map_err(|message| Error::Host { message });
        }
        let def = self.def(defn, loc)?;
        if def.arity() != args.len() {
            return Err(Error::TypeMismatch {
                expected: format!("{} arguments for '{defn}'", def.arity()),
                found: format!("{} arguments", args.len()),
                loc: loc.clone(),
            });
        }
        let env = Environment::of(
            def.formals
                .iter()
                .map(|f| f.sym.clone())
                .zip(args),
        );
        self.eval(&def.body, &env)
    }

    /// Apply a first-class function value: bind the callee's leading
    /// formals to the closure captures and the rest to the arguments.
    pub fn apply(&self, fun: &Value, args: &[Value], loc: &SourceLoc) -> Result<Value> {
        let clo = fun
            .as_closure()
            .ok_or_else(|| self.mismatch("closure", fun, loc))?;
        let def = self.def(&clo.defn, loc)?;
        let captured = clo.capture_count();
        if def.arity() != captured + args.len() {
            return Err(Error::TypeMismatch {
                expected: format!(
                    "{} arguments for closure '{}' with {captured} captures",
                    def.arity(),
                    clo.defn
                ),
                found: format!("{} arguments", args.len()),
                loc: loc.clone(),
            });
        }
        let mut env = Environment::new();
        for (index, formal) in def.formals[..captured].iter().enumerate() {
            let value = clo.capture(index).ok_or_else(|| Error::UnboundVariable {
                name: formal.sym.text.clone(),
                loc: loc.clone(),
            })?;
            env.bind(formal.sym.clone(), value);
        }
        for (formal, value) in def.formals[captured..].iter().zip(args) {
            env.bind(formal.sym.clone(), value.clone());
        }
        self.eval(&def.body, &env)
    }

    fn eval_all(&self, exps: &[Expr], env: &Environment) -> Result<Vec<Value>> {
        exps.iter().map(|e| self.eval(e, env)).collect()
    }

    fn def(&self, sym: &DefnSym, loc: &SourceLoc) -> Result<&'a Definition> {
        self.root.def(sym).ok_or_else(|| Error::UnboundVariable {
            name: sym.text.clone(),
            loc: loc.clone(),
        })
    }

    fn call_native(&self, name: &str, args: &[Value], loc: &SourceLoc) -> Result<Value> {
        let f = self.linker.native(name).ok_or_else(|| Error::Host {
            message: format!("{loc}: no native member registered for '{name}'"),
        })?;
        f(args).map_err(|message| Error::Host { message })
    }

    fn mismatch(&self, expected: &str, found: &Value, loc: &SourceLoc) -> Error {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.kind().to_string(),
            loc: loc.clone(),
        }
    }

    fn eval_unary(&self, op: UnaryOp, v: Value, loc: &SourceLoc) -> Result<Value> {
        match op {
            UnaryOp::LogicalNot => match v.as_bool() {
                Some(b) => Ok(Value::Bool(!b)),
                None => Err(self.mismatch("bool", &v, loc)),
            },
            UnaryOp::Plus => Ok(v),
            UnaryOp::Minus => match v {
                Value::Int8(a) => Ok(Value::Int8(a.wrapping_neg())),
                Value::Int16(a) => Ok(Value::Int16(a.wrapping_neg())),
                Value::Int32(a) => Ok(Value::Int32(a.wrapping_neg())),
                Value::Int64(a) => Ok(Value::Int64(a.wrapping_neg())),
                Value::BigInt(a) => Ok(Value::BigInt(-a)),
                Value::Float32(a) => Ok(Value::Float32(-a)),
                Value::Float64(a) => Ok(Value::Float64(-a)),
                other => Err(self.mismatch("numeric operand", &other, loc)),
            },
            UnaryOp::BitwiseNegate => match v {
                Value::Int8(a) => Ok(Value::Int8(!a)),
                Value::Int16(a) => Ok(Value::Int16(!a)),
                Value::Int32(a) => Ok(Value::Int32(!a)),
                Value::Int64(a) => Ok(Value::Int64(!a)),
                // Two's complement: !x == -x - 1.
                Value::BigInt(a) => Ok(Value::BigInt(-(a + BigInt::one()))),
                other => Err(self.mismatch("integer operand", &other, loc)),
            },
        }
    }

    fn eval_logical(
        &self,
        op: BinaryOp,
        exp1: &Expr,
        exp2: &Expr,
        env: &Environment,
        loc: &SourceLoc,
    ) -> Result<Value> {
        let v1 = self.eval(exp1, env)?;
        let b1 = v1
            .as_bool()
            .ok_or_else(|| self.mismatch("bool", &v1, loc))?;
        // Short-circuit: only evaluate the second operand when the first
        // does not determine the result.
        match (op, b1) {
            (BinaryOp::LogicalAnd, false) => Ok(Value::Bool(false)),
            (BinaryOp::LogicalOr, true) => Ok(Value::Bool(true)),
            _ => {
                let v2 = self.eval(exp2, env)?;
                let b2 = v2
                    .as_bool()
                    .ok_or_else(|| self.mismatch("bool", &v2, loc))?;
                Ok(Value::Bool(b2))
            }
        }
    }

    fn eval_arithmetic(&self, op: BinaryOp, v1: Value, v2: Value, loc: &SourceLoc) -> Result<Value> {
        macro_rules! fixed {
            ($variant:ident, $ty:ty, $a:expr, $b:expr) => {{
                let (a, b): ($ty, $ty) = ($a, $b);
                match op {
                    BinaryOp::Plus => Value::$variant(a.wrapping_add(b)),
                    BinaryOp::Minus => Value::$variant(a.wrapping_sub(b)),
                    BinaryOp::Times => Value::$variant(a.wrapping_mul(b)),
                    BinaryOp::Divide => {
                        if b == 0 {
                            return Err(Error::Arithmetic { loc: loc.clone() });
                        }
                        Value::$variant(a.wrapping_div(b))
                    }
                    BinaryOp::Modulo => {
                        if b == 0 {
                            return Err(Error::Arithmetic { loc: loc.clone() });
                        }
                        Value::$variant(a.wrapping_rem(b))
                    }
                    BinaryOp::Exponentiate => {
                        Value::$variant(((a as f64).powf(b as f64)) as $ty)
                    }
                    _ => return Err(self.mismatch("arithmetic operator", &v1, loc)),
                }
            }};
        }
        macro_rules! float {
            ($variant:ident, $a:expr, $b:expr) => {{
                let (a, b) = ($a, $b);
                match op {
                    BinaryOp::Plus => Value::$variant(a + b),
                    BinaryOp::Minus => Value::$variant(a - b),
                    BinaryOp::Times => Value::$variant(a * b),
                    BinaryOp::Divide => Value::$variant(a / b),
                    BinaryOp::Modulo => Value::$variant(a % b),
                    BinaryOp::Exponentiate => Value::$variant(a.powf(b)),
                    _ => return Err(self.mismatch("arithmetic operator", &v1, loc)),
                }
            }};
        }

        let out = match (&v1, &v2) {
            (Value::Int8(a), Value::Int8(b)) => fixed!(Int8, i8, *a, *b),
            (Value::Int16(a), Value::Int16(b)) => fixed!(Int16, i16, *a, *b),
            (Value::Int32(a), Value::Int32(b)) => fixed!(Int32, i32, *a, *b),
            (Value::Int64(a), Value::Int64(b)) => fixed!(Int64, i64, *a, *b),
            (Value::Float32(a), Value::Float32(b)) => float!(Float32, *a, *b),
            (Value::Float64(a), Value::Float64(b)) => float!(Float64, *a, *b),
            (Value::BigInt(a), Value::BigInt(b)) => match op {
                BinaryOp::Plus => Value::BigInt(a + b),
                BinaryOp::Minus => Value::BigInt(a - b),
                BinaryOp::Times => Value::BigInt(a * b),
                BinaryOp::Divide => {
                    if b.is_zero() {
                        return Err(Error::Arithmetic { loc: loc.clone() });
                    }
                    Value::BigInt(a / b)
                }
                BinaryOp::Modulo => {
                    if b.is_zero() {
                        return Err(Error::Arithmetic { loc: loc.clone() });
                    }
                    Value::BigInt(a % b)
                }
                BinaryOp::Exponentiate => {
                    let exp = b
                        .to_u32()
                        .ok_or(Error::Arithmetic { loc: loc.clone() })?;
                    Value::BigInt(Pow::pow(a, exp))
                }
                _ => return Err(self.mismatch("arithmetic operator", &v1, loc)),
            },
            _ => {
                return Err(Error::TypeMismatch {
                    expected: "matching numeric operands".to_string(),
                    found: format!("{} and {}", v1.kind(), v2.kind()),
                    loc: loc.clone(),
                })
            }
        };
        Ok(out)
    }

    fn eval_comparison(&self, op: BinaryOp, v1: Value, v2: Value, loc: &SourceLoc) -> Result<Value> {
        if op == BinaryOp::Equal {
            return Ok(Value::Bool(v1 == v2));
        }
        if op == BinaryOp::NotEqual {
            return Ok(Value::Bool(v1 != v2));
        }

        macro_rules! ordered {
            ($a:expr, $b:expr) => {{
                let (a, b) = ($a, $b);
                match op {
                    BinaryOp::Less => a < b,
                    BinaryOp::LessEqual => a <= b,
                    BinaryOp::Greater => a > b,
                    BinaryOp::GreaterEqual => a >= b,
                    _ => return Err(self.mismatch("comparison operator", &v1, loc)),
                }
            }};
        }

        let out = match (&v1, &v2) {
            (Value::Char(a), Value::Char(b)) => ordered!(a, b),
            (Value::Int8(a), Value::Int8(b)) => ordered!(a, b),
            (Value::Int16(a), Value::Int16(b)) => ordered!(a, b),
            (Value::Int32(a), Value::Int32(b)) => ordered!(a, b),
            (Value::Int64(a), Value::Int64(b)) => ordered!(a, b),
            (Value::BigInt(a), Value::BigInt(b)) => ordered!(a, b),
            (Value::Float32(a), Value::Float32(b)) => ordered!(a, b),
            (Value::Float64(a), Value::Float64(b)) => ordered!(a, b),
            _ => {
                return Err(Error::TypeMismatch {
                    expected: "matching ordered operands".to_string(),
                    found: format!("{} and {}", v1.kind(), v2.kind()),
                    loc: loc.clone(),
                })
            }
        };
        Ok(Value::Bool(out))
    }

    fn eval_bitwise(&self, op: BinaryOp, v1: Value, v2: Value, loc: &SourceLoc) -> Result<Value> {
        macro_rules! fixed {
            ($variant:ident, $a:expr, $b:expr) => {{
                let (a, b) = ($a, $b);
                match op {
                    BinaryOp::BitwiseAnd => Value::$variant(a & b),
                    BinaryOp::BitwiseOr => Value::$variant(a | b),
                    BinaryOp::BitwiseXor => Value::$variant(a ^ b),
                    // Shift counts are masked to the operand width;
                    // right shift sign-extends on these signed types.
                    BinaryOp::BitwiseLeftShift => Value::$variant(a.wrapping_shl(b as u32)),
                    BinaryOp::BitwiseRightShift => Value::$variant(a.wrapping_shr(b as u32)),
                    _ => return Err(self.mismatch("bitwise operator", &v1, loc)),
                }
            }};
        }

        let out = match (&v1, &v2) {
            (Value::Int8(a), Value::Int8(b)) => fixed!(Int8, *a, *b),
            (Value::Int16(a), Value::Int16(b)) => fixed!(Int16, *a, *b),
            (Value::Int32(a), Value::Int32(b)) => fixed!(Int32, *a, *b),
            (Value::Int64(a), Value::Int64(b)) => fixed!(Int64, *a, *b),
            (Value::BigInt(a), Value::BigInt(b)) => match op {
                BinaryOp::BitwiseAnd => Value::BigInt(a & b),
                BinaryOp::BitwiseOr => Value::BigInt(a | b),
                BinaryOp::BitwiseXor => Value::BigInt(a ^ b),
                BinaryOp::BitwiseLeftShift | BinaryOp::BitwiseRightShift => {
                    let shift = b
                        .to_usize()
                        .ok_or(Error::Arithmetic { loc: loc.clone() })?;
                    if op == BinaryOp::BitwiseLeftShift {
                        Value::BigInt(a << shift)
                    } else {
                        Value::BigInt(a >> shift)
                    }
                }
                _ => return Err(self.mismatch("bitwise operator", &v1, loc)),
            },
            _ => {
                return Err(Error::TypeMismatch {
                    expected: "matching integer operands".to_string(),
                    found: format!("{} and {}", v1.kind(), v2.kind()),
                    loc: loc.clone(),
                })
            }
        };
        Ok(out)
    }
}
