//! # Runtime Values
//!
//! Tagged runtime values produced by the expression evaluator and stored in
//! the fact database: primitives, strings, big integers, tags, tuples,
//! closures, and boxes (one-cell mutable containers implementing reference
//! semantics).
//!
//! Values are immutable except for box contents and closure capture slots;
//! shared internals use `Arc`, so `Value` is `Send + Sync` and cheap to
//! clone.
//!
//! ## Equality
//!
//! Equality is structural deep equality with two identity-sensitive
//! exceptions:
//!
//! - Boxes compare by cell identity (two boxes holding equal contents are
//!   distinct cells). This also keeps equality well-defined on cyclic
//!   value graphs.
//! - Closures compare by definition symbol plus element-wise capture
//!   equality; two behaviorally identical closures from different
//!   definitions compare unequal.
//!
//! Floats compare by bit pattern so that `Eq`, `Hash`, and set membership
//! agree (`NaN == NaN`; `0.0 != -0.0` at rest in the stores). Ordering
//! comparisons in the evaluator use IEEE semantics instead.

use num_bigint::BigInt;
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::symbol::DefnSym;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Char(char),
    Float32(f32),
    Float64(f64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    BigInt(BigInt),
    Str(Arc<str>),
    Tag(Arc<TagValue>),
    Tuple(Arc<[Value]>),
    Closure(Arc<ClosureValue>),
    Box(BoxValue),
}

/// A named discriminant of an enum, carrying exactly one payload value.
#[derive(Debug, Clone, PartialEq)]
pub struct TagValue {
    pub name: String,
    pub payload: Value,
}

/// A one-cell mutable container. Cloning shares the cell.
#[derive(Debug, Clone)]
pub struct BoxValue(Arc<Mutex<Value>>);

impl BoxValue {
    pub fn new(value: Value) -> Self {
        BoxValue(Arc::new(Mutex::new(value)))
    }

    /// Read the current cell content.
    pub fn get(&self) -> Value {
        self.0.lock().clone()
    }

    /// Overwrite the cell content.
    pub fn set(&self, value: Value) {
        *self.0.lock() = value;
    }

    /// Whether two boxes are the same cell.
    pub fn same_cell(&self, other: &BoxValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A capture slot of a closure. Slots start empty when the captured
/// variable is not yet in scope and are written exactly once, either at
/// allocation or by LetRec back-patching.
pub struct CaptureCell(Mutex<Option<Value>>);

impl CaptureCell {
    fn new(value: Option<Value>) -> Self {
        CaptureCell(Mutex::new(value))
    }

    /// The slot content, if filled.
    pub fn get(&self) -> Option<Value> {
        self.0.lock().clone()
    }

    fn fill(&self, value: Value) {
        *self.0.lock() = Some(value);
    }
}

impl Clone for CaptureCell {
    fn clone(&self) -> Self {
        CaptureCell(Mutex::new(self.0.lock().clone()))
    }
}

impl fmt::Debug for CaptureCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.lock() {
            Some(v) => write!(f, "CaptureCell({v:?})"),
            None => write!(f, "CaptureCell(<empty>)"),
        }
    }
}

/// A closure: the symbol of the lifted definition plus one capture slot per
/// free variable of that definition.
#[derive(Debug)]
pub struct ClosureValue {
    pub defn: DefnSym,
    captures: Vec<CaptureCell>,
}

impl ClosureValue {
    pub fn new(defn: DefnSym, captures: Vec<Option<Value>>) -> Self {
        ClosureValue {
            defn,
            captures: captures.into_iter().map(CaptureCell::new).collect(),
        }
    }

    pub fn capture_count(&self) -> usize {
        self.captures.len()
    }

    /// Read capture slot `index`, if it has been filled.
    pub fn capture(&self, index: usize) -> Option<Value> {
        self.captures.get(index).and_then(CaptureCell::get)
    }

    /// Write capture slot `index`. Used by LetRec to patch the closure into
    /// its own capture slot after allocation.
    pub fn fill_capture(&self, index: usize, value: Value) {
        if let Some(cell) = self.captures.get(index) {
            cell.fill(value);
        }
    }
}

impl PartialEq for ClosureValue {
    fn eq(&self, other: &Self) -> bool {
        if self.defn != other.defn || self.captures.len() != other.captures.len() {
            return false;
        }
        // LetRec writes a closure into its own capture slot; comparing two
        // such slots element-wise would never terminate. A slot holding its
        // owner matches a slot holding the other owner.
        self.captures
            .iter()
            .zip(other.captures.iter())
            .all(|(a, b)| match (a.get(), b.get()) {
                (Some(Value::Closure(x)), Some(Value::Closure(y)))
                    if std::ptr::eq(Arc::as_ptr(&x), self)
                        && std::ptr::eq(Arc::as_ptr(&y), other) =>
                {
                    true
                }
                (va, vb) => va == vb,
            })
    }
}

impl Value {
    /// Construct an interned-style string value.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Construct a tuple value.
    pub fn tuple(elms: Vec<Value>) -> Self {
        Value::Tuple(Arc::from(elms))
    }

    /// Construct a tag value.
    pub fn tag(name: impl Into<String>, payload: Value) -> Self {
        Value::Tag(Arc::new(TagValue {
            name: name.into(),
            payload,
        }))
    }

    /// A short name for the value's shape, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::BigInt(_) => "bigint",
            Value::Str(_) => "string",
            Value::Tag(_) => "tag",
            Value::Tuple(_) => "tuple",
            Value::Closure(_) => "closure",
            Value::Box(_) => "box",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(elms) => Some(elms),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&TagValue> {
        match self {
            Value::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<&Arc<ClosureValue>> {
        match self {
            Value::Closure(clo) => Some(clo),
            _ => None,
        }
    }

    pub fn as_box(&self) -> Option<&BoxValue> {
        match self {
            Value::Box(cell) => Some(cell),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tag(a), Value::Tag(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => a == b,
            (Value::Box(a), Value::Box(b)) => a.same_cell(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Unit => {}
            Value::Bool(b) => b.hash(state),
            Value::Char(c) => c.hash(state),
            Value::Float32(f) => f.to_bits().hash(state),
            Value::Float64(f) => f.to_bits().hash(state),
            Value::Int8(i) => i.hash(state),
            Value::Int16(i) => i.hash(state),
            Value::Int32(i) => i.hash(state),
            Value::Int64(i) => i.hash(state),
            Value::BigInt(i) => i.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Tag(tag) => {
                tag.name.hash(state);
                tag.payload.hash(state);
            }
            Value::Tuple(elms) => {
                for v in elms.iter() {
                    v.hash(state);
                }
            }
            // Captures are mutable during back-patching; hashing the
            // definition symbol alone stays consistent with equality.
            Value::Closure(clo) => clo.defn.hash(state),
            Value::Box(cell) => Arc::as_ptr(&cell.0).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Tag(tag) => write!(f, "{}({})", tag.name, tag.payload),
            Value::Tuple(elms) => {
                write!(f, "(")?;
                for (i, v) in elms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
            Value::Closure(clo) => write!(f, "<closure {}>", clo.defn),
            Value::Box(_) => write!(f, "<box>"),
        }
    }
}
