//! # Symbols
//!
//! Opaque interned identifiers for the compiled IR. Four kinds exist:
//! variables, definitions, enums, and tables. The upstream compiler
//! guarantees that every symbol is globally unique within a [`Root`]
//! (uniqueness is carried by the numeric id; the text is for display).
//!
//! Variable symbols additionally carry a *stack offset*: the index of the
//! capture slot a recursive closure writes itself into during `LetRec`
//! back-patching.
//!
//! [`Root`]: crate::ir::Root

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A variable symbol.
///
/// Equality, ordering, and hashing use the id only; two variables with the
/// same id are the same variable regardless of display text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarSym {
    /// Globally unique id within a Root.
    pub id: u32,
    /// Display text (the source-level name).
    pub text: String,
    /// Stack offset, used as the capture-slot index for LetRec back-patching.
    pub offset: usize,
}

/// A definition symbol (a top-level function or specialized constant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefnSym {
    pub id: u32,
    pub text: String,
}

/// An enum symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumSym {
    pub id: u32,
    pub text: String,
}

/// A table symbol, naming a relation or a lattice map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSym {
    pub id: u32,
    pub text: String,
}

impl VarSym {
    /// Create a new variable symbol.
    pub fn new(id: u32, text: impl Into<String>, offset: usize) -> Self {
        VarSym {
            id,
            text: text.into(),
            offset,
        }
    }
}

macro_rules! plain_sym {
    ($ty:ident) => {
        impl $ty {
            /// Create a new symbol.
            pub fn new(id: u32, text: impl Into<String>) -> Self {
                $ty {
                    id,
                    text: text.into(),
                }
            }
        }
    };
}

plain_sym!(DefnSym);
plain_sym!(EnumSym);
plain_sym!(TableSym);

macro_rules! sym_identity {
    ($ty:ident) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.id.cmp(&other.id)
            }
        }

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.text)
            }
        }
    };
}

sym_identity!(VarSym);
sym_identity!(DefnSym);
sym_identity!(EnumSym);
sym_identity!(TableSym);
