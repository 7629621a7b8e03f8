//! Errors raised by the type model, the comparators and the unifier.
//!
//! Type names are rendered into the error when it is built, so an error
//! stays readable after the interner that produced it is gone.

use std::fmt;

/// Failure of a type-level operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// A public entry point received an argument it cannot work with.
    InvalidArgument { parameter: &'static str, reason: String },
    /// Two types from different type systems were compared.
    CrossSystem { left: String, right: String },
    /// A binding type was matched against two different defining types.
    SubstitutionConflict {
        binding: String,
        existing: String,
        incoming: String,
    },
    /// A type refers to a definition that is not registered.
    UnknownDefinition { ty: String },
    /// An extension point is not implemented.
    Unsupported { what: String },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::InvalidArgument { parameter, reason } => {
                write!(f, "invalid argument '{parameter}': {reason}")
            }
            TypeError::CrossSystem { left, right } => write!(
                f,
                "cannot relate types from different type systems: '{left}' and '{right}'"
            ),
            TypeError::SubstitutionConflict {
                binding,
                existing,
                incoming,
            } => write!(
                f,
                "type '{binding}' is already bound to '{existing}' and cannot also be bound to '{incoming}'"
            ),
            TypeError::UnknownDefinition { ty } => {
                write!(f, "type '{ty}' refers to an unknown definition")
            }
            TypeError::Unsupported { what } => write!(f, "not supported: {what}"),
        }
    }
}

impl std::error::Error for TypeError {}

/// Failure of wildcard unification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnificationError {
    /// A wildcard (or its equivalence class) was bound to two different types.
    Conflict {
        wildcard: String,
        existing: String,
        incoming: String,
    },
    /// Two types in matching positions cannot be unified.
    Mismatch { left: String, right: String },
    /// A wildcard would be bound to a type containing itself.
    Occurs { wildcard: String, ty: String },
    /// Wildcards left without a binding after traversal.
    Unbound { wildcards: Vec<String> },
}

impl fmt::Display for UnificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnificationError::Conflict {
                wildcard,
                existing,
                incoming,
            } => write!(
                f,
                "wildcard '{wildcard}' is bound to '{existing}' and cannot be unified with '{incoming}'"
            ),
            UnificationError::Mismatch { left, right } => {
                write!(f, "types '{left}' and '{right}' cannot be unified")
            }
            UnificationError::Occurs { wildcard, ty } => {
                write!(f, "wildcard '{wildcard}' occurs in its own binding '{ty}'")
            }
            UnificationError::Unbound { wildcards } => {
                write!(f, "unbound wildcards: {}", wildcards.join(", "))
            }
        }
    }
}

impl std::error::Error for UnificationError {}
