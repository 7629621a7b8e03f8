//! Errors raised while building, rewriting, evaluating or decoding
//! expression trees.
//!
//! Every error names the offending original type (rendered when the error is
//! built). The first error aborts the whole call; no partially rewritten tree
//! is ever returned.

use erasure_types::TypeError;
use std::fmt;

/// Coarse classification of an [`ExprError`].
///
/// `Unsupported` separates "this extension point is incomplete" from the
/// data errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid argument to a public entry point, or malformed input.
    Argument,
    /// Mapped-name resolution failed.
    Mapping,
    /// Two structural shapes do not correspond.
    Structural,
    /// Failure reported by the type model.
    Type,
    Unsupported,
    /// Evaluation failure or resource limit.
    Runtime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },
    /// A member of a non-known entity type has no mapped name.
    MissingMapping { ty: String, member: String },
    /// Two members of one entity type share a mapped name.
    AmbiguousMapping { ty: String, mapping: String },
    /// A mapped name is assigned twice in one construction.
    DuplicateAssignment { ty: String, mapping: String },
    /// A constructor parameter cannot be matched to a member.
    UnmappedParameter { ty: String, parameter: String },
    /// The construct would lose type information if the entity type were
    /// erased (indexers, static members, methods on entity types, ...).
    ErasureUnsafe { ty: String, reason: String },
    /// A constant cannot be converted between two shapes.
    StructuralMismatch { from: String, to: String },
    /// Delegate constants over rewritten types cannot be converted.
    FunctionConstant { ty: String },
    DepthExceeded { what: &'static str, limit: u32 },
    Unsupported { what: String },
    Evaluation { reason: String },
    Codec { reason: String },
    Type(TypeError),
}

impl ExprError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExprError::InvalidArgument { .. } | ExprError::Codec { .. } => ErrorKind::Argument,
            ExprError::MissingMapping { .. }
            | ExprError::AmbiguousMapping { .. }
            | ExprError::DuplicateAssignment { .. }
            | ExprError::UnmappedParameter { .. }
            | ExprError::ErasureUnsafe { .. }
            | ExprError::FunctionConstant { .. } => ErrorKind::Mapping,
            ExprError::StructuralMismatch { .. } => ErrorKind::Structural,
            ExprError::Unsupported { .. } | ExprError::Type(TypeError::Unsupported { .. }) => {
                ErrorKind::Unsupported
            }
            ExprError::Type(TypeError::InvalidArgument { .. }) => ErrorKind::Argument,
            ExprError::Type(_) => ErrorKind::Type,
            ExprError::DepthExceeded { .. } | ExprError::Evaluation { .. } => ErrorKind::Runtime,
        }
    }

    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        ExprError::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn codec(reason: impl Into<String>) -> Self {
        ExprError::Codec {
            reason: reason.into(),
        }
    }

    pub(crate) fn evaluation(reason: impl Into<String>) -> Self {
        ExprError::Evaluation {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::InvalidArgument { parameter, reason } => {
                write!(f, "invalid argument '{parameter}': {reason}")
            }
            ExprError::MissingMapping { ty, member } => write!(
                f,
                "member '{member}' of entity type '{ty}' has no mapped name"
            ),
            ExprError::AmbiguousMapping { ty, mapping } => write!(
                f,
                "mapped name '{mapping}' is used by more than one member of entity type '{ty}'"
            ),
            ExprError::DuplicateAssignment { ty, mapping } => write!(
                f,
                "mapped name '{mapping}' of entity type '{ty}' is assigned more than once"
            ),
            ExprError::UnmappedParameter { ty, parameter } => write!(
                f,
                "constructor parameter '{parameter}' of entity type '{ty}' does not correspond to a mapped member"
            ),
            ExprError::ErasureUnsafe { ty, reason } => {
                write!(f, "entity type '{ty}' cannot be erased: {reason}")
            }
            ExprError::StructuralMismatch { from, to } => write!(
                f,
                "cannot convert a value of type '{from}' to '{to}': member sets differ"
            ),
            ExprError::FunctionConstant { ty } => write!(
                f,
                "function constant of type '{ty}' refers to entity types and cannot be rewritten"
            ),
            ExprError::DepthExceeded { what, limit } => {
                write!(f, "{what} exceeds the maximum depth of {limit}")
            }
            ExprError::Unsupported { what } => write!(f, "not supported: {what}"),
            ExprError::Evaluation { reason } => write!(f, "evaluation failed: {reason}"),
            ExprError::Codec { reason } => write!(f, "malformed bonsai document: {reason}"),
            ExprError::Type(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ExprError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExprError::Type(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TypeError> for ExprError {
    fn from(err: TypeError) -> Self {
        ExprError::Type(err)
    }
}
