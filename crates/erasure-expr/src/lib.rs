//! Expression trees over the structural type model, and entity type erasure.
//!
//! This crate provides:
//!
//! - **`Expr`**: typed expression trees (`ExprBuilder` builds them from type
//!   metadata), runtime `Value`s with shared, possibly cyclic object graphs
//! - **`ExprVisitor`**: read-only traversal
//! - **`find_entity_types`**: the entity types and mapped enums an
//!   expression depends on
//! - **`EntityTypeSubstitutor`**: rewrites an expression so that no entity
//!   type remains, converting constants along the way
//! - **`Interpreter`**: reference evaluator
//! - **`codec`**: the bonsai JSON form of expressions
//!
//! Substitutors, interpreters and codec encoders hold per-call state and are
//! used one instance per operation. Independent rewrites may share one
//! `TypeInterner` and one `RegistryTypeFactory` across threads.

pub mod builder;
pub mod codec;
mod constants;
pub mod error;
pub mod eval;
pub mod expr;
pub mod find_entity_types;
pub mod options;
pub mod substitutor;
pub mod value;
pub mod visitor;

pub use builder::ExprBuilder;
pub use error::{ErrorKind, ExprError};
pub use eval::Interpreter;
pub use expr::{
    BinaryOp, ElementInit, Expr, MemberBinding, MemberRef, MethodRef, NewExpr, ParameterExpr,
};
pub use find_entity_types::{EntityTypeSet, find_entity_types, find_entity_types_in_value};
pub use options::SubstitutorOptions;
pub use substitutor::EntityTypeSubstitutor;
pub use value::{ArrayRef, Closure, FunctionValue, ObjectRef, Value};
pub use visitor::{ExprVisitor, walk_expr};

#[cfg(test)]
#[path = "../tests/test_fixtures.rs"]
pub(crate) mod test_fixtures;
