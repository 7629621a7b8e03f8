//! Structural type model for entity type erasure.
//!
//! This crate provides:
//!
//! - **`TypeInterner`**: interned host types (`TypeId` handles) with
//!   definitions carrying mapped-name metadata and known-type markers
//! - **`TypeVisitor`**: shape-directed traversal, type rebuilding and
//!   formatting
//! - **Comparers**: shape-aware equality (`TypeEqualityComparator`),
//!   structural equality with a cycle-safe in-flight map
//!   (`StructuralTypeComparator`) and its substitution-recording variant
//! - **`TypeUnifier`**: wildcard unification over `ena` union-find
//! - **`TypeFactory`**: synthesis of anonymous and record replacement types
//!
//! Comparers and unifiers hold per-call state and are used one instance per
//! operation. The interner and the registry factory are `Send + Sync`.

pub mod builtins;
pub mod capability;
pub mod compare;
pub mod def;
pub mod error;
pub mod factory;
mod format;
mod intern;
pub mod metadata;
pub mod recursion;
pub mod relations;
pub mod structural;
pub mod types;
pub mod unify;
pub mod visitor;

pub use builtins::Builtins;
pub use capability::{HostType, TypeCapability};
pub use compare::{TypeEqualityComparator, TypeEqualityComparer};
pub use def::{DefFlags, DefId, DefKind, DefinitionInfo, DefinitionStore};
pub use error::{TypeError, UnificationError};
pub use factory::{Canonical, EqualityPolicy, RegistryTypeFactory, StructuralMember, TypeFactory};
pub use format::TypeFormatter;
pub use intern::TypeInterner;
pub use metadata::DataTypeKind;
pub use structural::{StructuralComparer, StructuralSubstitutingComparator, StructuralTypeComparator};
pub use types::*;
pub use unify::{TypeUnifier, Unification};
pub use visitor::{TypeSubstitution, TypeVisitor, map_type};
