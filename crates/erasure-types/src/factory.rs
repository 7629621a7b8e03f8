//! Synthesis of structural replacement types.
//!
//! [`TypeFactory`] is the capability the entity substitutor uses to obtain a
//! fresh type with given named, typed members and an equality policy.
//! Synthesis is split in phases so self-referential shapes can be built:
//! `declare` an empty shell, rewrite member types (which may refer to the
//! shell), `define` the members, then `canonicalize` to reuse a previously
//! synthesized type of the same shape.
//!
//! [`RegistryTypeFactory`] keeps a registry of generated types bucketed by
//! structural hash and matches candidates with the
//! [`StructuralSubstitutingComparator`].

use crate::def::{DefFlags, DefinitionInfo};
use crate::error::TypeError;
use crate::intern::TypeInterner;
use crate::structural::{StructuralSubstitutingComparator, structural_hash};
use crate::types::{ConstructorInfo, MemberInfo, ParamInfo, TypeId};
use dashmap::DashMap;
use erasure_common::Atom;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

/// Equality semantics of a synthesized type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqualityPolicy {
    /// Value equality over members (anonymous type).
    #[default]
    Value,
    /// Reference equality (record type). Required for cyclic object graphs.
    Reference,
}

impl EqualityPolicy {
    pub fn flag(self) -> DefFlags {
        match self {
            EqualityPolicy::Value => DefFlags::ANONYMOUS,
            EqualityPolicy::Reference => DefFlags::RECORD,
        }
    }
}

/// A named, typed slot of a synthesized type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructuralMember {
    pub name: Atom,
    pub ty: TypeId,
}

impl StructuralMember {
    pub fn new(name: Atom, ty: TypeId) -> Self {
        StructuralMember { name, ty }
    }
}

/// Result of canonicalization: the type to use, and the substitutions
/// (binding type to defining type) discovered while matching.
#[derive(Debug, Clone)]
pub struct Canonical {
    pub ty: TypeId,
    pub substitutions: FxHashMap<TypeId, TypeId>,
}

pub trait TypeFactory: Send + Sync {
    /// Allocate an empty synthesized type.
    fn declare(&self, interner: &TypeInterner, policy: EqualityPolicy) -> TypeId;

    /// Give a declared type its members, in order.
    fn define(
        &self,
        interner: &TypeInterner,
        ty: TypeId,
        members: &[StructuralMember],
    ) -> Result<(), TypeError>;

    /// Find a previously synthesized type structurally equal to `ty`, or
    /// register `ty` as the canonical type of its shape.
    fn canonicalize(&self, interner: &TypeInterner, ty: TypeId) -> Result<Canonical, TypeError>;

    /// Declare, define and canonicalize in one step. Only for shapes whose
    /// member types do not refer back to the new type.
    fn create(
        &self,
        interner: &TypeInterner,
        members: &[StructuralMember],
        policy: EqualityPolicy,
    ) -> Result<TypeId, TypeError> {
        let ty = self.declare(interner, policy);
        self.define(interner, ty, members)?;
        Ok(self.canonicalize(interner, ty)?.ty)
    }
}

/// Registry-backed [`TypeFactory`]. Thread-safe; share it between rewrites
/// to reuse synthesized types.
#[derive(Default)]
pub struct RegistryTypeFactory {
    /// `(type system, structural hash)` to canonical types.
    registry: DashMap<(u64, u64), Vec<TypeId>>,
    anonymous_count: AtomicU32,
    record_count: AtomicU32,
}

impl RegistryTypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of canonical types registered.
    pub fn len(&self) -> usize {
        self.registry.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TypeFactory for RegistryTypeFactory {
    fn declare(&self, interner: &TypeInterner, policy: EqualityPolicy) -> TypeId {
        let name = match policy {
            EqualityPolicy::Value => format!(
                "<>__Anonymous{}",
                self.anonymous_count.fetch_add(1, Ordering::SeqCst) + 1
            ),
            EqualityPolicy::Reference => format!(
                "<>__Record{}",
                self.record_count.fetch_add(1, Ordering::SeqCst) + 1
            ),
        };
        let ty = interner.define(
            DefinitionInfo::class(interner.intern_string(&name))
                .with_flags(DefFlags::GENERATED | policy.flag()),
        );
        trace!(name = %name, ty = ty.0, "RegistryTypeFactory::declare");
        ty
    }

    fn define(
        &self,
        interner: &TypeInterner,
        ty: TypeId,
        members: &[StructuralMember],
    ) -> Result<(), TypeError> {
        let Some(def) = interner.def_id_of(ty) else {
            return Err(TypeError::InvalidArgument {
                parameter: "ty",
                reason: format!("'{}' is not a declared type", interner.type_name(ty)),
            });
        };
        let generated = interner
            .definition(def)
            .is_some_and(|info| info.flags.contains(DefFlags::GENERATED));
        if !generated {
            return Err(TypeError::InvalidArgument {
                parameter: "ty",
                reason: format!("'{}' was not declared by a factory", interner.type_name(ty)),
            });
        }
        for (i, member) in members.iter().enumerate() {
            if members[..i].iter().any(|m| m.name == member.name) {
                return Err(TypeError::InvalidArgument {
                    parameter: "members",
                    reason: format!(
                        "duplicate member '{}'",
                        interner.resolve_atom(member.name)
                    ),
                });
            }
        }

        let infos: Vec<MemberInfo> = members
            .iter()
            .map(|m| MemberInfo::property(m.name, m.ty).mapped(m.name))
            .collect();
        let params: Vec<ParamInfo> = members
            .iter()
            .map(|m| ParamInfo::new(m.name, m.ty).mapped(m.name))
            .collect();
        interner.update_definition(def, |info| {
            info.members = infos;
            info.constructors = vec![ConstructorInfo::new(params)];
        });
        Ok(())
    }

    fn canonicalize(&self, interner: &TypeInterner, ty: TypeId) -> Result<Canonical, TypeError> {
        let key = (interner.system_id(), structural_hash(interner, ty));
        let mut bucket = self.registry.entry(key).or_default();

        for &candidate in bucket.iter() {
            if candidate == ty {
                return Ok(Canonical {
                    ty,
                    substitutions: FxHashMap::default(),
                });
            }
            let mut comparer = StructuralSubstitutingComparator::new(interner);
            if comparer.try_equals(candidate, ty)? {
                debug!(
                    ty = %interner.type_name(ty),
                    canonical = %interner.type_name(candidate),
                    "reusing synthesized type"
                );
                return Ok(Canonical {
                    ty: candidate,
                    substitutions: comparer.into_substitutions(),
                });
            }
        }

        debug!(ty = %interner.type_name(ty), "registering synthesized type");
        bucket.push(ty);
        Ok(Canonical {
            ty,
            substitutions: FxHashMap::default(),
        })
    }
}

#[cfg(test)]
#[path = "../tests/factory_tests.rs"]
mod tests;
