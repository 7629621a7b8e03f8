//! Mapping metadata queries.
//!
//! The mapped names on members, constructor parameters and enum values, and
//! the known-type marker, are stored on definitions (see [`crate::def`]).
//! This module answers the questions the substitutor and the analysis ask
//! about them.

use crate::def::{DefFlags, DefKind, DefinitionInfo};
use crate::intern::TypeInterner;
use crate::types::{MemberInfo, MemberKind, TypeData, TypeId};

/// Category of a type for constant conversion and analysis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataTypeKind {
    /// `object`, `bool`, numbers, `string`, `void`.
    Primitive,
    /// Entity type erased by the substitutor.
    Entity,
    /// Entity type marked opaque.
    Known,
    /// Enum type; `mapped` when its values carry mapped names.
    Enum { mapped: bool },
    /// Generated or declared anonymous type.
    Anonymous,
    /// Generated or declared record type.
    Record,
    Tuple,
    Array,
    /// `List<T>` or `Enumerable<T>`.
    Collection,
    /// Delegate type.
    Function,
    /// `Expression<TDelegate>`.
    Quotation,
    /// Any other declared type, rewritten only through its generic arguments.
    Opaque,
    /// Generic parameters, wildcards, by-ref and pointer types.
    Unsupported,
}

const NON_ENTITY_FLAGS: DefFlags = DefFlags::GENERATED
    .union(DefFlags::ANONYMOUS)
    .union(DefFlags::RECORD)
    .union(DefFlags::TUPLE)
    .union(DefFlags::BUILTIN);

fn has_mapping_metadata(info: &DefinitionInfo) -> bool {
    info.members.iter().any(|m| m.mapping.is_some())
        || info
            .constructors
            .iter()
            .any(|c| c.params.iter().any(|p| p.mapping.is_some()))
}

fn is_entity_definition(info: &DefinitionInfo) -> bool {
    matches!(info.kind, DefKind::Class | DefKind::Struct)
        && !info.flags.intersects(NON_ENTITY_FLAGS)
        && has_mapping_metadata(info)
}

/// Class or struct carrying mapping metadata, known or not.
pub fn is_entity_type(interner: &TypeInterner, ty: TypeId) -> bool {
    interner
        .definition_of(ty)
        .is_some_and(|info| is_entity_definition(&info))
}

pub fn is_known_type(interner: &TypeInterner, ty: TypeId) -> bool {
    interner
        .definition_of(ty)
        .is_some_and(|info| info.is_known())
}

/// Entity type the substitutor must erase.
pub fn is_rewritable_entity(interner: &TypeInterner, ty: TypeId) -> bool {
    interner
        .definition_of(ty)
        .is_some_and(|info| is_entity_definition(&info) && !info.is_known())
}

pub fn is_mapped_enum(interner: &TypeInterner, ty: TypeId) -> bool {
    interner.definition_of(ty).is_some_and(|info| {
        info.kind == DefKind::Enum && info.enum_values.iter().any(|v| v.mapping.is_some())
    })
}

/// Anonymous or record type (not a generic definition).
pub fn is_structural_type(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(interner.lookup(ty), Some(TypeData::Definition(_)))
        && interner
            .definition_of(ty)
            .is_some_and(|info| info.is_structural() && !info.is_generic_definition())
}

/// Instance members of an entity type carrying a mapped name, with their
/// member indices.
pub fn mapped_members(interner: &TypeInterner, ty: TypeId) -> Vec<(u32, MemberInfo)> {
    interner
        .members_of(ty)
        .into_iter()
        .enumerate()
        .filter(|(_, m)| m.mapping.is_some() && !m.is_static && m.kind != MemberKind::Indexer)
        .map(|(i, m)| (i as u32, m))
        .collect()
}

pub fn classify(interner: &TypeInterner, ty: TypeId) -> DataTypeKind {
    match interner.lookup(ty) {
        Some(TypeData::Intrinsic(_)) => DataTypeKind::Primitive,
        Some(TypeData::Array { .. }) => DataTypeKind::Array,
        Some(TypeData::Definition(_) | TypeData::Generic { .. }) => {
            let Some(info) = interner.definition_of(ty) else {
                return DataTypeKind::Unsupported;
            };
            let def = interner.def_id_of(ty);
            let builtins = interner.builtins();
            if info.kind == DefKind::Enum {
                DataTypeKind::Enum {
                    mapped: info.enum_values.iter().any(|v| v.mapping.is_some()),
                }
            } else if info.kind == DefKind::Delegate {
                DataTypeKind::Function
            } else if info.is_tuple() {
                DataTypeKind::Tuple
            } else if def.is_some_and(|d| builtins.is_list(d) || d == builtins.enumerable) {
                DataTypeKind::Collection
            } else if def == Some(builtins.expression) {
                DataTypeKind::Quotation
            } else if info.flags.contains(DefFlags::RECORD) {
                DataTypeKind::Record
            } else if info.flags.contains(DefFlags::ANONYMOUS) {
                DataTypeKind::Anonymous
            } else if is_entity_definition(&info) {
                if info.is_known() {
                    DataTypeKind::Known
                } else {
                    DataTypeKind::Entity
                }
            } else {
                DataTypeKind::Opaque
            }
        }
        _ => DataTypeKind::Unsupported,
    }
}

#[cfg(test)]
#[path = "../tests/metadata_tests.rs"]
mod tests;
