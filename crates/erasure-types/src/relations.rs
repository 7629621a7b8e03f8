//! Assignability between host types.
//!
//! Rules:
//! - identity;
//! - every non-void, non-by-ref, non-pointer type is assignable to `object`;
//! - a declared type is assignable to its base classes and interfaces
//!   (instantiated for closed generics);
//! - generic interfaces and delegates honour declared variance, for
//!   reference-type arguments only;
//! - arrays are covariant in reference-type elements and must agree on rank.

use crate::def::DefKind;
use crate::intern::TypeInterner;
use crate::types::{TypeData, TypeId, Variance};
use rustc_hash::FxHashSet;

/// Whether values of `ty` are references (shared on assignment).
pub fn is_reference_type(interner: &TypeInterner, ty: TypeId) -> bool {
    if ty == TypeId::OBJECT || ty == TypeId::STRING {
        return true;
    }
    match interner.lookup(ty) {
        Some(TypeData::Array { .. }) => true,
        Some(TypeData::Definition(_) | TypeData::Generic { .. }) => interner
            .definition_of(ty)
            .is_some_and(|info| info.kind.is_reference()),
        _ => false,
    }
}

/// Whether a value of type `source` can be stored in a location of type `target`.
pub fn is_assignable(interner: &TypeInterner, source: TypeId, target: TypeId) -> bool {
    if source == target {
        return true;
    }
    if target == TypeId::OBJECT {
        return !matches!(
            interner.lookup(source),
            Some(TypeData::ByRef(_) | TypeData::Pointer(_))
        ) && source != TypeId::VOID;
    }

    match (interner.lookup(source), interner.lookup(target)) {
        (
            Some(TypeData::Array {
                element: source_element,
                rank: source_rank,
            }),
            Some(TypeData::Array {
                element: target_element,
                rank: target_rank,
            }),
        ) => {
            source_rank == target_rank
                && (source_element == target_element
                    || (is_reference_type(interner, source_element)
                        && is_assignable(interner, source_element, target_element)))
        }
        (
            Some(TypeData::Definition(_) | TypeData::Generic { .. }),
            Some(TypeData::Definition(_) | TypeData::Generic { .. }),
        ) => {
            let mut visited = FxHashSet::default();
            is_declared_subtype(interner, source, target, &mut visited)
        }
        _ => false,
    }
}

fn is_declared_subtype(
    interner: &TypeInterner,
    source: TypeId,
    target: TypeId,
    visited: &mut FxHashSet<TypeId>,
) -> bool {
    if !visited.insert(source) {
        return false;
    }
    if source == target || is_variant_instance(interner, source, target) {
        return true;
    }
    if let Some(kind) = interner.definition_of(source).map(|info| info.kind)
        && kind == DefKind::Enum
    {
        return false;
    }

    interner
        .base_of(source)
        .into_iter()
        .chain(interner.interfaces_of(source))
        .any(|parent| is_declared_subtype(interner, parent, target, visited))
}

/// `source` and `target` close the same generic definition and each argument
/// pair is related as its parameter's variance allows.
fn is_variant_instance(interner: &TypeInterner, source: TypeId, target: TypeId) -> bool {
    let (
        Some(TypeData::Generic {
            definition: source_def,
            args: source_args,
        }),
        Some(TypeData::Generic {
            definition: target_def,
            args: target_args,
        }),
    ) = (interner.lookup(source), interner.lookup(target))
    else {
        return false;
    };
    if source_def != target_def {
        return false;
    }
    let Some(info) = interner.definition(source_def) else {
        return false;
    };
    if !matches!(info.kind, DefKind::Interface | DefKind::Delegate) {
        return false;
    }

    let source_args = interner.list(source_args);
    let target_args = interner.list(target_args);
    source_args
        .iter()
        .zip(target_args.iter())
        .zip(info.type_params.iter())
        .all(|((&s, &t), param)| {
            s == t
                || match param.variance {
                    Variance::Invariant => false,
                    Variance::Covariant => {
                        is_reference_type(interner, s) && is_assignable(interner, s, t)
                    }
                    Variance::Contravariant => {
                        is_reference_type(interner, t) && is_assignable(interner, t, s)
                    }
                }
        })
}

#[cfg(test)]
#[path = "../tests/relations_tests.rs"]
mod tests;
