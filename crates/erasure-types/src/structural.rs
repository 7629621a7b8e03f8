//! Structural type comparison.
//!
//! Two *different* structural types (anonymous types, record types) are
//! equal when their member sets coincide: same member count, and for every
//! member of the left type a member of the right type with the same key
//! (mapped name, falling back to the declared name) and an equal type.
//!
//! Self-referential types are handled with an in-flight map from left type
//! to right type, scoped to one top-level comparison:
//!
//! 1. If the left type is already mapped, the pair is equal iff it is mapped
//!    to this right type. No structural re-comparison happens.
//! 2. Otherwise the pair is recorded tentatively, then members are compared.
//! 3. On mismatch the tentative entry is removed, so a type reachable from
//!    several parents is not poisoned by one failed nested comparison.

use crate::compare::{TypeEqualityComparer, combine_hash};
use crate::def::DefFlags;
use crate::error::TypeError;
use crate::intern::TypeInterner;
use crate::types::{MemberKind, TypeData, TypeId};
use erasure_common::Atom;
use rustc_hash::FxHashMap;
use tracing::trace;

const SEED_STRUCTURAL: u64 = 0x2545_f491_4f6c_dd1d;

/// A comparer that treats structural types by shape.
pub trait StructuralComparer: TypeEqualityComparer {
    /// Left-to-right mapping of the comparison in flight.
    fn in_flight(&mut self) -> &mut FxHashMap<TypeId, TypeId>;

    fn are_structurally_comparable(&self, x: TypeId, y: TypeId) -> bool {
        are_structurally_comparable(self.interner(), x, y)
    }

    /// Called after the members of `defining` and `binding` matched.
    /// Returning `false` turns the match into a mismatch.
    fn on_structural_match(&mut self, _defining: TypeId, _binding: TypeId) -> bool {
        true
    }
}

/// Whether both types are structural and of the same flavour: both anonymous
/// or both records. The predicate is symmetric.
pub fn are_structurally_comparable(interner: &TypeInterner, x: TypeId, y: TypeId) -> bool {
    let flags = |ty: TypeId| match interner.lookup(ty) {
        Some(TypeData::Definition(def)) => interner
            .definition(def)
            .filter(|info| !info.is_generic_definition())
            .map(|info| info.flags),
        _ => None,
    };
    let (Some(x_flags), Some(y_flags)) = (flags(x), flags(y)) else {
        return false;
    };
    (x_flags.contains(DefFlags::ANONYMOUS) && y_flags.contains(DefFlags::ANONYMOUS))
        || (x_flags.contains(DefFlags::RECORD) && y_flags.contains(DefFlags::RECORD))
}

/// Instance properties and fields forming the shape of a structural type,
/// as `(key, type)` pairs in declaration order.
pub fn structural_members(interner: &TypeInterner, ty: TypeId) -> Vec<(Atom, TypeId)> {
    interner
        .members_of(ty)
        .into_iter()
        .filter(|m| !m.is_static && m.kind != MemberKind::Indexer)
        .map(|m| (m.mapping.unwrap_or(m.name), m.ty))
        .collect()
}

/// Member-set hash: member count plus sorted member keys. Member types are
/// left out so cyclic types hash without recursion.
pub fn structural_hash(interner: &TypeInterner, ty: TypeId) -> u64 {
    let mut keys: Vec<Atom> = structural_members(interner, ty)
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    keys.sort_unstable();
    let flavour = interner.definition_of(ty).map_or(0, |info| {
        if info.flags.contains(DefFlags::RECORD) {
            2
        } else if info.flags.contains(DefFlags::ANONYMOUS) {
            1
        } else {
            0
        }
    });
    combine_hash(
        SEED_STRUCTURAL,
        [flavour, keys.len() as u64]
            .into_iter()
            .chain(keys.into_iter().map(|key| u64::from(key.0))),
    )
}

/// Cycle-safe structural equality of two structurally comparable types.
pub fn structural_equals<C: StructuralComparer + ?Sized>(
    comparer: &mut C,
    x: TypeId,
    y: TypeId,
) -> bool {
    if let Some(&mapped) = comparer.in_flight().get(&x) {
        return mapped == y;
    }
    comparer.in_flight().insert(x, y);

    let x_members = structural_members(comparer.interner(), x);
    let y_members = structural_members(comparer.interner(), y);

    let mut equal = x_members.len() == y_members.len();
    if equal {
        for &(key, x_ty) in &x_members {
            let matched = y_members
                .iter()
                .find(|(other, _)| *other == key)
                .is_some_and(|&(_, y_ty)| comparer.equals_type(x_ty, y_ty));
            if !matched {
                trace!(
                    left = x.0,
                    right = y.0,
                    member = key.0,
                    "structural_equals: member mismatch"
                );
                equal = false;
                break;
            }
        }
    }

    let equal = equal && comparer.on_structural_match(x, y);
    if !equal {
        comparer.in_flight().remove(&x);
    }
    equal
}

// =============================================================================
// StructuralTypeComparator
// =============================================================================

/// Equality comparer that treats anonymous and record types structurally.
///
/// Not safe for concurrent use; create one per comparison or per thread.
pub struct StructuralTypeComparator<'a> {
    interner: &'a TypeInterner,
    in_flight: FxHashMap<TypeId, TypeId>,
}

impl<'a> StructuralTypeComparator<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        StructuralTypeComparator {
            interner,
            in_flight: FxHashMap::default(),
        }
    }
}

impl TypeEqualityComparer for StructuralTypeComparator<'_> {
    fn interner(&self) -> &TypeInterner {
        self.interner
    }

    fn equals(&mut self, x: TypeId, y: TypeId) -> bool {
        self.in_flight.clear();
        let equal = self.equals_type(x, y);
        self.in_flight.clear();
        equal
    }

    fn equals_simple(&mut self, x: TypeId, y: TypeId) -> bool {
        if x == y {
            return true;
        }
        self.are_structurally_comparable(x, y) && structural_equals(self, x, y)
    }

    fn hash_simple(&mut self, ty: TypeId) -> u64 {
        if self.are_structurally_comparable(ty, ty) {
            structural_hash(self.interner, ty)
        } else {
            combine_hash(0, [u64::from(ty.0)])
        }
    }
}

impl StructuralComparer for StructuralTypeComparator<'_> {
    fn in_flight(&mut self) -> &mut FxHashMap<TypeId, TypeId> {
        &mut self.in_flight
    }
}

// =============================================================================
// StructuralSubstitutingComparator
// =============================================================================

/// Structural comparer that records, for every successful structural match,
/// the binding (right) type as a substitute for the defining (left) type.
///
/// A binding type matched against two different defining types within one
/// session is a [`TypeError::SubstitutionConflict`]. Pairs of identical
/// types match without being recorded. Matches found while comparing are
/// only kept when the top-level comparison succeeds.
pub struct StructuralSubstitutingComparator<'a> {
    interner: &'a TypeInterner,
    in_flight: FxHashMap<TypeId, TypeId>,
    substitutions: FxHashMap<TypeId, TypeId>,
    /// Matches of the comparison in flight, not yet committed.
    pending: FxHashMap<TypeId, TypeId>,
    conflict: Option<TypeError>,
}

impl<'a> StructuralSubstitutingComparator<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        StructuralSubstitutingComparator {
            interner,
            in_flight: FxHashMap::default(),
            substitutions: FxHashMap::default(),
            pending: FxHashMap::default(),
            conflict: None,
        }
    }

    /// Binding type to defining type, accumulated over the session.
    pub fn substitutions(&self) -> &FxHashMap<TypeId, TypeId> {
        &self.substitutions
    }

    pub fn into_substitutions(self) -> FxHashMap<TypeId, TypeId> {
        self.substitutions
    }

    /// Compare `defining` with `binding`, surfacing substitution conflicts.
    pub fn try_equals(&mut self, defining: TypeId, binding: TypeId) -> Result<bool, TypeError> {
        self.conflict = None;
        let equal = self.equals(defining, binding);
        match self.conflict.take() {
            Some(err) => Err(err),
            None => Ok(equal),
        }
    }
}

impl TypeEqualityComparer for StructuralSubstitutingComparator<'_> {
    fn interner(&self) -> &TypeInterner {
        self.interner
    }

    fn equals(&mut self, x: TypeId, y: TypeId) -> bool {
        self.in_flight.clear();
        self.pending.clear();
        let equal = self.equals_type(x, y) && self.conflict.is_none();
        self.in_flight.clear();
        if equal {
            self.substitutions.extend(self.pending.drain());
        } else {
            self.pending.clear();
        }
        equal
    }

    fn equals_simple(&mut self, x: TypeId, y: TypeId) -> bool {
        if self.conflict.is_some() {
            return false;
        }
        if x == y {
            return true;
        }
        self.are_structurally_comparable(x, y) && structural_equals(self, x, y)
    }

    fn hash_simple(&mut self, ty: TypeId) -> u64 {
        if self.are_structurally_comparable(ty, ty) {
            structural_hash(self.interner, ty)
        } else {
            combine_hash(0, [u64::from(ty.0)])
        }
    }
}

impl StructuralComparer for StructuralSubstitutingComparator<'_> {
    fn in_flight(&mut self) -> &mut FxHashMap<TypeId, TypeId> {
        &mut self.in_flight
    }

    fn on_structural_match(&mut self, defining: TypeId, binding: TypeId) -> bool {
        let known = self
            .substitutions
            .get(&binding)
            .or_else(|| self.pending.get(&binding))
            .copied();
        match known {
            Some(existing) if existing != defining => {
                self.conflict = Some(TypeError::SubstitutionConflict {
                    binding: self.interner.type_name(binding),
                    existing: self.interner.type_name(existing),
                    incoming: self.interner.type_name(defining),
                });
                false
            }
            _ => {
                self.pending.insert(binding, defining);
                true
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/structural_tests.rs"]
mod tests;
