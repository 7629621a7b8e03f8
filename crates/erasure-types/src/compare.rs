//! Shape-aware type equality and hashing.
//!
//! [`TypeEqualityComparer`] dispatches on the shape of both types and calls
//! one override point per shape:
//!
//! | Shape pair | Override | Default |
//! |------------|----------|---------|
//! | array / array | `equals_array` | same rank and flavour, equal elements |
//! | closed generic / closed generic | `equals_generic` | `equals_generic_definition`, then arguments pairwise |
//! | open generic / open generic | `equals_generic_definition` | identity |
//! | generic parameter / generic parameter | `equals_generic_parameter` | identity |
//! | by-ref / by-ref | `equals_by_ref` | equal elements |
//! | pointer / pointer | `equals_pointer` | equal elements |
//! | wildcard / wildcard | `equals_wildcard` | identity |
//! | simple / simple | `equals_simple` | identity |
//!
//! Types of different shapes are never equal. Hashing mirrors the dispatch
//! with a seed per shape, so types equal under a comparer hash equal as long
//! as every overridden `equals_*` has a matching `hash_*`.
//!
//! [`TypeEqualityComparator`] is the baseline: two distinct generated types
//! with the same members are *not* equal under it.

use crate::def::DefId;
use crate::intern::TypeInterner;
use crate::types::{ArrayRank, TypeData, TypeId, TypeShape};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

const SEED_SIMPLE: u64 = 0x9e37_79b9_7f4a_7c15;
const SEED_ARRAY: u64 = 0xc2b2_ae3d_27d4_eb4f;
const SEED_GENERIC: u64 = 0x1656_67b1_9e37_79f9;
const SEED_GENERIC_DEFINITION: u64 = 0x27d4_eb2f_1656_67c5;
const SEED_GENERIC_PARAMETER: u64 = 0x85eb_ca77_c2b2_ae63;
const SEED_BY_REF: u64 = 0xff51_afd7_ed55_8ccd;
const SEED_POINTER: u64 = 0xc4ce_b9fe_1a85_ec53;
const SEED_WILDCARD: u64 = 0x94d0_49bb_1331_11eb;

/// Combine a seed with component hashes.
pub fn combine_hash(seed: u64, parts: impl IntoIterator<Item = u64>) -> u64 {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    for part in parts {
        part.hash(&mut hasher);
    }
    hasher.finish()
}

/// Equality and hashing over types with per-shape override points.
///
/// Implementations that keep per-comparison state are not safe to share
/// between concurrent comparisons; use one comparer per comparison.
pub trait TypeEqualityComparer {
    fn interner(&self) -> &TypeInterner;

    /// Public entry point. Comparers with call-scoped state reset it here.
    fn equals(&mut self, x: TypeId, y: TypeId) -> bool {
        self.equals_type(x, y)
    }

    /// `None` equals only `None`.
    fn equals_nullable(&mut self, x: Option<TypeId>, y: Option<TypeId>) -> bool {
        match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => self.equals(x, y),
            _ => false,
        }
    }

    /// Recursive comparison used for components.
    fn equals_type(&mut self, x: TypeId, y: TypeId) -> bool {
        equals_by_shape(self, x, y)
    }

    fn equals_array(
        &mut self,
        x_element: TypeId,
        x_rank: ArrayRank,
        y_element: TypeId,
        y_rank: ArrayRank,
    ) -> bool {
        x_rank == y_rank && self.equals_type(x_element, y_element)
    }

    fn equals_generic(
        &mut self,
        x_definition: DefId,
        x_args: &[TypeId],
        y_definition: DefId,
        y_args: &[TypeId],
    ) -> bool {
        self.equals_generic_definition(x_definition, y_definition)
            && x_args.len() == y_args.len()
            && x_args
                .iter()
                .zip(y_args)
                .all(|(&x, &y)| self.equals_type(x, y))
    }

    fn equals_generic_definition(&mut self, x: DefId, y: DefId) -> bool {
        x == y
    }

    fn equals_generic_parameter(&mut self, x: TypeId, y: TypeId) -> bool {
        x == y
    }

    fn equals_by_ref(&mut self, x_element: TypeId, y_element: TypeId) -> bool {
        self.equals_type(x_element, y_element)
    }

    fn equals_pointer(&mut self, x_element: TypeId, y_element: TypeId) -> bool {
        self.equals_type(x_element, y_element)
    }

    fn equals_wildcard(&mut self, x: TypeId, y: TypeId) -> bool {
        x == y
    }

    fn equals_simple(&mut self, x: TypeId, y: TypeId) -> bool {
        x == y
    }

    fn hash(&mut self, ty: TypeId) -> u64 {
        self.hash_type(ty)
    }

    fn hash_nullable(&mut self, ty: Option<TypeId>) -> u64 {
        ty.map_or(0, |ty| self.hash(ty))
    }

    fn hash_type(&mut self, ty: TypeId) -> u64 {
        hash_by_shape(self, ty)
    }

    fn hash_array(&mut self, element: TypeId, rank: ArrayRank) -> u64 {
        let element = self.hash_type(element);
        let rank = match rank {
            ArrayRank::Vector => 0,
            ArrayRank::Multi(rank) => u64::from(rank),
        };
        combine_hash(SEED_ARRAY, [rank, element])
    }

    fn hash_generic(&mut self, definition: DefId, args: &[TypeId]) -> u64 {
        let mut parts = Vec::with_capacity(args.len() + 1);
        parts.push(self.hash_generic_definition(definition));
        parts.extend(args.iter().map(|&arg| self.hash_type(arg)));
        combine_hash(SEED_GENERIC, parts)
    }

    fn hash_generic_definition(&mut self, definition: DefId) -> u64 {
        combine_hash(SEED_GENERIC_DEFINITION, [u64::from(definition.0)])
    }

    fn hash_generic_parameter(&mut self, ty: TypeId) -> u64 {
        combine_hash(SEED_GENERIC_PARAMETER, [u64::from(ty.0)])
    }

    fn hash_by_ref(&mut self, element: TypeId) -> u64 {
        let element = self.hash_type(element);
        combine_hash(SEED_BY_REF, [element])
    }

    fn hash_pointer(&mut self, element: TypeId) -> u64 {
        let element = self.hash_type(element);
        combine_hash(SEED_POINTER, [element])
    }

    fn hash_wildcard(&mut self, ty: TypeId) -> u64 {
        combine_hash(SEED_WILDCARD, [u64::from(ty.0)])
    }

    fn hash_simple(&mut self, ty: TypeId) -> u64 {
        combine_hash(SEED_SIMPLE, [u64::from(ty.0)])
    }
}

/// Shape dispatch shared by every comparer.
pub fn equals_by_shape<C: TypeEqualityComparer + ?Sized>(
    comparer: &mut C,
    x: TypeId,
    y: TypeId,
) -> bool {
    if x == y {
        return true;
    }
    let interner = comparer.interner();
    let (Some(x_data), Some(y_data)) = (interner.lookup(x), interner.lookup(y)) else {
        return false;
    };
    let (x_shape, y_shape) = (interner.shape(x), interner.shape(y));
    if x_shape != y_shape {
        return false;
    }

    match (x_data, y_data) {
        (
            TypeData::Array {
                element: x_element,
                rank: x_rank,
            },
            TypeData::Array {
                element: y_element,
                rank: y_rank,
            },
        ) => comparer.equals_array(x_element, x_rank, y_element, y_rank),
        (
            TypeData::Generic {
                definition: x_definition,
                args: x_args,
            },
            TypeData::Generic {
                definition: y_definition,
                args: y_args,
            },
        ) => {
            let x_args = interner.list(x_args);
            let y_args = interner.list(y_args);
            comparer.equals_generic(x_definition, &x_args, y_definition, &y_args)
        }
        (TypeData::Definition(x_def), TypeData::Definition(y_def))
            if x_shape == TypeShape::GenericOpen =>
        {
            comparer.equals_generic_definition(x_def, y_def)
        }
        (TypeData::GenericParameter { .. }, TypeData::GenericParameter { .. }) => {
            comparer.equals_generic_parameter(x, y)
        }
        (TypeData::ByRef(x_element), TypeData::ByRef(y_element)) => {
            comparer.equals_by_ref(x_element, y_element)
        }
        (TypeData::Pointer(x_element), TypeData::Pointer(y_element)) => {
            comparer.equals_pointer(x_element, y_element)
        }
        (TypeData::Wildcard(_), TypeData::Wildcard(_)) => comparer.equals_wildcard(x, y),
        _ => comparer.equals_simple(x, y),
    }
}

/// Hash dispatch shared by every comparer.
pub fn hash_by_shape<C: TypeEqualityComparer + ?Sized>(comparer: &mut C, ty: TypeId) -> u64 {
    let interner = comparer.interner();
    let shape = interner.shape(ty);
    match interner.lookup(ty) {
        Some(TypeData::Array { element, rank }) => comparer.hash_array(element, rank),
        Some(TypeData::Generic { definition, args }) => {
            let args = interner.list(args);
            comparer.hash_generic(definition, &args)
        }
        Some(TypeData::Definition(def)) if shape == TypeShape::GenericOpen => {
            comparer.hash_generic_definition(def)
        }
        Some(TypeData::GenericParameter { .. }) => comparer.hash_generic_parameter(ty),
        Some(TypeData::ByRef(element)) => comparer.hash_by_ref(element),
        Some(TypeData::Pointer(element)) => comparer.hash_pointer(element),
        Some(TypeData::Wildcard(_)) => comparer.hash_wildcard(ty),
        _ => comparer.hash_simple(ty),
    }
}

/// Baseline comparer: identity for simple types, shape-wise otherwise.
pub struct TypeEqualityComparator<'a> {
    interner: &'a TypeInterner,
}

impl<'a> TypeEqualityComparator<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        TypeEqualityComparator { interner }
    }
}

impl TypeEqualityComparer for TypeEqualityComparator<'_> {
    fn interner(&self) -> &TypeInterner {
        self.interner
    }
}

#[cfg(test)]
#[path = "../tests/compare_tests.rs"]
mod tests;
