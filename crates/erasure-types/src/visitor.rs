//! Type visitor.
//!
//! [`TypeVisitor`] dispatches on the shape of a type and lets implementors
//! produce a result per shape. Composite shapes (arrays, generics, by-ref,
//! pointers) must be handled; everything else defaults to
//! [`visit_simple`](TypeVisitor::visit_simple).
//!
//! The module also provides the rebuilding visitor behind [`map_type`] and
//! [`TypeSubstitution`], and read-only helpers to collect wildcards or search
//! a type for a component.

use crate::def::DefId;
use crate::intern::TypeInterner;
use crate::types::{ArrayRank, IntrinsicKind, ParamOwner, TypeData, TypeId, WildcardId};
use rustc_hash::{FxHashMap, FxHashSet};

/// Visitor over the structure of a type.
pub trait TypeVisitor {
    type Output;

    fn interner(&self) -> &TypeInterner;

    fn visit(&mut self, ty: TypeId) -> Self::Output {
        match self.interner().lookup(ty) {
            Some(TypeData::Intrinsic(kind)) => self.visit_intrinsic(ty, kind),
            Some(TypeData::Definition(def)) => self.visit_definition(ty, def),
            Some(TypeData::Generic { definition, args }) => {
                let args = self.interner().list(args);
                self.visit_generic(ty, definition, &args)
            }
            Some(TypeData::GenericParameter { owner, position }) => {
                self.visit_generic_parameter(ty, owner, position)
            }
            Some(TypeData::Array { element, rank }) => self.visit_array(ty, element, rank),
            Some(TypeData::ByRef(element)) => self.visit_by_ref(ty, element),
            Some(TypeData::Pointer(element)) => self.visit_pointer(ty, element),
            Some(TypeData::Wildcard(id)) => self.visit_wildcard(ty, id),
            None => self.visit_unknown(ty),
        }
    }

    /// Fallback for every non-composite shape.
    fn visit_simple(&mut self, ty: TypeId) -> Self::Output;

    fn visit_array(&mut self, ty: TypeId, element: TypeId, rank: ArrayRank) -> Self::Output;

    fn visit_generic(&mut self, ty: TypeId, definition: DefId, args: &[TypeId]) -> Self::Output;

    fn visit_by_ref(&mut self, ty: TypeId, element: TypeId) -> Self::Output;

    fn visit_pointer(&mut self, ty: TypeId, element: TypeId) -> Self::Output;

    fn visit_intrinsic(&mut self, ty: TypeId, _kind: IntrinsicKind) -> Self::Output {
        self.visit_simple(ty)
    }

    /// Simple declared types and open generic definitions.
    fn visit_definition(&mut self, ty: TypeId, _def: DefId) -> Self::Output {
        self.visit_simple(ty)
    }

    fn visit_generic_parameter(
        &mut self,
        ty: TypeId,
        _owner: ParamOwner,
        _position: u32,
    ) -> Self::Output {
        self.visit_simple(ty)
    }

    fn visit_wildcard(&mut self, ty: TypeId, _id: WildcardId) -> Self::Output {
        self.visit_simple(ty)
    }

    fn visit_unknown(&mut self, ty: TypeId) -> Self::Output {
        self.visit_simple(ty)
    }
}

// =============================================================================
// Rebuilding visitor
// =============================================================================

/// Rebuilds a type bottom-up, letting `replace` substitute any component.
///
/// `replace` is consulted before descending: returning `Some` replaces the
/// whole component without visiting it.
struct TypeMapper<'a, 'f> {
    interner: &'a TypeInterner,
    replace: &'f mut dyn FnMut(TypeId) -> Option<TypeId>,
}

impl TypeMapper<'_, '_> {
    fn map(&mut self, ty: TypeId) -> TypeId {
        if let Some(replacement) = (self.replace)(ty) {
            return replacement;
        }
        self.visit(ty)
    }
}

impl TypeVisitor for TypeMapper<'_, '_> {
    type Output = TypeId;

    fn interner(&self) -> &TypeInterner {
        self.interner
    }

    fn visit_simple(&mut self, ty: TypeId) -> TypeId {
        ty
    }

    fn visit_array(&mut self, ty: TypeId, element: TypeId, rank: ArrayRank) -> TypeId {
        let mapped = self.map(element);
        if mapped == element {
            return ty;
        }
        self.interner.intern(TypeData::Array {
            element: mapped,
            rank,
        })
    }

    fn visit_generic(&mut self, ty: TypeId, definition: DefId, args: &[TypeId]) -> TypeId {
        let mapped: Vec<TypeId> = args.iter().map(|&arg| self.map(arg)).collect();
        if mapped.as_slice() == args {
            return ty;
        }
        self.interner.generic(definition, &mapped)
    }

    fn visit_by_ref(&mut self, ty: TypeId, element: TypeId) -> TypeId {
        let mapped = self.map(element);
        if mapped == element {
            ty
        } else {
            self.interner.by_ref(mapped)
        }
    }

    fn visit_pointer(&mut self, ty: TypeId, element: TypeId) -> TypeId {
        let mapped = self.map(element);
        if mapped == element {
            ty
        } else {
            self.interner.pointer(mapped)
        }
    }
}

/// Rebuild `ty`, replacing every component for which `replace` returns `Some`.
///
/// Members of declared types are not visited; only the type expression
/// itself (generic arguments, array elements, by-ref and pointer targets).
pub fn map_type(
    interner: &TypeInterner,
    ty: TypeId,
    replace: &mut dyn FnMut(TypeId) -> Option<TypeId>,
) -> TypeId {
    TypeMapper { interner, replace }.map(ty)
}

/// A type-to-type substitution applied component-wise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSubstitution {
    map: FxHashMap<TypeId, TypeId>,
}

impl TypeSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: FxHashMap<TypeId, TypeId>) -> Self {
        TypeSubstitution { map }
    }

    pub fn insert(&mut self, from: TypeId, to: TypeId) {
        self.map.insert(from, to);
    }

    pub fn get(&self, ty: TypeId) -> Option<TypeId> {
        self.map.get(&ty).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn apply(&self, interner: &TypeInterner, ty: TypeId) -> TypeId {
        if self.map.is_empty() {
            return ty;
        }
        map_type(interner, ty, &mut |t| self.get(t))
    }
}

// =============================================================================
// Read-only helpers
// =============================================================================

/// Call `f` for `ty` and every component of it, pre-order.
pub fn for_each_component(interner: &TypeInterner, ty: TypeId, f: &mut dyn FnMut(TypeId)) {
    f(ty);
    match interner.lookup(ty) {
        Some(TypeData::Generic { args, .. }) => {
            for &arg in interner.list(args).iter() {
                for_each_component(interner, arg, f);
            }
        }
        Some(
            TypeData::Array { element, .. } | TypeData::ByRef(element) | TypeData::Pointer(element),
        ) => for_each_component(interner, element, f),
        _ => {}
    }
}

/// Whether `ty` or any of its components satisfies `predicate`.
pub fn contains_type(
    interner: &TypeInterner,
    ty: TypeId,
    predicate: &dyn Fn(TypeId) -> bool,
) -> bool {
    let mut found = false;
    for_each_component(interner, ty, &mut |t| found |= predicate(t));
    found
}

/// Wildcards occurring in `ty`, in first-occurrence order.
pub fn collect_wildcards(interner: &TypeInterner, ty: TypeId) -> Vec<WildcardId> {
    let mut seen = FxHashSet::default();
    let mut wildcards = Vec::new();
    for_each_component(interner, ty, &mut |t| {
        if let Some(TypeData::Wildcard(id)) = interner.lookup(t)
            && seen.insert(id)
        {
            wildcards.push(id);
        }
    });
    wildcards
}

#[cfg(test)]
#[path = "../tests/visitor_tests.rs"]
mod tests;
