//! Wildcard unification.
//!
//! Solves for the wildcards in a pair of type expressions by walking both
//! types in parallel:
//!
//! - wildcard / wildcard: the two equivalence classes are merged (union-find
//!   via `ena`); merging two classes bound to different types is a conflict;
//! - wildcard / type: the wildcard's class is bound to the type; binding a
//!   class twice to different types is a conflict;
//! - composite / composite: same shape, then components pairwise;
//! - anything else: identity, or a caller-supplied comparer.
//!
//! After traversal every wildcard must be bound; unbound wildcards are
//! reported together. Unification is all-or-nothing.
//!
//! [`TypeUnifier::unify`] allows wildcards on both sides. The one-sided
//! [`TypeUnifier::unify_with`] treats the right side as concrete: a wildcard
//! there is an ordinary type.

use crate::compare::TypeEqualityComparer;
use crate::error::UnificationError;
use crate::intern::TypeInterner;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{TypeData, TypeId, WildcardId};
use crate::visitor::{collect_wildcards, map_type};
use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Union-find key of a wildcard equivalence class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WildcardVar(u32);

impl UnifyKey for WildcardVar {
    type Value = WildcardValue;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(index: u32) -> Self {
        WildcardVar(index)
    }

    fn tag() -> &'static str {
        "WildcardVar"
    }
}

/// Binding of an equivalence class.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WildcardValue(Option<TypeId>);

impl UnifyValue for WildcardValue {
    type Error = NoError;

    /// Conflicts are detected before classes are merged, so at most one side
    /// is bound (or both to the same type).
    fn unify_values(a: &Self, b: &Self) -> Result<Self, NoError> {
        Ok(WildcardValue(a.0.or(b.0)))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    /// Wildcards on both sides.
    Exact,
    /// Wildcards on the left only.
    OneSided,
}

/// Wildcard bindings produced by a successful unification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unification {
    bindings: IndexMap<WildcardId, TypeId>,
}

impl Unification {
    pub fn get(&self, wildcard: WildcardId) -> Option<TypeId> {
        self.bindings.get(&wildcard).copied()
    }

    /// Binding of a wildcard type.
    pub fn binding_of(&self, interner: &TypeInterner, wildcard: TypeId) -> Option<TypeId> {
        match interner.lookup(wildcard) {
            Some(TypeData::Wildcard(id)) => self.get(id),
            _ => None,
        }
    }

    /// Replace every bound wildcard in `ty`.
    pub fn apply(&self, interner: &TypeInterner, ty: TypeId) -> TypeId {
        map_type(interner, ty, &mut |t| self.binding_of(interner, t))
    }

    pub fn iter(&self) -> impl Iterator<Item = (WildcardId, TypeId)> + '_ {
        self.bindings.iter().map(|(&w, &t)| (w, t))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Wildcard unifier.
///
/// Holds configuration only; every call runs on fresh union-find state.
pub struct TypeUnifier<'a> {
    interner: &'a TypeInterner,
    comparer: Option<&'a mut dyn TypeEqualityComparer>,
    declared: Vec<TypeId>,
}

impl<'a> TypeUnifier<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        TypeUnifier {
            interner,
            comparer: None,
            declared: Vec::new(),
        }
    }

    /// Declare wildcards that must be bound even if they do not occur in the
    /// unified types.
    pub fn with_wildcards(mut self, wildcards: &[TypeId]) -> Self {
        self.declared.extend_from_slice(wildcards);
        self
    }

    /// Use `comparer` to decide equality of non-wildcard simple types and of
    /// generic definitions.
    pub fn with_comparer(mut self, comparer: &'a mut dyn TypeEqualityComparer) -> Self {
        self.comparer = Some(comparer);
        self
    }

    /// Exact unification; wildcards may occur on both sides.
    pub fn unify(&mut self, left: TypeId, right: TypeId) -> Result<Unification, UnificationError> {
        self.run(Mode::Exact, left, right)
    }

    pub fn try_unify(&mut self, left: TypeId, right: TypeId) -> Option<Unification> {
        self.run(Mode::Exact, left, right).ok()
    }

    /// One-sided unification; only `left` may contain wildcards.
    pub fn unify_with(
        &mut self,
        left: TypeId,
        right: TypeId,
    ) -> Result<Unification, UnificationError> {
        self.run(Mode::OneSided, left, right)
    }

    pub fn try_unify_with(&mut self, left: TypeId, right: TypeId) -> Option<Unification> {
        self.run(Mode::OneSided, left, right).ok()
    }

    fn run(
        &mut self,
        mode: Mode,
        left: TypeId,
        right: TypeId,
    ) -> Result<Unification, UnificationError> {
        let interner = self.interner;
        let mut session = Session {
            interner,
            comparer: self.comparer.as_deref_mut(),
            mode,
            table: InPlaceUnificationTable::new(),
            vars: IndexMap::new(),
        };

        for &ty in &self.declared {
            session.register_all(ty);
        }
        session.register_all(left);
        if mode == Mode::Exact {
            session.register_all(right);
        }

        let result = session
            .unify_types(left, right)
            .and_then(|()| session.finish());
        match &result {
            Ok(unification) => debug!(
                left = %interner.type_name(left),
                right = %interner.type_name(right),
                bindings = unification.len(),
                "unification succeeded"
            ),
            Err(err) => debug!(
                left = %interner.type_name(left),
                right = %interner.type_name(right),
                error = %err,
                "unification failed"
            ),
        }
        result
    }
}

/// State of one unification call.
struct Session<'s, 'c> {
    interner: &'s TypeInterner,
    comparer: Option<&'s mut (dyn TypeEqualityComparer + 'c)>,
    mode: Mode,
    table: InPlaceUnificationTable<WildcardVar>,
    vars: IndexMap<WildcardId, WildcardVar>,
}

impl Session<'_, '_> {
    fn register_all(&mut self, ty: TypeId) {
        for wildcard in collect_wildcards(self.interner, ty) {
            self.var(wildcard);
        }
    }

    fn var(&mut self, wildcard: WildcardId) -> WildcardVar {
        if let Some(&var) = self.vars.get(&wildcard) {
            return var;
        }
        let var = self.table.new_key(WildcardValue(None));
        self.vars.insert(wildcard, var);
        var
    }

    fn wildcard_of(&self, ty: TypeId, side_may_bind: bool) -> Option<WildcardId> {
        if !side_may_bind {
            return None;
        }
        match self.interner.lookup(ty) {
            Some(TypeData::Wildcard(id)) => Some(id),
            _ => None,
        }
    }

    fn name(&self, wildcard: WildcardId) -> String {
        self.interner.wildcard_name(wildcard).to_string()
    }

    fn mismatch(&self, left: TypeId, right: TypeId) -> UnificationError {
        UnificationError::Mismatch {
            left: self.interner.type_name(left),
            right: self.interner.type_name(right),
        }
    }

    fn types_equal(&mut self, x: TypeId, y: TypeId) -> bool {
        x == y || self.comparer.as_deref_mut().is_some_and(|c| c.equals(x, y))
    }

    fn contains_wildcards(&self, ty: TypeId) -> bool {
        !collect_wildcards(self.interner, ty).is_empty()
    }

    fn unify_types(&mut self, left: TypeId, right: TypeId) -> Result<(), UnificationError> {
        let left_wildcard = self.wildcard_of(left, true);
        let right_wildcard = self.wildcard_of(right, self.mode == Mode::Exact);

        match (left_wildcard, right_wildcard) {
            (Some(a), Some(b)) => return self.merge(a, b),
            (Some(a), None) => return self.bind(a, right),
            (None, Some(b)) => return self.bind(b, left),
            (None, None) => {}
        }
        if left == right {
            return Ok(());
        }

        match (self.interner.lookup(left), self.interner.lookup(right)) {
            (
                Some(TypeData::Array {
                    element: left_element,
                    rank: left_rank,
                }),
                Some(TypeData::Array {
                    element: right_element,
                    rank: right_rank,
                }),
            ) => {
                if left_rank != right_rank {
                    return Err(self.mismatch(left, right));
                }
                self.unify_types(left_element, right_element)
            }
            (
                Some(TypeData::Generic {
                    definition: left_def,
                    args: left_args,
                }),
                Some(TypeData::Generic {
                    definition: right_def,
                    args: right_args,
                }),
            ) => {
                let left_args = self.interner.list(left_args);
                let right_args = self.interner.list(right_args);
                let same_definition = left_def == right_def
                    || self
                        .comparer
                        .as_deref_mut()
                        .is_some_and(|c| c.equals_generic_definition(left_def, right_def));
                if !same_definition || left_args.len() != right_args.len() {
                    return Err(self.mismatch(left, right));
                }
                for (&l, &r) in left_args.iter().zip(right_args.iter()) {
                    self.unify_types(l, r)?;
                }
                Ok(())
            }
            (Some(TypeData::ByRef(l)), Some(TypeData::ByRef(r)))
            | (Some(TypeData::Pointer(l)), Some(TypeData::Pointer(r))) => self.unify_types(l, r),
            _ => {
                if self.types_equal(left, right) {
                    Ok(())
                } else {
                    Err(self.mismatch(left, right))
                }
            }
        }
    }

    fn occurs(&mut self, wildcard: WildcardId, ty: TypeId) -> bool {
        let var = self.var(wildcard);
        let root = self.table.find(var);
        let nested = collect_wildcards(self.interner, ty);
        nested.into_iter().any(|w| {
            let other = self.var(w);
            self.table.find(other) == root
        })
    }

    fn bind(&mut self, wildcard: WildcardId, ty: TypeId) -> Result<(), UnificationError> {
        if self.mode == Mode::Exact && self.occurs(wildcard, ty) {
            if self.wildcard_of(ty, true) == Some(wildcard) {
                return Ok(());
            }
            return Err(UnificationError::Occurs {
                wildcard: self.name(wildcard),
                ty: self.interner.type_name(ty),
            });
        }

        let var = self.var(wildcard);
        match self.table.probe_value(var).0 {
            None => {
                trace!(
                    wildcard = %self.name(wildcard),
                    ty = %self.interner.type_name(ty),
                    "bind wildcard"
                );
                self.table.union_value(var, WildcardValue(Some(ty)));
                Ok(())
            }
            Some(existing) if self.types_equal(existing, ty) => Ok(()),
            Some(existing) if self.contains_wildcards(existing) || self.contains_wildcards(ty) => {
                self.unify_types(existing, ty)
            }
            Some(existing) => Err(UnificationError::Conflict {
                wildcard: self.name(wildcard),
                existing: self.interner.type_name(existing),
                incoming: self.interner.type_name(ty),
            }),
        }
    }

    fn merge(&mut self, a: WildcardId, b: WildcardId) -> Result<(), UnificationError> {
        let (var_a, var_b) = (self.var(a), self.var(b));
        if self.table.find(var_a) == self.table.find(var_b) {
            return Ok(());
        }

        let value_a = self.table.probe_value(var_a).0;
        let value_b = self.table.probe_value(var_b).0;
        if let (Some(bound_a), Some(bound_b)) = (value_a, value_b)
            && !self.types_equal(bound_a, bound_b)
        {
            if self.contains_wildcards(bound_a) || self.contains_wildcards(bound_b) {
                self.unify_types(bound_a, bound_b)?;
            } else {
                return Err(UnificationError::Conflict {
                    wildcard: format!("{}, {}", self.name(a), self.name(b)),
                    existing: self.interner.type_name(bound_a),
                    incoming: self.interner.type_name(bound_b),
                });
            }
        }

        trace!(a = %self.name(a), b = %self.name(b), "merge wildcard classes");
        self.table.union(var_a, var_b);
        Ok(())
    }

    /// Check every wildcard is bound and resolve wildcards nested in bindings.
    fn finish(&mut self) -> Result<Unification, UnificationError> {
        let wildcards: Vec<(WildcardId, WildcardVar)> =
            self.vars.iter().map(|(&w, &v)| (w, v)).collect();

        let mut unbound = Vec::new();
        for &(wildcard, var) in &wildcards {
            if self.table.probe_value(var).0.is_none() {
                unbound.push(self.name(wildcard));
            }
        }
        if !unbound.is_empty() {
            return Err(UnificationError::Unbound { wildcards: unbound });
        }

        let mut guard = RecursionGuard::with_profile(RecursionProfile::Unification);
        let mut bindings = IndexMap::with_capacity(wildcards.len());
        for (wildcard, _) in wildcards {
            let resolved = self.resolve(wildcard, &mut guard)?;
            bindings.insert(wildcard, resolved);
        }
        Ok(Unification { bindings })
    }

    fn resolve(
        &mut self,
        wildcard: WildcardId,
        guard: &mut RecursionGuard<WildcardId>,
    ) -> Result<TypeId, UnificationError> {
        let var = self.var(wildcard);
        let Some(bound) = self.table.probe_value(var).0 else {
            return Err(UnificationError::Unbound {
                wildcards: vec![self.name(wildcard)],
            });
        };

        let nested: Vec<WildcardId> = match self.mode {
            Mode::Exact => collect_wildcards(self.interner, bound),
            Mode::OneSided => Vec::new(),
        };
        if nested.is_empty() {
            return Ok(bound);
        }

        match guard.enter(wildcard) {
            RecursionResult::Entered => {}
            _ => {
                return Err(UnificationError::Occurs {
                    wildcard: self.name(wildcard),
                    ty: self.interner.type_name(bound),
                });
            }
        }
        let mut resolved = Vec::with_capacity(nested.len());
        let mut failure = None;
        for w in nested {
            match self.resolve(w, guard) {
                Ok(ty) => resolved.push((w, ty)),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        guard.leave(wildcard);
        if let Some(err) = failure {
            return Err(err);
        }

        let interner = self.interner;
        Ok(map_type(interner, bound, &mut |t| match interner.lookup(t) {
            Some(TypeData::Wildcard(id)) => resolved
                .iter()
                .find(|(w, _)| *w == id)
                .map(|&(_, ty)| ty),
            _ => None,
        }))
    }
}

#[cfg(test)]
#[path = "../tests/unify_tests.rs"]
mod tests;
