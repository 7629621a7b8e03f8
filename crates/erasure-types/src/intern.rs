//! Type interning.
//!
//! `TypeInterner` owns every type of one type system: interned `TypeData`,
//! interned generic argument lists, wildcard names, the definition store and
//! the string pool. Equal `TypeData` always yields the same `TypeId`, so type
//! identity is a `u32` comparison.
//!
//! The interner is `Send + Sync`; rewrites running on different threads
//! share one interner behind an `Arc`.

use crate::builtins::Builtins;
use crate::def::{DefId, DefinitionInfo, DefinitionStore};
use crate::format::TypeFormatter;
use crate::types::{
    ArrayRank, ConstructorInfo, DelegateSignature, IntrinsicKind, MemberInfo, MethodInfo,
    ParamOwner, TypeData, TypeId, TypeListId, TypeShape, WildcardId,
};
use crate::visitor::{TypeVisitor, map_type};
use erasure_common::{Atom, ShardedInterner};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct TypeTable {
    ids: FxHashMap<TypeData, TypeId>,
    data: Vec<TypeData>,
}

#[derive(Default)]
struct ListTable {
    ids: FxHashMap<Arc<[TypeId]>, TypeListId>,
    lists: Vec<Arc<[TypeId]>>,
}

/// Interner and metadata host for one type system.
pub struct TypeInterner {
    system_id: u64,
    strings: ShardedInterner,
    types: RwLock<TypeTable>,
    lists: RwLock<ListTable>,
    wildcards: RwLock<Vec<Atom>>,
    defs: DefinitionStore,
    builtins: Builtins,
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    /// Create an interner with the intrinsic types and the builtin library
    /// (`Func`, `Action`, `Tuple`, `List`, `Enumerable`, `Expression`).
    pub fn new() -> Self {
        let mut table = TypeTable::default();
        for kind in IntrinsicKind::ALL {
            let data = TypeData::Intrinsic(kind);
            table.ids.insert(data, kind.type_id());
            table.data.push(data);
        }

        let mut interner = TypeInterner {
            system_id: NEXT_SYSTEM_ID.fetch_add(1, Ordering::SeqCst),
            strings: ShardedInterner::new(),
            types: RwLock::new(table),
            lists: RwLock::new(ListTable::default()),
            wildcards: RwLock::new(Vec::new()),
            defs: DefinitionStore::new(),
            builtins: Builtins::placeholder(),
        };
        interner.builtins = Builtins::register(&interner);
        trace!(system_id = interner.system_id, "TypeInterner::new");
        interner
    }

    /// Identity of this type system. Types of different systems never relate.
    pub fn system_id(&self) -> u64 {
        self.system_id
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    // -------------------------------------------------------------------------
    // Strings
    // -------------------------------------------------------------------------

    pub fn intern_string(&self, s: &str) -> Atom {
        self.strings.intern(s)
    }

    pub fn resolve_atom(&self, atom: Atom) -> Arc<str> {
        self.strings.resolve(atom)
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    pub fn intern(&self, data: TypeData) -> TypeId {
        if let Some(&id) = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(&data)
        {
            return id;
        }

        let mut table = self.types.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&id) = table.ids.get(&data) {
            return id;
        }
        let id = TypeId(table.data.len() as u32);
        table.data.push(data);
        table.ids.insert(data, id);
        id
    }

    pub fn lookup(&self, id: TypeId) -> Option<TypeData> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .get(id.0 as usize)
            .copied()
    }

    /// Number of interned types, intrinsics included.
    pub fn type_count(&self) -> usize {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .len()
    }

    /// Shape category of a type. Unknown ids are simple.
    pub fn shape(&self, id: TypeId) -> TypeShape {
        match self.lookup(id) {
            Some(TypeData::Definition(def)) => {
                if self
                    .defs
                    .get(def)
                    .is_some_and(|info| info.is_generic_definition())
                {
                    TypeShape::GenericOpen
                } else {
                    TypeShape::Simple
                }
            }
            Some(TypeData::Generic { .. }) => TypeShape::GenericClosed,
            Some(TypeData::GenericParameter { .. }) => TypeShape::GenericParameter,
            Some(TypeData::Array { .. }) => TypeShape::Array,
            Some(TypeData::ByRef(_)) => TypeShape::ByRef,
            Some(TypeData::Pointer(_)) => TypeShape::Pointer,
            Some(TypeData::Wildcard(_)) => TypeShape::Wildcard,
            Some(TypeData::Intrinsic(_)) | None => TypeShape::Simple,
        }
    }

    pub fn intrinsic(&self, kind: IntrinsicKind) -> TypeId {
        kind.type_id()
    }

    pub fn type_list(&self, types: &[TypeId]) -> TypeListId {
        if let Some(&id) = self
            .lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(types)
        {
            return id;
        }

        let mut table = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&id) = table.ids.get(types) {
            return id;
        }
        let id = TypeListId(table.lists.len() as u32);
        let list: Arc<[TypeId]> = Arc::from(types);
        table.lists.push(Arc::clone(&list));
        table.ids.insert(list, id);
        id
    }

    pub fn list(&self, id: TypeListId) -> Arc<[TypeId]> {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lists
            .get(id.0 as usize)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn generic(&self, definition: DefId, args: &[TypeId]) -> TypeId {
        let args = self.type_list(args);
        self.intern(TypeData::Generic { definition, args })
    }

    /// Vector type `T[]`.
    pub fn array(&self, element: TypeId) -> TypeId {
        self.intern(TypeData::Array {
            element,
            rank: ArrayRank::Vector,
        })
    }

    /// Multi-dimensional array `T[,]`; rank 1 yields `T[*]`, not `T[]`.
    pub fn array_of_rank(&self, element: TypeId, rank: u8) -> TypeId {
        self.intern(TypeData::Array {
            element,
            rank: ArrayRank::Multi(rank.max(1)),
        })
    }

    pub fn by_ref(&self, element: TypeId) -> TypeId {
        self.intern(TypeData::ByRef(element))
    }

    pub fn pointer(&self, element: TypeId) -> TypeId {
        self.intern(TypeData::Pointer(element))
    }

    pub fn generic_parameter(&self, owner: ParamOwner, position: u32) -> TypeId {
        self.intern(TypeData::GenericParameter { owner, position })
    }

    /// Type parameter `position` of the generic type definition `def`.
    pub fn type_parameter(&self, def: DefId, position: u32) -> TypeId {
        self.generic_parameter(ParamOwner::Type(def), position)
    }

    /// Create a new wildcard. Every call yields a distinct wildcard, even for
    /// equal names.
    pub fn fresh_wildcard(&self, name: &str) -> TypeId {
        let atom = self.intern_string(name);
        let id = {
            let mut names = self
                .wildcards
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let id = WildcardId(names.len() as u32);
            names.push(atom);
            id
        };
        self.intern(TypeData::Wildcard(id))
    }

    pub fn wildcard_name(&self, id: WildcardId) -> Arc<str> {
        let atom = self
            .wildcards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0 as usize)
            .copied()
            .unwrap_or(Atom::NONE);
        self.resolve_atom(atom)
    }

    pub fn is_wildcard(&self, ty: TypeId) -> bool {
        matches!(self.lookup(ty), Some(TypeData::Wildcard(_)))
    }

    // -------------------------------------------------------------------------
    // Definitions
    // -------------------------------------------------------------------------

    pub fn definitions(&self) -> &DefinitionStore {
        &self.defs
    }

    /// Register a definition and return the type that names it.
    ///
    /// For generic definitions the returned type is the open generic type.
    pub fn define(&self, info: DefinitionInfo) -> TypeId {
        let def = self.defs.register(info);
        self.intern(TypeData::Definition(def))
    }

    /// Complete or modify a registered definition.
    pub fn update_definition(&self, def: DefId, f: impl FnOnce(&mut DefinitionInfo)) -> bool {
        self.defs.update(def, f)
    }

    pub fn definition(&self, def: DefId) -> Option<Arc<DefinitionInfo>> {
        self.defs.get(def)
    }

    pub fn definition_type(&self, def: DefId) -> TypeId {
        self.intern(TypeData::Definition(def))
    }

    /// Definition behind a simple, open generic or closed generic type.
    pub fn def_id_of(&self, ty: TypeId) -> Option<DefId> {
        match self.lookup(ty)? {
            TypeData::Definition(def) => Some(def),
            TypeData::Generic { definition, .. } => Some(definition),
            _ => None,
        }
    }

    pub fn definition_of(&self, ty: TypeId) -> Option<Arc<DefinitionInfo>> {
        self.def_id_of(ty).and_then(|def| self.defs.get(def))
    }

    /// Generic arguments of a closed generic type; empty otherwise.
    pub fn generic_args(&self, ty: TypeId) -> Arc<[TypeId]> {
        match self.lookup(ty) {
            Some(TypeData::Generic { args, .. }) => self.list(args),
            _ => Arc::from(Vec::new()),
        }
    }

    /// Substitute the type parameters of `def` with `args` inside `ty`.
    pub fn instantiate(&self, ty: TypeId, def: DefId, args: &[TypeId]) -> TypeId {
        if args.is_empty() {
            return ty;
        }
        map_type(self, ty, &mut |t| match self.lookup(t) {
            Some(TypeData::GenericParameter {
                owner: ParamOwner::Type(owner),
                position,
            }) if owner == def => args.get(position as usize).copied(),
            _ => None,
        })
    }

    fn instantiate_in(&self, ty: TypeId, owner: TypeId) -> TypeId {
        match self.lookup(owner) {
            Some(TypeData::Generic { definition, args }) => {
                self.instantiate(ty, definition, &self.list(args))
            }
            _ => ty,
        }
    }

    /// Instance and static members of `ty` (fields, properties, indexers),
    /// with generic parameters replaced by the arguments of a closed generic.
    pub fn members_of(&self, ty: TypeId) -> Vec<MemberInfo> {
        let Some(info) = self.definition_of(ty) else {
            return Vec::new();
        };
        info.members
            .iter()
            .map(|m| MemberInfo {
                ty: self.instantiate_in(m.ty, ty),
                ..m.clone()
            })
            .collect()
    }

    pub fn member(&self, ty: TypeId, index: u32) -> Option<MemberInfo> {
        let info = self.definition_of(ty)?;
        let m = info.members.get(index as usize)?;
        Some(MemberInfo {
            ty: self.instantiate_in(m.ty, ty),
            ..m.clone()
        })
    }

    /// Find a member by declared name.
    pub fn find_member(&self, ty: TypeId, name: &str) -> Option<(u32, MemberInfo)> {
        let atom = self.intern_string(name);
        let info = self.definition_of(ty)?;
        let (index, _) = info.member_by_name(atom)?;
        Some((index, self.member(ty, index)?))
    }

    pub fn constructors_of(&self, ty: TypeId) -> Vec<ConstructorInfo> {
        let Some(info) = self.definition_of(ty) else {
            return Vec::new();
        };
        info.constructors
            .iter()
            .map(|c| ConstructorInfo {
                params: c
                    .params
                    .iter()
                    .map(|p| crate::types::ParamInfo {
                        ty: self.instantiate_in(p.ty, ty),
                        ..p.clone()
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn constructor(&self, ty: TypeId, index: u32) -> Option<ConstructorInfo> {
        self.constructors_of(ty).into_iter().nth(index as usize)
    }

    /// Method `index` of `ty`, instantiated for the type's generic arguments
    /// and for the method's own `type_args`.
    pub fn method(&self, ty: TypeId, index: u32, type_args: &[TypeId]) -> Option<MethodInfo> {
        let def = self.def_id_of(ty)?;
        let info = self.defs.get(def)?;
        let method = info.methods.get(index as usize)?;
        if method.type_params.len() != type_args.len() {
            return None;
        }

        let method_owner = ParamOwner::Method {
            declaring: def,
            index,
        };
        let instantiate = |t: TypeId| {
            let t = self.instantiate_in(t, ty);
            if type_args.is_empty() {
                return t;
            }
            map_type(self, t, &mut |p| match self.lookup(p) {
                Some(TypeData::GenericParameter { owner, position }) if owner == method_owner => {
                    type_args.get(position as usize).copied()
                }
                _ => None,
            })
        };

        Some(MethodInfo {
            params: method
                .params
                .iter()
                .map(|p| crate::types::ParamInfo {
                    ty: instantiate(p.ty),
                    ..p.clone()
                })
                .collect(),
            ret: instantiate(method.ret),
            ..method.clone()
        })
    }

    pub fn find_method(&self, ty: TypeId, name: &str) -> Option<u32> {
        let atom = self.intern_string(name);
        let info = self.definition_of(ty)?;
        info.methods
            .iter()
            .position(|m| m.name == atom)
            .map(|i| i as u32)
    }

    /// Invoke signature of a delegate type.
    pub fn delegate_signature(&self, ty: TypeId) -> Option<DelegateSignature> {
        let info = self.definition_of(ty)?;
        let signature = info.delegate.as_ref()?;
        Some(DelegateSignature {
            params: signature
                .params
                .iter()
                .map(|&p| self.instantiate_in(p, ty))
                .collect(),
            ret: self.instantiate_in(signature.ret, ty),
        })
    }

    pub fn base_of(&self, ty: TypeId) -> Option<TypeId> {
        let info = self.definition_of(ty)?;
        info.base.map(|base| self.instantiate_in(base, ty))
    }

    pub fn interfaces_of(&self, ty: TypeId) -> Vec<TypeId> {
        let Some(info) = self.definition_of(ty) else {
            return Vec::new();
        };
        info.interfaces
            .iter()
            .map(|&i| self.instantiate_in(i, ty))
            .collect()
    }

    /// Human readable name, e.g. `Func<int, string>` or `Person[]`.
    pub fn type_name(&self, ty: TypeId) -> String {
        TypeFormatter::new(self).visit(ty)
    }

    // -------------------------------------------------------------------------
    // Builtin helpers
    // -------------------------------------------------------------------------

    /// `Func<T1.., TResult>` for up to four parameters.
    pub fn func(&self, params: &[TypeId], ret: TypeId) -> Option<TypeId> {
        let def = self.builtins.func(params.len())?;
        let mut args = params.to_vec();
        args.push(ret);
        Some(self.generic(def, &args))
    }

    /// `Action<T1..>` for one or two parameters.
    pub fn action(&self, params: &[TypeId]) -> Option<TypeId> {
        let def = self.builtins.action(params.len())?;
        Some(self.generic(def, params))
    }

    /// `Tuple<T1..>` for one to four items.
    pub fn tuple(&self, items: &[TypeId]) -> Option<TypeId> {
        let def = self.builtins.tuple(items.len())?;
        Some(self.generic(def, items))
    }

    pub fn list_of(&self, element: TypeId) -> TypeId {
        self.generic(self.builtins.list, &[element])
    }

    pub fn enumerable_of(&self, element: TypeId) -> TypeId {
        self.generic(self.builtins.enumerable, &[element])
    }

    /// `Expression<TDelegate>`, the static type of quoted lambdas.
    pub fn expression_of(&self, delegate: TypeId) -> TypeId {
        self.generic(self.builtins.expression, &[delegate])
    }
}

#[cfg(test)]
#[path = "../tests/intern_tests.rs"]
mod tests;
