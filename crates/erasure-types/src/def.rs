//! Definition identifiers and storage.
//!
//! Every declared type (class, struct, interface, enum, delegate, generated
//! anonymous or record type) is described by a [`DefinitionInfo`] stored in
//! a [`DefinitionStore`] and referenced from types through a [`DefId`].
//!
//! Definitions carry the mapping metadata the substitutor relies on:
//! mapped names on members, constructor parameters and enum values, and the
//! [`DefFlags::KNOWN`] marker for opaque types. This side table replaces
//! attribute lookup on a reflection host.
//!
//! Self-referential types are registered in two phases: `register` a shell,
//! create the types that refer to it, then `update` the shell with members.

use crate::types::{
    ConstructorInfo, DelegateSignature, EnumValueInfo, MemberInfo, MethodInfo, TypeId,
    TypeParamInfo,
};
use bitflags::bitflags;
use dashmap::DashMap;
use erasure_common::Atom;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::trace;

/// Global counter for assigning unique instance IDs to `DefinitionStore` instances.
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// DefId
// =============================================================================

/// Definition identifier, unique within one [`DefinitionStore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub u32);

impl DefId {
    /// Sentinel value for invalid `DefId`.
    pub const INVALID: Self = Self(0);

    /// First valid `DefId`.
    pub const FIRST_VALID: u32 = 1;

    /// Check if this `DefId` is valid.
    pub const fn is_valid(self) -> bool {
        self.0 >= Self::FIRST_VALID
    }
}

// =============================================================================
// DefKind / DefFlags
// =============================================================================

/// Kind of type definition.
///
/// | Kind | Reference type | Example |
/// |------|----------------|---------|
/// | Class | Yes | `class Person { ... }` |
/// | Struct | No | `struct Point { ... }` |
/// | Interface | Yes | `interface IEnumerable<out T>` |
/// | Enum | No | `enum Color { Red, Green }` |
/// | Delegate | Yes | `delegate R Func<in T, out R>(T arg)` |
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DefKind {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

impl DefKind {
    pub const fn name(self) -> &'static str {
        match self {
            DefKind::Class => "class",
            DefKind::Struct => "struct",
            DefKind::Interface => "interface",
            DefKind::Enum => "enum",
            DefKind::Delegate => "delegate",
        }
    }

    pub fn from_name(name: &str) -> Option<DefKind> {
        match name {
            "class" => Some(DefKind::Class),
            "struct" => Some(DefKind::Struct),
            "interface" => Some(DefKind::Interface),
            "enum" => Some(DefKind::Enum),
            "delegate" => Some(DefKind::Delegate),
            _ => None,
        }
    }

    pub const fn is_reference(self) -> bool {
        matches!(self, DefKind::Class | DefKind::Interface | DefKind::Delegate)
    }
}

bitflags! {
    /// Declaration markers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DefFlags: u32 {
        /// Opaque to structural rewriting; passes through unchanged.
        const KNOWN = 1 << 0;
        /// Anonymous type: structural, value equality.
        const ANONYMOUS = 1 << 1;
        /// Record type: structural, reference equality.
        const RECORD = 1 << 2;
        /// Positional tuple (`Item1..ItemN`).
        const TUPLE = 1 << 3;
        /// Synthesized by a type factory.
        const GENERATED = 1 << 4;
        /// Member of the builtin library (`Func`, `List`, ...).
        const BUILTIN = 1 << 5;
    }
}

// =============================================================================
// DefinitionInfo
// =============================================================================

/// Complete information about a type definition.
#[derive(Clone, Debug)]
pub struct DefinitionInfo {
    pub kind: DefKind,
    pub name: Atom,
    pub flags: DefFlags,
    /// Non-empty for generic definitions.
    pub type_params: Vec<TypeParamInfo>,
    /// Base class, or the underlying integral type of an enum.
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub members: Vec<MemberInfo>,
    pub constructors: Vec<ConstructorInfo>,
    pub methods: Vec<MethodInfo>,
    pub enum_values: Vec<EnumValueInfo>,
    pub delegate: Option<DelegateSignature>,
}

impl DefinitionInfo {
    fn empty(kind: DefKind, name: Atom) -> Self {
        Self {
            kind,
            name,
            flags: DefFlags::empty(),
            type_params: Vec::new(),
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            enum_values: Vec::new(),
            delegate: None,
        }
    }

    /// Create a class definition.
    pub fn class(name: Atom) -> Self {
        Self::empty(DefKind::Class, name)
    }

    /// Create a struct definition.
    pub fn structure(name: Atom) -> Self {
        Self::empty(DefKind::Struct, name)
    }

    /// Create an interface definition.
    pub fn interface(name: Atom) -> Self {
        Self::empty(DefKind::Interface, name)
    }

    /// Create an enum definition over `int`.
    pub fn enumeration(name: Atom, values: Vec<EnumValueInfo>) -> Self {
        Self {
            base: Some(TypeId::INT32),
            enum_values: values,
            ..Self::empty(DefKind::Enum, name)
        }
    }

    /// Create a delegate definition.
    pub fn delegate(name: Atom, signature: DelegateSignature) -> Self {
        Self {
            delegate: Some(signature),
            ..Self::empty(DefKind::Delegate, name)
        }
    }

    pub fn with_flags(mut self, flags: DefFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Mark as opaque to rewriting.
    pub fn known(self) -> Self {
        self.with_flags(DefFlags::KNOWN)
    }

    pub fn with_type_params(mut self, type_params: Vec<TypeParamInfo>) -> Self {
        self.type_params = type_params;
        self
    }

    pub fn with_base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_interfaces(mut self, interfaces: Vec<TypeId>) -> Self {
        self.interfaces = interfaces;
        self
    }

    pub fn with_members(mut self, members: Vec<MemberInfo>) -> Self {
        self.members = members;
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    pub fn is_generic_definition(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn is_known(&self) -> bool {
        self.flags.contains(DefFlags::KNOWN)
    }

    /// Anonymous or record type.
    pub fn is_structural(&self) -> bool {
        self.flags.intersects(DefFlags::ANONYMOUS | DefFlags::RECORD)
    }

    pub fn is_tuple(&self) -> bool {
        self.flags.contains(DefFlags::TUPLE)
    }

    /// Look up a member by declared name.
    pub fn member_by_name(&self, name: Atom) -> Option<(u32, &MemberInfo)> {
        self.members
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == name)
            .map(|(i, m)| (i as u32, m))
    }

    /// Look up the members carrying a mapped name.
    pub fn members_by_mapping(&self, mapping: Atom) -> impl Iterator<Item = (u32, &MemberInfo)> {
        self.members
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.mapping == Some(mapping))
            .map(|(i, m)| (i as u32, m))
    }
}

// =============================================================================
// DefinitionStore
// =============================================================================

/// Thread-safe storage for type definitions.
///
/// Uses `DashMap` for concurrent access; definitions are shared as
/// `Arc<DefinitionInfo>` so lookups never hold a shard lock while the caller
/// walks members.
pub struct DefinitionStore {
    /// Unique instance ID for debugging
    instance_id: u64,

    definitions: DashMap<DefId, Arc<DefinitionInfo>>,

    /// Next available `DefId`
    next_id: AtomicU32,
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionStore {
    /// Create a new definition store.
    pub fn new() -> Self {
        let instance_id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::SeqCst);
        trace!(instance_id, "DefinitionStore::new - creating new instance");
        Self {
            instance_id,
            definitions: DashMap::new(),
            next_id: AtomicU32::new(DefId::FIRST_VALID),
        }
    }

    /// Unique id of this store; types from different stores never compare.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    fn allocate(&self) -> DefId {
        DefId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a new definition and return its `DefId`.
    pub fn register(&self, info: DefinitionInfo) -> DefId {
        let id = self.allocate();
        trace!(
            instance_id = self.instance_id,
            def_id = %id.0,
            kind = ?info.kind,
            "DefinitionStore::register"
        );
        self.definitions.insert(id, Arc::new(info));
        id
    }

    /// Replace a definition in place. Returns false when `id` is unknown.
    pub fn update(&self, id: DefId, f: impl FnOnce(&mut DefinitionInfo)) -> bool {
        let Some(mut entry) = self.definitions.get_mut(&id) else {
            return false;
        };
        f(Arc::make_mut(entry.value_mut()));
        true
    }

    /// Get definition info by `DefId`.
    pub fn get(&self, id: DefId) -> Option<Arc<DefinitionInfo>> {
        self.definitions.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Check if a `DefId` exists.
    pub fn contains(&self, id: DefId) -> bool {
        self.definitions.contains_key(&id)
    }

    pub fn get_kind(&self, id: DefId) -> Option<DefKind> {
        self.definitions.get(&id).map(|r| r.kind)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
#[path = "../tests/def_tests.rs"]
mod tests;
