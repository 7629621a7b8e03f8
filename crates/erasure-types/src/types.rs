//! Type representation for the structural type model.
//!
//! Types are interned into a [`TypeInterner`](crate::TypeInterner) and handled
//! through lightweight [`TypeId`] values. The shape of a type is described by
//! [`TypeData`]; declared types (classes, structs, enums, delegates, generated
//! structural types) point at a [`DefinitionInfo`](crate::DefinitionInfo)
//! through a [`DefId`].
//!
//! Shapes are mutually exclusive:
//!
//! | Shape | `TypeData` | Example |
//! |-------|------------|---------|
//! | Simple | `Intrinsic`, non-generic `Definition` | `int`, `Person` |
//! | Open generic | generic `Definition` | `List<>` |
//! | Closed generic | `Generic` | `List<Person>` |
//! | Generic parameter | `GenericParameter` | `T` in `List<T>` |
//! | Array | `Array` | `int[]`, `int[,]` |
//! | By-ref | `ByRef` | `int&` |
//! | Pointer | `Pointer` | `int*` |
//! | Wildcard | `Wildcard` | unification variable |

use crate::def::DefId;
use erasure_common::Atom;
use serde::{Deserialize, Serialize};

// =============================================================================
// TypeId
// =============================================================================

/// Interned handle of a type. Equality of handles is identity of types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const OBJECT: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const BOOLEAN: TypeId = TypeId(2);
    pub const INT32: TypeId = TypeId(3);
    pub const INT64: TypeId = TypeId(4);
    pub const DOUBLE: TypeId = TypeId(5);
    pub const STRING: TypeId = TypeId(6);

    /// First id handed out for non-intrinsic types.
    pub const FIRST_USER: u32 = 7;

    /// Whether this id names one of the pre-interned intrinsic types.
    #[inline]
    pub const fn is_intrinsic(self) -> bool {
        self.0 < Self::FIRST_USER
    }
}

/// Built-in primitive types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntrinsicKind {
    Object,
    Void,
    Boolean,
    Int32,
    Int64,
    Double,
    String,
}

impl IntrinsicKind {
    /// All intrinsics in `TypeId` order.
    pub const ALL: [IntrinsicKind; 7] = [
        IntrinsicKind::Object,
        IntrinsicKind::Void,
        IntrinsicKind::Boolean,
        IntrinsicKind::Int32,
        IntrinsicKind::Int64,
        IntrinsicKind::Double,
        IntrinsicKind::String,
    ];

    pub const fn type_id(self) -> TypeId {
        match self {
            IntrinsicKind::Object => TypeId::OBJECT,
            IntrinsicKind::Void => TypeId::VOID,
            IntrinsicKind::Boolean => TypeId::BOOLEAN,
            IntrinsicKind::Int32 => TypeId::INT32,
            IntrinsicKind::Int64 => TypeId::INT64,
            IntrinsicKind::Double => TypeId::DOUBLE,
            IntrinsicKind::String => TypeId::STRING,
        }
    }

    /// Display name used by the formatter.
    pub const fn name(self) -> &'static str {
        match self {
            IntrinsicKind::Object => "object",
            IntrinsicKind::Void => "void",
            IntrinsicKind::Boolean => "bool",
            IntrinsicKind::Int32 => "int",
            IntrinsicKind::Int64 => "long",
            IntrinsicKind::Double => "double",
            IntrinsicKind::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<IntrinsicKind> {
        IntrinsicKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Value types are copied, never aliased.
    pub const fn is_value_type(self) -> bool {
        matches!(
            self,
            IntrinsicKind::Boolean
                | IntrinsicKind::Int32
                | IntrinsicKind::Int64
                | IntrinsicKind::Double
        )
    }
}

/// Interned list of types (generic arguments).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeListId(pub u32);

/// Identity of a wildcard (unification variable).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WildcardId(pub u32);

/// Array flavour. A vector (`T[]`) and a one-dimensional multi-dimensional
/// array (`T[*]`) are different types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArrayRank {
    Vector,
    Multi(u8),
}

impl ArrayRank {
    pub const fn rank(self) -> u8 {
        match self {
            ArrayRank::Vector => 1,
            ArrayRank::Multi(rank) => rank,
        }
    }

    pub const fn is_vector(self) -> bool {
        matches!(self, ArrayRank::Vector)
    }
}

/// Declaration that introduces a generic parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamOwner {
    /// Parameter of a generic type definition.
    Type(DefId),
    /// Parameter of a generic method (`index` into the declaring type's methods).
    Method { declaring: DefId, index: u32 },
}

// =============================================================================
// TypeData
// =============================================================================

/// Structural description of an interned type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Intrinsic(IntrinsicKind),
    /// A declared type. Generic definitions (type parameters present) are
    /// open generic types.
    Definition(DefId),
    /// Closed generic type.
    Generic {
        definition: DefId,
        args: TypeListId,
    },
    GenericParameter {
        owner: ParamOwner,
        position: u32,
    },
    Array {
        element: TypeId,
        rank: ArrayRank,
    },
    ByRef(TypeId),
    Pointer(TypeId),
    Wildcard(WildcardId),
}

/// Shape category of a type, as used by the comparators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeShape {
    Simple,
    Array,
    GenericClosed,
    GenericOpen,
    GenericParameter,
    ByRef,
    Pointer,
    Wildcard,
}

// =============================================================================
// Declaration metadata
// =============================================================================

/// Variance of a generic parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variance {
    #[default]
    Invariant,
    /// `out T`
    Covariant,
    /// `in T`
    Contravariant,
}

/// Generic parameter declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParamInfo {
    pub name: Atom,
    pub variance: Variance,
}

impl TypeParamInfo {
    pub fn new(name: Atom) -> Self {
        TypeParamInfo {
            name,
            variance: Variance::Invariant,
        }
    }

    pub fn with_variance(name: Atom, variance: Variance) -> Self {
        TypeParamInfo { name, variance }
    }
}

/// Member flavour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Property,
    Field,
    /// Parameterized property. Never part of a structural shape.
    Indexer,
}

/// A property, field or indexer on a declared type.
///
/// `mapping` carries the externally visible mapped name. It is the identity
/// key of the member for structural comparison and for rewriting; the
/// declared `name` is only used by the host.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberInfo {
    pub name: Atom,
    pub ty: TypeId,
    pub kind: MemberKind,
    pub mapping: Option<Atom>,
    pub writable: bool,
    pub is_static: bool,
}

impl MemberInfo {
    pub fn property(name: Atom, ty: TypeId) -> Self {
        MemberInfo {
            name,
            ty,
            kind: MemberKind::Property,
            mapping: None,
            writable: true,
            is_static: false,
        }
    }

    pub fn field(name: Atom, ty: TypeId) -> Self {
        MemberInfo {
            kind: MemberKind::Field,
            ..MemberInfo::property(name, ty)
        }
    }

    pub fn indexer(name: Atom, ty: TypeId) -> Self {
        MemberInfo {
            kind: MemberKind::Indexer,
            ..MemberInfo::property(name, ty)
        }
    }

    /// Attach a mapped name.
    pub fn mapped(mut self, mapping: Atom) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// Constructor or method parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamInfo {
    pub name: Atom,
    pub ty: TypeId,
    pub mapping: Option<Atom>,
}

impl ParamInfo {
    pub fn new(name: Atom, ty: TypeId) -> Self {
        ParamInfo {
            name,
            ty,
            mapping: None,
        }
    }

    pub fn mapped(mut self, mapping: Atom) -> Self {
        self.mapping = Some(mapping);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ConstructorInfo {
    pub params: Vec<ParamInfo>,
}

impl ConstructorInfo {
    pub fn new(params: Vec<ParamInfo>) -> Self {
        ConstructorInfo { params }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    pub name: Atom,
    pub type_params: Vec<TypeParamInfo>,
    pub params: Vec<ParamInfo>,
    pub ret: TypeId,
    pub is_static: bool,
    pub mapping: Option<Atom>,
}

impl MethodInfo {
    pub fn new(name: Atom, params: Vec<ParamInfo>, ret: TypeId) -> Self {
        MethodInfo {
            name,
            type_params: Vec::new(),
            params,
            ret,
            is_static: false,
            mapping: None,
        }
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValueInfo {
    pub name: Atom,
    pub value: i64,
    pub mapping: Option<Atom>,
}

impl EnumValueInfo {
    pub fn new(name: Atom, value: i64) -> Self {
        EnumValueInfo {
            name,
            value,
            mapping: None,
        }
    }

    pub fn mapped(mut self, mapping: Atom) -> Self {
        self.mapping = Some(mapping);
        self
    }
}

/// Invoke signature of a delegate type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DelegateSignature {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod tests;
