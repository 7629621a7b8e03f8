//! Expression tree.
//!
//! Nodes are immutable values; rewriting builds a new tree. Every node knows
//! its static type ([`Expr::ty`]). Members, constructors and methods are
//! referenced by `(declaring type, index)` into the metadata of the
//! [`TypeInterner`](erasure_types::TypeInterner) the tree was built against.

use crate::value::Value;
use erasure_types::TypeId;
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_PARAMETER_ID: AtomicU32 = AtomicU32::new(1);

/// Lambda parameter. Identity is the `id`; two parameters with the same name
/// are different variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterExpr {
    pub id: u32,
    pub name: Arc<str>,
    pub ty: TypeId,
}

impl ParameterExpr {
    /// Create a parameter with a fresh identity.
    pub fn new(name: &str, ty: TypeId) -> Self {
        ParameterExpr {
            id: NEXT_PARAMETER_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
            ty,
        }
    }

    /// Fresh parameter with the same name and a new type.
    pub fn retyped(&self, ty: TypeId) -> Self {
        ParameterExpr {
            id: NEXT_PARAMETER_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name.clone(),
            ty,
        }
    }
}

/// Property, field or indexer `index` of `declaring`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub declaring: TypeId,
    pub index: u32,
}

impl MemberRef {
    pub fn new(declaring: TypeId, index: u32) -> Self {
        MemberRef { declaring, index }
    }
}

/// Method `index` of `declaring`, with its generic method arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub declaring: TypeId,
    pub index: u32,
    pub type_args: SmallVec<[TypeId; 2]>,
}

impl MethodRef {
    pub fn new(declaring: TypeId, index: u32) -> Self {
        MethodRef {
            declaring,
            index,
            type_args: SmallVec::new(),
        }
    }

    pub fn generic(declaring: TypeId, index: u32, type_args: &[TypeId]) -> Self {
        MethodRef {
            declaring,
            index,
            type_args: SmallVec::from_slice(type_args),
        }
    }
}

/// Object construction.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExpr {
    pub ty: TypeId,
    /// Constructor index; `None` for the implicit parameterless constructor.
    pub constructor: Option<u32>,
    pub args: Vec<Expr>,
    /// Members initialized by the arguments, positionally. Present for
    /// constructions of anonymous and generated types.
    pub members: Option<Vec<u32>>,
}

impl NewExpr {
    /// `new T()` through the implicit parameterless constructor.
    pub fn default_of(ty: TypeId) -> Self {
        NewExpr {
            ty,
            constructor: None,
            args: Vec::new(),
            members: None,
        }
    }
}

/// One `Add` call of a list initializer.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementInit {
    pub add_method: MethodRef,
    pub args: Vec<Expr>,
}

/// Member initializer inside a `MemberInit` node.
#[derive(Clone, Debug, PartialEq)]
pub enum MemberBinding {
    /// `Member = value`
    Assignment { member: MemberRef, value: Expr },
    /// `Member = { nested bindings }` on the existing member value.
    Member {
        member: MemberRef,
        bindings: Vec<MemberBinding>,
    },
    /// `Member = { a, b }` through the collection's `Add` method.
    List {
        member: MemberRef,
        initializers: Vec<ElementInit>,
    },
}

impl MemberBinding {
    pub fn member(&self) -> MemberRef {
        match self {
            MemberBinding::Assignment { member, .. }
            | MemberBinding::Member { member, .. }
            | MemberBinding::List { member, .. } => *member,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    AndAlso,
    OrElse,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 9] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Equal,
        BinaryOp::NotEqual,
        BinaryOp::LessThan,
        BinaryOp::GreaterThan,
        BinaryOp::AndAlso,
        BinaryOp::OrElse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Equal => "equal",
            BinaryOp::NotEqual => "notEqual",
            BinaryOp::LessThan => "lessThan",
            BinaryOp::GreaterThan => "greaterThan",
            BinaryOp::AndAlso => "andAlso",
            BinaryOp::OrElse => "orElse",
        }
    }

    pub fn from_name(name: &str) -> Option<BinaryOp> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Constant {
        value: Value,
        ty: TypeId,
    },
    Parameter(ParameterExpr),
    /// Member access; `target` is `None` for static members.
    Member {
        target: Option<Box<Expr>>,
        member: MemberRef,
        ty: TypeId,
    },
    Call {
        target: Option<Box<Expr>>,
        method: MethodRef,
        args: Vec<Expr>,
        ty: TypeId,
    },
    New(NewExpr),
    MemberInit {
        new: NewExpr,
        bindings: Vec<MemberBinding>,
    },
    ListInit {
        new: NewExpr,
        initializers: Vec<ElementInit>,
    },
    Lambda {
        params: Vec<ParameterExpr>,
        body: Box<Expr>,
        ty: TypeId,
    },
    Invoke {
        target: Box<Expr>,
        args: Vec<Expr>,
        ty: TypeId,
    },
    Convert {
        operand: Box<Expr>,
        ty: TypeId,
    },
    /// `operand is test`
    TypeIs {
        operand: Box<Expr>,
        test: TypeId,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: TypeId,
    },
}

impl Expr {
    /// Static type of the node.
    pub fn ty(&self) -> TypeId {
        match self {
            Expr::Constant { ty, .. }
            | Expr::Member { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::Lambda { ty, .. }
            | Expr::Invoke { ty, .. }
            | Expr::Convert { ty, .. }
            | Expr::Binary { ty, .. } => *ty,
            Expr::Parameter(param) => param.ty,
            Expr::New(new) | Expr::MemberInit { new, .. } | Expr::ListInit { new, .. } => new.ty,
            Expr::TypeIs { .. } => TypeId::BOOLEAN,
        }
    }

    /// Short node kind name, as written by the codec.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Constant { .. } => "constant",
            Expr::Parameter(_) => "parameter",
            Expr::Member { .. } => "member",
            Expr::Call { .. } => "call",
            Expr::New(_) => "new",
            Expr::MemberInit { .. } => "memberInit",
            Expr::ListInit { .. } => "listInit",
            Expr::Lambda { .. } => "lambda",
            Expr::Invoke { .. } => "invoke",
            Expr::Convert { .. } => "convert",
            Expr::TypeIs { .. } => "typeIs",
            Expr::Binary { .. } => "binary",
        }
    }

    pub fn constant(value: Value, ty: TypeId) -> Self {
        Expr::Constant { value, ty }
    }

    pub fn parameter(param: &ParameterExpr) -> Self {
        Expr::Parameter(param.clone())
    }
}

#[cfg(test)]
#[path = "../tests/expr_tests.rs"]
mod tests;
