//! Runtime values carried by constant nodes and produced by the evaluator.
//!
//! Objects and arrays are shared, mutable cells (`Arc<RwLock<_>>`), so a
//! constant can hold aliased and cyclic object graphs. Equality of
//! [`Value::Object`] and [`Value::Array`] is reference identity; structural
//! comparison of values is left to callers.

use crate::expr::{Expr, ParameterExpr};
use erasure_common::Atom;
use erasure_types::def::DefKind;
use erasure_types::{TypeId, TypeInterner};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(Arc<str>),
    /// Value of an enum type, by underlying integral value.
    Enum { ty: TypeId, value: i64 },
    Object(ObjectRef),
    /// Arrays and lists.
    Array(ArrayRef),
    /// Opaque compiled delegate.
    Function(FunctionValue),
    /// Quoted lambda.
    Quote(Arc<Expr>),
    /// Lambda evaluated by the interpreter.
    Closure(Arc<Closure>),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(Arc::from(s))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Dynamic type of the value; `None` for null.
    pub fn runtime_type(&self, interner: &TypeInterner) -> Option<TypeId> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => TypeId::BOOLEAN,
            Value::Int32(_) => TypeId::INT32,
            Value::Int64(_) => TypeId::INT64,
            Value::Double(_) => TypeId::DOUBLE,
            Value::String(_) => TypeId::STRING,
            Value::Enum { ty, .. } => *ty,
            Value::Object(obj) => obj.ty(),
            Value::Array(arr) => arr.ty(),
            Value::Function(func) => func.ty,
            Value::Quote(lambda) => interner.expression_of(lambda.ty()),
            Value::Closure(closure) => closure.ty,
        })
    }

    /// Default value of a location of type `ty`: zero for numbers and
    /// enums, `false` for `bool`, null otherwise.
    pub fn default_for(interner: &TypeInterner, ty: TypeId) -> Self {
        match ty {
            TypeId::BOOLEAN => Value::Boolean(false),
            TypeId::INT32 => Value::Int32(0),
            TypeId::INT64 => Value::Int64(0),
            TypeId::DOUBLE => Value::Double(0.0),
            _ if interner
                .definition_of(ty)
                .is_some_and(|info| info.kind == DefKind::Enum) =>
            {
                Value::Enum { ty, value: 0 }
            }
            _ => Value::Null,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Integral view of numbers and enums.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int32(v) => Some(i64::from(v)),
            Value::Int64(v) => Some(v),
            Value::Enum { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Enum { ty: t1, value: v1 }, Value::Enum { ty: t2, value: v2 }) => {
                t1 == t2 && v1 == v2
            }
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Quote(a), Value::Quote(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// =============================================================================
// Objects
// =============================================================================

/// Fields of an object, keyed by declared member name, in insertion order.
#[derive(Clone, Debug)]
pub struct ObjectData {
    pub ty: TypeId,
    pub fields: IndexMap<Atom, Value>,
}

/// Shared handle to a mutable object.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<ObjectData>>);

impl ObjectRef {
    pub fn new(ty: TypeId) -> Self {
        Self::with_fields(ty, IndexMap::new())
    }

    pub fn with_fields(ty: TypeId, fields: IndexMap<Atom, Value>) -> Self {
        ObjectRef(Arc::new(RwLock::new(ObjectData { ty, fields })))
    }

    fn read(&self) -> RwLockReadGuard<'_, ObjectData> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ObjectData> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ty(&self) -> TypeId {
        self.read().ty
    }

    pub fn get(&self, name: Atom) -> Option<Value> {
        self.read().fields.get(&name).cloned()
    }

    pub fn set(&self, name: Atom, value: Value) {
        self.write().fields.insert(name, value);
    }

    /// Snapshot of the fields.
    pub fn fields(&self) -> Vec<(Atom, Value)> {
        self.read()
            .fields
            .iter()
            .map(|(&name, value)| (name, value.clone()))
            .collect()
    }

    /// Field of the member whose mapped name is `mapping`.
    pub fn get_mapped(&self, interner: &TypeInterner, mapping: &str) -> Option<Value> {
        let mapping = interner.intern_string(mapping);
        let member = interner
            .members_of(self.ty())
            .into_iter()
            .find(|m| m.mapping == Some(mapping))?;
        self.get(member.name)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity key, stable while the object is alive.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fields are not printed: object graphs may be cyclic.
        let data = self.read();
        write!(
            f,
            "Object(#{:x}, type {}, {} fields)",
            self.addr(),
            data.ty.0,
            data.fields.len()
        )
    }
}

// =============================================================================
// Arrays and lists
// =============================================================================

#[derive(Clone, Debug)]
pub struct ArrayData {
    /// Array or `List<T>` type.
    pub ty: TypeId,
    pub items: Vec<Value>,
}

/// Shared handle to a mutable array or list.
#[derive(Clone)]
pub struct ArrayRef(Arc<RwLock<ArrayData>>);

impl ArrayRef {
    pub fn new(ty: TypeId, items: Vec<Value>) -> Self {
        ArrayRef(Arc::new(RwLock::new(ArrayData { ty, items })))
    }

    fn read(&self) -> RwLockReadGuard<'_, ArrayData> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ArrayData> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ty(&self) -> TypeId {
        self.read().ty
    }

    pub fn items(&self) -> Vec<Value> {
        self.read().items.clone()
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.read().items.get(index).cloned()
    }

    pub fn push(&self, value: Value) {
        self.write().items.push(value);
    }

    pub fn set_items(&self, items: Vec<Value>) {
        self.write().items = items;
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        write!(
            f,
            "Array(#{:x}, type {}, {} items)",
            self.addr(),
            data.ty.0,
            data.items.len()
        )
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Compiled delegate the rewriter cannot look into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionValue {
    pub ty: TypeId,
    pub name: Arc<str>,
}

impl FunctionValue {
    pub fn new(ty: TypeId, name: &str) -> Self {
        FunctionValue {
            ty,
            name: Arc::from(name),
        }
    }
}

/// Lambda closed over the parameters bound when it was evaluated.
#[derive(Debug)]
pub struct Closure {
    pub ty: TypeId,
    pub params: Vec<ParameterExpr>,
    pub body: Arc<Expr>,
    pub captured: FxHashMap<u32, Value>,
}

#[cfg(test)]
#[path = "../tests/value_tests.rs"]
mod tests;
