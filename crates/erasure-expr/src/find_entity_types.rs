//! Find-Entity-Types analysis.
//!
//! Reports the entity types and the enums with mapped values that an
//! expression depends on, in first-encounter order. Types are discovered in
//! node types, member, constructor and method signatures (generic arguments
//! included), type operands, and the object graphs of constants (quoted
//! lambdas included).
//!
//! Known types are never reported but are still traversed, so entity types
//! reachable only through a known type are found.

use crate::expr::{Expr, MemberRef, MethodRef, ParameterExpr};
use crate::value::Value;
use crate::visitor::{ExprVisitor, walk_expr};
use erasure_types::metadata::{DataTypeKind, classify, is_entity_type, is_known_type, is_mapped_enum};
use erasure_types::{TypeData, TypeId, TypeInterner};
use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityTypeSet {
    /// Non-known entity types.
    pub entities: IndexSet<TypeId>,
    /// Enums whose values carry mapped names.
    pub enums: IndexSet<TypeId>,
}

impl EntityTypeSet {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.enums.is_empty()
    }
}

pub fn find_entity_types(interner: &TypeInterner, expr: &Expr) -> EntityTypeSet {
    let mut finder = EntityTypeFinder::new(interner);
    finder.visit_expr(expr);
    finder.result
}

/// Same analysis over a standalone value.
pub fn find_entity_types_in_value(interner: &TypeInterner, value: &Value) -> EntityTypeSet {
    let mut finder = EntityTypeFinder::new(interner);
    finder.add_value(value);
    finder.result
}

struct EntityTypeFinder<'a> {
    interner: &'a TypeInterner,
    result: EntityTypeSet,
    seen_types: FxHashSet<TypeId>,
    /// Objects, arrays and quotes already walked, by address.
    seen_values: FxHashSet<usize>,
}

impl<'a> EntityTypeFinder<'a> {
    fn new(interner: &'a TypeInterner) -> Self {
        EntityTypeFinder {
            interner,
            result: EntityTypeSet::default(),
            seen_types: FxHashSet::default(),
            seen_values: FxHashSet::default(),
        }
    }

    fn add_type(&mut self, ty: TypeId) {
        if !self.seen_types.insert(ty) {
            return;
        }
        let interner = self.interner;
        match interner.lookup(ty) {
            Some(TypeData::Array { element, .. } | TypeData::ByRef(element) | TypeData::Pointer(element)) => {
                self.add_type(element);
            }
            Some(TypeData::Definition(_) | TypeData::Generic { .. }) => {
                for &arg in interner.generic_args(ty).iter() {
                    self.add_type(arg);
                }
                if is_mapped_enum(interner, ty) {
                    trace!(ty = %interner.type_name(ty), "found mapped enum");
                    self.result.enums.insert(ty);
                    return;
                }
                let entity = is_entity_type(interner, ty);
                if entity && !is_known_type(interner, ty) {
                    trace!(ty = %interner.type_name(ty), "found entity type");
                    self.result.entities.insert(ty);
                }
                let structural = matches!(
                    classify(interner, ty),
                    DataTypeKind::Anonymous | DataTypeKind::Record
                );
                if entity || structural {
                    self.add_signature_types(ty);
                }
            }
            _ => {}
        }
    }

    /// Member and constructor parameter types of `ty`.
    fn add_signature_types(&mut self, ty: TypeId) {
        for member in self.interner.members_of(ty) {
            self.add_type(member.ty);
        }
        for ctor in self.interner.constructors_of(ty) {
            for param in ctor.params {
                self.add_type(param.ty);
            }
        }
    }

    fn add_value(&mut self, value: &Value) {
        match value {
            Value::Enum { ty, .. } => self.add_type(*ty),
            Value::Function(func) => self.add_type(func.ty),
            Value::Object(obj) => {
                if !self.seen_values.insert(obj.addr()) {
                    return;
                }
                self.add_type(obj.ty());
                for (_, field) in obj.fields() {
                    self.add_value(&field);
                }
            }
            Value::Array(arr) => {
                if !self.seen_values.insert(arr.addr()) {
                    return;
                }
                self.add_type(arr.ty());
                for item in arr.items() {
                    self.add_value(&item);
                }
            }
            Value::Quote(lambda) => {
                if self.seen_values.insert(Arc::as_ptr(lambda) as usize) {
                    walk_expr(self, lambda);
                }
            }
            Value::Closure(closure) => {
                if self.seen_values.insert(Arc::as_ptr(closure) as usize) {
                    self.add_type(closure.ty);
                    for param in &closure.params {
                        self.add_type(param.ty);
                    }
                    for value in closure.captured.values() {
                        self.add_value(value);
                    }
                    walk_expr(self, &closure.body);
                }
            }
            Value::Null
            | Value::Boolean(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Double(_)
            | Value::String(_) => {}
        }
    }
}

impl ExprVisitor for EntityTypeFinder<'_> {
    fn visit_type(&mut self, ty: TypeId) {
        self.add_type(ty);
    }

    fn visit_member(&mut self, member: &MemberRef) {
        self.add_type(member.declaring);
        if let Some(info) = self.interner.member(member.declaring, member.index) {
            self.add_type(info.ty);
        }
    }

    fn visit_method(&mut self, method: &MethodRef) {
        self.add_type(method.declaring);
        for &arg in &method.type_args {
            self.add_type(arg);
        }
        if let Some(info) = self
            .interner
            .method(method.declaring, method.index, &method.type_args)
        {
            for param in &info.params {
                self.add_type(param.ty);
            }
            self.add_type(info.ret);
        }
    }

    fn visit_constructor(&mut self, ty: TypeId, index: Option<u32>) {
        self.add_type(ty);
        if let Some(ctor) = index.and_then(|i| self.interner.constructor(ty, i)) {
            for param in ctor.params {
                self.add_type(param.ty);
            }
        }
    }

    fn visit_value(&mut self, value: &Value, ty: TypeId) {
        self.add_type(ty);
        self.add_value(value);
    }

    fn visit_parameter(&mut self, param: &ParameterExpr) {
        self.add_type(param.ty);
    }
}

#[cfg(test)]
#[path = "../tests/find_entity_types_tests.rs"]
mod tests;
