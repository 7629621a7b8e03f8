//! Constant conversion for the entity type substitutor.
//!
//! Object graphs held by constants are converted to the replacement types.
//! Shared objects stay shared and cycles are preserved: every converted
//! object is registered in the memo before its fields are converted, so a
//! back-reference finds the object under construction.
//!
//! Graphs that contain nothing to rewrite are returned unchanged. Once a
//! graph needs conversion, every object in it is copied.

use crate::error::ExprError;
use crate::find_entity_types::find_entity_types_in_value;
use crate::substitutor::EntityTypeSubstitutor;
use crate::value::{ArrayRef, ObjectRef, Value};
use erasure_common::Atom;
use erasure_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use erasure_types::metadata::{DataTypeKind, classify, is_mapped_enum, is_structural_type, mapped_members};
use erasure_types::{MemberKind, TypeId};
use std::sync::Arc;
use tracing::trace;

/// `(key, field, type)`: identity key, declared member name holding the
/// value, member type.
type FieldSlot = (Atom, Atom, TypeId);

impl EntityTypeSubstitutor<'_> {
    /// Convert a constant to the replacement types chosen by this
    /// substitutor.
    pub fn convert_constant(&mut self, value: &Value) -> Result<Value, ExprError> {
        if matches!(value, Value::Object(_) | Value::Array(_)) {
            let found = find_entity_types_in_value(self.interner, value);
            if found.entities.is_empty() && (found.enums.is_empty() || !self.options.erase_enums) {
                return Ok(value.clone());
            }
        }
        self.convert_value(value)
    }

    fn convert_value(&mut self, value: &Value) -> Result<Value, ExprError> {
        match value {
            Value::Null
            | Value::Boolean(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Double(_)
            | Value::String(_) => Ok(value.clone()),
            Value::Enum { ty, value: raw } => {
                if !self.options.erase_enums || !is_mapped_enum(self.interner, *ty) {
                    return Ok(value.clone());
                }
                let underlying = self.rewrite_type(*ty)?;
                if underlying == TypeId::INT64 {
                    return Ok(Value::Int64(*raw));
                }
                i32::try_from(*raw)
                    .map(Value::Int32)
                    .map_err(|_| ExprError::StructuralMismatch {
                        from: format!("{}.{raw}", self.interner.type_name(*ty)),
                        to: self.interner.type_name(underlying),
                    })
            }
            Value::Object(obj) => self.convert_object(obj),
            Value::Array(arr) => self.convert_array(arr),
            Value::Function(func) => {
                if self.rewrite_type(func.ty)? != func.ty {
                    return Err(ExprError::FunctionConstant {
                        ty: self.interner.type_name(func.ty),
                    });
                }
                Ok(value.clone())
            }
            Value::Closure(closure) => {
                // Captured values and the body count as well as the signature.
                let found = find_entity_types_in_value(self.interner, value);
                let depends =
                    !found.entities.is_empty() || (self.options.erase_enums && !found.enums.is_empty());
                if depends || self.rewrite_type(closure.ty)? != closure.ty {
                    return Err(ExprError::FunctionConstant {
                        ty: self.interner.type_name(closure.ty),
                    });
                }
                Ok(value.clone())
            }
            Value::Quote(lambda) => {
                let key = Arc::as_ptr(lambda) as usize;
                if let Some((_, done)) = self.quotes.get(&key) {
                    return Ok(Value::Quote(done.clone()));
                }
                let rewritten = Arc::new(self.rewrite_expr(lambda)?);
                self.quotes.insert(key, (lambda.clone(), rewritten.clone()));
                Ok(Value::Quote(rewritten))
            }
        }
    }

    fn enter_graph(&mut self) -> Result<(), ExprError> {
        if self.value_depth.enter() {
            Ok(())
        } else {
            Err(ExprError::DepthExceeded {
                what: "constant graph",
                limit: self.value_depth.max_depth(),
            })
        }
    }

    fn convert_object(&mut self, obj: &ObjectRef) -> Result<Value, ExprError> {
        if let Some((_, done)) = self.objects.get(&obj.addr()) {
            return Ok(done.clone());
        }
        self.enter_graph()?;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            let from = obj.ty();
            let to = self.rewrite_type(from)?;
            match classify(self.interner, from) {
                DataTypeKind::Entity => self.convert_entity(obj, to),
                DataTypeKind::Anonymous => self.convert_anonymous(obj, to),
                DataTypeKind::Record => self.convert_record(obj, to),
                DataTypeKind::Tuple => self.convert_tuple(obj, to),
                _ => self.copy_object(obj, to),
            }
        });
        self.value_depth.leave();
        result
    }

    fn convert_array(&mut self, arr: &ArrayRef) -> Result<Value, ExprError> {
        if let Some((_, done)) = self.objects.get(&arr.addr()) {
            return Ok(done.clone());
        }
        self.enter_graph()?;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            let to = self.rewrite_type(arr.ty())?;
            let converted = ArrayRef::new(to, Vec::new());
            self.objects
                .insert(arr.addr(), (Value::Array(arr.clone()), Value::Array(converted.clone())));
            let source = arr.items();
            let mut items = Vec::with_capacity(source.len());
            for item in &source {
                items.push(self.convert_value(item)?);
            }
            converted.set_items(items);
            Ok(Value::Array(converted))
        });
        self.value_depth.leave();
        result
    }

    /// Entity object to its replacement, by mapped name.
    pub fn convert_entity(&mut self, obj: &ObjectRef, to: TypeId) -> Result<Value, ExprError> {
        let source: Vec<FieldSlot> = mapped_members(self.interner, obj.ty())
            .into_iter()
            .filter_map(|(_, m)| m.mapping.map(|key| (key, m.name, m.ty)))
            .collect();
        if !is_structural_type(self.interner, to) {
            return Err(self.mismatch(obj, to));
        }
        self.convert_by_key(obj, &source, to)
    }

    pub fn convert_anonymous(&mut self, obj: &ObjectRef, to: TypeId) -> Result<Value, ExprError> {
        if !is_structural_type(self.interner, to) {
            return Err(self.mismatch(obj, to));
        }
        let source = self.shape_fields(obj.ty());
        self.convert_by_key(obj, &source, to)
    }

    pub fn convert_record(&mut self, obj: &ObjectRef, to: TypeId) -> Result<Value, ExprError> {
        if !is_structural_type(self.interner, to) {
            return Err(self.mismatch(obj, to));
        }
        let source = self.shape_fields(obj.ty());
        self.convert_by_key(obj, &source, to)
    }

    pub fn convert_tuple(&mut self, obj: &ObjectRef, to: TypeId) -> Result<Value, ExprError> {
        if classify(self.interner, to) != DataTypeKind::Tuple {
            return Err(self.mismatch(obj, to));
        }
        let source = self.shape_fields(obj.ty());
        self.convert_by_key(obj, &source, to)
    }

    fn mismatch(&self, obj: &ObjectRef, to: TypeId) -> ExprError {
        ExprError::StructuralMismatch {
            from: self.interner.type_name(obj.ty()),
            to: self.interner.type_name(to),
        }
    }

    fn shape_fields(&self, ty: TypeId) -> Vec<FieldSlot> {
        self.interner
            .members_of(ty)
            .into_iter()
            .filter(|m| !m.is_static && m.kind != MemberKind::Indexer)
            .map(|m| (m.mapping.unwrap_or(m.name), m.name, m.ty))
            .collect()
    }

    /// Copy `obj` into a new object of type `to`, matching fields by key.
    /// The two key sets must be equal.
    fn convert_by_key(&mut self, obj: &ObjectRef, source: &[FieldSlot], to: TypeId) -> Result<Value, ExprError> {
        let target = self.shape_fields(to);
        let same_keys = source.len() == target.len()
            && source
                .iter()
                .all(|(key, _, _)| target.iter().any(|(other, _, _)| other == key));
        if !same_keys {
            return Err(self.mismatch(obj, to));
        }

        trace!(
            from = %self.interner.type_name(obj.ty()),
            to = %self.interner.type_name(to),
            "converting constant object"
        );
        let converted = ObjectRef::new(to);
        self.objects
            .insert(obj.addr(), (Value::Object(obj.clone()), Value::Object(converted.clone())));
        for (key, field, ty) in target {
            let value = source
                .iter()
                .find(|(other, _, _)| *other == key)
                .and_then(|&(_, source_field, _)| obj.get(source_field))
                .unwrap_or_else(|| Value::default_for(self.interner, ty));
            let value = self.convert_value(&value)?;
            converted.set(field, value);
        }
        Ok(Value::Object(converted))
    }

    /// Objects of kept types: same fields, converted values.
    fn copy_object(&mut self, obj: &ObjectRef, to: TypeId) -> Result<Value, ExprError> {
        let converted = ObjectRef::new(to);
        self.objects
            .insert(obj.addr(), (Value::Object(obj.clone()), Value::Object(converted.clone())));
        for (field, value) in obj.fields() {
            let value = self.convert_value(&value)?;
            converted.set(field, value);
        }
        Ok(Value::Object(converted))
    }
}

#[cfg(test)]
#[path = "../tests/constants_tests.rs"]
mod tests;
