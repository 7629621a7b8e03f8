use super::*;
use crate::test_fixtures::{color, qux};

#[test]
fn test_default_values() {
    let interner = TypeInterner::new();
    let color = color(&interner);
    assert_eq!(Value::default_for(&interner, TypeId::INT32), Value::Int32(0));
    assert_eq!(Value::default_for(&interner, TypeId::INT64), Value::Int64(0));
    assert_eq!(Value::default_for(&interner, TypeId::BOOLEAN), Value::Boolean(false));
    assert_eq!(Value::default_for(&interner, TypeId::STRING), Value::Null);
    assert_eq!(
        Value::default_for(&interner, color),
        Value::Enum { ty: color, value: 0 }
    );
}

#[test]
fn test_object_equality_is_identity() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let a = ObjectRef::new(qux);
    let b = ObjectRef::new(qux);
    assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
    assert_ne!(Value::Object(a), Value::Object(b));
}

#[test]
fn test_shared_objects_see_mutation() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let baz = interner.intern_string("Baz");
    let obj = ObjectRef::new(qux);
    let alias = obj.clone();
    alias.set(baz, Value::Int32(7));
    assert_eq!(obj.get(baz), Some(Value::Int32(7)));
    assert_eq!(obj.get_mapped(&interner, "baz"), Some(Value::Int32(7)));
    assert_eq!(obj.get_mapped(&interner, "missing"), None);
}

#[test]
fn test_cyclic_object_debug_terminates() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let obj = ObjectRef::new(qux);
    obj.set(interner.intern_string("Self"), Value::Object(obj.clone()));
    let rendered = format!("{obj:?}");
    assert!(rendered.contains("1 fields"));
}

#[test]
fn test_runtime_types() {
    let interner = TypeInterner::new();
    let list = interner.list_of(TypeId::INT32);
    let arr = ArrayRef::new(list, vec![Value::Int32(1), Value::Int32(2)]);
    assert_eq!(Value::Null.runtime_type(&interner), None);
    assert_eq!(Value::string("x").runtime_type(&interner), Some(TypeId::STRING));
    assert_eq!(Value::Array(arr.clone()).runtime_type(&interner), Some(list));
    assert_eq!(arr.len(), 2);
    arr.push(Value::Int32(3));
    assert_eq!(arr.get(2), Some(Value::Int32(3)));
}

#[test]
fn test_integral_view() {
    assert_eq!(Value::Int32(-4).as_i64(), Some(-4));
    assert_eq!(Value::Enum { ty: TypeId::INT32, value: 9 }.as_i64(), Some(9));
    assert_eq!(Value::Double(1.5).as_i64(), None);
}
