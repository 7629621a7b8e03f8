use super::*;
use crate::def::DefinitionInfo;

#[test]
fn test_same_system_equality() {
    let interner = Arc::new(TypeInterner::new());
    let a = HostType::new(Arc::clone(&interner), TypeId::STRING);
    let b = HostType::new(Arc::clone(&interner), TypeId::STRING);
    let c = HostType::new(Arc::clone(&interner), TypeId::INT32);
    assert_eq!(a.equals(&b), Ok(true));
    assert_eq!(a.equals(&c), Ok(false));
    assert_eq!(a.display_name(), "string");
    assert_eq!(a.system_id(), interner.system_id());
}

#[test]
fn test_cross_system_is_an_error() {
    let left = Arc::new(TypeInterner::new());
    let right = Arc::new(TypeInterner::new());
    let a = HostType::new(left, TypeId::STRING);
    let b = HostType::new(right, TypeId::STRING);

    let err = a.equals(&b).expect_err("different systems");
    assert!(matches!(err, TypeError::CrossSystem { .. }));
    assert!(a.is_assignable_to(&b).is_err());
}

#[test]
fn test_assignability_through_capability() {
    let interner = Arc::new(TypeInterner::new());
    let base = interner.define(DefinitionInfo::class(interner.intern_string("Base")));
    let derived = interner.define(
        DefinitionInfo::class(interner.intern_string("Derived")).with_base(base),
    );
    let derived = HostType::new(Arc::clone(&interner), derived);
    let base = HostType::new(Arc::clone(&interner), base);
    assert_eq!(derived.is_assignable_to(&base), Ok(true));
    assert_eq!(base.is_assignable_to(&derived), Ok(false));
}

#[test]
fn test_debug_shows_type_name() {
    let interner = Arc::new(TypeInterner::new());
    let list = HostType::new(Arc::clone(&interner), interner.list_of(TypeId::INT32));
    let rendered = format!("{list:?}");
    assert!(rendered.contains("List<int>"), "{rendered}");
}
