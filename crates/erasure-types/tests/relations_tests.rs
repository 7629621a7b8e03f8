use super::*;
use crate::def::DefinitionInfo;
use crate::types::EnumValueInfo;

fn class(interner: &TypeInterner, name: &str) -> TypeId {
    interner.define(DefinitionInfo::class(interner.intern_string(name)))
}

#[test]
fn test_reference_types() {
    let interner = TypeInterner::new();
    let shape = class(&interner, "Shape");
    let point = interner.define(DefinitionInfo::structure(interner.intern_string("Point")));
    assert!(is_reference_type(&interner, TypeId::STRING));
    assert!(is_reference_type(&interner, TypeId::OBJECT));
    assert!(is_reference_type(&interner, shape));
    assert!(is_reference_type(&interner, interner.array(TypeId::INT32)));
    assert!(!is_reference_type(&interner, TypeId::INT32));
    assert!(!is_reference_type(&interner, point));
}

#[test]
fn test_object_is_top() {
    let interner = TypeInterner::new();
    assert!(is_assignable(&interner, TypeId::INT32, TypeId::OBJECT));
    assert!(is_assignable(&interner, class(&interner, "A"), TypeId::OBJECT));
    assert!(!is_assignable(&interner, TypeId::VOID, TypeId::OBJECT));
    assert!(!is_assignable(&interner, interner.by_ref(TypeId::INT32), TypeId::OBJECT));
    assert!(!is_assignable(&interner, TypeId::OBJECT, TypeId::STRING));
}

#[test]
fn test_base_classes() {
    let interner = TypeInterner::new();
    let base = class(&interner, "Base");
    let derived = interner.define(
        DefinitionInfo::class(interner.intern_string("Derived")).with_base(base),
    );
    assert!(is_assignable(&interner, derived, base));
    assert!(!is_assignable(&interner, base, derived));

    assert!(is_assignable(&interner, interner.array(derived), interner.array(base)));
    assert!(!is_assignable(
        &interner,
        interner.array(derived),
        interner.array_of_rank(base, 2)
    ));
}

#[test]
fn test_value_arrays_are_invariant() {
    let interner = TypeInterner::new();
    assert!(!is_assignable(
        &interner,
        interner.array(TypeId::INT32),
        interner.array(TypeId::OBJECT)
    ));
    assert!(is_assignable(
        &interner,
        interner.array(TypeId::STRING),
        interner.array(TypeId::OBJECT)
    ));
}

#[test]
fn test_generic_variance() {
    let interner = TypeInterner::new();
    let strings = interner.list_of(TypeId::STRING);
    assert!(is_assignable(&interner, strings, interner.enumerable_of(TypeId::STRING)));
    assert!(is_assignable(&interner, strings, interner.enumerable_of(TypeId::OBJECT)));
    assert!(!is_assignable(&interner, strings, interner.list_of(TypeId::OBJECT)));
    assert!(!is_assignable(
        &interner,
        interner.list_of(TypeId::INT32),
        interner.enumerable_of(TypeId::OBJECT)
    ));

    let source = interner
        .func(&[TypeId::OBJECT], TypeId::STRING)
        .expect("Func<,>");
    let target = interner
        .func(&[TypeId::STRING], TypeId::OBJECT)
        .expect("Func<,>");
    assert!(is_assignable(&interner, source, target));
    assert!(!is_assignable(&interner, target, source));
}

#[test]
fn test_enums_have_no_parents() {
    let interner = TypeInterner::new();
    let color = interner.define(DefinitionInfo::enumeration(
        interner.intern_string("Color"),
        vec![EnumValueInfo::new(interner.intern_string("Red"), 0)],
    ));
    assert!(!is_assignable(&interner, color, TypeId::INT32));
    assert!(is_assignable(&interner, color, TypeId::OBJECT));
}

#[test]
fn test_cyclic_declarations_terminate() {
    let interner = TypeInterner::new();
    let first = interner.define(DefinitionInfo::interface(interner.intern_string("IFirst")));
    let second = interner.define(
        DefinitionInfo::interface(interner.intern_string("ISecond")).with_interfaces(vec![first]),
    );
    let first_def = interner.def_id_of(first).expect("declared");
    interner.update_definition(first_def, |info| info.interfaces.push(second));

    let unrelated = class(&interner, "Unrelated");
    assert!(is_assignable(&interner, first, second));
    assert!(!is_assignable(&interner, first, unrelated));
}
