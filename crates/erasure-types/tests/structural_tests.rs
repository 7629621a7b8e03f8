use super::*;
use crate::compare::TypeEqualityComparator;
use crate::def::DefinitionInfo;
use crate::types::MemberInfo;

fn declare(interner: &TypeInterner, name: &str, flavour: DefFlags) -> TypeId {
    interner.define(
        DefinitionInfo::class(interner.intern_string(name))
            .with_flags(DefFlags::GENERATED | flavour),
    )
}

fn set_members(interner: &TypeInterner, ty: TypeId, members: &[(&str, TypeId)]) {
    let def = interner.def_id_of(ty).expect("declared type");
    let members: Vec<MemberInfo> = members
        .iter()
        .map(|&(name, member_ty)| MemberInfo::property(interner.intern_string(name), member_ty))
        .collect();
    assert!(interner.update_definition(def, |info| info.members = members));
}

fn shape(interner: &TypeInterner, name: &str, flavour: DefFlags, members: &[(&str, TypeId)]) -> TypeId {
    let ty = declare(interner, name, flavour);
    set_members(interner, ty, members);
    ty
}

#[test]
fn test_self_referential_type_equals_itself() {
    let interner = TypeInterner::new();
    let s = declare(&interner, "S", DefFlags::RECORD);
    set_members(&interner, s, &[("Self", s), ("Value", TypeId::INT32)]);

    let mut comparer = StructuralTypeComparator::new(&interner);
    assert!(comparer.equals(s, s));
}

#[test]
fn test_mutually_recursive_types_are_structurally_equal() {
    let interner = TypeInterner::new();
    let a = declare(&interner, "A", DefFlags::RECORD);
    let b = declare(&interner, "B", DefFlags::RECORD);
    set_members(&interner, a, &[("Self", a), ("Copy", b)]);
    set_members(&interner, b, &[("Self", b), ("Copy", a)]);

    let mut comparer = StructuralTypeComparator::new(&interner);
    assert!(comparer.equals(a, b));
    assert!(comparer.equals(b, a));

    let mut baseline = TypeEqualityComparator::new(&interner);
    assert!(!baseline.equals(a, b));
    assert!(!baseline.equals(b, a));
}

#[test]
fn test_structurally_equal_types_hash_equal() {
    let interner = TypeInterner::new();
    let a = shape(&interner, "A", DefFlags::ANONYMOUS, &[("x", TypeId::INT32), ("y", TypeId::STRING)]);
    let b = shape(&interner, "B", DefFlags::ANONYMOUS, &[("y", TypeId::STRING), ("x", TypeId::INT32)]);

    let mut comparer = StructuralTypeComparator::new(&interner);
    assert!(comparer.equals(a, b));
    assert_eq!(comparer.hash(a), comparer.hash(b));

    let list_a = interner.list_of(a);
    let list_b = interner.list_of(b);
    assert!(comparer.equals(list_a, list_b));
    assert_eq!(comparer.hash(list_a), comparer.hash(list_b));
}

#[test]
fn test_member_type_mismatch_is_unequal() {
    let interner = TypeInterner::new();
    let a = shape(&interner, "A", DefFlags::ANONYMOUS, &[("Other", TypeId::INT32)]);
    let b = shape(&interner, "B", DefFlags::ANONYMOUS, &[("Other", TypeId::STRING)]);

    let mut comparer = StructuralTypeComparator::new(&interner);
    assert!(!comparer.equals(a, b));
    assert!(!comparer.equals(b, a));
}

#[test]
fn test_failed_comparison_does_not_poison_later_ones() {
    let interner = TypeInterner::new();
    let a = shape(&interner, "A", DefFlags::ANONYMOUS, &[("Other", TypeId::INT32)]);
    let b = shape(&interner, "B", DefFlags::ANONYMOUS, &[("Other", TypeId::STRING)]);
    let c = shape(&interner, "C", DefFlags::ANONYMOUS, &[("Other", TypeId::INT32)]);

    let mut comparer = StructuralTypeComparator::new(&interner);
    // equals_type keeps the in-flight map between calls; only rollback
    // removes the failed tentative mapping a -> b.
    assert!(!comparer.equals_type(a, b));
    assert!(comparer.in_flight().is_empty());
    assert!(comparer.equals_type(a, c));
}

#[test]
fn test_nested_failure_rolls_back_shared_child() {
    let interner = TypeInterner::new();
    let child_int = shape(&interner, "ChildInt", DefFlags::ANONYMOUS, &[("Other", TypeId::INT32)]);
    let child_str = shape(&interner, "ChildStr", DefFlags::ANONYMOUS, &[("Other", TypeId::STRING)]);
    let child_int2 = shape(&interner, "ChildInt2", DefFlags::ANONYMOUS, &[("Other", TypeId::INT32)]);
    let left = shape(&interner, "Left", DefFlags::ANONYMOUS, &[("Child", child_int)]);
    let wrong = shape(&interner, "Wrong", DefFlags::ANONYMOUS, &[("Child", child_str)]);
    let right = shape(&interner, "Right", DefFlags::ANONYMOUS, &[("Child", child_int2)]);

    let mut comparer = StructuralTypeComparator::new(&interner);
    assert!(!comparer.equals_type(left, wrong));
    assert!(comparer.equals_type(child_int, child_int2));
    assert!(comparer.equals_type(left, right));
}

#[test]
fn test_extra_member_is_unequal() {
    let interner = TypeInterner::new();
    let a = shape(&interner, "A", DefFlags::ANONYMOUS, &[("x", TypeId::INT32)]);
    let b = shape(
        &interner,
        "B",
        DefFlags::ANONYMOUS,
        &[("x", TypeId::INT32), ("y", TypeId::INT32)],
    );

    let mut comparer = StructuralTypeComparator::new(&interner);
    assert!(!comparer.equals(a, b));
    assert!(!comparer.equals(b, a));
}

#[test]
fn test_anonymous_and_record_are_not_comparable() {
    let interner = TypeInterner::new();
    let a = shape(&interner, "A", DefFlags::ANONYMOUS, &[("x", TypeId::INT32)]);
    let r = shape(&interner, "R", DefFlags::RECORD, &[("x", TypeId::INT32)]);

    assert!(!are_structurally_comparable(&interner, a, r));
    assert!(!are_structurally_comparable(&interner, r, a));
    let mut comparer = StructuralTypeComparator::new(&interner);
    assert!(!comparer.equals(a, r));
}

#[test]
fn test_mapped_names_are_member_keys() {
    let interner = TypeInterner::new();
    let a = declare(&interner, "A", DefFlags::ANONYMOUS);
    let b = declare(&interner, "B", DefFlags::ANONYMOUS);
    let key = interner.intern_string("key");
    let a_def = interner.def_id_of(a).expect("declared");
    let b_def = interner.def_id_of(b).expect("declared");
    interner.update_definition(a_def, |info| {
        info.members = vec![MemberInfo::property(interner.intern_string("First"), TypeId::INT32).mapped(key)];
    });
    interner.update_definition(b_def, |info| {
        info.members = vec![MemberInfo::property(interner.intern_string("Second"), TypeId::INT32).mapped(key)];
    });

    let mut comparer = StructuralTypeComparator::new(&interner);
    assert!(comparer.equals(a, b));
}

#[test]
fn test_substituting_comparer_records_binding_to_defining() {
    let interner = TypeInterner::new();
    let defining = declare(&interner, "Defining", DefFlags::RECORD);
    let binding = declare(&interner, "Binding", DefFlags::RECORD);
    set_members(&interner, defining, &[("Next", defining), ("Value", TypeId::STRING)]);
    set_members(&interner, binding, &[("Next", binding), ("Value", TypeId::STRING)]);

    let mut comparer = StructuralSubstitutingComparator::new(&interner);
    assert_eq!(comparer.try_equals(defining, binding), Ok(true));
    assert_eq!(comparer.substitutions().get(&binding), Some(&defining));
    assert_eq!(comparer.substitutions().len(), 1);
}

#[test]
fn test_substituting_comparer_identity_records_nothing() {
    let interner = TypeInterner::new();
    let a = shape(&interner, "A", DefFlags::ANONYMOUS, &[("x", TypeId::INT32)]);

    let mut comparer = StructuralSubstitutingComparator::new(&interner);
    assert_eq!(comparer.try_equals(a, a), Ok(true));
    assert!(comparer.substitutions().is_empty());
}

#[test]
fn test_substituting_comparer_rejects_second_defining_type() {
    let interner = TypeInterner::new();
    let first = shape(&interner, "First", DefFlags::ANONYMOUS, &[("x", TypeId::INT32)]);
    let second = shape(&interner, "Second", DefFlags::ANONYMOUS, &[("x", TypeId::INT32)]);
    let binding = shape(&interner, "Binding", DefFlags::ANONYMOUS, &[("x", TypeId::INT32)]);

    let mut comparer = StructuralSubstitutingComparator::new(&interner);
    assert_eq!(comparer.try_equals(first, binding), Ok(true));

    let err = comparer
        .try_equals(second, binding)
        .expect_err("binding already mapped to First");
    match err {
        TypeError::SubstitutionConflict {
            binding,
            existing,
            incoming,
        } => {
            assert_eq!(binding, "Binding");
            assert_eq!(existing, "First");
            assert_eq!(incoming, "Second");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!comparer.equals(second, binding));
}

#[test]
fn test_substituting_comparer_drops_matches_of_failed_comparison() {
    let interner = TypeInterner::new();
    let inner = shape(&interner, "Inner", DefFlags::ANONYMOUS, &[("v", TypeId::INT32)]);
    let other_inner = shape(&interner, "OtherInner", DefFlags::ANONYMOUS, &[("v", TypeId::INT32)]);
    let binding_inner = shape(&interner, "BindingInner", DefFlags::ANONYMOUS, &[("v", TypeId::INT32)]);
    let outer = shape(
        &interner,
        "Outer",
        DefFlags::ANONYMOUS,
        &[("inner", inner), ("label", TypeId::INT32)],
    );
    let binding_outer = shape(
        &interner,
        "BindingOuter",
        DefFlags::ANONYMOUS,
        &[("inner", binding_inner), ("label", TypeId::STRING)],
    );

    let mut comparer = StructuralSubstitutingComparator::new(&interner);
    // `inner` matches before `label` fails.
    assert_eq!(comparer.try_equals(outer, binding_outer), Ok(false));
    assert!(comparer.substitutions().is_empty());

    assert_eq!(comparer.try_equals(other_inner, binding_inner), Ok(true));
    assert_eq!(comparer.substitutions().get(&binding_inner), Some(&other_inner));
}

#[test]
fn test_structural_hash_ignores_member_order() {
    let interner = TypeInterner::new();
    let a = shape(&interner, "A", DefFlags::RECORD, &[("x", TypeId::INT32), ("y", TypeId::INT32)]);
    let b = shape(&interner, "B", DefFlags::RECORD, &[("y", TypeId::INT64), ("x", TypeId::INT32)]);
    assert_eq!(structural_hash(&interner, a), structural_hash(&interner, b));
}
