use super::*;
use crate::def::{DefFlags, DefinitionInfo};
use crate::structural::StructuralTypeComparator;
use crate::types::MemberInfo;

fn func(interner: &TypeInterner, params: &[TypeId], ret: TypeId) -> TypeId {
    interner.func(params, ret).expect("Func arity")
}

fn wildcard_id(interner: &TypeInterner, ty: TypeId) -> WildcardId {
    match interner.lookup(ty) {
        Some(TypeData::Wildcard(id)) => id,
        other => panic!("not a wildcard: {other:?}"),
    }
}

#[test]
fn test_same_wildcard_bound_to_two_types_conflicts() {
    let interner = TypeInterner::new();
    let w = interner.fresh_wildcard("W");
    let left = func(&interner, &[w], w);
    let right = func(&interner, &[TypeId::INT32], TypeId::STRING);

    let err = TypeUnifier::new(&interner)
        .unify(left, right)
        .expect_err("conflicting bindings");
    assert_eq!(
        err,
        UnificationError::Conflict {
            wildcard: "W".to_string(),
            existing: "int".to_string(),
            incoming: "string".to_string(),
        }
    );
    assert!(TypeUnifier::new(&interner).try_unify(left, right).is_none());
}

#[test]
fn test_wildcard_binds_to_concrete_type() {
    let interner = TypeInterner::new();
    let w = interner.fresh_wildcard("W");
    let left = func(&interner, &[w], TypeId::INT32);
    let right = func(&interner, &[TypeId::STRING], TypeId::INT32);

    let unification = TypeUnifier::new(&interner)
        .unify(left, right)
        .expect("unifiable");
    assert_eq!(unification.binding_of(&interner, w), Some(TypeId::STRING));
    assert_eq!(unification.apply(&interner, left), right);
}

#[test]
fn test_unmentioned_declared_wildcard_is_unbound() {
    let interner = TypeInterner::new();
    let w = interner.fresh_wildcard("W");
    let other = interner.fresh_wildcard("Other");
    let left = func(&interner, &[], w);
    let right = func(&interner, &[], TypeId::INT32);

    let mut unifier = TypeUnifier::new(&interner).with_wildcards(&[other]);
    let err = unifier.unify(left, right).expect_err("Other is never bound");
    assert_eq!(
        err,
        UnificationError::Unbound {
            wildcards: vec!["Other".to_string()]
        }
    );
    assert!(err.to_string().contains("unbound wildcards: Other"));
}

#[test]
fn test_equivalence_classes_resolve_transitively() {
    let interner = TypeInterner::new();
    let w1 = interner.fresh_wildcard("W1");
    let w2 = interner.fresh_wildcard("W2");
    let w3 = interner.fresh_wildcard("W3");
    // W1 ~ W3, W2 ~ W3, W1 = int
    let left = func(&interner, &[w1, w2], w1);
    let right = func(&interner, &[w3, w3], TypeId::INT32);

    let unification = TypeUnifier::new(&interner)
        .unify(left, right)
        .expect("unifiable");
    for w in [w1, w2, w3] {
        assert_eq!(unification.binding_of(&interner, w), Some(TypeId::INT32));
    }
    assert_eq!(unification.len(), 3);
}

#[test]
fn test_merged_class_without_binding_is_reported() {
    let interner = TypeInterner::new();
    let w1 = interner.fresh_wildcard("W1");
    let w2 = interner.fresh_wildcard("W2");
    let w3 = interner.fresh_wildcard("W3");
    let left = func(&interner, &[w1, w2], w1);
    let right = func(&interner, &[w3, TypeId::INT32], w3);

    let err = TypeUnifier::new(&interner)
        .unify(left, right)
        .expect_err("W1 and W3 only meet each other");
    assert_eq!(
        err,
        UnificationError::Unbound {
            wildcards: vec!["W1".to_string(), "W3".to_string()]
        }
    );
}

#[test]
fn test_merging_classes_bound_to_different_types_conflicts() {
    let interner = TypeInterner::new();
    let w1 = interner.fresh_wildcard("W1");
    let w2 = interner.fresh_wildcard("W2");
    let w3 = interner.fresh_wildcard("W3");
    let left = func(&interner, &[w1, w2, w1], w2);
    let right = func(&interner, &[TypeId::INT32, TypeId::STRING, w3], w3);

    let err = TypeUnifier::new(&interner)
        .unify(left, right)
        .expect_err("W3 cannot be both int and string");
    assert!(matches!(err, UnificationError::Conflict { .. }), "{err}");
}

#[test]
fn test_occurs_check() {
    let interner = TypeInterner::new();
    let w = interner.fresh_wildcard("W");
    let list = interner.list_of(w);

    let err = TypeUnifier::new(&interner)
        .unify(w, list)
        .expect_err("W occurs in List<W>");
    assert!(matches!(err, UnificationError::Occurs { .. }));
}

#[test]
fn test_nested_wildcards_in_bindings_are_resolved() {
    let interner = TypeInterner::new();
    let w1 = interner.fresh_wildcard("W1");
    let w2 = interner.fresh_wildcard("W2");
    let left = func(&interner, &[w1], w2);
    let list_w2 = interner.list_of(w2);
    let right = func(&interner, &[list_w2], TypeId::STRING);

    let unification = TypeUnifier::new(&interner)
        .unify(left, right)
        .expect("unifiable");
    assert_eq!(
        unification.get(wildcard_id(&interner, w1)),
        Some(interner.list_of(TypeId::STRING))
    );
}

#[test]
fn test_array_rank_mismatch() {
    let interner = TypeInterner::new();
    let w = interner.fresh_wildcard("W");
    let left = interner.array(w);
    let right = interner.array_of_rank(TypeId::INT32, 2);

    let err = TypeUnifier::new(&interner)
        .unify(left, right)
        .expect_err("vector vs rank 2");
    assert!(matches!(err, UnificationError::Mismatch { .. }));

    let vector = interner.array(TypeId::INT32);
    let single = interner.array_of_rank(TypeId::INT32, 1);
    assert!(TypeUnifier::new(&interner).try_unify(left, single).is_none());
    assert!(TypeUnifier::new(&interner).try_unify(left, vector).is_some());
}

#[test]
fn test_one_sided_treats_right_wildcards_as_types() {
    let interner = TypeInterner::new();
    let w = interner.fresh_wildcard("W");
    let v = interner.fresh_wildcard("V");
    let left = func(&interner, &[], w);
    let right = func(&interner, &[], v);

    let unification = TypeUnifier::new(&interner)
        .unify_with(left, right)
        .expect("W binds to the type V");
    assert_eq!(unification.binding_of(&interner, w), Some(v));
    assert_eq!(unification.len(), 1);
}

#[test]
fn test_one_sided_conflict() {
    let interner = TypeInterner::new();
    let w = interner.fresh_wildcard("W");
    let left = func(&interner, &[w], w);
    let right = func(&interner, &[TypeId::INT32], TypeId::STRING);

    assert!(TypeUnifier::new(&interner).try_unify_with(left, right).is_none());
    let err = TypeUnifier::new(&interner)
        .unify_with(left, right)
        .expect_err("conflict");
    assert!(matches!(err, UnificationError::Conflict { .. }));
}

#[test]
fn test_comparer_decides_simple_types() {
    let interner = TypeInterner::new();
    let x = interner.intern_string("x");
    let anonymous = |name: &str| {
        interner.define(
            DefinitionInfo::class(interner.intern_string(name))
                .with_flags(DefFlags::GENERATED | DefFlags::ANONYMOUS)
                .with_members(vec![MemberInfo::property(x, TypeId::INT32).mapped(x)]),
        )
    };
    let a = anonymous("A");
    let b = anonymous("B");
    let w = interner.fresh_wildcard("W");
    let left = func(&interner, &[w], a);
    let right = func(&interner, &[TypeId::STRING], b);

    assert!(matches!(
        TypeUnifier::new(&interner).unify(left, right),
        Err(UnificationError::Mismatch { .. })
    ));

    let mut comparer = StructuralTypeComparator::new(&interner);
    let unification = TypeUnifier::new(&interner)
        .with_comparer(&mut comparer)
        .unify(left, right)
        .expect("A and B are structurally equal");
    assert_eq!(unification.binding_of(&interner, w), Some(TypeId::STRING));
}

#[test]
fn test_unifier_is_reusable() {
    let interner = TypeInterner::new();
    let w = interner.fresh_wildcard("W");
    let left = interner.list_of(w);
    let mut unifier = TypeUnifier::new(&interner);

    let first = unifier
        .unify(left, interner.list_of(TypeId::INT32))
        .expect("first");
    let second = unifier
        .unify(left, interner.list_of(TypeId::STRING))
        .expect("second call starts from fresh state");
    assert_eq!(first.binding_of(&interner, w), Some(TypeId::INT32));
    assert_eq!(second.binding_of(&interner, w), Some(TypeId::STRING));
}
