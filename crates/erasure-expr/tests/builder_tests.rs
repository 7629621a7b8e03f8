use super::*;
use crate::error::ErrorKind;
use crate::test_fixtures::{person, qux};

#[test]
fn test_member_access_types() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let b = ExprBuilder::new(&interner);
    let q = b.parameter("q", qux);

    let access = b.member(Some(Expr::parameter(&q)), qux, "Foo").unwrap();
    assert_eq!(access.ty(), TypeId::STRING);

    let err = b.member(Some(Expr::parameter(&q)), qux, "Nope").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);

    let err = b.member(None, qux, "Foo").unwrap_err();
    assert!(matches!(err, ExprError::InvalidArgument { parameter: "target", .. }));
}

#[test]
fn test_member_target_must_be_assignable() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let b = ExprBuilder::new(&interner);
    let s = b.parameter("s", TypeId::STRING);
    let err = b.member(Some(Expr::parameter(&s)), qux, "Foo").unwrap_err();
    assert!(matches!(err, ExprError::InvalidArgument { parameter: "target", .. }));
}

#[test]
fn test_constructor_arity_and_types() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let b = ExprBuilder::new(&interner);

    let new = b
        .new_object(qux, 0, vec![b.value(Value::Int32(1))])
        .unwrap();
    assert_eq!(new.constructor, Some(0));

    assert!(b.new_object(qux, 0, Vec::new()).is_err());
    assert!(b.new_object(qux, 0, vec![b.value(Value::string("x"))]).is_err());
    assert!(b.new_object(qux, 3, Vec::new()).is_err());
}

#[test]
fn test_list_member_and_method() {
    let interner = TypeInterner::new();
    let person = person(&interner);
    let b = ExprBuilder::new(&interner);
    let p = b.parameter("p", person);

    let friends = b.member(Some(Expr::parameter(&p)), person, "Friends").unwrap();
    let list = interner.list_of(person);
    assert_eq!(friends.ty(), list);

    let count = b.member(Some(friends.clone()), list, "Count").unwrap();
    assert_eq!(count.ty(), TypeId::INT32);

    let add = b
        .call(Some(friends), list, "Add", &[], vec![Expr::parameter(&p)])
        .unwrap();
    assert_eq!(add.ty(), TypeId::VOID);
}

#[test]
fn test_read_only_member_cannot_be_assigned() {
    let interner = TypeInterner::new();
    let list = interner.list_of(TypeId::INT32);
    let b = ExprBuilder::new(&interner);
    let err = b.assign(list, "Count", b.value(Value::Int32(1))).unwrap_err();
    assert!(matches!(err, ExprError::InvalidArgument { parameter: "member", .. }));
}

#[test]
fn test_member_init_checks_declaring_type() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let person = person(&interner);
    let b = ExprBuilder::new(&interner);

    let binding = b.assign(person, "Name", b.value(Value::string("x"))).unwrap();
    let err = b.member_init(b.new_default(qux), vec![binding]).unwrap_err();
    assert!(matches!(err, ExprError::InvalidArgument { parameter: "bindings", .. }));

    let binding = b.assign(qux, "Foo", b.value(Value::string("x"))).unwrap();
    let init = b.member_init(b.new_default(qux), vec![binding]).unwrap();
    assert_eq!(init.ty(), qux);
}

#[test]
fn test_lambda_delegate_types() {
    let interner = TypeInterner::new();
    let b = ExprBuilder::new(&interner);
    let x = b.parameter("x", TypeId::INT32);

    let lambda = b.lambda(vec![x.clone()], Expr::parameter(&x)).unwrap();
    assert_eq!(Some(lambda.ty()), interner.func(&[TypeId::INT32], TypeId::INT32));

    let quoted = b.quote(lambda.clone()).unwrap();
    assert_eq!(quoted.ty(), interner.expression_of(lambda.ty()));
    assert!(b.quote(Expr::parameter(&x)).is_err());

    let invoke = b.invoke(lambda, vec![b.value(Value::Int32(3))]).unwrap();
    assert_eq!(invoke.ty(), TypeId::INT32);
}

#[test]
fn test_binary_operand_checks() {
    let interner = TypeInterner::new();
    let b = ExprBuilder::new(&interner);
    let one = b.value(Value::Int32(1));
    let text = b.value(Value::string("a"));

    let sum = b.binary(BinaryOp::Add, one.clone(), one.clone()).unwrap();
    assert_eq!(sum.ty(), TypeId::INT32);
    let concat = b.binary(BinaryOp::Add, text.clone(), text.clone()).unwrap();
    assert_eq!(concat.ty(), TypeId::STRING);
    let eq = b.binary(BinaryOp::Equal, one.clone(), text.clone()).unwrap();
    assert_eq!(eq.ty(), TypeId::BOOLEAN);

    assert!(b.binary(BinaryOp::Add, one.clone(), text).is_err());
    assert!(b.binary(BinaryOp::AndAlso, one.clone(), one).is_err());
}
