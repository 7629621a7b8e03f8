use super::*;

#[test]
fn test_parameters_have_distinct_identities() {
    let a = ParameterExpr::new("x", TypeId::INT32);
    let b = ParameterExpr::new("x", TypeId::INT32);
    assert_ne!(a, b);
    assert_ne!(a.id, b.id);

    let retyped = a.retyped(TypeId::STRING);
    assert_eq!(retyped.name, a.name);
    assert_eq!(retyped.ty, TypeId::STRING);
    assert_ne!(retyped.id, a.id);
}

#[test]
fn test_node_types() {
    let param = ParameterExpr::new("p", TypeId::STRING);
    assert_eq!(Expr::parameter(&param).ty(), TypeId::STRING);
    assert_eq!(Expr::constant(Value::Int32(1), TypeId::INT32).ty(), TypeId::INT32);

    let test = Expr::TypeIs {
        operand: Box::new(Expr::parameter(&param)),
        test: TypeId::STRING,
    };
    assert_eq!(test.ty(), TypeId::BOOLEAN);

    let new = Expr::New(NewExpr::default_of(TypeId::OBJECT));
    assert_eq!(new.ty(), TypeId::OBJECT);
    assert_eq!(new.kind_name(), "new");
}

#[test]
fn test_binary_op_names() {
    for op in BinaryOp::ALL {
        assert_eq!(BinaryOp::from_name(op.name()), Some(op));
    }
    assert_eq!(BinaryOp::from_name("divide"), None);
    assert!(BinaryOp::Add.is_arithmetic());
    assert!(BinaryOp::OrElse.is_logical());
    assert!(!BinaryOp::Equal.is_logical());
}

#[test]
fn test_binding_member() {
    let member = MemberRef::new(TypeId::OBJECT, 2);
    let binding = MemberBinding::Member {
        member,
        bindings: Vec::new(),
    };
    assert_eq!(binding.member(), member);
}
