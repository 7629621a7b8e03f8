use super::*;
use crate::builder::ExprBuilder;
use crate::expr::BinaryOp;
use crate::test_fixtures::qux;
use erasure_types::TypeInterner;

#[derive(Default)]
struct Counter {
    types: Vec<TypeId>,
    members: Vec<MemberRef>,
    constructors: Vec<(TypeId, Option<u32>)>,
    values: usize,
    params: usize,
}

impl ExprVisitor for Counter {
    fn visit_type(&mut self, ty: TypeId) {
        self.types.push(ty);
    }

    fn visit_member(&mut self, member: &MemberRef) {
        self.members.push(*member);
    }

    fn visit_constructor(&mut self, ty: TypeId, index: Option<u32>) {
        self.constructors.push((ty, index));
    }

    fn visit_value(&mut self, _value: &Value, _ty: TypeId) {
        self.values += 1;
    }

    fn visit_parameter(&mut self, _param: &ParameterExpr) {
        self.params += 1;
    }
}

#[test]
fn test_walk_member_init() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let b = ExprBuilder::new(&interner);

    let new = b.new_object(qux, 0, vec![b.value(Value::Int32(1))]).unwrap();
    let binding = b.assign(qux, "Foo", b.value(Value::string("bar"))).unwrap();
    let expr = b.member_init(new, vec![binding]).unwrap();

    let mut counter = Counter::default();
    counter.visit_expr(&expr);
    assert_eq!(counter.constructors, vec![(qux, Some(0))]);
    assert_eq!(counter.members, vec![MemberRef::new(qux, 1)]);
    assert_eq!(counter.values, 2);
    assert_eq!(counter.types, vec![qux, TypeId::INT32, TypeId::STRING]);
}

#[test]
fn test_walk_lambda_reports_parameters() {
    let interner = TypeInterner::new();
    let b = ExprBuilder::new(&interner);
    let x = b.parameter("x", TypeId::INT32);
    let body = b
        .binary(BinaryOp::Add, Expr::parameter(&x), b.value(Value::Int32(1)))
        .unwrap();
    let lambda = b.lambda(vec![x], body).unwrap();

    let mut counter = Counter::default();
    counter.visit_expr(&lambda);
    assert_eq!(counter.params, 2);
    assert_eq!(counter.values, 1);
    assert_eq!(counter.types[0], lambda.ty());
}

#[test]
fn test_positional_members_are_visited() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let b = ExprBuilder::new(&interner);
    let new = b
        .new_with_members(qux, 0, vec![b.value(Value::Int32(1))], &["Baz"])
        .unwrap();

    let mut counter = Counter::default();
    counter.visit_expr(&Expr::New(new));
    assert_eq!(counter.members, vec![MemberRef::new(qux, 0)]);
}
