use super::*;
use crate::builder::ExprBuilder;
use crate::eval::Interpreter;
use crate::expr::BinaryOp;
use crate::test_fixtures::{color, order_model, person, qux};
use crate::value::ObjectRef;

#[test]
fn test_finds_parameter_entity_type() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let b = ExprBuilder::new(&interner);
    let q = b.parameter("q", qux);
    let expr = b.member(Some(Expr::parameter(&q)), qux, "Foo").unwrap();

    let found = find_entity_types(&interner, &expr);
    assert_eq!(found.entities.iter().copied().collect::<Vec<_>>(), vec![qux]);
    assert!(found.enums.is_empty());
}

#[test]
fn test_primitive_expression_is_clean() {
    let interner = TypeInterner::new();
    let b = ExprBuilder::new(&interner);
    let expr = b
        .binary(BinaryOp::Add, b.value(Value::Int32(1)), b.value(Value::Int32(2)))
        .unwrap();
    assert!(find_entity_types(&interner, &expr).is_empty());
}

#[test]
fn test_finds_types_through_generic_arguments() {
    let interner = TypeInterner::new();
    let person = person(&interner);
    let list = interner.list_of(interner.list_of(person));
    let expr = Expr::parameter(&ParameterExpr::new("people", list));

    let found = find_entity_types(&interner, &expr);
    assert!(found.entities.contains(&person));
}

#[test]
fn test_known_types_are_traversed_not_reported() {
    let interner = TypeInterner::new();
    let model = order_model(&interner);
    let expr = Expr::parameter(&ParameterExpr::new("c", model.customer));
    assert!(find_entity_types(&interner, &expr).is_empty());

    let expr = Expr::parameter(&ParameterExpr::new("o", model.order));
    let found = find_entity_types(&interner, &expr);
    assert_eq!(found.entities.len(), 1);
    assert!(found.entities.contains(&model.order));
    assert!(!found.entities.contains(&model.customer));
    assert!(!found.entities.contains(&model.address));
}

#[test]
fn test_finds_types_in_constant_graphs() {
    let interner = TypeInterner::new();
    let model = order_model(&interner);
    let color = color(&interner);

    let address = ObjectRef::new(model.address);
    let note = ObjectRef::new(model.note);
    note.set(interner.intern_string("Text"), Value::Enum { ty: color, value: 1 });
    address.set(interner.intern_string("Extra"), Value::Object(note));
    let expr = Expr::constant(Value::Object(address), TypeId::OBJECT);

    let found = find_entity_types(&interner, &expr);
    assert_eq!(found.entities.iter().copied().collect::<Vec<_>>(), vec![model.note]);
    assert_eq!(found.enums.iter().copied().collect::<Vec<_>>(), vec![color]);
}

#[test]
fn test_cyclic_constant_graph_terminates() {
    let interner = TypeInterner::new();
    let person = person(&interner);
    let best = interner.intern_string("Best");
    let a = ObjectRef::new(person);
    let b = ObjectRef::new(person);
    a.set(best, Value::Object(b.clone()));
    b.set(best, Value::Object(a.clone()));

    let found = find_entity_types_in_value(&interner, &Value::Object(a));
    assert_eq!(found.entities.len(), 1);
}

#[test]
fn test_finds_types_inside_quotes() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let b = ExprBuilder::new(&interner);
    let q = b.parameter("q", qux);
    let body = b.member(Some(Expr::parameter(&q)), qux, "Baz").unwrap();
    let quoted = b.quote(b.lambda(vec![q], body).unwrap()).unwrap();
    let Expr::Constant { value, .. } = &quoted else {
        panic!("quote is a constant");
    };

    let found = find_entity_types_in_value(&interner, value);
    assert!(found.entities.contains(&qux));
}

#[test]
fn test_finds_types_in_closure_bodies() {
    let interner = TypeInterner::new();
    let qux = qux(&interner);
    let b = ExprBuilder::new(&interner);
    let q = b.parameter("q", qux);
    let body = b.member(Some(Expr::parameter(&q)), qux, "Baz").unwrap();
    let thunk = b.lambda(Vec::new(), body).unwrap();
    let closure = Interpreter::new(&interner).evaluate(&thunk).unwrap();
    assert!(matches!(closure, Value::Closure(_)));

    let found = find_entity_types_in_value(&interner, &closure);
    assert!(found.entities.contains(&qux));
}
