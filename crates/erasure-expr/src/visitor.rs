//! Read-only expression traversal.
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to continue into children. The default walk
//! reports the static type of every node, every member/method/constructor
//! reference and every constant value.

use crate::expr::{ElementInit, Expr, MemberBinding, MemberRef, MethodRef, NewExpr, ParameterExpr};
use crate::value::Value;
use erasure_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use erasure_types::TypeId;

pub trait ExprVisitor {
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_binding(&mut self, binding: &MemberBinding) {
        walk_binding(self, binding);
    }

    fn visit_type(&mut self, _ty: TypeId) {}

    fn visit_member(&mut self, _member: &MemberRef) {}

    fn visit_method(&mut self, _method: &MethodRef) {}

    /// Constructor `index` of `ty`; `None` for the implicit one.
    fn visit_constructor(&mut self, _ty: TypeId, _index: Option<u32>) {}

    /// Constant value with its static type.
    fn visit_value(&mut self, _value: &Value, _ty: TypeId) {}

    fn visit_parameter(&mut self, _param: &ParameterExpr) {}
}

pub fn walk_expr<V: ExprVisitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || walk_expr_inner(visitor, expr));
}

fn walk_expr_inner<V: ExprVisitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    visitor.visit_type(expr.ty());
    match expr {
        Expr::Constant { value, ty } => visitor.visit_value(value, *ty),
        Expr::Parameter(param) => visitor.visit_parameter(param),
        Expr::Member { target, member, .. } => {
            visitor.visit_member(member);
            if let Some(target) = target {
                visitor.visit_expr(target);
            }
        }
        Expr::Call {
            target,
            method,
            args,
            ..
        } => {
            visitor.visit_method(method);
            if let Some(target) = target {
                visitor.visit_expr(target);
            }
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::New(new) => walk_new(visitor, new),
        Expr::MemberInit { new, bindings } => {
            walk_new(visitor, new);
            for binding in bindings {
                visitor.visit_binding(binding);
            }
        }
        Expr::ListInit { new, initializers } => {
            walk_new(visitor, new);
            for init in initializers {
                walk_element_init(visitor, init);
            }
        }
        Expr::Lambda { params, body, .. } => {
            for param in params {
                visitor.visit_parameter(param);
            }
            visitor.visit_expr(body);
        }
        Expr::Invoke { target, args, .. } => {
            visitor.visit_expr(target);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::Convert { operand, .. } => visitor.visit_expr(operand),
        Expr::TypeIs { operand, test } => {
            visitor.visit_type(*test);
            visitor.visit_expr(operand);
        }
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
    }
}

pub fn walk_new<V: ExprVisitor + ?Sized>(visitor: &mut V, new: &NewExpr) {
    visitor.visit_constructor(new.ty, new.constructor);
    if let Some(members) = &new.members {
        for &index in members {
            visitor.visit_member(&MemberRef::new(new.ty, index));
        }
    }
    for arg in &new.args {
        visitor.visit_expr(arg);
    }
}

pub fn walk_binding<V: ExprVisitor + ?Sized>(visitor: &mut V, binding: &MemberBinding) {
    match binding {
        MemberBinding::Assignment { member, value } => {
            visitor.visit_member(member);
            visitor.visit_expr(value);
        }
        MemberBinding::Member { member, bindings } => {
            visitor.visit_member(member);
            for nested in bindings {
                visitor.visit_binding(nested);
            }
        }
        MemberBinding::List {
            member,
            initializers,
        } => {
            visitor.visit_member(member);
            for init in initializers {
                walk_element_init(visitor, init);
            }
        }
    }
}

pub fn walk_element_init<V: ExprVisitor + ?Sized>(visitor: &mut V, init: &ElementInit) {
    visitor.visit_method(&init.add_method);
    for arg in &init.args {
        visitor.visit_expr(arg);
    }
}

#[cfg(test)]
#[path = "../tests/visitor_tests.rs"]
mod tests;
