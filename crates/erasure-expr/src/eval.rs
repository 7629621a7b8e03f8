//! Reference interpreter for expression trees.
//!
//! Evaluates the node kinds the builder produces, enough to check that a
//! rewritten tree computes the same values as its original. Method calls
//! are limited to `List.Add`; static members are not evaluated.

use crate::error::ExprError;
use crate::expr::{BinaryOp, ElementInit, Expr, MemberBinding, NewExpr, ParameterExpr};
use crate::value::{ArrayRef, Closure, ObjectRef, Value};
use erasure_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use erasure_types::recursion::{DepthCounter, RecursionProfile};
use erasure_types::relations::is_assignable;
use erasure_types::{MemberKind, TypeData, TypeId, TypeInterner};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;

type Env = FxHashMap<u32, Value>;

pub struct Interpreter<'a> {
    interner: &'a TypeInterner,
    depth: DepthCounter,
}

impl<'a> Interpreter<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        Interpreter {
            interner,
            depth: DepthCounter::with_profile(RecursionProfile::ExpressionRewrite),
        }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, ExprError> {
        self.eval(expr, &Env::default())
    }

    /// Evaluate with `bindings` for free parameters.
    pub fn evaluate_with(
        &mut self,
        expr: &Expr,
        bindings: &[(ParameterExpr, Value)],
    ) -> Result<Value, ExprError> {
        let env: Env = bindings
            .iter()
            .map(|(param, value)| (param.id, value.clone()))
            .collect();
        self.eval(expr, &env)
    }

    /// Invoke a closure or quoted lambda with `args`.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, ExprError> {
        match callee {
            Value::Closure(closure) => self.apply_closure(closure, args),
            Value::Quote(lambda) => {
                let closure = self.eval(lambda, &Env::default())?;
                self.call(&closure, args)
            }
            Value::Null => Err(ExprError::evaluation("invoking a null delegate")),
            other => Err(ExprError::Unsupported {
                what: format!("invoking {other:?}"),
            }),
        }
    }

    fn eval(&mut self, expr: &Expr, env: &Env) -> Result<Value, ExprError> {
        if !self.depth.enter() {
            return Err(ExprError::DepthExceeded {
                what: "evaluation",
                limit: self.depth.max_depth(),
            });
        }
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.eval_inner(expr, env));
        self.depth.leave();
        result
    }

    fn eval_inner(&mut self, expr: &Expr, env: &Env) -> Result<Value, ExprError> {
        let interner = self.interner;
        match expr {
            Expr::Constant { value, .. } => Ok(value.clone()),
            Expr::Parameter(param) => env.get(&param.id).cloned().ok_or_else(|| {
                ExprError::evaluation(format!("parameter '{}' is not bound", param.name))
            }),
            Expr::Member { target, member, .. } => {
                let info = interner.member(member.declaring, member.index).ok_or_else(|| {
                    ExprError::evaluation(format!("unknown member #{}", member.index))
                })?;
                let name = interner.resolve_atom(info.name);
                let Some(target) = target else {
                    return Err(ExprError::Unsupported {
                        what: format!("evaluation of static member '{name}'"),
                    });
                };
                match self.eval(target, env)? {
                    Value::Object(obj) => {
                        Ok(obj.get(info.name).unwrap_or_else(|| Value::default_for(interner, info.ty)))
                    }
                    Value::Array(arr) if &*name == "Count" || &*name == "Length" => {
                        Ok(Value::Int32(arr.len() as i32))
                    }
                    Value::Null => Err(ExprError::evaluation(format!(
                        "null reference reading '{name}'"
                    ))),
                    other => Err(ExprError::evaluation(format!(
                        "cannot read '{name}' from {other:?}"
                    ))),
                }
            }
            Expr::Call {
                target,
                method,
                args,
                ..
            } => {
                let info = interner
                    .method(method.declaring, method.index, &method.type_args)
                    .ok_or_else(|| ExprError::evaluation(format!("unknown method #{}", method.index)))?;
                let name = interner.resolve_atom(info.name);
                let target = match target {
                    Some(target) => self.eval(target, env)?,
                    None => Value::Null,
                };
                let args = self.eval_all(args, env)?;
                match (&*name, &target) {
                    ("Add", Value::Array(list)) => {
                        for arg in args {
                            list.push(arg);
                        }
                        Ok(Value::Null)
                    }
                    _ => Err(ExprError::Unsupported {
                        what: format!("evaluation of method '{name}'"),
                    }),
                }
            }
            Expr::New(new) => self.construct(new, env),
            Expr::MemberInit { new, bindings } => {
                let target = self.construct(new, env)?;
                self.apply_bindings(&target, bindings, env)?;
                Ok(target)
            }
            Expr::ListInit { new, initializers } => {
                let target = self.construct(new, env)?;
                let Value::Array(list) = &target else {
                    return Err(ExprError::evaluation("collection initializer on a non-list value"));
                };
                self.add_elements(list, initializers, env)?;
                Ok(target)
            }
            Expr::Lambda { params, body, ty } => Ok(Value::Closure(Arc::new(Closure {
                ty: *ty,
                params: params.clone(),
                body: Arc::new((**body).clone()),
                captured: env.clone(),
            }))),
            Expr::Invoke { target, args, .. } => {
                let callee = self.eval(target, env)?;
                let args = self.eval_all(args, env)?;
                self.call(&callee, args)
            }
            Expr::Convert { operand, ty } => {
                let value = self.eval(operand, env)?;
                self.convert(value, *ty)
            }
            Expr::TypeIs { operand, test } => {
                let value = self.eval(operand, env)?;
                Ok(Value::Boolean(
                    value
                        .runtime_type(interner)
                        .is_some_and(|rt| is_assignable(interner, rt, *test)),
                ))
            }
            Expr::Binary { op, left, right, .. } => self.binary(*op, left, right, env),
        }
    }

    fn eval_all(&mut self, exprs: &[Expr], env: &Env) -> Result<Vec<Value>, ExprError> {
        exprs.iter().map(|e| self.eval(e, env)).collect()
    }

    fn apply_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Result<Value, ExprError> {
        if closure.params.len() != args.len() {
            return Err(ExprError::evaluation(format!(
                "delegate takes {} arguments, {} given",
                closure.params.len(),
                args.len()
            )));
        }
        let mut env = closure.captured.clone();
        for (param, arg) in closure.params.iter().zip(args) {
            env.insert(param.id, arg);
        }
        self.eval(&closure.body, &env)
    }

    fn is_list_like(&self, ty: TypeId) -> bool {
        let interner = self.interner;
        matches!(interner.lookup(ty), Some(TypeData::Array { .. }))
            || interner
                .def_id_of(ty)
                .is_some_and(|def| interner.builtins().is_list(def))
    }

    fn construct(&mut self, new: &NewExpr, env: &Env) -> Result<Value, ExprError> {
        let interner = self.interner;
        let args = self.eval_all(&new.args, env)?;
        if self.is_list_like(new.ty) {
            return Ok(Value::Array(ArrayRef::new(new.ty, Vec::new())));
        }

        let members = interner.members_of(new.ty);
        let obj = ObjectRef::new(new.ty);
        for member in members
            .iter()
            .filter(|m| !m.is_static && m.kind != MemberKind::Indexer)
        {
            obj.set(member.name, Value::default_for(interner, member.ty));
        }
        if args.is_empty() {
            return Ok(Value::Object(obj));
        }

        let ctor = new
            .constructor
            .and_then(|index| interner.constructor(new.ty, index))
            .filter(|ctor| ctor.params.len() == args.len())
            .ok_or_else(|| {
                ExprError::evaluation(format!(
                    "'{}' has no constructor taking {} arguments",
                    interner.type_name(new.ty),
                    args.len()
                ))
            })?;
        for (position, (param, arg)) in ctor.params.iter().zip(args).enumerate() {
            let positional = new
                .members
                .as_ref()
                .filter(|m| m.len() == new.args.len())
                .and_then(|m| m.get(position))
                .and_then(|&index| members.get(index as usize));
            let param_name = interner.resolve_atom(param.name);
            let target = positional
                .or_else(|| {
                    param
                        .mapping
                        .and_then(|mapping| members.iter().find(|m| m.mapping == Some(mapping)))
                })
                .or_else(|| {
                    members.iter().find(|m| {
                        interner.resolve_atom(m.name).eq_ignore_ascii_case(&param_name)
                    })
                })
                .ok_or_else(|| {
                    ExprError::evaluation(format!(
                        "constructor parameter '{param_name}' of '{}' initializes no member",
                        interner.type_name(new.ty)
                    ))
                })?;
            obj.set(target.name, arg);
        }
        Ok(Value::Object(obj))
    }

    fn apply_bindings(&mut self, target: &Value, bindings: &[MemberBinding], env: &Env) -> Result<(), ExprError> {
        let interner = self.interner;
        let Value::Object(obj) = target else {
            return Err(ExprError::evaluation(format!("member initializer on {target:?}")));
        };
        for binding in bindings {
            let member = binding.member();
            let info = interner.member(member.declaring, member.index).ok_or_else(|| {
                ExprError::evaluation(format!("unknown member #{}", member.index))
            })?;
            match binding {
                MemberBinding::Assignment { value, .. } => {
                    let value = self.eval(value, env)?;
                    trace!(member = %interner.resolve_atom(info.name), "assign");
                    obj.set(info.name, value);
                }
                MemberBinding::Member { bindings, .. } => {
                    let nested = obj.get(info.name).unwrap_or(Value::Null);
                    if nested.is_null() {
                        return Err(ExprError::evaluation(format!(
                            "null reference initializing '{}'",
                            interner.resolve_atom(info.name)
                        )));
                    }
                    self.apply_bindings(&nested, bindings, env)?;
                }
                MemberBinding::List { initializers, .. } => match obj.get(info.name) {
                    Some(Value::Array(list)) => self.add_elements(&list, initializers, env)?,
                    _ => {
                        return Err(ExprError::evaluation(format!(
                            "'{}' holds no list",
                            interner.resolve_atom(info.name)
                        )));
                    }
                },
            }
        }
        Ok(())
    }

    fn add_elements(&mut self, list: &ArrayRef, initializers: &[ElementInit], env: &Env) -> Result<(), ExprError> {
        for init in initializers {
            for value in self.eval_all(&init.args, env)? {
                list.push(value);
            }
        }
        Ok(())
    }

    fn convert(&self, value: Value, ty: TypeId) -> Result<Value, ExprError> {
        let interner = self.interner;
        let enum_target = interner
            .definition_of(ty)
            .is_some_and(|info| info.kind == erasure_types::DefKind::Enum);
        if let Some(n) = value.as_i64() {
            match ty {
                TypeId::INT32 => return Ok(Value::Int32(n as i32)),
                TypeId::INT64 => return Ok(Value::Int64(n)),
                TypeId::DOUBLE => return Ok(Value::Double(n as f64)),
                _ if enum_target => return Ok(Value::Enum { ty, value: n }),
                _ => {}
            }
        }
        if let Value::Double(d) = value {
            match ty {
                TypeId::INT32 => return Ok(Value::Int32(d as i32)),
                TypeId::INT64 => return Ok(Value::Int64(d as i64)),
                TypeId::DOUBLE => return Ok(Value::Double(d)),
                _ => {}
            }
        }
        let Some(runtime) = value.runtime_type(interner) else {
            return Ok(Value::Null);
        };
        if ty == TypeId::OBJECT
            || is_assignable(interner, runtime, ty)
            || is_assignable(interner, ty, runtime)
        {
            return Ok(value);
        }
        Err(ExprError::evaluation(format!(
            "cannot convert '{}' to '{}'",
            interner.type_name(runtime),
            interner.type_name(ty)
        )))
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, env: &Env) -> Result<Value, ExprError> {
        if op.is_logical() {
            let lhs = self.eval_bool(left, env)?;
            let short = matches!((op, lhs), (BinaryOp::AndAlso, false) | (BinaryOp::OrElse, true));
            if short {
                return Ok(Value::Boolean(lhs));
            }
            return Ok(Value::Boolean(self.eval_bool(right, env)?));
        }
        let lhs = self.eval(left, env)?;
        let rhs = self.eval(right, env)?;
        match op {
            BinaryOp::Equal => Ok(Value::Boolean(lhs == rhs)),
            BinaryOp::NotEqual => Ok(Value::Boolean(lhs != rhs)),
            BinaryOp::LessThan | BinaryOp::GreaterThan => {
                let (a, b) = (as_f64(&lhs), as_f64(&rhs));
                match (a, b) {
                    (Some(a), Some(b)) => Ok(Value::Boolean(if op == BinaryOp::LessThan {
                        a < b
                    } else {
                        a > b
                    })),
                    _ => Err(ExprError::evaluation(format!(
                        "cannot compare {lhs:?} and {rhs:?}"
                    ))),
                }
            }
            _ => arithmetic(op, &lhs, &rhs),
        }
    }

    fn eval_bool(&mut self, expr: &Expr, env: &Env) -> Result<bool, ExprError> {
        match self.eval(expr, env)? {
            Value::Boolean(b) => Ok(b),
            other => Err(ExprError::evaluation(format!("expected a boolean, found {other:?}"))),
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match *value {
        Value::Int32(v) => Some(f64::from(v)),
        Value::Int64(v) => Some(v as f64),
        Value::Double(v) => Some(v),
        _ => None,
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::string(&format!("{a}{b}"))),
        (_, Value::Int32(a), Value::Int32(b)) => Ok(Value::Int32(match op {
            BinaryOp::Add => a.wrapping_add(*b),
            BinaryOp::Subtract => a.wrapping_sub(*b),
            _ => a.wrapping_mul(*b),
        })),
        (_, Value::Int64(a), Value::Int64(b)) => Ok(Value::Int64(match op {
            BinaryOp::Add => a.wrapping_add(*b),
            BinaryOp::Subtract => a.wrapping_sub(*b),
            _ => a.wrapping_mul(*b),
        })),
        (_, Value::Double(a), Value::Double(b)) => Ok(Value::Double(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            _ => a * b,
        })),
        _ => Err(ExprError::evaluation(format!(
            "cannot apply '{}' to {lhs:?} and {rhs:?}",
            op.name()
        ))),
    }
}

#[cfg(test)]
#[path = "../tests/eval_tests.rs"]
mod tests;
