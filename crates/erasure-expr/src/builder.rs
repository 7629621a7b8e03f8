//! Validated construction of expression nodes.
//!
//! `ExprBuilder` resolves members, constructors and methods by name against
//! the metadata in a [`TypeInterner`], computes node types and rejects
//! mismatched arity and unknown names. It does not enforce mapping rules;
//! those are checked when a tree is rewritten.

use crate::error::ExprError;
use crate::expr::{
    BinaryOp, ElementInit, Expr, MemberBinding, MemberRef, MethodRef, NewExpr, ParameterExpr,
};
use crate::value::Value;
use erasure_types::relations::is_assignable;
use erasure_types::{TypeId, TypeInterner};
use std::sync::Arc;

pub struct ExprBuilder<'a> {
    interner: &'a TypeInterner,
}

impl<'a> ExprBuilder<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        ExprBuilder { interner }
    }

    pub fn interner(&self) -> &'a TypeInterner {
        self.interner
    }

    fn name(&self, ty: TypeId) -> String {
        self.interner.type_name(ty)
    }

    fn check_value(&self, parameter: &'static str, value: &Expr, target: TypeId) -> Result<(), ExprError> {
        if is_assignable(self.interner, value.ty(), target) {
            Ok(())
        } else {
            Err(ExprError::invalid(
                parameter,
                format!(
                    "'{}' is not assignable to '{}'",
                    self.name(value.ty()),
                    self.name(target)
                ),
            ))
        }
    }

    pub fn constant(&self, value: Value, ty: TypeId) -> Expr {
        Expr::Constant { value, ty }
    }

    /// Constant of the value's own runtime type.
    pub fn value(&self, value: Value) -> Expr {
        let ty = value.runtime_type(self.interner).unwrap_or(TypeId::OBJECT);
        Expr::Constant { value, ty }
    }

    pub fn parameter(&self, name: &str, ty: TypeId) -> ParameterExpr {
        ParameterExpr::new(name, ty)
    }

    pub fn member_ref(&self, declaring: TypeId, name: &str) -> Result<MemberRef, ExprError> {
        let (index, _) = self.interner.find_member(declaring, name).ok_or_else(|| {
            ExprError::invalid(
                "member",
                format!("'{}' has no member '{name}'", self.name(declaring)),
            )
        })?;
        Ok(MemberRef::new(declaring, index))
    }

    /// Member access. `target` is `None` for static members.
    pub fn member(&self, target: Option<Expr>, declaring: TypeId, name: &str) -> Result<Expr, ExprError> {
        let member = self.member_ref(declaring, name)?;
        self.member_at(target, member)
    }

    pub fn member_at(&self, target: Option<Expr>, member: MemberRef) -> Result<Expr, ExprError> {
        let info = self
            .interner
            .member(member.declaring, member.index)
            .ok_or_else(|| {
                ExprError::invalid(
                    "member",
                    format!(
                        "'{}' has no member #{}",
                        self.name(member.declaring),
                        member.index
                    ),
                )
            })?;
        match (&target, info.is_static) {
            (Some(target), false) => self.check_value("target", target, member.declaring)?,
            (None, true) => {}
            (Some(_), true) => {
                return Err(ExprError::invalid("target", "static member accessed through an instance"));
            }
            (None, false) => {
                return Err(ExprError::invalid("target", "instance member requires a target"));
            }
        }
        Ok(Expr::Member {
            target: target.map(Box::new),
            member,
            ty: info.ty,
        })
    }

    pub fn method_ref(
        &self,
        declaring: TypeId,
        name: &str,
        type_args: &[TypeId],
    ) -> Result<MethodRef, ExprError> {
        let index = self.interner.find_method(declaring, name).ok_or_else(|| {
            ExprError::invalid(
                "method",
                format!("'{}' has no method '{name}'", self.name(declaring)),
            )
        })?;
        Ok(MethodRef::generic(declaring, index, type_args))
    }

    pub fn call(
        &self,
        target: Option<Expr>,
        declaring: TypeId,
        name: &str,
        type_args: &[TypeId],
        args: Vec<Expr>,
    ) -> Result<Expr, ExprError> {
        let method = self.method_ref(declaring, name, type_args)?;
        self.call_at(target, method, args)
    }

    pub fn call_at(&self, target: Option<Expr>, method: MethodRef, args: Vec<Expr>) -> Result<Expr, ExprError> {
        let info = self
            .interner
            .method(method.declaring, method.index, &method.type_args)
            .ok_or_else(|| {
                ExprError::invalid(
                    "method",
                    format!(
                        "method #{} of '{}' does not take {} type arguments",
                        method.index,
                        self.name(method.declaring),
                        method.type_args.len()
                    ),
                )
            })?;
        if info.params.len() != args.len() {
            return Err(ExprError::invalid(
                "args",
                format!("expected {} arguments, got {}", info.params.len(), args.len()),
            ));
        }
        for (param, arg) in info.params.iter().zip(&args) {
            self.check_value("args", arg, param.ty)?;
        }
        match (&target, info.is_static) {
            (Some(target), false) => self.check_value("target", target, method.declaring)?,
            (None, true) => {}
            _ => return Err(ExprError::invalid("target", "target does not match the method")),
        }
        Ok(Expr::Call {
            target: target.map(Box::new),
            method,
            args,
            ty: info.ret,
        })
    }

    /// `new T(args)` through constructor `constructor`.
    pub fn new_object(&self, ty: TypeId, constructor: u32, args: Vec<Expr>) -> Result<NewExpr, ExprError> {
        let ctor = self.interner.constructor(ty, constructor).ok_or_else(|| {
            ExprError::invalid(
                "constructor",
                format!("'{}' has no constructor #{constructor}", self.name(ty)),
            )
        })?;
        if ctor.params.len() != args.len() {
            return Err(ExprError::invalid(
                "args",
                format!("expected {} arguments, got {}", ctor.params.len(), args.len()),
            ));
        }
        for (param, arg) in ctor.params.iter().zip(&args) {
            self.check_value("args", arg, param.ty)?;
        }
        Ok(NewExpr {
            ty,
            constructor: Some(constructor),
            args,
            members: None,
        })
    }

    /// `new T(args)` with the members the arguments initialize.
    pub fn new_with_members(
        &self,
        ty: TypeId,
        constructor: u32,
        args: Vec<Expr>,
        members: &[&str],
    ) -> Result<NewExpr, ExprError> {
        if members.len() != args.len() {
            return Err(ExprError::invalid(
                "members",
                "one member is required per constructor argument",
            ));
        }
        let indices = members
            .iter()
            .map(|name| self.member_ref(ty, name).map(|m| m.index))
            .collect::<Result<Vec<_>, _>>()?;
        let mut new = self.new_object(ty, constructor, args)?;
        new.members = Some(indices);
        Ok(new)
    }

    pub fn new_default(&self, ty: TypeId) -> NewExpr {
        NewExpr::default_of(ty)
    }

    pub fn assign(&self, declaring: TypeId, name: &str, value: Expr) -> Result<MemberBinding, ExprError> {
        let member = self.member_ref(declaring, name)?;
        let info = self.interner.member(declaring, member.index).ok_or_else(|| {
            ExprError::invalid("member", format!("'{}' has no member '{name}'", self.name(declaring)))
        })?;
        if !info.writable {
            return Err(ExprError::invalid("member", format!("'{name}' is read-only")));
        }
        self.check_value("value", &value, info.ty)?;
        Ok(MemberBinding::Assignment { member, value })
    }

    pub fn bind_members(
        &self,
        declaring: TypeId,
        name: &str,
        bindings: Vec<MemberBinding>,
    ) -> Result<MemberBinding, ExprError> {
        let member = self.member_ref(declaring, name)?;
        Ok(MemberBinding::Member { member, bindings })
    }

    pub fn bind_list(
        &self,
        declaring: TypeId,
        name: &str,
        initializers: Vec<ElementInit>,
    ) -> Result<MemberBinding, ExprError> {
        let member = self.member_ref(declaring, name)?;
        Ok(MemberBinding::List {
            member,
            initializers,
        })
    }

    /// `Add(args)` on a collection of type `collection`.
    pub fn element_init(&self, collection: TypeId, args: Vec<Expr>) -> Result<ElementInit, ExprError> {
        let add_method = self.method_ref(collection, "Add", &[])?;
        let info = self
            .interner
            .method(collection, add_method.index, &[])
            .ok_or_else(|| ExprError::invalid("collection", "Add method is generic"))?;
        if info.params.len() != args.len() {
            return Err(ExprError::invalid("args", "argument count does not match Add"));
        }
        for (param, arg) in info.params.iter().zip(&args) {
            self.check_value("args", arg, param.ty)?;
        }
        Ok(ElementInit { add_method, args })
    }

    pub fn member_init(&self, new: NewExpr, bindings: Vec<MemberBinding>) -> Result<Expr, ExprError> {
        for binding in &bindings {
            let declaring = binding.member().declaring;
            if !is_assignable(self.interner, new.ty, declaring) {
                return Err(ExprError::invalid(
                    "bindings",
                    format!(
                        "member of '{}' bound on '{}'",
                        self.name(declaring),
                        self.name(new.ty)
                    ),
                ));
            }
        }
        Ok(Expr::MemberInit { new, bindings })
    }

    pub fn list_init(&self, new: NewExpr, initializers: Vec<ElementInit>) -> Expr {
        Expr::ListInit { new, initializers }
    }

    /// Lambda typed as `Func<..>`, or `Action<..>` when the body is `void`.
    pub fn lambda(&self, params: Vec<ParameterExpr>, body: Expr) -> Result<Expr, ExprError> {
        let param_types: Vec<TypeId> = params.iter().map(|p| p.ty).collect();
        let ty = if body.ty() == TypeId::VOID {
            self.interner.action(&param_types)
        } else {
            self.interner.func(&param_types, body.ty())
        }
        .ok_or_else(|| {
            ExprError::invalid(
                "params",
                format!("no delegate type takes {} parameters", params.len()),
            )
        })?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
            ty,
        })
    }

    /// Quoted lambda as a constant of type `Expression<TDelegate>`.
    pub fn quote(&self, lambda: Expr) -> Result<Expr, ExprError> {
        if !matches!(lambda, Expr::Lambda { .. }) {
            return Err(ExprError::invalid("lambda", "only lambdas can be quoted"));
        }
        let ty = self.interner.expression_of(lambda.ty());
        Ok(Expr::Constant {
            value: Value::Quote(Arc::new(lambda)),
            ty,
        })
    }

    pub fn invoke(&self, target: Expr, args: Vec<Expr>) -> Result<Expr, ExprError> {
        let signature = self.interner.delegate_signature(target.ty()).ok_or_else(|| {
            ExprError::invalid(
                "target",
                format!("'{}' is not a delegate type", self.name(target.ty())),
            )
        })?;
        if signature.params.len() != args.len() {
            return Err(ExprError::invalid(
                "args",
                format!("expected {} arguments, got {}", signature.params.len(), args.len()),
            ));
        }
        for (&param, arg) in signature.params.iter().zip(&args) {
            self.check_value("args", arg, param)?;
        }
        Ok(Expr::Invoke {
            target: Box::new(target),
            args,
            ty: signature.ret,
        })
    }

    pub fn convert(&self, operand: Expr, ty: TypeId) -> Expr {
        Expr::Convert {
            operand: Box::new(operand),
            ty,
        }
    }

    pub fn type_is(&self, operand: Expr, test: TypeId) -> Expr {
        Expr::TypeIs {
            operand: Box::new(operand),
            test,
        }
    }

    pub fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Result<Expr, ExprError> {
        let ty = if op.is_logical() {
            if left.ty() != TypeId::BOOLEAN || right.ty() != TypeId::BOOLEAN {
                return Err(ExprError::invalid("operands", "logical operators take bool operands"));
            }
            TypeId::BOOLEAN
        } else if op.is_arithmetic() {
            let numeric = [TypeId::INT32, TypeId::INT64, TypeId::DOUBLE];
            let string_concat = op == BinaryOp::Add && left.ty() == TypeId::STRING;
            if left.ty() != right.ty() || !(numeric.contains(&left.ty()) || string_concat) {
                return Err(ExprError::invalid(
                    "operands",
                    format!(
                        "cannot apply '{}' to '{}' and '{}'",
                        op.name(),
                        self.name(left.ty()),
                        self.name(right.ty())
                    ),
                ));
            }
            left.ty()
        } else {
            TypeId::BOOLEAN
        };
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }
}

#[cfg(test)]
#[path = "../tests/builder_tests.rs"]
mod tests;
