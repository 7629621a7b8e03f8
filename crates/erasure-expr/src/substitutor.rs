//! Entity type substitution.
//!
//! [`EntityTypeSubstitutor`] rewrites an expression so that no entity type
//! remains: every non-known entity type is replaced by a structural type
//! obtained from a [`TypeFactory`], members are re-addressed by mapped name,
//! constructions are rebuilt against the replacement and constants are
//! converted (see `constants.rs`).
//!
//! Replacement types are resolved lazily. Resolving an entity type declares a
//! shell first and records it in the type map before the member types are
//! rewritten, so self-referential and mutually recursive entity types
//! resolve to cyclic replacements. When the outermost resolution finishes,
//! every shell declared on the way is canonicalized through the factory and
//! shells matching an existing type are substituted away.
//!
//! Entity types that can reach themselves through their members get
//! reference-equality (record) replacements; the others get the configured
//! default policy.
//!
//! One substitutor per rewrite: the type map, the parameter map and the
//! constant memo are private to the instance. After an error the instance
//! should be dropped.

use crate::error::ExprError;
use crate::expr::{ElementInit, Expr, MemberBinding, MemberRef, MethodRef, NewExpr, ParameterExpr};
use crate::options::SubstitutorOptions;
use crate::value::Value;
use erasure_common::Atom;
use erasure_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use erasure_types::def::{DefFlags, DefId};
use erasure_types::metadata::{
    is_known_type, is_mapped_enum, is_rewritable_entity, is_structural_type, mapped_members,
};
use erasure_types::recursion::{DepthCounter, RecursionGuard, RecursionProfile, RecursionResult};
use erasure_types::relations::is_assignable;
use erasure_types::structural::structural_members;
use erasure_types::visitor::{contains_type, for_each_component};
use erasure_types::{
    ArrayRank, EqualityPolicy, MemberInfo, MemberKind, StructuralMember, TypeData, TypeFactory,
    TypeId, TypeInterner, TypeSubstitution, TypeVisitor,
};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace};

pub struct EntityTypeSubstitutor<'a> {
    pub(crate) interner: &'a TypeInterner,
    factory: &'a dyn TypeFactory,
    pub(crate) options: SubstitutorOptions,
    /// Original type to replacement. Identity entries memoize types that
    /// need no rewrite.
    types: FxHashMap<TypeId, TypeId>,
    /// `(original, shell)` pairs declared by the resolution in progress.
    pending: Vec<(TypeId, TypeId)>,
    resolving: u32,
    entity_guard: RecursionGuard<TypeId>,
    /// Rewritten parameters by original parameter id.
    params: FxHashMap<u32, ParameterExpr>,
    expr_depth: DepthCounter,
    pub(crate) value_depth: DepthCounter,
    /// `(source, converted)` objects and arrays by source address. Holding
    /// the source keeps the address from being reused while the entry lives.
    pub(crate) objects: FxHashMap<usize, (Value, Value)>,
    /// `(source, rewritten)` quotes by source address.
    pub(crate) quotes: FxHashMap<usize, (Arc<Expr>, Arc<Expr>)>,
}

impl<'a> EntityTypeSubstitutor<'a> {
    pub fn new(interner: &'a TypeInterner, factory: &'a dyn TypeFactory) -> Self {
        Self::with_options(interner, factory, SubstitutorOptions::default())
    }

    pub fn with_options(
        interner: &'a TypeInterner,
        factory: &'a dyn TypeFactory,
        options: SubstitutorOptions,
    ) -> Self {
        let max_depth = options.max_depth;
        EntityTypeSubstitutor {
            interner,
            factory,
            options,
            types: FxHashMap::default(),
            pending: Vec::new(),
            resolving: 0,
            entity_guard: RecursionGuard::with_profile(RecursionProfile::TypeRewrite),
            params: FxHashMap::default(),
            expr_depth: DepthCounter::new(max_depth),
            value_depth: DepthCounter::with_profile(RecursionProfile::ConstantGraph),
            objects: FxHashMap::default(),
            quotes: FxHashMap::default(),
        }
    }

    /// Rewrite `expr`. No partial result is produced: the first error
    /// aborts the rewrite.
    ///
    /// Resolved types carry over to later calls; converted constants do not.
    pub fn apply(&mut self, expr: &Expr) -> Result<Expr, ExprError> {
        debug!(kind = expr.kind_name(), "EntityTypeSubstitutor::apply");
        self.objects.clear();
        self.quotes.clear();
        let result = self.rewrite_expr(expr);
        if let Err(err) = &result {
            debug!(error = %err, "entity type substitution failed");
        }
        result
    }

    /// Replacement chosen so far for `ty`, if it was resolved.
    pub fn replacement_of(&self, ty: TypeId) -> Option<TypeId> {
        self.types.get(&ty).copied()
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// Replacement of `ty`; `ty` itself when nothing in it is rewritten.
    pub fn rewrite_type(&mut self, ty: TypeId) -> Result<TypeId, ExprError> {
        if let Some(&replacement) = self.types.get(&ty) {
            return Ok(replacement);
        }
        let outermost = self.resolving == 0;
        self.resolving += 1;
        let resolved = self.visit(ty);
        self.resolving -= 1;

        let resolved = match resolved {
            Ok(replacement) => {
                self.types.entry(ty).or_insert(replacement);
                if outermost && !self.pending.is_empty() {
                    self.finish_resolution()
                        .map(|()| self.types.get(&ty).copied().unwrap_or(replacement))
                } else {
                    Ok(replacement)
                }
            }
            Err(err) => Err(err),
        };
        if resolved.is_err() && outermost {
            self.abandon_resolution();
        }
        resolved
    }

    fn resolve_declared(&mut self, ty: TypeId) -> Result<TypeId, ExprError> {
        let interner = self.interner;
        if is_mapped_enum(interner, ty) {
            if !self.options.erase_enums {
                return Ok(ty);
            }
            let underlying = interner
                .definition_of(ty)
                .and_then(|info| info.base)
                .unwrap_or(TypeId::INT32);
            trace!(ty = %interner.type_name(ty), "erasing mapped enum");
            return Ok(underlying);
        }
        if is_rewritable_entity(interner, ty) {
            let policy = if self.reaches_itself(ty) {
                EqualityPolicy::Reference
            } else {
                self.options.default_policy
            };
            let members = self.entity_shape(ty)?;
            return self.synthesize(ty, &members, policy);
        }
        if is_known_type(interner, ty) {
            self.check_known(ty)?;
            return Ok(ty);
        }
        if is_structural_type(interner, ty) && self.needs_rewrite(ty) {
            let policy = match interner.definition_of(ty) {
                Some(info) if info.flags.contains(DefFlags::RECORD) => EqualityPolicy::Reference,
                _ => EqualityPolicy::Value,
            };
            let members = structural_members(interner, ty);
            return self.synthesize(ty, &members, policy);
        }

        let Some(TypeData::Generic { definition, args }) = interner.lookup(ty) else {
            return Ok(ty);
        };
        let args = interner.list(args);
        let mut rewritten = Vec::with_capacity(args.len());
        for &arg in args.iter() {
            rewritten.push(self.rewrite_type(arg)?);
        }
        if rewritten[..] == args[..] {
            Ok(ty)
        } else {
            Ok(interner.generic(definition, &rewritten))
        }
    }

    /// Mapped members of an entity type as `(mapped name, type)`.
    fn entity_shape(&self, ty: TypeId) -> Result<Vec<(Atom, TypeId)>, ExprError> {
        let interner = self.interner;
        let mut seen = FxHashSet::default();
        let mut shape = Vec::new();
        for (_, member) in mapped_members(interner, ty) {
            let Some(mapping) = member.mapping else {
                continue;
            };
            if !seen.insert(mapping) {
                return Err(ExprError::AmbiguousMapping {
                    ty: interner.type_name(ty),
                    mapping: interner.resolve_atom(mapping).to_string(),
                });
            }
            shape.push((mapping, member.ty));
        }
        Ok(shape)
    }

    fn synthesize(
        &mut self,
        ty: TypeId,
        members: &[(Atom, TypeId)],
        policy: EqualityPolicy,
    ) -> Result<TypeId, ExprError> {
        if self.entity_guard.enter(ty) != RecursionResult::Entered {
            return Err(ExprError::DepthExceeded {
                what: "entity type nesting",
                limit: RecursionProfile::TypeRewrite.max_depth(),
            });
        }
        let shell = self.factory.declare(self.interner, policy);
        debug!(
            ty = %self.interner.type_name(ty),
            shell = %self.interner.type_name(shell),
            ?policy,
            "declared replacement type"
        );
        self.types.insert(ty, shell);
        self.pending.push((ty, shell));

        let result = self.define_shell(shell, members);
        self.entity_guard.leave(ty);
        result.map(|()| shell)
    }

    fn define_shell(&mut self, shell: TypeId, members: &[(Atom, TypeId)]) -> Result<(), ExprError> {
        let mut structural = Vec::with_capacity(members.len());
        for &(name, member_ty) in members {
            structural.push(StructuralMember::new(name, self.rewrite_type(member_ty)?));
        }
        self.factory.define(self.interner, shell, &structural)?;
        Ok(())
    }

    /// Canonicalize the shells declared by the outermost resolution and
    /// substitute the ones that matched an existing type.
    fn finish_resolution(&mut self) -> Result<(), ExprError> {
        let interner = self.interner;
        let pending = std::mem::take(&mut self.pending);
        let mut substitutions: FxHashMap<TypeId, TypeId> = FxHashMap::default();
        for &(_, shell) in &pending {
            if substitutions.contains_key(&shell) {
                continue;
            }
            let canonical = self.factory.canonicalize(interner, shell)?;
            for (binding, defining) in canonical.substitutions {
                if binding != defining {
                    substitutions.entry(binding).or_insert(defining);
                }
            }
            if canonical.ty != shell {
                substitutions.insert(shell, canonical.ty);
            }
        }

        // Follow chains so every shell maps to its final type.
        let resolved: FxHashMap<TypeId, TypeId> = substitutions
            .iter()
            .map(|(&from, &to)| {
                let mut to = to;
                let mut steps = 0;
                while let Some(&next) = substitutions.get(&to)
                    && steps < substitutions.len()
                {
                    to = next;
                    steps += 1;
                }
                (from, to)
            })
            .collect();
        let substitution = TypeSubstitution::from_map(resolved);

        for &(original, shell) in &pending {
            match substitution.get(shell) {
                Some(canonical) => trace!(
                    ty = %interner.type_name(original),
                    replacement = %interner.type_name(canonical),
                    "reusing replacement type"
                ),
                None => self.remap_shell(shell, &substitution),
            }
        }
        if !substitution.is_empty() {
            for replacement in self.types.values_mut() {
                *replacement = substitution.apply(interner, *replacement);
            }
        }
        Ok(())
    }

    fn remap_shell(&self, shell: TypeId, substitution: &TypeSubstitution) {
        if substitution.is_empty() {
            return;
        }
        let interner = self.interner;
        let Some(def) = interner.def_id_of(shell) else {
            return;
        };
        let member_types: Vec<TypeId> = interner
            .members_of(shell)
            .iter()
            .map(|m| substitution.apply(interner, m.ty))
            .collect();
        let param_types: Vec<Vec<TypeId>> = interner
            .constructors_of(shell)
            .iter()
            .map(|c| c.params.iter().map(|p| substitution.apply(interner, p.ty)).collect())
            .collect();
        update_member_types(interner, def, member_types, param_types);
    }

    fn abandon_resolution(&mut self) {
        let shells: FxHashSet<TypeId> = self.pending.drain(..).map(|(_, shell)| shell).collect();
        if shells.is_empty() {
            return;
        }
        let interner = self.interner;
        self.types
            .retain(|_, replacement| !contains_type(interner, *replacement, &|t| shells.contains(&t)));
    }

    /// Whether rewriting `ty` would change it. Pure: nothing is declared.
    pub(crate) fn needs_rewrite(&self, ty: TypeId) -> bool {
        let mut visiting = FxHashSet::default();
        self.needs_rewrite_in(ty, &mut visiting)
    }

    fn needs_rewrite_in(&self, ty: TypeId, visiting: &mut FxHashSet<TypeId>) -> bool {
        if let Some(&replacement) = self.types.get(&ty) {
            return replacement != ty;
        }
        if !visiting.insert(ty) {
            return false;
        }
        let interner = self.interner;
        match interner.lookup(ty) {
            Some(
                TypeData::Array { element, .. } | TypeData::ByRef(element) | TypeData::Pointer(element),
            ) => self.needs_rewrite_in(element, visiting),
            Some(TypeData::Definition(_) | TypeData::Generic { .. }) => {
                if is_mapped_enum(interner, ty) {
                    self.options.erase_enums
                } else if is_rewritable_entity(interner, ty) {
                    true
                } else if is_known_type(interner, ty) {
                    false
                } else if is_structural_type(interner, ty) {
                    structural_members(interner, ty)
                        .into_iter()
                        .any(|(_, member_ty)| self.needs_rewrite_in(member_ty, visiting))
                } else {
                    interner
                        .generic_args(ty)
                        .iter()
                        .any(|&arg| self.needs_rewrite_in(arg, visiting))
                }
            }
            _ => false,
        }
    }

    fn shape_member_types(&self, ty: TypeId) -> Vec<TypeId> {
        let interner = self.interner;
        if is_rewritable_entity(interner, ty) {
            mapped_members(interner, ty).into_iter().map(|(_, m)| m.ty).collect()
        } else if is_structural_type(interner, ty) {
            structural_members(interner, ty).into_iter().map(|(_, t)| t).collect()
        } else {
            Vec::new()
        }
    }

    /// Whether `ty` is reachable from its own members.
    fn reaches_itself(&self, ty: TypeId) -> bool {
        let interner = self.interner;
        let mut visited = FxHashSet::default();
        let mut stack = self.shape_member_types(ty);
        let mut found = false;
        while let Some(next) = stack.pop() {
            for_each_component(interner, next, &mut |component| {
                if component == ty {
                    found = true;
                } else if visited.insert(component) {
                    stack.extend(self.shape_member_types(component));
                }
            });
            if found {
                return true;
            }
        }
        false
    }

    /// A known type is kept as is, so its own signature must not mention
    /// anything that is rewritten.
    fn check_known(&self, ty: TypeId) -> Result<(), ExprError> {
        let interner = self.interner;
        for member in interner.members_of(ty) {
            if self.needs_rewrite(member.ty) {
                return Err(ExprError::ErasureUnsafe {
                    ty: interner.type_name(ty),
                    reason: format!(
                        "known type exposes member '{}' of rewritten type '{}'",
                        interner.resolve_atom(member.name),
                        interner.type_name(member.ty)
                    ),
                });
            }
        }
        for ctor in interner.constructors_of(ty) {
            for param in ctor.params {
                if self.needs_rewrite(param.ty) {
                    return Err(ExprError::ErasureUnsafe {
                        ty: interner.type_name(ty),
                        reason: format!(
                            "known type constructor takes '{}' of rewritten type '{}'",
                            interner.resolve_atom(param.name),
                            interner.type_name(param.ty)
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fail if a signature kept as is still mentions rewritten types.
    fn check_signature(
        &self,
        owner: TypeId,
        what: &str,
        types: impl IntoIterator<Item = TypeId>,
    ) -> Result<(), ExprError> {
        let interner = self.interner;
        for ty in types {
            if self.needs_rewrite(ty) {
                return Err(ExprError::ErasureUnsafe {
                    ty: interner.type_name(owner),
                    reason: format!("{what} refers to rewritten type '{}'", interner.type_name(ty)),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Members and methods
    // =========================================================================

    fn member_info(&self, member: MemberRef) -> Result<MemberInfo, ExprError> {
        self.interner
            .member(member.declaring, member.index)
            .ok_or_else(|| {
                ExprError::invalid(
                    "member",
                    format!(
                        "'{}' has no member #{}",
                        self.interner.type_name(member.declaring),
                        member.index
                    ),
                )
            })
    }

    /// Mapped name of an instance member of an entity type.
    fn entity_member_key(&self, ty: TypeId, info: &MemberInfo) -> Result<Atom, ExprError> {
        let interner = self.interner;
        let name = || interner.resolve_atom(info.name).to_string();
        if info.is_static {
            return Err(ExprError::ErasureUnsafe {
                ty: interner.type_name(ty),
                reason: format!("static member '{}' is not part of the erased shape", name()),
            });
        }
        if info.kind == MemberKind::Indexer {
            return Err(ExprError::ErasureUnsafe {
                ty: interner.type_name(ty),
                reason: format!("indexer '{}' is not part of the erased shape", name()),
            });
        }
        info.mapping.ok_or_else(|| ExprError::MissingMapping {
            ty: interner.type_name(ty),
            member: name(),
        })
    }

    fn replacement_member(
        &self,
        original: TypeId,
        replacement: TypeId,
        key: Atom,
    ) -> Result<MemberRef, ExprError> {
        let interner = self.interner;
        interner
            .members_of(replacement)
            .iter()
            .position(|m| m.mapping.unwrap_or(m.name) == key)
            .map(|index| MemberRef::new(replacement, index as u32))
            .ok_or_else(|| ExprError::MissingMapping {
                ty: interner.type_name(original),
                member: interner.resolve_atom(key).to_string(),
            })
    }

    fn rewrite_member_ref(&mut self, member: MemberRef) -> Result<MemberRef, ExprError> {
        let interner = self.interner;
        let info = self.member_info(member)?;
        let key = if is_rewritable_entity(interner, member.declaring) {
            Some(self.entity_member_key(member.declaring, &info)?)
        } else {
            None
        };
        let declaring = self.rewrite_type(member.declaring)?;
        if declaring == member.declaring {
            return Ok(member);
        }
        let key = match key {
            Some(key) => key,
            None if is_structural_type(interner, member.declaring) => {
                info.mapping.unwrap_or(info.name)
            }
            // Builtin or opaque generic over rewritten arguments.
            None => return Ok(MemberRef::new(declaring, member.index)),
        };
        let rewritten = self.replacement_member(member.declaring, declaring, key)?;
        trace!(
            member = %interner.resolve_atom(info.name),
            from = %interner.type_name(member.declaring),
            to = %interner.type_name(declaring),
            "re-addressed member"
        );
        Ok(rewritten)
    }

    fn rewrite_method_ref(&mut self, method: &MethodRef) -> Result<MethodRef, ExprError> {
        let interner = self.interner;
        if is_rewritable_entity(interner, method.declaring) {
            let ty = interner.type_name(method.declaring);
            let declared = interner
                .definition_of(method.declaring)
                .and_then(|info| info.methods.get(method.index as usize).map(|m| (m.name, m.mapping)));
            return Err(match declared {
                Some((name, None)) => ExprError::MissingMapping {
                    ty,
                    member: interner.resolve_atom(name).to_string(),
                },
                Some((name, Some(_))) => ExprError::ErasureUnsafe {
                    ty,
                    reason: format!(
                        "method '{}' has no counterpart on the replacement type",
                        interner.resolve_atom(name)
                    ),
                },
                None => ExprError::invalid("method", format!("'{ty}' has no method #{}", method.index)),
            });
        }
        let declaring = self.rewrite_type(method.declaring)?;
        let mut type_args = SmallVec::with_capacity(method.type_args.len());
        for &arg in &method.type_args {
            type_args.push(self.rewrite_type(arg)?);
        }
        Ok(MethodRef {
            declaring,
            index: method.index,
            type_args,
        })
    }

    /// Re-validate a call against the instantiated signature of the
    /// rewritten method. Returns the return type.
    fn check_call(&self, original: &MethodRef, method: &MethodRef, args: &[Expr]) -> Result<TypeId, ExprError> {
        let interner = self.interner;
        let unsafe_call = |reason: String| ExprError::ErasureUnsafe {
            ty: interner.type_name(original.declaring),
            reason,
        };
        let info = interner
            .method(method.declaring, method.index, &method.type_args)
            .ok_or_else(|| unsafe_call(format!("method #{} cannot be instantiated", method.index)))?;
        let name = interner.resolve_atom(info.name);
        self.check_signature(
            original.declaring,
            &format!("method '{name}'"),
            info.params.iter().map(|p| p.ty).chain([info.ret]),
        )?;
        if info.params.len() != args.len() {
            return Err(unsafe_call(format!("method '{name}' arity changed")));
        }
        for (position, (param, arg)) in info.params.iter().zip(args).enumerate() {
            if !is_assignable(interner, arg.ty(), param.ty) {
                return Err(unsafe_call(format!(
                    "argument {position} of '{name}' has type '{}' which does not match '{}'",
                    interner.type_name(arg.ty()),
                    interner.type_name(param.ty)
                )));
            }
        }
        Ok(info.ret)
    }

    fn rewrite_parameter(&mut self, param: &ParameterExpr) -> Result<ParameterExpr, ExprError> {
        if let Some(rewritten) = self.params.get(&param.id) {
            return Ok(rewritten.clone());
        }
        let ty = self.rewrite_type(param.ty)?;
        let rewritten = if ty == param.ty {
            param.clone()
        } else {
            param.retyped(ty)
        };
        self.params.insert(param.id, rewritten.clone());
        Ok(rewritten)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub(crate) fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr, ExprError> {
        if !self.expr_depth.enter() {
            return Err(ExprError::DepthExceeded {
                what: "expression",
                limit: self.expr_depth.max_depth(),
            });
        }
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.rewrite_expr_inner(expr));
        self.expr_depth.leave();
        result
    }

    fn rewrite_all(&mut self, exprs: &[Expr]) -> Result<Vec<Expr>, ExprError> {
        exprs.iter().map(|e| self.rewrite_expr(e)).collect()
    }

    fn rewrite_boxed(&mut self, expr: &Expr) -> Result<Box<Expr>, ExprError> {
        self.rewrite_expr(expr).map(Box::new)
    }

    fn rewrite_expr_inner(&mut self, expr: &Expr) -> Result<Expr, ExprError> {
        let interner = self.interner;
        match expr {
            Expr::Constant { value, ty } => {
                let ty = self.rewrite_type(*ty)?;
                let value = self.convert_constant(value)?;
                Ok(Expr::Constant { value, ty })
            }
            Expr::Parameter(param) => Ok(Expr::Parameter(self.rewrite_parameter(param)?)),
            Expr::Member { target, member, .. } => {
                let rewritten = self.rewrite_member_ref(*member)?;
                let target = match target {
                    Some(target) => Some(self.rewrite_boxed(target)?),
                    None => None,
                };
                let info = self.member_info(rewritten)?;
                self.check_signature(
                    member.declaring,
                    &format!("member '{}'", interner.resolve_atom(info.name)),
                    [info.ty],
                )?;
                Ok(Expr::Member {
                    target,
                    member: rewritten,
                    ty: info.ty,
                })
            }
            Expr::Call {
                target,
                method,
                args,
                ..
            } => {
                let rewritten = self.rewrite_method_ref(method)?;
                let target = match target {
                    Some(target) => Some(self.rewrite_boxed(target)?),
                    None => None,
                };
                let args = self.rewrite_all(args)?;
                let ty = self.check_call(method, &rewritten, &args)?;
                Ok(Expr::Call {
                    target,
                    method: rewritten,
                    args,
                    ty,
                })
            }
            Expr::New(new) => self.rewrite_construction(new, None),
            Expr::MemberInit { new, bindings } => self.rewrite_construction(new, Some(bindings)),
            Expr::ListInit { new, initializers } => {
                if is_rewritable_entity(interner, new.ty) {
                    return Err(ExprError::ErasureUnsafe {
                        ty: interner.type_name(new.ty),
                        reason: "collection initializer on an entity type".to_string(),
                    });
                }
                let replacement = self.rewrite_type(new.ty)?;
                let new = self.rewrite_plain_new(new, replacement)?;
                let initializers = self.rewrite_initializers(initializers)?;
                Ok(Expr::ListInit { new, initializers })
            }
            Expr::Lambda { params, body, ty } => {
                let params = params
                    .iter()
                    .map(|p| self.rewrite_parameter(p))
                    .collect::<Result<Vec<_>, _>>()?;
                let body = self.rewrite_boxed(body)?;
                let ty = self.rewrite_type(*ty)?;
                Ok(Expr::Lambda { params, body, ty })
            }
            Expr::Invoke { target, args, ty } => Ok(Expr::Invoke {
                target: self.rewrite_boxed(target)?,
                args: self.rewrite_all(args)?,
                ty: self.rewrite_type(*ty)?,
            }),
            Expr::Convert { operand, ty } => Ok(Expr::Convert {
                operand: self.rewrite_boxed(operand)?,
                ty: self.rewrite_type(*ty)?,
            }),
            Expr::TypeIs { operand, test } => Ok(Expr::TypeIs {
                operand: self.rewrite_boxed(operand)?,
                test: self.rewrite_type(*test)?,
            }),
            Expr::Binary {
                op,
                left,
                right,
                ty,
            } => Ok(Expr::Binary {
                op: *op,
                left: self.rewrite_boxed(left)?,
                right: self.rewrite_boxed(right)?,
                ty: self.rewrite_type(*ty)?,
            }),
        }
    }

    fn is_reshaped(&mut self, ty: TypeId) -> Result<bool, ExprError> {
        let interner = self.interner;
        if is_rewritable_entity(interner, ty) {
            return Ok(true);
        }
        Ok(is_structural_type(interner, ty) && self.rewrite_type(ty)? != ty)
    }

    fn rewrite_construction(
        &mut self,
        new: &NewExpr,
        bindings: Option<&[MemberBinding]>,
    ) -> Result<Expr, ExprError> {
        if self.is_reshaped(new.ty)? {
            return self.construct(new, bindings.unwrap_or_default());
        }
        let replacement = self.rewrite_type(new.ty)?;
        let new = self.rewrite_plain_new(new, replacement)?;
        match bindings {
            None => Ok(Expr::New(new)),
            Some(bindings) => Ok(Expr::MemberInit {
                new,
                bindings: self.rewrite_bindings(bindings)?,
            }),
        }
    }

    /// Construction of a type whose shape is kept (known, builtin, opaque).
    fn rewrite_plain_new(&mut self, new: &NewExpr, replacement: TypeId) -> Result<NewExpr, ExprError> {
        let args = self.rewrite_all(&new.args)?;
        if let Some(index) = new.constructor {
            let ctor = self.interner.constructor(replacement, index).ok_or_else(|| {
                ExprError::invalid(
                    "new",
                    format!("'{}' has no constructor #{index}", self.interner.type_name(new.ty)),
                )
            })?;
            self.check_signature(new.ty, "constructor", ctor.params.iter().map(|p| p.ty))?;
        }
        Ok(NewExpr {
            ty: replacement,
            constructor: new.constructor,
            args,
            members: new.members.clone(),
        })
    }

    fn rewrite_bindings(&mut self, bindings: &[MemberBinding]) -> Result<Vec<MemberBinding>, ExprError> {
        let mut rewritten = Vec::with_capacity(bindings.len());
        for binding in bindings {
            rewritten.push(match binding {
                MemberBinding::Assignment { member, value } => MemberBinding::Assignment {
                    member: self.rewrite_member_ref(*member)?,
                    value: self.rewrite_expr(value)?,
                },
                MemberBinding::Member { member, bindings } => {
                    let member_ty = self.member_info(*member)?.ty;
                    if self.is_reshaped(member_ty)? {
                        // The existing member value cannot be reshaped in
                        // place; construct a fresh one.
                        MemberBinding::Assignment {
                            member: self.rewrite_member_ref(*member)?,
                            value: self.construct_nested(member_ty, bindings)?,
                        }
                    } else {
                        MemberBinding::Member {
                            member: self.rewrite_member_ref(*member)?,
                            bindings: self.rewrite_bindings(bindings)?,
                        }
                    }
                }
                MemberBinding::List {
                    member,
                    initializers,
                } => MemberBinding::List {
                    member: self.rewrite_member_ref(*member)?,
                    initializers: self.rewrite_initializers(initializers)?,
                },
            });
        }
        Ok(rewritten)
    }

    fn rewrite_initializers(&mut self, initializers: &[ElementInit]) -> Result<Vec<ElementInit>, ExprError> {
        let mut rewritten = Vec::with_capacity(initializers.len());
        for init in initializers {
            let add_method = self.rewrite_method_ref(&init.add_method)?;
            let args = self.rewrite_all(&init.args)?;
            self.check_call(&init.add_method, &add_method, &args)?;
            rewritten.push(ElementInit { add_method, args });
        }
        Ok(rewritten)
    }

    // =========================================================================
    // Construction of replacement types
    // =========================================================================

    /// Mapped name a constructor parameter initializes.
    fn parameter_key(
        &self,
        new: &NewExpr,
        entity: bool,
        position: usize,
        param_name: Atom,
        param_mapping: Option<Atom>,
    ) -> Result<Atom, ExprError> {
        let interner = self.interner;
        if let Some(mapping) = param_mapping {
            return Ok(mapping);
        }
        let unmapped = || ExprError::UnmappedParameter {
            ty: interner.type_name(new.ty),
            parameter: interner.resolve_atom(param_name).to_string(),
        };
        if let Some(members) = &new.members
            && members.len() == new.args.len()
        {
            let index = members.get(position).copied().ok_or_else(unmapped)?;
            let info = interner.member(new.ty, index).ok_or_else(unmapped)?;
            return if entity {
                info.mapping.ok_or_else(unmapped)
            } else {
                Ok(info.mapping.unwrap_or(info.name))
            };
        }
        if !entity {
            let param = interner.resolve_atom(param_name);
            if let Some(info) = interner
                .members_of(new.ty)
                .into_iter()
                .find(|m| interner.resolve_atom(m.name).eq_ignore_ascii_case(&param))
            {
                return Ok(info.mapping.unwrap_or(info.name));
            }
        }
        Err(unmapped())
    }

    /// Rebuild `new T(args) { bindings }` against the replacement of `T`.
    ///
    /// Constructor arguments and bindings are collected by mapped name; each
    /// name may be assigned once. Value-equality replacements are built
    /// through their positional constructor, reference-equality ones through
    /// member initialization.
    fn construct(&mut self, new: &NewExpr, bindings: &[MemberBinding]) -> Result<Expr, ExprError> {
        let interner = self.interner;
        let original = new.ty;
        let replacement = self.rewrite_type(original)?;
        let entity = is_rewritable_entity(interner, original);
        let mut slots: IndexMap<Atom, Expr> = IndexMap::new();

        if !new.args.is_empty() {
            let ctor = new
                .constructor
                .and_then(|index| interner.constructor(original, index))
                .filter(|ctor| ctor.params.len() == new.args.len())
                .ok_or_else(|| {
                    ExprError::invalid(
                        "new",
                        format!(
                            "'{}' has no constructor taking {} arguments",
                            interner.type_name(original),
                            new.args.len()
                        ),
                    )
                })?;
            for (position, (param, arg)) in ctor.params.iter().zip(&new.args).enumerate() {
                let key = self.parameter_key(new, entity, position, param.name, param.mapping)?;
                self.check_unassigned(&slots, original, key)?;
                let value = self.rewrite_expr(arg)?;
                slots.insert(key, value);
            }
        }

        for binding in bindings {
            let info = self.member_info(binding.member())?;
            let key = if entity {
                self.entity_member_key(original, &info)?
            } else {
                info.mapping.unwrap_or(info.name)
            };
            self.check_unassigned(&slots, original, key)?;
            let value = match binding {
                MemberBinding::Assignment { value, .. } => self.rewrite_expr(value)?,
                MemberBinding::Member { bindings, .. } => self.construct_nested(info.ty, bindings)?,
                MemberBinding::List { initializers, .. } => {
                    self.construct_list(original, info.ty, initializers)?
                }
            };
            slots.insert(key, value);
        }

        let members = interner.members_of(replacement);
        let key_of = |m: &MemberInfo| m.mapping.unwrap_or(m.name);
        if let Some(&key) = slots.keys().find(|&&key| !members.iter().any(|m| key_of(m) == key)) {
            return Err(ExprError::MissingMapping {
                ty: interner.type_name(original),
                member: interner.resolve_atom(key).to_string(),
            });
        }

        let reference = interner
            .definition_of(replacement)
            .is_some_and(|info| info.flags.contains(DefFlags::RECORD));
        let positional = interner
            .constructor(replacement, 0)
            .is_some_and(|ctor| ctor.params.len() == members.len());

        if !reference && positional {
            let mut args = Vec::with_capacity(members.len());
            for member in &members {
                args.push(match slots.shift_remove(&key_of(member)) {
                    Some(value) => coerce(value, member.ty),
                    None => Expr::Constant {
                        value: Value::default_for(interner, member.ty),
                        ty: member.ty,
                    },
                });
            }
            return Ok(Expr::New(NewExpr {
                ty: replacement,
                constructor: Some(0),
                args,
                members: Some((0..members.len() as u32).collect()),
            }));
        }

        let mut assignments = Vec::with_capacity(slots.len());
        for (index, member) in members.iter().enumerate() {
            if let Some(value) = slots.shift_remove(&key_of(member)) {
                assignments.push(MemberBinding::Assignment {
                    member: MemberRef::new(replacement, index as u32),
                    value: coerce(value, member.ty),
                });
            }
        }
        Ok(Expr::MemberInit {
            new: NewExpr::default_of(replacement),
            bindings: assignments,
        })
    }

    fn check_unassigned(&self, slots: &IndexMap<Atom, Expr>, ty: TypeId, key: Atom) -> Result<(), ExprError> {
        if slots.contains_key(&key) {
            return Err(ExprError::DuplicateAssignment {
                ty: self.interner.type_name(ty),
                mapping: self.interner.resolve_atom(key).to_string(),
            });
        }
        Ok(())
    }

    /// Member-member binding turned into an explicit construction.
    fn construct_nested(&mut self, member_ty: TypeId, bindings: &[MemberBinding]) -> Result<Expr, ExprError> {
        let new = NewExpr::default_of(member_ty);
        if self.is_reshaped(member_ty)? {
            return self.construct(&new, bindings);
        }
        let replacement = self.rewrite_type(member_ty)?;
        Ok(Expr::MemberInit {
            new: self.rewrite_plain_new(&new, replacement)?,
            bindings: self.rewrite_bindings(bindings)?,
        })
    }

    fn construct_list(
        &mut self,
        owner: TypeId,
        member_ty: TypeId,
        initializers: &[ElementInit],
    ) -> Result<Expr, ExprError> {
        let interner = self.interner;
        let list_ty = self.rewrite_type(member_ty)?;
        let is_list = interner
            .def_id_of(list_ty)
            .is_some_and(|def| interner.builtins().is_list(def));
        if !is_list {
            return Err(ExprError::ErasureUnsafe {
                ty: interner.type_name(owner),
                reason: format!(
                    "list initializer on a member of type '{}'",
                    interner.type_name(member_ty)
                ),
            });
        }
        Ok(Expr::ListInit {
            new: NewExpr::default_of(list_ty),
            initializers: self.rewrite_initializers(initializers)?,
        })
    }
}

impl TypeVisitor for EntityTypeSubstitutor<'_> {
    type Output = Result<TypeId, ExprError>;

    fn interner(&self) -> &TypeInterner {
        self.interner
    }

    fn visit_simple(&mut self, ty: TypeId) -> Self::Output {
        Ok(ty)
    }

    fn visit_definition(&mut self, ty: TypeId, _def: DefId) -> Self::Output {
        self.resolve_declared(ty)
    }

    fn visit_generic(&mut self, ty: TypeId, _definition: DefId, _args: &[TypeId]) -> Self::Output {
        self.resolve_declared(ty)
    }

    fn visit_array(&mut self, ty: TypeId, element: TypeId, rank: ArrayRank) -> Self::Output {
        let rewritten = self.rewrite_type(element)?;
        if rewritten == element {
            return Ok(ty);
        }
        Ok(match rank {
            ArrayRank::Vector => self.interner.array(rewritten),
            ArrayRank::Multi(rank) => self.interner.array_of_rank(rewritten, rank),
        })
    }

    fn visit_by_ref(&mut self, ty: TypeId, element: TypeId) -> Self::Output {
        let rewritten = self.rewrite_type(element)?;
        Ok(if rewritten == element {
            ty
        } else {
            self.interner.by_ref(rewritten)
        })
    }

    fn visit_pointer(&mut self, ty: TypeId, element: TypeId) -> Self::Output {
        let rewritten = self.rewrite_type(element)?;
        Ok(if rewritten == element {
            ty
        } else {
            self.interner.pointer(rewritten)
        })
    }
}

fn coerce(value: Expr, ty: TypeId) -> Expr {
    if value.ty() == ty {
        value
    } else {
        Expr::Convert {
            operand: Box::new(value),
            ty,
        }
    }
}

fn update_member_types(
    interner: &TypeInterner,
    def: DefId,
    member_types: Vec<TypeId>,
    param_types: Vec<Vec<TypeId>>,
) {
    interner.update_definition(def, |info| {
        for (member, ty) in info.members.iter_mut().zip(member_types) {
            member.ty = ty;
        }
        for (ctor, types) in info.constructors.iter_mut().zip(param_types) {
            for (param, ty) in ctor.params.iter_mut().zip(types) {
                param.ty = ty;
            }
        }
    });
}

#[cfg(test)]
#[path = "../tests/substitutor_tests.rs"]
mod tests;
