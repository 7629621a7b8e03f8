//! Builtin library types registered in every `TypeInterner`.
//!
//! | Definition | Shape |
//! |------------|-------|
//! | `Func<in T1.., out TResult>` | delegate, 0 to 4 parameters |
//! | `Action<in T1..>` | delegate, 1 or 2 parameters |
//! | `Tuple<T1..>` | class with read-only `Item1..ItemN` and a positional constructor |
//! | `Enumerable<out T>` | interface |
//! | `List<T>` | class implementing `Enumerable<T>`, with `Add(T)` and `Count` |
//! | `Expression<TDelegate>` | class, static type of quoted lambdas |

use crate::def::{DefFlags, DefId, DefKind, DefinitionInfo};
use crate::intern::TypeInterner;
use crate::types::{
    ConstructorInfo, DelegateSignature, MemberInfo, MethodInfo, ParamInfo, TypeId, TypeParamInfo,
    Variance,
};

const MAX_FUNC_PARAMS: usize = 4;
const MAX_ACTION_PARAMS: usize = 2;
const MAX_TUPLE_ITEMS: usize = 4;

/// Definition ids of the builtin library.
#[derive(Debug, Clone)]
pub struct Builtins {
    funcs: [DefId; MAX_FUNC_PARAMS + 1],
    actions: [DefId; MAX_ACTION_PARAMS],
    tuples: [DefId; MAX_TUPLE_ITEMS],
    pub list: DefId,
    pub enumerable: DefId,
    pub expression: DefId,
}

impl Builtins {
    pub(crate) fn placeholder() -> Self {
        Builtins {
            funcs: [DefId::INVALID; MAX_FUNC_PARAMS + 1],
            actions: [DefId::INVALID; MAX_ACTION_PARAMS],
            tuples: [DefId::INVALID; MAX_TUPLE_ITEMS],
            list: DefId::INVALID,
            enumerable: DefId::INVALID,
            expression: DefId::INVALID,
        }
    }

    pub(crate) fn register(interner: &TypeInterner) -> Self {
        let funcs = std::array::from_fn(|arity| register_delegate(interner, "Func", arity, true));
        let actions =
            std::array::from_fn(|i| register_delegate(interner, "Action", i + 1, false));
        let tuples = std::array::from_fn(|i| register_tuple(interner, i + 1));

        let enumerable_ty = interner.define(
            DefinitionInfo::interface(interner.intern_string("Enumerable"))
                .with_flags(DefFlags::BUILTIN)
                .with_type_params(vec![TypeParamInfo::with_variance(
                    interner.intern_string("T"),
                    Variance::Covariant,
                )]),
        );
        let enumerable = interner.def_id_of(enumerable_ty).unwrap_or(DefId::INVALID);

        let list_ty = interner.define(
            DefinitionInfo::class(interner.intern_string("List"))
                .with_flags(DefFlags::BUILTIN)
                .with_type_params(vec![TypeParamInfo::new(interner.intern_string("T"))])
                .with_constructor(ConstructorInfo::default()),
        );
        let list = interner.def_id_of(list_ty).unwrap_or(DefId::INVALID);
        let element = interner.type_parameter(list, 0);
        let implements = interner.generic(enumerable, &[element]);
        interner.update_definition(list, |info| {
            info.interfaces.push(implements);
            info.members.push(
                MemberInfo::property(interner.intern_string("Count"), TypeId::INT32).read_only(),
            );
            info.methods.push(MethodInfo::new(
                interner.intern_string("Add"),
                vec![ParamInfo::new(interner.intern_string("item"), element)],
                TypeId::VOID,
            ));
        });

        let expression_ty = interner.define(
            DefinitionInfo::class(interner.intern_string("Expression"))
                .with_flags(DefFlags::BUILTIN)
                .with_type_params(vec![TypeParamInfo::new(
                    interner.intern_string("TDelegate"),
                )]),
        );
        let expression = interner.def_id_of(expression_ty).unwrap_or(DefId::INVALID);

        Builtins {
            funcs,
            actions,
            tuples,
            list,
            enumerable,
            expression,
        }
    }

    /// `Func` definition taking `params` parameters.
    pub fn func(&self, params: usize) -> Option<DefId> {
        self.funcs.get(params).copied()
    }

    pub fn action(&self, params: usize) -> Option<DefId> {
        params
            .checked_sub(1)
            .and_then(|i| self.actions.get(i))
            .copied()
    }

    pub fn tuple(&self, items: usize) -> Option<DefId> {
        items
            .checked_sub(1)
            .and_then(|i| self.tuples.get(i))
            .copied()
    }

    pub fn is_func(&self, def: DefId) -> bool {
        self.funcs.contains(&def)
    }

    pub fn is_tuple(&self, def: DefId) -> bool {
        self.tuples.contains(&def)
    }

    pub fn is_list(&self, def: DefId) -> bool {
        def == self.list
    }

    /// Resolve a builtin by name and generic arity, as written by the codec.
    pub fn by_name(&self, name: &str, arity: usize) -> Option<DefId> {
        match name {
            "Func" => arity.checked_sub(1).and_then(|params| self.func(params)),
            "Action" => self.action(arity),
            "Tuple" => self.tuple(arity),
            "List" if arity == 1 => Some(self.list),
            "Enumerable" if arity == 1 => Some(self.enumerable),
            "Expression" if arity == 1 => Some(self.expression),
            _ => None,
        }
    }
}

fn register_delegate(interner: &TypeInterner, name: &str, params: usize, returns: bool) -> DefId {
    let mut type_params: Vec<TypeParamInfo> = (1..=params)
        .map(|i| {
            let param = if params == 1 && !returns {
                "T".to_string()
            } else {
                format!("T{i}")
            };
            TypeParamInfo::with_variance(interner.intern_string(&param), Variance::Contravariant)
        })
        .collect();
    if returns {
        type_params.push(TypeParamInfo::with_variance(
            interner.intern_string("TResult"),
            Variance::Covariant,
        ));
    }

    let ty = interner.define(
        DefinitionInfo {
            kind: DefKind::Delegate,
            ..DefinitionInfo::class(interner.intern_string(name))
        }
        .with_flags(DefFlags::BUILTIN)
        .with_type_params(type_params),
    );
    let Some(def) = interner.def_id_of(ty) else {
        return DefId::INVALID;
    };

    let param_types: Vec<TypeId> = (0..params)
        .map(|i| interner.type_parameter(def, i as u32))
        .collect();
    let ret = if returns {
        interner.type_parameter(def, params as u32)
    } else {
        TypeId::VOID
    };
    interner.update_definition(def, |info| {
        info.delegate = Some(DelegateSignature {
            params: param_types,
            ret,
        });
    });
    def
}

fn register_tuple(interner: &TypeInterner, items: usize) -> DefId {
    let type_params = (1..=items)
        .map(|i| TypeParamInfo::new(interner.intern_string(&format!("T{i}"))))
        .collect();
    let ty = interner.define(
        DefinitionInfo::class(interner.intern_string("Tuple"))
            .with_flags(DefFlags::BUILTIN | DefFlags::TUPLE)
            .with_type_params(type_params),
    );
    let Some(def) = interner.def_id_of(ty) else {
        return DefId::INVALID;
    };

    let mut members = Vec::with_capacity(items);
    let mut params = Vec::with_capacity(items);
    for i in 0..items {
        let item_ty = interner.type_parameter(def, i as u32);
        let item = interner.intern_string(&format!("Item{}", i + 1));
        members.push(MemberInfo::property(item, item_ty).read_only());
        params.push(ParamInfo::new(
            interner.intern_string(&format!("item{}", i + 1)),
            item_ty,
        ));
    }
    interner.update_definition(def, |info| {
        info.members = members;
        info.constructors.push(ConstructorInfo::new(params));
    });
    def
}

#[cfg(test)]
#[path = "../tests/builtins_tests.rs"]
mod tests;
