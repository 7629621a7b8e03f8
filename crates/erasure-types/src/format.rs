//! Type formatting for diagnostics and error messages.

use crate::def::DefId;
use crate::intern::TypeInterner;
use crate::types::{ArrayRank, IntrinsicKind, ParamOwner, TypeId, WildcardId};
use crate::visitor::TypeVisitor;

/// Renders types the way they are written in source:
/// `int`, `Person[]`, `int[,]`, `int[*]`, `Func<int, string>`, `int&`, `int*`.
pub struct TypeFormatter<'a> {
    interner: &'a TypeInterner,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        TypeFormatter { interner }
    }

    fn def_name(&self, def: DefId) -> String {
        match self.interner.definition(def) {
            Some(info) => self.interner.resolve_atom(info.name).to_string(),
            None => format!("<unknown#{}>", def.0),
        }
    }
}

impl TypeVisitor for TypeFormatter<'_> {
    type Output = String;

    fn interner(&self) -> &TypeInterner {
        self.interner
    }

    fn visit_simple(&mut self, ty: TypeId) -> String {
        format!("<type#{}>", ty.0)
    }

    fn visit_intrinsic(&mut self, _ty: TypeId, kind: IntrinsicKind) -> String {
        kind.name().to_string()
    }

    fn visit_definition(&mut self, _ty: TypeId, def: DefId) -> String {
        let name = self.def_name(def);
        match self.interner.definition(def) {
            Some(info) if info.is_generic_definition() => {
                let commas = ",".repeat(info.type_params.len() - 1);
                format!("{name}<{commas}>")
            }
            _ => name,
        }
    }

    fn visit_generic(&mut self, _ty: TypeId, definition: DefId, args: &[TypeId]) -> String {
        let args: Vec<String> = args.iter().map(|&arg| self.visit(arg)).collect();
        format!("{}<{}>", self.def_name(definition), args.join(", "))
    }

    fn visit_generic_parameter(&mut self, _ty: TypeId, owner: ParamOwner, position: u32) -> String {
        let name = match owner {
            ParamOwner::Type(def) => self.interner.definition(def).and_then(|info| {
                info.type_params
                    .get(position as usize)
                    .map(|p| self.interner.resolve_atom(p.name).to_string())
            }),
            ParamOwner::Method { declaring, index } => {
                self.interner.definition(declaring).and_then(|info| {
                    info.methods
                        .get(index as usize)
                        .and_then(|m| m.type_params.get(position as usize))
                        .map(|p| self.interner.resolve_atom(p.name).to_string())
                })
            }
        };
        name.unwrap_or_else(|| format!("T{position}"))
    }

    fn visit_array(&mut self, _ty: TypeId, element: TypeId, rank: ArrayRank) -> String {
        let element = self.visit(element);
        match rank {
            ArrayRank::Vector => format!("{element}[]"),
            ArrayRank::Multi(1) => format!("{element}[*]"),
            ArrayRank::Multi(rank) => {
                format!("{element}[{}]", ",".repeat((rank as usize).saturating_sub(1)))
            }
        }
    }

    fn visit_by_ref(&mut self, _ty: TypeId, element: TypeId) -> String {
        format!("{}&", self.visit(element))
    }

    fn visit_pointer(&mut self, _ty: TypeId, element: TypeId) -> String {
        format!("{}*", self.visit(element))
    }

    fn visit_wildcard(&mut self, _ty: TypeId, id: WildcardId) -> String {
        self.interner.wildcard_name(id).to_string()
    }
}
