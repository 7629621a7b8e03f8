//! Bonsai codec: expression trees as self-contained JSON documents.
//!
//! A document carries everything needed to rebuild the tree in any
//! [`TypeInterner`]:
//!
//! ```json
//! {
//!   "version": 1,
//!   "definitions": [ { "builtin": "List", "arity": 1 }, { "name": "Person", "kind": "class", ... } ],
//!   "types": [ { "intrinsic": "int" }, { "def": 1 }, { "generic": 0, "args": [1] } ],
//!   "parameters": [ { "name": "p", "type": 1 } ],
//!   "objects": [ { "type": 1, "fields": { "Name": { "string": "x" } } } ],
//!   "expression": { "kind": "lambda", ... }
//! }
//! ```
//!
//! Tables are indexed by first encounter, so the output only depends on the
//! shape of the tree. Types are listed after their components; definitions
//! may refer to each other in any order. Objects and arrays are listed once
//! and referenced by index (`{ "ref": n }`), which keeps aliasing and cycles.
//! Builtin definitions are written by name and resolved against the target
//! interner's builtins; every other definition is re-created on decode.

use crate::error::ExprError;
use crate::expr::{
    BinaryOp, ElementInit, Expr, MemberBinding, MemberRef, MethodRef, NewExpr, ParameterExpr,
};
use crate::value::{ArrayRef, FunctionValue, ObjectRef, Value};
use erasure_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use erasure_types::{
    ArrayRank, ConstructorInfo, DefFlags, DefId, DefKind, DefinitionInfo, DelegateSignature,
    EnumValueInfo, IntrinsicKind, MemberInfo, MemberKind, MethodInfo, ParamInfo, ParamOwner,
    TypeData, TypeId, TypeInterner, TypeParamInfo, Variance,
};
use indexmap::IndexMap;
use serde_json::{Map, Value as Json, json};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

pub const FORMAT_VERSION: u64 = 1;

pub fn serialize(interner: &TypeInterner, expr: &Expr) -> Result<Json, ExprError> {
    let mut encoder = Encoder::new(interner);
    let expression = encoder.expr(expr)?;
    encoder.drain()?;
    debug!(
        definitions = encoder.defs.len(),
        types = encoder.types.len(),
        objects = encoder.objects.len(),
        "serialized expression"
    );
    Ok(json!({
        "version": FORMAT_VERSION,
        "definitions": encoder.defs.into_values().collect::<Vec<_>>(),
        "types": encoder.types.into_values().collect::<Vec<_>>(),
        "parameters": encoder.params.into_values().collect::<Vec<_>>(),
        "objects": encoder.objects.into_values().collect::<Vec<_>>(),
        "expression": expression,
    }))
}

pub fn deserialize(interner: &TypeInterner, document: &Json) -> Result<Expr, ExprError> {
    let version = document.get("version").and_then(Json::as_u64);
    if version != Some(FORMAT_VERSION) {
        return Err(ExprError::codec(format!(
            "unsupported document version {version:?}"
        )));
    }
    let definitions = array(document, "definitions")?;
    let objects = array(document, "objects")?;

    let mut decoder = Decoder::new(interner);
    decoder.declare_definitions(definitions)?;
    decoder.intern_types(array(document, "types")?)?;
    decoder.fill_definitions(definitions)?;
    decoder.read_parameters(array(document, "parameters")?)?;
    decoder.allocate_objects(objects)?;
    decoder.fill_objects(objects)?;
    decoder.expr(field(document, "expression")?)
}

// =============================================================================
// Encoding
// =============================================================================

struct Encoder<'a> {
    interner: &'a TypeInterner,
    /// Definition descriptions; `null` until described.
    defs: IndexMap<DefId, Json>,
    described: usize,
    types: IndexMap<TypeId, Json>,
    params: IndexMap<u32, Json>,
    /// Object and array entries by address; `null` until filled.
    objects: IndexMap<usize, Json>,
    unfilled: VecDeque<Value>,
}

impl<'a> Encoder<'a> {
    fn new(interner: &'a TypeInterner) -> Self {
        Encoder {
            interner,
            defs: IndexMap::new(),
            described: 0,
            types: IndexMap::new(),
            params: IndexMap::new(),
            objects: IndexMap::new(),
            unfilled: VecDeque::new(),
        }
    }

    fn def(&mut self, def: DefId) -> usize {
        if let Some(index) = self.defs.get_index_of(&def) {
            return index;
        }
        self.defs.insert_full(def, Json::Null).0
    }

    fn ty(&mut self, ty: TypeId) -> Result<usize, ExprError> {
        if let Some(index) = self.types.get_index_of(&ty) {
            return Ok(index);
        }
        let interner = self.interner;
        let entry = match interner.lookup(ty) {
            Some(TypeData::Intrinsic(kind)) => json!({ "intrinsic": kind.name() }),
            Some(TypeData::Definition(def)) => json!({ "def": self.def(def) }),
            Some(TypeData::Generic { definition, args }) => {
                let definition = self.def(definition);
                let args = interner
                    .list(args)
                    .iter()
                    .map(|&arg| self.ty(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                json!({ "generic": definition, "args": args })
            }
            Some(TypeData::GenericParameter { owner, position }) => match owner {
                ParamOwner::Type(def) => json!({ "param": position, "owner": self.def(def) }),
                ParamOwner::Method { declaring, index } => {
                    json!({ "param": position, "owner": self.def(declaring), "method": index })
                }
            },
            Some(TypeData::Array { element, rank }) => match rank {
                ArrayRank::Vector => json!({ "array": self.ty(element)? }),
                ArrayRank::Multi(rank) => json!({ "array": self.ty(element)?, "rank": rank }),
            },
            Some(TypeData::ByRef(element)) => json!({ "byRef": self.ty(element)? }),
            Some(TypeData::Pointer(element)) => json!({ "pointer": self.ty(element)? }),
            Some(TypeData::Wildcard(_)) => {
                return Err(ExprError::codec("wildcard types cannot be serialized"));
            }
            None => return Err(ExprError::codec(format!("unknown type #{}", ty.0))),
        };
        Ok(self.types.insert_full(ty, entry).0)
    }

    fn types(&mut self, types: &[TypeId]) -> Result<Vec<usize>, ExprError> {
        types.iter().map(|&ty| self.ty(ty)).collect()
    }

    fn atom(&self, atom: erasure_common::Atom) -> Arc<str> {
        self.interner.resolve_atom(atom)
    }

    /// Describe queued definitions and fill queued objects until both
    /// queues are empty.
    fn drain(&mut self) -> Result<(), ExprError> {
        loop {
            if let Some(value) = self.unfilled.pop_front() {
                self.fill_object(&value)?;
            } else if self.described < self.defs.len() {
                let index = self.described;
                self.described += 1;
                let Some((&def, _)) = self.defs.get_index(index) else {
                    continue;
                };
                let entry = self.describe(def)?;
                if let Some((_, slot)) = self.defs.get_index_mut(index) {
                    *slot = entry;
                }
            } else {
                return Ok(());
            }
        }
    }

    fn describe(&mut self, def: DefId) -> Result<Json, ExprError> {
        let info = self
            .interner
            .definition(def)
            .ok_or_else(|| ExprError::codec(format!("unknown definition #{}", def.0)))?;
        if info.flags.contains(DefFlags::BUILTIN) {
            return Ok(json!({ "builtin": &*self.atom(info.name), "arity": info.type_params.len() }));
        }

        let mut entry = Map::new();
        entry.insert("name".into(), json!(&*self.atom(info.name)));
        entry.insert("kind".into(), json!(info.kind.name()));
        if !info.flags.is_empty() {
            let flags: Vec<&str> = info.flags.iter_names().map(|(name, _)| name).collect();
            entry.insert("flags".into(), json!(flags));
        }
        if !info.type_params.is_empty() {
            entry.insert("typeParams".into(), self.type_params(&info.type_params));
        }
        if let Some(base) = info.base {
            entry.insert("base".into(), json!(self.ty(base)?));
        }
        if !info.interfaces.is_empty() {
            entry.insert("interfaces".into(), json!(self.types(&info.interfaces)?));
        }
        if !info.members.is_empty() {
            let mut members = Vec::with_capacity(info.members.len());
            for member in &info.members {
                members.push(self.member_info(member)?);
            }
            entry.insert("members".into(), Json::Array(members));
        }
        if !info.constructors.is_empty() {
            let mut ctors = Vec::with_capacity(info.constructors.len());
            for ctor in &info.constructors {
                ctors.push(json!({ "params": self.params_info(&ctor.params)? }));
            }
            entry.insert("constructors".into(), Json::Array(ctors));
        }
        if !info.methods.is_empty() {
            let mut methods = Vec::with_capacity(info.methods.len());
            for method in &info.methods {
                methods.push(self.method_info(method)?);
            }
            entry.insert("methods".into(), Json::Array(methods));
        }
        if !info.enum_values.is_empty() {
            let values: Vec<Json> = info
                .enum_values
                .iter()
                .map(|v| {
                    let mut value = Map::new();
                    value.insert("name".into(), json!(&*self.atom(v.name)));
                    value.insert("value".into(), json!(v.value));
                    if let Some(mapping) = v.mapping {
                        value.insert("mapping".into(), json!(&*self.atom(mapping)));
                    }
                    Json::Object(value)
                })
                .collect();
            entry.insert("enumValues".into(), Json::Array(values));
        }
        if let Some(signature) = &info.delegate {
            let params = self.types(&signature.params)?;
            let ret = self.ty(signature.ret)?;
            entry.insert("delegate".into(), json!({ "params": params, "ret": ret }));
        }
        Ok(Json::Object(entry))
    }

    fn type_params(&self, params: &[TypeParamInfo]) -> Json {
        params
            .iter()
            .map(|p| {
                let variance = match p.variance {
                    Variance::Invariant => "invariant",
                    Variance::Covariant => "out",
                    Variance::Contravariant => "in",
                };
                json!({ "name": &*self.atom(p.name), "variance": variance })
            })
            .collect()
    }

    fn member_info(&mut self, member: &MemberInfo) -> Result<Json, ExprError> {
        let kind = match member.kind {
            MemberKind::Property => "property",
            MemberKind::Field => "field",
            MemberKind::Indexer => "indexer",
        };
        let mut entry = Map::new();
        entry.insert("name".into(), json!(&*self.atom(member.name)));
        entry.insert("type".into(), json!(self.ty(member.ty)?));
        entry.insert("kind".into(), json!(kind));
        if let Some(mapping) = member.mapping {
            entry.insert("mapping".into(), json!(&*self.atom(mapping)));
        }
        entry.insert("writable".into(), json!(member.writable));
        entry.insert("static".into(), json!(member.is_static));
        Ok(Json::Object(entry))
    }

    fn params_info(&mut self, params: &[ParamInfo]) -> Result<Json, ExprError> {
        let mut entries = Vec::with_capacity(params.len());
        for param in params {
            let mut entry = Map::new();
            entry.insert("name".into(), json!(&*self.atom(param.name)));
            entry.insert("type".into(), json!(self.ty(param.ty)?));
            if let Some(mapping) = param.mapping {
                entry.insert("mapping".into(), json!(&*self.atom(mapping)));
            }
            entries.push(Json::Object(entry));
        }
        Ok(Json::Array(entries))
    }

    fn method_info(&mut self, method: &MethodInfo) -> Result<Json, ExprError> {
        let mut entry = Map::new();
        entry.insert("name".into(), json!(&*self.atom(method.name)));
        if !method.type_params.is_empty() {
            entry.insert("typeParams".into(), self.type_params(&method.type_params));
        }
        entry.insert("params".into(), self.params_info(&method.params)?);
        entry.insert("ret".into(), json!(self.ty(method.ret)?));
        entry.insert("static".into(), json!(method.is_static));
        if let Some(mapping) = method.mapping {
            entry.insert("mapping".into(), json!(&*self.atom(mapping)));
        }
        Ok(Json::Object(entry))
    }

    fn param(&mut self, param: &ParameterExpr) -> Result<usize, ExprError> {
        if let Some(index) = self.params.get_index_of(&param.id) {
            return Ok(index);
        }
        let entry = json!({ "name": &*param.name, "type": self.ty(param.ty)? });
        Ok(self.params.insert_full(param.id, entry).0)
    }

    fn member_ref(&mut self, member: &MemberRef) -> Result<Json, ExprError> {
        Ok(json!({ "declaring": self.ty(member.declaring)?, "index": member.index }))
    }

    fn method_ref(&mut self, method: &MethodRef) -> Result<Json, ExprError> {
        let declaring = self.ty(method.declaring)?;
        if method.type_args.is_empty() {
            return Ok(json!({ "declaring": declaring, "index": method.index }));
        }
        let type_args = self.types(&method.type_args)?;
        Ok(json!({ "declaring": declaring, "index": method.index, "typeArgs": type_args }))
    }

    /// Index of an object or array, queuing it on first encounter.
    fn object(&mut self, addr: usize, value: &Value) -> usize {
        if let Some(index) = self.objects.get_index_of(&addr) {
            return index;
        }
        self.unfilled.push_back(value.clone());
        self.objects.insert_full(addr, Json::Null).0
    }

    fn fill_object(&mut self, value: &Value) -> Result<(), ExprError> {
        let (addr, entry) = match value {
            Value::Object(obj) => {
                let ty = self.ty(obj.ty())?;
                let mut fields = Map::new();
                for (name, field) in obj.fields() {
                    fields.insert(self.atom(name).to_string(), self.value(&field)?);
                }
                (obj.addr(), json!({ "type": ty, "fields": fields }))
            }
            Value::Array(arr) => {
                let ty = self.ty(arr.ty())?;
                let items = arr
                    .items()
                    .iter()
                    .map(|item| self.value(item))
                    .collect::<Result<Vec<_>, _>>()?;
                (arr.addr(), json!({ "type": ty, "items": items }))
            }
            _ => return Ok(()),
        };
        if let Some(slot) = self.objects.get_mut(&addr) {
            *slot = entry;
        }
        Ok(())
    }

    fn value(&mut self, value: &Value) -> Result<Json, ExprError> {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Boolean(b) => json!(b),
            Value::Int32(v) => json!({ "int32": v }),
            Value::Int64(v) => json!({ "int64": v }),
            Value::Double(v) => {
                if !v.is_finite() {
                    return Err(ExprError::codec(format!("non-finite double {v}")));
                }
                json!({ "double": v })
            }
            Value::String(s) => json!({ "string": &**s }),
            Value::Enum { ty, value } => json!({ "enum": self.ty(*ty)?, "value": value }),
            Value::Object(obj) => json!({ "ref": self.object(obj.addr(), value) }),
            Value::Array(arr) => json!({ "ref": self.object(arr.addr(), value) }),
            Value::Function(func) => json!({ "function": &*func.name, "type": self.ty(func.ty)? }),
            Value::Quote(lambda) => json!({ "quote": self.expr(lambda)? }),
            Value::Closure(_) => {
                return Err(ExprError::codec("evaluated closures cannot be serialized"));
            }
        })
    }

    fn exprs(&mut self, exprs: &[Expr]) -> Result<Vec<Json>, ExprError> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn optional(&mut self, expr: Option<&Expr>) -> Result<Json, ExprError> {
        match expr {
            Some(expr) => self.expr(expr),
            None => Ok(Json::Null),
        }
    }

    fn expr(&mut self, expr: &Expr) -> Result<Json, ExprError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.expr_inner(expr))
    }

    fn expr_inner(&mut self, expr: &Expr) -> Result<Json, ExprError> {
        let kind = expr.kind_name();
        Ok(match expr {
            Expr::Constant { value, ty } => {
                json!({ "kind": kind, "type": self.ty(*ty)?, "value": self.value(value)? })
            }
            Expr::Parameter(param) => json!({ "kind": kind, "parameter": self.param(param)? }),
            Expr::Member { target, member, ty } => json!({
                "kind": kind,
                "target": self.optional(target.as_deref())?,
                "member": self.member_ref(member)?,
                "type": self.ty(*ty)?,
            }),
            Expr::Call {
                target,
                method,
                args,
                ty,
            } => json!({
                "kind": kind,
                "target": self.optional(target.as_deref())?,
                "method": self.method_ref(method)?,
                "args": self.exprs(args)?,
                "type": self.ty(*ty)?,
            }),
            Expr::New(new) => self.new_expr(new, Some(kind))?,
            Expr::MemberInit { new, bindings } => {
                let new = self.new_expr(new, None)?;
                let mut encoded = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    encoded.push(self.binding(binding)?);
                }
                json!({ "kind": kind, "new": new, "bindings": encoded })
            }
            Expr::ListInit { new, initializers } => json!({
                "kind": kind,
                "new": self.new_expr(new, None)?,
                "initializers": self.initializers(initializers)?,
            }),
            Expr::Lambda { params, body, ty } => {
                let params = params
                    .iter()
                    .map(|p| self.param(p))
                    .collect::<Result<Vec<_>, _>>()?;
                json!({
                    "kind": kind,
                    "parameters": params,
                    "body": self.expr(body)?,
                    "type": self.ty(*ty)?,
                })
            }
            Expr::Invoke { target, args, ty } => json!({
                "kind": kind,
                "target": self.expr(target)?,
                "args": self.exprs(args)?,
                "type": self.ty(*ty)?,
            }),
            Expr::Convert { operand, ty } => json!({
                "kind": kind,
                "operand": self.expr(operand)?,
                "type": self.ty(*ty)?,
            }),
            Expr::TypeIs { operand, test } => json!({
                "kind": kind,
                "operand": self.expr(operand)?,
                "test": self.ty(*test)?,
            }),
            Expr::Binary {
                op,
                left,
                right,
                ty,
            } => json!({
                "kind": kind,
                "op": op.name(),
                "left": self.expr(left)?,
                "right": self.expr(right)?,
                "type": self.ty(*ty)?,
            }),
        })
    }

    fn new_expr(&mut self, new: &NewExpr, kind: Option<&str>) -> Result<Json, ExprError> {
        let mut entry = Map::new();
        if let Some(kind) = kind {
            entry.insert("kind".into(), json!(kind));
        }
        entry.insert("type".into(), json!(self.ty(new.ty)?));
        entry.insert("constructor".into(), json!(new.constructor));
        entry.insert("args".into(), Json::Array(self.exprs(&new.args)?));
        if let Some(members) = &new.members {
            entry.insert("members".into(), json!(members));
        }
        Ok(Json::Object(entry))
    }

    fn initializers(&mut self, initializers: &[ElementInit]) -> Result<Json, ExprError> {
        let mut entries = Vec::with_capacity(initializers.len());
        for init in initializers {
            entries.push(json!({
                "method": self.method_ref(&init.add_method)?,
                "args": self.exprs(&init.args)?,
            }));
        }
        Ok(Json::Array(entries))
    }

    fn binding(&mut self, binding: &MemberBinding) -> Result<Json, ExprError> {
        Ok(match binding {
            MemberBinding::Assignment { member, value } => json!({
                "binding": "assignment",
                "member": self.member_ref(member)?,
                "value": self.expr(value)?,
            }),
            MemberBinding::Member { member, bindings } => {
                let member = self.member_ref(member)?;
                let mut nested = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    nested.push(self.binding(binding)?);
                }
                json!({ "binding": "member", "member": member, "bindings": nested })
            }
            MemberBinding::List {
                member,
                initializers,
            } => json!({
                "binding": "list",
                "member": self.member_ref(member)?,
                "initializers": self.initializers(initializers)?,
            }),
        })
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn field<'j>(node: &'j Json, key: &str) -> Result<&'j Json, ExprError> {
    node.get(key)
        .ok_or_else(|| ExprError::codec(format!("missing '{key}'")))
}

fn array<'j>(node: &'j Json, key: &str) -> Result<&'j [Json], ExprError> {
    field(node, key)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ExprError::codec(format!("'{key}' must be an array")))
}

fn string<'j>(node: &'j Json, key: &str) -> Result<&'j str, ExprError> {
    field(node, key)?
        .as_str()
        .ok_or_else(|| ExprError::codec(format!("'{key}' must be a string")))
}

fn index(node: &Json, key: &str) -> Result<usize, ExprError> {
    number(field(node, key)?, key)
}

fn number(node: &Json, key: &str) -> Result<usize, ExprError> {
    node.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ExprError::codec(format!("'{key}' must be a non-negative integer")))
}

fn flag(node: &Json, key: &str) -> bool {
    node.get(key).and_then(Json::as_bool).unwrap_or(false)
}

struct Decoder<'a> {
    interner: &'a TypeInterner,
    defs: Vec<DefId>,
    types: Vec<TypeId>,
    params: Vec<ParameterExpr>,
    objects: Vec<Value>,
}

impl<'a> Decoder<'a> {
    fn new(interner: &'a TypeInterner) -> Self {
        Decoder {
            interner,
            defs: Vec::new(),
            types: Vec::new(),
            params: Vec::new(),
            objects: Vec::new(),
        }
    }

    fn def(&self, node: &Json, key: &str) -> Result<DefId, ExprError> {
        let i = index(node, key)?;
        self.defs
            .get(i)
            .copied()
            .ok_or_else(|| ExprError::codec(format!("definition index {i} out of range")))
    }

    fn type_at(&self, node: &Json, key: &str) -> Result<TypeId, ExprError> {
        let i = number(node, key)?;
        self.types
            .get(i)
            .copied()
            .ok_or_else(|| ExprError::codec(format!("type index {i} out of range")))
    }

    fn ty(&self, node: &Json, key: &str) -> Result<TypeId, ExprError> {
        self.type_at(field(node, key)?, key)
    }

    fn type_list(&self, node: &Json, key: &str) -> Result<Vec<TypeId>, ExprError> {
        match node.get(key) {
            None => Ok(Vec::new()),
            Some(list) => list
                .as_array()
                .ok_or_else(|| ExprError::codec(format!("'{key}' must be an array")))?
                .iter()
                .map(|item| self.type_at(item, key))
                .collect(),
        }
    }

    fn atom(&self, node: &Json, key: &str) -> Result<erasure_common::Atom, ExprError> {
        Ok(self.interner.intern_string(string(node, key)?))
    }

    fn mapping(&self, node: &Json) -> Result<Option<erasure_common::Atom>, ExprError> {
        match node.get("mapping") {
            None | Some(Json::Null) => Ok(None),
            Some(_) => self.atom(node, "mapping").map(Some),
        }
    }

    fn declare_definitions(&mut self, definitions: &[Json]) -> Result<(), ExprError> {
        let interner = self.interner;
        for entry in definitions {
            if let Some(name) = entry.get("builtin").and_then(Json::as_str) {
                let arity = index(entry, "arity")?;
                let def = interner.builtins().by_name(name, arity).ok_or_else(|| {
                    ExprError::codec(format!("unknown builtin '{name}' of arity {arity}"))
                })?;
                self.defs.push(def);
                continue;
            }
            let kind_name = string(entry, "kind")?;
            let kind = DefKind::from_name(kind_name)
                .ok_or_else(|| ExprError::codec(format!("unknown definition kind '{kind_name}'")))?;
            let name = self.atom(entry, "name")?;
            let mut info = match kind {
                DefKind::Class => DefinitionInfo::class(name),
                DefKind::Struct => DefinitionInfo::structure(name),
                DefKind::Interface => DefinitionInfo::interface(name),
                DefKind::Enum => DefinitionInfo::enumeration(name, Vec::new()),
                DefKind::Delegate => DefinitionInfo::delegate(
                    name,
                    DelegateSignature {
                        params: Vec::new(),
                        ret: TypeId::VOID,
                    },
                ),
            };
            info.base = None;
            info.delegate = None;
            if let Some(flags) = entry.get("flags").and_then(Json::as_array) {
                for flag in flags {
                    let flag_name = flag.as_str().unwrap_or_default();
                    let parsed = DefFlags::from_name(flag_name)
                        .ok_or_else(|| ExprError::codec(format!("unknown flag '{flag_name}'")))?;
                    info.flags |= parsed;
                }
            }
            info.type_params = self.type_params(entry)?;
            let ty = interner.define(info);
            let def = interner
                .def_id_of(ty)
                .ok_or_else(|| ExprError::codec("definition was not registered"))?;
            self.defs.push(def);
        }
        Ok(())
    }

    fn type_params(&self, node: &Json) -> Result<Vec<TypeParamInfo>, ExprError> {
        let Some(params) = node.get("typeParams").and_then(Json::as_array) else {
            return Ok(Vec::new());
        };
        params
            .iter()
            .map(|p| {
                let variance = match p.get("variance").and_then(Json::as_str) {
                    Some("out") => Variance::Covariant,
                    Some("in") => Variance::Contravariant,
                    _ => Variance::Invariant,
                };
                Ok(TypeParamInfo::with_variance(self.atom(p, "name")?, variance))
            })
            .collect()
    }

    fn intern_types(&mut self, types: &[Json]) -> Result<(), ExprError> {
        let interner = self.interner;
        for entry in types {
            let ty = if let Some(name) = entry.get("intrinsic").and_then(Json::as_str) {
                IntrinsicKind::from_name(name)
                    .ok_or_else(|| ExprError::codec(format!("unknown intrinsic '{name}'")))?
                    .type_id()
            } else if entry.get("def").is_some() {
                interner.definition_type(self.def(entry, "def")?)
            } else if entry.get("generic").is_some() {
                let definition = self.def(entry, "generic")?;
                interner.generic(definition, &self.type_list(entry, "args")?)
            } else if entry.get("param").is_some() {
                let position = index(entry, "param")? as u32;
                let owner = self.def(entry, "owner")?;
                let owner = match entry.get("method") {
                    Some(method) => ParamOwner::Method {
                        declaring: owner,
                        index: number(method, "method")? as u32,
                    },
                    None => ParamOwner::Type(owner),
                };
                interner.generic_parameter(owner, position)
            } else if entry.get("array").is_some() {
                let element = self.ty(entry, "array")?;
                match entry.get("rank") {
                    Some(rank) => {
                        let rank = u8::try_from(number(rank, "rank")?)
                            .map_err(|_| ExprError::codec("array rank out of range"))?;
                        interner.array_of_rank(element, rank)
                    }
                    None => interner.array(element),
                }
            } else if entry.get("byRef").is_some() {
                interner.by_ref(self.ty(entry, "byRef")?)
            } else if entry.get("pointer").is_some() {
                interner.pointer(self.ty(entry, "pointer")?)
            } else {
                return Err(ExprError::codec(format!("unrecognized type entry {entry}")));
            };
            self.types.push(ty);
        }
        Ok(())
    }

    fn fill_definitions(&self, definitions: &[Json]) -> Result<(), ExprError> {
        for (entry, &def) in definitions.iter().zip(&self.defs) {
            if entry.get("builtin").is_some() {
                continue;
            }
            let base = match entry.get("base") {
                Some(base) => Some(self.type_at(base, "base")?),
                None => None,
            };
            let interfaces = self.type_list(entry, "interfaces")?;
            let members = self.members(entry)?;
            let constructors = match entry.get("constructors").and_then(Json::as_array) {
                Some(ctors) => ctors
                    .iter()
                    .map(|c| Ok(ConstructorInfo::new(self.params(field(c, "params")?)?)))
                    .collect::<Result<Vec<_>, ExprError>>()?,
                None => Vec::new(),
            };
            let methods = self.methods(entry)?;
            let enum_values = self.enum_values(entry)?;
            let delegate = match entry.get("delegate") {
                Some(signature) => Some(DelegateSignature {
                    params: self.type_list(signature, "params")?,
                    ret: self.ty(signature, "ret")?,
                }),
                None => None,
            };
            self.interner.update_definition(def, |info| {
                info.base = base;
                info.interfaces = interfaces;
                info.members = members;
                info.constructors = constructors;
                info.methods = methods;
                info.enum_values = enum_values;
                info.delegate = delegate;
            });
        }
        Ok(())
    }

    fn members(&self, entry: &Json) -> Result<Vec<MemberInfo>, ExprError> {
        let Some(members) = entry.get("members").and_then(Json::as_array) else {
            return Ok(Vec::new());
        };
        let mut decoded = Vec::with_capacity(members.len());
        for m in members {
            let kind = match string(m, "kind")? {
                "property" => MemberKind::Property,
                "field" => MemberKind::Field,
                "indexer" => MemberKind::Indexer,
                other => return Err(ExprError::codec(format!("unknown member kind '{other}'"))),
            };
            decoded.push(MemberInfo {
                name: self.atom(m, "name")?,
                ty: self.ty(m, "type")?,
                kind,
                mapping: self.mapping(m)?,
                writable: flag(m, "writable"),
                is_static: flag(m, "static"),
            });
        }
        Ok(decoded)
    }

    fn params(&self, params: &Json) -> Result<Vec<ParamInfo>, ExprError> {
        params
            .as_array()
            .ok_or_else(|| ExprError::codec("'params' must be an array"))?
            .iter()
            .map(|p| {
                Ok(ParamInfo {
                    name: self.atom(p, "name")?,
                    ty: self.ty(p, "type")?,
                    mapping: self.mapping(p)?,
                })
            })
            .collect()
    }

    fn methods(&self, entry: &Json) -> Result<Vec<MethodInfo>, ExprError> {
        let Some(methods) = entry.get("methods").and_then(Json::as_array) else {
            return Ok(Vec::new());
        };
        methods
            .iter()
            .map(|m| {
                Ok(MethodInfo {
                    name: self.atom(m, "name")?,
                    type_params: self.type_params(m)?,
                    params: self.params(field(m, "params")?)?,
                    ret: self.ty(m, "ret")?,
                    is_static: flag(m, "static"),
                    mapping: self.mapping(m)?,
                })
            })
            .collect()
    }

    fn enum_values(&self, entry: &Json) -> Result<Vec<EnumValueInfo>, ExprError> {
        let Some(values) = entry.get("enumValues").and_then(Json::as_array) else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|v| {
                Ok(EnumValueInfo {
                    name: self.atom(v, "name")?,
                    value: field(v, "value")?
                        .as_i64()
                        .ok_or_else(|| ExprError::codec("enum value must be an integer"))?,
                    mapping: self.mapping(v)?,
                })
            })
            .collect()
    }

    fn read_parameters(&mut self, params: &[Json]) -> Result<(), ExprError> {
        for entry in params {
            let param = ParameterExpr::new(string(entry, "name")?, self.ty(entry, "type")?);
            self.params.push(param);
        }
        Ok(())
    }

    fn allocate_objects(&mut self, objects: &[Json]) -> Result<(), ExprError> {
        for entry in objects {
            let ty = self.ty(entry, "type")?;
            let value = if entry.get("items").is_some() {
                Value::Array(ArrayRef::new(ty, Vec::new()))
            } else {
                Value::Object(ObjectRef::new(ty))
            };
            self.objects.push(value);
        }
        Ok(())
    }

    fn fill_objects(&self, objects: &[Json]) -> Result<(), ExprError> {
        for (entry, value) in objects.iter().zip(&self.objects) {
            match value {
                Value::Array(arr) => {
                    let items = array(entry, "items")?
                        .iter()
                        .map(|item| self.value(item))
                        .collect::<Result<Vec<_>, _>>()?;
                    arr.set_items(items);
                }
                Value::Object(obj) => {
                    let fields = field(entry, "fields")?
                        .as_object()
                        .ok_or_else(|| ExprError::codec("'fields' must be an object"))?;
                    for (name, field_value) in fields {
                        obj.set(self.interner.intern_string(name), self.value(field_value)?);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn value(&self, node: &Json) -> Result<Value, ExprError> {
        let int = |key: &str| {
            field(node, key)?
                .as_i64()
                .ok_or_else(|| ExprError::codec(format!("'{key}' must be an integer")))
        };
        match node {
            Json::Null => return Ok(Value::Null),
            Json::Bool(b) => return Ok(Value::Boolean(*b)),
            _ => {}
        }
        if node.get("int32").is_some() {
            let v = int("int32")?;
            return i32::try_from(v)
                .map(Value::Int32)
                .map_err(|_| ExprError::codec(format!("{v} is out of range for int32")));
        }
        if node.get("int64").is_some() {
            return int("int64").map(Value::Int64);
        }
        if let Some(v) = node.get("double") {
            return v
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| ExprError::codec("'double' must be a number"));
        }
        if node.get("string").is_some() {
            return Ok(Value::string(string(node, "string")?));
        }
        if node.get("enum").is_some() {
            return Ok(Value::Enum {
                ty: self.ty(node, "enum")?,
                value: int("value")?,
            });
        }
        if node.get("ref").is_some() {
            let i = index(node, "ref")?;
            return self
                .objects
                .get(i)
                .cloned()
                .ok_or_else(|| ExprError::codec(format!("object index {i} out of range")));
        }
        if node.get("function").is_some() {
            return Ok(Value::Function(FunctionValue::new(
                self.ty(node, "type")?,
                string(node, "function")?,
            )));
        }
        if let Some(lambda) = node.get("quote") {
            return Ok(Value::Quote(Arc::new(self.expr(lambda)?)));
        }
        Err(ExprError::codec(format!("unrecognized value {node}")))
    }

    fn param(&self, node: &Json, key: &str) -> Result<ParameterExpr, ExprError> {
        let i = number(node, key)?;
        self.params
            .get(i)
            .cloned()
            .ok_or_else(|| ExprError::codec(format!("parameter index {i} out of range")))
    }

    fn member_ref(&self, node: &Json) -> Result<MemberRef, ExprError> {
        Ok(MemberRef::new(
            self.ty(node, "declaring")?,
            index(node, "index")? as u32,
        ))
    }

    fn method_ref(&self, node: &Json) -> Result<MethodRef, ExprError> {
        let type_args = self.type_list(node, "typeArgs")?;
        Ok(MethodRef::generic(
            self.ty(node, "declaring")?,
            index(node, "index")? as u32,
            &type_args,
        ))
    }

    fn exprs(&self, node: &Json, key: &str) -> Result<Vec<Expr>, ExprError> {
        array(node, key)?.iter().map(|e| self.expr(e)).collect()
    }

    fn boxed(&self, node: &Json, key: &str) -> Result<Box<Expr>, ExprError> {
        self.expr(field(node, key)?).map(Box::new)
    }

    fn optional(&self, node: &Json, key: &str) -> Result<Option<Box<Expr>>, ExprError> {
        match node.get(key) {
            None | Some(Json::Null) => Ok(None),
            Some(expr) => self.expr(expr).map(|e| Some(Box::new(e))),
        }
    }

    fn expr(&self, node: &Json) -> Result<Expr, ExprError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.expr_inner(node))
    }

    fn expr_inner(&self, node: &Json) -> Result<Expr, ExprError> {
        let kind = string(node, "kind")?;
        Ok(match kind {
            "constant" => Expr::Constant {
                value: self.value(field(node, "value")?)?,
                ty: self.ty(node, "type")?,
            },
            "parameter" => Expr::Parameter(self.param(field(node, "parameter")?, "parameter")?),
            "member" => Expr::Member {
                target: self.optional(node, "target")?,
                member: self.member_ref(field(node, "member")?)?,
                ty: self.ty(node, "type")?,
            },
            "call" => Expr::Call {
                target: self.optional(node, "target")?,
                method: self.method_ref(field(node, "method")?)?,
                args: self.exprs(node, "args")?,
                ty: self.ty(node, "type")?,
            },
            "new" => Expr::New(self.new_expr(node)?),
            "memberInit" => Expr::MemberInit {
                new: self.new_expr(field(node, "new")?)?,
                bindings: self.bindings(node)?,
            },
            "listInit" => Expr::ListInit {
                new: self.new_expr(field(node, "new")?)?,
                initializers: self.initializers(node)?,
            },
            "lambda" => Expr::Lambda {
                params: array(node, "parameters")?
                    .iter()
                    .map(|p| self.param(p, "parameters"))
                    .collect::<Result<Vec<_>, _>>()?,
                body: self.boxed(node, "body")?,
                ty: self.ty(node, "type")?,
            },
            "invoke" => Expr::Invoke {
                target: self.boxed(node, "target")?,
                args: self.exprs(node, "args")?,
                ty: self.ty(node, "type")?,
            },
            "convert" => Expr::Convert {
                operand: self.boxed(node, "operand")?,
                ty: self.ty(node, "type")?,
            },
            "typeIs" => Expr::TypeIs {
                operand: self.boxed(node, "operand")?,
                test: self.ty(node, "test")?,
            },
            "binary" => {
                let op_name = string(node, "op")?;
                Expr::Binary {
                    op: BinaryOp::from_name(op_name)
                        .ok_or_else(|| ExprError::codec(format!("unknown operator '{op_name}'")))?,
                    left: self.boxed(node, "left")?,
                    right: self.boxed(node, "right")?,
                    ty: self.ty(node, "type")?,
                }
            }
            other => return Err(ExprError::codec(format!("unknown expression kind '{other}'"))),
        })
    }

    fn new_expr(&self, node: &Json) -> Result<NewExpr, ExprError> {
        let constructor = match node.get("constructor") {
            None | Some(Json::Null) => None,
            Some(index) => Some(number(index, "constructor")? as u32),
        };
        let members = match node.get("members").and_then(Json::as_array) {
            Some(members) => Some(
                members
                    .iter()
                    .map(|m| number(m, "members").map(|i| i as u32))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        Ok(NewExpr {
            ty: self.ty(node, "type")?,
            constructor,
            args: self.exprs(node, "args")?,
            members,
        })
    }

    fn initializers(&self, node: &Json) -> Result<Vec<ElementInit>, ExprError> {
        array(node, "initializers")?
            .iter()
            .map(|init| {
                Ok(ElementInit {
                    add_method: self.method_ref(field(init, "method")?)?,
                    args: self.exprs(init, "args")?,
                })
            })
            .collect()
    }

    fn bindings(&self, node: &Json) -> Result<Vec<MemberBinding>, ExprError> {
        array(node, "bindings")?
            .iter()
            .map(|binding| {
                let member = self.member_ref(field(binding, "member")?)?;
                Ok(match string(binding, "binding")? {
                    "assignment" => MemberBinding::Assignment {
                        member,
                        value: self.expr(field(binding, "value")?)?,
                    },
                    "member" => MemberBinding::Member {
                        member,
                        bindings: self.bindings(binding)?,
                    },
                    "list" => MemberBinding::List {
                        member,
                        initializers: self.initializers(binding)?,
                    },
                    other => {
                        return Err(ExprError::codec(format!("unknown binding kind '{other}'")));
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../tests/codec_tests.rs"]
mod tests;
