use super::*;
use crate::def::{DefFlags, DefKind};
use crate::types::{MemberInfo, TypeParamInfo};

fn person(interner: &TypeInterner) -> TypeId {
    let name = interner.intern_string("Name");
    interner.define(
        DefinitionInfo::class(interner.intern_string("Person"))
            .with_members(vec![MemberInfo::property(name, TypeId::STRING).mapped(name)]),
    )
}

#[test]
fn test_intrinsics_are_preinterned() {
    let interner = TypeInterner::new();
    for kind in IntrinsicKind::ALL {
        assert_eq!(interner.lookup(kind.type_id()), Some(TypeData::Intrinsic(kind)));
        assert_eq!(interner.intern(TypeData::Intrinsic(kind)), kind.type_id());
    }
    assert_eq!(interner.type_name(TypeId::INT32), "int");
}

#[test]
fn test_interning_is_idempotent() {
    let interner = TypeInterner::new();
    let a = interner.array(TypeId::INT32);
    let b = interner.array(TypeId::INT32);
    assert_eq!(a, b);

    let list_a = interner.list_of(TypeId::STRING);
    let list_b = interner.list_of(TypeId::STRING);
    assert_eq!(list_a, list_b);
    assert_ne!(list_a, interner.list_of(TypeId::INT32));
}

#[test]
fn test_vector_and_rank_one_array_differ() {
    let interner = TypeInterner::new();
    let vector = interner.array(TypeId::INT32);
    let single = interner.array_of_rank(TypeId::INT32, 1);
    assert_ne!(vector, single);
    assert_eq!(interner.type_name(vector), "int[]");
    assert_eq!(interner.type_name(single), "int[*]");
    assert_eq!(interner.type_name(interner.array_of_rank(TypeId::INT32, 2)), "int[,]");
}

#[test]
fn test_shapes() {
    let interner = TypeInterner::new();
    let list_open = interner.definition_type(interner.builtins().list);
    assert_eq!(interner.shape(TypeId::INT32), TypeShape::Simple);
    assert_eq!(interner.shape(person(&interner)), TypeShape::Simple);
    assert_eq!(interner.shape(list_open), TypeShape::GenericOpen);
    assert_eq!(
        interner.shape(interner.list_of(TypeId::INT32)),
        TypeShape::GenericClosed
    );
    assert_eq!(
        interner.shape(interner.type_parameter(interner.builtins().list, 0)),
        TypeShape::GenericParameter
    );
    assert_eq!(interner.shape(interner.array(TypeId::INT32)), TypeShape::Array);
    assert_eq!(interner.shape(interner.by_ref(TypeId::INT32)), TypeShape::ByRef);
    assert_eq!(interner.shape(interner.pointer(TypeId::INT32)), TypeShape::Pointer);
    assert_eq!(
        interner.shape(interner.fresh_wildcard("W")),
        TypeShape::Wildcard
    );
}

#[test]
fn test_fresh_wildcards_are_distinct() {
    let interner = TypeInterner::new();
    let a = interner.fresh_wildcard("T");
    let b = interner.fresh_wildcard("T");
    assert_ne!(a, b);
    assert!(interner.is_wildcard(a));
    assert!(!interner.is_wildcard(TypeId::INT32));
    assert_eq!(interner.type_name(a), "T");
}

#[test]
fn test_define_and_update() {
    let interner = TypeInterner::new();
    let ty = person(&interner);
    let def = interner.def_id_of(ty).expect("declared");
    assert_eq!(interner.definition_type(def), ty);
    assert_eq!(interner.type_name(ty), "Person");

    let age = interner.intern_string("Age");
    assert!(interner.update_definition(def, |info| {
        info.members.push(MemberInfo::property(age, TypeId::INT32));
    }));
    assert_eq!(interner.members_of(ty).len(), 2);
    let (index, member) = interner.find_member(ty, "Age").expect("added");
    assert_eq!(index, 1);
    assert_eq!(member.ty, TypeId::INT32);
    assert!(interner.find_member(ty, "Missing").is_none());
}

#[test]
fn test_members_of_closed_generic_are_instantiated() {
    let interner = TypeInterner::new();
    let box_ty = interner.define(
        DefinitionInfo::class(interner.intern_string("Box"))
            .with_type_params(vec![TypeParamInfo::new(interner.intern_string("T"))]),
    );
    let def = interner.def_id_of(box_ty).expect("declared");
    let param = interner.type_parameter(def, 0);
    let value = interner.intern_string("Value");
    let values = interner.intern_string("Values");
    interner.update_definition(def, |info| {
        info.members = vec![
            MemberInfo::property(value, param),
            MemberInfo::property(values, interner.list_of(param)),
        ];
    });

    let closed = interner.generic(def, &[TypeId::STRING]);
    let members = interner.members_of(closed);
    assert_eq!(members[0].ty, TypeId::STRING);
    assert_eq!(members[1].ty, interner.list_of(TypeId::STRING));
    assert_eq!(interner.type_name(closed), "Box<string>");
    assert_eq!(interner.type_name(box_ty), "Box<>");
    assert_eq!(interner.type_name(param), "T");
}

#[test]
fn test_list_method_instantiation() {
    let interner = TypeInterner::new();
    let list = interner.list_of(TypeId::INT64);
    let add = interner.find_method(list, "Add").expect("List.Add");
    let method = interner.method(list, add, &[]).expect("instantiated");
    assert_eq!(method.params[0].ty, TypeId::INT64);
    assert_eq!(method.ret, TypeId::VOID);
    assert!(interner.method(list, add, &[TypeId::INT32]).is_none());
}

#[test]
fn test_func_signature() {
    let interner = TypeInterner::new();
    let func = interner
        .func(&[TypeId::INT32, TypeId::STRING], TypeId::BOOLEAN)
        .expect("Func<,,>");
    let signature = interner.delegate_signature(func).expect("delegate");
    assert_eq!(signature.params, vec![TypeId::INT32, TypeId::STRING]);
    assert_eq!(signature.ret, TypeId::BOOLEAN);
    assert_eq!(interner.type_name(func), "Func<int, string, bool>");
    assert_eq!(
        interner.definition_of(func).map(|info| info.kind),
        Some(DefKind::Delegate)
    );
    assert!(interner.func(&[TypeId::INT32; 5], TypeId::INT32).is_none());
}

#[test]
fn test_tuple_members() {
    let interner = TypeInterner::new();
    let tuple = interner
        .tuple(&[TypeId::INT32, TypeId::STRING])
        .expect("Tuple<,>");
    let members = interner.members_of(tuple);
    assert_eq!(members.len(), 2);
    assert_eq!(&*interner.resolve_atom(members[1].name), "Item2");
    assert_eq!(members[1].ty, TypeId::STRING);
    let info = interner.definition_of(tuple).expect("builtin");
    assert!(info.flags.contains(DefFlags::TUPLE));
}

#[test]
fn test_list_implements_enumerable() {
    let interner = TypeInterner::new();
    let list = interner.list_of(TypeId::STRING);
    assert_eq!(
        interner.interfaces_of(list),
        vec![interner.enumerable_of(TypeId::STRING)]
    );
}

#[test]
fn test_system_ids_differ() {
    let a = TypeInterner::new();
    let b = TypeInterner::new();
    assert_ne!(a.system_id(), b.system_id());
}

#[test]
fn test_concurrent_interning() {
    use rayon::prelude::*;

    let interner = TypeInterner::new();
    let ids: Vec<TypeId> = (0..64)
        .into_par_iter()
        .map(|i| {
            let element = if i % 2 == 0 { TypeId::INT32 } else { TypeId::STRING };
            interner.list_of(interner.array(element))
        })
        .collect();
    assert_eq!(ids[0], ids[2]);
    assert_eq!(ids[1], ids[3]);
    assert_ne!(ids[0], ids[1]);
}
