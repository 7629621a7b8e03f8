use super::*;
use crate::types::{ConstructorInfo, EnumValueInfo, ParamInfo};

fn entity(interner: &TypeInterner, name: &str) -> DefinitionInfo {
    let atom = interner.intern_string("Name");
    let mapping = interner.intern_string("contoso://person/name");
    DefinitionInfo::class(interner.intern_string(name))
        .with_members(vec![MemberInfo::property(atom, TypeId::STRING).mapped(mapping)])
}

#[test]
fn test_entity_detection() {
    let interner = TypeInterner::new();
    let person = interner.define(entity(&interner, "Person"));
    let known = interner.define(entity(&interner, "Known").known());
    let plain = interner.define(DefinitionInfo::class(interner.intern_string("Plain")));

    assert!(is_entity_type(&interner, person));
    assert!(is_rewritable_entity(&interner, person));
    assert!(is_entity_type(&interner, known));
    assert!(is_known_type(&interner, known));
    assert!(!is_rewritable_entity(&interner, known));
    assert!(!is_entity_type(&interner, plain));
    assert!(!is_entity_type(&interner, TypeId::INT32));
}

#[test]
fn test_constructor_mapping_marks_entity() {
    let interner = TypeInterner::new();
    let mapping = interner.intern_string("contoso://point/x");
    let point = interner.define(
        DefinitionInfo::structure(interner.intern_string("Point")).with_constructor(
            ConstructorInfo::new(vec![
                ParamInfo::new(interner.intern_string("x"), TypeId::INT32).mapped(mapping),
            ]),
        ),
    );
    assert!(is_entity_type(&interner, point));
}

#[test]
fn test_generated_types_are_not_entities() {
    let interner = TypeInterner::new();
    let anonymous = interner.define(
        entity(&interner, "<>__Anonymous1").with_flags(DefFlags::GENERATED | DefFlags::ANONYMOUS),
    );
    assert!(!is_entity_type(&interner, anonymous));
    assert!(is_structural_type(&interner, anonymous));
    assert_eq!(classify(&interner, anonymous), DataTypeKind::Anonymous);
}

#[test]
fn test_mapped_members_skip_static_indexers_and_unmapped() {
    let interner = TypeInterner::new();
    let key = interner.intern_string("key");
    let person = interner.define(
        DefinitionInfo::class(interner.intern_string("Person")).with_members(vec![
            MemberInfo::property(interner.intern_string("A"), TypeId::INT32).mapped(key),
            MemberInfo::property(interner.intern_string("B"), TypeId::INT32),
            MemberInfo::property(interner.intern_string("C"), TypeId::INT32)
                .mapped(key)
                .static_member(),
            MemberInfo::indexer(interner.intern_string("Item"), TypeId::INT32).mapped(key),
            MemberInfo::field(interner.intern_string("D"), TypeId::STRING).mapped(key),
        ]),
    );
    let indices: Vec<u32> = mapped_members(&interner, person)
        .into_iter()
        .map(|(index, _)| index)
        .collect();
    assert_eq!(indices, vec![0, 4]);
}

#[test]
fn test_mapped_enum() {
    let interner = TypeInterner::new();
    let mapped = interner.define(DefinitionInfo::enumeration(
        interner.intern_string("Color"),
        vec![EnumValueInfo::new(interner.intern_string("Red"), 0)
            .mapped(interner.intern_string("contoso://color/red"))],
    ));
    let plain = interner.define(DefinitionInfo::enumeration(
        interner.intern_string("Size"),
        vec![EnumValueInfo::new(interner.intern_string("Small"), 0)],
    ));
    assert!(is_mapped_enum(&interner, mapped));
    assert!(!is_mapped_enum(&interner, plain));
    assert_eq!(classify(&interner, mapped), DataTypeKind::Enum { mapped: true });
    assert_eq!(classify(&interner, plain), DataTypeKind::Enum { mapped: false });
}

#[test]
fn test_classify() {
    let interner = TypeInterner::new();
    let person = interner.define(entity(&interner, "Person"));
    let known = interner.define(entity(&interner, "Known").known());
    let opaque = interner.define(DefinitionInfo::class(interner.intern_string("Opaque")));
    let func = interner.func(&[TypeId::INT32], TypeId::INT32).expect("Func<,>");

    assert_eq!(classify(&interner, TypeId::STRING), DataTypeKind::Primitive);
    assert_eq!(classify(&interner, person), DataTypeKind::Entity);
    assert_eq!(classify(&interner, known), DataTypeKind::Known);
    assert_eq!(classify(&interner, opaque), DataTypeKind::Opaque);
    assert_eq!(classify(&interner, interner.array(person)), DataTypeKind::Array);
    assert_eq!(classify(&interner, interner.list_of(person)), DataTypeKind::Collection);
    assert_eq!(
        classify(&interner, interner.enumerable_of(person)),
        DataTypeKind::Collection
    );
    assert_eq!(classify(&interner, func), DataTypeKind::Function);
    assert_eq!(
        classify(&interner, interner.expression_of(func)),
        DataTypeKind::Quotation
    );
    assert_eq!(
        classify(&interner, interner.tuple(&[person]).expect("Tuple<>")),
        DataTypeKind::Tuple
    );
    assert_eq!(
        classify(&interner, interner.fresh_wildcard("W")),
        DataTypeKind::Unsupported
    );
}
