//! Type models shared by the expression tests.

use crate::expr::Expr;
use crate::value::Value;
use erasure_common::Atom;
use erasure_types::{
    ConstructorInfo, DefinitionInfo, EnumValueInfo, MemberInfo, ParamInfo, TypeId, TypeInterner,
};

pub(crate) fn atom(interner: &TypeInterner, s: &str) -> Atom {
    interner.intern_string(s)
}

pub(crate) fn field_of(interner: &TypeInterner, value: &Value, mapping: &str) -> Option<Value> {
    value.as_object()?.get_mapped(interner, mapping)
}

/// `class Qux { [baz] int Baz; [foo] string Foo; Qux([baz] int baz) }`
pub(crate) fn qux(interner: &TypeInterner) -> TypeId {
    let baz = atom(interner, "baz");
    let foo = atom(interner, "foo");
    interner.define(
        DefinitionInfo::class(atom(interner, "Qux"))
            .with_members(vec![
                MemberInfo::property(atom(interner, "Baz"), TypeId::INT32).mapped(baz),
                MemberInfo::property(atom(interner, "Foo"), TypeId::STRING).mapped(foo),
            ])
            .with_constructor(ConstructorInfo::new(vec![
                ParamInfo::new(atom(interner, "baz"), TypeId::INT32).mapped(baz),
            ])),
    )
}

/// Self-referential entity:
/// `class Person { [name] string Name; [age] int Age; [friends] List<Person> Friends; [best] Person Best }`
pub(crate) fn person(interner: &TypeInterner) -> TypeId {
    let person = interner.define(DefinitionInfo::class(atom(interner, "Person")));
    let friends = interner.list_of(person);
    let members = vec![
        MemberInfo::property(atom(interner, "Name"), TypeId::STRING).mapped(atom(interner, "name")),
        MemberInfo::property(atom(interner, "Age"), TypeId::INT32).mapped(atom(interner, "age")),
        MemberInfo::property(atom(interner, "Friends"), friends).mapped(atom(interner, "friends")),
        MemberInfo::property(atom(interner, "Best"), person).mapped(atom(interner, "best")),
    ];
    if let Some(def) = interner.def_id_of(person) {
        interner.update_definition(def, |info| info.members = members);
    }
    person
}

/// `enum Color { [red] Red = 0, [green] Green = 1 }`
pub(crate) fn color(interner: &TypeInterner) -> TypeId {
    interner.define(DefinitionInfo::enumeration(
        atom(interner, "Color"),
        vec![
            EnumValueInfo::new(atom(interner, "Red"), 0).mapped(atom(interner, "red")),
            EnumValueInfo::new(atom(interner, "Green"), 1).mapped(atom(interner, "green")),
        ],
    ))
}

/// `class Foo2 { [bar] string Bar; [qux] int Qux; Foo2([bar] string bar, int baz); Foo2([bar] string bar) }`
pub(crate) fn foo2(interner: &TypeInterner) -> TypeId {
    let bar = atom(interner, "bar");
    interner.define(
        DefinitionInfo::class(atom(interner, "Foo2"))
            .with_members(vec![
                MemberInfo::property(atom(interner, "Bar"), TypeId::STRING).mapped(bar),
                MemberInfo::property(atom(interner, "Qux"), TypeId::INT32).mapped(atom(interner, "qux")),
            ])
            .with_constructor(ConstructorInfo::new(vec![
                ParamInfo::new(atom(interner, "bar"), TypeId::STRING).mapped(bar),
                ParamInfo::new(atom(interner, "baz"), TypeId::INT32),
            ]))
            .with_constructor(ConstructorInfo::new(vec![
                ParamInfo::new(atom(interner, "bar"), TypeId::STRING).mapped(bar),
            ])),
    )
}

/// Order model with known types in the middle:
///
/// ```text
/// class Order            { [id] int Id; [customer] KnownCustomer Customer }
/// known KnownCustomer    { [name] string Name; [address] KnownAddress Address; KnownCustomer(KnownAddress address) }
/// known KnownAddress     { [extra] object Extra }
/// class Note             { [text] string Text }
/// ```
pub(crate) struct OrderModel {
    pub order: TypeId,
    pub customer: TypeId,
    pub address: TypeId,
    pub note: TypeId,
}

pub(crate) fn order_model(interner: &TypeInterner) -> OrderModel {
    let address = interner.define(
        DefinitionInfo::class(atom(interner, "KnownAddress"))
            .known()
            .with_members(vec![
                MemberInfo::property(atom(interner, "Extra"), TypeId::OBJECT).mapped(atom(interner, "extra")),
            ]),
    );
    let customer = interner.define(
        DefinitionInfo::class(atom(interner, "KnownCustomer"))
            .known()
            .with_members(vec![
                MemberInfo::property(atom(interner, "Name"), TypeId::STRING).mapped(atom(interner, "name")),
                MemberInfo::property(atom(interner, "Address"), address).mapped(atom(interner, "address")),
            ])
            .with_constructor(ConstructorInfo::new(vec![ParamInfo::new(
                atom(interner, "address"),
                address,
            )])),
    );
    let order = interner.define(DefinitionInfo::class(atom(interner, "Order")).with_members(vec![
        MemberInfo::property(atom(interner, "Id"), TypeId::INT32).mapped(atom(interner, "id")),
        MemberInfo::property(atom(interner, "Customer"), customer).mapped(atom(interner, "customer")),
    ]));
    let note = interner.define(DefinitionInfo::class(atom(interner, "Note")).with_members(vec![
        MemberInfo::property(atom(interner, "Text"), TypeId::STRING).mapped(atom(interner, "text")),
    ]));
    OrderModel {
        order,
        customer,
        address,
        note,
    }
}

/// Types that occur anywhere in `expr`, including constant object graphs.
pub(crate) fn types_in(interner: &TypeInterner, expr: &Expr) -> Vec<TypeId> {
    use crate::visitor::{ExprVisitor, walk_expr};

    struct Collector<'a> {
        interner: &'a TypeInterner,
        types: Vec<TypeId>,
        seen: Vec<usize>,
    }

    impl Collector<'_> {
        fn value(&mut self, value: &Value) {
            match value {
                Value::Object(obj) => {
                    if self.seen.contains(&obj.addr()) {
                        return;
                    }
                    self.seen.push(obj.addr());
                    self.types.push(obj.ty());
                    for (_, field) in obj.fields() {
                        self.value(&field);
                    }
                }
                Value::Array(arr) => {
                    if self.seen.contains(&arr.addr()) {
                        return;
                    }
                    self.seen.push(arr.addr());
                    self.types.push(arr.ty());
                    for item in arr.items() {
                        self.value(&item);
                    }
                }
                Value::Quote(lambda) => walk_expr(self, lambda),
                _ => {
                    if let Some(ty) = value.runtime_type(self.interner) {
                        self.types.push(ty);
                    }
                }
            }
        }
    }

    impl ExprVisitor for Collector<'_> {
        fn visit_type(&mut self, ty: TypeId) {
            self.types.push(ty);
        }

        fn visit_value(&mut self, value: &Value, ty: TypeId) {
            self.types.push(ty);
            self.value(value);
        }

        fn visit_parameter(&mut self, param: &crate::expr::ParameterExpr) {
            self.types.push(param.ty);
        }
    }

    let mut collector = Collector {
        interner,
        types: Vec::new(),
        seen: Vec::new(),
    };
    collector.visit_expr(expr);
    collector.types
}
