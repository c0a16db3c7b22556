//! End-to-end inference tests.
//!
//! Each test builds a small program with the AST builders, checks it
//! against a hand-written schema, and compares the displayed scheme (or
//! error message) with an inline snapshot.

use dash_typeck::ast::{Field, Node, SlotDecl, TypeNode};
use dash_typeck::error::{CheckError, TypeError};
use dash_typeck::schema::{InputValue, Schema, SchemaField, SchemaType, TypeKind, TypeRef};

// ── Helpers ────────────────────────────────────────────────────────────

fn scalar(name: &str) -> SchemaType {
    SchemaType {
        name: name.to_string(),
        kind: TypeKind::Scalar,
        fields: Vec::new(),
    }
}

fn field(name: &str, type_ref: TypeRef) -> SchemaField {
    SchemaField {
        name: name.to_string(),
        type_ref,
        args: Vec::new(),
    }
}

fn arg(name: &str, type_ref: TypeRef) -> InputValue {
    InputValue {
        name: name.to_string(),
        type_ref,
    }
}

/// `Query { greeter: Greeter!, greet(...): String!, version(verbose: Boolean): String! }`
/// `Greeter { greet(name: String!, loud: Boolean): String! }`
fn greeter_schema() -> Schema {
    let greet = SchemaField {
        args: vec![
            arg("name", TypeRef::non_null(TypeRef::scalar("String"))),
            arg("loud", TypeRef::scalar("Boolean")),
        ],
        ..field("greet", TypeRef::non_null(TypeRef::scalar("String")))
    };
    let version = SchemaField {
        args: vec![arg("verbose", TypeRef::scalar("Boolean"))],
        ..field("version", TypeRef::non_null(TypeRef::scalar("String")))
    };
    Schema {
        query_type: Some("Query".to_string()),
        types: vec![
            SchemaType {
                name: "Query".to_string(),
                kind: TypeKind::Object,
                fields: vec![
                    field("greeter", TypeRef::non_null(TypeRef::object("Greeter"))),
                    greet.clone(),
                    version,
                ],
            },
            SchemaType {
                name: "Greeter".to_string(),
                kind: TypeKind::Object,
                fields: vec![greet],
            },
            scalar("String"),
            scalar("Boolean"),
        ],
    }
}

/// Check a program and display the result.
fn check(program: Node) -> String {
    match dash_typeck::check(&greeter_schema(), &program) {
        Ok(scheme) => scheme.to_string(),
        Err(err) => format!("error: {}", err),
    }
}

fn check_err(program: Node) -> TypeError {
    match dash_typeck::check(&greeter_schema(), &program) {
        Ok(scheme) => panic!("expected an error, got {}", scheme),
        Err(CheckError::Type(err)) => err,
        Err(CheckError::Schema(err)) => panic!("schema error: {}", err),
    }
}

fn greet(args: Vec<Field>) -> Node {
    Node::resolve(Node::symbol("greeter"), "greet", args)
}

// ── Field resolution and calls ─────────────────────────────────────────

#[test]
fn greet_with_required_argument() {
    let program = greet(vec![Field::new("name", Node::string("x"))]);
    insta::assert_snapshot!(check(program), @"String!");
}

#[test]
fn greet_with_optional_argument_too() {
    let program = greet(vec![
        Field::new("name", Node::string("x")),
        Field::new("loud", Node::boolean(true)),
    ]);
    insta::assert_snapshot!(check(program), @"String!");
}

#[test]
fn greet_missing_required_argument() {
    let program = greet(vec![Field::new("loud", Node::boolean(true))]);
    let err = check_err(program);
    assert!(matches!(&err, TypeError::MissingArgument { name, .. } if name == "name"));
    insta::assert_snapshot!(err.to_string(), @"missing required argument `name`");
}

#[test]
fn greet_with_unexpected_argument() {
    let program = greet(vec![
        Field::new("name", Node::string("x")),
        Field::new("extra", Node::int(1)),
    ]);
    let err = check_err(program);
    assert!(matches!(&err, TypeError::UnexpectedArguments { names, .. } if names == &["extra"]));
    insta::assert_snapshot!(err.to_string(), @"unexpected fields: extra");
}

#[test]
fn greet_argument_type_mismatch() {
    let program = greet(vec![Field::new("name", Node::int(1))]);
    insta::assert_snapshot!(
        check(program),
        @"error: type mismatch in argument `name`: expected `String!`, found `Int!`"
    );
}

#[test]
fn selecting_unknown_field() {
    let program = Node::select(Node::symbol("greeter"), "wave");
    insta::assert_snapshot!(check(program), @"error: type `Greeter!` has no field `wave`");
}

#[test]
fn selecting_from_nullable_fails() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::typed("maybe", TypeNode::named("Greeter"))),
        greet_on(Node::symbol("maybe")),
    ]);
    insta::assert_snapshot!(
        check(program),
        @"error: expected a non-null object, found `Greeter`"
    );
}

fn greet_on(receiver: Node) -> Node {
    Node::resolve(receiver, "greet", vec![Field::new("name", Node::string("x"))])
}

#[test]
fn call_query_field_directly() {
    let program = Node::call(
        Node::symbol("greet"),
        vec![Field::new("name", Node::string("x"))],
    );
    insta::assert_snapshot!(check(program), @"String!");
}

#[test]
fn calling_a_scalar_fails() {
    let program = Node::call(Node::string("x"), vec![]);
    insta::assert_snapshot!(check(program), @"error: `String!` is not a function");
}

// ── Thunk-forcing ──────────────────────────────────────────────────────

#[test]
fn optional_only_field_is_forced() {
    insta::assert_snapshot!(check(Node::symbol("version")), @"String!");
}

#[test]
fn field_with_required_argument_stays_a_function() {
    insta::assert_snapshot!(
        check(Node::symbol("greet")),
        @"{name: String!, loud: Boolean} -> String!"
    );
}

#[test]
fn undefined_symbol() {
    insta::assert_snapshot!(check(Node::symbol("nope")), @"error: undefined variable `nope`");
}

// ── Default ────────────────────────────────────────────────────────────

#[test]
fn default_of_null_and_string() {
    let program = Node::default_op(Node::null(), Node::string("x"));
    insta::assert_snapshot!(check(program), @"String!");
}

#[test]
fn default_of_string_and_int() {
    let program = Node::default_op(Node::string("x"), Node::int(1));
    insta::assert_snapshot!(
        check(program),
        @"error: type mismatch in default: expected `String!`, found `Int!`"
    );
}

#[test]
fn default_makes_nullable_slot_non_null() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::typed("nick", TypeNode::named("String"))),
        Node::default_op(Node::symbol("nick"), Node::string("anon")),
    ]);
    insta::assert_snapshot!(check(program), @"String!");
}

// ── Slots ──────────────────────────────────────────────────────────────

#[test]
fn redeclaring_with_same_type_is_allowed() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::valued("x", Node::string("a"))),
        Node::slot(SlotDecl::valued("x", Node::string("b"))),
    ]);
    insta::assert_snapshot!(check(program), @"String!");
}

#[test]
fn redeclaring_with_other_type_fails() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::valued("x", Node::string("a"))),
        Node::slot(SlotDecl::valued("x", Node::int(1))),
    ]);
    let err = check_err(program);
    assert!(matches!(err, TypeError::AlreadyDefined { .. }));
    insta::assert_snapshot!(err.to_string(), @"`x` already defined as `String!`");
}

#[test]
fn slot_without_type_or_value() {
    let program = Node::slot(SlotDecl::new("x", None, None));
    insta::assert_snapshot!(check(program), @"error: `x` has no type or value");
}

#[test]
fn non_null_value_fits_nullable_annotation() {
    let program = Node::slot(SlotDecl::new(
        "name",
        Some(TypeNode::named("String")),
        Some(Node::string("x")),
    ));
    insta::assert_snapshot!(check(program), @"String");
}

#[test]
fn nullable_value_does_not_fit_non_null_annotation() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::typed("maybe", TypeNode::named("String"))),
        Node::slot(SlotDecl::new(
            "sure",
            Some(TypeNode::required("String")),
            Some(Node::symbol("maybe")),
        )),
    ]);
    insta::assert_snapshot!(
        check(program),
        @"error: type mismatch in slot `sure`: expected `String!`, found `String`"
    );
}

#[test]
fn each_null_is_independent() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::new("a", Some(TypeNode::named("String")), Some(Node::null()))),
        Node::slot(SlotDecl::new("b", Some(TypeNode::named("Boolean")), Some(Node::null()))),
        Node::record(vec![
            Field::new("a", Node::symbol("a")),
            Field::new("b", Node::symbol("b")),
        ]),
    ]);
    insta::assert_snapshot!(check(program), @"{a: String, b: Boolean}");
}

// ── Classes ────────────────────────────────────────────────────────────

fn point_class(name: &str) -> Node {
    Node::class(
        name,
        vec![Node::slot(SlotDecl::new(
            "x",
            Some(TypeNode::required("Int")),
            Some(Node::int(0)),
        ))],
    )
}

#[test]
fn class_declaration_has_class_type() {
    insta::assert_snapshot!(check(point_class("Point")), @"Point");
}

#[test]
fn constructor_call_and_field_select() {
    let program = Node::block(vec![
        point_class("Point"),
        Node::select(
            Node::call(Node::symbol("Point"), vec![Field::new("x", Node::int(2))]),
            "x",
        ),
    ]);
    insta::assert_snapshot!(check(program), @"Int!");
}

#[test]
fn constructor_with_unknown_slot() {
    let program = Node::block(vec![
        point_class("Point"),
        Node::call(Node::symbol("Point"), vec![Field::new("y", Node::int(2))]),
    ]);
    insta::assert_snapshot!(check(program), @"error: type `Point` has no field `y`");
}

#[test]
fn classes_are_nominal() {
    let program = Node::block(vec![
        point_class("A"),
        point_class("B"),
        Node::slot(SlotDecl::new(
            "b",
            Some(TypeNode::named("B")),
            Some(Node::call(Node::symbol("A"), vec![])),
        )),
    ]);
    insta::assert_snapshot!(
        check(program),
        @"error: type mismatch in slot `b`: expected `B`, found `A!`"
    );
}

#[test]
fn self_returns_the_enclosing_class() {
    let program = Node::block(vec![
        Node::class(
            "Point",
            vec![
                Node::slot(SlotDecl::new("x", Some(TypeNode::named("Int")), Some(Node::int(0)))),
                Node::slot(SlotDecl::valued(
                    "moved",
                    Node::self_object(vec![Field::new("x", Node::int(5))]),
                )),
            ],
        ),
        Node::select(Node::call(Node::symbol("Point"), vec![]), "moved"),
    ]);
    insta::assert_snapshot!(check(program), @"Point!");
}

#[test]
fn self_with_unknown_override() {
    let program = Node::class(
        "Point",
        vec![Node::slot(SlotDecl::valued(
            "moved",
            Node::self_object(vec![Field::new("y", Node::int(5))]),
        ))],
    );
    insta::assert_snapshot!(check(program), @"error: unknown argument: y");
}

#[test]
fn self_outside_a_class() {
    let program = Node::self_object(vec![]);
    insta::assert_snapshot!(check(program), @"error: self used outside a class body");
}

#[test]
fn class_body_sees_enclosing_scope() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::valued("greeting", Node::string("hi"))),
        Node::class(
            "Greeting",
            vec![Node::slot(SlotDecl::valued("text", Node::symbol("greeting")))],
        ),
        Node::select(Node::call(Node::symbol("Greeting"), vec![]), "text"),
    ]);
    insta::assert_snapshot!(check(program), @"String!");
}

// ── Functions ──────────────────────────────────────────────────────────

fn hello_fun() -> Node {
    Node::fun_decl(
        "hello",
        vec![SlotDecl::typed("name", TypeNode::required("String"))],
        Some(TypeNode::required("String")),
        Node::symbol("name"),
    )
}

#[test]
fn fun_decl_type() {
    insta::assert_snapshot!(check(hello_fun()), @"{name: String!} -> String!");
}

#[test]
fn fun_decl_called_through_slot() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::valued("hello", hello_fun())),
        Node::call(
            Node::symbol("hello"),
            vec![Field::new("name", Node::string("x"))],
        ),
    ]);
    insta::assert_snapshot!(check(program), @"String!");
}

#[test]
fn fun_decl_return_mismatch() {
    let program = Node::fun_decl(
        "count",
        vec![],
        Some(TypeNode::required("Int")),
        Node::string("x"),
    );
    insta::assert_snapshot!(
        check(program),
        @"error: type mismatch in return type of `count`: expected `Int!`, found `String!`"
    );
}

#[test]
fn fun_decl_with_optional_args_is_forced_by_name() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::valued(
            "answer",
            Node::fun_decl(
                "answer",
                vec![SlotDecl::new("base", Some(TypeNode::named("Int")), Some(Node::int(10)))],
                None,
                Node::int(42),
            ),
        )),
        Node::symbol("answer"),
    ]);
    insta::assert_snapshot!(check(program), @"Int!");
}

#[test]
fn fun_decl_argument_without_type_or_value() {
    let program = Node::fun_decl("f", vec![SlotDecl::new("a", None, None)], None, Node::null());
    insta::assert_snapshot!(check(program), @"error: `a` has no type or value");
}

// ── Repeated names ─────────────────────────────────────────────────────

#[test]
fn call_with_repeated_argument_fails() {
    let program = Node::block(vec![
        Node::slot(SlotDecl::valued("hello", hello_fun())),
        Node::call(
            Node::symbol("hello"),
            vec![
                Field::new("name", Node::string("x")),
                Field::new("name", Node::int(1)),
            ],
        ),
    ]);
    let err = check_err(program);
    assert!(matches!(&err, TypeError::DuplicateField { name, .. } if name == "name"));
    insta::assert_snapshot!(err.to_string(), @"field `name` given more than once");
}

#[test]
fn resolve_with_repeated_argument_fails() {
    let program = greet(vec![
        Field::new("name", Node::string("x")),
        Field::new("name", Node::string("y")),
    ]);
    insta::assert_snapshot!(check(program), @"error: field `name` given more than once");
}

#[test]
fn record_with_repeated_field_fails() {
    let program = Node::record(vec![
        Field::new("a", Node::int(1)),
        Field::new("b", Node::int(2)),
        Field::new("a", Node::string("x")),
    ]);
    insta::assert_snapshot!(check(program), @"error: field `a` given more than once");
}
