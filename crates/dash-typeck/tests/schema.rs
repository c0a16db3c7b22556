//! Environment seeding from introspected schemas.

use dash_typeck::ast::{Field, Node};
use dash_typeck::env::Env;
use dash_typeck::error::CheckError;
use dash_typeck::schema::{Schema, SchemaError};

const SCHEMA: &str = r#"{
    "queryType": "Query",
    "types": [
        { "name": "Query", "kind": "OBJECT", "fields": [
            { "name": "version", "type": { "kind": "NON_NULL", "ofType": { "kind": "SCALAR", "name": "String" } } },
            { "name": "container", "type": { "kind": "NON_NULL", "ofType": { "kind": "OBJECT", "name": "Container" } } },
            { "name": "directory", "args": [
                { "name": "path", "type": { "kind": "SCALAR", "name": "String" } }
              ],
              "type": { "kind": "NON_NULL", "ofType": { "kind": "OBJECT", "name": "Directory" } } }
        ] },
        { "name": "Container", "kind": "OBJECT", "fields": [
            { "name": "from", "args": [
                { "name": "address", "type": { "kind": "NON_NULL", "ofType": { "kind": "SCALAR", "name": "String" } } }
              ],
              "type": { "kind": "NON_NULL", "ofType": { "kind": "OBJECT", "name": "Container" } } },
            { "name": "platform", "type": { "kind": "ENUM", "name": "Platform" } },
            { "name": "envVariables", "type": { "kind": "NON_NULL", "ofType":
                { "kind": "LIST", "ofType": { "kind": "NON_NULL", "ofType": { "kind": "OBJECT", "name": "EnvVariable" } } } } }
        ] },
        { "name": "Directory", "kind": "OBJECT", "fields": [
            { "name": "entries", "type": { "kind": "LIST", "ofType": { "kind": "SCALAR", "name": "String" } } }
        ] },
        { "name": "EnvVariable", "kind": "OBJECT", "fields": [
            { "name": "name", "type": { "kind": "NON_NULL", "ofType": { "kind": "SCALAR", "name": "String" } } }
        ] },
        { "name": "Platform", "kind": "ENUM" },
        { "name": "String", "kind": "SCALAR" }
    ]
}"#;

fn schema() -> Schema {
    Schema::from_json(SCHEMA).unwrap()
}

fn check(program: Node) -> String {
    match dash_typeck::check(&schema(), &program) {
        Ok(scheme) => scheme.to_string(),
        Err(err) => format!("error: {}", err),
    }
}

#[test]
fn query_fields_are_global() {
    insta::assert_snapshot!(check(Node::symbol("container")), @"Container!");
}

#[test]
fn fields_with_arguments_become_functions() {
    let env = Env::from_schema(&schema()).unwrap();
    let container = env.named_type(env.root(), "Container").unwrap();
    let from = env.local_scheme(container, "from").unwrap();
    insta::assert_snapshot!(from.to_string(), @"{address: String!} -> Container!");
    let vars = env.local_scheme(container, "envVariables").unwrap();
    insta::assert_snapshot!(vars.to_string(), @"[EnvVariable!]!");
}

#[test]
fn chained_resolution() {
    let program = Node::select(
        Node::resolve(
            Node::symbol("container"),
            "from",
            vec![Field::new("address", Node::string("alpine"))],
        ),
        "platform",
    );
    insta::assert_snapshot!(check(program), @"Platform");
}

#[test]
fn optional_argument_field_is_forced() {
    insta::assert_snapshot!(check(Node::symbol("directory")), @"Directory!");
    insta::assert_snapshot!(
        check(Node::select(Node::symbol("directory"), "entries")),
        @"[String]"
    );
}

#[test]
fn schema_scalars_reuse_builtin_classes() {
    // A string literal and the schema's `String` field are one class.
    let program = Node::list(vec![Node::string("x"), Node::symbol("version")]);
    insta::assert_snapshot!(check(program), @"[String!]!");

    let program = Node::default_op(
        Node::select(Node::symbol("container"), "platform"),
        Node::string("x"),
    );
    insta::assert_snapshot!(
        check(program),
        @"error: type mismatch in default: expected `Platform!`, found `String!`"
    );
}

#[test]
fn query_type_override() {
    let schema = schema().with_query_type("Directory");
    let scheme = dash_typeck::check(&schema, &Node::symbol("entries")).unwrap();
    insta::assert_snapshot!(scheme.to_string(), @"[String]");
}

#[test]
fn unknown_type_reference_is_rejected() {
    let json = r#"{ "types": [
        { "name": "Query", "kind": "OBJECT", "fields": [
            { "name": "ghost", "type": { "kind": "OBJECT", "name": "Ghost" } }
        ] }
    ] }"#;
    let schema = Schema::from_json(json).unwrap();
    assert_eq!(
        Env::from_schema(&schema).unwrap_err(),
        SchemaError::UnknownType {
            name: "Ghost".to_string()
        }
    );
    let err = dash_typeck::check(&schema, &Node::null()).unwrap_err();
    assert!(matches!(err, CheckError::Schema(_)));
    insta::assert_snapshot!(err.to_string(), @"invalid schema: schema references unknown type `Ghost`");
}

#[test]
fn without_query_type_nothing_is_global() {
    let mut schema = schema();
    schema.query_type = None;
    insta::assert_snapshot!(
        check_with(&schema, Node::symbol("container")),
        @"error: undefined variable `container`"
    );
}

fn check_with(schema: &Schema, program: Node) -> String {
    match dash_typeck::check(schema, &program) {
        Ok(scheme) => scheme.to_string(),
        Err(err) => format!("error: {}", err),
    }
}
