//! Rendering of type errors against program source.

use dash_typeck::ast::{Field, Node, SlotDecl, Span, TypeNode};
use dash_typeck::builtins::env_with_builtins;
use dash_typeck::diagnostics::{error_code, render_diagnostic, DiagnosticOptions};
use dash_typeck::error::TypeError;
use dash_typeck::infer_program;

fn infer_err(program: &Node) -> TypeError {
    let mut env = env_with_builtins();
    infer_program(&mut env, program).unwrap_err()
}

/// `"x" ? 1`
fn default_mismatch() -> TypeError {
    let source = Node::default_op(Node::string("x").at(0, 3), Node::int(1).at(6, 7)).at(0, 7);
    infer_err(&source)
}

#[test]
fn mismatch_report_has_code_message_and_label() {
    let err = default_mismatch();
    assert_eq!(error_code(&err), "E0001");
    let out = render_diagnostic(&err, "\"x\" ? 1", "main.dash", &DiagnosticOptions::colorless());
    assert!(out.contains("E0001"), "missing code:\n{}", out);
    assert!(
        out.contains("type mismatch in default: expected `String!`, found `Int!`"),
        "missing message:\n{}",
        out
    );
    assert!(out.contains("expected String!, found Int!"), "missing label:\n{}", out);
    assert!(!out.contains("\x1b["), "colorless output has escapes:\n{}", out);
}

#[test]
fn json_mode_is_one_parseable_line() {
    let err = default_mismatch();
    let out = render_diagnostic(&err, "\"x\" ? 1", "main.dash", &DiagnosticOptions::json_mode());
    assert!(!out.contains('\n'));

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["code"], "E0001");
    assert_eq!(value["severity"], "error");
    assert_eq!(value["file"], "main.dash");
    assert_eq!(
        value["message"],
        "type mismatch in default: expected `String!`, found `Int!`"
    );
    let spans = value["spans"].as_array().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0]["start"], 0);
    assert_eq!(spans[0]["end"], 7);
    assert!(value["help"].is_null());
}

#[test]
fn nullable_value_for_required_slot_suggests_default() {
    let source = "maybe: String\ns: String! = maybe";
    let program = Node::block(vec![
        Node::slot(SlotDecl::typed("maybe", TypeNode::named("String"))).at(0, 13),
        Node::slot(SlotDecl::new(
            "s",
            Some(TypeNode::required("String")),
            Some(Node::symbol("maybe").at(27, 32)),
        ))
        .at(14, 32),
    ]);
    let err = infer_err(&program);
    let out = render_diagnostic(&err, source, "main.dash", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["code"], "E0001");
    assert!(value["help"].as_str().unwrap().contains("fallback"));
}

#[test]
fn hoisting_errors_render_each_member() {
    let source = "a: Missing\nb: AlsoMissing";
    let program = Node::block(vec![
        Node::slot(SlotDecl::typed("a", TypeNode::named("Missing"))).at(0, 10),
        Node::slot(SlotDecl::typed("b", TypeNode::named("AlsoMissing"))).at(11, 25),
    ]);
    let err = infer_err(&program);
    assert!(matches!(&err, TypeError::Hoist(members) if members.len() == 2));

    let out = render_diagnostic(&err, source, "main.dash", &DiagnosticOptions::colorless());
    assert_eq!(out.matches("E0005").count(), 2, "expected two reports:\n{}", out);
    assert!(out.contains("unresolved type: Missing"));
    assert!(out.contains("unresolved type: AlsoMissing"));

    let json = render_diagnostic(&err, source, "main.dash", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["code"], "E0016");
    let spans = value["spans"].as_array().unwrap();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[1]["start"], 11);
    assert_eq!(spans[1]["label"], "`AlsoMissing` is not a known class");
}

#[test]
fn error_without_position_labels_whole_source() {
    let err = TypeError::UndefinedVariable {
        name: "nope".to_string(),
        span: Span::default(),
    };
    let source = "hello world";
    let json = render_diagnostic(&err, source, "main.dash", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["spans"][0]["start"], 0);
    assert_eq!(value["spans"][0]["end"], 11);
    assert_eq!(value["spans"][0]["label"], "not found in this scope");

    let out = render_diagnostic(&err, source, "main.dash", &DiagnosticOptions::colorless());
    assert!(out.contains("undefined variable `nope`"));
}

#[test]
fn repeated_field_points_at_second_value() {
    let source = "{a: 1, a: 2}";
    let program = Node::record(vec![
        Field::new("a", Node::int(1).at(4, 5)),
        Field::new("a", Node::int(2).at(10, 11)),
    ])
    .at(0, 12);
    let err = infer_err(&program);
    assert_eq!(error_code(&err), "E0017");
    let json = render_diagnostic(&err, source, "main.dash", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["spans"][0]["start"], 10);
    assert_eq!(value["spans"][0]["label"], "repeated here");
}
