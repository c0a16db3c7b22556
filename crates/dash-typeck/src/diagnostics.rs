//! Ariadne-based diagnostic rendering for type errors.
//!
//! Renders `TypeError`s into labeled reports against the program source,
//! or into one-line JSON objects for tooling. A hoisting aggregate renders
//! each of its members in turn.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::error::TypeError;
use crate::ty::Ty;

/// How diagnostics are rendered.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticOptions {
    /// ANSI colors in human-readable output.
    pub color: bool,
    /// Emit a single-line JSON object instead of a report.
    pub json: bool,
}

impl DiagnosticOptions {
    /// Plain text without colors, for snapshots and pipes.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::InfiniteType { .. } => "E0002",
        TypeError::UndefinedVariable { .. } => "E0003",
        TypeError::NoSuchField { .. } => "E0004",
        TypeError::UnresolvedType { .. } => "E0005",
        TypeError::EmptyTypeName { .. } => "E0006",
        TypeError::NotMonomorphic { .. } => "E0007",
        TypeError::AlreadyDefined { .. } => "E0008",
        TypeError::NoTypeOrValue { .. } => "E0009",
        TypeError::MissingArgument { .. } => "E0010",
        TypeError::UnexpectedArguments { .. } => "E0011",
        TypeError::UnknownArgument { .. } => "E0012",
        TypeError::ExpectedObject { .. } => "E0013",
        TypeError::NotAFunction { .. } => "E0014",
        TypeError::SelfOutsideClass { .. } => "E0015",
        TypeError::Hoist(_) => "E0016",
        TypeError::DuplicateField { .. } => "E0017",
    }
}

// ── Labels and Help ────────────────────────────────────────────────────

fn label_message(err: &TypeError) -> String {
    match err {
        TypeError::Mismatch {
            expected, found, ..
        } => format!("expected {}, found {}", expected, found),
        TypeError::InfiniteType { .. } => "recursive type here".to_string(),
        TypeError::UndefinedVariable { .. } => "not found in this scope".to_string(),
        TypeError::NoSuchField { field, .. } => format!("no field `{}`", field),
        TypeError::UnresolvedType { name, .. } => format!("`{}` is not a known class", name),
        TypeError::EmptyTypeName { .. } => "type name expected".to_string(),
        TypeError::NotMonomorphic { .. } => "polymorphic type not allowed here".to_string(),
        TypeError::AlreadyDefined { found, .. } => format!("redeclared as {}", found),
        TypeError::NoTypeOrValue { .. } => "needs a type, a value, or both".to_string(),
        TypeError::MissingArgument { name, .. } => format!("`{}` not supplied", name),
        TypeError::UnexpectedArguments { names, .. } => {
            format!("not a parameter: {}", names.join(", "))
        }
        TypeError::UnknownArgument { name, .. } => format!("no slot `{}` to override", name),
        TypeError::ExpectedObject { found, .. } => format!("this is {}", found),
        TypeError::NotAFunction { ty, .. } => format!("this is {}", ty),
        TypeError::SelfOutsideClass { .. } => "not inside a class".to_string(),
        TypeError::DuplicateField { .. } => "repeated here".to_string(),
        TypeError::Hoist(_) => String::new(),
    }
}

/// The nullable form of a non-null type, if that is what was found.
fn is_nullable_of(expected: &Ty, found: &Ty) -> bool {
    match expected {
        Ty::NonNull(inner) => inner.as_ref() == found,
        _ => false,
    }
}

fn help(err: &TypeError) -> Option<String> {
    match err {
        TypeError::Mismatch {
            expected, found, ..
        } if is_nullable_of(expected, found) => {
            Some("the value may be null; supply a fallback with `value ? default`".to_string())
        }
        TypeError::UnresolvedType { name, .. } => Some(format!(
            "declare `{}` in this block or an enclosing one",
            name
        )),
        TypeError::MissingArgument { name, .. } => Some(format!("pass `{}: ...`", name)),
        TypeError::ExpectedObject { found, .. } if !found.is_non_null() => {
            Some("only non-null objects have fields".to_string())
        }
        TypeError::InfiniteType { .. } => {
            Some("a value cannot have a type that refers to itself".to_string())
        }
        _ => None,
    }
}

// ── Main Rendering Function ────────────────────────────────────────────

/// Render a type error into a diagnostic string.
///
/// Errors without a source position are labeled against the whole source.
/// An empty source produces a plain `error[code]: message` line.
pub fn render_diagnostic(
    error: &TypeError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    if options.json {
        return render_json(error, source, filename);
    }
    match error {
        TypeError::Hoist(errors) => errors
            .iter()
            .map(|e| render_diagnostic(e, source, filename, options))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => render_report(error, source, options),
    }
}

/// Clamp a span into the source, widening empty spans to one character.
fn clamp(range: Range<usize>, source_len: usize) -> Range<usize> {
    let s = range.start.min(source_len);
    let e = range.end.min(source_len).max(s);
    if s == e {
        s..e.saturating_add(1).min(source_len)
    } else {
        s..e
    }
}

fn primary_range(error: &TypeError, source_len: usize) -> Range<usize> {
    match error.span() {
        Some(span) if !span.is_empty() => clamp(span.range(), source_len),
        _ => 0..source_len,
    }
}

fn render_report(error: &TypeError, source: &str, options: &DiagnosticOptions) -> String {
    let code = error_code(error);
    if source.is_empty() {
        return format!("error[{}]: {}", code, error);
    }

    let config = Config::default().with_color(options.color);
    let range = primary_range(error, source.len());

    let mut builder = Report::build(ReportKind::Error, range.clone())
        .with_code(code)
        .with_message(error.to_string())
        .with_config(config)
        .with_label(
            Label::new(range)
                .with_message(label_message(error))
                .with_color(Color::Red),
        );
    if let Some(help) = help(error) {
        builder.set_help(help);
    }
    let report = builder.finish();

    let mut buf = Vec::new();
    match report.write(Source::from(source), &mut buf) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("error[{}]: {}", code, error),
    }
}

fn render_json(error: &TypeError, source: &str, filename: &str) -> String {
    let members: Vec<&TypeError> = match error {
        TypeError::Hoist(errors) => errors.iter().collect(),
        other => vec![other],
    };
    let spans: Vec<serde_json::Value> = members
        .iter()
        .map(|e| {
            let range = primary_range(e, source.len());
            serde_json::json!({
                "start": range.start,
                "end": range.end,
                "label": label_message(e),
            })
        })
        .collect();
    let value = serde_json::json!({
        "code": error_code(error),
        "severity": "error",
        "message": error.to_string(),
        "file": filename,
        "spans": spans,
        "help": help(error),
    });
    value.to_string()
}
