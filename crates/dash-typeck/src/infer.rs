//! Node inference.
//!
//! One rule per node kind, dispatched from `infer_node`. Every rule takes the
//! inference context, the environment arena, and the module the node is
//! being checked in, and returns the node's type or the first error.
//!
//! The declaration, selection and literal rules unify eagerly: each computes
//! a local substitution and applies it to its own result. Only `Lambda`,
//! `Apply`, `Let` and `LetRec` go through the deferred constraint list, which
//! is solved at each `Let` and once more by `infer_program`. Inside a lambda
//! body the eager substitutions are also pushed onto that list, so they reach
//! the lambda's parameter types.

use tracing::trace;

use crate::ast::{Block, ClassDecl, Field, FunDecl, Node, NodeKind, SlotDecl, Span, TypeNode};
use crate::builtins::find_or_create_class;
use crate::env::{Env, ModuleKind};
use crate::error::{ConstraintOrigin, TypeError};
use crate::hoist::hoist_block;
use crate::subst::Subst;
use crate::ty::{ModuleId, RecordType, Scheme, Ty};
use crate::unify::{solve, unify, unify_assignable, InferCtx};

/// Infer a whole program in the root module and close over the result.
///
/// Remaining deferred constraints are solved and applied first; the returned
/// scheme's variables are renamed to `?0, ?1, ...`.
pub fn infer_program(env: &mut Env, program: &Node) -> Result<Scheme, TypeError> {
    let mut ctx = InferCtx::new();
    let root = env.root();
    let ty = infer_node(&mut ctx, env, root, program)?;
    let sub = solve(&ctx.constraints)?;
    let ty = ty.apply(&sub);
    Ok(ctx.generalize(&[], ty).normalize())
}

/// Infer one node in `scope`.
pub fn infer_node(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    node: &Node,
) -> Result<Ty, TypeError> {
    let span = node.span;
    match &node.kind {
        NodeKind::Block(block) => infer_block(ctx, env, scope, block),
        NodeKind::SlotDecl(slot) => infer_slot(ctx, env, scope, slot, span),
        NodeKind::ClassDecl(decl) => infer_class(ctx, env, scope, decl),
        NodeKind::FunDecl(decl) => infer_fun_decl(ctx, env, scope, decl, span),
        NodeKind::FunCall { fun, args } => infer_fun_call(ctx, env, scope, fun, args, span),
        NodeKind::Symbol { name } => infer_symbol(ctx, env, scope, name, span),
        NodeKind::Select {
            receiver,
            field,
            args,
        } => infer_select(ctx, env, scope, receiver, field, args.as_deref(), span),
        NodeKind::Record { fields } => {
            Ok(Ty::Record(infer_record(ctx, env, scope, fields)?))
        }
        NodeKind::List { elements } => infer_list(ctx, env, scope, elements),
        NodeKind::SelfObject { overrides } => infer_self(ctx, env, scope, overrides, span),
        NodeKind::Default { left, right } => infer_default(ctx, env, scope, left, right, span),
        NodeKind::String { .. } => infer_literal(env, scope, "String", span),
        NodeKind::Boolean { .. } => infer_literal(env, scope, "Boolean", span),
        NodeKind::Int { .. } => infer_literal(env, scope, "Int", span),
        // Null never carries a type of its own.
        NodeKind::Null => Ok(ctx.fresh_var()),
        NodeKind::Lambda { param, body } => infer_lambda(ctx, env, scope, param, body),
        NodeKind::Apply { fun, param, arg } => infer_apply(ctx, env, scope, fun, param, arg, span),
        NodeKind::Let { name, def, body } => infer_let(ctx, env, scope, name, def, body),
        NodeKind::LetRec { name, def, body } => {
            infer_let_rec(ctx, env, scope, name, def, body, span)
        }
    }
}

// ── Declarations ────────────────────────────────────────────────────────

fn infer_block(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    block: &Block,
) -> Result<Ty, TypeError> {
    hoist_block(ctx, env, scope, block)?;
    let mut last = None;
    for form in &block.forms {
        last = Some(infer_node(ctx, env, scope, form)?);
    }
    // An empty block behaves like a lone `null`.
    Ok(match last {
        Some(ty) => ty,
        None => ctx.fresh_var(),
    })
}

/// The type a slot (or function argument) defines: its annotation, its
/// value's type, or the annotation refined by unifying it with the value.
fn slot_type(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    slot: &SlotDecl,
    span: Span,
) -> Result<(Ty, Subst), TypeError> {
    let declared = match &slot.ty {
        Some(ty) => Some(infer_type_node(ctx, env, scope, ty, span)?),
        None => None,
    };
    let inferred = match &slot.value {
        Some(value) => Some((infer_node(ctx, env, scope, value)?, value.span)),
        None => None,
    };
    match (declared, inferred) {
        (Some(declared), Some((inferred, at))) => {
            let origin = ConstraintOrigin::SlotValue {
                name: slot.name.clone(),
            };
            let sub = unify_assignable(&declared, &inferred, origin.clone(), at)
                .map_err(|e| e.with_span(span))?;
            ctx.defer_eager(&sub, &origin, at);
            Ok((declared.apply(&sub), sub))
        }
        (Some(declared), None) => Ok((declared, Subst::new())),
        (None, Some((inferred, _))) => Ok((inferred, Subst::new())),
        (None, None) => Err(TypeError::NoTypeOrValue {
            name: slot.name.clone(),
            span,
        }),
    }
}

fn infer_slot(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    slot: &SlotDecl,
    span: Span,
) -> Result<Ty, TypeError> {
    let (defined, sub) = slot_type(ctx, env, scope, slot, span)?;

    if let Some(existing) = env.local_scheme(scope, &slot.name) {
        let existing = existing.mono_type().ok_or_else(|| TypeError::NotMonomorphic {
            name: slot.name.clone(),
            span,
        })?;
        let existing = existing.apply(&sub);
        if existing != defined {
            return Err(TypeError::AlreadyDefined {
                name: slot.name.clone(),
                existing,
                found: defined,
                span,
            });
        }
    }

    env.add(scope, slot.name.clone(), Scheme::mono(defined.clone()));
    Ok(defined)
}

fn infer_class(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    decl: &ClassDecl,
) -> Result<Ty, TypeError> {
    let class = find_or_create_class(env, scope, &decl.name);
    trace!(class = %decl.name, "inferring class body");
    env.with_parent(class, scope, |env| infer_block(ctx, env, class, &decl.body))?;

    let class_ty = env.module_ty(class);
    env.add(class, "self", Scheme::mono(class_ty.clone()));
    env.add(scope, decl.name.clone(), Scheme::mono(class_ty.clone()));
    Ok(class_ty)
}

fn infer_fun_decl(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    decl: &FunDecl,
    span: Span,
) -> Result<Ty, TypeError> {
    let fun_scope = env.new_scope(scope);
    let mut args = RecordType::anonymous(Vec::new());
    for arg in &decl.args {
        let (ty, _) = slot_type(ctx, env, fun_scope, arg, span)?;
        env.add(fun_scope, arg.name.clone(), Scheme::mono(ty.clone()));
        args.add(arg.name.clone(), Scheme::mono(ty));
    }

    let declared_ret = match &decl.ret {
        Some(ret) => Some(infer_type_node(ctx, env, fun_scope, ret, span)?),
        None => None,
    };
    let body = infer_node(ctx, env, fun_scope, &decl.body)?;

    match declared_ret {
        Some(declared) => {
            let origin = ConstraintOrigin::FunReturn {
                name: decl.name.clone(),
            };
            let sub = unify_assignable(&declared, &body, origin, decl.body.span)
                .map_err(|e| e.with_span(span))?;
            Ok(Ty::fun(args.apply(&sub), declared.apply(&sub)))
        }
        None => Ok(Ty::fun(args, body)),
    }
}

// ── References and calls ────────────────────────────────────────────────

fn infer_symbol(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    name: &str,
    span: Span,
) -> Result<Ty, TypeError> {
    let (owner, scheme) = env
        .lookup(scope, name)
        .ok_or_else(|| TypeError::UndefinedVariable {
            name: name.to_string(),
            span,
        })?;
    if let Some(ty) = scheme.mono_type() {
        return Ok(ty.clone().force_thunk());
    }
    // Only `let` introduces polymorphic bindings, always in a scope module.
    if env.kind(owner) == ModuleKind::Scope {
        let scheme = scheme.clone();
        return Ok(ctx.instantiate(&scheme));
    }
    Err(TypeError::NotMonomorphic {
        name: name.to_string(),
        span,
    })
}

/// The callee of a call: like a symbol reference, but never thunk-forced.
fn infer_callee(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    fun: &Node,
) -> Result<Ty, TypeError> {
    let NodeKind::Symbol { name } = &fun.kind else {
        return infer_node(ctx, env, scope, fun);
    };
    let scheme = env
        .scheme_of(scope, name)
        .ok_or_else(|| TypeError::UndefinedVariable {
            name: name.clone(),
            span: fun.span,
        })?
        .clone();
    match scheme.mono_type() {
        Some(ty) => Ok(ty.clone()),
        None => Ok(ctx.instantiate(&scheme)),
    }
}

/// Named call arguments with their inferred types, in source order.
fn infer_args(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    args: &[Field],
) -> Result<Vec<(String, Ty, Span)>, TypeError> {
    reject_duplicate_fields(args)?;
    args.iter()
        .map(|arg| {
            let ty = infer_node(ctx, env, scope, &arg.value)?;
            Ok((arg.name.clone(), ty, arg.value.span))
        })
        .collect()
}

/// Field names must be unique within one record literal or argument list.
fn reject_duplicate_fields(fields: &[Field]) -> Result<(), TypeError> {
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.name == field.name) {
            return Err(TypeError::DuplicateField {
                name: field.name.clone(),
                span: field.value.span,
            });
        }
    }
    Ok(())
}

/// Match supplied arguments against declared parameters.
///
/// Parameters are checked in declaration order: a supplied argument must
/// fit its parameter, and an absent one is only allowed when the parameter
/// is nullable. Arguments naming no parameter are rejected afterwards.
fn check_call_args(
    ctx: &mut InferCtx,
    params: &RecordType,
    supplied: &[(String, Ty, Span)],
    span: Span,
) -> Result<Subst, TypeError> {
    let mut sub = Subst::new();
    for (name, scheme) in &params.fields {
        let declared = scheme.mono_type().ok_or_else(|| TypeError::NotMonomorphic {
            name: name.clone(),
            span,
        })?;
        match supplied.iter().find(|(k, _, _)| k == name) {
            Some((_, ty, at)) => {
                let origin = ConstraintOrigin::Argument { name: name.clone() };
                let step =
                    unify_assignable(&declared.apply(&sub), &ty.apply(&sub), origin.clone(), *at)
                        .map_err(|e| e.with_span(span))?;
                ctx.defer_eager(&step, &origin, *at);
                sub = Subst::compose(&step, &sub);
            }
            None if declared.is_non_null() => {
                return Err(TypeError::MissingArgument {
                    name: name.clone(),
                    span,
                });
            }
            None => {}
        }
    }

    let unexpected: Vec<String> = supplied
        .iter()
        .filter(|(k, _, _)| params.scheme_of(k).is_none())
        .map(|(k, _, _)| k.clone())
        .collect();
    if !unexpected.is_empty() {
        return Err(TypeError::UnexpectedArguments {
            names: unexpected,
            span,
        });
    }
    Ok(sub)
}

fn infer_select(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    receiver: &Node,
    field: &str,
    args: Option<&[Field]>,
    span: Span,
) -> Result<Ty, TypeError> {
    let receiver_ty = infer_node(ctx, env, scope, receiver)?;
    let module = match receiver_ty.as_module() {
        Some(m) if receiver_ty.is_non_null() => m.id,
        _ => {
            return Err(TypeError::ExpectedObject {
                found: receiver_ty.clone(),
                span,
            })
        }
    };

    let scheme = env
        .scheme_of(module, field)
        .ok_or_else(|| TypeError::NoSuchField {
            ty: receiver_ty.clone(),
            field: field.to_string(),
            span,
        })?;
    let field_ty = scheme
        .mono_type()
        .ok_or_else(|| TypeError::NotMonomorphic {
            name: field.to_string(),
            span,
        })?
        .clone();

    let args = args.unwrap_or(&[]);
    match field_ty {
        Ty::Fun(fun) => {
            let supplied = infer_args(ctx, env, scope, args)?;
            let sub = check_call_args(ctx, &fun.arg, &supplied, span)?;
            // Selecting a function field always calls it.
            Ok(fun.ret(true).apply(&sub))
        }
        other if args.is_empty() => Ok(other),
        _ => Err(TypeError::UnexpectedArguments {
            names: args.iter().map(|a| a.name.clone()).collect(),
            span,
        }),
    }
}

fn infer_fun_call(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    fun: &Node,
    args: &[Field],
    span: Span,
) -> Result<Ty, TypeError> {
    let callee = infer_callee(ctx, env, scope, fun)?;
    let callee = match callee {
        Ty::NonNull(inner) if matches!(inner.as_ref(), Ty::Fun(_)) => *inner,
        other => other,
    };
    match callee {
        Ty::Fun(fun) => {
            let supplied = infer_args(ctx, env, scope, args)?;
            let sub = check_call_args(ctx, &fun.arg, &supplied, span)?;
            Ok(fun.ret(false).apply(&sub))
        }
        Ty::Module(class) => {
            // Constructor call: every argument names one of the class's slots.
            let mut sub = Subst::new();
            for (name, ty, at) in infer_args(ctx, env, scope, args)? {
                let scheme = env.scheme_of(class.id, &name).ok_or_else(|| TypeError::NoSuchField {
                    ty: Ty::Module(class.clone()),
                    field: name.clone(),
                    span: at,
                })?;
                let declared = scheme.mono_type().ok_or_else(|| TypeError::NotMonomorphic {
                    name: name.clone(),
                    span: at,
                })?;
                let origin = ConstraintOrigin::Argument { name: name.clone() };
                let step =
                    unify_assignable(&declared.apply(&sub), &ty.apply(&sub), origin.clone(), at)?;
                ctx.defer_eager(&step, &origin, at);
                sub = Subst::compose(&step, &sub);
            }
            Ok(Ty::non_null(Ty::Module(class)))
        }
        other => Err(TypeError::NotAFunction { ty: other, span }),
    }
}

// ── Values ──────────────────────────────────────────────────────────────

fn infer_record(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    fields: &[Field],
) -> Result<RecordType, TypeError> {
    reject_duplicate_fields(fields)?;
    let mut record = RecordType::anonymous(Vec::new());
    for field in fields {
        let ty = infer_node(ctx, env, scope, &field.value)?;
        record.add(field.name.clone(), Scheme::mono(ty));
    }
    Ok(record)
}

fn infer_list(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    elements: &[Node],
) -> Result<Ty, TypeError> {
    let Some((first, rest)) = elements.split_first() else {
        return Ok(Ty::non_null(Ty::list(ctx.fresh_var())));
    };
    let elem = infer_node(ctx, env, scope, first)?;
    let mut sub = Subst::new();
    for (offset, element) in rest.iter().enumerate() {
        let ty = infer_node(ctx, env, scope, element)?;
        let origin = ConstraintOrigin::ListElement { index: offset + 1 };
        let step = unify(&elem.apply(&sub), &ty.apply(&sub), origin.clone(), element.span)?;
        ctx.defer_eager(&step, &origin, element.span);
        sub = Subst::compose(&step, &sub);
    }
    Ok(Ty::non_null(Ty::list(elem.apply(&sub))))
}

fn infer_self(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    overrides: &[Field],
    span: Span,
) -> Result<Ty, TypeError> {
    let class = env.enclosing_class(scope);
    if env.kind(class) == ModuleKind::Root {
        return Err(TypeError::SelfOutsideClass { span });
    }
    for (name, ty, at) in infer_args(ctx, env, scope, overrides)? {
        let scheme = env
            .local_scheme(class, &name)
            .ok_or_else(|| TypeError::UnknownArgument {
                name: name.clone(),
                span: at,
            })?;
        let expected = scheme.mono_type().ok_or_else(|| TypeError::NotMonomorphic {
            name: name.clone(),
            span: at,
        })?;
        let origin = ConstraintOrigin::SelfOverride { name: name.clone() };
        let sub = unify_assignable(expected, &ty, origin.clone(), at)?;
        ctx.defer_eager(&sub, &origin, at);
    }
    Ok(Ty::non_null(env.module_ty(class)))
}

fn infer_default(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    left: &Node,
    right: &Node,
    span: Span,
) -> Result<Ty, TypeError> {
    let lt = infer_node(ctx, env, scope, left)?;
    let rt = infer_node(ctx, env, scope, right)?;
    let sub = unify(&Ty::non_null(lt), &rt, ConstraintOrigin::Default, span)?;
    ctx.defer_eager(&sub, &ConstraintOrigin::Default, span);
    Ok(rt.apply(&sub))
}

fn infer_literal(env: &Env, scope: ModuleId, class: &str, span: Span) -> Result<Ty, TypeError> {
    let id = env
        .named_type(scope, class)
        .ok_or_else(|| TypeError::UnresolvedType {
            name: class.to_string(),
            span,
        })?;
    Ok(Ty::non_null(env.module_ty(id)))
}

// ── Generic primitives ──────────────────────────────────────────────────

fn infer_lambda(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    param: &str,
    body: &Node,
) -> Result<Ty, TypeError> {
    let param_ty = ctx.fresh_var();
    let inner = env.new_scope(scope);
    env.add(inner, param, Scheme::mono(param_ty.clone()));
    ctx.lambda_depth += 1;
    let body_ty = infer_node(ctx, env, inner, body);
    ctx.lambda_depth -= 1;
    let body_ty = body_ty?;
    Ok(Ty::fun(
        RecordType::anonymous(vec![(param.to_string(), Scheme::mono(param_ty))]),
        body_ty,
    ))
}

fn infer_apply(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    fun: &Node,
    param: &str,
    arg: &Node,
    span: Span,
) -> Result<Ty, TypeError> {
    let fun_ty = infer_callee(ctx, env, scope, fun)?;
    let arg_ty = infer_node(ctx, env, scope, arg)?;
    let result = ctx.fresh_var();
    let expected = Ty::fun(
        RecordType::anonymous(vec![(param.to_string(), Scheme::mono(arg_ty))]),
        result.clone(),
    );
    ctx.push_constraint(fun_ty, expected, ConstraintOrigin::Application, span);
    Ok(result)
}

fn infer_let(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    name: &str,
    def: &Node,
    body: &Node,
) -> Result<Ty, TypeError> {
    let outer = std::mem::take(&mut ctx.constraints);
    let def_ty = infer_node(ctx, env, scope, def)?;
    let def_constraints = std::mem::take(&mut ctx.constraints);
    let sub = solve(&def_constraints)?;

    let env_free: Vec<_> = env
        .free_vars(scope)
        .into_iter()
        .flat_map(|v| Ty::Var(v).apply(&sub).free_vars())
        .collect();
    let scheme = ctx.generalize(&env_free, def_ty.apply(&sub));

    let inner = env.new_scope(scope);
    env.add(inner, name, scheme);
    let body_ty = infer_node(ctx, env, inner, body)?;

    let body_constraints = std::mem::take(&mut ctx.constraints);
    ctx.constraints = outer;
    ctx.constraints
        .extend(body_constraints.iter().map(|c| c.apply(&sub)));
    ctx.constraints.extend(def_constraints);
    Ok(body_ty.apply(&sub))
}

fn infer_let_rec(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    name: &str,
    def: &Node,
    body: &Node,
    span: Span,
) -> Result<Ty, TypeError> {
    let self_ty = ctx.fresh_var();
    let inner = env.new_scope(scope);
    env.add(inner, name, Scheme::mono(self_ty.clone()));
    let def_ty = infer_node(ctx, env, inner, def)?;
    let origin = ConstraintOrigin::RecursiveDefinition {
        name: name.to_string(),
    };
    ctx.push_constraint(self_ty, def_ty, origin, span);
    infer_node(ctx, env, inner, body)
}

// ── Type annotations ────────────────────────────────────────────────────

/// Resolve a type annotation. Named types climb the scope chain.
pub(crate) fn infer_type_node(
    ctx: &mut InferCtx,
    env: &Env,
    scope: ModuleId,
    node: &TypeNode,
    span: Span,
) -> Result<Ty, TypeError> {
    match node {
        TypeNode::Named { name } => {
            if name.is_empty() {
                return Err(TypeError::EmptyTypeName { span });
            }
            let class = env
                .named_type(scope, name)
                .ok_or_else(|| TypeError::UnresolvedType {
                    name: name.clone(),
                    span,
                })?;
            Ok(env.module_ty(class))
        }
        TypeNode::List { elem } => Ok(Ty::list(infer_type_node(ctx, env, scope, elem, span)?)),
        TypeNode::NonNull { inner } => {
            Ok(Ty::non_null(infer_type_node(ctx, env, scope, inner, span)?))
        }
        TypeNode::Fun { args, ret } => {
            let mut record = RecordType::anonymous(Vec::new());
            for (i, arg) in args.iter().enumerate() {
                if args[..i].iter().any(|a| a.name == arg.name) {
                    return Err(TypeError::DuplicateField {
                        name: arg.name.clone(),
                        span,
                    });
                }
                let ty = arg.ty.as_ref().ok_or_else(|| TypeError::NoTypeOrValue {
                    name: arg.name.clone(),
                    span,
                })?;
                let ty = infer_type_node(ctx, env, scope, ty, span)?;
                record.add(arg.name.clone(), Scheme::mono(ty));
            }
            let ret = infer_type_node(ctx, env, scope, ret, span)?;
            Ok(Ty::fun(record, ret))
        }
        TypeNode::Variable { name } => Ok(ctx.named_var(name)),
    }
}
