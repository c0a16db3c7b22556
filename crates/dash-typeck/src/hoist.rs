//! Pre-declaration of classes and slot signatures.
//!
//! Before a block's forms are inferred, hoisting walks them twice. The first
//! walk (`Phase::Shapes`) creates every class the block declares and binds
//! its name, so classes can mention each other in any order. The second walk
//! (`Phase::Slots`) re-enters each class body with the block as its parent
//! and binds every annotated slot to its declared type. Slot values are never
//! looked at here.
//!
//! Errors from independent forms are collected and returned together.

use tracing::debug;

use crate::ast::{Block, ClassDecl, Node, NodeKind, SlotDecl};
use crate::builtins::find_or_create_class;
use crate::env::Env;
use crate::error::TypeError;
use crate::infer::infer_type_node;
use crate::ty::{ModuleId, Scheme};
use crate::unify::InferCtx;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Create classes and bind their names.
    Shapes,
    /// Bind annotated slot types inside class bodies.
    Slots,
}

/// Hoist one block into `scope`, running both phases.
pub(crate) fn hoist_block(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    block: &Block,
) -> Result<(), TypeError> {
    let mut errors = Vec::new();
    for phase in [Phase::Shapes, Phase::Slots] {
        for form in &block.forms {
            if let Err(err) = hoist_form(ctx, env, scope, form, phase) {
                errors.push(err);
            }
        }
    }
    match TypeError::join(errors) {
        Some(err) => Err(err),
        None => {
            debug!(scope = scope.0, forms = block.forms.len(), "hoisted block");
            Ok(())
        }
    }
}

fn hoist_form(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    form: &Node,
    phase: Phase,
) -> Result<(), TypeError> {
    match &form.kind {
        NodeKind::Block(block) => {
            let mut errors = Vec::new();
            for inner in &block.forms {
                if let Err(err) = hoist_form(ctx, env, scope, inner, phase) {
                    errors.push(err);
                }
            }
            TypeError::join(errors).map_or(Ok(()), Err)
        }
        NodeKind::ClassDecl(decl) => hoist_class(ctx, env, scope, decl, phase),
        NodeKind::SlotDecl(slot) => hoist_slot(ctx, env, scope, slot, form, phase),
        _ => Ok(()),
    }
}

fn hoist_class(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    decl: &ClassDecl,
    phase: Phase,
) -> Result<(), TypeError> {
    let class = find_or_create_class(env, scope, &decl.name);
    let self_scheme = Scheme::mono(env.module_ty(class));
    env.add(class, "self", self_scheme.clone());
    env.add(scope, decl.name.clone(), self_scheme);

    match phase {
        Phase::Shapes => Ok(()),
        Phase::Slots => env.with_parent(class, scope, |env| {
            hoist_block(ctx, env, class, &decl.body)
        }),
    }
}

fn hoist_slot(
    ctx: &mut InferCtx,
    env: &mut Env,
    scope: ModuleId,
    slot: &SlotDecl,
    form: &Node,
    phase: Phase,
) -> Result<(), TypeError> {
    if phase == Phase::Shapes {
        return Ok(());
    }
    if let Some(ty) = &slot.ty {
        let declared = infer_type_node(ctx, env, scope, ty, form.span)?;
        env.add(scope, slot.name.clone(), Scheme::mono(declared));
    }
    Ok(())
}
