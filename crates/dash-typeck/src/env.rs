//! The module environment.
//!
//! Every class, schema object, scalar and lexical scope is a module in one
//! arena owned by `Env`. A module holds named schemes and named classes and
//! has a parent used for lookups that miss locally. The parent is either the
//! module's permanent fallback (the enclosing scope, or the query type for
//! the root) or, while a class body is being checked, the scope the class
//! was declared in. That temporary parent is a frame pushed and popped by
//! `with_parent`, so it is restored on every exit path.

use rustc_hash::FxHashMap;

use crate::ty::{ModuleId, Scheme, Ty, TyVar};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    /// The program's top-level module.
    Root,
    /// A class: a user `ClassDecl`, a schema object, or a built-in scalar.
    Class,
    /// A lexical scope for function arguments and `let` bindings.
    Scope,
}

#[derive(Clone, Debug)]
pub struct ModuleData {
    pub name: String,
    pub kind: ModuleKind,
    fallback: Option<ModuleId>,
    classes: FxHashMap<String, ModuleId>,
    vars: FxHashMap<String, Scheme>,
    /// Insertion order of `vars`, for deterministic iteration.
    order: Vec<String>,
}

impl ModuleData {
    fn new(name: String, kind: ModuleKind, fallback: Option<ModuleId>) -> Self {
        ModuleData {
            name,
            kind,
            fallback,
            classes: FxHashMap::default(),
            vars: FxHashMap::default(),
            order: Vec::new(),
        }
    }
}

/// The arena of all modules reachable during one check.
#[derive(Clone, Debug)]
pub struct Env {
    modules: Vec<ModuleData>,
    /// Active class bodies, innermost last: (class, caller scope).
    frames: Vec<(ModuleId, ModuleId)>,
    root: ModuleId,
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

impl Env {
    /// An environment holding only an empty root module.
    ///
    /// Most callers want `Env::from_schema` or `builtins::env_with_builtins`.
    pub fn new() -> Self {
        Env {
            modules: vec![ModuleData::new(String::new(), ModuleKind::Root, None)],
            frames: Vec::new(),
            root: ModuleId(0),
        }
    }

    pub fn root(&self) -> ModuleId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn data(&self, id: ModuleId) -> &ModuleData {
        &self.modules[id.0 as usize]
    }

    fn data_mut(&mut self, id: ModuleId) -> &mut ModuleData {
        &mut self.modules[id.0 as usize]
    }

    pub fn name(&self, id: ModuleId) -> &str {
        &self.data(id).name
    }

    pub fn kind(&self, id: ModuleId) -> ModuleKind {
        self.data(id).kind
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Allocate a class module. It is not registered under any name.
    pub fn new_module(&mut self, name: impl Into<String>) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules
            .push(ModuleData::new(name.into(), ModuleKind::Class, None));
        id
    }

    /// Allocate a lexical scope whose lookups fall back to `enclosing`.
    pub fn new_scope(&mut self, enclosing: ModuleId) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(ModuleData::new(
            String::new(),
            ModuleKind::Scope,
            Some(enclosing),
        ));
        id
    }

    /// The type naming a module. Modules are nominal.
    pub fn module_ty(&self, id: ModuleId) -> Ty {
        Ty::module(id, self.data(id).name.clone())
    }

    pub fn set_fallback(&mut self, id: ModuleId, fallback: Option<ModuleId>) {
        self.data_mut(id).fallback = fallback;
    }

    /// Bind (or rebind) a name in one module.
    pub fn add(&mut self, id: ModuleId, name: impl Into<String>, scheme: Scheme) {
        let name = name.into();
        let data = self.data_mut(id);
        if data.vars.insert(name.clone(), scheme).is_none() {
            data.order.push(name);
        }
    }

    /// Register a class under a name in one module.
    pub fn add_class(&mut self, id: ModuleId, name: impl Into<String>, class: ModuleId) {
        self.data_mut(id).classes.insert(name.into(), class);
    }

    // ── Parents ─────────────────────────────────────────────────────────

    /// The module searched when a lookup in `id` misses.
    pub fn parent(&self, id: ModuleId) -> Option<ModuleId> {
        self.frames
            .iter()
            .rev()
            .find(|(class, _)| *class == id)
            .map(|(_, caller)| *caller)
            .or(self.data(id).fallback)
    }

    /// Run `f` with `class`'s parent temporarily set to `parent`.
    pub fn with_parent<T>(
        &mut self,
        class: ModuleId,
        parent: ModuleId,
        f: impl FnOnce(&mut Env) -> T,
    ) -> T {
        self.frames.push((class, parent));
        let out = f(self);
        self.frames.pop();
        out
    }

    /// Iterate `id` and its ancestors, stopping at the first repeat.
    fn chain(&self, id: ModuleId) -> impl Iterator<Item = ModuleId> + '_ {
        let limit = self.modules.len();
        let mut next = Some(id);
        let mut steps = 0;
        std::iter::from_fn(move || {
            let current = next?;
            if steps > limit {
                return None;
            }
            steps += 1;
            next = self.parent(current);
            Some(current)
        })
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    /// A binding in exactly this module.
    pub fn local_scheme(&self, id: ModuleId, name: &str) -> Option<&Scheme> {
        self.data(id).vars.get(name)
    }

    /// A binding in this module or the nearest ancestor that has one.
    pub fn scheme_of(&self, id: ModuleId, name: &str) -> Option<&Scheme> {
        self.lookup(id, name).map(|(_, s)| s)
    }

    /// Like `scheme_of`, also returning the module that owns the binding.
    pub fn lookup(&self, id: ModuleId, name: &str) -> Option<(ModuleId, &Scheme)> {
        self.chain(id)
            .find_map(|m| self.data(m).vars.get(name).map(|s| (m, s)))
    }

    /// A class by name in this module or the nearest ancestor that has one.
    pub fn named_type(&self, id: ModuleId, name: &str) -> Option<ModuleId> {
        self.chain(id)
            .find_map(|m| self.data(m).classes.get(name).copied())
    }

    /// The innermost class or root module enclosing a scope.
    pub fn enclosing_class(&self, id: ModuleId) -> ModuleId {
        self.chain(id)
            .find(|m| self.data(*m).kind != ModuleKind::Scope)
            .unwrap_or(self.root)
    }

    /// Bindings of one module in insertion order.
    pub fn bindings(&self, id: ModuleId) -> impl Iterator<Item = (&str, &Scheme)> + '_ {
        let data = self.data(id);
        data.order
            .iter()
            .filter_map(move |k| data.vars.get(k).map(|s| (k.as_str(), s)))
    }

    /// Free type variables of every binding visible from `id`.
    pub fn free_vars(&self, id: ModuleId) -> Vec<TyVar> {
        let mut out: Vec<TyVar> = Vec::new();
        for m in self.chain(id) {
            for (_, scheme) in self.bindings(m) {
                for v in scheme.free_vars() {
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
            }
        }
        out
    }
}
