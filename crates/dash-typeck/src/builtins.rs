//! Built-in scalar registration.
//!
//! Literal nodes resolve their class by name through the environment, so
//! `String`, `Int` and `Boolean` have to exist as classes before anything is
//! inferred. Schema types with the same names reuse these classes.

use crate::env::Env;
use crate::ty::ModuleId;

/// Scalars every program can name, whether or not the schema declares them.
pub const BUILTIN_SCALARS: [&str; 3] = ["String", "Int", "Boolean"];

/// Register the built-in scalar classes in the root module.
///
/// Existing classes of the same name are kept.
pub fn register_builtins(env: &mut Env) {
    let root = env.root();
    for name in BUILTIN_SCALARS {
        find_or_create_class(env, root, name);
    }
}

/// An environment holding only the built-in scalars.
pub fn env_with_builtins() -> Env {
    let mut env = Env::new();
    register_builtins(&mut env);
    env
}

/// The class named `name` visible from `scope`, created in `scope` if absent.
pub(crate) fn find_or_create_class(env: &mut Env, scope: ModuleId, name: &str) -> ModuleId {
    match env.named_type(scope, name) {
        Some(id) => id,
        None => {
            let id = env.new_module(name);
            env.add_class(scope, name, id);
            id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_registered_once() {
        let mut env = env_with_builtins();
        let root = env.root();
        let string = env.named_type(root, "String").unwrap();
        let before = env.len();
        register_builtins(&mut env);
        assert_eq!(env.len(), before);
        assert_eq!(env.named_type(root, "String"), Some(string));
        assert_eq!(env.name(string), "String");
    }
}
