//! Names of the runtime environment the emitted code lives in.
//!
//! The non-strong dialects hang everything off the `ScalaJS` namespace
//! (`ScalaJS.c.Foo`, `ScalaJS.is.Foo`, …); strong mode uses flat
//! `$`-prefixed bindings (`$c_Foo`, `$is_Foo`, …) because `'use strong'`
//! rules out building namespaces imperatively.

use crate::js::Tree;
use crate::output_mode::OutputMode;

/// A per-class environment field, e.g. `ScalaJS.c.Foo` / `$c_Foo`.
pub(crate) fn env_field(mode: OutputMode, field: &str, name: &str) -> Tree {
    if mode.is_strong() {
        Tree::ident(format!("${field}_{name}"))
    } else {
        Tree::dot(Tree::dot(Tree::ident("ScalaJS"), field), name)
    }
}

/// A per-method environment field, e.g. `ScalaJS.s.Foo__bar__I` /
/// `$s_Foo__bar__I`.
pub(crate) fn env_method_field(
    mode: OutputMode,
    field: &str,
    class_name: &str,
    method_name: &str,
) -> Tree {
    env_field(mode, field, &format!("{class_name}__{method_name}"))
}

/// A top-level environment member, e.g. `ScalaJS.TypeData` / `$TypeData`.
pub(crate) fn env_member(mode: OutputMode, name: &str) -> Tree {
    if mode.is_strong() {
        Tree::ident(format!("${name}"))
    } else {
        Tree::dot(Tree::ident("ScalaJS"), name)
    }
}

/// A runtime helper function reference (`ScalaJS.throwClassCastException` /
/// `$throwClassCastException`). Helpers whose canonical name already starts
/// with `$` only exist in strong mode and are referenced verbatim.
pub(crate) fn helper_ref(mode: OutputMode, name: &str) -> Tree {
    if name.starts_with('$') {
        debug_assert!(mode.is_strong(), "helper {name} is strong-mode only");
        Tree::ident(name)
    } else {
        env_member(mode, name)
    }
}

/// A top-level function bound to an environment field: an assignment of a
/// function expression in the namespace dialects, a function declaration in
/// strong mode.
pub(crate) fn env_function(
    mode: OutputMode,
    field: &str,
    name: &str,
    params: Vec<String>,
    body: Vec<Tree>,
) -> Tree {
    if mode.is_strong() {
        Tree::FunctionDef {
            name: format!("${field}_{name}"),
            params,
            body,
        }
    } else {
        Tree::assign(env_field(mode, field, name), Tree::function(params, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::printer::print_tree;

    #[test]
    fn namespace_vs_flat_naming() {
        let es5 = env_field(OutputMode::ES5Global, "c", "Foo");
        assert_eq!(print_tree(&es5, OutputMode::ES5Global), "ScalaJS.c.Foo;\n");
        let strong = env_field(OutputMode::ES6StrongMode, "c", "Foo");
        assert_eq!(print_tree(&strong, OutputMode::ES6StrongMode), "$c_Foo;\n");
    }

    #[test]
    fn method_fields_join_with_double_underscore() {
        let tree = env_method_field(OutputMode::ES5Global, "s", "Foo", "bar__I");
        assert_eq!(
            print_tree(&tree, OutputMode::ES5Global),
            "ScalaJS.s.Foo__bar__I;\n"
        );
    }

    #[test]
    fn env_function_shape_per_mode() {
        let es5 = env_function(OutputMode::ES5Global, "is", "Foo", vec!["obj".into()], vec![]);
        assert!(matches!(es5, Tree::Assign { .. }));
        let strong = env_function(
            OutputMode::ES6StrongMode,
            "is",
            "Foo",
            vec!["obj".into()],
            vec![],
        );
        assert!(matches!(strong, Tree::FunctionDef { ref name, .. } if name == "$is_Foo"));
    }
}
