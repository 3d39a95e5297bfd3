//! Desugars IR method bodies into JS trees.
//!
//! Desugaring is a pure function of the IR, the active dialect, and the
//! emitter's global queries (`is_interface`, `uses_js_constructor_opt`). The
//! latter records a dependency with the ctor-opt tracker each time it is
//! asked, which is what makes cross-run invalidation complete.

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use crate::emitter::ctor_opt::{CtorOptTracker, MethodRef};
use crate::emitter::env::{env_field, env_method_field};
use crate::errors::EmitterError;
use crate::ir::definitions::is_constructor_name;
use crate::ir::{BinOp, ClassKind, Expr, LinkedClass, Literal, ParamDef, UnOp};
use crate::js::Tree;
use crate::output_mode::OutputMode;
use crate::semantics::{CheckedBehavior, Semantics};

/// Everything desugaring may ask about the world, borrowed for one run.
pub(crate) struct DesugarCtx<'a> {
    pub mode: OutputMode,
    pub semantics: &'a Semantics,
    pub classes: &'a FxHashMap<&'a str, &'a LinkedClass>,
    pub tracker: &'a RefCell<CtorOptTracker>,
}

impl<'a> DesugarCtx<'a> {
    pub(crate) fn linked_class(&self, name: &str) -> Option<&'a LinkedClass> {
        self.classes.get(name).copied()
    }

    /// Note: this consults whole-program knowledge without recording an IR
    /// dependency; a class changing kind between runs does not invalidate
    /// call sites desugared under the old answer (see DESIGN.md).
    pub(crate) fn is_interface(&self, name: &str) -> bool {
        self.linked_class(name)
            .is_some_and(|c| c.kind == ClassKind::Interface)
    }

    pub(crate) fn uses_js_constructor_opt(&self, target: &str, caller: &MethodRef) -> bool {
        self.tracker
            .borrow_mut()
            .uses_js_constructor_opt(target, caller)
    }
}

/// Desugars a method body into a JS function expression.
///
/// With `this_ident` the receiver arrives as an explicit first parameter
/// (interface default methods); without it, `this` is used directly.
/// Constructor-bearing methods return `this`.
pub(crate) fn desugar_to_function(
    ctx: &DesugarCtx<'_>,
    caller: &MethodRef,
    params: &[ParamDef],
    body: &Expr,
    this_ident: Option<&str>,
) -> Result<Tree, EmitterError> {
    let mut js_params: Vec<String> = Vec::with_capacity(params.len() + 1);
    if let Some(this_ident) = this_ident {
        js_params.push(this_ident.to_owned());
    }
    js_params.extend(params.iter().map(|p| p.name.clone()));

    let mut body = desugar_body(ctx, caller, body, this_ident)?;
    if is_constructor_name(&caller.method_name) {
        body.push(Tree::ret(Some(match this_ident {
            Some(ident) => Tree::ident(ident),
            None => Tree::This,
        })));
    }
    Ok(Tree::function(js_params, body))
}

/// Desugars a body into a flat statement list (top-level blocks inlined).
pub(crate) fn desugar_body(
    ctx: &DesugarCtx<'_>,
    caller: &MethodRef,
    body: &Expr,
    this_ident: Option<&str>,
) -> Result<Vec<Tree>, EmitterError> {
    let desugarer = Desugarer {
        ctx,
        caller,
        this_ident,
    };
    match body {
        Expr::Block(stats) => stats.iter().map(|s| desugarer.stat(s)).collect(),
        single => Ok(vec![desugarer.stat(single)?]),
    }
}

/// Desugars a single IR tree in statement or expression position.
pub(crate) fn desugar_tree(
    ctx: &DesugarCtx<'_>,
    caller: &MethodRef,
    expr: &Expr,
    is_stat: bool,
) -> Result<Tree, EmitterError> {
    let desugarer = Desugarer {
        ctx,
        caller,
        this_ident: None,
    };
    if is_stat {
        desugarer.stat(expr)
    } else {
        desugarer.expr(expr)
    }
}

struct Desugarer<'a, 'b> {
    ctx: &'b DesugarCtx<'a>,
    caller: &'b MethodRef,
    this_ident: Option<&'b str>,
}

impl Desugarer<'_, '_> {
    fn stat(&self, tree: &Expr) -> Result<Tree, EmitterError> {
        match tree {
            Expr::Skip => Ok(Tree::Skip),
            Expr::Block(stats) => Ok(Tree::Block(
                stats
                    .iter()
                    .map(|s| self.stat(s))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::VarDef { name, rhs } => Ok(Tree::var_def(name.clone(), Some(self.expr(rhs)?))),
            Expr::Assign { lhs, rhs } => Ok(Tree::assign(self.expr(lhs)?, self.expr(rhs)?)),
            Expr::If { cond, thenp, elsep } => Ok(Tree::If {
                cond: Box::new(self.expr(cond)?),
                thenp: Box::new(self.stat(thenp)?),
                elsep: Box::new(self.stat(elsep)?),
            }),
            Expr::While { cond, body } => Ok(Tree::While {
                cond: Box::new(self.expr(cond)?),
                body: Box::new(self.stat(body)?),
            }),
            Expr::Return(None) => Ok(Tree::Return(None)),
            Expr::Return(Some(expr)) => Ok(Tree::ret(Some(self.expr(expr)?))),
            Expr::Throw(expr) => Ok(Tree::Throw(Box::new(self.expr(expr)?))),
            Expr::StoreModule { class_name, value } => Ok(Tree::assign(
                env_field(self.ctx.mode, "n", class_name),
                self.expr(value)?,
            )),
            expr => self.expr(expr),
        }
    }

    fn expr(&self, tree: &Expr) -> Result<Tree, EmitterError> {
        match tree {
            Expr::This => Ok(match self.this_ident {
                Some(ident) => Tree::ident(ident),
                None => Tree::This,
            }),
            Expr::VarRef(name) => Ok(Tree::ident(name.clone())),
            Expr::Select { receiver, field } => Ok(Tree::dot(self.expr(receiver)?, field.clone())),
            Expr::Apply {
                receiver,
                method,
                args,
            } => Ok(Tree::apply(
                Tree::dot(self.expr(receiver)?, method.clone()),
                self.args(args)?,
            )),
            Expr::ApplyStatically {
                receiver,
                class_name,
                method,
                args,
            } => {
                let target = Tree::dot(
                    Tree::dot(
                        Tree::dot(env_field(self.ctx.mode, "c", class_name), "prototype"),
                        method.clone(),
                    ),
                    "call",
                );
                let mut call_args = vec![self.expr(receiver)?];
                call_args.extend(self.args(args)?);
                Ok(Tree::apply(target, call_args))
            }
            Expr::ApplyStatic {
                class_name,
                method,
                args,
            } => {
                // Static methods live on the class construct in the
                // class-syntax modes, but only when the target actually gets
                // a construct; everything else goes through the `s_` field.
                let target_has_construct = self
                    .ctx
                    .linked_class(class_name)
                    .is_some_and(|c| c.has_instances && c.kind.is_any_scalajs_defined_class());
                let target = if self.ctx.is_interface(class_name) {
                    if self.ctx.mode.is_strong() {
                        Tree::ident(format!("$f_{method}"))
                    } else {
                        env_method_field(self.ctx.mode, "f", class_name, method)
                    }
                } else if self.ctx.mode.uses_classes() && target_has_construct {
                    Tree::dot(env_field(self.ctx.mode, "c", class_name), method.clone())
                } else {
                    env_method_field(self.ctx.mode, "s", class_name, method)
                };
                Ok(Tree::apply(target, self.args(args)?))
            }
            Expr::New {
                class_name,
                ctor,
                args,
            } => {
                let class_var = env_field(self.ctx.mode, "c", class_name);
                let args = self.args(args)?;
                if self.ctx.uses_js_constructor_opt(class_name, self.caller) {
                    Ok(Tree::new_call(class_var, args))
                } else {
                    Ok(Tree::apply(
                        Tree::dot(Tree::new_call(class_var, vec![]), ctor.clone()),
                        args,
                    ))
                }
            }
            Expr::LoadModule(class_name) => Ok(Tree::apply(
                env_field(self.ctx.mode, "m", class_name),
                vec![],
            )),
            Expr::LoadJSConstructor(class_name) => self.js_constructor_ref(class_name),
            Expr::JSNew { ctor, args } => Ok(Tree::new_call(self.expr(ctor)?, self.args(args)?)),
            Expr::IsInstanceOf { expr, class_name } => Ok(Tree::apply(
                env_field(self.ctx.mode, "is", class_name),
                vec![self.expr(expr)?],
            )),
            Expr::AsInstanceOf { expr, class_name } => {
                if self.ctx.semantics.as_instance_ofs == CheckedBehavior::Unchecked {
                    self.expr(expr)
                } else {
                    Ok(Tree::apply(
                        env_field(self.ctx.mode, "as", class_name),
                        vec![self.expr(expr)?],
                    ))
                }
            }
            Expr::BinaryOp { op, lhs, rhs } => Ok(binary_op(*op, self.expr(lhs)?, self.expr(rhs)?)),
            Expr::UnaryOp { op, expr } => {
                let operand = self.expr(expr)?;
                Ok(match op {
                    UnOp::Not => Tree::unary("!", operand),
                    UnOp::Neg => Tree::unary("-", operand),
                })
            }
            Expr::If { cond, thenp, elsep } => Ok(Tree::conditional(
                self.expr(cond)?,
                self.expr(thenp)?,
                self.expr(elsep)?,
            )),
            Expr::Assign { lhs, rhs } => Ok(Tree::assign(self.expr(lhs)?, self.expr(rhs)?)),
            Expr::Literal(lit) => Ok(literal(lit)),
            stmt @ (Expr::Skip
            | Expr::Block(_)
            | Expr::VarDef { .. }
            | Expr::While { .. }
            | Expr::Return(_)
            | Expr::Throw(_)
            | Expr::StoreModule { .. }) => Err(EmitterError::InvalidInput(format!(
                "statement-only node in expression position in {}.{}: {stmt:?}",
                self.caller.class_name, self.caller.method_name
            ))),
        }
    }

    fn args(&self, args: &[Expr]) -> Result<Vec<Tree>, EmitterError> {
        args.iter().map(|a| self.expr(a)).collect()
    }

    fn js_constructor_ref(&self, class_name: &str) -> Result<Tree, EmitterError> {
        let Some(class) = self.ctx.linked_class(class_name) else {
            return Err(EmitterError::InvalidInput(format!(
                "JS constructor of unknown class {class_name}"
            )));
        };
        match class.kind {
            ClassKind::RawJSType => {
                let Some(js_name) = &class.js_name else {
                    return Err(EmitterError::InvalidInput(format!(
                        "raw JS type {class_name} has no JS name"
                    )));
                };
                let mut parts = js_name.split('.');
                let first = parts.next().unwrap_or_default();
                Ok(parts.fold(Tree::ident(first), Tree::dot))
            }
            ClassKind::JSClass | ClassKind::JSModuleClass => {
                Ok(env_field(self.ctx.mode, "c", class_name))
            }
            _ => Err(EmitterError::InvalidInput(format!(
                "{class_name} has no JS constructor"
            ))),
        }
    }
}

fn binary_op(op: BinOp, lhs: Tree, rhs: Tree) -> Tree {
    let (js_op, int_coerce) = match op {
        BinOp::Eq => ("===", false),
        BinOp::Ne => ("!==", false),
        BinOp::Lt => ("<", false),
        BinOp::Le => ("<=", false),
        BinOp::Gt => (">", false),
        BinOp::Ge => (">=", false),
        BinOp::Add | BinOp::StringConcat => ("+", false),
        BinOp::Sub => ("-", false),
        BinOp::Mul => ("*", false),
        BinOp::Div => ("/", false),
        BinOp::Mod => ("%", false),
        BinOp::IntAdd => ("+", true),
        BinOp::IntSub => ("-", true),
        BinOp::IntDiv => ("/", true),
        BinOp::IntMod => ("%", true),
        BinOp::BoolAnd => ("&&", false),
        BinOp::BoolOr => ("||", false),
        BinOp::BitAnd => ("&", false),
        BinOp::BitOr => ("|", false),
        BinOp::BitXor => ("^", false),
        BinOp::Shl => ("<<", false),
        BinOp::Shr => (">>", false),
        BinOp::UShr => (">>>", false),
    };
    let tree = Tree::binary(js_op, lhs, rhs);
    if int_coerce {
        Tree::binary("|", tree, Tree::Int(0))
    } else {
        tree
    }
}

fn literal(lit: &Literal) -> Tree {
    match lit {
        Literal::Undefined => Tree::Undefined,
        Literal::Null => Tree::Null,
        Literal::Bool(b) => Tree::Bool(*b),
        Literal::Int(i) => Tree::Int(*i),
        Literal::Double(d) => Tree::Double(*d),
        Literal::Str(s) => Tree::str(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{LinkingUnit, MethodDef};
    use crate::js::printer::print_tree;

    fn iface(name: &str) -> LinkedClass {
        LinkedClass {
            encoded_name: name.to_string(),
            original_name: None,
            kind: ClassKind::Interface,
            super_class: None,
            ancestors: vec![name.to_string()],
            js_name: None,
            fields: vec![],
            static_methods: vec![],
            member_methods: vec![],
            exported_members: vec![],
            class_exports: vec![],
            has_instances: false,
            has_instance_tests: false,
            has_runtime_type_info: false,
            version: None,
        }
    }

    fn ctor_opt_class(name: &str) -> LinkedClass {
        LinkedClass {
            kind: ClassKind::Class,
            has_instances: true,
            member_methods: vec![MethodDef {
                name: "init___".to_string(),
                params: vec![],
                body: Expr::Skip,
                version: Some("v".to_string()),
            }],
            ..iface(name)
        }
    }

    struct Fixture {
        classes: Vec<LinkedClass>,
        tracker: RefCell<CtorOptTracker>,
        semantics: Semantics,
    }

    impl Fixture {
        fn new(classes: Vec<LinkedClass>) -> Self {
            let tracker = RefCell::new(CtorOptTracker::default());
            tracker
                .borrow_mut()
                .begin_run(&LinkingUnit::new(classes.clone()), |_| {});
            Fixture {
                classes,
                tracker,
                semantics: Semantics::default(),
            }
        }

        fn desugar(&self, mode: OutputMode, expr: &Expr) -> String {
            let by_name: FxHashMap<&str, &LinkedClass> = self
                .classes
                .iter()
                .map(|c| (c.encoded_name.as_str(), c))
                .collect();
            let ctx = DesugarCtx {
                mode,
                semantics: &self.semantics,
                classes: &by_name,
                tracker: &self.tracker,
            };
            let caller = MethodRef::new("Caller", "m__V", false);
            let tree = desugar_tree(&ctx, &caller, expr, false).unwrap();
            print_tree(&tree, mode)
        }
    }

    #[test]
    fn static_call_routing_by_kind() {
        let fixture = Fixture::new(vec![iface("Iface"), ctor_opt_class("Klass")]);
        let to_iface = Expr::ApplyStatic {
            class_name: "Iface".to_string(),
            method: "m__V".to_string(),
            args: vec![],
        };
        let to_class = Expr::ApplyStatic {
            class_name: "Klass".to_string(),
            method: "m__V".to_string(),
            args: vec![],
        };

        assert_eq!(
            fixture.desugar(OutputMode::ES5Global, &to_iface),
            "ScalaJS.f.Iface__m__V();\n"
        );
        assert_eq!(
            fixture.desugar(OutputMode::ES6StrongMode, &to_iface),
            "$f_m__V();\n"
        );
        assert_eq!(
            fixture.desugar(OutputMode::ES5Global, &to_class),
            "ScalaJS.s.Klass__m__V();\n"
        );
        assert_eq!(
            fixture.desugar(OutputMode::ES6, &to_class),
            "ScalaJS.c.Klass.m__V();\n"
        );
    }

    #[test]
    fn new_uses_ctor_opt_when_candidate() {
        let fixture = Fixture::new(vec![ctor_opt_class("Klass"), iface("Other")]);
        let of_candidate = Expr::New {
            class_name: "Klass".to_string(),
            ctor: "init___".to_string(),
            args: vec![],
        };
        let of_other = Expr::New {
            class_name: "Other".to_string(),
            ctor: "init___".to_string(),
            args: vec![],
        };
        assert_eq!(
            fixture.desugar(OutputMode::ES5Global, &of_candidate),
            "new ScalaJS.c.Klass();\n"
        );
        assert_eq!(
            fixture.desugar(OutputMode::ES5Global, &of_other),
            "new ScalaJS.c.Other().init___();\n"
        );
    }

    #[test]
    fn new_records_the_dependency() {
        let fixture = Fixture::new(vec![ctor_opt_class("Klass")]);
        fixture.desugar(
            OutputMode::ES5Global,
            &Expr::New {
                class_name: "Klass".to_string(),
                ctor: "init___".to_string(),
                args: vec![],
            },
        );
        // A flip must now reach the recorded caller.
        let mut tracker = fixture.tracker.borrow_mut();
        tracker.end_run();
        let mut invalidated = Vec::new();
        tracker.begin_run(&LinkingUnit::default(), |m| invalidated.push(m.clone()));
        assert_eq!(invalidated, vec![MethodRef::new("Caller", "m__V", false)]);
    }

    #[test]
    fn default_method_receiver_parameter() {
        let fixture = Fixture::new(vec![]);
        let by_name = FxHashMap::default();
        let ctx = DesugarCtx {
            mode: OutputMode::ES5Global,
            semantics: &fixture.semantics,
            classes: &by_name,
            tracker: &fixture.tracker,
        };
        let caller = MethodRef::new("Iface", "m__V", false);
        let body = Expr::ret(Expr::select(Expr::This, "x$1"));
        let tree = desugar_to_function(
            &ctx,
            &caller,
            &[ParamDef::new("a")],
            &body,
            Some("$thiz"),
        )
        .unwrap();
        let printed = print_tree(&tree, OutputMode::ES5Global);
        assert!(printed.starts_with("(function($thiz, a) {"));
        assert!(printed.contains("return $thiz.x$1;"));
    }

    #[test]
    fn constructor_methods_return_this() {
        let fixture = Fixture::new(vec![]);
        let by_name = FxHashMap::default();
        let ctx = DesugarCtx {
            mode: OutputMode::ES5Global,
            semantics: &fixture.semantics,
            classes: &by_name,
            tracker: &fixture.tracker,
        };
        let caller = MethodRef::new("Foo", "init___", false);
        let tree = desugar_to_function(&ctx, &caller, &[], &Expr::Skip, None).unwrap();
        assert!(print_tree(&tree, OutputMode::ES5Global).contains("return this;"));
    }

    #[test]
    fn int_arithmetic_is_coerced() {
        let fixture = Fixture::new(vec![]);
        let sum = Expr::BinaryOp {
            op: BinOp::IntAdd,
            lhs: Box::new(Expr::var("a")),
            rhs: Box::new(Expr::var("b")),
        };
        assert_eq!(fixture.desugar(OutputMode::ES5Global, &sum), "((a + b) | 0);\n");
    }

    #[test]
    fn unchecked_casts_pass_through() {
        let mut fixture = Fixture::new(vec![]);
        let cast = Expr::AsInstanceOf {
            expr: Box::new(Expr::var("x")),
            class_name: "Foo".to_string(),
        };
        assert_eq!(
            fixture.desugar(OutputMode::ES5Global, &cast),
            "ScalaJS.as.Foo(x);\n"
        );
        fixture.semantics.as_instance_ofs = CheckedBehavior::Unchecked;
        assert_eq!(fixture.desugar(OutputMode::ES5Global, &cast), "x;\n");
    }

    #[test]
    fn statement_in_expression_position_is_invalid_input() {
        let fixture = Fixture::new(vec![]);
        let by_name = FxHashMap::default();
        let ctx = DesugarCtx {
            mode: OutputMode::ES5Global,
            semantics: &fixture.semantics,
            classes: &by_name,
            tracker: &fixture.tracker,
        };
        let caller = MethodRef::new("Foo", "m__V", false);
        let bad = Expr::Apply {
            receiver: Box::new(Expr::var("x")),
            method: "m__V".to_string(),
            args: vec![Expr::While {
                cond: Box::new(Expr::Literal(Literal::Bool(true))),
                body: Box::new(Expr::Skip),
            }],
        };
        assert!(matches!(
            desugar_tree(&ctx, &caller, &bad, false),
            Err(EmitterError::InvalidInput(_))
        ));
    }

    #[test]
    fn raw_js_constructor_resolves_dotted_path() {
        let mut raw = iface("HtmlEl");
        raw.kind = ClassKind::RawJSType;
        raw.js_name = Some("window.HTMLElement".to_string());
        let fixture = Fixture::new(vec![raw]);
        let load = Expr::LoadJSConstructor("HtmlEl".to_string());
        assert_eq!(
            fixture.desugar(OutputMode::ES5Global, &load),
            "window.HTMLElement;\n"
        );
    }
}
