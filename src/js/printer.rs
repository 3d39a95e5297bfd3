//! Prints [`Tree`]s as JavaScript text.
//!
//! All string emission lives here; the generators only build trees. Compound
//! expressions are parenthesized unconditionally, which keeps the printer
//! independent of operator precedence and makes the output stable.

use crate::js::{PropertyName, Tree};
use crate::output_mode::OutputMode;

/// Tree-to-text printer for one statement or expression.
pub struct Printer {
    out: String,
    indent_level: u32,
    indent_str: &'static str,
    use_let: bool,
}

impl Printer {
    pub fn new(mode: OutputMode) -> Self {
        Printer {
            out: String::with_capacity(256),
            indent_level: 0,
            indent_str: "  ",
            use_let: mode.uses_let(),
        }
    }

    /// Prints a top-level statement followed by a newline.
    pub fn print_stat(&mut self, tree: &Tree) {
        if matches!(tree, Tree::Skip) {
            return;
        }
        self.write_indent();
        self.stat(tree);
        self.write("\n");
    }

    pub fn into_output(self) -> String {
        self.out
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.out.push_str(self.indent_str);
        }
    }

    fn stat_line(&mut self, tree: &Tree) {
        if matches!(tree, Tree::Skip) {
            return;
        }
        self.write_indent();
        self.stat(tree);
        self.write("\n");
    }

    /// Prints one statement without the trailing newline.
    fn stat(&mut self, tree: &Tree) {
        match tree {
            Tree::Skip => {}
            Tree::DocComment(text) => {
                self.write("/** ");
                self.write(text);
                self.write(" */");
            }
            Tree::Block(stats) => {
                self.write("{\n");
                self.indent_level += 1;
                for stat in stats {
                    self.stat_line(stat);
                }
                self.indent_level -= 1;
                self.write_indent();
                self.write("}");
            }
            Tree::If { cond, thenp, elsep } => {
                self.write("if (");
                self.expr(cond);
                self.write(") ");
                self.stat_as_block(thenp);
                match &**elsep {
                    Tree::Skip => {}
                    Tree::If { .. } => {
                        self.write(" else ");
                        self.stat(elsep);
                    }
                    other => {
                        self.write(" else ");
                        self.stat_as_block(other);
                    }
                }
            }
            Tree::While { cond, body } => {
                self.write("while (");
                self.expr(cond);
                self.write(") ");
                self.stat_as_block(body);
            }
            Tree::Return(None) => self.write("return;"),
            Tree::Return(Some(expr)) => {
                self.write("return ");
                self.expr(expr);
                self.write(";");
            }
            Tree::Throw(expr) => {
                self.write("throw ");
                self.expr(expr);
                self.write(";");
            }
            Tree::VarDef { name, rhs } => {
                self.write(if self.use_let { "let " } else { "var " });
                self.write(name);
                if let Some(rhs) = rhs {
                    self.write(" = ");
                    self.expr(rhs);
                }
                self.write(";");
            }
            Tree::Assign { lhs, rhs } => {
                self.expr(lhs);
                self.write(" = ");
                self.expr(rhs);
                self.write(";");
            }
            Tree::FunctionDef { name, params, body } => {
                self.write("function ");
                self.write(name);
                self.param_list(params);
                self.write(" ");
                self.function_body(body);
            }
            Tree::Class { .. } => self.class_construct(tree),
            Tree::MethodDef { .. } | Tree::GetterDef { .. } | Tree::SetterDef { .. } => {
                debug_assert!(false, "class member outside a class construct");
            }
            expr => {
                self.expr(expr);
                self.write(";");
            }
        }
    }

    /// Statements used as if/while branches always print braced.
    fn stat_as_block(&mut self, tree: &Tree) {
        match tree {
            Tree::Block(_) => self.stat(tree),
            single => {
                self.write("{\n");
                self.indent_level += 1;
                self.stat_line(single);
                self.indent_level -= 1;
                self.write_indent();
                self.write("}");
            }
        }
    }

    fn expr(&mut self, tree: &Tree) {
        match tree {
            Tree::Ident(name) => self.write(name),
            Tree::This => self.write("this"),
            Tree::Super => self.write("super"),
            Tree::Undefined => self.write("(void 0)"),
            Tree::Null => self.write("null"),
            Tree::Bool(true) => self.write("true"),
            Tree::Bool(false) => self.write("false"),
            Tree::Int(value) => {
                if *value < 0 {
                    self.write(&format!("({value})"));
                } else {
                    self.write(&value.to_string());
                }
            }
            Tree::Double(value) => self.write(&format_double(*value)),
            Tree::Str(value) => self.string_literal(value),
            Tree::DotSelect { qualifier, item } => {
                self.qualifier(qualifier);
                self.write(".");
                self.write(item);
            }
            Tree::BracketSelect { qualifier, item } => {
                self.qualifier(qualifier);
                self.write("[");
                self.expr(item);
                self.write("]");
            }
            Tree::Apply { fun, args } => {
                self.expr(fun);
                self.arg_list(args);
            }
            Tree::New { ctor, args } => {
                self.write("new ");
                self.qualifier(ctor);
                self.arg_list(args);
            }
            Tree::BinaryOp { op, lhs, rhs } => {
                self.write("(");
                self.expr(lhs);
                self.write(" ");
                self.write(op);
                self.write(" ");
                self.expr(rhs);
                self.write(")");
            }
            Tree::UnaryOp { op, operand } => {
                self.write("(");
                self.write(op);
                if op.ends_with(|c: char| c.is_ascii_alphabetic()) {
                    self.write(" ");
                }
                self.expr(operand);
                self.write(")");
            }
            Tree::Conditional { cond, thenp, elsep } => {
                self.write("(");
                self.expr(cond);
                self.write(" ? ");
                self.expr(thenp);
                self.write(" : ");
                self.expr(elsep);
                self.write(")");
            }
            Tree::Assign { lhs, rhs } => {
                self.write("(");
                self.expr(lhs);
                self.write(" = ");
                self.expr(rhs);
                self.write(")");
            }
            Tree::Function { params, body } => {
                self.write("(function");
                self.param_list(params);
                self.write(" ");
                self.function_body(body);
                self.write(")");
            }
            Tree::Arrow { params, body } => {
                self.write("(");
                self.param_list(params);
                self.write(" => ");
                self.function_body(body);
                self.write(")");
            }
            Tree::Class { .. } => {
                self.write("(");
                self.class_construct(tree);
                self.write(")");
            }
            Tree::ObjectConstr(props) => self.object_constr(props),
            Tree::ArrayConstr(elems) => {
                self.write("[");
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.expr(elem);
                }
                self.write("]");
            }
            // Statement nodes never reach expression position: the desugarer
            // rejects them with InvalidInput first.
            stmt => {
                debug_assert!(false, "statement in expression position: {stmt:?}");
                self.stat(stmt);
            }
        }
    }

    /// Member-access qualifiers: numeric literals need parens before `.`.
    fn qualifier(&mut self, tree: &Tree) {
        match tree {
            Tree::Int(_) | Tree::Double(_) => {
                self.write("(");
                self.expr(tree);
                self.write(")");
            }
            other => self.expr(other),
        }
    }

    fn class_construct(&mut self, tree: &Tree) {
        let Tree::Class {
            name,
            parent,
            members,
        } = tree
        else {
            return;
        };
        self.write("class");
        if let Some(name) = name {
            self.write(" ");
            self.write(name);
        }
        if let Some(parent) = parent {
            self.write(" extends ");
            self.expr(parent);
        }
        self.write(" {\n");
        self.indent_level += 1;
        for member in members {
            self.class_member(member);
        }
        self.indent_level -= 1;
        self.write_indent();
        self.write("}");
    }

    fn class_member(&mut self, member: &Tree) {
        match member {
            Tree::Skip => {}
            Tree::MethodDef {
                is_static,
                name,
                params,
                body,
            } => {
                self.write_indent();
                if *is_static {
                    self.write("static ");
                }
                self.property_name(name);
                self.param_list(params);
                self.write(" ");
                self.function_body(body);
                self.write("\n");
            }
            Tree::GetterDef {
                is_static,
                name,
                body,
            } => {
                self.write_indent();
                if *is_static {
                    self.write("static ");
                }
                self.write("get ");
                self.property_name(name);
                self.write("() ");
                self.function_body(body);
                self.write("\n");
            }
            Tree::SetterDef {
                is_static,
                name,
                param,
                body,
            } => {
                self.write_indent();
                if *is_static {
                    self.write("static ");
                }
                self.write("set ");
                self.property_name(name);
                self.write("(");
                self.write(param);
                self.write(") ");
                self.function_body(body);
                self.write("\n");
            }
            other => self.stat_line(other),
        }
    }

    fn object_constr(&mut self, props: &[(PropertyName, Tree)]) {
        if props.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{\n");
        self.indent_level += 1;
        for (i, (name, value)) in props.iter().enumerate() {
            self.write_indent();
            self.property_name(name);
            self.write(": ");
            self.expr(value);
            if i + 1 < props.len() {
                self.write(",");
            }
            self.write("\n");
        }
        self.indent_level -= 1;
        self.write_indent();
        self.write("}");
    }

    fn property_name(&mut self, name: &PropertyName) {
        match name {
            PropertyName::Ident(name) => self.write(name),
            PropertyName::Str(name) => self.string_literal(name),
        }
    }

    fn param_list(&mut self, params: &[String]) {
        self.write("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(param);
        }
        self.write(")");
    }

    fn arg_list(&mut self, args: &[Tree]) {
        self.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(arg);
        }
        self.write(")");
    }

    fn function_body(&mut self, body: &[Tree]) {
        self.write("{\n");
        self.indent_level += 1;
        for stat in body {
            self.stat_line(stat);
        }
        self.indent_level -= 1;
        self.write_indent();
        self.write("}");
    }

    fn string_literal(&mut self, value: &str) {
        self.out.push('"');
        for ch in value.chars() {
            match ch {
                '\\' => self.out.push_str("\\\\"),
                '"' => self.out.push_str("\\\""),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    self.out.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "Infinity".to_string()
        } else {
            "(-Infinity)".to_string()
        }
    } else if value < 0.0 {
        format!("({})", format_finite(value))
    } else {
        format_finite(value)
    }
}

fn format_finite(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e21 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Prints one top-level statement to a string.
pub fn print_tree(tree: &Tree, mode: OutputMode) -> String {
    let mut printer = Printer::new(mode);
    printer.print_stat(tree);
    printer.into_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::Tree;

    fn print(tree: &Tree) -> String {
        print_tree(tree, OutputMode::ES5Isolated)
    }

    #[test]
    fn assignment_of_function() {
        let tree = Tree::assign(
            Tree::dot(Tree::dot(Tree::ident("ScalaJS"), "c"), "Foo"),
            Tree::function(vec![], vec![]),
        );
        assert_eq!(print(&tree), "ScalaJS.c.Foo = (function() {\n});\n");
    }

    #[test]
    fn new_and_member_chain() {
        let tree = Tree::apply(
            Tree::dot(
                Tree::new_call(Tree::dot(Tree::ident("ScalaJS"), "TypeData"), vec![]),
                "initClass",
            ),
            vec![Tree::str("Foo"), Tree::Bool(false)],
        );
        assert_eq!(
            print(&tree),
            "new ScalaJS.TypeData().initClass(\"Foo\", false);\n"
        );
    }

    #[test]
    fn binary_ops_are_parenthesized() {
        let tree = Tree::binary(
            "|",
            Tree::binary("+", Tree::ident("a"), Tree::ident("b")),
            Tree::Int(0),
        );
        let mut printer = Printer::new(OutputMode::ES5Global);
        printer.print_stat(&tree);
        assert_eq!(printer.into_output(), "((a + b) | 0);\n");
    }

    #[test]
    fn if_else_chain() {
        let tree = Tree::if_stmt(
            Tree::ident("a"),
            Tree::ret(None),
            Some(Tree::if_stmt(
                Tree::ident("b"),
                Tree::Throw(Box::new(Tree::ident("e"))),
                None,
            )),
        );
        let printed = print(&tree);
        assert!(printed.contains("if (a) {"));
        assert!(printed.contains("} else if (b) {"));
    }

    #[test]
    fn let_in_es6() {
        let tree = Tree::var_def("x", Some(Tree::Int(1)));
        assert_eq!(print_tree(&tree, OutputMode::ES6), "let x = 1;\n");
        assert_eq!(print_tree(&tree, OutputMode::ES5Global), "var x = 1;\n");
    }

    #[test]
    fn class_with_members() {
        let tree = Tree::Class {
            name: Some("$c_Foo".to_string()),
            parent: Some(Box::new(Tree::ident("$c_O"))),
            members: vec![
                Tree::MethodDef {
                    is_static: false,
                    name: PropertyName::ident("constructor"),
                    params: vec![],
                    body: vec![Tree::apply(Tree::Super, vec![])],
                },
                Tree::GetterDef {
                    is_static: false,
                    name: PropertyName::str("$typeTag"),
                    body: vec![Tree::ret(Some(Tree::Int(11)))],
                },
            ],
        };
        let printed = print_tree(&tree, OutputMode::ES6StrongMode);
        assert!(printed.starts_with("class $c_Foo extends $c_O {\n"));
        assert!(printed.contains("  constructor() {\n"));
        assert!(printed.contains("  get \"$typeTag\"() {\n"));
    }

    #[test]
    fn string_escapes() {
        let tree = Tree::str("a\"b\\c\nd");
        assert_eq!(print(&tree), "\"a\\\"b\\\\c\\nd\";\n");
    }

    #[test]
    fn doubles_keep_a_decimal_point() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(-2.5), "(-2.5)");
        assert_eq!(format_double(0.5), "0.5");
    }
}
