//! JavaScript trees produced by the emitter.
//!
//! The per-class generators and the desugarer build these trees; the printer
//! walks them and emits JavaScript text. Keeping emission tree-shaped means
//! the caches store structured values and the printer applies formatting in
//! one place.

pub mod printer;

/// A member name in an object literal, class construct, or
/// `Object.defineProperty` call.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyName {
    Ident(String),
    Str(String),
}

impl PropertyName {
    pub fn ident(name: impl Into<String>) -> Self {
        PropertyName::Ident(name.into())
    }

    pub fn str(name: impl Into<String>) -> Self {
        PropertyName::Str(name.into())
    }
}

/// A JavaScript tree node: expression, statement, or class member.
///
/// The printer decides between statement and expression form from position,
/// so `If` doubles as the statement form while `Conditional` is the ternary.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    /// Emits nothing in statement position.
    Skip,
    /// `/** text */` on its own line.
    DocComment(String),
    Block(Vec<Tree>),
    If {
        cond: Box<Tree>,
        thenp: Box<Tree>,
        elsep: Box<Tree>,
    },
    Conditional {
        cond: Box<Tree>,
        thenp: Box<Tree>,
        elsep: Box<Tree>,
    },
    While {
        cond: Box<Tree>,
        body: Box<Tree>,
    },
    Return(Option<Box<Tree>>),
    Throw(Box<Tree>),
    /// `var x` / `let x`, keyword chosen by the printer from the dialect.
    VarDef {
        name: String,
        rhs: Option<Box<Tree>>,
    },
    Assign {
        lhs: Box<Tree>,
        rhs: Box<Tree>,
    },
    BinaryOp {
        op: &'static str,
        lhs: Box<Tree>,
        rhs: Box<Tree>,
    },
    UnaryOp {
        op: &'static str,
        operand: Box<Tree>,
    },
    Ident(String),
    This,
    Super,
    DotSelect {
        qualifier: Box<Tree>,
        item: String,
    },
    BracketSelect {
        qualifier: Box<Tree>,
        item: Box<Tree>,
    },
    Apply {
        fun: Box<Tree>,
        args: Vec<Tree>,
    },
    New {
        ctor: Box<Tree>,
        args: Vec<Tree>,
    },
    /// Anonymous function expression.
    Function {
        params: Vec<String>,
        body: Vec<Tree>,
    },
    /// Named function declaration.
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Tree>,
    },
    Arrow {
        params: Vec<String>,
        body: Vec<Tree>,
    },
    /// `class name extends parent { members }`; anonymous when `name` is
    /// `None` (expression position).
    Class {
        name: Option<String>,
        parent: Option<Box<Tree>>,
        members: Vec<Tree>,
    },
    MethodDef {
        is_static: bool,
        name: PropertyName,
        params: Vec<String>,
        body: Vec<Tree>,
    },
    GetterDef {
        is_static: bool,
        name: PropertyName,
        body: Vec<Tree>,
    },
    SetterDef {
        is_static: bool,
        name: PropertyName,
        param: String,
        body: Vec<Tree>,
    },
    ObjectConstr(Vec<(PropertyName, Tree)>),
    ArrayConstr(Vec<Tree>),
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(String),
}

impl Tree {
    pub fn ident(name: impl Into<String>) -> Tree {
        Tree::Ident(name.into())
    }

    pub fn str(value: impl Into<String>) -> Tree {
        Tree::Str(value.into())
    }

    pub fn dot(qualifier: Tree, item: impl Into<String>) -> Tree {
        Tree::DotSelect {
            qualifier: Box::new(qualifier),
            item: item.into(),
        }
    }

    pub fn bracket(qualifier: Tree, item: Tree) -> Tree {
        Tree::BracketSelect {
            qualifier: Box::new(qualifier),
            item: Box::new(item),
        }
    }

    pub fn apply(fun: Tree, args: Vec<Tree>) -> Tree {
        Tree::Apply {
            fun: Box::new(fun),
            args,
        }
    }

    pub fn new_call(ctor: Tree, args: Vec<Tree>) -> Tree {
        Tree::New {
            ctor: Box::new(ctor),
            args,
        }
    }

    pub fn assign(lhs: Tree, rhs: Tree) -> Tree {
        Tree::Assign {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn binary(op: &'static str, lhs: Tree, rhs: Tree) -> Tree {
        Tree::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: &'static str, operand: Tree) -> Tree {
        Tree::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// `!!operand`
    pub fn to_boolean(operand: Tree) -> Tree {
        Tree::unary("!", Tree::unary("!", operand))
    }

    pub fn ret(expr: Option<Tree>) -> Tree {
        Tree::Return(expr.map(Box::new))
    }

    pub fn function(params: Vec<String>, body: Vec<Tree>) -> Tree {
        Tree::Function { params, body }
    }

    pub fn var_def(name: impl Into<String>, rhs: Option<Tree>) -> Tree {
        Tree::VarDef {
            name: name.into(),
            rhs: rhs.map(Box::new),
        }
    }

    pub fn if_stmt(cond: Tree, thenp: Tree, elsep: Option<Tree>) -> Tree {
        Tree::If {
            cond: Box::new(cond),
            thenp: Box::new(thenp),
            elsep: Box::new(elsep.unwrap_or(Tree::Skip)),
        }
    }

    pub fn conditional(cond: Tree, thenp: Tree, elsep: Tree) -> Tree {
        Tree::Conditional {
            cond: Box::new(cond),
            thenp: Box::new(thenp),
            elsep: Box::new(elsep),
        }
    }

    /// Folds a non-empty list into a `||` chain.
    pub fn or_chain(mut terms: Vec<Tree>) -> Tree {
        let first = if terms.is_empty() {
            Tree::Bool(false)
        } else {
            terms.remove(0)
        };
        terms
            .into_iter()
            .fold(first, |acc, term| Tree::binary("||", acc, term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_chain_folds_left() {
        let chain = Tree::or_chain(vec![Tree::Bool(true), Tree::Bool(false), Tree::Null]);
        let Tree::BinaryOp { op: "||", lhs, .. } = &chain else {
            panic!("expected || at the top");
        };
        assert!(matches!(**lhs, Tree::BinaryOp { op: "||", .. }));
    }

    #[test]
    fn or_chain_of_one_is_the_term() {
        assert_eq!(Tree::or_chain(vec![Tree::Bool(true)]), Tree::Bool(true));
    }
}
