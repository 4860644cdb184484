//! Abstract syntax tree
//!
//! ManiT programs are trees of statements and expressions, modeled as two
//! sum types. Every node keeps the token it originated from. Ownership is
//! strictly tree-shaped: a parent owns its children outright.
//!
//! [`Display`](fmt::Display) renders a node back to parseable source text,
//! with redundant parentheses around prefix, infix, assignment and index
//! expressions. [`Program::pretty_print`] draws the tree on stdout via
//! [ptree].

use std::borrow::Cow;
use std::fmt;
use std::io;

use ptree::{print_tree, Style, TreeItem};

use crate::parsing::Token;

/// The root of every ManiT program: a sequence of top-level statements.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// A name appearing in the source, e.g. a variable or a type annotation.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub token: Token,
    pub name: String,
}

/// One `name: type` entry of a struct definition.
#[derive(Debug, Clone)]
pub struct StructField {
    pub name: Identifier,
    pub ty: Identifier,
}

/// A braced sequence of statements.
#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub token: Token,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    /// `let x: i32 = expr;`
    Let {
        token: Token,
        name: Identifier,
        ty: Option<Identifier>,
        value: Expression,
    },

    /// `var x: i32 = expr;` — like `let`, but denoting mutability.
    Var {
        token: Token,
        name: Identifier,
        ty: Option<Identifier>,
        value: Expression,
    },

    /// `struct Point { x: i32, y: i32 };`
    StructDefinition {
        token: Token,
        name: Identifier,
        fields: Vec<StructField>,
    },

    /// `return expr;` or `return;`
    Return {
        token: Token,
        value: Option<Expression>,
    },

    /// An expression in statement position.
    Expression { token: Token, expression: Expression },

    Block(BlockStatement),
}

#[derive(Debug, Clone)]
pub enum Expression {
    Identifier(Identifier),

    IntegerLiteral {
        token: Token,
        value: i64,
    },

    BooleanLiteral {
        token: Token,
        value: bool,
    },

    /// `[e1, e2, ...]`
    ArrayLiteral {
        token: Token,
        elements: Vec<Expression>,
    },

    /// `-x` or `!x`
    Prefix {
        token: Token,
        operator: PrefixOperator,
        right: Box<Expression>,
    },

    /// `a + b`, `a < b`, ...
    Infix {
        token: Token,
        operator: InfixOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `x = expr` — the target must be an identifier.
    Assignment {
        token: Token,
        target: Identifier,
        value: Box<Expression>,
    },

    /// `array[index]`
    Index {
        token: Token,
        array: Box<Expression>,
        index: Box<Expression>,
    },

    /// `if (cond) { ... } else { ... }` — the `else` block is optional.
    If {
        token: Token,
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },

    /// `fn(a, b) { ... }`
    FunctionLiteral {
        token: Token,
        parameters: Vec<Identifier>,
        body: BlockStatement,
    },

    /// `callee(a1, a2)`
    Call {
        token: Token,
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// `while (cond) { ... }`
    While {
        token: Token,
        condition: Box<Expression>,
        body: BlockStatement,
    },

    /// `for (init; cond; inc) { ... }` — every head clause is optional.
    ForLoop {
        token: Token,
        initializer: Option<Box<Statement>>,
        condition: Option<Box<Expression>>,
        increment: Option<Box<Expression>>,
        body: BlockStatement,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOperator::Neg => write!(f, "-"),
            PrefixOperator::Not => write!(f, "!"),
        }
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfixOperator::Add => write!(f, "+"),
            InfixOperator::Sub => write!(f, "-"),
            InfixOperator::Mul => write!(f, "*"),
            InfixOperator::Div => write!(f, "/"),
            InfixOperator::Eq => write!(f, "=="),
            InfixOperator::NotEq => write!(f, "!="),
            InfixOperator::Lt => write!(f, "<"),
            InfixOperator::LtEq => write!(f, "<="),
            InfixOperator::Gt => write!(f, ">"),
            InfixOperator::GtEq => write!(f, ">="),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for stmt in &self.statements {
            write!(f, "{stmt} ")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let {
                name, ty, value, ..
            } => match ty {
                Some(ty) => write!(f, "let {name}: {ty} = {value};"),
                None => write!(f, "let {name} = {value};"),
            },
            Statement::Var {
                name, ty, value, ..
            } => match ty {
                Some(ty) => write!(f, "var {name}: {ty} = {value};"),
                None => write!(f, "var {name} = {value};"),
            },
            Statement::StructDefinition { name, fields, .. } => {
                write!(f, "struct {name} {{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                write!(f, " }};")
            }
            Statement::Return { value, .. } => match value {
                Some(value) => write!(f, "return {value};"),
                None => write!(f, "return;"),
            },
            Statement::Expression { expression, .. } => write!(f, "{expression};"),
            Statement::Block(block) => write!(f, "{block}"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(ident) => write!(f, "{ident}"),
            Expression::IntegerLiteral { value, .. } => write!(f, "{value}"),
            Expression::BooleanLiteral { value, .. } => write!(f, "{value}"),
            Expression::ArrayLiteral { elements, .. } => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Expression::Prefix {
                operator, right, ..
            } => write!(f, "({operator}{right})"),
            Expression::Infix {
                operator,
                left,
                right,
                ..
            } => write!(f, "({left} {operator} {right})"),
            Expression::Assignment { target, value, .. } => write!(f, "({target} = {value})"),
            Expression::Index { array, index, .. } => write!(f, "({array}[{index}])"),
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if ({condition}) {consequence}")?;
                if let Some(alternative) = alternative {
                    write!(f, " else {alternative}")?;
                }
                Ok(())
            }
            Expression::FunctionLiteral {
                parameters, body, ..
            } => {
                write!(f, "fn(")?;
                for (i, param) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {body}")
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                write!(f, "{callee}(")?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expression::While {
                condition, body, ..
            } => write!(f, "while ({condition}) {body}"),
            Expression::ForLoop {
                initializer,
                condition,
                increment,
                body,
                ..
            } => {
                write!(f, "for (")?;
                match initializer {
                    Some(init) => write!(f, "{init}")?,
                    None => write!(f, ";")?,
                }
                match condition {
                    Some(cond) => write!(f, " {cond};")?,
                    None => write!(f, " ;")?,
                }
                if let Some(inc) = increment {
                    write!(f, " {inc}")?;
                }
                write!(f, ") {body}")
            }
        }
    }
}

impl Program {
    /// Draw each top-level statement as a tree on stdout.
    pub fn pretty_print(&self) -> io::Result<()> {
        for stmt in &self.statements {
            print_tree(&Node::Statement(stmt.clone()))?;
        }
        Ok(())
    }
}

/// Either AST category, so [ptree] can walk the whole tree through one
/// [TreeItem] implementation.
#[derive(Debug, Clone)]
pub enum Node {
    Statement(Statement),
    Expression(Expression),
}

impl TreeItem for Node {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, style: &Style) -> io::Result<()> {
        let label = match self {
            Node::Statement(stmt) => match stmt {
                Statement::Let { name, .. } => format!("LET {name}"),
                Statement::Var { name, .. } => format!("VAR {name}"),
                Statement::StructDefinition { name, fields, .. } => {
                    let fields: Vec<String> = fields
                        .iter()
                        .map(|field| format!("{}: {}", field.name, field.ty))
                        .collect();
                    format!("STRUCT {name} {{ {} }}", fields.join(", "))
                }
                Statement::Return { .. } => String::from("RETURN"),
                Statement::Expression { .. } => String::from("EXPR"),
                Statement::Block(_) => String::from("BLOCK"),
            },
            Node::Expression(expr) => match expr {
                Expression::Identifier(ident) => ident.name.clone(),
                Expression::IntegerLiteral { value, .. } => value.to_string(),
                Expression::BooleanLiteral { value, .. } => value.to_string(),
                Expression::ArrayLiteral { .. } => String::from("ARRAY"),
                Expression::Prefix { operator, .. } => operator.to_string(),
                Expression::Infix { operator, .. } => operator.to_string(),
                Expression::Assignment { target, .. } => format!("ASSIGN {target}"),
                Expression::Index { .. } => String::from("INDEX"),
                Expression::If { .. } => String::from("IF"),
                Expression::FunctionLiteral { parameters, .. } => {
                    let params: Vec<&str> =
                        parameters.iter().map(|param| param.name.as_str()).collect();
                    format!("FN({})", params.join(", "))
                }
                Expression::Call { .. } => String::from("CALL"),
                Expression::While { .. } => String::from("WHILE"),
                Expression::ForLoop { .. } => String::from("FOR"),
            },
        };
        write!(f, "{}", style.paint(label))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        let children = match self {
            Node::Statement(stmt) => match stmt {
                Statement::Let { value, .. } | Statement::Var { value, .. } => {
                    vec![Node::Expression(value.clone())]
                }
                Statement::StructDefinition { .. } => vec![],
                Statement::Return { value, .. } => match value {
                    Some(value) => vec![Node::Expression(value.clone())],
                    None => vec![],
                },
                Statement::Expression { expression, .. } => {
                    vec![Node::Expression(expression.clone())]
                }
                Statement::Block(block) => block
                    .statements
                    .iter()
                    .cloned()
                    .map(Node::Statement)
                    .collect(),
            },
            Node::Expression(expr) => match expr {
                Expression::Identifier(_)
                | Expression::IntegerLiteral { .. }
                | Expression::BooleanLiteral { .. } => vec![],
                Expression::ArrayLiteral { elements, .. } => {
                    elements.iter().cloned().map(Node::Expression).collect()
                }
                Expression::Prefix { right, .. } => vec![Node::Expression(right.as_ref().clone())],
                Expression::Infix { left, right, .. } => vec![
                    Node::Expression(left.as_ref().clone()),
                    Node::Expression(right.as_ref().clone()),
                ],
                Expression::Assignment { value, .. } => {
                    vec![Node::Expression(value.as_ref().clone())]
                }
                Expression::Index { array, index, .. } => vec![
                    Node::Expression(array.as_ref().clone()),
                    Node::Expression(index.as_ref().clone()),
                ],
                Expression::If {
                    condition,
                    consequence,
                    alternative,
                    ..
                } => {
                    let mut children = vec![
                        Node::Expression(condition.as_ref().clone()),
                        Node::Statement(Statement::Block(consequence.clone())),
                    ];
                    if let Some(alternative) = alternative {
                        children.push(Node::Statement(Statement::Block(alternative.clone())));
                    }
                    children
                }
                Expression::FunctionLiteral { body, .. } => {
                    vec![Node::Statement(Statement::Block(body.clone()))]
                }
                Expression::Call {
                    callee, arguments, ..
                } => {
                    let mut children = vec![Node::Expression(callee.as_ref().clone())];
                    children.extend(arguments.iter().cloned().map(Node::Expression));
                    children
                }
                Expression::While {
                    condition, body, ..
                } => vec![
                    Node::Expression(condition.as_ref().clone()),
                    Node::Statement(Statement::Block(body.clone())),
                ],
                Expression::ForLoop {
                    initializer,
                    condition,
                    increment,
                    body,
                    ..
                } => {
                    let mut children = Vec::new();
                    if let Some(init) = initializer {
                        children.push(Node::Statement(init.as_ref().clone()));
                    }
                    if let Some(cond) = condition {
                        children.push(Node::Expression(cond.as_ref().clone()));
                    }
                    if let Some(inc) = increment {
                        children.push(Node::Expression(inc.as_ref().clone()));
                    }
                    children.push(Node::Statement(Statement::Block(body.clone())));
                    children
                }
            },
        };
        Cow::from(children)
    }
}

#[cfg(test)]
mod tests {
    use crate::parsing::{Token, TokenKind};

    use super::*;

    #[test]
    fn statements_print_as_source() {
        let stmt = Statement::Let {
            token: Token::new(TokenKind::Let, "let"),
            name: Identifier {
                token: Token::new(TokenKind::Ident, "x"),
                name: String::from("x"),
            },
            ty: Some(Identifier {
                token: Token::new(TokenKind::Ident, "i32"),
                name: String::from("i32"),
            }),
            value: Expression::Infix {
                token: Token::new(TokenKind::Plus, "+"),
                operator: InfixOperator::Add,
                left: Box::new(Expression::IntegerLiteral {
                    token: Token::new(TokenKind::Int, "1"),
                    value: 1,
                }),
                right: Box::new(Expression::IntegerLiteral {
                    token: Token::new(TokenKind::Int, "2"),
                    value: 2,
                }),
            },
        };

        assert_eq!(stmt.to_string(), "let x: i32 = (1 + 2);");
    }

    #[test]
    fn empty_for_head_prints_bare_semicolons() {
        let expr = Expression::ForLoop {
            token: Token::new(TokenKind::For, "for"),
            initializer: None,
            condition: None,
            increment: None,
            body: BlockStatement {
                token: Token::new(TokenKind::LBrace, "{"),
                statements: vec![],
            },
        };

        assert_eq!(expr.to_string(), "for (; ;) { }");
    }
}
