// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Abstract syntax tree for the query language

use std::fmt;
use std::sync::Arc;

/// A parsed query: one or more statements evaluated in order
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub statements: Vec<Statement>,
}

/// Top-level statement types
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let(LetStatement),
    Select(Arc<SelectStatement>),
}

/// LET name = SELECT ... | LET name = expression
#[derive(Debug, Clone, PartialEq)]
pub struct LetStatement {
    pub name: String,
    pub value: LetValue,
}

/// Right-hand side of a LET statement
#[derive(Debug, Clone, PartialEq)]
pub enum LetValue {
    /// Stored query, evaluated each time the name is used as a row source
    Query(Arc<SelectStatement>),
    /// Expression, evaluated each time the name is resolved
    Expression(Expression),
}

/// SELECT items FROM source [WHERE condition] [LIMIT count]
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub items: Vec<SelectItem>,
    pub source: Source,
    pub where_clause: Option<Expression>,
    pub limit: Option<usize>,
}

/// Item in the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`: every member of the source row
    Wildcard,
    Expression {
        expression: Expression,
        alias: Option<String>,
    },
}

impl SelectItem {
    /// Output column name for an explicit item
    pub fn column_name(&self) -> Option<String> {
        match self {
            SelectItem::Wildcard => None,
            SelectItem::Expression {
                alias: Some(alias), ..
            } => Some(alias.clone()),
            SelectItem::Expression { expression, .. } => Some(expression.to_string()),
        }
    }
}

/// Row source of a SELECT
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// name(arg=value, ...)
    Plugin { name: String, args: Vec<Argument> },
    /// LET-bound query or scope variable
    Binding(String),
}

/// Named argument: name = expression
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Expression,
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    PropertyAccess {
        object: Box<Expression>,
        member: String,
    },
    FunctionCall {
        name: String,
        args: Vec<Argument>,
    },
    Binary {
        left: Box<Expression>,
        operator: Operator,
        right: Box<Expression>,
    },
    Unary {
        operator: Operator,
        expression: Box<Expression>,
    },
    List(Vec<Expression>),
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// Unary and binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Or,
    And,
    Not,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    RegexMatch,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

impl Operator {
    /// Binding strength of a binary operator; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Not => 3,
            Operator::Equal
            | Operator::NotEqual
            | Operator::LessThan
            | Operator::LessEqual
            | Operator::GreaterThan
            | Operator::GreaterEqual
            | Operator::RegexMatch => 4,
            Operator::Plus | Operator::Minus => 5,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 6,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Or => "OR",
            Operator::And => "AND",
            Operator::Not => "NOT",
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterEqual => ">=",
            Operator::RegexMatch => "=~",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

fn write_arguments(f: &mut fmt::Formatter<'_>, args: &[Argument]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}={}", arg.name, arg.value)?;
    }
    Ok(())
}

/// Parenthesize binary operands that bind looser than `min_precedence`
fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expression, min_precedence: u8) -> fmt::Result {
    match operand {
        Expression::Binary { operator, .. } if operator.precedence() < min_precedence => {
            write!(f, "({})", operand)
        }
        _ => write!(f, "{}", operand),
    }
}

/// Canonical rendering, used as the column name of unaliased SELECT items
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::PropertyAccess { object, member } => write!(f, "{}.{}", object, member),
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                write_arguments(f, args)?;
                write!(f, ")")
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                write_operand(f, left, operator.precedence())?;
                write!(f, " {} ", operator)?;
                write_operand(f, right, operator.precedence() + 1)
            }
            Expression::Unary {
                operator: Operator::Not,
                expression,
            } => write!(f, "NOT {}", expression),
            Expression::Unary {
                operator,
                expression,
            } => write!(f, "{}{}", operator, expression),
            Expression::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Plugin { name, args } => {
                write!(f, "{}(", name)?;
                write_arguments(f, args)?;
                write!(f, ")")
            }
            Source::Binding(name) => write!(f, "{}", name),
        }
    }
}
