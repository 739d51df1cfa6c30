// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parser for the query language using nom parsers over the token stream

use nom::{
    branch::alt,
    combinator::{cut, map, opt},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use std::sync::Arc;

use super::ast::*;
use super::lexer::{tokenize, LexError, Token};

/// Parser error type; every variant carries a byte offset into the query
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Lexer error: {0}")]
    LexerError(#[from] LexError),
    #[error("Unexpected {token} at offset {position}")]
    UnexpectedToken { token: String, position: usize },
    #[error("Unexpected end of query at offset {position}")]
    UnexpectedEnd { position: usize },
    #[error("Expression nested too deeply at offset {position}")]
    TooDeeplyNested { position: usize },
    #[error("Empty query")]
    EmptyQuery,
}

impl ParseError {
    /// Byte offset into the query text
    pub fn position(&self) -> usize {
        match self {
            ParseError::LexerError(e) => e.position,
            ParseError::UnexpectedToken { position, .. } => *position,
            ParseError::UnexpectedEnd { position } => *position,
            ParseError::TooDeeplyNested { position } => *position,
            ParseError::EmptyQuery => 0,
        }
    }
}

/// Parse query text into statements
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    let stream = tokenize(input)?;
    if stream.is_empty() {
        return Err(ParseError::EmptyQuery);
    }

    let position_at = |rest: &[Token]| stream.position_of(stream.tokens.len() - rest.len());
    let error_at = |rest: &[Token]| {
        let position = position_at(rest);
        match rest.first() {
            None | Some(Token::EOF) => ParseError::UnexpectedEnd { position },
            Some(token) => ParseError::UnexpectedToken {
                token: token.to_string(),
                position,
            },
        }
    };

    let mut statements = Vec::new();
    let mut rest: &[Token] = &stream.tokens;
    loop {
        while let Some(Token::Semicolon) = rest.first() {
            rest = &rest[1..];
        }
        if matches!(rest.first(), None | Some(Token::EOF)) {
            break;
        }
        match statement(rest) {
            Ok((remaining, stmt)) => {
                statements.push(stmt);
                rest = remaining;
            }
            Err(nom::Err::Failure(e)) if e.code == nom::error::ErrorKind::TooLarge => {
                return Err(ParseError::TooDeeplyNested {
                    position: position_at(e.input),
                })
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(error_at(e.input)),
            Err(nom::Err::Incomplete(_)) => return Err(error_at(&[])),
        }
    }

    if statements.is_empty() {
        return Err(ParseError::EmptyQuery);
    }
    log::debug!("Parsed {} statement(s)", statements.len());
    Ok(Query { statements })
}

fn fail<T>(tokens: &[Token]) -> IResult<&[Token], T> {
    Err(nom::Err::Error(nom::error::Error::new(
        tokens,
        nom::error::ErrorKind::Tag,
    )))
}

/// Expect a specific token
fn expect_token(expected: Token) -> impl Fn(&[Token]) -> IResult<&[Token], Token> {
    move |tokens: &[Token]| match tokens.first() {
        Some(token) if std::mem::discriminant(token) == std::mem::discriminant(&expected) => {
            Ok((&tokens[1..], token.clone()))
        }
        _ => fail(tokens),
    }
}

/// Parse identifier
fn identifier(tokens: &[Token]) -> IResult<&[Token], String> {
    match tokens.first() {
        Some(Token::Identifier(name)) => Ok((&tokens[1..], name.clone())),
        _ => fail(tokens),
    }
}

/// Member name after a dot: identifier or array index
fn member_name(tokens: &[Token]) -> IResult<&[Token], String> {
    match tokens.first() {
        Some(Token::Identifier(name)) => Ok((&tokens[1..], name.clone())),
        Some(Token::Integer(index)) => Ok((&tokens[1..], index.to_string())),
        _ => fail(tokens),
    }
}

fn integer(tokens: &[Token]) -> IResult<&[Token], i64> {
    match tokens.first() {
        Some(Token::Integer(n)) => Ok((&tokens[1..], *n)),
        _ => fail(tokens),
    }
}

// ==============================================================================
// STATEMENTS
// ==============================================================================

fn statement(tokens: &[Token]) -> IResult<&[Token], Statement> {
    alt((
        map(let_statement, Statement::Let),
        map(select_statement, |select| Statement::Select(Arc::new(select))),
    ))(tokens)
}

fn let_statement(tokens: &[Token]) -> IResult<&[Token], LetStatement> {
    map(
        tuple((
            expect_token(Token::Let),
            identifier,
            expect_token(Token::Equal),
            alt((
                map(select_statement, |select| LetValue::Query(Arc::new(select))),
                map(expression, LetValue::Expression),
            )),
        )),
        |(_, name, _, value)| LetStatement { name, value },
    )(tokens)
}

fn select_statement(tokens: &[Token]) -> IResult<&[Token], SelectStatement> {
    map(
        tuple((
            expect_token(Token::Select),
            separated_list1(expect_token(Token::Comma), select_item),
            expect_token(Token::From),
            cut(source),
            opt(preceded(expect_token(Token::Where), cut(expression))),
            opt(preceded(expect_token(Token::Limit), cut(integer))),
        )),
        |(_, items, _, source, where_clause, limit)| SelectStatement {
            items,
            source,
            where_clause,
            limit: limit.map(|n| n as usize),
        },
    )(tokens)
}

fn select_item(tokens: &[Token]) -> IResult<&[Token], SelectItem> {
    alt((
        map(expect_token(Token::Star), |_| SelectItem::Wildcard),
        map(
            pair(
                expression,
                opt(preceded(expect_token(Token::As), cut(identifier))),
            ),
            |(expression, alias)| SelectItem::Expression { expression, alias },
        ),
    ))(tokens)
}

fn source(tokens: &[Token]) -> IResult<&[Token], Source> {
    alt((
        map(pair(identifier, argument_list), |(name, args)| {
            Source::Plugin { name, args }
        }),
        map(identifier, Source::Binding),
    ))(tokens)
}

fn argument_list(tokens: &[Token]) -> IResult<&[Token], Vec<Argument>> {
    nested_argument_list(tokens, 0)
}

fn nested_argument_list(tokens: &[Token], depth: usize) -> IResult<&[Token], Vec<Argument>> {
    delimited(
        expect_token(Token::LeftParen),
        separated_list0(expect_token(Token::Comma), move |t| argument(t, depth)),
        expect_token(Token::RightParen),
    )(tokens)
}

fn argument(tokens: &[Token], depth: usize) -> IResult<&[Token], Argument> {
    map(
        tuple((
            identifier,
            expect_token(Token::Equal),
            move |t| nested_expression(t, depth),
        )),
        |(name, _, value)| Argument { name, value },
    )(tokens)
}

// ==============================================================================
// EXPRESSIONS
// ==============================================================================

/// Deepest expression tree, and deepest parenthesis or prefix operator
/// nesting, the parser accepts
const MAX_EXPRESSION_DEPTH: usize = 64;

fn too_deep<T>(tokens: &[Token]) -> IResult<&[Token], T> {
    Err(nom::Err::Failure(nom::error::Error::new(
        tokens,
        nom::error::ErrorKind::TooLarge,
    )))
}

/// Height of an expression tree, walked without recursion
fn height(expression: &Expression) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(expression, 1)];
    while let Some((expression, level)) = pending.pop() {
        deepest = deepest.max(level);
        match expression {
            Expression::Literal(_) | Expression::Identifier(_) => {}
            Expression::PropertyAccess { object, .. } => pending.push((object.as_ref(), level + 1)),
            Expression::Unary { expression, .. } => pending.push((expression.as_ref(), level + 1)),
            Expression::Binary { left, right, .. } => {
                pending.push((left.as_ref(), level + 1));
                pending.push((right.as_ref(), level + 1));
            }
            Expression::FunctionCall { args, .. } => {
                pending.extend(args.iter().map(|arg| (&arg.value, level + 1)))
            }
            Expression::List(items) => pending.extend(items.iter().map(|item| (item, level + 1))),
        }
    }
    deepest
}

fn expression(tokens: &[Token]) -> IResult<&[Token], Expression> {
    nested_expression(tokens, 0)
}

fn nested_expression(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    let (rest, expression) = or_expression(tokens, depth)?;
    if height(&expression) > MAX_EXPRESSION_DEPTH {
        return too_deep(tokens);
    }
    Ok((rest, expression))
}

/// Fold a left-associative chain; long chains are rejected before any tree is built
fn fold_binary<'a>(
    start: &'a [Token],
    rest: &'a [Token],
    first: Expression,
    links: Vec<(Operator, Expression)>,
) -> IResult<&'a [Token], Expression> {
    if links.len() >= MAX_EXPRESSION_DEPTH {
        return too_deep(start);
    }
    let folded = links
        .into_iter()
        .fold(first, |left, (operator, right)| Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        });
    Ok((rest, folded))
}

fn or_expression(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    let (rest, (first, links)) = pair(
        move |t| and_expression(t, depth),
        many0(pair(
            map(expect_token(Token::Or), |_| Operator::Or),
            move |t| and_expression(t, depth),
        )),
    )(tokens)?;
    fold_binary(tokens, rest, first, links)
}

fn and_expression(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    let (rest, (first, links)) = pair(
        move |t| not_expression(t, depth),
        many0(pair(
            map(expect_token(Token::And), |_| Operator::And),
            move |t| not_expression(t, depth),
        )),
    )(tokens)?;
    fold_binary(tokens, rest, first, links)
}

fn not_expression(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    if depth > MAX_EXPRESSION_DEPTH {
        return too_deep(tokens);
    }
    alt((
        map(
            preceded(expect_token(Token::Not), move |t| not_expression(t, depth + 1)),
            |e| Expression::Unary {
                operator: Operator::Not,
                expression: Box::new(e),
            },
        ),
        move |t| comparison(t, depth),
    ))(tokens)
}

fn comparison_operator(tokens: &[Token]) -> IResult<&[Token], Operator> {
    let operator = match tokens.first() {
        Some(Token::Equal) => Operator::Equal,
        Some(Token::NotEqual) => Operator::NotEqual,
        Some(Token::LessThan) => Operator::LessThan,
        Some(Token::LessEqual) => Operator::LessEqual,
        Some(Token::GreaterThan) => Operator::GreaterThan,
        Some(Token::GreaterEqual) => Operator::GreaterEqual,
        Some(Token::Regex) => Operator::RegexMatch,
        _ => return fail(tokens),
    };
    Ok((&tokens[1..], operator))
}

fn comparison(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    let (rest, (left, right)) = pair(
        move |t| additive(t, depth),
        opt(pair(comparison_operator, move |t| additive(t, depth))),
    )(tokens)?;
    fold_binary(tokens, rest, left, right.into_iter().collect())
}

fn additive_operator(tokens: &[Token]) -> IResult<&[Token], Operator> {
    match tokens.first() {
        Some(Token::Plus) => Ok((&tokens[1..], Operator::Plus)),
        Some(Token::Minus) => Ok((&tokens[1..], Operator::Minus)),
        _ => fail(tokens),
    }
}

fn additive(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    let (rest, (first, links)) = pair(
        move |t| multiplicative(t, depth),
        many0(pair(additive_operator, move |t| multiplicative(t, depth))),
    )(tokens)?;
    fold_binary(tokens, rest, first, links)
}

fn multiplicative_operator(tokens: &[Token]) -> IResult<&[Token], Operator> {
    match tokens.first() {
        Some(Token::Star) => Ok((&tokens[1..], Operator::Multiply)),
        Some(Token::Slash) => Ok((&tokens[1..], Operator::Divide)),
        Some(Token::Percent) => Ok((&tokens[1..], Operator::Modulo)),
        _ => fail(tokens),
    }
}

fn multiplicative(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    let (rest, (first, links)) = pair(
        move |t| unary(t, depth),
        many0(pair(multiplicative_operator, move |t| unary(t, depth))),
    )(tokens)?;
    fold_binary(tokens, rest, first, links)
}

fn unary(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    if depth > MAX_EXPRESSION_DEPTH {
        return too_deep(tokens);
    }
    alt((
        map(
            preceded(expect_token(Token::Minus), move |t| unary(t, depth + 1)),
            |e| Expression::Unary {
                operator: Operator::Minus,
                expression: Box::new(e),
            },
        ),
        move |t| postfix(t, depth),
    ))(tokens)
}

fn postfix(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    let (rest, (object, members)) = pair(
        move |t| primary(t, depth),
        many0(preceded(expect_token(Token::Dot), member_name)),
    )(tokens)?;
    if members.len() >= MAX_EXPRESSION_DEPTH {
        return too_deep(tokens);
    }
    let access = members
        .into_iter()
        .fold(object, |object, member| Expression::PropertyAccess {
            object: Box::new(object),
            member,
        });
    Ok((rest, access))
}

fn literal(tokens: &[Token]) -> IResult<&[Token], Literal> {
    let literal = match tokens.first() {
        Some(Token::Integer(n)) => Literal::Integer(*n),
        Some(Token::Float(x)) => Literal::Float(*x),
        Some(Token::String(s)) => Literal::String(s.clone()),
        Some(Token::True) => Literal::Boolean(true),
        Some(Token::False) => Literal::Boolean(false),
        Some(Token::Null) => Literal::Null,
        _ => return fail(tokens),
    };
    Ok((&tokens[1..], literal))
}

fn primary(tokens: &[Token], depth: usize) -> IResult<&[Token], Expression> {
    alt((
        map(literal, Expression::Literal),
        map(
            pair(identifier, move |t| nested_argument_list(t, depth + 1)),
            |(name, args)| Expression::FunctionCall { name, args },
        ),
        map(identifier, Expression::Identifier),
        delimited(
            expect_token(Token::LeftParen),
            move |t| nested_expression(t, depth + 1),
            expect_token(Token::RightParen),
        ),
        map(
            delimited(
                expect_token(Token::LeftBracket),
                separated_list0(expect_token(Token::Comma), move |t| {
                    nested_expression(t, depth + 1)
                }),
                expect_token(Token::RightBracket),
            ),
            Expression::List,
        ),
    ))(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_select(query: &str) -> Arc<SelectStatement> {
        let parsed = parse_query(query).unwrap();
        assert_eq!(parsed.statements.len(), 1);
        match &parsed.statements[0] {
            Statement::Select(select) => select.clone(),
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_select_with_plugin_where_and_limit() {
        let select = single_select("SELECT _value AS n FROM range(start=1, end=10) WHERE _value > 2 LIMIT 3");
        assert_eq!(select.items.len(), 1);
        assert_eq!(select.items[0].column_name().as_deref(), Some("n"));
        match &select.source {
            Source::Plugin { name, args } => {
                assert_eq!(name, "range");
                assert_eq!(args.len(), 2);
                assert_eq!(args[1].name, "end");
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert!(select.where_clause.is_some());
        assert_eq!(select.limit, Some(3));
    }

    #[test]
    fn test_wildcard_and_binding_source() {
        let select = single_select("select * from rows");
        assert_eq!(select.items, vec![SelectItem::Wildcard]);
        assert_eq!(select.source, Source::Binding("rows".to_string()));
    }

    #[test]
    fn test_column_names_use_canonical_rendering() {
        let select = single_select("SELECT Foo, a.b, upper(string=Name), 1 + 2 * 3 FROM x");
        let names: Vec<String> = select
            .items
            .iter()
            .filter_map(SelectItem::column_name)
            .collect();
        assert_eq!(names, vec!["Foo", "a.b", "upper(string=Name)", "1 + 2 * 3"]);
    }

    #[test]
    fn test_operator_precedence() {
        let select = single_select("SELECT * FROM x WHERE NOT a = 1 OR b AND c");
        match select.where_clause.as_ref().unwrap() {
            Expression::Binary {
                operator: Operator::Or,
                left,
                right,
            } => {
                assert!(matches!(
                    left.as_ref(),
                    Expression::Unary {
                        operator: Operator::Not,
                        ..
                    }
                ));
                assert!(matches!(
                    right.as_ref(),
                    Expression::Binary {
                        operator: Operator::And,
                        ..
                    }
                ));
            }
            other => panic!("unexpected expression {:?}", other),
        }
    }

    #[test]
    fn test_let_statements() {
        let query = parse_query(
            "LET rows = SELECT * FROM range(end=3); LET limit_value = 2\nSELECT * FROM rows",
        )
        .unwrap();
        assert_eq!(query.statements.len(), 3);
        assert!(matches!(
            &query.statements[0],
            Statement::Let(LetStatement {
                value: LetValue::Query(_),
                ..
            })
        ));
        assert!(matches!(
            &query.statements[1],
            Statement::Let(LetStatement {
                value: LetValue::Expression(Expression::Literal(Literal::Integer(2))),
                ..
            })
        ));
    }

    #[test]
    fn test_list_and_unary_minus() {
        let select = single_select("SELECT [1, -2, 'x'] AS l FROM x");
        match &select.items[0] {
            SelectItem::Expression {
                expression: Expression::List(items),
                ..
            } => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[1].to_string(), "-2");
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(parse_query("   ").unwrap_err(), ParseError::EmptyQuery);
        assert_eq!(parse_query("/* c */ ;").unwrap_err().position(), 0);
    }

    #[test]
    fn test_unexpected_token_position() {
        let err = parse_query("SELECT * FROM x WHERE").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEnd { position: 21 }));

        let err = parse_query("SELECT FROM x").unwrap_err();
        assert_eq!(err.position(), 7);
        assert!(err.to_string().contains("FROM"));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let err = parse_query("SELECT * FROM x )").unwrap_err();
        assert_eq!(err.position(), 16);
    }

    #[test]
    fn test_lexer_error_is_reported_with_position() {
        let err = parse_query("SELECT \"open FROM x").unwrap_err();
        assert!(matches!(err, ParseError::LexerError(_)));
        assert_eq!(err.position(), 7);
    }

    fn nested(open: &str, close: &str, levels: usize) -> String {
        format!(
            "SELECT {}1{} AS x FROM range(end=1)",
            open.repeat(levels),
            close.repeat(levels)
        )
    }

    #[test]
    fn test_nesting_within_limit_parses() {
        assert!(parse_query(&nested("(", ")", 40)).is_ok());
        assert!(parse_query(&nested("NOT ", "", 40)).is_ok());
        assert!(parse_query(&nested("- ", "", 40)).is_ok());
        assert!(parse_query(&nested("[", "]", 40)).is_ok());
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let err = parse_query(&nested("(", ")", 200)).unwrap_err();
        // the first parenthesis past the limit
        assert_eq!(
            err,
            ParseError::TooDeeplyNested {
                position: 7 + MAX_EXPRESSION_DEPTH + 1
            }
        );

        let err = parse_query(&nested("len(list=", ")", 5_000)).unwrap_err();
        assert!(matches!(err, ParseError::TooDeeplyNested { .. }));
    }

    #[test]
    fn test_chained_prefix_operators_are_rejected() {
        for prefix in ["NOT ", "- ", "NOT (", "[", "-("] {
            let close = match prefix {
                "[" => "]",
                "NOT (" | "-(" => ")",
                _ => "",
            };
            let err = parse_query(&nested(prefix, close, 10_000)).unwrap_err();
            assert!(
                matches!(err, ParseError::TooDeeplyNested { .. }),
                "{:?} -> {:?}",
                prefix,
                err
            );
        }
    }

    #[test]
    fn test_long_operator_chains_are_rejected() {
        let short = format!("SELECT {}1 AS x FROM x", "1 + ".repeat(40));
        assert!(parse_query(&short).is_ok());

        let long = format!("SELECT {}1 AS x FROM x", "1 + ".repeat(100_000));
        assert!(matches!(
            parse_query(&long).unwrap_err(),
            ParseError::TooDeeplyNested { position: 7 }
        ));

        let members = format!("SELECT a{} FROM x", ".b".repeat(100_000));
        assert!(matches!(
            parse_query(&members).unwrap_err(),
            ParseError::TooDeeplyNested { .. }
        ));
    }

    #[test]
    fn test_tree_height_is_bounded_across_levels() {
        // each level stays short but the combined tree is too tall
        let query = format!(
            "SELECT {}1{} AS x FROM x",
            "(".repeat(30),
            " + 1 + 1 + 1)".repeat(30)
        );
        assert!(matches!(
            parse_query(&query).unwrap_err(),
            ParseError::TooDeeplyNested { .. }
        ));
    }
}
