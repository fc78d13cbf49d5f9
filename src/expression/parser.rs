//! Expression parser
//!
//! Grammar:
//! ```text
//! call      := ws name ws '(' [argument (ws ",," ws argument)*] ws ')' ws
//! argument  := call | metric-query | literal
//! ```
//! Arguments are split on `,,` at nesting depth zero. An argument with a
//! `(` after its first character is a nested call, one containing `:` is a
//! metric query, anything else is a literal parameter. Single quotes protect
//! their contents.

use crate::expression::{ExpressionTree, FunctionRegistry, Operand};
use crate::query::{QueryError, QueryResult};
use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, preceded},
    IResult,
};

/// A parsed expression and the metric queries its leaves refer to
#[derive(Debug, Clone)]
pub struct ParsedExpression {
    pub tree: ExpressionTree,
    /// Metric query strings, indexed by [`Operand::Metric`]
    pub metric_queries: Vec<String>,
}

/// Parse `input` into a call tree, resolving function names in `registry`
pub fn parse_expression(input: &str, registry: &FunctionRegistry) -> QueryResult<ParsedExpression> {
    let mut metric_queries = Vec::new();
    let tree = build(input, registry, &mut metric_queries)?;
    Ok(ParsedExpression {
        tree,
        metric_queries,
    })
}

fn build(
    input: &str,
    registry: &FunctionRegistry,
    metric_queries: &mut Vec<String>,
) -> QueryResult<ExpressionTree> {
    let (name, arguments) = parse_call_complete(input)?;
    let function = registry
        .get(name)
        .ok_or_else(|| QueryError::UnknownFunction(name.to_string()))?;

    let mut tree = ExpressionTree::new(name, function);
    for argument in arguments {
        let is_call = argument.find('(').map_or(false, |i| i > 0) && argument.contains(')');
        tree = if is_call {
            tree.operand(Operand::Expression(build(argument, registry, metric_queries)?))
        } else if argument.contains(':') {
            metric_queries.push(argument.to_string());
            tree.operand(Operand::Metric(metric_queries.len() - 1))
        } else {
            tree.param(argument)
        };
    }
    Ok(tree)
}

fn parse_call_complete(input: &str) -> QueryResult<(&str, Vec<&str>)> {
    match parse_call(input) {
        Ok((rest, call)) if rest.trim().is_empty() => Ok(call),
        Ok((rest, _)) => Err(QueryError::Parse(format!(
            "unexpected input after expression: '{}'",
            rest
        ))),
        Err(e) => Err(QueryError::Parse(format!(
            "invalid expression '{}': {}",
            input, e
        ))),
    }
}

fn parse_call(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    let (input, name) = delimited(multispace0, parse_function_name, multispace0)(input)?;
    let (input, arguments) = delimited(
        char('('),
        separated_list0(
            delimited(multispace0, tag(",,"), multispace0),
            preceded(multispace0, parse_argument),
        ),
        preceded(multispace0, char(')')),
    )(input)?;
    Ok((input, (name, arguments)))
}

fn parse_function_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Raw argument text up to a depth-zero `,,` or `)`
fn parse_argument(input: &str) -> IResult<&str, &str> {
    let mut depth = 0usize;
    let mut quoted = false;
    let mut end = input.len();

    for (i, c) in input.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            _ if quoted => {}
            '(' | '{' => depth += 1,
            ')' if depth == 0 => {
                end = i;
                break;
            }
            ')' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 && input[i..].starts_with(",,") => {
                end = i;
                break;
            }
            _ => {}
        }
    }

    let (argument, rest) = input.split_at(end);
    let argument = argument.trim();
    if argument.is_empty() {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::TakeWhile1)));
    }
    Ok((rest, argument))
}
