//! nom grammar of the query language.
//!
//! ```text
//! query      := SELECT proj ("," proj)* [WHERE predicate] [GROUP BY ident ("," ident)*]
//! proj       := "*" | FUNC "(" (ident | "*") ")" | ident
//! predicate  := comparison ((AND | OR) comparison)*
//! comparison := ident op literal
//! op         := "=" | "!=" | "<>" | "<" | "<=" | ">" | ">="
//! literal    := number | "'" text "'" | '"' text '"'
//! ```
//!
//! Keywords and function names are case-insensitive.
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till, take_while},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    error::ParseError,
    multi::{many0, separated_list1},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

use super::{CmpOp, Comparison, Connector, Literal, Predicate, Projection, Query, QueryFunction};
use crate::tracklib_errors::TrackError;

fn ws<'a, F>(inner: F) -> impl Parser<&'a str, Output = F::Output, Error = F::Error>
where
    F: Parser<&'a str>,
    F::Error: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn aggregate(input: &str) -> IResult<&str, Projection> {
    map(
        (
            map_res(identifier, |name: &str| name.parse::<QueryFunction>()),
            ws(char('(')),
            alt((tag("*"), identifier)),
            ws(char(')')),
        ),
        |(func, _, feature, _)| Projection::Aggregate {
            func,
            feature: feature.to_string(),
        },
    )
    .parse(input)
}

fn projection(input: &str) -> IResult<&str, Projection> {
    alt((
        value(Projection::All, char('*')),
        aggregate,
        map(identifier, |s: &str| Projection::Feature(s.to_string())),
    ))
    .parse(input)
}

fn select_clause(input: &str) -> IResult<&str, Vec<Projection>> {
    preceded(
        ws(terminated(tag_no_case("SELECT"), multispace1)),
        separated_list1(ws(char(',')), ws(projection)),
    )
    .parse(input)
}

fn cmp_op(input: &str) -> IResult<&str, CmpOp> {
    alt((
        value(CmpOp::Ne, tag("!=")),
        value(CmpOp::Ne, tag("<>")),
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Eq, tag("=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    ))
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(delimited(char('\''), take_till(|c: char| c == '\''), char('\'')), |s: &str| {
            Literal::Quoted(s.to_string())
        }),
        map(delimited(char('"'), take_till(|c: char| c == '"'), char('"')), |s: &str| {
            Literal::Quoted(s.to_string())
        }),
        map(double, Literal::Number),
    ))
    .parse(input)
}

fn comparison(input: &str) -> IResult<&str, Comparison> {
    map((ws(identifier), ws(cmp_op), ws(literal)), |(feature, op, value)| Comparison {
        feature: feature.to_string(),
        op,
        value,
    })
    .parse(input)
}

fn connector(input: &str) -> IResult<&str, Connector> {
    ws(terminated(
        alt((
            value(Connector::And, tag_no_case("AND")),
            value(Connector::Or, tag_no_case("OR")),
        )),
        multispace1,
    ))
    .parse(input)
}

fn where_clause(input: &str) -> IResult<&str, Predicate> {
    preceded(
        ws(terminated(tag_no_case("WHERE"), multispace1)),
        map(pair(comparison, many0(pair(connector, comparison))), |(first, rest)| Predicate {
            first,
            rest,
        }),
    )
    .parse(input)
}

fn group_by_clause(input: &str) -> IResult<&str, Vec<String>> {
    preceded(
        ws((tag_no_case("GROUP"), multispace1, tag_no_case("BY"), multispace1)),
        separated_list1(ws(char(',')), map(ws(identifier), str::to_string)),
    )
    .parse(input)
}

/// Parse a full query.
///
/// Return
/// ----------
/// * The syntax tree, or [`TrackError::WrongArgument`] naming the unparsed rest.
///   A parenthesis after the projection list is rejected before any
///   predicate parsing.
pub fn parse_query(text: &str) -> Result<Query, TrackError> {
    let (rest, projections) =
        select_clause(text).map_err(|e| TrackError::wrong(format!("invalid SELECT clause in '{text}': {e}")))?;
    if rest.contains('(') || rest.contains(')') {
        return Err(TrackError::wrong(format!(
            "parenthesized predicates are not supported: '{}'",
            rest.trim()
        )));
    }
    let (_, (predicate, group_by)) = all_consuming(terminated(
        pair(opt(where_clause), opt(group_by_clause)),
        multispace0,
    ))
    .parse(rest)
    .map_err(|e| TrackError::wrong(format!("invalid query near '{}': {e}", rest.trim())))?;
    Ok(Query {
        projections,
        predicate,
        group_by: group_by.unwrap_or_default(),
    })
}
