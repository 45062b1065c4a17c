//! Annotation filter expressions for the in-memory ledger
//!
//! Supports the subset of the ledger query language that Studio itself
//! produces and that the playground is typically used with:
//!
//! ```text
//! expr       := conjunction ( "||" conjunction )*
//! conjunction:= term ( "&&" term )*
//! term       := "(" expr ")" | tag op literal
//! op         := "=" | "!=" | "<" | "<=" | ">" | ">="
//! literal    := "\"" chars "\"" | unsigned integer
//! ```
//!
//! A string literal is compared against string annotations and an integer
//! literal against numeric annotations. A comparison on a tag the entity does
//! not carry is false.

use std::cmp::Ordering;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, recognize},
    multi::separated_list1,
    sequence::{delimited, pair, tuple},
    IResult,
};

use super::{NumericAnnotation, StringAnnotation};
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Num(u64),
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Compare {
        key: String,
        op: CompareOp,
        value: Literal,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        all_consuming(ws(expression))(input)
            .map(|(_, filter)| filter)
            .map_err(|e| LedgerError::Query {
                filter: input.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn matches(&self, strings: &[StringAnnotation], numbers: &[NumericAnnotation]) -> bool {
        match self {
            Filter::And(terms) => terms.iter().all(|t| t.matches(strings, numbers)),
            Filter::Or(terms) => terms.iter().any(|t| t.matches(strings, numbers)),
            Filter::Compare { key, op, value } => match value {
                Literal::Str(expected) => strings
                    .iter()
                    .find(|a| &a.key == key)
                    .map(|a| op.holds(a.value.as_str().cmp(expected.as_str())))
                    .unwrap_or(false),
                Literal::Num(expected) => numbers
                    .iter()
                    .find(|a| &a.key == key)
                    .map(|a| op.holds(a.value.cmp(expected)))
                    .unwrap_or(false),
            },
        }
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn operator(input: &str) -> IResult<&str, CompareOp> {
    alt((
        map(tag("<="), |_| CompareOp::Le),
        map(tag(">="), |_| CompareOp::Ge),
        map(tag("!="), |_| CompareOp::Ne),
        map(tag("="), |_| CompareOp::Eq),
        map(tag("<"), |_| CompareOp::Lt),
        map(tag(">"), |_| CompareOp::Gt),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, Literal> {
    map(
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        |s: &str| Literal::Str(s.to_string()),
    )(input)
}

fn number_literal(input: &str) -> IResult<&str, Literal> {
    map_res(digit1, |digits: &str| digits.parse::<u64>().map(Literal::Num))(input)
}

fn comparison(input: &str) -> IResult<&str, Filter> {
    map(
        tuple((
            ws(identifier),
            operator,
            ws(alt((string_literal, number_literal))),
        )),
        |(key, op, value)| Filter::Compare {
            key: key.to_string(),
            op,
            value,
        },
    )(input)
}

fn term(input: &str) -> IResult<&str, Filter> {
    alt((delimited(ws(char('(')), expression, ws(char(')'))), comparison))(input)
}

fn conjunction(input: &str) -> IResult<&str, Filter> {
    map(separated_list1(tag("&&"), term), |mut terms| {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Filter::And(terms)
        }
    })(input)
}

fn expression(input: &str) -> IResult<&str, Filter> {
    map(separated_list1(tag("||"), conjunction), |mut terms| {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Filter::Or(terms)
        }
    })(input)
}
