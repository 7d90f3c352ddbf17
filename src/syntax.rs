//! The S-expression reader.
//!
//! This module turns source text into [`Form`] trees and nothing more: it
//! knows the shape of the language (parentheses, whitespace-separated
//! tokens, single-quoted timestamps) and how bare tokens classify into
//! literals and identifiers, but it has no idea what a function or a
//! variable is. The parser proper lowers these forms into the node pools.
//!
//! Token classification follows the literal grammar: `true`/`false` are
//! booleans, a token over `[+-0-9.eE]` containing at least one digit is a
//! number (a double when `.`/`e`/`E` appears, an integer otherwise), a
//! single-quoted token is a timestamp, and everything else is a symbol.
//! Requiring a digit keeps tokens like `e` or `+` usable as identifiers.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    error::ErrorKind,
    multi::separated_list0,
    sequence::delimited,
};

use crate::{Error, MAX_PARSE_DEPTH, timestamp};

/// One parsed form: a literal, an identifier, or a parenthesised list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Form {
    Bool(bool),
    Int(i32),
    Double(f64),
    Time(u64),
    Symbol(String),
    List(Vec<Form>),
}

/// Raw structural element, before token classification.
#[derive(Debug)]
enum Sexp {
    Token(String),
    Quoted(String),
    List(Vec<Sexp>),
}

fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != '\''
}

fn parse_token(input: &str) -> IResult<&str, Sexp> {
    let (input, tok) = take_while1(is_token_char).parse(input)?;
    Ok((input, Sexp::Token(tok.to_owned())))
}

fn parse_quoted(input: &str) -> IResult<&str, Sexp> {
    let (input, text) =
        delimited(char('\''), take_while(|c| c != '\''), char('\'')).parse(input)?;
    Ok((input, Sexp::Quoted(text.to_owned())))
}

fn parse_list(input: &str, depth: usize) -> IResult<&str, Sexp> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }
    let (input, _) = char('(').parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, items) =
        separated_list0(multispace1, |i| parse_item(i, depth + 1)).parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char(')').parse(input)?;
    Ok((input, Sexp::List(items)))
}

fn parse_item(input: &str, depth: usize) -> IResult<&str, Sexp> {
    alt((|i| parse_list(i, depth), parse_quoted, parse_token)).parse(input)
}

/// Convert a nom failure into a readable message with source context.
fn syntax_message(input: &str, err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::TooLarge => {
                    format!("expression nested deeper than {MAX_PARSE_DEPTH} levels")
                }
                _ if position < input.len() => {
                    let near: String = input
                        .get(position..)
                        .unwrap_or("")
                        .chars()
                        .take(12)
                        .collect();
                    format!("invalid syntax near '{near}'")
                }
                _ => "unexpected end of input".to_owned(),
            }
        }
        nom::Err::Incomplete(_) => "incomplete input".to_owned(),
    }
}

/// Classify a bare token into a literal or a symbol.
pub(crate) fn classify_token(token: &str) -> Result<Form, Error> {
    if token == "true" {
        return Ok(Form::Bool(true));
    }
    if token == "false" {
        return Ok(Form::Bool(false));
    }
    let numeric = !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && token.bytes().any(|b| b.is_ascii_digit());
    if numeric {
        if token.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
            token
                .parse::<f64>()
                .map(Form::Double)
                .map_err(|_| Error::Syntax(format!("unable to parse double value '{token}'")))
        } else {
            token
                .parse::<i32>()
                .map(Form::Int)
                .map_err(|_| Error::Syntax(format!("unable to parse int value '{token}'")))
        }
    } else {
        Ok(Form::Symbol(token.to_owned()))
    }
}

fn lower(sexp: &Sexp) -> Result<Form, Error> {
    match sexp {
        Sexp::Token(tok) => classify_token(tok),
        Sexp::Quoted(text) => timestamp::parse_timestamp(text).map(Form::Time),
        Sexp::List(items) => Ok(Form::List(
            items.iter().map(lower).collect::<Result<Vec<_>, _>>()?,
        )),
    }
}

/// Read every top-level form out of `src`.
///
/// Scanning starts at the first `(` (anything before it is ignored) and
/// stops after the last complete form; leftover text beyond that point is
/// ignored as well. Returns at least one form on success.
pub(crate) fn read_program(src: &str) -> Result<Vec<Form>, Error> {
    let Some(start) = src.find('(') else {
        return Err(Error::Syntax("no '(' to start an expression".to_owned()));
    };
    let mut rest = &src[start..];
    let mut forms = Vec::new();
    while rest.trim_start().starts_with('(') {
        let input = rest.trim_start();
        match parse_list(input, 0) {
            Ok((remaining, sexp)) => {
                forms.push(lower(&sexp)?);
                rest = remaining;
            }
            Err(err) => return Err(Error::Syntax(syntax_message(input, err))),
        }
    }
    Ok(forms)
}
