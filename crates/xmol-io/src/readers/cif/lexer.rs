//! CIF/STAR tokenizer
//!
//! Streams tokens off the input with nom; plain values and quoted
//! strings borrow from the source text. Data names are normalized to
//! lower case with the mmCIF category dot folded to an underscore, so
//! `_atom_site.Cartn_x` and `_atom_site_cartn_x` compare equal
//! downstream.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending},
    combinator::value,
    multi::many0,
    sequence::preceded,
    IResult,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// `data_<name>` block header
    DataBlock(&'a str),
    /// `loop_` keyword
    Loop,
    /// Normalized data name including the leading underscore
    DataName(String),
    /// Unquoted or quoted value
    Value(&'a str),
    /// Semicolon-delimited multi-line text field
    TextField(&'a str),
    /// `.` (inapplicable) or `?` (unknown)
    Null,
}

impl<'a> Token<'a> {
    /// The value text, with `Null` reading as `None`.
    pub fn as_value(&self) -> Option<&'a str> {
        match self {
            Token::Value(s) | Token::TextField(s) | Token::DataBlock(s) => Some(s),
            _ => None,
        }
    }

    /// True for tokens that can appear in a loop body.
    pub fn is_loop_value(&self) -> bool {
        matches!(self, Token::Value(_) | Token::TextField(_) | Token::Null)
    }
}

/// Fold a raw data name to the comparison form used by the parser.
pub fn normalize_name(raw: &str) -> String {
    raw.to_ascii_lowercase().replace('.', "_")
}

fn skip_ws_and_comments(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), preceded(char('#'), not_line_ending)),
        ))),
    )(input)
}

fn data_block(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = tag("data_")(input)?;
    let (input, name) = take_while(|c: char| !c.is_whitespace())(input)?;
    Ok((input, Token::DataBlock(name)))
}

fn loop_keyword(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = tag("loop_")(input)?;
    Ok((input, Token::Loop))
}

fn data_name(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('_')(input)?;
    let (input, name) = take_while1(|c: char| !c.is_whitespace())(input)?;
    Ok((input, Token::DataName(normalize_name(&format!("_{name}")))))
}

fn single_quoted(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('\'')(input)?;
    let (input, content) = take_while(|c| c != '\'' && c != '\n')(input)?;
    let (input, _) = char('\'')(input)?;
    Ok((input, Token::Value(content)))
}

fn double_quoted(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('"')(input)?;
    let (input, content) = take_while(|c| c != '"' && c != '\n')(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, Token::Value(content)))
}

/// A `;` at the start of a line opens a text field that runs to the
/// next line starting with `;`.
fn text_field(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, _) = char(';')(input)?;
    for (i, c) in rest.char_indices() {
        if c == '\n' && rest[i + 1..].starts_with(';') {
            return Ok((&rest[i + 2..], Token::TextField(rest[..i].trim())));
        }
    }
    Ok(("", Token::TextField(rest.trim())))
}

fn bare_value(input: &str) -> IResult<&str, Token<'_>> {
    let (input, text) = take_while1(|c: char| !c.is_whitespace())(input)?;
    let token = match text {
        "." | "?" => Token::Null,
        _ => Token::Value(text),
    };
    Ok((input, token))
}

fn next_token(input: &str) -> IResult<&str, Option<Token<'_>>> {
    let (input, _) = skip_ws_and_comments(input)?;
    if input.is_empty() {
        return Ok((input, None));
    }
    let (input, token) = alt((
        data_block,
        loop_keyword,
        data_name,
        single_quoted,
        double_quoted,
        text_field,
        bare_value,
    ))(input)?;
    Ok((input, Some(token)))
}

/// Tokenize a whole document. Unlexable bytes are skipped one at a
/// time; a syntactically rough file still yields its parseable tokens.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        match next_token(rest) {
            Ok((_, None)) => break,
            Ok((remaining, Some(token))) => {
                tokens.push(token);
                rest = remaining;
            }
            Err(_) => match rest.char_indices().nth(1) {
                Some((offset, _)) => rest = &rest[offset..],
                None => break,
            },
        }
    }
    tokens
}
