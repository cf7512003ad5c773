use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{all_consuming, opt, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};
use thiserror::Error;

use super::{is_iri_char, is_valid_iri, PrefixMap, Term, XSD_BOOLEAN, XSD_DECIMAL, XSD_DOUBLE, XSD_INTEGER};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TermParseError {
    #[error("Malformed term syntax: `{input}`")]
    Syntax { input: String },
    #[error("Unknown prefix `{prefix}` in `{input}`")]
    UnknownPrefix { prefix: String, input: String },
    #[error("Invalid IRI `{iri}`: whitespace and <>\"{{}}|^`\\ are not allowed")]
    InvalidIri { iri: String },
}

/// IRI as written: either `<full>` or `prefix:local`
#[derive(Debug, Clone, PartialEq)]
enum IriRef {
    Full(String),
    Prefixed { prefix: String, local: String },
}

#[derive(Debug, Clone, PartialEq)]
enum ParsedTerm {
    Iri(IriRef),
    Blank(String),
    Literal {
        lexical: String,
        language: Option<String>,
        datatype: Option<IriRef>,
    },
}

/// Parse the compact term syntax, expanding prefixed names with `prefixes`.
///
/// Accepted forms:
/// - `<http://example.org/a>` and `prefix:local`
/// - `"text"`, `'text'`, `"text"@en`, `"3"^^xsd:integer`, `"3"^^<...>`
/// - `_:label`
/// - `42`, `-1.5`, `1e3`, `true`, `false`
pub fn parse_term(input: &str, prefixes: &PrefixMap) -> Result<Term, TermParseError> {
    let (_, parsed) = all_consuming(delimited(multispace0, term, multispace0))
        .parse(input)
        .map_err(|_| TermParseError::Syntax {
            input: input.to_string(),
        })?;
    resolve(parsed, input, prefixes)
}

fn resolve(parsed: ParsedTerm, input: &str, prefixes: &PrefixMap) -> Result<Term, TermParseError> {
    let resolve_iri = |iri: IriRef| -> Result<String, TermParseError> {
        match iri {
            IriRef::Full(iri) => Ok(iri),
            IriRef::Prefixed { prefix, local } => prefixes
                .namespace(&prefix)
                .map(|ns| format!("{}{}", ns, local))
                .ok_or_else(|| TermParseError::UnknownPrefix {
                    prefix,
                    input: input.to_string(),
                }),
        }
    };

    match parsed {
        ParsedTerm::Iri(iri) => Term::checked_iri(resolve_iri(iri)?),
        ParsedTerm::Blank(label) => Ok(Term::Blank(label)),
        ParsedTerm::Literal {
            lexical,
            language: Some(lang),
            ..
        } => Ok(Term::lang(lexical, lang)),
        ParsedTerm::Literal {
            lexical,
            datatype: Some(dt),
            ..
        } => {
            let datatype = resolve_iri(dt)?;
            if !is_valid_iri(&datatype) {
                return Err(TermParseError::InvalidIri { iri: datatype });
            }
            Ok(Term::typed(lexical, datatype))
        }
        ParsedTerm::Literal { lexical, .. } => Ok(Term::literal(lexical)),
    }
}

fn term(input: &str) -> IResult<&str, ParsedTerm> {
    alt((
        quoted_literal,
        iri_ref.map(ParsedTerm::Iri),
        blank_node,
        numeric_literal,
        boolean_literal,
    ))
    .parse(input)
}

fn iri_ref(input: &str) -> IResult<&str, IriRef> {
    alt((full_iri, prefixed_name)).parse(input)
}

fn full_iri(input: &str) -> IResult<&str, IriRef> {
    delimited(
        char('<'),
        take_while(is_iri_char),
        char('>'),
    )
    .map(|iri: &str| IriRef::Full(iri.to_string()))
    .parse(input)
}

fn prefix_label(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    ))
    .parse(input)
}

fn prefixed_name(input: &str) -> IResult<&str, IriRef> {
    let (input, prefix) = opt(prefix_label).parse(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, local) =
        take_while(|c: char| c.is_alphanumeric() || "_-.%/#".contains(c)).parse(input)?;
    Ok((
        input,
        IriRef::Prefixed {
            prefix: prefix.unwrap_or_default().to_string(),
            local: local.to_string(),
        },
    ))
}

fn blank_node(input: &str) -> IResult<&str, ParsedTerm> {
    preceded(
        tag("_:"),
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )
    .map(|label: &str| ParsedTerm::Blank(label.to_string()))
    .parse(input)
}

/// Body of a quoted string up to (not including) the closing quote, with
/// backslash escapes decoded.
fn quoted_body(input: &str, quote: char) -> IResult<&str, String> {
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c == quote {
            return Ok((&input[idx..], out));
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => out.push('\n'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, 't')) => out.push('\t'),
            Some((_, '0')) => out.push('\0'),
            Some((_, other)) => out.push(other),
            None => break,
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

fn double_quoted(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"').parse(input)?;
    let (input, body) = quoted_body(input, '"')?;
    let (input, _) = char('"').parse(input)?;
    Ok((input, body))
}

fn single_quoted(input: &str) -> IResult<&str, String> {
    let (input, _) = char('\'').parse(input)?;
    let (input, body) = quoted_body(input, '\'')?;
    let (input, _) = char('\'').parse(input)?;
    Ok((input, body))
}

fn language_tag(input: &str) -> IResult<&str, &str> {
    preceded(
        char('@'),
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic()),
            many0(pair(char('-'), take_while1(|c: char| c.is_ascii_alphanumeric()))),
        )),
    )
    .parse(input)
}

fn quoted_literal(input: &str) -> IResult<&str, ParsedTerm> {
    let (input, lexical) = alt((double_quoted, single_quoted)).parse(input)?;
    let (input, language) = opt(language_tag).parse(input)?;
    if let Some(lang) = language {
        return Ok((
            input,
            ParsedTerm::Literal {
                lexical,
                language: Some(lang.to_string()),
                datatype: None,
            },
        ));
    }
    let (input, datatype) = opt(preceded(tag("^^"), iri_ref)).parse(input)?;
    Ok((
        input,
        ParsedTerm::Literal {
            lexical,
            language: None,
            datatype,
        },
    ))
}

/// Matches: 123, -123, +7, 3.14, .5, 2., 1e10, -2.5E-3
fn numeric_literal(input: &str) -> IResult<&str, ParsedTerm> {
    let (rest, text) = recognize_float(input)?;

    let datatype = if text.contains(['e', 'E']) {
        XSD_DOUBLE
    } else if text.contains('.') {
        XSD_DECIMAL
    } else {
        XSD_INTEGER
    };
    Ok((
        rest,
        ParsedTerm::Literal {
            lexical: text.to_string(),
            language: None,
            datatype: Some(IriRef::Full(datatype.to_string())),
        },
    ))
}

fn boolean_literal(input: &str) -> IResult<&str, ParsedTerm> {
    alt((tag("true"), tag("false")))
        .map(|text: &str| ParsedTerm::Literal {
            lexical: text.to_string(),
            language: None,
            datatype: Some(IriRef::Full(XSD_BOOLEAN.to_string())),
        })
        .parse(input)
}
