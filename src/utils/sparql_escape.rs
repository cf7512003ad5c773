/// Literal escaping and pre-binding substitution for SPARQL text
///
/// Pre-bindings replace `?name` / `$name` variable tokens with constant terms.
/// Tokens inside string literals and `<...>` IRIs are left untouched, and
/// variables without a binding are kept as variables.
use std::collections::HashMap;

use crate::term::Term;

/// Escape a string for use inside a double-quoted SPARQL literal
///
/// - Backslash \ is escaped as \\
/// - Double quotes are escaped as \"
/// - Newlines, carriage returns and tabs use their short escapes
pub fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"), // Must be first!
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn is_variable_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Substitute pre-bound variables in SPARQL text
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use viewgraph::term::Term;
/// use viewgraph::utils::sparql_escape::substitute_bindings;
///
/// let mut bindings = HashMap::new();
/// bindings.insert("id".to_string(), Term::iri("http://ex.org/w1"));
///
/// let text = "?id <http://ex.org/p> ?value .";
/// assert_eq!(
///     substitute_bindings(text, &bindings),
///     "<http://ex.org/w1> <http://ex.org/p> ?value ."
/// );
/// ```
pub fn substitute_bindings(text: &str, bindings: &HashMap<String, Term>) -> String {
    if bindings.is_empty() {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len() * 2);
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' | '\'' => {
                // Copy the literal verbatim, honouring backslash escapes
                result.push(ch);
                while let Some(c) = chars.next() {
                    result.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            result.push(escaped);
                        }
                    } else if c == ch {
                        break;
                    }
                }
            }
            '<' => {
                // IRIs contain no whitespace; a '<' followed by whitespace is an operator
                result.push(ch);
                if chars.peek().is_some_and(|c| !c.is_whitespace() && *c != '=') {
                    while let Some(c) = chars.next() {
                        result.push(c);
                        if c == '>' || c.is_whitespace() {
                            break;
                        }
                    }
                }
            }
            '?' | '$' => {
                let mut name = String::new();
                while let Some(&next_ch) = chars.peek() {
                    if is_variable_char(next_ch) {
                        name.push(next_ch);
                        chars.next();
                    } else {
                        break;
                    }
                }

                match bindings.get(&name) {
                    Some(term) if !name.is_empty() => result.push_str(&term.to_sparql()),
                    _ => {
                        result.push(ch);
                        result.push_str(&name);
                    }
                }
            }
            _ => result.push(ch),
        }
    }

    result
}
