use super::pattern::{GraphPattern, PatternElement};

const INDENT: &str = "  ";

/// Render a query fragment as SPARQL text
pub trait ToSparql {
    /// Append this fragment to `out`, each line prefixed by `depth` indents
    fn write_sparql(&self, out: &mut String, depth: usize);

    fn to_sparql(&self) -> String {
        let mut out = String::new();
        self.write_sparql(&mut out, 0);
        out
    }

    fn to_sparql_indented(&self, depth: usize) -> String {
        let mut out = String::new();
        self.write_sparql(&mut out, depth);
        out
    }
}

pub(crate) fn variable(name: &str) -> String {
    format!("?{}", name)
}

pub(crate) fn iri(iri: &str) -> String {
    format!("<{}>", iri)
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

impl ToSparql for PatternElement {
    fn write_sparql(&self, out: &mut String, depth: usize) {
        match self {
            PatternElement::Block { subject, pairs } => {
                push_indent(out, depth);
                out.push_str(&variable(subject));
                for (i, (predicate, object)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" ;\n");
                        push_indent(out, depth + 2);
                    } else {
                        out.push(' ');
                    }
                    out.push_str(&iri(predicate));
                    out.push(' ');
                    out.push_str(&variable(object));
                }
                out.push_str(" .\n");
            }
            PatternElement::Optional(inner) => {
                push_indent(out, depth);
                out.push_str("OPTIONAL {\n");
                for element in inner {
                    element.write_sparql(out, depth + 1);
                }
                push_indent(out, depth);
                out.push_str("}\n");
            }
            PatternElement::Raw(text) => {
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    push_indent(out, depth);
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }
}

impl ToSparql for GraphPattern {
    fn write_sparql(&self, out: &mut String, depth: usize) {
        for element in &self.elements {
            element.write_sparql(out, depth);
        }
    }
}

impl<T: ToSparql> ToSparql for [T] {
    fn write_sparql(&self, out: &mut String, depth: usize) {
        for item in self {
            item.write_sparql(out, depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_rendering() {
        let block = PatternElement::Block {
            subject: "id".into(),
            pairs: vec![
                ("http://ex.org/a".into(), "a".into()),
                ("http://ex.org/b".into(), "b".into()),
            ],
        };
        assert_eq!(
            block.to_sparql(),
            "?id <http://ex.org/a> ?a ;\n    <http://ex.org/b> ?b .\n"
        );
    }

    #[test]
    fn test_optional_rendering() {
        let optional = PatternElement::Optional(vec![PatternElement::triple(
            "id",
            "http://ex.org/m",
            "message",
        )]);
        assert_eq!(
            optional.to_sparql_indented(1),
            "  OPTIONAL {\n    ?id <http://ex.org/m> ?message .\n  }\n"
        );
    }

    #[test]
    fn test_raw_lines_are_reindented() {
        let raw = PatternElement::Raw("?id a <http://ex.org/W> .\n   \n  ?id <http://ex.org/p> ?p .".into());
        assert_eq!(
            raw.to_sparql_indented(1),
            "  ?id a <http://ex.org/W> .\n  ?id <http://ex.org/p> ?p .\n"
        );
    }
}
