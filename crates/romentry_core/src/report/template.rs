//! Placeholder template parsing.
//!
//! Placeholders are `{VariableName}`; `{{` and `}}` stand for literal braces.

use super::ReportError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

/// Piece of one template line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Field(String),
}

/// Splits one line into literal text and placeholders.
///
/// `line_no` is 1-based and only used for error messages.
pub(crate) fn parse_line(line: &str, line_no: usize) -> Result<Vec<Segment>, ReportError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(ReportError::MalformedTemplate {
                        line: line_no,
                        detail: format!("unclosed placeholder `{{{name}`"),
                    });
                }
                if !FIELD_NAME_RE.is_match(&name) {
                    return Err(ReportError::MalformedTemplate {
                        line: line_no,
                        detail: format!("invalid placeholder `{{{name}}}`"),
                    });
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(name));
            }
            '}' => {
                return Err(ReportError::MalformedTemplate {
                    line: line_no,
                    detail: "single `}` outside placeholder".to_string(),
                });
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// All placeholder names used in `template`.
pub fn template_fields(template: &str) -> Result<BTreeSet<String>, ReportError> {
    let mut fields = BTreeSet::new();
    for (index, line) in template.lines().enumerate() {
        for segment in parse_line(line, index + 1)? {
            if let Segment::Field(name) = segment {
                fields.insert(name);
            }
        }
    }
    Ok(fields)
}

/// Checks that every placeholder names a known variable.
///
/// Returns the fields the template uses.
pub fn validate_template(
    template: &str,
    known: &BTreeSet<String>,
) -> Result<BTreeSet<String>, ReportError> {
    let fields = template_fields(template)?;
    if let Some(unknown) = fields.iter().find(|field| !known.contains(*field)) {
        return Err(ReportError::UnknownField(unknown.clone()));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::{parse_line, template_fields, validate_template, Segment};
    use crate::report::ReportError;
    use std::collections::BTreeSet;

    #[test]
    fn parses_fields_and_escaped_braces() {
        let segments = parse_line("Paino {AntropPaino} {{kg}}", 1).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("Paino ".to_string()),
                Segment::Field("AntropPaino".to_string()),
                Segment::Literal(" {kg}".to_string()),
            ]
        );
    }

    #[test]
    fn collects_fields_across_lines() {
        let fields = template_fields("{A} ja {B}\n\n{A}\n").unwrap();
        assert_eq!(
            fields,
            BTreeSet::from(["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn rejects_malformed_placeholders() {
        assert!(matches!(
            template_fields("ok\n{Unclosed"),
            Err(ReportError::MalformedTemplate { line: 2, .. })
        ));
        assert!(matches!(
            template_fields("{not a name}"),
            Err(ReportError::MalformedTemplate { line: 1, .. })
        ));
        assert!(template_fields("stray }").is_err());
    }

    #[test]
    fn validate_reports_unknown_field() {
        let known = BTreeSet::from(["AntropPaino".to_string()]);
        assert!(validate_template("{AntropPaino}", &known).is_ok());
        assert_eq!(
            validate_template("{AntropPaino} {Ghost}", &known),
            Err(ReportError::UnknownField("Ghost".to_string()))
        );
    }
}
