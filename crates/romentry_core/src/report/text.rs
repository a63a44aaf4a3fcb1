//! Plain-text report rendering.

use super::template::{parse_line, Segment};
use super::{ReportData, ReportError};

/// Renders a text report.
///
/// A line whose placeholders all refer to defaulted (not measured) variables
/// is left out. Lines without placeholders are always kept.
///
/// # Errors
/// - `MalformedTemplate` for broken placeholders.
/// - `UnknownField` for placeholders missing from `data`.
pub fn render_text(data: &ReportData, template: &str) -> Result<String, ReportError> {
    let mut out = String::with_capacity(template.len());
    for (index, line) in template.lines().enumerate() {
        let segments = parse_line(line, index + 1)?;
        let mut fields = segments.iter().filter_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        });
        let has_fields = fields.clone().next().is_some();
        if has_fields && fields.all(|name| data.is_defaulted(name)) {
            continue;
        }

        for segment in &segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = data
                        .values
                        .get(name)
                        .ok_or_else(|| ReportError::UnknownField(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::render_text;
    use crate::report::{ReportData, ReportError};
    use std::collections::{BTreeMap, BTreeSet};

    fn data() -> ReportData {
        ReportData {
            values: BTreeMap::from([
                ("AntropPaino".to_string(), "80 kg".to_string()),
                ("AntropPituus".to_string(), "Ei mitattu".to_string()),
                ("TiedotNimi".to_string(), "Testi Potilas".to_string()),
            ]),
            defaulted: BTreeSet::from(["AntropPituus".to_string()]),
        }
    }

    #[test]
    fn substitutes_values_and_drops_unmeasured_lines() {
        let template = "Potilas: {TiedotNimi}\nPaino: {AntropPaino}\nPituus: {AntropPituus}\n\nLoppu";
        let text = render_text(&data(), template).unwrap();
        assert_eq!(text, "Potilas: Testi Potilas\nPaino: 80 kg\n\nLoppu\n");
    }

    #[test]
    fn keeps_line_when_any_field_is_measured() {
        let text = render_text(&data(), "{AntropPaino} / {AntropPituus}").unwrap();
        assert_eq!(text, "80 kg / Ei mitattu\n");
    }

    #[test]
    fn unknown_field_is_an_error() {
        assert_eq!(
            render_text(&data(), "{Ghost}"),
            Err(ReportError::UnknownField("Ghost".to_string()))
        );
    }
}
