//! Spreadsheet report rendering.
//!
//! The template is a grid of cell texts. A cell consisting of exactly one
//! placeholder becomes a typed cell; any other cell is substituted as text.

use super::template::{parse_line, Segment};
use super::{ReportData, ReportError};

/// Grid of template cell texts, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpreadsheetTemplate {
    pub rows: Vec<Vec<String>>,
}

impl SpreadsheetTemplate {
    /// Reads a tab-separated template, one row per line.
    pub fn from_tsv(text: &str) -> Self {
        Self {
            rows: text
                .lines()
                .map(|line| line.split('\t').map(str::to_string).collect())
                .collect(),
        }
    }
}

/// Rendered spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spreadsheet {
    pub rows: Vec<Vec<Cell>>,
}

impl Spreadsheet {
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    /// Tab-separated rendering; tabs and newlines inside text become spaces.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let line = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => String::new(),
                    Cell::Number(value) => value.to_string(),
                    Cell::Text(text) => text.replace(['\t', '\n', '\r'], " "),
                })
                .collect::<Vec<_>>()
                .join("\t");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

/// Renders a spreadsheet report.
///
/// Defaulted variables render as empty (in a whole-placeholder cell) or as
/// empty text (inside a longer cell).
pub fn render_spreadsheet(
    data: &ReportData,
    template: &SpreadsheetTemplate,
) -> Result<Spreadsheet, ReportError> {
    let mut rows = Vec::with_capacity(template.rows.len());
    for (row_index, template_row) in template.rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(template_row.len());
        for cell_text in template_row {
            cells.push(render_cell(data, cell_text, row_index + 1)?);
        }
        rows.push(cells);
    }
    Ok(Spreadsheet { rows })
}

fn render_cell(data: &ReportData, cell_text: &str, row_no: usize) -> Result<Cell, ReportError> {
    let segments = parse_line(cell_text, row_no)?;
    if segments.is_empty() {
        return Ok(Cell::Empty);
    }

    if let [Segment::Field(name)] = segments.as_slice() {
        let value = lookup(data, name)?;
        if data.is_defaulted(name) {
            return Ok(Cell::Empty);
        }
        return Ok(match value.parse::<f64>() {
            Ok(number) => Cell::Number(number),
            Err(_) => Cell::Text(value.to_string()),
        });
    }

    let mut text = String::new();
    for segment in &segments {
        match segment {
            Segment::Literal(literal) => text.push_str(literal),
            Segment::Field(name) => {
                let value = lookup(data, name)?;
                if !data.is_defaulted(name) {
                    text.push_str(value);
                }
            }
        }
    }
    Ok(Cell::Text(text))
}

fn lookup<'d>(data: &'d ReportData, name: &str) -> Result<&'d str, ReportError> {
    data.values
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| ReportError::UnknownField(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{render_spreadsheet, Cell, SpreadsheetTemplate};
    use crate::report::ReportData;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn typed_cells_and_blank_defaults() {
        let data = ReportData {
            values: BTreeMap::from([
                ("AntropPaino".to_string(), "80".to_string()),
                ("AntropPituus".to_string(), "Ei mitattu".to_string()),
                ("TiedotNimi".to_string(), "Testi".to_string()),
            ]),
            defaulted: BTreeSet::from(["AntropPituus".to_string()]),
        };
        let template = SpreadsheetTemplate::from_tsv(
            "Nimi\t{TiedotNimi}\nPaino\t{AntropPaino}\nPituus\t{AntropPituus}\t({AntropPituus} cm)",
        );

        let sheet = render_spreadsheet(&data, &template).unwrap();
        assert_eq!(sheet.cell(0, 1), Some(&Cell::Text("Testi".to_string())));
        assert_eq!(sheet.cell(1, 1), Some(&Cell::Number(80.0)));
        assert_eq!(sheet.cell(2, 1), Some(&Cell::Empty));
        assert_eq!(sheet.cell(2, 2), Some(&Cell::Text("( cm)".to_string())));
        assert_eq!(
            sheet.to_tsv(),
            "Nimi\tTesti\nPaino\t80\nPituus\t\t( cm)\n"
        );
    }
}
