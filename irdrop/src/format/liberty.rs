//! Cell areas from Liberty (`.lib`) libraries.
//!
//! Only the `area` attribute of each `cell (...)` group is read. The rest of
//! the library is skipped without being parsed.

use arcstr::ArcStr;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::error::{ParseError, Result};
use super::field;
use super::{DumpParser, Format, Records, Source};
use crate::diagnostics::Diagnostics;

lazy_static! {
    /// A `cell (` group opener that is not the tail of a longer identifier.
    static ref CELL_DECL: Regex =
        Regex::new(r"(?:^|[^A-Za-z0-9_])cell\s*\(").expect("failed to compile cell regex");
}

const AREA_PREFIX: &str = "area";

/// One row of the `lib` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibRow {
    pub cell: ArcStr,
    pub area: f64,
    pub filename: ArcStr,
}

/// Returns the text following each cell group opener.
fn cell_blocks(text: &str) -> Vec<&str> {
    let starts: Vec<(usize, usize)> = CELL_DECL
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &(_, body))| {
            let end = starts.get(i + 1).map(|&(next, _)| next).unwrap_or(text.len());
            &text[body..end]
        })
        .collect()
}

/// Returns the value of an `area : <value> ;` line, if `line` is one.
fn area_value(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(AREA_PREFIX)?.trim_start();
    let value = rest.strip_prefix(':')?;
    Some(value.trim().trim_end_matches(';').trim())
}

fn parse_cell(block: &str, filename: &ArcStr) -> Result<LibRow> {
    let (name, body) = block.split_once(')').unwrap_or((block, ""));
    let name = name.trim().trim_matches('"').trim();
    if name.is_empty() {
        return Err(ParseError::EmptyBlock { marker: "cell (" });
    }
    let cell = ArcStr::from(name);

    let raw = body
        .lines()
        .find_map(area_value)
        .ok_or_else(|| ParseError::MissingArea { cell: cell.clone() })?;
    let area = field::number(raw).ok_or_else(|| ParseError::InvalidNumber {
        cell: cell.clone(),
        text: raw.to_string(),
    })?;

    Ok(LibRow {
        cell,
        area,
        filename: filename.clone(),
    })
}

/// Parses the cell areas of a Liberty library.
pub fn parse(text: &str, filename: &ArcStr) -> Result<Vec<LibRow>> {
    cell_blocks(text)
        .into_iter()
        .map(|block| parse_cell(block, filename))
        .collect()
}

/// The [`DumpParser`] for Liberty libraries.
#[derive(Debug, Default, Copy, Clone)]
pub struct LibParser;

impl DumpParser for LibParser {
    fn format(&self) -> Format {
        Format::Lib
    }

    fn parse(&self, src: &Source<'_>, _diags: &mut Diagnostics) -> Result<Records> {
        Ok(Records::Lib(parse(src.text(), src.filename())?))
    }
}

#[cfg(test)]
mod tests {
    use float_eq::float_eq;

    use super::*;

    const LIB: &str = r#"library (demo) {
  default_cell_leakage_power : 0;
  cell ("and2_1x") {
    cell_footprint : "and2";
    area : 4.704 ;
    pin (A) { direction : input; }
  }
  cell(dff_1x) {
    area : 12.5;
    test_cell () {
      area : 99;
    }
  }
}
"#;

    fn filename() -> ArcStr {
        arcstr::literal!("demo.lib")
    }

    #[test]
    fn test_areas() {
        let rows = parse(LIB, &filename()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cell, "and2_1x");
        assert!(float_eq!(rows[0].area, 4.704, r2nd <= 1e-12));
        assert_eq!(rows[1].cell, "dff_1x");
        assert!(float_eq!(rows[1].area, 12.5, r2nd <= 1e-12));
        assert_eq!(rows[1].filename, "demo.lib");
    }

    #[test]
    fn test_lookalike_tokens_do_not_open_cells() {
        let blocks = cell_blocks(LIB);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].contains("test_cell"));
    }

    #[test]
    fn test_area_value() {
        assert_eq!(area_value("    area : 4.704 ;"), Some("4.704"));
        assert_eq!(area_value("area:3;"), Some("3"));
        assert_eq!(area_value("area_scale : 2;"), None);
        assert_eq!(area_value("cell_footprint : \"x\";"), None);
    }

    #[test]
    fn test_missing_area_is_structural() {
        let err = parse("cell (inv_1x) {\n  pin (A) { }\n}\n", &filename()).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingArea {
                cell: arcstr::literal!("inv_1x")
            }
        );
    }
}
