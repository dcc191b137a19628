//! Switching-current profile (`.spiprof`) dumps.
//!
//! Each cell opens with [`CELL_MARKER`] and holds blank-line separated
//! groups. A group starts with a header line (supply voltage followed by the
//! process parameters, `;`-separated) and continues with one chunk per state:
//! a state line, a column label line, then one row per pin with alternating
//! value/unit pairs.

use std::collections::BTreeSet;

use arcstr::ArcStr;
use serde::Serialize;

use super::error::{ParseError, Result};
use super::field::{self, Rhs};
use super::{DumpParser, Format, Records, Source};
use crate::diagnostics::{Diagnostic, DiagnosticCause, Diagnostics};
use crate::log::debug;
use crate::units::{UnitCheck, UnitTable, VOLTAGE};

#[cfg(test)]
mod tests;

/// The literal that precedes each cell name.
pub const CELL_MARKER: &str = "cell: ";

/// Separates a group's header from its state chunks.
pub const HEADER_SEPARATOR: &str = ";\n";

/// The token opening each state chunk.
pub const STATE_MARKER: &str = "state = ";

/// Cell name prefixes of sequential elements, which are profiled in 4 states.
pub const SEQUENTIAL_PREFIXES: [&str; 3] = ["dff", "sdff", "latch"];

const UNITS: UnitTable = UnitTable::spiprof();

/// One row of the `spiprof` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpiprofRow {
    pub cell: ArcStr,
    pub vpwr: f64,
    pub c1: Option<f64>,
    pub r: Option<f64>,
    pub c2: Option<f64>,
    pub slew1: Option<f64>,
    pub slew2: Option<f64>,
    pub state: ArcStr,
    pub vector: Option<ArcStr>,
    pub active_input: Option<ArcStr>,
    pub active_output: Option<ArcStr>,
    pub pin: ArcStr,
    pub peak: Option<f64>,
    pub area: Option<f64>,
    pub width: Option<f64>,
    pub filename: ArcStr,
}

/// The header of a group: supply voltage and process parameters.
#[derive(Debug, Clone, Default, PartialEq)]
struct GroupHeader {
    vpwr: f64,
    c1: Option<f64>,
    r: Option<f64>,
    c2: Option<f64>,
    slew1: Option<f64>,
    slew2: Option<f64>,
}

impl GroupHeader {
    fn slot(&mut self, name: &str) -> Option<&mut Option<f64>> {
        match name {
            "C1" => Some(&mut self.c1),
            "R" => Some(&mut self.r),
            "C2" => Some(&mut self.c2),
            "Slew1" => Some(&mut self.slew1),
            "Slew2" => Some(&mut self.slew2),
            _ => None,
        }
    }
}

/// The state-level scalars of one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
struct StateInfo {
    state: ArcStr,
    vector: Option<ArcStr>,
    active_input: Option<ArcStr>,
    active_output: Option<ArcStr>,
}

/// The measured quantities of one pin row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Measurements {
    peak: Option<f64>,
    area: Option<f64>,
    width: Option<f64>,
}

impl Measurements {
    fn slot(&mut self, label: &str) -> Option<&mut Option<f64>> {
        match label {
            "peak" => Some(&mut self.peak),
            "area" => Some(&mut self.area),
            "width" => Some(&mut self.width),
            _ => None,
        }
    }
}

/// Number of distinct states a cell named `cell` must be profiled in.
pub fn expected_states(cell: &str) -> usize {
    if SEQUENTIAL_PREFIXES.iter().any(|p| cell.starts_with(p)) {
        4
    } else {
        2
    }
}

struct CellParser<'a> {
    cell: ArcStr,
    filename: &'a ArcStr,
    diags: &'a mut Diagnostics,
    states: BTreeSet<ArcStr>,
    rows: Vec<SpiprofRow>,
}

/// Parses the full text of a spiprof dump.
pub fn parse(text: &str, filename: &ArcStr, diags: &mut Diagnostics) -> Result<Vec<SpiprofRow>> {
    let mut rows = Vec::new();
    for block in super::cell_blocks(text, CELL_MARKER) {
        rows.extend(parse_cell(block, filename, diags)?);
    }
    Ok(rows)
}

fn parse_cell(block: &str, filename: &ArcStr, diags: &mut Diagnostics) -> Result<Vec<SpiprofRow>> {
    let mut groups = block.split("\n\n");
    let cell = groups
        .next()
        .and_then(|header| header.split_whitespace().next())
        .ok_or(ParseError::EmptyBlock {
            marker: CELL_MARKER,
        })?;

    let mut parser = CellParser {
        cell: ArcStr::from(cell),
        filename,
        diags,
        states: BTreeSet::new(),
        rows: Vec::new(),
    };
    // Trailing tool messages may sit in a group of their own.
    for group in groups.filter(|g| {
        let g = g.trim();
        !g.is_empty() && !g.starts_with("Info:")
    }) {
        parser.parse_group(group)?;
    }
    parser.check_state_count();
    debug!(
        "spiprof cell {}: {} row(s), {} state(s)",
        parser.cell,
        parser.rows.len(),
        parser.states.len()
    );
    Ok(parser.rows)
}

impl<'a> CellParser<'a> {
    fn push(&mut self, cause: DiagnosticCause) {
        self.diags
            .push(Diagnostic::new(Format::Spiprof, self.cell.clone(), cause));
    }

    fn invalid_number(&self, text: &str) -> ParseError {
        ParseError::InvalidNumber {
            cell: self.cell.clone(),
            text: text.to_string(),
        }
    }

    fn check_unit(&mut self, name: &str, unit: &str) {
        match UNITS.check(name, unit) {
            UnitCheck::Ok => {}
            UnitCheck::Mismatch { expected } => self.push(DiagnosticCause::UnitMismatch {
                variable: name.into(),
                expected,
                found: unit.into(),
            }),
            UnitCheck::Unknown => self.push(DiagnosticCause::UnknownVariable {
                variable: name.into(),
                unit: Some(unit.into()),
            }),
        }
    }

    /// Parses `name = value unit`, checking `unit` against the table entry `unit_key`.
    fn measured_field(&mut self, text: &str, unit_key: Option<&str>) -> Result<(ArcStr, f64)> {
        let field = field::field(text).ok_or_else(|| ParseError::MissingSeparator {
            cell: self.cell.clone(),
            separator: "=",
            text: text.trim().to_string(),
        })?;
        let key = unit_key.unwrap_or(field.name);
        let value = match field::rhs(field.rhs) {
            Rhs::Measured { value, unit } => {
                self.check_unit(key, unit);
                value
            }
            Rhs::Raw(raw) => {
                let value = field::number(raw).ok_or_else(|| self.invalid_number(raw))?;
                let cause = match UNITS.expected(key) {
                    Some(expected) => DiagnosticCause::MissingUnit {
                        variable: key.into(),
                        expected,
                    },
                    None => DiagnosticCause::UnknownVariable {
                        variable: key.into(),
                        unit: None,
                    },
                };
                self.push(cause);
                value
            }
        };
        Ok((ArcStr::from(field.name), value))
    }

    fn parse_header(&mut self, header: &str) -> Result<GroupHeader> {
        let mut fields = header.split(';').filter(|f| !f.trim().is_empty());
        let supply = fields.next().ok_or_else(|| ParseError::MissingField {
            cell: self.cell.clone(),
            what: "supply voltage",
        })?;
        let (_, vpwr) = self.measured_field(supply, Some(VOLTAGE))?;

        let mut out = GroupHeader {
            vpwr,
            ..Default::default()
        };
        for text in fields {
            let (name, value) = self.measured_field(text, None)?;
            if let Some(slot) = out.slot(&name) {
                *slot = Some(value);
            }
        }
        Ok(out)
    }

    fn parse_group(&mut self, group: &str) -> Result<()> {
        let (header, body) =
            group
                .split_once(HEADER_SEPARATOR)
                .ok_or_else(|| ParseError::MissingSeparator {
                    cell: self.cell.clone(),
                    separator: HEADER_SEPARATOR,
                    text: group.trim().to_string(),
                })?;
        let header = self.parse_header(header)?;

        for chunk in state_chunks(body) {
            self.parse_state(&header, &chunk)?;
        }
        Ok(())
    }

    fn parse_state_line(&self, line: &str) -> Result<StateInfo> {
        let mut info = StateInfo::default();
        let mut state = None;
        for field in line.split(';').filter_map(field::field) {
            let value = ArcStr::from(field.rhs);
            match field.name {
                "state" => state = Some(value),
                "vector" => info.vector = Some(value),
                "active_input" => info.active_input = Some(value),
                "active_output" => info.active_output = Some(value),
                _ => {}
            }
        }
        info.state = state.ok_or_else(|| ParseError::MissingField {
            cell: self.cell.clone(),
            what: "state label",
        })?;
        Ok(info)
    }

    fn parse_state(&mut self, header: &GroupHeader, lines: &[&str]) -> Result<()> {
        let info = self.parse_state_line(lines[0])?;
        let labels: Vec<&str> = lines
            .get(1)
            .ok_or_else(|| ParseError::MissingField {
                cell: self.cell.clone(),
                what: "column labels",
            })?
            .split_whitespace()
            .skip(1)
            .collect();

        for line in lines[2..].iter().map(|l| l.trim()) {
            if line.is_empty() || line.starts_with("Info:") {
                continue;
            }
            let (pin, values) = self.parse_row(line, &labels)?;
            self.rows.push(SpiprofRow {
                cell: self.cell.clone(),
                vpwr: header.vpwr,
                c1: header.c1,
                r: header.r,
                c2: header.c2,
                slew1: header.slew1,
                slew2: header.slew2,
                state: info.state.clone(),
                vector: info.vector.clone(),
                active_input: info.active_input.clone(),
                active_output: info.active_output.clone(),
                pin,
                peak: values.peak,
                area: values.area,
                width: values.width,
                filename: self.filename.clone(),
            });
        }
        self.states.insert(info.state);
        Ok(())
    }

    fn parse_row(&mut self, line: &str, labels: &[&str]) -> Result<(ArcStr, Measurements)> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 1 + 2 * labels.len() {
            return Err(ParseError::MalformedRow {
                cell: self.cell.clone(),
                text: line.to_string(),
                reason: "fewer value/unit pairs than column labels",
            });
        }

        let mut values = Measurements::default();
        for (label, pair) in labels.iter().zip(tokens[1..].chunks(2)) {
            let value = field::number(pair[0]).ok_or_else(|| self.invalid_number(pair[0]))?;
            self.check_unit(label, pair[1]);
            if let Some(slot) = values.slot(label) {
                *slot = Some(value);
            }
        }
        Ok((ArcStr::from(tokens[0]), values))
    }

    fn check_state_count(&mut self) {
        let expected = expected_states(&self.cell);
        let found = self.states.len();
        if found != expected {
            self.push(DiagnosticCause::StateCount { expected, found });
        }
    }
}

/// Splits a group body into state chunks, dropping anything before the first.
fn state_chunks(body: &str) -> Vec<Vec<&str>> {
    let mut chunks: Vec<Vec<&str>> = Vec::new();
    for line in body.lines() {
        if line.trim_start().starts_with(STATE_MARKER) {
            chunks.push(vec![line.trim()]);
        } else if let Some(chunk) = chunks.last_mut() {
            chunk.push(line);
        }
    }
    chunks
}

/// The [`DumpParser`] for spiprof dumps.
#[derive(Debug, Default, Copy, Clone)]
pub struct SpiprofParser;

impl DumpParser for SpiprofParser {
    fn format(&self) -> Format {
        Format::Spiprof
    }

    fn parse(&self, src: &Source<'_>, diags: &mut Diagnostics) -> Result<Records> {
        Ok(Records::Spiprof(parse(src.text(), src.filename(), diags)?))
    }
}
