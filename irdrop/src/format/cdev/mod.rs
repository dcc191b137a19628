//! Capacitance/leakage (`.cdev`) dumps.
//!
//! A dump is a sequence of cells, each introduced by [`CELL_MARKER`]. The
//! body of a cell interleaves parameter lines (`;`-separated
//! `name = value [unit]` fields describing one operating condition) with pin
//! lines (`pin = <name>, esc = ..., esr = ..., leak = ...`). The same
//! condition may be printed more than once; its pins are merged under a
//! single [`VariationKey`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use arcstr::ArcStr;
use serde::Serialize;

use super::error::{ParseError, Result};
use super::field::{self, Rhs};
use super::{DumpParser, Format, Records, Source};
use crate::diagnostics::{Diagnostic, DiagnosticCause, Diagnostics};
use crate::log::debug;
use crate::units::{UnitCheck, UnitTable, VOLTAGE};

pub use self::scan::{scan_sub_blocks, LineKind, PIN_TOKEN};

pub mod scan;

/// The literal that precedes each cell name.
pub const CELL_MARKER: &str = "Info: cell=";

const UNITS: UnitTable = UnitTable::cdev();

/// A scalar parsed from a dump: a number when it carried a unit, else the raw text.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(ArcStr),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Number(_) => None,
            ParamValue::Text(s) => Some(s.as_str()),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.into())
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParamValue {}

impl PartialOrd for ParamValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParamValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use ParamValue::*;
        match (self, other) {
            (Number(a), Number(b)) => a.total_cmp(b),
            (Number(_), Text(_)) => Ordering::Less,
            (Text(_), Number(_)) => Ordering::Greater,
            (Text(a), Text(b)) => a.cmp(b),
        }
    }
}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ParamValue::Number(v) => {
                0u8.hash(state);
                v.to_bits().hash(state);
            }
            ParamValue::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

/// The scalar attributes of one operating condition, ordered by name.
///
/// Two keys built from the same fields compare equal regardless of the order
/// the fields appeared in the dump.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct VariationKey(BTreeMap<ArcStr, ParamValue>);

impl VariationKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<ArcStr>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Looks up `name` ignoring ASCII case.
    pub fn get_ignore_case(&self, name: &str) -> Option<&ParamValue> {
        self.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<ArcStr>> FromIterator<(K, ParamValue)> for VariationKey {
    fn from_iter<T: IntoIterator<Item = (K, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Measurements for one pin under one operating condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PinData {
    attrs: BTreeMap<ArcStr, ParamValue>,
    voltage: Option<ParamValue>,
}

impl PinData {
    pub fn attr(&self, name: &str) -> Option<&ParamValue> {
        self.attrs.get(name)
    }

    #[inline]
    pub fn esc(&self) -> Option<&ParamValue> {
        self.attr("esc")
    }

    #[inline]
    pub fn esr(&self) -> Option<&ParamValue> {
        self.attr("esr")
    }

    #[inline]
    pub fn leak(&self) -> Option<&ParamValue> {
        self.attr("leak")
    }

    /// The pin's voltage, when the condition declares a parameter named after the pin.
    #[inline]
    pub fn voltage(&self) -> Option<&ParamValue> {
        self.voltage.as_ref()
    }

    /// Folds `other` into `self`. Fields present in both take `other`'s value.
    pub fn merge(&mut self, other: PinData) {
        self.attrs.extend(other.attrs);
        if other.voltage.is_some() {
            self.voltage = other.voltage;
        }
    }
}

pub type PinMap = BTreeMap<ArcStr, PinData>;

/// All conditions of one cell.
pub type CellVariations = BTreeMap<VariationKey, PinMap>;

/// A parsed cdev dump: cell → condition → pin → measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CdevDump {
    cells: BTreeMap<ArcStr, CellVariations>,
}

/// One row of the `cdev` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdevRow {
    pub cell: ArcStr,
    pub temperature: Option<ParamValue>,
    pub state: Option<ParamValue>,
    pub vector: Option<ParamValue>,
    pub active_input: Option<ParamValue>,
    pub active_output: Option<ParamValue>,
    pub vpwr: Option<ParamValue>,
    pub vgnd: Option<ParamValue>,
    pub pin: ArcStr,
    pub esc: Option<ParamValue>,
    pub esr: Option<ParamValue>,
    pub leak: Option<ParamValue>,
    pub filename: ArcStr,
}

impl CdevDump {
    pub fn cell(&self, name: &str) -> Option<&CellVariations> {
        self.cells.get(name)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&ArcStr, &CellVariations)> {
        self.cells.iter()
    }

    fn merge_cell(&mut self, name: ArcStr, variations: CellVariations) {
        let cell = self.cells.entry(name).or_default();
        for (key, pins) in variations {
            merge_pins(cell.entry(key).or_default(), pins);
        }
    }

    /// Flattens the dump to one row per (cell, condition, pin).
    pub fn rows(&self, filename: &ArcStr) -> Vec<CdevRow> {
        let mut rows = Vec::new();
        for (cell, variations) in self.cells.iter() {
            for (key, pins) in variations.iter() {
                let get = |name: &str| key.get(name).cloned();
                for (pin, data) in pins.iter() {
                    rows.push(CdevRow {
                        cell: cell.clone(),
                        temperature: get("Temperature"),
                        state: get("state"),
                        vector: get("vector"),
                        active_input: get("active_input"),
                        active_output: get("active_output"),
                        vpwr: key.get_ignore_case("vpwr").cloned(),
                        vgnd: key.get_ignore_case("vgnd").cloned(),
                        pin: pin.clone(),
                        esc: data.esc().cloned(),
                        esr: data.esr().cloned(),
                        leak: data.leak().cloned(),
                        filename: filename.clone(),
                    });
                }
            }
        }
        rows
    }
}

fn merge_pins(into: &mut PinMap, pins: PinMap) {
    for (pin, data) in pins {
        into.entry(pin).or_default().merge(data);
    }
}

/// Parses the full text of a cdev dump.
pub fn parse(text: &str, diags: &mut Diagnostics) -> Result<CdevDump> {
    let mut blocks: Vec<&str> = super::cell_blocks(text, CELL_MARKER).collect();
    let last = blocks.last_mut().ok_or(ParseError::NoBlocks {
        marker: CELL_MARKER,
    })?;
    *last = strip_summary_line(*last);

    let mut dump = CdevDump::default();
    for block in blocks {
        let (name, variations) = parse_cell(block, diags)?;
        debug!("cdev cell {name}: {} condition(s)", variations.len());
        dump.merge_cell(name, variations);
    }
    Ok(dump)
}

/// Drops the trailing summary line the dump tool prints after the last cell.
fn strip_summary_line(block: &str) -> &str {
    let block = block.trim_end_matches(['\n', '\r']);
    match block.rfind('\n') {
        Some(idx) => &block[..idx],
        None => "",
    }
}

fn parse_cell(block: &str, diags: &mut Diagnostics) -> Result<(ArcStr, CellVariations)> {
    let mut lines = block.lines();
    let name = lines
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ParseError::EmptyBlock {
            marker: CELL_MARKER,
        })?;
    let name = ArcStr::from(name);
    let body: Vec<&str> = lines.collect();

    let mut variations = CellVariations::new();
    for range in scan_sub_blocks(&body) {
        let (key, pins) = parse_sub_block(&body[range], &name, diags)?;
        merge_pins(variations.entry(key).or_default(), pins);
    }
    Ok((name, variations))
}

/// Parses one parameter/pin group into its condition key and pin measurements.
fn parse_sub_block(
    lines: &[&str],
    cell: &ArcStr,
    diags: &mut Diagnostics,
) -> Result<(VariationKey, PinMap)> {
    let (pin_lines, param_lines): (Vec<&str>, Vec<&str>) = lines
        .iter()
        .copied()
        .partition(|line| LineKind::of(line) == LineKind::Pin);

    // Pins come first: a parameter named after a pin is that pin's voltage.
    let mut pins = PinMap::new();
    for line in pin_lines {
        let mut fields = line.split(',');
        let head = fields.next().unwrap_or_default();
        let pin = head.split_whitespace().last().unwrap_or_default();
        let data = pins.entry(ArcStr::from(pin)).or_default();
        for text in fields.filter(|f| !f.trim().is_empty()) {
            let (name, value) = parse_param(text, cell, &PinMap::new(), diags)?;
            data.attrs.insert(name, value);
        }
    }

    let mut key = VariationKey::new();
    for line in param_lines {
        for text in line.split([';', ',']).filter(|f| f.contains('=')) {
            let (name, value) = parse_param(text, cell, &pins, diags)?;
            if let Some(pin) = pins.get_mut(&name) {
                pin.voltage = Some(value.clone());
            }
            key.insert(name, value);
        }
    }

    Ok((key, pins))
}

/// Parses a single `name = value [unit]` field, checking its unit.
fn parse_param(
    text: &str,
    cell: &ArcStr,
    pins: &PinMap,
    diags: &mut Diagnostics,
) -> Result<(ArcStr, ParamValue)> {
    let field = field::field(text).ok_or_else(|| ParseError::MissingSeparator {
        cell: cell.clone(),
        separator: "=",
        text: text.trim().to_string(),
    })?;
    let name = ArcStr::from(field.name);

    let value = match field::rhs(field.rhs) {
        Rhs::Measured { value, unit } => {
            check_unit(cell, &name, unit, pins, diags);
            ParamValue::Number(value)
        }
        Rhs::Raw(raw) => ParamValue::from(raw),
    };
    Ok((name, value))
}

fn check_unit(cell: &ArcStr, name: &ArcStr, unit: &str, pins: &PinMap, diags: &mut Diagnostics) {
    let check = match UNITS.check(name, unit) {
        UnitCheck::Unknown if pins.contains_key(name) => UNITS.check(VOLTAGE, unit),
        check => check,
    };
    let cause = match check {
        UnitCheck::Ok => return,
        UnitCheck::Mismatch { expected } => DiagnosticCause::UnitMismatch {
            variable: name.clone(),
            expected,
            found: unit.into(),
        },
        UnitCheck::Unknown => DiagnosticCause::UnknownVariable {
            variable: name.clone(),
            unit: Some(unit.into()),
        },
    };
    diags.push(Diagnostic::new(Format::Cdev, cell.clone(), cause));
}

/// The [`DumpParser`] for cdev dumps.
#[derive(Debug, Default, Copy, Clone)]
pub struct CdevParser;

impl DumpParser for CdevParser {
    fn format(&self) -> Format {
        Format::Cdev
    }

    fn parse(&self, src: &Source<'_>, diags: &mut Diagnostics) -> Result<Records> {
        let dump = parse(src.text(), diags)?;
        Ok(Records::Cdev(dump.rows(src.filename())))
    }
}
