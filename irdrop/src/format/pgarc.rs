//! Power/ground connectivity (`.pgarc`) lists.
//!
//! ```text
//! pgarc {
//! cell and2_1x {
//!     VPWR VGND
//! }
//! }
//! ```

use arcstr::ArcStr;
use serde::Serialize;

use super::error::{ParseError, Result};
use super::{DumpParser, Format, Records, Source};
use crate::diagnostics::Diagnostics;

/// The literal that precedes each cell name.
pub const CELL_MARKER: &str = "cell ";

const FORMAT_TOKEN: &str = "pgarc";

/// One row of the `pgarc` table.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct PgarcRow {
    pub cell: ArcStr,
    pub pin: ArcStr,
}

fn is_separator(c: char) -> bool {
    c == '{' || c == '}' || c.is_whitespace()
}

/// Parses the full text of a pgarc list into (cell, pin) associations.
pub fn parse(text: &str) -> Result<Vec<PgarcRow>> {
    let mut rows = Vec::new();
    for block in super::cell_blocks(text, CELL_MARKER) {
        let mut tokens = block
            .split(is_separator)
            .filter(|t| !t.is_empty() && *t != FORMAT_TOKEN);
        let cell = ArcStr::from(tokens.next().ok_or(ParseError::EmptyBlock {
            marker: CELL_MARKER,
        })?);
        rows.extend(tokens.map(|pin| PgarcRow {
            cell: cell.clone(),
            pin: pin.into(),
        }));
    }
    Ok(rows)
}

/// The [`DumpParser`] for pgarc lists.
#[derive(Debug, Default, Copy, Clone)]
pub struct PgarcParser;

impl DumpParser for PgarcParser {
    fn format(&self) -> Format {
        Format::Pgarc
    }

    fn parse(&self, src: &Source<'_>, _diags: &mut Diagnostics) -> Result<Records> {
        Ok(Records::Pgarc(parse(src.text())?))
    }
}
