//! Deduplicated, non-fatal findings collected over one run.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use arcstr::ArcStr;

use crate::error::{with_err_context, ErrorContext, Result};
use crate::format::Format;
use crate::io::{create_file, remove_stale};
use crate::log::Log;
use crate::units::Quantized;

/// A single semantic finding about one cell.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Diagnostic {
    format: Format,
    cell: ArcStr,
    cause: DiagnosticCause,
}

/// An enumeration of causes for a [`Diagnostic`].
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum DiagnosticCause {
    /// A value carries a unit other than the one registered for its variable.
    UnitMismatch {
        variable: ArcStr,
        expected: &'static str,
        found: ArcStr,
    },
    /// A value that must carry a unit has none.
    MissingUnit {
        variable: ArcStr,
        expected: &'static str,
    },
    /// A variable is neither registered in the unit table nor a known pin.
    UnknownVariable {
        variable: ArcStr,
        unit: Option<ArcStr>,
    },
    /// The number of distinct states profiled for a cell is wrong.
    StateCount { expected: usize, found: usize },
    /// A cell listed in pgarc has no rows in this view.
    CellMissing,
    /// A pin listed in pgarc for the cell is absent from this view.
    PinMissing { pin: ArcStr },
    /// A required supply voltage variation was never profiled.
    VoltageMissing {
        voltage: Quantized,
        nominal: Quantized,
    },
}

impl Diagnostic {
    pub fn new(format: Format, cell: impl Into<ArcStr>, cause: DiagnosticCause) -> Self {
        Self {
            format,
            cell: cell.into(),
            cause,
        }
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    #[inline]
    pub fn cell(&self) -> &ArcStr {
        &self.cell
    }

    #[inline]
    pub fn cause(&self) -> &DiagnosticCause {
        &self.cause
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use DiagnosticCause::*;
        let cell = &self.cell;
        write!(f, "{}: ", self.format)?;
        match &self.cause {
            UnitMismatch {
                variable,
                expected,
                found,
            } => write!(
                f,
                "unit mismatch for `{variable}` in cell `{cell}`: expected `{expected}`, found `{found}`"
            ),
            MissingUnit { variable, expected } => write!(
                f,
                "missing unit for `{variable}` in cell `{cell}`: expected `{expected}`"
            ),
            UnknownVariable {
                variable,
                unit: Some(unit),
            } => write!(
                f,
                "unknown variable `{variable}` with unit `{unit}` in cell `{cell}`"
            ),
            UnknownVariable {
                variable,
                unit: None,
            } => write!(f, "unknown variable `{variable}` in cell `{cell}`"),
            StateCount { expected, found } => write!(
                f,
                "cell `{cell}` has {found} distinct states, expected {expected}"
            ),
            CellMissing => write!(f, "cell `{cell}` is listed in pgarc but has no rows"),
            PinMissing { pin } => write!(
                f,
                "pin `{pin}` is listed in pgarc for cell `{cell}` but has no rows"
            ),
            VoltageMissing { voltage, nominal } => write!(
                f,
                "cell `{cell}` is missing spiprof voltage {voltage} V (nominal {nominal} V)"
            ),
        }
    }
}

impl Log for Diagnostic {
    fn log(&self) {
        use crate::log::warn;
        warn!("{self}");
    }
}

/// The collector every parser and check reports into.
///
/// Entries are kept as formatted text, so a finding raised twice with the same
/// wording is stored once.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: BTreeSet<String>,
}

/// What [`Diagnostics::flush`] did with the collected entries.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    Clean,
    Reported { path: PathBuf, count: usize },
}

impl Diagnostics {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `diag`, returning `true` if it was not already present.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        let inserted = self.entries.insert(diag.to_string());
        if inserted {
            diag.log();
        }
        inserted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }

    /// Returns the number of entries containing `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.iter().filter(|e| e.contains(needle)).count()
    }

    /// Writes the collected entries to `report`, one per line.
    ///
    /// Nothing is written when no entries were collected; a report left over
    /// from an earlier run is removed instead.
    pub fn flush(&self, report: impl AsRef<Path>) -> Result<Outcome> {
        let path = report.as_ref();
        if self.is_empty() {
            remove_stale(path)?;
            return Ok(Outcome::Clean);
        }

        let mut file = create_file(path)?;
        for entry in self.iter() {
            with_err_context(writeln!(file, "{entry}"), || {
                ErrorContext::CreateFile(path.to_path_buf())
            })?;
        }
        Ok(Outcome::Reported {
            path: path.to_path_buf(),
            count: self.len(),
        })
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        for diag in iter {
            self.push(diag);
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Clean => write!(f, "No errors found"),
            Outcome::Reported { path, count } => {
                write!(f, "{count} error(s) found, see {}", path.display())
            }
        }
    }
}

impl Log for Outcome {
    fn log(&self) {
        use crate::log::{error, info};
        match self {
            Outcome::Clean => info!("{self}"),
            Outcome::Reported { .. } => error!("{self}"),
        }
    }
}
