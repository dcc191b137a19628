//! Parsers for the four dump formats.
//!
//! Every format implements [`DumpParser`], turning the full text of one file
//! into flat [`Records`] ready for the store. Unit and structure findings that
//! should not stop the run go to [`Diagnostics`]; anything that breaks the
//! expected block structure is returned as a [`ParseError`].

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::ErrorSource;
use self::error::ParseError;

pub mod cdev;
pub mod error;
pub(crate) mod field;
pub mod liberty;
pub mod pgarc;
pub mod spiprof;

/// One of the four dump formats, which doubles as the name of its table.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Cdev,
    Spiprof,
    Pgarc,
    Lib,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Cdev, Format::Spiprof, Format::Pgarc, Format::Lib];

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Format::Cdev => "cdev",
            Format::Spiprof => "spiprof",
            Format::Pgarc => "pgarc",
            Format::Lib => "lib",
        }
    }

    /// The table the records of this format are stored in.
    #[inline]
    pub fn table(&self) -> &'static str {
        self.name()
    }

    pub fn parser(&self) -> Box<dyn DumpParser> {
        match self {
            Format::Cdev => Box::new(cdev::CdevParser),
            Format::Spiprof => Box::new(spiprof::SpiprofParser),
            Format::Pgarc => Box::new(pgarc::PgarcParser),
            Format::Lib => Box::new(liberty::LibParser),
        }
    }

    /// Infers the format of `path` from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Format {
    type Err = ErrorSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ErrorSource::UnknownFormat(s.to_string()))
    }
}

/// The full text of one input file.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    filename: ArcStr,
    text: &'a str,
}

impl<'a> Source<'a> {
    pub fn new(filename: impl Into<ArcStr>, text: &'a str) -> Self {
        Self {
            filename: filename.into(),
            text,
        }
    }

    pub fn from_path(path: impl AsRef<Path>, text: &'a str) -> Self {
        Self::new(&*path.as_ref().to_string_lossy(), text)
    }

    #[inline]
    pub fn filename(&self) -> &ArcStr {
        &self.filename
    }

    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }
}

/// Parsed rows of a single file, tagged by format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Records {
    Cdev(Vec<cdev::CdevRow>),
    Spiprof(Vec<spiprof::SpiprofRow>),
    Pgarc(Vec<pgarc::PgarcRow>),
    Lib(Vec<liberty::LibRow>),
}

impl Records {
    pub fn format(&self) -> Format {
        match self {
            Records::Cdev(_) => Format::Cdev,
            Records::Spiprof(_) => Format::Spiprof,
            Records::Pgarc(_) => Format::Pgarc,
            Records::Lib(_) => Format::Lib,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Records::Cdev(rows) => rows.len(),
            Records::Spiprof(rows) => rows.len(),
            Records::Pgarc(rows) => rows.len(),
            Records::Lib(rows) => rows.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A parser for one dump format.
pub trait DumpParser {
    fn format(&self) -> Format;

    /// Parses the whole of `src`, reporting non-fatal findings to `diags`.
    fn parse(&self, src: &Source<'_>, diags: &mut Diagnostics) -> Result<Records, ParseError>;
}

/// Splits `text` on `marker`, dropping everything before the first marker.
pub(crate) fn cell_blocks<'a>(text: &'a str, marker: &'static str) -> impl Iterator<Item = &'a str> {
    text.split(marker).skip(1)
}
