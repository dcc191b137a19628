//! Structural failures while splitting or tokenizing a dump.

use arcstr::ArcStr;
use thiserror::Error;

/// An error raised when a dump does not have the expected block structure.
///
/// These are not recoverable: a file that fails this way was produced by an
/// unexpected tool version, and the run stops at it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("no cell blocks found (expected marker `{marker}`)")]
    NoBlocks { marker: &'static str },

    #[error("cell block without a name after marker `{marker}`")]
    EmptyBlock { marker: &'static str },

    #[error("cell `{cell}`: missing `{separator}` in `{text}`")]
    MissingSeparator {
        cell: ArcStr,
        separator: &'static str,
        text: String,
    },

    #[error("cell `{cell}`: missing {what}")]
    MissingField { cell: ArcStr, what: &'static str },

    #[error("cell `{cell}`: cannot parse `{text}` as a number")]
    InvalidNumber { cell: ArcStr, text: String },

    #[error("cell `{cell}`: no area attribute")]
    MissingArea { cell: ArcStr },

    #[error("cell `{cell}`: malformed row `{text}`: {reason}")]
    MalformedRow {
        cell: ArcStr,
        text: String,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ParseError>;
