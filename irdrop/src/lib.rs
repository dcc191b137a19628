//! Ingestion and cross-view validation of IR drop characterization dumps.
//!
//! Four dump formats describe the same standard cells from different angles:
//! capacitance/leakage (`cdev`), switching-current profiles (`spiprof`),
//! power/ground connectivity (`pgarc`) and Liberty area (`lib`). Each is parsed
//! into flat records, appended to a SQLite store, and checked for unit
//! correctness and agreement between views.

pub mod check;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod io;
pub mod run;
pub mod store;
pub mod units;

pub(crate) mod log;

pub use config::RunConfig;
pub use diagnostics::Diagnostics;
pub use error::{IrDropError, Result};
pub use run::{run, RunSummary};
