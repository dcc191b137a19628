//! The top-level run: ingest every input in order, check, then report.

use std::collections::BTreeMap;
use std::path::Path;

use itertools::Itertools;

use crate::check::ConsistencyChecker;
use crate::config::{InputFile, RunConfig};
use crate::diagnostics::{Diagnostics, Outcome};
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::format::{Format, Source};
use crate::log::{info, Log};
use crate::store::Store;

/// What a completed run did.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RunSummary {
    /// Number of input files ingested.
    pub files: usize,
    /// Rows inserted per table.
    pub rows: BTreeMap<Format, usize>,
    /// Number of distinct diagnostics reported.
    pub diagnostics: usize,
    pub outcome: Outcome,
}

impl Log for RunSummary {
    fn log(&self) {
        let rows = self
            .rows
            .iter()
            .map(|(format, n)| format!("{format}: {n}"))
            .join(", ");
        info!("ingested {} file(s) ({rows})", self.files);
        self.outcome.log();
    }
}

/// Reads, parses and stores a single file, returning the number of rows
/// committed.
///
/// A structural failure leaves the store as it was before the call.
pub fn ingest_file(store: &mut Store, input: &InputFile, diags: &mut Diagnostics) -> Result<usize> {
    let InputFile { format, path } = input;
    info!("parsing {format} file {}", path.display());
    let text = crate::io::read_to_string(path)?;
    let src = Source::from_path(path, &text);
    let records = with_err_context(format.parser().parse(&src, diags), || {
        ErrorContext::ParseFile {
            format: *format,
            path: path.clone(),
        }
    })?;
    with_err_context(store.ingest(&records), || ErrorContext::Ingest {
        format: *format,
        path: path.clone(),
    })
}

/// Runs the whole pipeline described by `config`.
///
/// The store is reset first. Files are ingested in order and each is
/// committed before the next is read, so a structural failure stops the run
/// with earlier files kept. The diagnostic report is only written when the
/// run completes.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    if config.inputs().is_empty() {
        return Err(ErrorSource::NoInputs.into());
    }

    let mut store = open_store(config.database())?;
    let mut diags = Diagnostics::new();
    let mut rows: BTreeMap<Format, usize> = BTreeMap::new();

    for input in config.inputs() {
        let inserted = ingest_file(&mut store, input, &mut diags)?;
        *rows.entry(input.format).or_default() += inserted;
    }

    let found = ConsistencyChecker::new(&store).run(&mut diags)?;
    info!("consistency checks raised {found} diagnostic(s)");

    let outcome = diags.flush(config.report())?;
    let summary = RunSummary {
        files: config.inputs().len(),
        rows,
        diagnostics: diags.len(),
        outcome,
    };
    summary.log();
    Ok(summary)
}

fn open_store(path: &Path) -> Result<Store> {
    let store = with_err_context(Store::open(path), || {
        ErrorContext::Task(format!("opening database {:?}", path).into())
    })?;
    store.create_schema()?;
    Ok(store)
}
