use std::path::PathBuf;

use clap::Parser;
use irdrop::config::{InputFile, RunConfig};
use irdrop::error::{ErrorSource, IrDropError};
use irdrop::format::Format;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Ingest IR drop characterization dumps into SQLite and cross-check them"
)]
pub struct Args {
    /// A TOML run configuration. Cannot be combined with input flags.
    #[arg(short, long, conflicts_with_all = ["cdev", "spiprof", "pgarc", "lib", "files", "database", "report"])]
    pub config: Option<PathBuf>,
    /// The SQLite database to (re)create.
    #[arg(short, long)]
    pub database: Option<PathBuf>,
    /// Where to write diagnostics.
    #[arg(short, long)]
    pub report: Option<PathBuf>,
    /// Capacitance/leakage dumps.
    #[arg(long)]
    pub cdev: Vec<PathBuf>,
    /// Switching current profiles.
    #[arg(long)]
    pub spiprof: Vec<PathBuf>,
    /// Power/ground arc lists.
    #[arg(long)]
    pub pgarc: Vec<PathBuf>,
    /// Liberty libraries.
    #[arg(long)]
    pub lib: Vec<PathBuf>,
    /// Input files whose format is inferred from their extension.
    pub files: Vec<PathBuf>,
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// The inputs named on the command line.
    ///
    /// Per-format flags come first (cdev, spiprof, pgarc, lib), then the
    /// positional files, each in the order given.
    pub fn inputs(&self) -> irdrop::Result<Vec<InputFile>> {
        let flagged = [
            (Format::Cdev, &self.cdev),
            (Format::Spiprof, &self.spiprof),
            (Format::Pgarc, &self.pgarc),
            (Format::Lib, &self.lib),
        ]
        .into_iter()
        .flat_map(|(format, paths)| paths.iter().map(move |p| InputFile::new(format, p)));

        let mut inputs: Vec<InputFile> = flagged.collect();
        for path in self.files.iter() {
            inputs.push(InputFile::infer(path)?);
        }
        Ok(inputs)
    }

    pub fn run_config(&self) -> irdrop::Result<RunConfig> {
        if let Some(path) = &self.config {
            return RunConfig::from_file(path);
        }

        let mut builder = RunConfig::builder();
        builder.inputs(self.inputs()?);
        if let Some(database) = &self.database {
            builder.database(database);
        }
        if let Some(report) = &self.report {
            builder.report(report);
        }
        builder
            .build()
            .map_err(|err| IrDropError::new(ErrorSource::InvalidConfig(err.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_inputs_from_flags_and_files() {
        let args = Args::parse_from([
            "irdrop_check",
            "--lib",
            "cells.lib",
            "--cdev",
            "a.cdev",
            "--cdev",
            "b.cdev",
            "PVT1.spiprof",
        ]);
        let inputs = args.inputs().unwrap();
        assert_eq!(
            inputs,
            vec![
                InputFile::new(Format::Cdev, "a.cdev"),
                InputFile::new(Format::Cdev, "b.cdev"),
                InputFile::new(Format::Lib, "cells.lib"),
                InputFile::new(Format::Spiprof, "PVT1.spiprof"),
            ]
        );
    }

    #[test]
    fn test_run_config_overrides() {
        let args = Args::parse_from(["irdrop_check", "-d", "out/x.db", "cells.pgarc"]);
        let config = args.run_config().unwrap();
        assert_eq!(config.database(), Path::new("out/x.db"));
        assert_eq!(config.report(), Path::new(irdrop::config::DEFAULT_REPORT));
        assert_eq!(config.inputs().len(), 1);
    }

    #[test]
    fn test_config_conflicts_with_inputs() {
        let res = Args::try_parse_from(["irdrop_check", "-c", "run.toml", "--lib", "x.lib"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_unknown_extension() {
        let args = Args::parse_from(["irdrop_check", "notes.txt"]);
        assert!(args.run_config().is_err());
    }
}
