//! Run configuration: where the store and report go, and which files to ingest.
//!
//! ```toml
//! database = "redhawk.db"
//! report = "irdrop_errors.txt"
//!
//! [[inputs]]
//! format = "cdev"
//! path = "PVT1.cdev"
//! ```

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, ErrorSource, IrDropError, Result};
use crate::format::Format;

pub const DEFAULT_DATABASE: &str = "redhawk.db";
pub const DEFAULT_REPORT: &str = "irdrop_errors.txt";

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

fn default_report() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT)
}

/// One file to ingest, and the format to parse it as.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct InputFile {
    pub format: Format,
    pub path: PathBuf,
}

impl InputFile {
    pub fn new(format: Format, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: path.into(),
        }
    }

    /// Creates an input whose format is inferred from the file extension.
    pub fn infer(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = Format::from_path(&path).ok_or_else(|| {
            ErrorSource::UnknownFormat(format!(
                "cannot infer the format of {path:?} from its extension"
            ))
        })?;
        Ok(Self { format, path })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Builder, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct RunConfig {
    /// The SQLite database the records are written to.
    ///
    /// Its tables are dropped and recreated at the start of every run.
    #[builder(default = "default_database()", setter(into))]
    #[serde(default = "default_database")]
    database: PathBuf,
    /// The file diagnostics are written to, one per line.
    #[builder(default = "default_report()", setter(into))]
    #[serde(default = "default_report")]
    report: PathBuf,
    /// Files to ingest, in order.
    #[builder(default, setter(each(name = "input")))]
    #[serde(default)]
    inputs: Vec<InputFile>,
}

impl RunConfigBuilder {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let (Some(database), Some(report)) = (&self.database, &self.report) {
            if database == report {
                return Err(format!(
                    "database and report must be different files, both are {database:?}"
                ));
            }
        }
        Ok(())
    }
}

impl RunConfig {
    #[inline]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    #[inline]
    pub fn database(&self) -> &Path {
        &self.database
    }

    #[inline]
    pub fn report(&self) -> &Path {
        &self.report
    }

    #[inline]
    pub fn inputs(&self) -> &[InputFile] {
        &self.inputs
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file.
    ///
    /// Relative paths in the file are resolved against the directory the file
    /// is in.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = crate::io::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text).map_err(|err| {
            err.with_context(ErrorContext::Task(
                format!("loading config {:?}", path).into(),
            ))
        })?;
        if let Some(dir) = path.parent() {
            config.resolve_relative_to(dir);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        resolve(&mut self.database);
        resolve(&mut self.report);
        self.inputs.iter_mut().for_each(|input| resolve(&mut input.path));
    }

    fn validate(&self) -> Result<()> {
        if self.database == self.report {
            return Err(IrDropError::new(ErrorSource::InvalidConfig(format!(
                "database and report must be different files, both are {:?}",
                self.database
            ))));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            report: default_report(),
            inputs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = RunConfig::builder()
            .input(InputFile::new(Format::Cdev, "a.cdev"))
            .input(InputFile::new(Format::Lib, "b.lib"))
            .build()
            .unwrap();
        assert_eq!(config.database(), Path::new(DEFAULT_DATABASE));
        assert_eq!(config.report(), Path::new(DEFAULT_REPORT));
        assert_eq!(config.inputs().len(), 2);
        assert_eq!(config.inputs()[1].format, Format::Lib);
    }

    #[test]
    fn test_builder_rejects_shared_output() {
        let err = RunConfig::builder()
            .database("out.txt")
            .report("out.txt")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must be different"));
    }

    #[test]
    fn test_from_toml_str() {
        let config = RunConfig::from_toml_str(
            r#"
            report = "errors.txt"

            [[inputs]]
            format = "spiprof"
            path = "PVT1.spiprof"

            [[inputs]]
            format = "pgarc"
            path = "cells.pgarc"
            "#,
        )
        .unwrap();
        assert_eq!(config.database(), Path::new(DEFAULT_DATABASE));
        assert_eq!(config.report(), Path::new("errors.txt"));
        assert_eq!(
            config.inputs(),
            &[
                InputFile::new(Format::Spiprof, "PVT1.spiprof"),
                InputFile::new(Format::Pgarc, "cells.pgarc"),
            ]
        );
    }

    #[test]
    fn test_unknown_format_in_toml() {
        let err = RunConfig::from_toml_str(
            r#"
            [[inputs]]
            format = "gds"
            path = "x.gds"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err.source(), ErrorSource::TomlParsing(_)));
    }

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let dir = TempDir::new("irdrop_config").unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            "database = \"/tmp/abs.db\"\n[[inputs]]\nformat = \"lib\"\npath = \"cells.lib\"\n",
        )
        .unwrap();

        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.database(), Path::new("/tmp/abs.db"));
        assert_eq!(config.report(), dir.path().join(DEFAULT_REPORT));
        assert_eq!(config.inputs()[0].path, dir.path().join("cells.lib"));
    }

    #[test]
    fn test_infer_input_format() {
        assert_eq!(
            InputFile::infer("dumps/PVT1.spiprof").unwrap(),
            InputFile::new(Format::Spiprof, "dumps/PVT1.spiprof")
        );
        assert_eq!(InputFile::infer("cells.LIB").unwrap().format, Format::Lib);
        assert!(InputFile::infer("notes.txt").is_err());
        assert!(InputFile::infer("Makefile").is_err());
    }
}
