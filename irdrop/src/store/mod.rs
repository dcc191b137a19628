//! The SQLite store the parsed records are appended to.
//!
//! One table per [`Format`]. Columns of the `cdev` table are declared without
//! a type so that values which failed to parse as numbers keep their text.

use std::path::Path;

use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params, Connection, ToSql};

use crate::error::Result;
use crate::format::cdev::{CdevRow, ParamValue};
use crate::format::liberty::LibRow;
use crate::format::pgarc::PgarcRow;
use crate::format::spiprof::SpiprofRow;
use crate::format::{Format, Records};
use crate::io::create_dir_all;
use crate::log::{debug, info};


const SCHEMA_SQL: &str = r#"
DROP TABLE IF EXISTS cdev;
DROP TABLE IF EXISTS spiprof;
DROP TABLE IF EXISTS pgarc;
DROP TABLE IF EXISTS lib;

CREATE TABLE cdev (
    cell TEXT NOT NULL,
    temperature,
    state,
    vector,
    active_input,
    active_output,
    vpwr,
    vgnd,
    pin TEXT NOT NULL,
    esc,
    esr,
    leak,
    filename TEXT NOT NULL
);

CREATE TABLE spiprof (
    cell TEXT NOT NULL,
    vpwr REAL NOT NULL,
    c1 REAL,
    r REAL,
    c2 REAL,
    slew1 REAL,
    slew2 REAL,
    state TEXT NOT NULL,
    vector TEXT,
    active_input TEXT,
    active_output TEXT,
    pin TEXT NOT NULL,
    peak REAL,
    area REAL,
    width REAL,
    filename TEXT NOT NULL
);

CREATE TABLE pgarc (
    cell TEXT NOT NULL,
    pin TEXT NOT NULL
);

CREATE TABLE lib (
    cell TEXT NOT NULL,
    area REAL NOT NULL,
    filename TEXT NOT NULL
);
"#;

const INSERT_CDEV: &str = "INSERT INTO cdev (
    cell, temperature, state, vector, active_input, active_output,
    vpwr, vgnd, pin, esc, esr, leak, filename
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

const INSERT_SPIPROF: &str = "INSERT INTO spiprof (
    cell, vpwr, c1, r, c2, slew1, slew2, state, vector, active_input,
    active_output, pin, peak, area, width, filename
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)";

const INSERT_PGARC: &str = "INSERT INTO pgarc (cell, pin) VALUES (?1, ?2)";

const INSERT_LIB: &str = "INSERT INTO lib (cell, area, filename) VALUES (?1, ?2, ?3)";

impl ToSql for ParamValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            ParamValue::Number(value) => value.to_sql(),
            ParamValue::Text(text) => text.as_str().to_sql(),
        }
    }
}

/// An append-only relational store of parsed records.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the database at `path`.
    ///
    /// Existing tables are left untouched until [`Store::create_schema`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Drops and recreates the four tables.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        debug!("created tables {:?}", Format::ALL.map(|f| f.table()));
        Ok(())
    }

    /// Appends `records` to the table of their format and commits.
    ///
    /// Returns the number of rows inserted.
    pub fn ingest(&mut self, records: &Records) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let inserted = match records {
            Records::Cdev(rows) => insert_cdev(&tx, rows)?,
            Records::Spiprof(rows) => insert_spiprof(&tx, rows)?,
            Records::Pgarc(rows) => insert_pgarc(&tx, rows)?,
            Records::Lib(rows) => insert_lib(&tx, rows)?,
        };
        tx.commit()?;
        info!("committed {inserted} row(s) to `{}`", records.format().table());
        Ok(inserted)
    }

    /// The number of rows in the table of `format`.
    pub fn count(&self, format: Format) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", format.table());
        let count = self.conn.query_row(&sql, [], |row| row.get::<_, usize>(0))?;
        Ok(count)
    }

    /// Runs `sql` and returns every result row as dynamically typed values.
    pub fn fetch(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    #[inline]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn insert_cdev(conn: &Connection, rows: &[CdevRow]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(INSERT_CDEV)?;
    for row in rows {
        stmt.execute(params![
            row.cell.as_str(),
            row.temperature,
            row.state,
            row.vector,
            row.active_input,
            row.active_output,
            row.vpwr,
            row.vgnd,
            row.pin.as_str(),
            row.esc,
            row.esr,
            row.leak,
            row.filename.as_str(),
        ])?;
    }
    Ok(rows.len())
}

fn insert_spiprof(conn: &Connection, rows: &[SpiprofRow]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(INSERT_SPIPROF)?;
    for row in rows {
        stmt.execute(params![
            row.cell.as_str(),
            row.vpwr,
            row.c1,
            row.r,
            row.c2,
            row.slew1,
            row.slew2,
            row.state.as_str(),
            row.vector.as_deref(),
            row.active_input.as_deref(),
            row.active_output.as_deref(),
            row.pin.as_str(),
            row.peak,
            row.area,
            row.width,
            row.filename.as_str(),
        ])?;
    }
    Ok(rows.len())
}

fn insert_pgarc(conn: &Connection, rows: &[PgarcRow]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(INSERT_PGARC)?;
    for row in rows {
        stmt.execute(params![row.cell.as_str(), row.pin.as_str()])?;
    }
    Ok(rows.len())
}

fn insert_lib(conn: &Connection, rows: &[LibRow]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(INSERT_LIB)?;
    for row in rows {
        stmt.execute(params![row.cell.as_str(), row.area, row.filename.as_str()])?;
    }
    Ok(rows.len())
}
