//! Cross-view consistency checks run against the populated store.
//!
//! `pgarc` is the reference for which cells and pins exist. The checks are
//! set based, so the order records were ingested in does not matter.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use rusqlite::params;

use crate::diagnostics::{Diagnostic, DiagnosticCause, Diagnostics};
use crate::error::Result;
use crate::format::Format;
use crate::log::debug;
use crate::store::Store;
use crate::units::{voltage_variations, Quantized};


/// The views whose cell and pin coverage is checked against `pgarc`.
const VIEWS: [Format; 2] = [Format::Cdev, Format::Spiprof];

pub struct ConsistencyChecker<'a> {
    store: &'a Store,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Runs every check, returning the number of new diagnostics.
    pub fn run(&self, diags: &mut Diagnostics) -> Result<usize> {
        let before = diags.len();
        self.name_coverage(diags)?;
        self.pin_coverage(diags)?;
        self.voltage_coverage(diags)?;
        Ok(diags.len() - before)
    }

    /// Reports every pgarc cell absent from cdev or spiprof.
    pub fn name_coverage(&self, diags: &mut Diagnostics) -> Result<()> {
        for view in VIEWS {
            let sql = format!(
                "SELECT DISTINCT p.cell FROM pgarc p
                 WHERE NOT EXISTS (SELECT 1 FROM {view} v WHERE v.cell = p.cell)
                 ORDER BY p.cell",
                view = view.table()
            );
            let mut stmt = self.store.conn().prepare(&sql)?;
            let cells = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            debug!("{} pgarc cell(s) missing from {view}", cells.len());
            diags.extend(
                cells
                    .into_iter()
                    .map(|cell| Diagnostic::new(view, cell, DiagnosticCause::CellMissing)),
            );
        }
        Ok(())
    }

    /// Reports every pgarc pin absent from a view that has rows for its cell.
    pub fn pin_coverage(&self, diags: &mut Diagnostics) -> Result<()> {
        for view in VIEWS {
            let sql = format!(
                "SELECT DISTINCT p.cell, p.pin FROM pgarc p
                 WHERE EXISTS (SELECT 1 FROM {view} v WHERE v.cell = p.cell)
                   AND NOT EXISTS (
                       SELECT 1 FROM {view} v WHERE v.cell = p.cell AND v.pin = p.pin
                   )
                 ORDER BY p.cell, p.pin",
                view = view.table()
            );
            let mut stmt = self.store.conn().prepare(&sql)?;
            let pins = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            debug!("{} pgarc pin(s) missing from {view}", pins.len());
            diags.extend(pins.into_iter().map(|(cell, pin)| {
                Diagnostic::new(view, cell, DiagnosticCause::PinMissing { pin: pin.into() })
            }));
        }
        Ok(())
    }

    /// Reports every supply variation of a cdev nominal voltage that spiprof
    /// never profiled for the cell.
    ///
    /// Textual or missing nominal voltages are skipped, as are cells without
    /// spiprof rows.
    pub fn voltage_coverage(&self, diags: &mut Diagnostics) -> Result<()> {
        let conn = self.store.conn();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT c.cell, c.vpwr FROM cdev c
             WHERE typeof(c.vpwr) IN ('real', 'integer')
               AND EXISTS (SELECT 1 FROM spiprof s WHERE s.cell = c.cell)
             ORDER BY c.cell",
        )?;
        let nominals = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut voltages = conn.prepare("SELECT DISTINCT vpwr FROM spiprof WHERE cell = ?1")?;
        let mut profiled: HashMap<String, BTreeSet<Quantized>> = HashMap::new();
        for (cell, nominal) in nominals {
            let set = match profiled.entry(cell.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(
                    voltages
                        .query_map(params![cell], |row| row.get::<_, f64>(0))?
                        .map(|v| v.map(Quantized::volts))
                        .collect::<rusqlite::Result<BTreeSet<_>>>()?,
                ),
            };
            let missing: Vec<Quantized> = voltage_variations(nominal)
                .into_iter()
                .filter(|v| !set.contains(v))
                .collect();
            diags.extend(missing.into_iter().map(|voltage| {
                Diagnostic::new(
                    Format::Spiprof,
                    cell.as_str(),
                    DiagnosticCause::VoltageMissing {
                        voltage,
                        nominal: Quantized::volts(nominal),
                    },
                )
            }));
        }
        Ok(())
    }
}
