//! Expected physical units per dump format, and fixed-precision voltages.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Key under which a table registers the unit of supply and pin voltages.
pub const VOLTAGE: &str = "voltage";

/// Number of decimals kept when comparing supply voltages across views.
pub const VOLTAGE_DECIMALS: u32 = 4;

/// Fractions of the nominal supply at which every cell must be profiled.
pub const VOLTAGE_VARIATIONS: [f64; 7] = [0.88, 0.92, 0.96, 1.00, 1.05, 1.10, 1.15];

const CDEV_UNITS: &[(&str, &str)] = &[
    (VOLTAGE, "V"),
    ("esc", "F"),
    ("esr", "ohm"),
    ("leak", "A"),
    ("Temperature", "C"),
];

const SPIPROF_UNITS: &[(&str, &str)] = &[
    (VOLTAGE, "V"),
    ("C1", "F"),
    ("R", "Ohm"),
    ("C2", "F"),
    ("Slew1", "S"),
    ("Slew2", "S"),
    ("peak", "A"),
    ("area", "C"),
    ("width", "S"),
];

/// A static mapping from variable name to its expected unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UnitTable {
    entries: &'static [(&'static str, &'static str)],
}

/// The result of checking a unit against a [`UnitTable`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UnitCheck {
    Ok,
    /// The variable has no registered unit.
    Unknown,
    Mismatch {
        expected: &'static str,
    },
}

impl UnitTable {
    #[inline]
    pub const fn cdev() -> Self {
        Self {
            entries: CDEV_UNITS,
        }
    }

    #[inline]
    pub const fn spiprof() -> Self {
        Self {
            entries: SPIPROF_UNITS,
        }
    }

    /// Returns the expected unit of `name`, if the table knows it.
    pub fn expected(&self, name: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(var, _)| *var == name)
            .map(|(_, unit)| *unit)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.expected(name).is_some()
    }

    pub fn check(&self, name: &str, unit: &str) -> UnitCheck {
        match self.expected(name) {
            None => UnitCheck::Unknown,
            Some(expected) if expected == unit => UnitCheck::Ok,
            Some(expected) => UnitCheck::Mismatch { expected },
        }
    }
}

/// A real value rounded to a fixed number of decimals.
///
/// Two quantized values compare equal exactly when their inputs agree after
/// rounding, which makes them usable as set and map keys.
#[derive(
    Copy, Clone, Default, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Quantized {
    value: i64,
    decimals: u32,
}

impl Quantized {
    pub fn with_decimals(value: f64, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        Self {
            value: (value * scale).round() as i64,
            decimals,
        }
    }

    /// Quantizes a voltage to [`VOLTAGE_DECIMALS`] places.
    #[inline]
    pub fn volts(value: f64) -> Self {
        Self::with_decimals(value, VOLTAGE_DECIMALS)
    }

    #[inline]
    pub fn raw(&self) -> i64 {
        self.value
    }
}

impl From<Quantized> for f64 {
    #[inline]
    fn from(value: Quantized) -> Self {
        value.value as f64 / 10f64.powi(value.decimals as i32)
    }
}

impl Display for Quantized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let precision = self.decimals as usize;
        write!(f, "{:.*}", precision, f64::from(*self))
    }
}

/// The supply voltages required for a cell characterized at `nominal`.
pub fn voltage_variations(nominal: f64) -> [Quantized; 7] {
    VOLTAGE_VARIATIONS.map(|frac| Quantized::volts(frac * nominal))
}

#[cfg(test)]
mod tests {
    use float_eq::float_eq;

    use super::*;

    #[test]
    fn test_cdev_units() {
        let table = UnitTable::cdev();
        assert_eq!(table.check("esr", "ohm"), UnitCheck::Ok);
        assert_eq!(
            table.check("esr", "F"),
            UnitCheck::Mismatch { expected: "ohm" }
        );
        assert_eq!(table.check("VPWR", "V"), UnitCheck::Unknown);
        assert_eq!(table.expected(VOLTAGE), Some("V"));
    }

    #[test]
    fn test_spiprof_units_are_case_sensitive() {
        let table = UnitTable::spiprof();
        assert_eq!(table.check("R", "Ohm"), UnitCheck::Ok);
        assert_eq!(table.check("R", "ohm"), UnitCheck::Mismatch { expected: "Ohm" });
        assert!(!table.contains("esr"));
    }

    #[test]
    fn test_quantized_voltage() {
        assert_eq!(Quantized::volts(0.88), Quantized::volts(0.88 * 1.0));
        assert_eq!(Quantized::volts(1.05 * 0.8), Quantized::volts(0.84));
        assert_ne!(Quantized::volts(0.8801), Quantized::volts(0.88));
        assert_eq!(Quantized::volts(0.88000004), Quantized::volts(0.88));
        assert!(float_eq!(f64::from(Quantized::volts(0.9612)), 0.9612, r2nd <= 1e-12));
        assert_eq!(format!("{}", Quantized::volts(1.1)), "1.1000");
    }

    #[test]
    fn test_voltage_variations() {
        let expected = [0.88, 0.92, 0.96, 1.0, 1.05, 1.1, 1.15].map(Quantized::volts);
        assert_eq!(voltage_variations(1.0), expected);
        let scaled = voltage_variations(0.8);
        assert_eq!(scaled[0], Quantized::volts(0.704));
        assert_eq!(scaled[6], Quantized::volts(0.92));
    }
}
