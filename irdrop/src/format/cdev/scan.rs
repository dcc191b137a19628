//! Grouping of cdev cell lines into parameter/pin sub-blocks.
//!
//! A cell body alternates between runs of parameter lines and runs of pin
//! lines, with no explicit delimiter between groups. A group ends when a pin
//! run is followed by a parameter line.

use std::ops::Range;

/// The token that opens every pin-level line.
pub const PIN_TOKEN: &str = "pin = ";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LineKind {
    Param,
    Pin,
    Blank,
}

impl LineKind {
    pub fn of(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            LineKind::Blank
        } else if line.starts_with(PIN_TOKEN) {
            LineKind::Pin
        } else {
            LineKind::Param
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
enum State {
    #[default]
    Param,
    Pin,
}

#[derive(Debug, Default)]
struct Scanner {
    state: State,
    start: Option<usize>,
    groups: Vec<Range<usize>>,
}

impl Scanner {
    fn feed(&mut self, idx: usize, kind: LineKind) {
        match (self.state, kind) {
            // Blank lines never change state or open a group.
            (_, LineKind::Blank) => {}
            (State::Pin, LineKind::Param) => {
                if let Some(start) = self.start.replace(idx) {
                    self.groups.push(start..idx);
                }
                self.state = State::Param;
            }
            (_, kind) => {
                self.start.get_or_insert(idx);
                self.state = match kind {
                    LineKind::Pin => State::Pin,
                    _ => State::Param,
                };
            }
        }
    }

    fn finish(mut self, len: usize) -> Vec<Range<usize>> {
        if let Some(start) = self.start {
            self.groups.push(start..len);
        }
        self.groups
    }
}

/// Returns the line ranges of each sub-block in `lines`.
///
/// Ranges are contiguous, in order, and never start on a blank line. A body
/// made only of blank lines has no sub-blocks.
pub fn scan_sub_blocks<S: AsRef<str>>(lines: &[S]) -> Vec<Range<usize>> {
    let mut scanner = Scanner::default();
    for (idx, line) in lines.iter().enumerate() {
        scanner.feed(idx, LineKind::of(line.as_ref()));
    }
    scanner.finish(lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_kind() {
        assert_eq!(LineKind::of("   pin = VPWR, esc = 1 F"), LineKind::Pin);
        assert_eq!(LineKind::of("Temperature = 25 C ; state = rise"), LineKind::Param);
        assert_eq!(LineKind::of("   \t"), LineKind::Blank);
        assert_eq!(LineKind::of("pinned = 3"), LineKind::Param);
    }

    #[test]
    fn test_interleaved_groups() {
        let lines = [
            "Temperature = 25 C",
            "  pin = VPWR, esc = 1 F",
            "  pin = VGND, esc = 2 F",
            "Temperature = 125 C",
            "state = fall",
            "  pin = VPWR, esc = 3 F",
        ];
        assert_eq!(scan_sub_blocks(&lines), vec![0..3, 3..6]);
    }

    #[test]
    fn test_blank_lines_do_not_split() {
        let lines = [
            "",
            "Temperature = 25 C",
            "",
            "  pin = VPWR, esc = 1 F",
            "",
            "  pin = VGND, esc = 2 F",
            "",
        ];
        assert_eq!(scan_sub_blocks(&lines), vec![1..7]);
    }

    #[test]
    fn test_leading_pins_and_empty_body() {
        let lines = ["  pin = A, esc = 1 F", "VPWR = 1 V", "  pin = B, esc = 1 F"];
        assert_eq!(scan_sub_blocks(&lines), vec![0..1, 1..3]);

        let empty: [&str; 2] = ["", "  "];
        assert!(scan_sub_blocks(&empty).is_empty());
    }
}
