use arcstr::ArcStr;
use float_eq::float_eq;

use super::*;
use crate::diagnostics::Diagnostics;

const SPIPROF_AND2: &str = r#"Info: spiprof dump
cell: and2_1x (combinational)

   VPWR = 1.0 V ; C1 = 0 F ; R = 0 Ohm ; C2 = 1e-15 F ; Slew1 = 1.25e-11 S ; Slew2 = 7.5e-12 S ;
      state = output_rise ; vector = 1 ; active_input = A ; active_output = Y ;
         pin   peak   area   width
      VPWR -1.2e-3 A 3e-15 C 2e-11 S
      VGND 1.1e-3 A 2.9e-15 C 2e-11 S
      state = output_fall ; vector = 2 ; active_input = A ; active_output = Y ;
         pin   peak   area   width
      VPWR -1.0e-3 A 2e-15 C 1e-11 S

   VPWR = 0.88 V ; C1 = 0 F ; R = 0 Ohm ; C2 = 5e-15 F ; Slew1 = 1.25e-11 S ; Slew2 = 7.5e-12 S ;
      state = output_rise ; vector = 1 ; active_input = A ; active_output = Y ;
         pin   peak   area   width
      VPWR -0.9e-3 A 2.5e-15 C 2e-11 S
Info: Done
"#;

const SPIPROF_DFF: &str = r#"cell: dff_1x

   VPWR = 1.0 V ; C1 = 0 F ; R = 0 ohm ; C2 = 1e-15 F ; Slew1 = 1.25e-11 S ; Slew2 = 7.5e-12 ;
      state = output_rise ; vector = 1 ; active_input = CLK ; active_output = Q ;
         pin   peak   area   width
      VPWR -1.2e-3 A 3e-15 F 2e-11 S
      state = output_fall ; vector = 2 ; active_input = CLK ; active_output = Q ;
         pin   peak   area   width
      VPWR -1.0e-3 A 2e-15 C 1e-11 S
"#;

fn filename() -> ArcStr {
    arcstr::literal!("PVT1.spiprof")
}

#[test]
fn test_rows_carry_group_and_state_fields() {
    let mut diags = Diagnostics::new();
    let rows = parse(SPIPROF_AND2, &filename(), &mut diags).unwrap();
    assert!(diags.is_empty(), "{:?}", diags);
    assert_eq!(rows.len(), 4);

    let first = &rows[0];
    assert_eq!(first.cell, "and2_1x");
    assert!(float_eq!(first.vpwr, 1.0, r2nd <= 1e-12));
    assert_eq!(first.c1, Some(0.0));
    assert_eq!(first.r, Some(0.0));
    assert_eq!(first.c2, Some(1e-15));
    assert_eq!(first.slew1, Some(1.25e-11));
    assert_eq!(first.slew2, Some(7.5e-12));
    assert_eq!(first.state, "output_rise");
    assert_eq!(first.vector.as_deref(), Some("1"));
    assert_eq!(first.active_input.as_deref(), Some("A"));
    assert_eq!(first.active_output.as_deref(), Some("Y"));
    assert_eq!(first.pin, "VPWR");
    assert_eq!(first.peak, Some(-1.2e-3));
    assert_eq!(first.area, Some(3e-15));
    assert_eq!(first.width, Some(2e-11));
    assert_eq!(first.filename, "PVT1.spiprof");

    assert_eq!(rows[1].pin, "VGND");
    assert_eq!(rows[2].state, "output_fall");
    assert_eq!(rows[3].c2, Some(5e-15));
    assert!(float_eq!(rows[3].vpwr, 0.88, r2nd <= 1e-12));
}

#[test]
fn test_sequential_cell_needs_four_states() {
    let mut diags = Diagnostics::new();
    let rows = parse(SPIPROF_DFF, &filename(), &mut diags).unwrap();
    // Both states are still emitted.
    assert_eq!(rows.len(), 2);
    assert_eq!(diags.count_matching("distinct states"), 1);
    assert!(diags
        .iter()
        .any(|d| d == "spiprof: cell `dff_1x` has 2 distinct states, expected 4"));
}

#[test]
fn test_combinational_cell_needs_two_states() {
    let mut diags = Diagnostics::new();
    parse(SPIPROF_AND2, &filename(), &mut diags).unwrap();
    assert_eq!(diags.count_matching("distinct states"), 0);

    assert_eq!(expected_states("and2_1x"), 2);
    assert_eq!(expected_states("sdffrq_2x"), 4);
    assert_eq!(expected_states("latchq_1x"), 4);
    assert_eq!(expected_states("mux_dff"), 2);
}

#[test]
fn test_unit_diagnostics() {
    let mut diags = Diagnostics::new();
    parse(SPIPROF_DFF, &filename(), &mut diags).unwrap();

    assert!(diags.iter().any(|d| d
        == "spiprof: unit mismatch for `R` in cell `dff_1x`: expected `Ohm`, found `ohm`"));
    assert!(diags
        .iter()
        .any(|d| d == "spiprof: missing unit for `Slew2` in cell `dff_1x`: expected `S`"));
    assert!(diags.iter().any(|d| d
        == "spiprof: unit mismatch for `area` in cell `dff_1x`: expected `C`, found `F`"));
    assert_eq!(diags.len(), 4);
}

#[test]
fn test_missing_header_separator_is_structural() {
    let text = "cell: inv_1x\n\n   VPWR = 1.0 V ; C1 = 0 F\n";
    let mut diags = Diagnostics::new();
    let err = parse(text, &filename(), &mut diags).unwrap_err();
    assert!(matches!(
        err,
        ParseError::MissingSeparator {
            separator: HEADER_SEPARATOR,
            ..
        }
    ));
}

#[test]
fn test_short_row_is_structural() {
    let text = "cell: inv_1x\n\n   VPWR = 1.0 V ;\n      state = rise ;\n   pin peak area\n   VPWR 1 A\n";
    let mut diags = Diagnostics::new();
    let err = parse(text, &filename(), &mut diags).unwrap_err();
    assert!(matches!(err, ParseError::MalformedRow { .. }));
}

#[test]
fn test_state_chunks() {
    let body = "ignored\n  state = a ;\n labels\n row\n  state = b ;\n labels\n";
    let chunks = state_chunks(body);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], vec!["state = a ;", " labels", " row"]);
    assert_eq!(chunks[1][0], "state = b ;");
}
