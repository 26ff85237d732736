//! End-to-end runs: fail-fast ordering and the healthy path.

use etest::adapters::sim::BoardFaults;
use etest::app::ports::LogLevel;
use etest::error::{Fault, LineFault, Stage, UsbLine};
use etest::patterns::coverage_suite;

use crate::bench::Bench;

#[test]
fn healthy_board_passes_with_no_error_log() {
    let mut bench = Bench::healthy();
    let result = bench.test.run_board(&mut bench.target, &mut bench.jig);

    assert_eq!(result, Ok(()));
    assert!(bench.board.errors().is_empty());
    assert_eq!(bench.board.port_writes(), coverage_suite().to_vec());
    assert_eq!(bench.board.digital_reads(), 4 * 42, "all four USB passes ran");
    assert_eq!(bench.board.supply_duty(), 255, "passing board stays powered");
}

#[test]
fn healthy_run_logs_each_stage_in_order() {
    let mut bench = Bench::healthy();
    bench
        .test
        .run_board(&mut bench.target, &mut bench.jig)
        .unwrap();

    let lines: Vec<String> = bench.board.log().into_iter().map(|(_, l)| l).collect();
    assert_eq!(
        lines,
        vec![
            "ETEST: Enabling power supply",
            "ETEST: Beginning electrical test",
            "ETEST: Testing USB connections",
            "ETEST: Testing data output patterns",
            "ETEST: Successfully completed electrical test",
        ]
    );
    assert!(bench.board.log().iter().all(|(level, _)| *level == LogLevel::Info));
}

#[test]
fn run_all_on_powered_board_completes() {
    let mut bench = Bench::healthy();
    bench.test.power_on(&mut bench.target, &mut bench.jig).unwrap();
    assert_eq!(bench.test.run_all(&mut bench.target, &mut bench.jig), Ok(()));
}

#[test]
fn data_line_short_stops_in_usb_stage_before_patterns() {
    let faults = BoardFaults {
        data_lines_shorted: true,
        ..BoardFaults::default()
    };
    let mut bench = Bench::with_faults(faults);
    let failure = bench
        .test
        .run_board(&mut bench.target, &mut bench.jig)
        .unwrap_err();

    assert_eq!(failure.stage, Stage::UsbConnections);
    assert_eq!(
        failure.fault,
        Fault::DataLine {
            line: UsbLine::DMinus,
            fault: LineFault::ShortToDPlus,
        }
    );
    assert!(bench.board.port_writes().is_empty(), "pattern stage must not run");
    assert_eq!(
        bench.board.errors(),
        vec!["ETEST: Fault on USB D-, expected High-Z. Possible short to D+"]
    );
}

#[test]
fn dead_vusb_fails_at_power_on_before_any_pin_test() {
    let faults = BoardFaults {
        dead_vusb: true,
        ..BoardFaults::default()
    };
    let mut bench = Bench::with_faults(faults);
    let failure = bench
        .test
        .run_board(&mut bench.target, &mut bench.jig)
        .unwrap_err();

    assert_eq!(failure.stage, Stage::PowerOn);
    assert!(matches!(failure.fault, Fault::OutOfTolerance(_)));
    assert_eq!(bench.board.digital_reads(), 0);
    assert!(bench.board.port_writes().is_empty());
    assert!(!bench.board.usb_pullup());
    assert_eq!(bench.board.supply_duty(), 0, "failed board is powered down");
}

#[test]
fn refused_commands_fail_init() {
    let faults = BoardFaults {
        refuse_commands: true,
        ..BoardFaults::default()
    };
    let mut bench = Bench::with_faults(faults);
    let failure = bench
        .test
        .run_board(&mut bench.target, &mut bench.jig)
        .unwrap_err();

    assert_eq!(failure.stage, Stage::InitTarget);
    assert!(matches!(failure.fault, Fault::Command(_)));
    assert_eq!(bench.board.digital_reads(), 0);
}

#[test]
fn stuck_line_fails_in_pattern_stage_and_powers_down() {
    let faults = BoardFaults {
        stuck_low: 1 << 0,
        ..BoardFaults::default()
    };
    let mut bench = Bench::with_faults(faults);
    let failure = bench
        .test
        .run_board(&mut bench.target, &mut bench.jig)
        .unwrap_err();

    assert_eq!(failure.stage, Stage::OutputPatterns);
    assert_eq!(bench.board.supply_duty(), 0);
    assert_eq!(bench.board.errors().len(), 1);
}
