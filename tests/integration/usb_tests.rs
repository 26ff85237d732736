//! USB continuity and pull-up stage against injected board defects.

use etest::adapters::sim::BoardFaults;
use etest::error::{Fault, GroundNet, LineFault, UsbLine};

use crate::bench::Bench;

fn usb_result(faults: BoardFaults) -> (Bench, Result<(), Fault>) {
    let mut bench = Bench::powered(faults);
    let result = bench
        .test
        .test_usb_connections(&mut bench.target, &mut bench.jig);
    (bench, result)
}

#[test]
fn healthy_board_passes_all_repeats() {
    let (bench, result) = usb_result(BoardFaults::default());
    assert_eq!(result, Ok(()));
    assert!(bench.board.errors().is_empty());
    // Each pass: 2 ground reads + 3 high-Z probes + 1 pull probe of 10 reads.
    assert_eq!(bench.board.digital_reads(), 4 * (2 + 4 * 10));
    assert!(bench.board.usb_pullup(), "last pass ends with the pull-up on");
}

#[test]
fn open_shield_ground_is_reported() {
    let faults = BoardFaults {
        open_shield_ground: true,
        ..BoardFaults::default()
    };
    let (bench, result) = usb_result(faults);
    assert_eq!(result, Err(Fault::Ground(GroundNet::Shield)));
    assert_eq!(bench.board.errors(), vec!["ETEST: Faulty USB shield ground"]);
}

#[test]
fn open_signal_ground_is_reported() {
    let faults = BoardFaults {
        open_signal_ground: true,
        ..BoardFaults::default()
    };
    let (bench, result) = usb_result(faults);
    assert_eq!(result, Err(Fault::Ground(GroundNet::Signal)));
    assert_eq!(bench.board.errors(), vec!["ETEST: Faulty USB signal ground"]);
}

#[test]
fn missing_pullup_is_reported_on_dplus() {
    let faults = BoardFaults {
        missing_dplus_pullup: true,
        ..BoardFaults::default()
    };
    let (bench, result) = usb_result(faults);
    assert_eq!(
        result,
        Err(Fault::DataLine {
            line: UsbLine::DPlus,
            fault: LineFault::NoPullUp,
        })
    );
    assert_eq!(
        bench.board.errors(),
        vec!["ETEST: Fault on USB D+, no pull-up found"]
    );
}

#[test]
fn dplus_dminus_bridge_flags_possible_short() {
    let faults = BoardFaults {
        data_lines_shorted: true,
        ..BoardFaults::default()
    };
    let (bench, result) = usb_result(faults);
    assert_eq!(
        result,
        Err(Fault::DataLine {
            line: UsbLine::DMinus,
            fault: LineFault::ShortToDPlus,
        })
    );
    assert_eq!(
        bench.board.errors(),
        vec!["ETEST: Fault on USB D-, expected High-Z. Possible short to D+"]
    );
    // Fails on the very first pass: grounds, two high-Z probes, pull probe,
    // then a single read on D-.
    assert_eq!(bench.board.digital_reads(), 2 + 10 + 10 + 10 + 1);
}

#[test]
fn refused_pullup_command_aborts_before_probing() {
    let faults = BoardFaults {
        refuse_commands: true,
        ..BoardFaults::default()
    };
    let mut bench = Bench::with_faults(faults);
    let result = bench
        .test
        .test_usb_connections(&mut bench.target, &mut bench.jig);
    assert!(matches!(result, Err(Fault::Command(_))));
    assert!(bench.board.errors().is_empty(), "remote failures are not echoed to the target");
    assert_eq!(bench.board.digital_reads(), 0);
}
