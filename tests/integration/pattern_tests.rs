//! Output-port pattern stage.

use etest::adapters::sim::BoardFaults;
use etest::error::Fault;
use etest::patterns::{SUITE_LEN, coverage_suite};

use crate::bench::Bench;

#[test]
fn all_zero_and_all_one_each_verify_every_line() {
    let mut bench = Bench::powered(BoardFaults::default());
    for bits in [0x00, 0xFF] {
        assert_eq!(
            bench
                .test
                .test_output_pattern(&mut bench.target, &mut bench.jig, bits),
            Ok(())
        );
    }
    assert_eq!(bench.board.port_writes(), vec![0x00, 0xFF]);
}

#[test]
fn healthy_board_passes_full_suite_and_ends_all_on() {
    let mut bench = Bench::powered(BoardFaults::default());
    let result = bench
        .test
        .test_all_output_patterns(&mut bench.target, &mut bench.jig);
    assert_eq!(result, Ok(()));
    assert_eq!(bench.board.port_writes(), coverage_suite().to_vec());
    assert_eq!(bench.board.port_bits(), 0xFF);
    assert!(bench.board.errors().is_empty());
}

#[test]
fn stuck_low_line_fails_all_on_pattern() {
    let faults = BoardFaults {
        stuck_low: 1 << 3,
        ..BoardFaults::default()
    };
    let mut bench = Bench::powered(faults);
    let result = bench
        .test
        .test_all_output_patterns(&mut bench.target, &mut bench.jig);

    let sense = bench.config.pins.data_sense[3];
    match result {
        Err(Fault::OutOfTolerance(d)) => {
            assert_eq!(d.pin, sense);
            assert_eq!(d.nominal, 5.0);
            assert!(d.measured < 0.1);
        }
        other => panic!("expected out-of-tolerance, got {other:?}"),
    }
    // 0x00 passed, 0xFF failed, nothing after it was written.
    assert_eq!(bench.board.port_writes(), vec![0x00, 0xFF]);
    assert_eq!(bench.board.errors().len(), 1);
}

#[test]
fn stuck_high_line_fails_all_off_pattern() {
    let faults = BoardFaults {
        stuck_high: 1 << 6,
        ..BoardFaults::default()
    };
    let mut bench = Bench::powered(faults);
    let result = bench
        .test
        .test_all_output_patterns(&mut bench.target, &mut bench.jig);

    let sense = bench.config.pins.data_sense[6];
    assert!(matches!(result, Err(Fault::OutOfTolerance(d)) if d.pin == sense && d.nominal == 0.0));
    assert_eq!(bench.board.port_writes(), vec![0x00]);
}

#[test]
fn bridged_lines_fail_first_pattern_that_separates_them() {
    let faults = BoardFaults {
        bridged: Some((2, 5)),
        ..BoardFaults::default()
    };
    let mut bench = Bench::powered(faults);
    let result = bench
        .test
        .test_all_output_patterns(&mut bench.target, &mut bench.jig);

    // All-off and all-on drive both lines alike; 0x04 is the first split.
    let sense = bench.config.pins.data_sense[2];
    assert!(matches!(result, Err(Fault::OutOfTolerance(d)) if d.pin == sense && d.nominal == 5.0));
    assert_eq!(bench.board.port_writes(), vec![0x00, 0xFF, 0x01, 0x02, 0x04]);
    assert_eq!(bench.board.errors().len(), 1);
}

#[test]
fn walking_zero_alone_catches_bridged_lines() {
    let faults = BoardFaults {
        bridged: Some((2, 5)),
        ..BoardFaults::default()
    };
    let mut bench = Bench::powered(faults);
    let walking_zero = &coverage_suite()[10..SUITE_LEN - 1];

    let failed_at = walking_zero.iter().copied().find(|&bits| {
        bench
            .test
            .test_output_pattern(&mut bench.target, &mut bench.jig, bits)
            .is_err()
    });

    // 0xFB clears line 2 while line 5 is driven high; the bridge pulls it low.
    assert_eq!(failed_at, Some(0xFB));
    assert_eq!(bench.board.port_writes(), vec![0xFE, 0xFD, 0xFB]);
    let errors = bench.board.errors();
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].starts_with(&format!("ETEST: Analog value {} ", bench.config.pins.data_sense[5])),
        "{errors:?}"
    );
}

#[test]
fn single_bit_pattern_leaves_other_lines_low() {
    let mut bench = Bench::powered(BoardFaults::default());
    for n in 0..8 {
        let bits = 1u8 << n;
        assert_eq!(
            bench
                .test
                .test_output_pattern(&mut bench.target, &mut bench.jig, bits),
            Ok(()),
            "pattern 0x{bits:02X}"
        );
    }
}

#[test]
fn unpowered_board_fails_on_the_3v3_rail() {
    let mut bench = Bench::healthy();
    bench.test.init_target(&mut bench.target).unwrap();
    let result = bench
        .test
        .test_output_pattern(&mut bench.target, &mut bench.jig, 0x00);
    assert!(
        matches!(result, Err(Fault::OutOfTolerance(d)) if d.pin == bench.config.pins.target_33v)
    );
}
