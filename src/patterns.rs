//! Output-port pattern test.
//!
//! Each pattern is written to the target's 8-bit output port in a single
//! port write, so no intermediate bit combination is ever on the lines.  Then
//! both supply rails and all eight data lines are measured: a set bit must
//! read logic-high volts, a clear bit logic-low volts.
//!
//! Coverage: all-off and all-on, every single bit set (finds floating or
//! stuck-low lines), every single bit cleared (finds stuck-high lines and
//! lines shorted together).  The suite finishes by writing all-on again so
//! the port is left driven high.

use log::debug;

use crate::analog::AnalogMonitor;
use crate::app::ports::{AnalogInput, TargetChannel};
use crate::config::LevelConfig;
use crate::error::{self, Outcome, TargetCommand};
use crate::pins::{OUTPUT_LINES, Pin, PinMap};

/// Number of port writes in [`coverage_suite`].
pub const SUITE_LEN: usize = 2 + OUTPUT_LINES + OUTPUT_LINES + 1;

/// The fixed pattern sequence, in execution order.
pub fn coverage_suite() -> [u8; SUITE_LEN] {
    let mut suite = [0u8; SUITE_LEN];
    suite[0] = 0x00;
    suite[1] = 0xFF;
    for n in 0..OUTPUT_LINES {
        suite[2 + n] = 1 << n;
        suite[2 + OUTPUT_LINES + n] = 0xFF ^ (1 << n);
    }
    suite[SUITE_LEN - 1] = 0xFF;
    suite
}

/// Output-port pattern test, bound to the port and sense channels.
#[derive(Debug, Clone)]
pub struct OutputPatterns {
    port_base: Pin,
    data_sense: [Pin; OUTPUT_LINES],
    rail_33v: Pin,
    rail_vusb: Pin,
    levels: LevelConfig,
    vusb_volts: f32,
}

impl OutputPatterns {
    /// `vusb_volts` is the nominal rail the supply was set to.
    pub fn new(pins: &PinMap, levels: &LevelConfig, vusb_volts: f32) -> Self {
        Self {
            port_base: pins.port_base(),
            data_sense: pins.data_sense,
            rail_33v: pins.target_33v,
            rail_vusb: pins.target_vusb,
            levels: levels.clone(),
            vusb_volts,
        }
    }

    /// Expected voltage on data line `n` for `bits`.
    pub fn expected_volts(&self, bits: u8, n: usize) -> f32 {
        if (bits >> n) & 1 == 1 {
            self.levels.logic_high_volts
        } else {
            self.levels.logic_low_volts
        }
    }

    /// Write `bits` to the port and verify both rails and all data lines.
    pub fn test_pattern(
        &self,
        analog: &AnalogMonitor,
        target: &mut impl TargetChannel,
        hw: &mut impl AnalogInput,
        bits: u8,
    ) -> Outcome {
        debug!("ETEST: pattern 0x{:02X}", bits);
        error::command(
            target.digital_write_port(self.port_base, bits),
            TargetCommand::WritePort { bits },
        )?;

        let tol = self.levels.tolerance_volts;
        analog.check_threshold(hw, target, self.rail_33v, self.levels.rail_33v_volts, tol)?;
        analog.check_threshold(hw, target, self.rail_vusb, self.vusb_volts, tol)?;

        for (n, &pin) in self.data_sense.iter().enumerate() {
            analog.check_threshold(hw, target, pin, self.expected_volts(bits, n), tol)?;
        }
        Ok(())
    }

    /// Run the whole [`coverage_suite`], stopping at the first failure.
    pub fn test_all(
        &self,
        analog: &AnalogMonitor,
        target: &mut impl TargetChannel,
        hw: &mut impl AnalogInput,
    ) -> Outcome {
        for bits in coverage_suite() {
            self.test_pattern(analog, target, hw, bits)?;
        }
        Ok(())
    }
}
