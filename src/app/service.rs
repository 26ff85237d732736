//! Electrical test service, the orchestrating core.
//!
//! [`ElectricalTest`] owns the configured checks and sequences them.  The
//! target channel and the jig hardware are passed in at every call, so the
//! whole run can be driven against the host simulator.
//!
//! ```text
//!  run_board ─▶ power_on ─▶ run_all ─▶ init_target
//!                                   ─▶ test_usb_connections
//!                                   ─▶ test_all_output_patterns
//! ```
//!
//! Every step returns a `Result`; `?` gives the fail-fast chain.  The first
//! failing check has already written its diagnostic to the target log by
//! the time the error reaches the caller.

use log::{error, info};

use crate::analog::AnalogMonitor;
use crate::config::{ConfigError, JigConfig};
use crate::error::{self, Outcome, RunFailure, Stage, StageExt, TargetCommand};
use crate::patterns::OutputPatterns;
use crate::pins::PinMap;
use crate::probes::PinProbe;
use crate::supply::PowerSupply;
use crate::usb::UsbCheck;

use super::ports::{JigHardware, LogLevel, PinMode, TargetChannel, TargetLog};

// ───────────────────────────────────────────────────────────────
// ElectricalTest
// ───────────────────────────────────────────────────────────────

/// The configured electrical test for one jig and board revision.
pub struct ElectricalTest {
    pins: PinMap,
    analog: AnalogMonitor,
    supply: PowerSupply,
    probe: PinProbe,
    usb: UsbCheck,
    patterns: OutputPatterns,
    vusb_volts: f32,
    tolerance_volts: f32,
    log_level: LogLevel,
}

impl ElectricalTest {
    /// Build the checks from an already validated configuration.
    pub fn new(config: &JigConfig) -> Self {
        let pins = config.pins.clone();
        Self {
            analog: AnalogMonitor::new(&config.adc),
            supply: PowerSupply::new(&config.supply, pins.power_pwm),
            probe: PinProbe::new(config.probes.iterations),
            usb: UsbCheck::new(&pins, config.probes.usb_repeats),
            patterns: OutputPatterns::new(&pins, &config.levels, config.supply.vusb_volts),
            vusb_volts: config.supply.vusb_volts,
            tolerance_volts: config.levels.tolerance_volts,
            log_level: config.log_level,
            pins,
        }
    }

    /// Validate `config`, then build.
    pub fn try_new(config: &JigConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    // ── Power ─────────────────────────────────────────────────

    /// Set the target supply; clamps to the supply's range and waits for
    /// the target to settle.
    pub fn set_supply_voltage(&self, hw: &mut impl JigHardware, volts: f32) {
        self.supply.set_voltage(hw, volts);
    }

    pub fn power_off(&self, hw: &mut impl JigHardware) {
        self.supply.off(hw);
    }

    /// Apply nominal VUSB and confirm the target's VUSB rail followed.  A dead
    /// or shorted target fails here.
    pub fn power_on(&self, target: &mut impl TargetChannel, hw: &mut impl JigHardware) -> Outcome {
        self.progress(target, "Enabling power supply");
        self.supply.set_voltage(hw, self.vusb_volts);
        self.analog
            .check_threshold(hw, target, self.pins.target_vusb, self.vusb_volts, self.tolerance_volts)?;
        Ok(())
    }

    // ── Stages ────────────────────────────────────────────────

    /// One-time target setup: port pins as outputs, USB pull-up off.
    pub fn init_target(&self, target: &mut impl TargetChannel) -> Outcome {
        for &pin in &self.pins.target_port {
            error::command(
                target.pin_mode(pin, PinMode::Output),
                TargetCommand::PinMode { pin },
            )?;
        }
        error::command(
            target.usb_set_pullup(false),
            TargetCommand::UsbPullup { enabled: false },
        )
    }

    pub fn test_usb_connections(
        &self,
        target: &mut impl TargetChannel,
        hw: &mut impl JigHardware,
    ) -> Outcome {
        self.progress(target, "Testing USB connections");
        self.usb.run(&self.probe, target, hw)
    }

    pub fn test_output_pattern(
        &self,
        target: &mut impl TargetChannel,
        hw: &mut impl JigHardware,
        bits: u8,
    ) -> Outcome {
        self.patterns.test_pattern(&self.analog, target, hw, bits)
    }

    pub fn test_all_output_patterns(
        &self,
        target: &mut impl TargetChannel,
        hw: &mut impl JigHardware,
    ) -> Outcome {
        self.progress(target, "Testing data output patterns");
        self.patterns.test_all(&self.analog, target, hw)
    }

    // ── Full runs ─────────────────────────────────────────────

    /// Init, USB, output patterns.  Expects the target to be powered.
    pub fn run_all(
        &self,
        target: &mut impl TargetChannel,
        hw: &mut impl JigHardware,
    ) -> Result<(), RunFailure> {
        self.progress(target, "Beginning electrical test");

        self.init_target(target).in_stage(Stage::InitTarget)?;
        self.test_usb_connections(target, hw)
            .in_stage(Stage::UsbConnections)?;
        self.test_all_output_patterns(target, hw)
            .in_stage(Stage::OutputPatterns)?;

        self.progress(target, "Successfully completed electrical test");
        info!("ETEST: PASS");
        Ok(())
    }

    /// Power the target, run everything, and cut power again if anything
    /// failed.  A passing board is left powered with its port all-on.
    pub fn run_board(
        &self,
        target: &mut impl TargetChannel,
        hw: &mut impl JigHardware,
    ) -> Result<(), RunFailure> {
        let result = self
            .power_on(target, hw)
            .in_stage(Stage::PowerOn)
            .and_then(|()| self.run_all(target, hw));

        if let Err(failure) = &result {
            error!("ETEST: FAIL ({failure})");
            self.power_off(hw);
        }
        result
    }

    fn progress(&self, target: &mut impl TargetLog, message: &str) {
        info!("ETEST: {}", message);
        target.log(self.log_level, format_args!("ETEST: {message}"));
    }
}
