//! USB connector continuity and D+ pull-up check.
//!
//! One pass:
//!
//! 1. Target pull-up off.
//! 2. Shield and signal ground, read through the jig's pull-ups, must be LOW.
//! 3. D- and D+ must both float.
//! 4. Target pull-up on.
//! 5. D+ must now read as pulled HIGH while D- still floats.  A D- that
//!    follows the pull-up points at a D+/D- bridge.
//!
//! The pass repeats a fixed number of times to catch intermittent contacts.
//! The first failing step ends the check; there is no partial credit.

use embedded_hal::digital::PinState;
use log::debug;

use crate::app::ports::{DigitalPins, PinMode, TargetChannel};
use crate::error::{self, Fault, GroundNet, LineFault, Outcome, TargetCommand, UsbLine};
use crate::pins::{Pin, PinMap};
use crate::probes::PinProbe;

/// USB connector check, bound to the jig's USB sense pins.
#[derive(Debug, Clone, Copy)]
pub struct UsbCheck {
    shield_ground: Pin,
    signal_ground: Pin,
    dplus: Pin,
    dminus: Pin,
    repeats: u32,
}

impl UsbCheck {
    /// Take the USB roles from `pins`; run the pass `repeats` times.
    pub fn new(pins: &PinMap, repeats: u32) -> Self {
        Self {
            shield_ground: pins.usb_shield_ground,
            signal_ground: pins.usb_signal_ground,
            dplus: pins.usb_dplus,
            dminus: pins.usb_dminus,
            repeats,
        }
    }

    /// Every pass must succeed; the first failure is reported and returned.
    pub fn run(
        &self,
        probe: &PinProbe,
        target: &mut impl TargetChannel,
        hw: &mut impl DigitalPins,
    ) -> Outcome {
        for pass in 0..self.repeats {
            debug!("ETEST: USB pass {}/{}", pass + 1, self.repeats);
            self.run_pass(probe, target, hw)?;
        }
        Ok(())
    }

    fn run_pass(
        &self,
        probe: &PinProbe,
        target: &mut impl TargetChannel,
        hw: &mut impl DigitalPins,
    ) -> Outcome {
        set_pullup(target, false)?;

        hw.pin_mode(self.shield_ground, PinMode::InputPullup);
        hw.pin_mode(self.signal_ground, PinMode::InputPullup);
        if hw.digital_read(self.shield_ground) != PinState::Low {
            return Err(error::report(target, Fault::Ground(GroundNet::Shield)));
        }
        if hw.digital_read(self.signal_ground) != PinState::Low {
            return Err(error::report(target, Fault::Ground(GroundNet::Signal)));
        }

        if probe.test_high_z(hw, self.dminus).is_err() {
            return Err(line_fault(target, UsbLine::DMinus, LineFault::ExpectedHighZ));
        }
        if probe.test_high_z(hw, self.dplus).is_err() {
            return Err(line_fault(target, UsbLine::DPlus, LineFault::ExpectedHighZ));
        }

        set_pullup(target, true)?;

        if probe.test_pull(hw, self.dplus, PinState::High).is_err() {
            return Err(line_fault(target, UsbLine::DPlus, LineFault::NoPullUp));
        }
        if probe.test_high_z(hw, self.dminus).is_err() {
            return Err(line_fault(target, UsbLine::DMinus, LineFault::ShortToDPlus));
        }

        Ok(())
    }
}

fn set_pullup(target: &mut impl TargetChannel, enabled: bool) -> Outcome {
    error::command(
        target.usb_set_pullup(enabled),
        TargetCommand::UsbPullup { enabled },
    )
}

fn line_fault(target: &mut impl TargetChannel, line: UsbLine, fault: LineFault) -> Fault {
    error::report(target, Fault::DataLine { line, fault })
}
