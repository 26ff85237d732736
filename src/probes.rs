//! Digital pin-state probes: floating vs. externally biased.
//!
//! Both probes repeatedly drive the pin as an output, release it to a plain
//! input, and sample it straight away.  A floating node keeps the level it was
//! just driven to on its parasitic capacitance for longer than one
//! drive/release/read cycle takes.  A node with a pull resistor (or a short)
//! snaps to the bias level instead.
//!
//! The loop contains no delay.  The only timing is the latency of
//! consecutive pin operations compared with the node's RC time constant.
//! The iteration count bounds the probe; it is not a timeout.  A new
//! controller or board revision needs the count rechecked.

use embedded_hal::digital::PinState;
use log::debug;

use crate::app::ports::{DigitalPins, PinMode};
use crate::pins::Pin;

/// The first sample that disagreed with the expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub pin: Pin,
    pub iteration: u32,
    pub driven: PinState,
    pub read: PinState,
}

/// Level driven on iteration `i`: LOW, HIGH, LOW, ...
pub fn drive_level(i: u32) -> PinState {
    PinState::from(i & 1 == 1)
}

/// Drive/release/sample prober with a fixed iteration bound.
#[derive(Debug, Clone, Copy)]
pub struct PinProbe {
    iterations: u32,
}

impl PinProbe {
    /// `iterations` samples per probe, alternating the driven level.
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Pass iff every sample reads back the level driven just before it.
    pub fn test_high_z(&self, hw: &mut impl DigitalPins, pin: Pin) -> Result<(), Mismatch> {
        self.sample(hw, pin, |driven| driven)
    }

    /// Pass iff every sample reads `state`, whatever was driven before it.
    pub fn test_pull(
        &self,
        hw: &mut impl DigitalPins,
        pin: Pin,
        state: PinState,
    ) -> Result<(), Mismatch> {
        self.sample(hw, pin, |_| state)
    }

    fn sample(
        &self,
        hw: &mut impl DigitalPins,
        pin: Pin,
        expected: impl Fn(PinState) -> PinState,
    ) -> Result<(), Mismatch> {
        for iteration in 0..self.iterations {
            let driven = drive_level(iteration);
            hw.pin_mode(pin, PinMode::Output);
            hw.digital_write(pin, driven);
            hw.pin_mode(pin, PinMode::Input);
            let read = hw.digital_read(pin);

            if read != expected(driven) {
                let mismatch = Mismatch {
                    pin,
                    iteration,
                    driven,
                    read,
                };
                debug!("ETEST: probe mismatch {:?}", mismatch);
                return Err(mismatch);
            }
        }
        Ok(())
    }
}
