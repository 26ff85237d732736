//! Port traits: the boundary between the electrical checks and the hardware.
//!
//! ```text
//!   TargetChannel ──▶ ┌──────────────────┐ ◀── JigHardware
//!  (remote commands)  │  ElectricalTest  │  (local ADC, GPIO, PWM, delay)
//!                     └──────────────────┘
//! ```
//!
//! Each check asks only for the capability it uses: the analog monitor needs
//! [`AnalogInput`] and [`TargetLog`], the probes need [`DigitalPins`], the
//! supply needs [`PwmOutput`] plus a blocking delay.  Adapters are handed in
//! at call sites, so the checks never own a hardware handle.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

use crate::pins::Pin;

// ───────────────────────────────────────────────────────────────
// Shared vocabulary
// ───────────────────────────────────────────────────────────────

/// Severity of a message written to the target log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    #[default]
    Info,
    Error,
}

/// Electrical configuration of a single pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Floating input, no internal bias.
    Input,
    /// Input with the internal pull-up enabled.
    InputPullup,
    /// Push-pull output.
    Output,
}

// ───────────────────────────────────────────────────────────────
// Target channel (remote: jig → board under test)
// ───────────────────────────────────────────────────────────────

/// Log half of the target channel.
pub trait TargetLog {
    fn log(&mut self, level: LogLevel, message: fmt::Arguments<'_>);
}

/// Remote commands executed by the board under test.
///
/// Every command returns `false` when the channel or the target refused it.
pub trait TargetChannel: TargetLog {
    fn pin_mode(&mut self, pin: Pin, mode: PinMode) -> bool;

    /// Write eight consecutive port bits at once, starting at `first_pin`.
    fn digital_write_port(&mut self, first_pin: Pin, bits: u8) -> bool;

    /// Enable or disable the target's USB D+ pull-up.
    fn usb_set_pullup(&mut self, enabled: bool) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Jig hardware (local)
// ───────────────────────────────────────────────────────────────

/// One-shot ADC conversions.
pub trait AnalogInput {
    /// Raw conversion result, `0..=adc_max`.
    fn analog_read(&mut self, pin: Pin) -> u16;
}

/// Direct GPIO access on the jig.
pub trait DigitalPins {
    fn pin_mode(&mut self, pin: Pin, mode: PinMode);
    fn digital_read(&mut self, pin: Pin) -> PinState;
    fn digital_write(&mut self, pin: Pin, level: PinState);
}

/// PWM output used to synthesise the variable supply.
pub trait PwmOutput {
    fn set_pwm_frequency(&mut self, pin: Pin, hz: u32);
    /// 8-bit duty cycle, 0 = off, 255 = full scale.
    fn analog_write(&mut self, pin: Pin, duty: u8);
}

/// Everything the jig side offers, including the blocking delay.
pub trait JigHardware: AnalogInput + DigitalPins + PwmOutput + DelayNs {}

impl<T: AnalogInput + DigitalPins + PwmOutput + DelayNs> JigHardware for T {}
