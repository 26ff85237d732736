//! Variable power supply feeding the target.
//!
//! A high-frequency PWM output, filtered on the jig, sets the target's supply
//! voltage between 0 V and the full-scale voltage.  After every change the
//! controller blocks for the settle delay so the target's decoupling
//! capacitors reach the new level before anything is measured.
//!
//! The settle delay is a lower bound tied to the target's capacitance; the
//! jig's own supply settles in well under a millisecond.

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::app::ports::{DigitalPins, PinMode, PwmOutput};
use crate::config::SupplyConfig;
use crate::pins::Pin;

/// PWM-synthesised target supply on a single jig pin.
#[derive(Debug, Clone, Copy)]
pub struct PowerSupply {
    pwm_pin: Pin,
    full_scale_volts: f32,
    pwm_frequency_hz: u32,
    settle_ms: u32,
}

impl PowerSupply {
    pub fn new(config: &SupplyConfig, pwm_pin: Pin) -> Self {
        Self {
            pwm_pin,
            full_scale_volts: config.full_scale_volts,
            pwm_frequency_hz: config.pwm_frequency_hz,
            settle_ms: config.settle_ms,
        }
    }

    /// 8-bit duty cycle for `volts`, clamped to `0..=255`.  NaN maps to 0.
    pub fn duty_for(&self, volts: f32) -> u8 {
        let duty = volts * (255.0 / self.full_scale_volts);
        if duty.is_nan() {
            return 0;
        }
        duty.clamp(0.0, 255.0) as u8
    }

    /// Drive the supply to `volts` and wait for the target to settle.
    pub fn set_voltage<H>(&self, hw: &mut H, volts: f32)
    where
        H: DigitalPins + PwmOutput + DelayNs,
    {
        let duty = self.duty_for(volts);
        debug!("ETEST: supply -> {:.2}v (duty {})", volts, duty);

        hw.pin_mode(self.pwm_pin, PinMode::Output);
        hw.set_pwm_frequency(self.pwm_pin, self.pwm_frequency_hz);
        hw.analog_write(self.pwm_pin, duty);

        hw.delay_ms(self.settle_ms);
    }

    /// Switch the supply off.  Idempotent, no verification.
    pub fn off<H>(&self, hw: &mut H)
    where
        H: DigitalPins + PwmOutput + DelayNs,
    {
        self.set_voltage(hw, 0.0);
    }
}
