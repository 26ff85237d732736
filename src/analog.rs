//! Analog measurement of target voltages.
//!
//! Every sense input on the jig sits behind a resistive divider that steps
//! the target's 0 – 5 V levels down into the ADC's range.  A raw code maps to
//! the voltage at the top of the divider by a single linear factor:
//!
//! ```text
//!   volts = raw * (Vref / adc_max) * ((Rground + Rsignal) / Rground)
//! ```
//!
//! Readings are never cached; each call takes a fresh conversion.

use log::trace;

use crate::app::ports::{AnalogInput, TargetLog};
use crate::config::AdcConfig;
use crate::error::{self, Deviation, Fault};
use crate::pins::Pin;

/// Converts ADC codes to volts and checks them against acceptance bands.
#[derive(Debug, Clone, Copy)]
pub struct AnalogMonitor {
    scale: f32,
}

impl AnalogMonitor {
    pub fn new(adc: &AdcConfig) -> Self {
        let divider = (adc.divider_ground_ohms + adc.divider_signal_ohms) / adc.divider_ground_ohms;
        Self {
            scale: (adc.reference_volts / f32::from(adc.adc_max)) * divider,
        }
    }

    /// Volts per ADC code, divider included.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Convert a raw conversion result.
    pub fn code_to_volts(&self, raw: u16) -> f32 {
        f32::from(raw) * self.scale
    }

    /// Take one conversion on `pin` and return the divider-corrected voltage.
    pub fn volts(&self, hw: &mut impl AnalogInput, pin: Pin) -> f32 {
        self.code_to_volts(hw.analog_read(pin))
    }

    /// Measure `pin` and require it within `nominal ± tolerance` (inclusive).
    ///
    /// Returns the measured voltage.  Out-of-band readings are reported to
    /// the target log before the fault is returned.  Pin state is untouched.
    pub fn check_threshold(
        &self,
        hw: &mut impl AnalogInput,
        target: &mut impl TargetLog,
        pin: Pin,
        nominal: f32,
        tolerance: f32,
    ) -> Result<f32, Fault> {
        let measured = self.volts(hw, pin);
        trace!("ETEST: pin {} = {:.3}v (want {:.2} +/- {:.2})", pin, measured, nominal, tolerance);

        if within(measured, nominal, tolerance) {
            Ok(measured)
        } else {
            let deviation = Deviation {
                pin,
                measured,
                nominal,
                tolerance,
            };
            Err(error::report(target, Fault::OutOfTolerance(deviation)))
        }
    }
}

/// `true` iff `nominal - tolerance <= value <= nominal + tolerance`.
pub fn within(value: f32, nominal: f32, tolerance: f32) -> bool {
    let lower = nominal - tolerance;
    let upper = nominal + tolerance;
    value >= lower && value <= upper
}
