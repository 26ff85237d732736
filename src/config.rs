//! Jig configuration parameters
//!
//! Every hardware constant the electrical test depends on.  The defaults
//! describe the stock jig; a different board or jig revision loads its own
//! values with [`JigConfig::from_json`].

use serde::{Deserialize, Serialize};

use crate::app::ports::LogLevel;
use crate::pins::{Pin, PinMap};

/// ADC front end: reference and the divider in front of every sense input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    /// ADC reference voltage (V)
    pub reference_volts: f32,
    /// Divider leg from ADC input to ground (ohms)
    pub divider_ground_ohms: f32,
    /// Divider leg from ADC input to the measured signal (ohms)
    pub divider_signal_ohms: f32,
    /// Full-scale ADC code
    pub adc_max: u16,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            reference_volts: 1.2,
            divider_ground_ohms: 1000.0,
            divider_signal_ohms: 6800.0,
            adc_max: 1023,
        }
    }
}

/// PWM-controlled variable supply powering the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyConfig {
    /// Output voltage at 100% duty (V)
    pub full_scale_volts: f32,
    /// PWM switching frequency (Hz).  Kept high so ripple stays well under
    /// the measurement tolerance.
    pub pwm_frequency_hz: u32,
    /// Wait after every supply change (ms).  Lower bound set by the target's
    /// decoupling capacitance, not by the supply itself.
    pub settle_ms: u32,
    /// Nominal USB supply voltage applied by `power_on` (V)
    pub vusb_volts: f32,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            full_scale_volts: 5.0,
            pwm_frequency_hz: 1_000_000,
            settle_ms: 30,
            vusb_volts: 5.0,
        }
    }
}

/// Expected voltages and the acceptance band around them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Target 3.3 V regulator output (V)
    pub rail_33v_volts: f32,
    /// Data line driven high (V)
    pub logic_high_volts: f32,
    /// Data line driven low (V)
    pub logic_low_volts: f32,
    /// Half-width of every acceptance band (V)
    pub tolerance_volts: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            rail_33v_volts: 3.3,
            logic_high_volts: 5.0,
            logic_low_volts: 0.0,
            tolerance_volts: 0.3,
        }
    }
}

/// Iteration bounds for the digital probes.  These are fault-coverage
/// counts, not timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Drive/release/sample cycles per high-Z or pull probe
    pub iterations: u32,
    /// Full passes through the USB continuity sequence
    pub usb_repeats: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            usb_repeats: 4,
        }
    }
}

/// Complete jig configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JigConfig {
    pub adc: AdcConfig,
    pub supply: SupplyConfig,
    pub levels: LevelConfig,
    pub probes: ProbeConfig,
    pub pins: PinMap,
    /// Severity used for progress messages sent to the target log
    pub log_level: LogLevel,
}

/// Errors from loading or validating a [`JigConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The input could not be parsed.
    Parse(serde_json::Error),
    /// A field failed range validation.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "config parse error: {}", e),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl JigConfig {
    /// Parse a JSON description of a jig revision and validate it.
    /// Absent fields keep their stock values.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject values that would make the checks meaningless or divide by zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let adc = &self.adc;
        if !positive(adc.reference_volts) {
            return Err(ConfigError::ValidationFailed("adc.reference_volts must be > 0"));
        }
        if !positive(adc.divider_ground_ohms) {
            return Err(ConfigError::ValidationFailed("adc.divider_ground_ohms must be > 0"));
        }
        if !non_negative(adc.divider_signal_ohms) {
            return Err(ConfigError::ValidationFailed("adc.divider_signal_ohms must be >= 0"));
        }
        if adc.adc_max == 0 {
            return Err(ConfigError::ValidationFailed("adc.adc_max must be > 0"));
        }

        let supply = &self.supply;
        if !positive(supply.full_scale_volts) {
            return Err(ConfigError::ValidationFailed("supply.full_scale_volts must be > 0"));
        }
        if supply.settle_ms == 0 {
            return Err(ConfigError::ValidationFailed("supply.settle_ms must be > 0"));
        }
        if supply.pwm_frequency_hz == 0 {
            return Err(ConfigError::ValidationFailed("supply.pwm_frequency_hz must be > 0"));
        }
        if !positive(supply.vusb_volts) {
            return Err(ConfigError::ValidationFailed("supply.vusb_volts must be > 0"));
        }
        // Above full scale the duty clamps and VUSB never reaches nominal.
        if supply.vusb_volts > supply.full_scale_volts {
            return Err(ConfigError::ValidationFailed(
                "supply.vusb_volts must not exceed supply.full_scale_volts",
            ));
        }

        if !non_negative(self.levels.tolerance_volts) {
            return Err(ConfigError::ValidationFailed("levels.tolerance_volts must be >= 0"));
        }

        // Both drive levels have to be exercised at least once.
        if self.probes.iterations < 2 {
            return Err(ConfigError::ValidationFailed("probes.iterations must be >= 2"));
        }
        if self.probes.usb_repeats == 0 {
            return Err(ConfigError::ValidationFailed("probes.usb_repeats must be > 0"));
        }

        if !distinct(&self.pins.jig_digital()) {
            return Err(ConfigError::ValidationFailed("pins: jig digital roles must be distinct"));
        }
        if !distinct(&self.pins.analog_sense()) {
            return Err(ConfigError::ValidationFailed("pins: analog sense roles must be distinct"));
        }

        Ok(())
    }
}

// NaN fails both helpers.
fn positive(v: f32) -> bool {
    v > 0.0
}

fn non_negative(v: f32) -> bool {
    v >= 0.0
}

fn distinct(pins: &[Pin]) -> bool {
    pins.iter()
        .enumerate()
        .all(|(i, pin)| !pins[i + 1..].contains(pin))
}
