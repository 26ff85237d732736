//! Pin-role assignments for the test jig and the board it probes.
//!
//! Single source of truth for which jig pin is wired to which net on the
//! target.  Every check takes its pins from a [`PinMap`] handed over at
//! construction, so a new jig revision only changes the map, never the checks.
//!
//! Jig-side analog numbers are ADC channels; jig-side digital numbers are
//! GPIOs.  Target-side numbers are the target's own pin numbers, used only
//! through the target command channel.

use serde::{Deserialize, Serialize};

/// A pin number, scoped to whichever side (jig or target) owns the role.
pub type Pin = u8;

/// Number of data lines on the target's output port.
pub const OUTPUT_LINES: usize = 8;

// ---------------------------------------------------------------------------
// Stock jig wiring
// ---------------------------------------------------------------------------

/// Target pins forming the 8-bit output port, bit 0 first.  The port is
/// written in one go starting at the first entry.
pub const TARGET_PORT_PINS: [Pin; OUTPUT_LINES] = [2, 14, 7, 8, 6, 20, 21, 5];

/// Jig ADC channels sensing each data line through a divider, bit 0 first.
pub const DATA_SENSE_ADC: [Pin; OUTPUT_LINES] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Jig ADC channel sensing the target's 3.3 V regulator output.
pub const TARGET_33V_ADC: Pin = 8;
/// Jig ADC channel sensing the target's VUSB rail.
pub const TARGET_VUSB_ADC: Pin = 9;

/// USB connector shield, expected to be grounded through the target.
pub const USB_SHIELD_GROUND_GPIO: Pin = 10;
/// USB connector signal ground.
pub const USB_SIGNAL_GROUND_GPIO: Pin = 11;
pub const USB_DPLUS_GPIO: Pin = 12;
pub const USB_DMINUS_GPIO: Pin = 13;

/// PWM output feeding the variable supply that powers the target.
pub const POWER_PWM_GPIO: Pin = 4;

/// Fixed role table.  Roles are assigned once and never reassigned while a
/// run is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub target_port: [Pin; OUTPUT_LINES],
    pub data_sense: [Pin; OUTPUT_LINES],
    pub target_33v: Pin,
    pub target_vusb: Pin,
    pub usb_shield_ground: Pin,
    pub usb_signal_ground: Pin,
    pub usb_dplus: Pin,
    pub usb_dminus: Pin,
    pub power_pwm: Pin,
}

impl PinMap {
    /// First pin of the target output port (the `digitalWritePort` anchor).
    pub fn port_base(&self) -> Pin {
        self.target_port[0]
    }

    /// Jig-side ADC channels.  These must be pairwise distinct.
    pub fn analog_sense(&self) -> [Pin; OUTPUT_LINES + 2] {
        let mut channels = [0; OUTPUT_LINES + 2];
        channels[..OUTPUT_LINES].copy_from_slice(&self.data_sense);
        channels[OUTPUT_LINES] = self.target_33v;
        channels[OUTPUT_LINES + 1] = self.target_vusb;
        channels
    }

    /// Jig-side digital pins.  These must be pairwise distinct.
    pub fn jig_digital(&self) -> [Pin; 5] {
        [
            self.usb_shield_ground,
            self.usb_signal_ground,
            self.usb_dplus,
            self.usb_dminus,
            self.power_pwm,
        ]
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            target_port: TARGET_PORT_PINS,
            data_sense: DATA_SENSE_ADC,
            target_33v: TARGET_33V_ADC,
            target_vusb: TARGET_VUSB_ADC,
            usb_shield_ground: USB_SHIELD_GROUND_GPIO,
            usb_signal_ground: USB_SIGNAL_GROUND_GPIO,
            usb_dplus: USB_DPLUS_GPIO,
            usb_dminus: USB_DMINUS_GPIO,
            power_pwm: POWER_PWM_GPIO,
        }
    }
}
