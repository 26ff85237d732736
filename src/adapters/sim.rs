//! Host simulation of the jig and a board under test.
//!
//! Models just enough physics for every check to behave as it would on the
//! bench:
//!
//! - the supply output follows the PWM duty, the target's VUSB rail follows
//!   the supply and its 3.3 V regulator follows VUSB;
//! - released jig pins keep their last driven level (parasitic charge)
//!   unless a pull-up, a ground, or a short holds them;
//! - the target's output port drives data lines to VUSB or 0 V.
//!
//! Faults are injected through [`BoardFaults`].  The board is shared between
//! a [`SimTarget`] (target channel) and a [`SimJig`] (local hardware) handle
//! so both can be borrowed mutably at once, the way the real jig holds two
//! independent interfaces to the same copper.

use core::cell::RefCell;
use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use crate::analog::AnalogMonitor;
use crate::app::ports::{
    AnalogInput, DigitalPins, LogLevel, PinMode, PwmOutput, TargetChannel, TargetLog,
};
use crate::config::JigConfig;
use crate::pins::{OUTPUT_LINES, Pin};

/// Regulator dropout: below this VUSB the 3.3 V rail sags.
const REGULATOR_MIN_INPUT_VOLTS: f32 = 3.6;

/// Defects the simulated board can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardFaults {
    /// VUSB rail never comes up (shorted or open input).
    pub dead_vusb: bool,
    pub open_shield_ground: bool,
    pub open_signal_ground: bool,
    /// Solder bridge between D+ and D-.
    pub data_lines_shorted: bool,
    /// Target's D+ pull-up missing or not switching.
    pub missing_dplus_pullup: bool,
    /// Data lines stuck high regardless of the port value (bitmask).
    pub stuck_high: u8,
    /// Data lines stuck low regardless of the port value (bitmask).
    pub stuck_low: u8,
    /// Two data lines (bit indices) bridged together; a line driven low wins.
    pub bridged: Option<(usize, usize)>,
    /// Target channel rejects every command.
    pub refuse_commands: bool,
}

struct Board {
    config: JigConfig,
    faults: BoardFaults,
    scale: f32,

    supply_duty: u8,
    pwm_frequency_hz: Option<u32>,
    elapsed_ns: u64,

    jig_modes: HashMap<Pin, PinMode>,
    jig_driven: HashMap<Pin, PinState>,
    charge: HashMap<Pin, PinState>,
    digital_reads: u32,

    port_outputs: [bool; OUTPUT_LINES],
    port_bits: u8,
    port_writes: Vec<u8>,
    usb_pullup: bool,
    log: Vec<(LogLevel, String)>,
}

impl Board {
    fn supply_volts(&self) -> f32 {
        f32::from(self.supply_duty) / 255.0 * self.config.supply.full_scale_volts
    }

    fn vusb_volts(&self) -> f32 {
        if self.faults.dead_vusb {
            0.0
        } else {
            self.supply_volts()
        }
    }

    fn rail_33v_volts(&self) -> f32 {
        let vusb = self.vusb_volts();
        if vusb >= REGULATOR_MIN_INPUT_VOLTS {
            self.config.levels.rail_33v_volts
        } else {
            (vusb - 0.3).max(0.0)
        }
    }

    fn data_line_volts(&self, n: usize) -> f32 {
        match self.faults.bridged {
            Some((a, b)) if n == a || n == b => {
                self.driven_line_volts(a).min(self.driven_line_volts(b))
            }
            _ => self.driven_line_volts(n),
        }
    }

    fn driven_line_volts(&self, n: usize) -> f32 {
        let bits = (self.port_bits | self.faults.stuck_high) & !self.faults.stuck_low;
        let forced = ((self.faults.stuck_high | self.faults.stuck_low) >> n) & 1 == 1;
        let driven = self.port_outputs[n] || forced;
        if driven && (bits >> n) & 1 == 1 {
            self.vusb_volts()
        } else {
            0.0
        }
    }

    fn volts_at(&self, pin: Pin) -> f32 {
        let pins = &self.config.pins;
        if pin == pins.target_vusb {
            self.vusb_volts()
        } else if pin == pins.target_33v {
            self.rail_33v_volts()
        } else if let Some(n) = pins.data_sense.iter().position(|&p| p == pin) {
            self.data_line_volts(n)
        } else {
            0.0
        }
    }

    fn dplus_pulled(&self) -> bool {
        self.usb_pullup && !self.faults.missing_dplus_pullup
    }

    /// External level holding `pin`, if any.
    fn bias(&self, pin: Pin, mode: PinMode) -> Option<PinState> {
        let pins = &self.config.pins;
        let ground = |open: bool| {
            if !open {
                Some(PinState::Low)
            } else if mode == PinMode::InputPullup {
                Some(PinState::High)
            } else {
                None
            }
        };

        if pin == pins.usb_shield_ground {
            ground(self.faults.open_shield_ground)
        } else if pin == pins.usb_signal_ground {
            ground(self.faults.open_signal_ground)
        } else if pin == pins.usb_dplus {
            self.dplus_pulled().then_some(PinState::High)
        } else if pin == pins.usb_dminus {
            (self.faults.data_lines_shorted && self.dplus_pulled()).then_some(PinState::High)
        } else {
            None
        }
    }
}

/// Owner of the simulated board; hands out the two port handles and exposes
/// what happened for assertions.
#[derive(Clone)]
pub struct SimBoard(Rc<RefCell<Board>>);

/// Target channel handle.
pub struct SimTarget(Rc<RefCell<Board>>);

/// Jig hardware handle.
pub struct SimJig(Rc<RefCell<Board>>);

impl SimBoard {
    pub fn new(config: &JigConfig, faults: BoardFaults) -> Self {
        let scale = AnalogMonitor::new(&config.adc).scale();
        Self(Rc::new(RefCell::new(Board {
            config: config.clone(),
            faults,
            scale,
            supply_duty: 0,
            pwm_frequency_hz: None,
            elapsed_ns: 0,
            jig_modes: HashMap::new(),
            jig_driven: HashMap::new(),
            charge: HashMap::new(),
            digital_reads: 0,
            port_outputs: [false; OUTPUT_LINES],
            port_bits: 0,
            port_writes: Vec::new(),
            usb_pullup: false,
            log: Vec::new(),
        })))
    }

    pub fn healthy(config: &JigConfig) -> Self {
        Self::new(config, BoardFaults::default())
    }

    pub fn target(&self) -> SimTarget {
        SimTarget(Rc::clone(&self.0))
    }

    pub fn jig(&self) -> SimJig {
        SimJig(Rc::clone(&self.0))
    }

    /// Everything the target logged, in order.
    pub fn log(&self) -> Vec<(LogLevel, String)> {
        self.0.borrow().log.clone()
    }

    /// Error-level target log lines.
    pub fn errors(&self) -> Vec<String> {
        self.0
            .borrow()
            .log
            .iter()
            .filter(|(level, _)| *level == LogLevel::Error)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Every value written to the target port, in order.
    pub fn port_writes(&self) -> Vec<u8> {
        self.0.borrow().port_writes.clone()
    }

    pub fn port_bits(&self) -> u8 {
        self.0.borrow().port_bits
    }

    pub fn usb_pullup(&self) -> bool {
        self.0.borrow().usb_pullup
    }

    pub fn supply_duty(&self) -> u8 {
        self.0.borrow().supply_duty
    }

    pub fn pwm_frequency_hz(&self) -> Option<u32> {
        self.0.borrow().pwm_frequency_hz
    }

    /// Number of jig digital reads taken so far.
    pub fn digital_reads(&self) -> u32 {
        self.0.borrow().digital_reads
    }

    /// Total time spent in the jig's blocking delay.
    pub fn elapsed_ms(&self) -> u64 {
        self.0.borrow().elapsed_ns / 1_000_000
    }
}

// ── Target channel ────────────────────────────────────────────

impl TargetLog for SimTarget {
    fn log(&mut self, level: LogLevel, message: fmt::Arguments<'_>) {
        self.0.borrow_mut().log.push((level, message.to_string()));
    }
}

impl TargetChannel for SimTarget {
    fn pin_mode(&mut self, pin: Pin, mode: PinMode) -> bool {
        let mut board = self.0.borrow_mut();
        if board.faults.refuse_commands {
            return false;
        }
        if let Some(n) = board.config.pins.target_port.iter().position(|&p| p == pin) {
            board.port_outputs[n] = mode == PinMode::Output;
        }
        true
    }

    fn digital_write_port(&mut self, first_pin: Pin, bits: u8) -> bool {
        let mut board = self.0.borrow_mut();
        if board.faults.refuse_commands || first_pin != board.config.pins.port_base() {
            return false;
        }
        board.port_bits = bits;
        board.port_writes.push(bits);
        true
    }

    fn usb_set_pullup(&mut self, enabled: bool) -> bool {
        let mut board = self.0.borrow_mut();
        if board.faults.refuse_commands {
            return false;
        }
        board.usb_pullup = enabled;
        true
    }
}

// ── Jig hardware ──────────────────────────────────────────────

impl AnalogInput for SimJig {
    fn analog_read(&mut self, pin: Pin) -> u16 {
        let board = self.0.borrow();
        let code = (board.volts_at(pin) / board.scale).round();
        code.clamp(0.0, f32::from(board.config.adc.adc_max)) as u16
    }
}

impl DigitalPins for SimJig {
    fn pin_mode(&mut self, pin: Pin, mode: PinMode) {
        let mut board = self.0.borrow_mut();
        if mode == PinMode::Output {
            if let Some(&level) = board.jig_driven.get(&pin) {
                board.charge.insert(pin, level);
            }
        }
        board.jig_modes.insert(pin, mode);
    }

    fn digital_read(&mut self, pin: Pin) -> PinState {
        let mut board = self.0.borrow_mut();
        board.digital_reads += 1;

        let mode = board.jig_modes.get(&pin).copied().unwrap_or(PinMode::Input);
        if mode == PinMode::Output {
            return board.jig_driven.get(&pin).copied().unwrap_or(PinState::Low);
        }
        board
            .bias(pin, mode)
            .or_else(|| board.charge.get(&pin).copied())
            .unwrap_or(PinState::Low)
    }

    fn digital_write(&mut self, pin: Pin, level: PinState) {
        let mut board = self.0.borrow_mut();
        board.jig_driven.insert(pin, level);
        if board.jig_modes.get(&pin) == Some(&PinMode::Output) {
            board.charge.insert(pin, level);
        }
    }
}

impl PwmOutput for SimJig {
    fn set_pwm_frequency(&mut self, _pin: Pin, hz: u32) {
        self.0.borrow_mut().pwm_frequency_hz = Some(hz);
    }

    fn analog_write(&mut self, pin: Pin, duty: u8) {
        let mut board = self.0.borrow_mut();
        if pin == board.config.pins.power_pwm {
            board.supply_duty = duty;
        }
    }
}

impl DelayNs for SimJig {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().elapsed_ns += u64::from(ns);
    }
}
