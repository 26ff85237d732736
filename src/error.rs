//! Fault types for the electrical test.
//!
//! Every check returns [`Outcome`]; the first `Err` ends the run.  All
//! variants are `Copy` so they pass through the fail-fast chain with `?`
//! without allocation.  The `Display` text is the diagnostic written to the
//! target log.

use core::fmt;

use log::{error, warn};

use crate::app::ports::{LogLevel, TargetLog};
use crate::pins::Pin;

// ---------------------------------------------------------------------------
// Top-level fault
// ---------------------------------------------------------------------------

/// First failing observation of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    /// The target channel refused or failed a command.
    Command(TargetCommand),
    /// A sensed voltage fell outside its acceptance band.
    OutOfTolerance(Deviation),
    /// A USB ground pin read HIGH through the jig's pull-up.
    Ground(GroundNet),
    /// A USB data line was not in its expected floating/pulled state.
    DataLine { line: UsbLine, fault: LineFault },
}

/// Coarse fault class, useful for yield statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Communication or command failure on the target channel.
    Remote,
    /// Voltage out of tolerance.
    Electrical,
    /// Digital level disagreed with the expected pin state.
    Logical,
}

impl Fault {
    pub const fn class(&self) -> FaultClass {
        match self {
            Self::Command(_) => FaultClass::Remote,
            Self::OutOfTolerance(_) => FaultClass::Electrical,
            Self::Ground(_) | Self::DataLine { .. } => FaultClass::Logical,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(cmd) => write!(f, "Target command failed: {cmd}"),
            Self::OutOfTolerance(d) => write!(f, "{d}"),
            Self::Ground(net) => write!(f, "Faulty USB {net} ground"),
            Self::DataLine { line, fault } => match fault {
                LineFault::ExpectedHighZ => write!(f, "Fault on USB {line}, expected High-Z"),
                LineFault::NoPullUp => write!(f, "Fault on USB {line}, no pull-up found"),
                LineFault::ShortToDPlus => {
                    write!(f, "Fault on USB {line}, expected High-Z. Possible short to D+")
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Remote commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCommand {
    PinMode { pin: Pin },
    WritePort { bits: u8 },
    UsbPullup { enabled: bool },
}

impl fmt::Display for TargetCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinMode { pin } => write!(f, "pinMode({pin})"),
            Self::WritePort { bits } => write!(f, "digitalWritePort(0x{bits:02X})"),
            Self::UsbPullup { enabled } => write!(f, "usbSetPullup({enabled})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Electrical
// ---------------------------------------------------------------------------

/// A measurement outside `[nominal - tolerance, nominal + tolerance]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    pub pin: Pin,
    pub measured: f32,
    pub nominal: f32,
    pub tolerance: f32,
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Analog value {} outside reference range! value = {:.2}v, ref = {:.2}v +/- {:.2}v",
            self.pin, self.measured, self.nominal, self.tolerance
        )
    }
}

// ---------------------------------------------------------------------------
// Logical
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundNet {
    Shield,
    Signal,
}

impl fmt::Display for GroundNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shield => write!(f, "shield"),
            Self::Signal => write!(f, "signal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbLine {
    DPlus,
    DMinus,
}

impl fmt::Display for UsbLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DPlus => write!(f, "D+"),
            Self::DMinus => write!(f, "D-"),
        }
    }
}

/// Suspected cause behind a data-line mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFault {
    /// Line should float but something drives or biases it.
    ExpectedHighZ,
    /// Line should be pulled high by the target but floats or sits low.
    NoPullUp,
    /// D- follows the D+ pull-up.
    ShortToDPlus,
}

// ---------------------------------------------------------------------------
// Run-level result
// ---------------------------------------------------------------------------

/// Top-level stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PowerOn,
    InitTarget,
    UsbConnections,
    OutputPatterns,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerOn => write!(f, "power on"),
            Self::InitTarget => write!(f, "target init"),
            Self::UsbConnections => write!(f, "USB connections"),
            Self::OutputPatterns => write!(f, "output patterns"),
        }
    }
}

/// The stage that aborted a run and the fault that aborted it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunFailure {
    pub stage: Stage,
    pub fault: Fault,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.fault)
    }
}

/// Result of a single check.
pub type Outcome = core::result::Result<(), Fault>;

/// Write a detected fault to the target log at error severity (and to the
/// local log), then hand it back for propagation.
pub(crate) fn report(target: &mut impl TargetLog, fault: Fault) -> Fault {
    error!("ETEST: {fault}");
    target.log(LogLevel::Error, format_args!("ETEST: {fault}"));
    fault
}

/// Turn a remote command's success flag into an [`Outcome`].  The channel
/// itself failed, so nothing is sent back over it.
pub(crate) fn command(accepted: bool, cmd: TargetCommand) -> Outcome {
    if accepted {
        Ok(())
    } else {
        warn!("ETEST: target command failed: {cmd}");
        Err(Fault::Command(cmd))
    }
}

/// Tag a check result with the stage it belongs to.
pub(crate) trait StageExt<T> {
    fn in_stage(self, stage: Stage) -> core::result::Result<T, RunFailure>;
}

impl<T> StageExt<T> for core::result::Result<T, Fault> {
    fn in_stage(self, stage: Stage) -> core::result::Result<T, RunFailure> {
        self.map_err(|fault| RunFailure { stage, fault })
    }
}
