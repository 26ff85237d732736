//! Production electrical test for freshly assembled LED controller boards.
//!
//! Runs on the test jig before any firmware is flashed to the board.  The jig
//! powers the target through a PWM-controlled supply, probes its USB
//! connector and drives its output port through the target command channel,
//! and measures every resulting voltage.  The first failing check ends the
//! run with a diagnostic in the target log.
//!
//! Hardware access goes exclusively through the traits in [`app::ports`];
//! [`adapters::sim`] implements them for host-side tests.

#![deny(unused_must_use)]

pub mod analog;
pub mod app;
pub mod config;
pub mod error;
pub mod patterns;
pub mod pins;
pub mod probes;
pub mod supply;
pub mod usb;

pub mod adapters;

pub use app::service::ElectricalTest;
pub use config::JigConfig;
pub use error::{Fault, Outcome, RunFailure, Stage};
