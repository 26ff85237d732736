//! Test orchestration: sequencing only, zero direct I/O.
//!
//! The [`service::ElectricalTest`] composes the individual checks into a
//! full run.  All interaction with the jig and the target happens through
//! the **port traits** defined in [`ports`].

pub mod ports;
pub mod service;
