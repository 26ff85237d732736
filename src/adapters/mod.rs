//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter | Implements                              | Connects to            |
//! |---------|-----------------------------------------|------------------------|
//! | `sim`   | TargetChannel                           | Simulated target board |
//! |         | AnalogInput, DigitalPins, PwmOutput,    | Simulated jig I/O      |
//! |         | DelayNs                                 |                        |
//!
//! Bench adapters for a specific jig controller implement the same traits
//! in the binary that drives the jig.  The simulator is host-only.

#[cfg(not(target_os = "espidf"))]
pub mod sim;
