//! Board-agnostic core logic for the Photochron latency checker
//!
//! This crate contains all measurement logic that does not depend on
//! specific hardware implementations:
//!
//! - Capture event types and the bounded edge hand-off channel
//! - Moving average filter for the analog sensor
//! - Hysteresis state machine that turns noisy samples into virtual edges
//! - Edge correlation and latency computation
//! - Calibration controller for deriving hysteresis thresholds
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

// Host tests (proptest) need the std macros
#[cfg(test)]
#[macro_use]
extern crate std;

pub mod calibrate;
pub mod capture;
pub mod config;
pub mod correlate;
pub mod filter;
pub mod hysteresis;
