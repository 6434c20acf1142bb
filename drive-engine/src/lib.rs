//! Accumulator and decay engine for a two-motor directional drive.
//!
//! Commands add to a signed per-motor counter, running an engine decays the
//! counter back to zero while writing the mapped output to its pins.
#![cfg_attr(not(test), no_std)]

pub mod actuation;
pub mod engine;
pub mod errors;
pub mod pin_log;
pub mod router;

pub use actuation::{Actuation, ActuationMapper};
pub use engine::{DecayReport, MotorEngine, PinName, PinWrite, Polarity, Tuning};
pub use errors::Error;
pub use router::{Route, Router};
