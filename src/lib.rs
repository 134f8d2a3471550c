//! Platform-agnostic driver for the MAX31865 RTD-to-digital converter.
//!
//! The conversion from the 15-bit resistance code to a PT100 temperature is done
//! entirely in fixed point, so the crate is usable on cores without an FPU.

#![cfg_attr(not(test), no_std)]

pub mod bounded_spi;
pub mod max31865;
pub mod rtd;

#[cfg(test)]
mod mock;

pub use crate::max31865::{Config, Error, Filter, Max31865, Reading, RegisterReading, Wiring};
pub use crate::rtd::{RawCode, Resistance, Temperature};
