//! Blocking driver for the Microchip MCP23017 16-bit I2C GPIO expander.
//!
//! The crate is split in two layers:
//!
//! - [`RegisterClient`] frames register reads and writes on the bus.  Write rejections and read
//!   timeouts are reported through the return value and through optional handlers; a sticky
//!   flag remembers whether the last read timed out.
//! - [`Mcp23017`] maps pin, port and chip level operations onto register accesses.
//!
//! ```no_run
//! # use embedded_hal_mock::eh1::i2c as mock_i2c;
//! # let i2c = mock_i2c::Mock::new(&[] as &[mock_i2c::Transaction]);
//! # let delay = embedded_hal_mock::eh1::delay::NoopDelay::new();
//! use mcp23017_io::{Mcp23017, PinMode};
//!
//! let mut mcp = Mcp23017::new(i2c, delay);
//! mcp.pin_mode(0, PinMode::Output).unwrap();
//! mcp.digital_write(0, true).unwrap();
//! let pressed = !mcp.digital_read(8).unwrap();
//! ```
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "std")]
extern crate std;

mod bus;
mod common;
pub mod dev;
mod mutex;
mod pin;

pub use bus::{NackHandler, RegisterClient, TimeoutHandler, DEFAULT_TIMEOUT_MS};
pub use common::mode;
pub use common::{
    pin_to_bit, pin_to_mask, pin_to_port, Error, InterruptPinMode, InterruptTrigger, PinMode,
    Port, PortDriver, PIN_COUNT,
};
pub use mutex::PortMutex;
pub use pin::Pin;

pub use dev::mcp23017::{Mcp23017, Parts, Shared, DEFAULT_ADDRESS, NO_INTERRUPT};
