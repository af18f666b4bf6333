//! The device module contains the register map and driver of the MCP23017.
//!
//! In most cases you will not need anything from here explicitly, the exposed types at the root of
//! the crate should be enough.  [`mcp23017::Regs`] and [`mcp23017::RegisterKind`] are useful
//! together with [`Mcp23017::bus_mut()`][crate::Mcp23017::bus_mut] for raw register access.

pub mod mcp23017;
