//! Support for the `MCP23017` "16-Bit I/O Expander with Serial Interface"
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! The MCP23017 offers two eight-bit GPIO ports.  It has three address pins, so eight devices can
//! coexist on an I2C bus.  Each port has an interrupt output, which can be configured to work
//! together or independently.
//!
//! When passing 16-bit values to this driver, the upper byte corresponds to port B (pins 7..0)
//! and the lower byte corresponds to port A (pins 7..0).  Pins are numbered 0..=7 for GPA0..GPA7
//! and 8..=15 for GPB0..GPB7.
//!
//! The driver keeps no copy of the chip registers.  Every single-pin change is a read of the
//! register followed by a write of the modified value, so two contexts driving the same chip need
//! to share it through a [`Shared`] handle.
use crate::bus::RegisterClient;
use crate::common::{
    check_pin, pin_to_mask, pin_to_port, Error, InterruptPinMode, InterruptTrigger, PinMode, Port,
};
use crate::mode;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Bus address with all address pins tied low.
pub const DEFAULT_ADDRESS: u8 = 0x20;

/// Returned by [`Mcp23017::get_interrupt()`] when no pin has a pending interrupt.
pub const NO_INTERRUPT: u8 = 255;

/// IOCON bits, see [`Regs::IOCONA`].
const IOCON_MIRROR: u8 = 6;
const IOCON_ODR: u8 = 2;
const IOCON_INTPOL: u8 = 1;

/// Register addresses.
///
/// N.B.: These values are for BANK=0, which is the reset state of the chip (and this driver does
/// not change).  In this layout the A and B register of each pair are adjacent, which is what
/// [`RegisterKind::at()`] relies on.
///
/// For all registers, the reset value is 0x00, except for IODIR{A,B} which are 0xFF (making all
/// pins inputs) at reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Regs {
    /// IODIR: input/output direction: 0=output; 1=input
    IODIRA = 0x00,
    IODIRB = 0x01,
    /// IPOL: input polarity: 0=register values match input pins; 1=opposite
    IPOLA = 0x02,
    IPOLB = 0x03,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    GPINTENA = 0x04,
    GPINTENB = 0x05,
    /// DEFVAL: default values for interrupt-on-change
    DEFVALA = 0x06,
    DEFVALB = 0x07,
    /// INTCON: interrupt-on-change config: 0=compare to previous pin value;
    ///   1=compare to corresponding bit in DEFVAL
    INTCONA = 0x08,
    INTCONB = 0x09,
    /// IOCON: configuration register, shared by both ports
    /// - Bit 7: BANK (which driver assumes stays 0)
    /// - Bit 6: MIRROR: if enabled, INTA and INTB are logically ORed
    /// - Bit 5: SEQOP: disables the address pointer auto-increment
    /// - Bit 4: DISSLW: disables slew rate control on SDA
    /// - Bit 3: HAEN: no effect on MCP23017
    /// - Bit 2: ODR: interrupt pins are 0=active-driver outputs (INTPOL sets polarity)
    ///          or 1=open-drain outputs (overrides INTPOL)
    /// - Bit 1: INTPOL: interrupt pin is 0=active-low or 1=active-high
    /// - Bit 0: unused
    IOCONA = 0x0a,
    IOCONB = 0x0b,
    /// GPPU: GPIO pull-ups: enables weak internal pull-ups on each pin (when configured
    ///   as an input)
    GPPUA = 0x0c,
    GPPUB = 0x0d,
    /// INTF: interrupt flags: 0=no interrupt pending; 1=corresponding pin caused interrupt
    INTFA = 0x0e,
    INTFB = 0x0f,
    /// INTCAP: interrupt captured value: reflects value of each pin at the time that they
    ///   caused an interrupt
    INTCAPA = 0x10,
    INTCAPB = 0x11,
    /// GPIO: reflects logic level on pins
    GPIOA = 0x12,
    GPIOB = 0x13,
    /// OLAT: output latches: sets state for pins configured as outputs
    OLATA = 0x14,
    OLATB = 0x15,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

/// All registers, indexed by address.
const REGISTER_MAP: [Regs; 22] = [
    Regs::IODIRA,
    Regs::IODIRB,
    Regs::IPOLA,
    Regs::IPOLB,
    Regs::GPINTENA,
    Regs::GPINTENB,
    Regs::DEFVALA,
    Regs::DEFVALB,
    Regs::INTCONA,
    Regs::INTCONB,
    Regs::IOCONA,
    Regs::IOCONB,
    Regs::GPPUA,
    Regs::GPPUB,
    Regs::INTFA,
    Regs::INTFB,
    Regs::INTCAPA,
    Regs::INTCAPB,
    Regs::GPIOA,
    Regs::GPIOB,
    Regs::OLATA,
    Regs::OLATB,
];

/// A register pair, identified by the address of its port A register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterKind {
    IODIR = 0x00,
    IPOL = 0x02,
    GPINTEN = 0x04,
    DEFVAL = 0x06,
    INTCON = 0x08,
    IOCON = 0x0a,
    GPPU = 0x0c,
    INTF = 0x0e,
    INTCAP = 0x10,
    GPIO = 0x12,
    OLAT = 0x14,
}

impl RegisterKind {
    /// The register of this kind belonging to `port`.
    pub fn at(self, port: Port) -> Regs {
        REGISTER_MAP[usize::from(self as u8 + port as u8)]
    }
}

fn fill(set: bool) -> u8 {
    if set {
        0xff
    } else {
        0x00
    }
}

/// `MCP23017` "16-Bit I/O Expander with Serial Interface"
pub struct Mcp23017<I2C, D> {
    bus: RegisterClient<I2C, D>,
}

impl<I2C, D> Mcp23017<I2C, D> {
    /// Driver for a chip at [`DEFAULT_ADDRESS`].
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    /// Driver for a chip at 7-bit `address`.  The top bit of `address` is ignored.
    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            bus: RegisterClient::new(i2c, delay, address),
        }
    }

    /// Driver for a chip whose A0..A2 pins are strapped as given.
    pub fn with_address_pins(i2c: I2C, delay: D, a0: bool, a1: bool, a2: bool) -> Self {
        let address = DEFAULT_ADDRESS | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8);
        Self::with_address(i2c, delay, address)
    }

    /// Register access underneath this driver: timeout, failure handlers and raw registers.
    pub fn bus(&self) -> &RegisterClient<I2C, D> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut RegisterClient<I2C, D> {
        &mut self.bus
    }

    /// Whether the most recent register read timed out.
    pub fn timed_out(&self) -> bool {
        self.bus.timed_out()
    }

    pub fn release(self) -> (I2C, D) {
        self.bus.release()
    }
}

impl<I2C: I2c, D: DelayNs> Mcp23017<I2C, D> {
    fn read(&mut self, kind: RegisterKind, port: Port) -> Result<u8, Error> {
        self.bus.try_read_register(kind.at(port))
    }

    fn write(&mut self, kind: RegisterKind, port: Port, value: u8) -> Result<(), Error> {
        self.bus.try_write_registers(kind.at(port), &[value])
    }

    /// Read both registers of a pair in one transaction.
    fn read_pair(&mut self, kind: RegisterKind) -> Result<u16, Error> {
        let mut buf = [0x00; 2];
        self.bus.try_read_registers(kind.at(Port::A), &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Write both registers of a pair in one transaction.
    fn write_pair(&mut self, kind: RegisterKind, value: u16) -> Result<(), Error> {
        self.bus.try_write_registers(kind.at(Port::A), &value.to_le_bytes())
    }

    /// Set or clear the bit of `pin` in the register of kind `kind` on the pin's port.
    fn update_pin(&mut self, kind: RegisterKind, pin: u8, set: bool) -> Result<(), Error> {
        check_pin(pin)?;
        let mask = pin_to_mask(pin);
        let (mask_set, mask_clear) = if set { (mask, 0) } else { (0, mask) };
        self.bus
            .update_register(kind.at(pin_to_port(pin)), mask_set, mask_clear)
    }

    fn update_config_bit(&mut self, bit: u8, set: bool) -> Result<(), Error> {
        let mask = 1 << bit;
        let (mask_set, mask_clear) = if set { (mask, 0) } else { (0, mask) };
        self.bus.update_register(Regs::IOCONA, mask_set, mask_clear)
    }

    pub fn pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), Error> {
        let (input, pull_up) = mode.bits();
        self.update_pin(RegisterKind::IODIR, pin, input)?;
        self.update_pin(RegisterKind::GPPU, pin, pull_up)
    }

    /// Set the output latch of `pin`.  Has no visible effect while the pin is an input.
    pub fn digital_write(&mut self, pin: u8, state: bool) -> Result<(), Error> {
        self.update_pin(RegisterKind::OLAT, pin, state)
    }

    /// Logic level on `pin`, after polarity inversion.
    pub fn digital_read(&mut self, pin: u8) -> Result<bool, Error> {
        check_pin(pin)?;
        Ok(self.read(RegisterKind::GPIO, pin_to_port(pin))? & pin_to_mask(pin) != 0)
    }

    /// Level the output latch of `pin` is set to.
    pub fn digital_read_latch(&mut self, pin: u8) -> Result<bool, Error> {
        check_pin(pin)?;
        Ok(self.read(RegisterKind::OLAT, pin_to_port(pin))? & pin_to_mask(pin) != 0)
    }

    pub fn port_mode(&mut self, port: Port, mode: PinMode) -> Result<(), Error> {
        let (input, pull_up) = mode.bits();
        self.write(RegisterKind::IODIR, port, fill(input))?;
        self.write(RegisterKind::GPPU, port, fill(pull_up))
    }

    pub fn write_port(&mut self, port: Port, value: u8) -> Result<(), Error> {
        self.write(RegisterKind::OLAT, port, value)
    }

    pub fn read_port(&mut self, port: Port) -> Result<u8, Error> {
        self.read(RegisterKind::GPIO, port)
    }

    pub fn chip_mode(&mut self, mode: PinMode) -> Result<(), Error> {
        for port in Port::BOTH {
            self.port_mode(port, mode)?;
        }
        Ok(())
    }

    /// Set all output latches at once.
    pub fn write_chip(&mut self, value: u16) -> Result<(), Error> {
        self.write_pair(RegisterKind::OLAT, value)
    }

    /// Read all 16 pins at once.
    pub fn read_chip(&mut self) -> Result<u16, Error> {
        self.read_pair(RegisterKind::GPIO)
    }

    pub fn set_pin_polarity(&mut self, pin: u8, inverted: bool) -> Result<(), Error> {
        self.update_pin(RegisterKind::IPOL, pin, inverted)
    }

    pub fn set_port_polarity(&mut self, port: Port, inverted: bool) -> Result<(), Error> {
        self.write(RegisterKind::IPOL, port, fill(inverted))
    }

    pub fn set_chip_polarity(&mut self, inverted: bool) -> Result<(), Error> {
        for port in Port::BOTH {
            self.set_port_polarity(port, inverted)?;
        }
        Ok(())
    }

    /// Enable or disable interrupt-on-change for `pin`.
    pub fn set_interrupt(&mut self, pin: u8, enabled: bool) -> Result<(), Error> {
        self.update_pin(RegisterKind::GPINTEN, pin, enabled)
    }

    pub fn set_port_interrupt(&mut self, port: Port, enabled: bool) -> Result<(), Error> {
        self.write(RegisterKind::GPINTEN, port, fill(enabled))
    }

    pub fn set_chip_interrupt(&mut self, enabled: bool) -> Result<(), Error> {
        for port in Port::BOTH {
            self.set_port_interrupt(port, enabled)?;
        }
        Ok(())
    }

    /// Enable interrupt-on-change exactly for the pins set in `mask`.
    pub fn set_interrupt_mask(&mut self, mask: u16) -> Result<(), Error> {
        self.write_pair(RegisterKind::GPINTEN, mask)
    }

    /// Choose what an interrupt-enabled `pin` is compared against.
    pub fn set_interrupt_trigger(
        &mut self,
        pin: u8,
        trigger: InterruptTrigger,
    ) -> Result<(), Error> {
        match trigger {
            InterruptTrigger::OnChange => self.update_pin(RegisterKind::INTCON, pin, false),
            InterruptTrigger::CompareTo(level) => {
                self.update_pin(RegisterKind::DEFVAL, pin, level)?;
                self.update_pin(RegisterKind::INTCON, pin, true)
            }
        }
    }

    /// Pending interrupt flags of all pins; bit `n` is set if pin `n` caused an interrupt.
    pub fn interrupt_flags(&mut self) -> Result<u16, Error> {
        self.read_pair(RegisterKind::INTF)
    }

    /// Number of the pin that caused the pending interrupt, or [`NO_INTERRUPT`].
    ///
    /// If several pins triggered at the same time, only the lowest-numbered one is reported
    /// (GPA0..GPA7, then GPB0..GPB7).  Use [`interrupt_flags()`][Self::interrupt_flags] to see
    /// all of them.
    pub fn get_interrupt(&mut self) -> Result<u8, Error> {
        let flags = self.interrupt_flags()?;
        if flags == 0 {
            Ok(NO_INTERRUPT)
        } else {
            Ok(flags.trailing_zeros() as u8)
        }
    }

    /// Pin levels latched when the last interrupt fired.  Reading clears the interrupt.
    pub fn interrupt_capture(&mut self) -> Result<u16, Error> {
        self.read_pair(RegisterKind::INTCAP)
    }

    pub fn port_interrupt_capture(&mut self, port: Port) -> Result<u8, Error> {
        self.read(RegisterKind::INTCAP, port)
    }

    /// Configure the electrical behavior of the INTA/INTB outputs.
    ///
    /// Each affected IOCON bit is updated in its own read-modify-write.
    pub fn set_int_pin_mode(&mut self, mode: InterruptPinMode) -> Result<(), Error> {
        match mode {
            InterruptPinMode::OpenDrain => self.update_config_bit(IOCON_ODR, true),
            InterruptPinMode::LowOnInt => {
                self.update_config_bit(IOCON_ODR, false)?;
                self.update_config_bit(IOCON_INTPOL, false)
            }
            InterruptPinMode::HighOnInt => {
                self.update_config_bit(IOCON_ODR, false)?;
                self.update_config_bit(IOCON_INTPOL, true)
            }
        }
    }

    /// When enabled, INTA and INTB both fire for an interrupt on either port.
    pub fn interrupt_mirror(&mut self, enabled: bool) -> Result<(), Error> {
        self.update_config_bit(IOCON_MIRROR, enabled)
    }
}

impl<I2C: I2c, D: DelayNs> crate::PortDriver for Mcp23017<I2C, D> {
    type Error = Error;

    fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), Self::Error> {
        self.pin_mode(pin, mode)
    }

    fn write_pin(&mut self, pin: u8, state: bool) -> Result<(), Self::Error> {
        self.digital_write(pin, state)
    }

    fn read_pin(&mut self, pin: u8) -> Result<bool, Self::Error> {
        self.digital_read(pin)
    }

    fn read_pin_latch(&mut self, pin: u8) -> Result<bool, Self::Error> {
        self.digital_read_latch(pin)
    }
}

/// An [`Mcp23017`] behind a mutex, so it can be split into individual [`Pin`][crate::Pin]s.
pub struct Shared<M>(M);

impl<I2C, D> Shared<core::cell::RefCell<Mcp23017<I2C, D>>> {
    pub fn new(device: Mcp23017<I2C, D>) -> Self {
        Self::with_mutex(device)
    }
}

impl<I2C, D, M> Shared<M>
where
    M: crate::PortMutex<Port = Mcp23017<I2C, D>>,
{
    pub fn with_mutex(device: Mcp23017<I2C, D>) -> Self {
        Self(crate::PortMutex::create(device))
    }

    /// Run `f` with exclusive access to the device, e.g. for port-wide operations.
    pub fn lock<R, F: FnOnce(&mut Mcp23017<I2C, D>) -> R>(&self, f: F) -> R {
        self.0.lock(f)
    }

    pub fn split(&mut self) -> Parts<'_, M> {
        Parts {
            gpa0: crate::Pin::new(0, &self.0),
            gpa1: crate::Pin::new(1, &self.0),
            gpa2: crate::Pin::new(2, &self.0),
            gpa3: crate::Pin::new(3, &self.0),
            gpa4: crate::Pin::new(4, &self.0),
            gpa5: crate::Pin::new(5, &self.0),
            gpa6: crate::Pin::new(6, &self.0),
            gpa7: crate::Pin::new(7, &self.0),
            gpb0: crate::Pin::new(8, &self.0),
            gpb1: crate::Pin::new(9, &self.0),
            gpb2: crate::Pin::new(10, &self.0),
            gpb3: crate::Pin::new(11, &self.0),
            gpb4: crate::Pin::new(12, &self.0),
            gpb5: crate::Pin::new(13, &self.0),
            gpb6: crate::Pin::new(14, &self.0),
            gpb7: crate::Pin::new(15, &self.0),
        }
    }
}

/// All pins of one chip, in their reset state (inputs).
pub struct Parts<'a, M> {
    pub gpa0: crate::Pin<'a, mode::Input, M>,
    pub gpa1: crate::Pin<'a, mode::Input, M>,
    pub gpa2: crate::Pin<'a, mode::Input, M>,
    pub gpa3: crate::Pin<'a, mode::Input, M>,
    pub gpa4: crate::Pin<'a, mode::Input, M>,
    pub gpa5: crate::Pin<'a, mode::Input, M>,
    pub gpa6: crate::Pin<'a, mode::Input, M>,
    pub gpa7: crate::Pin<'a, mode::Input, M>,
    pub gpb0: crate::Pin<'a, mode::Input, M>,
    pub gpb1: crate::Pin<'a, mode::Input, M>,
    pub gpb2: crate::Pin<'a, mode::Input, M>,
    pub gpb3: crate::Pin<'a, mode::Input, M>,
    pub gpb4: crate::Pin<'a, mode::Input, M>,
    pub gpb5: crate::Pin<'a, mode::Input, M>,
    pub gpb6: crate::Pin<'a, mode::Input, M>,
    pub gpb7: crate::Pin<'a, mode::Input, M>,
}
