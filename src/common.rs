use embedded_hal::i2c::ErrorKind;

/// Highest valid pin number plus one.
pub const PIN_COUNT: u8 = 16;

/// One of the two eight-pin groups of the chip.
///
/// The discriminant is the offset added to a generic register kind to address the register of
/// this port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A = 0x00,
    B = 0x01,
}

impl Port {
    pub(crate) const BOTH: [Port; 2] = [Port::A, Port::B];
}

/// Port a pin belongs to: pins 0..=7 live on port A, everything above on port B.
pub fn pin_to_port(pin: u8) -> Port {
    if pin < 8 {
        Port::A
    } else {
        Port::B
    }
}

/// Bit position of a pin inside its port's registers.
pub fn pin_to_bit(pin: u8) -> u8 {
    pin % 8
}

/// Single-bit mask of a pin inside its port's registers.
pub fn pin_to_mask(pin: u8) -> u8 {
    1 << pin_to_bit(pin)
}

/// Electrical configuration of a pin.
///
/// | mode          | IODIR bit | GPPU bit |
/// | ------------- | --------- | -------- |
/// | `Input`       | 1         | 0        |
/// | `InputPullUp` | 1         | 1        |
/// | `Output`      | 0         | 0        |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input,
    InputPullUp,
    Output,
}

impl PinMode {
    /// `(input, pull_up)` register bits for this mode.
    pub(crate) fn bits(self) -> (bool, bool) {
        match self {
            PinMode::Input => (true, false),
            PinMode::InputPullUp => (true, true),
            PinMode::Output => (false, false),
        }
    }
}

/// Output driver configuration of the INTA/INTB pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptPinMode {
    /// Open-drain output; overrides the active level.
    OpenDrain,
    /// Push-pull, driven low while an interrupt is pending.
    LowOnInt,
    /// Push-pull, driven high while an interrupt is pending.
    HighOnInt,
}

/// What an interrupt-enabled pin is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptTrigger {
    /// Fire whenever the pin differs from its previous value.
    OnChange,
    /// Fire whenever the pin differs from the given default level.
    CompareTo(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The chip did not acknowledge a write.  Carries the status reported by the bus driver.
    Nack(ErrorKind),
    /// No data arrived before the read timeout elapsed.
    Timeout,
    /// Pin number outside of `0..16`.
    InvalidPin(u8),
}

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

pub(crate) fn check_pin(pin: u8) -> Result<(), Error> {
    if pin < PIN_COUNT {
        Ok(())
    } else {
        Err(Error::InvalidPin(pin))
    }
}

/// Per-pin operations a [`Pin`][crate::Pin] needs from the device behind it.
pub trait PortDriver {
    type Error;

    fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), Self::Error>;

    /// Drive the output latch of `pin` high or low.
    fn write_pin(&mut self, pin: u8, state: bool) -> Result<(), Self::Error>;

    /// Logic level currently present on `pin`.
    fn read_pin(&mut self, pin: u8) -> Result<bool, Self::Error>;

    /// Level the output latch of `pin` was last set to.
    fn read_pin_latch(&mut self, pin: u8) -> Result<bool, Self::Error>;
}

/// Pin Modes
pub mod mode {
    /// Trait for pin-modes which can be used to set a logic level.
    pub trait HasOutput {}
    /// Trait for pin-modes which can be used to read a logic level.
    pub trait HasInput {}

    /// Pin configured as a floating input.
    pub struct Input;
    impl HasInput for Input {}

    /// Pin configured as an input with the internal pull-up enabled.
    pub struct InputPullUp;
    impl HasInput for InputPullUp {}

    /// Pin configured as an output.
    pub struct Output;
    impl HasOutput for Output {}
}
