use crate::common::{PinMode, PIN_COUNT};
use core::marker::PhantomData;
use embedded_hal::digital::{self as hal_digital, ErrorType};

/// Representation of a single expander pin.
///
/// `Pin` is not constructed directly, this type is created by wrapping a driver in a
/// [`Shared`][crate::Shared] handle and then getting access to all its pins using the `.split()`
/// method.  Every access locks the handle's mutex for the duration of the bus transactions.
pub struct Pin<'a, MODE, MUTEX> {
    pin: u8,
    port_driver: &'a MUTEX,
    _m: PhantomData<MODE>,
}

impl<'a, MODE, MUTEX> Pin<'a, MODE, MUTEX> {
    pub(crate) fn new(pin: u8, port_driver: &'a MUTEX) -> Self {
        assert!(pin < PIN_COUNT);
        Self {
            pin,
            port_driver,
            _m: PhantomData,
        }
    }

    /// Number of this pin, 0..=7 for port A and 8..=15 for port B.
    pub fn pin_number(&self) -> u8 {
        self.pin
    }
}

impl<'a, MODE, MUTEX, PD> Pin<'a, MODE, MUTEX>
where
    PD: crate::PortDriver,
    MUTEX: crate::PortMutex<Port = PD>,
{
    fn into_mode<NEW>(self, mode: PinMode) -> Result<Pin<'a, NEW, MUTEX>, PD::Error> {
        self.port_driver.lock(|drv| drv.set_pin_mode(self.pin, mode))?;
        Ok(Pin {
            pin: self.pin,
            port_driver: self.port_driver,
            _m: PhantomData,
        })
    }

    pub fn into_input(self) -> Result<Pin<'a, crate::mode::Input, MUTEX>, PD::Error> {
        self.into_mode(PinMode::Input)
    }

    pub fn into_pull_up_input(
        self,
    ) -> Result<Pin<'a, crate::mode::InputPullUp, MUTEX>, PD::Error> {
        self.into_mode(PinMode::InputPullUp)
    }

    pub fn into_output(self) -> Result<Pin<'a, crate::mode::Output, MUTEX>, PD::Error> {
        self.into_mode(PinMode::Output)
    }
}

impl<'a, MODE: crate::mode::HasInput, MUTEX, PD> Pin<'a, MODE, MUTEX>
where
    PD: crate::PortDriver,
    MUTEX: crate::PortMutex<Port = PD>,
{
    pub fn is_high(&self) -> Result<bool, PD::Error> {
        self.port_driver.lock(|drv| drv.read_pin(self.pin))
    }

    pub fn is_low(&self) -> Result<bool, PD::Error> {
        self.is_high().map(|high| !high)
    }
}

impl<'a, MODE, MUTEX, PD> ErrorType for Pin<'a, MODE, MUTEX>
where
    PD: crate::PortDriver,
    PD::Error: hal_digital::Error,
    MUTEX: crate::PortMutex<Port = PD>,
{
    type Error = PD::Error;
}

impl<'a, MODE: crate::mode::HasInput, MUTEX, PD> hal_digital::InputPin for Pin<'a, MODE, MUTEX>
where
    PD: crate::PortDriver,
    PD::Error: hal_digital::Error,
    MUTEX: crate::PortMutex<Port = PD>,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Pin::is_high(self)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Pin::is_low(self)
    }
}

impl<'a, MODE: crate::mode::HasOutput, MUTEX, PD> Pin<'a, MODE, MUTEX>
where
    PD: crate::PortDriver,
    MUTEX: crate::PortMutex<Port = PD>,
{
    pub fn set_high(&mut self) -> Result<(), PD::Error> {
        self.port_driver.lock(|drv| drv.write_pin(self.pin, true))
    }

    pub fn set_low(&mut self) -> Result<(), PD::Error> {
        self.port_driver.lock(|drv| drv.write_pin(self.pin, false))
    }

    pub fn set_state(&mut self, state: bool) -> Result<(), PD::Error> {
        self.port_driver.lock(|drv| drv.write_pin(self.pin, state))
    }

    /// Whether the output latch is set high.  Reads the latch back from the chip.
    pub fn is_set_high(&self) -> Result<bool, PD::Error> {
        self.port_driver.lock(|drv| drv.read_pin_latch(self.pin))
    }

    pub fn is_set_low(&self) -> Result<bool, PD::Error> {
        self.is_set_high().map(|high| !high)
    }

    /// Invert the output latch.  Both steps happen under one lock.
    pub fn toggle(&mut self) -> Result<(), PD::Error> {
        self.port_driver.lock(|drv| {
            let high = drv.read_pin_latch(self.pin)?;
            drv.write_pin(self.pin, !high)
        })
    }
}

impl<'a, MODE: crate::mode::HasOutput, MUTEX, PD> hal_digital::OutputPin for Pin<'a, MODE, MUTEX>
where
    PD: crate::PortDriver,
    PD::Error: hal_digital::Error,
    MUTEX: crate::PortMutex<Port = PD>,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Pin::set_low(self)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Pin::set_high(self)
    }
}

impl<'a, MODE: crate::mode::HasOutput, MUTEX, PD> hal_digital::StatefulOutputPin
    for Pin<'a, MODE, MUTEX>
where
    PD: crate::PortDriver,
    PD::Error: hal_digital::Error,
    MUTEX: crate::PortMutex<Port = PD>,
{
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Pin::is_set_high(self)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Pin::is_set_low(self)
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        Pin::toggle(self)
    }
}
