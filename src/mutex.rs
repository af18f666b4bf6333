/// Lock around a device that is shared between pins.
///
/// A single-pin change on the MCP23017 is a register read followed by a register write.  Two pins
/// of the same chip driven from different contexts must not interleave those steps, so
/// [`Shared`][crate::Shared] keeps the driver inside a type implementing this trait and every pin
/// access runs under [`lock()`][PortMutex::lock].
///
/// Implementations shipped with this crate:
///
/// - `core::cell::RefCell<T>`: always present, single context only.
/// - `std::sync::Mutex<T>`: needs the `std` feature.  A poisoned lock is recovered.
/// - `critical_section::Mutex<RefCell<T>>`: needs the `critical-section` feature, usable from
///   interrupt handlers.
///
/// Any other lock can be plugged in through a newtype:
///
/// ```
/// use core::cell::RefCell;
///
/// struct Exclusive<T>(RefCell<T>);
///
/// impl<T> mcp23017_io::PortMutex for Exclusive<T> {
///     type Port = T;
///
///     fn create(port: T) -> Self {
///         Exclusive(RefCell::new(port))
///     }
///
///     fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
///         f(&mut self.0.borrow_mut())
///     }
/// }
///
/// let m = <Exclusive<u8> as mcp23017_io::PortMutex>::create(3);
/// assert_eq!(mcp23017_io::PortMutex::lock(&m, |v| *v + 1), 4);
/// ```
pub trait PortMutex {
    /// The device wrapped inside this mutex.
    type Port;

    /// Create a new mutex of this type.
    fn create(port: Self::Port) -> Self;

    /// Lock the mutex and give a closure access to the device inside.
    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R;
}

impl<T> PortMutex for core::cell::RefCell<T> {
    type Port = T;

    fn create(port: T) -> Self {
        core::cell::RefCell::new(port)
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        f(&mut self.borrow_mut())
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> PortMutex for std::sync::Mutex<T> {
    type Port = T;

    fn create(port: T) -> Self {
        std::sync::Mutex::new(port)
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        let mut guard = self
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(feature = "critical-section")]
impl<T> PortMutex for critical_section::Mutex<core::cell::RefCell<T>> {
    type Port = T;

    fn create(port: T) -> Self {
        critical_section::Mutex::new(core::cell::RefCell::new(port))
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| f(&mut self.borrow_ref_mut(cs)))
    }
}
