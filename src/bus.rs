//! Blocking register access for a single device on a two-wire bus.
//!
//! [`RegisterClient`] frames register writes (`S addr+W reg data.. P`) and register reads
//! (`S addr+W reg Sr addr+R data.. P`) and reports failures through a return value plus an
//! optional handler, exactly once per call.  Nothing is retried on write; reads are polled until
//! data arrives or the timeout elapses.
use crate::common::Error;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;

/// Default read timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 1000;

/// Register byte plus payload of one write transaction.
const FRAME_CAPACITY: usize = 32;

/// Called after a read gave up waiting for data.
pub type TimeoutHandler = fn();

/// Called after a write was rejected, with the status reported by the bus driver.
pub type NackHandler = fn(ErrorKind);

/// Register-level client for one device on the bus.
pub struct RegisterClient<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    timeout_ms: u32,
    timeout_flag: bool,
    on_timeout: Option<TimeoutHandler>,
    on_nack: Option<NackHandler>,
}

impl<I2C, D> RegisterClient<I2C, D> {
    /// Create a client talking to the device at 7-bit `address`.
    ///
    /// Only the low seven bits of `address` are used.  `delay` is the time base of the read
    /// timeout.
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address: address & 0x7f,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            timeout_flag: false,
            on_timeout: None,
            on_nack: None,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn timeout(&self) -> u32 {
        self.timeout_ms
    }

    /// Set how long reads wait for data, in milliseconds.  Zero means a single attempt.
    ///
    /// The budget counts the 1 ms pauses between failed attempts, not the time spent inside the
    /// attempts themselves.  On a slow bus a read can therefore take longer than `timeout_ms`
    /// before it gives up.
    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    /// Whether the most recent read timed out.
    ///
    /// The flag stays set until the next read attempt starts.
    pub fn timed_out(&self) -> bool {
        self.timeout_flag
    }

    pub fn attach_timeout_handler(&mut self, handler: TimeoutHandler) {
        self.on_timeout = Some(handler);
    }

    pub fn attach_nack_handler(&mut self, handler: NackHandler) {
        self.on_nack = Some(handler);
    }

    pub fn detach_handlers(&mut self) {
        self.on_timeout = None;
        self.on_nack = None;
    }

    /// Give back the bus and the delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> RegisterClient<I2C, D> {
    /// Write one register.  Returns `false` if the device did not acknowledge.
    pub fn write_register<R: Into<u8>>(&mut self, reg: R, value: u8) -> bool {
        self.write_registers(reg, &[value])
    }

    /// Write `data` to consecutive registers starting at `reg`.
    ///
    /// Relies on the device auto-incrementing its register pointer.
    pub fn write_registers<R: Into<u8>>(&mut self, reg: R, data: &[u8]) -> bool {
        self.try_write_registers(reg, data).is_ok()
    }

    /// Read one register.
    ///
    /// Returns 0 on timeout, which cannot be told apart from a register that holds 0.  Check
    /// [`timed_out()`][Self::timed_out] when that matters.
    pub fn read_register<R: Into<u8>>(&mut self, reg: R) -> u8 {
        let mut buf = [0x00];
        let _ = self.try_read_registers(reg, &mut buf);
        buf[0]
    }

    /// Read `buffer.len()` consecutive registers starting at `reg`.
    ///
    /// On timeout the buffer is zero-filled and `false` is returned.
    pub fn read_registers<R: Into<u8>>(&mut self, reg: R, buffer: &mut [u8]) -> bool {
        self.try_read_registers(reg, buffer).is_ok()
    }

    pub fn try_read_register<R: Into<u8>>(&mut self, reg: R) -> Result<u8, Error> {
        let mut buf = [0x00];
        self.try_read_registers(reg, &mut buf)?;
        Ok(buf[0])
    }

    /// Same as [`write_registers()`][Self::write_registers], reporting the status as an error.
    pub fn try_write_registers<R: Into<u8>>(&mut self, reg: R, data: &[u8]) -> Result<(), Error> {
        let reg = reg.into();
        let mut frame: Vec<u8, FRAME_CAPACITY> = Vec::new();
        let status = if frame.push(reg).is_err() || frame.extend_from_slice(data).is_err() {
            // does not fit into one transmission
            Err(ErrorKind::Overrun)
        } else {
            self.i2c.write(self.address, &frame).map_err(|e| e.kind())
        };

        match status {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::trace!(
                    "{=u8:#x}: wrote {=usize} byte(s) at register {=u8:#x}",
                    self.address,
                    data.len(),
                    reg
                );
                Ok(())
            }
            Err(kind) => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "{=u8:#x}: write at register {=u8:#x} rejected: {}",
                    self.address,
                    reg,
                    kind
                );
                if let Some(handler) = self.on_nack {
                    handler(kind);
                }
                Err(Error::Nack(kind))
            }
        }
    }

    /// Same as [`read_registers()`][Self::read_registers], reporting a timeout as an error.
    pub fn try_read_registers<R: Into<u8>>(
        &mut self,
        reg: R,
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        let reg = reg.into();
        self.timeout_flag = false;

        let mut waited_ms = 0;
        loop {
            if self.i2c.write_read(self.address, &[reg], buffer).is_ok() {
                #[cfg(feature = "defmt")]
                defmt::trace!(
                    "{=u8:#x}: read {=usize} byte(s) at register {=u8:#x}",
                    self.address,
                    buffer.len(),
                    reg
                );
                return Ok(());
            }
            if waited_ms >= self.timeout_ms {
                break;
            }
            self.delay.delay_ms(1);
            waited_ms += 1;
        }

        buffer.fill(0x00);
        self.timeout_flag = true;
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "{=u8:#x}: read at register {=u8:#x} timed out after {=u32} ms",
            self.address,
            reg,
            self.timeout_ms
        );
        if let Some(handler) = self.on_timeout {
            handler();
        }
        Err(Error::Timeout)
    }

    /// Read `reg`, set the bits in `mask_set`, clear the bits in `mask_clear` and write it back.
    ///
    /// The two transactions are not atomic.  Nothing is written if the read timed out.
    pub fn update_register<R: Into<u8>>(
        &mut self,
        reg: R,
        mask_set: u8,
        mask_clear: u8,
    ) -> Result<(), Error> {
        let reg = reg.into();
        let mut value = self.try_read_register(reg)?;
        value |= mask_set;
        value &= !mask_clear;
        self.try_write_registers(reg, &[value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
    use embedded_hal::i2c::NoAcknowledgeSource;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    const NACK: ErrorKind = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data);

    #[test]
    fn write_frames() {
        let expectations = [
            mock_i2c::Transaction::write(0x20, vec![0x14, 0xa5]),
            mock_i2c::Transaction::write(0x20, vec![0x04, 0x0f, 0xf0]),
        ];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);

        assert!(client.write_register(0x14u8, 0xa5));
        assert!(client.write_registers(0x04u8, &[0x0f, 0xf0]));

        i2c.done();
    }

    #[test]
    fn write_nack() {
        static NACKS: AtomicUsize = AtomicUsize::new(0);
        static LAST: AtomicU8 = AtomicU8::new(0);
        fn on_nack(kind: ErrorKind) {
            NACKS.fetch_add(1, Ordering::SeqCst);
            if kind == NACK {
                LAST.store(1, Ordering::SeqCst);
            }
        }

        let expectations =
            [mock_i2c::Transaction::write(0x20, vec![0x14, 0x01]).with_error(NACK)];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);
        client.attach_nack_handler(on_nack);

        assert!(!client.write_register(0x14u8, 0x01));
        assert_eq!(NACKS.load(Ordering::SeqCst), 1);
        assert_eq!(LAST.load(Ordering::SeqCst), 1);
        // a rejected write is not a timeout
        assert!(!client.timed_out());

        i2c.done();
    }

    #[test]
    fn write_nack_without_handler() {
        let expectations =
            [mock_i2c::Transaction::write(0x20, vec![0x00, 0xff]).with_error(NACK)];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);

        assert_eq!(client.try_write_registers(0x00u8, &[0xff]), Err(Error::Nack(NACK)));

        i2c.done();
    }

    #[test]
    fn oversized_burst() {
        static NACKS: AtomicUsize = AtomicUsize::new(0);
        fn on_nack(kind: ErrorKind) {
            assert_eq!(kind, ErrorKind::Overrun);
            NACKS.fetch_add(1, Ordering::SeqCst);
        }

        let expectations: [mock_i2c::Transaction; 0] = [];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);
        client.attach_nack_handler(on_nack);

        assert!(!client.write_registers(0x00u8, &[0u8; FRAME_CAPACITY]));
        assert_eq!(NACKS.load(Ordering::SeqCst), 1);

        i2c.done();
    }

    #[test]
    fn read_timeout() {
        static TIMEOUTS: AtomicUsize = AtomicUsize::new(0);
        fn on_timeout() {
            TIMEOUTS.fetch_add(1, Ordering::SeqCst);
        }

        let expectations = [
            mock_i2c::Transaction::write_read(0x20, vec![0x12], vec![0x5a])
                .with_error(ErrorKind::Other),
            mock_i2c::Transaction::write_read(0x20, vec![0x12], vec![0x5a])
                .with_error(ErrorKind::Other),
            mock_i2c::Transaction::write_read(0x20, vec![0x12], vec![0x5a])
                .with_error(ErrorKind::Other),
        ];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);
        client.set_timeout(2);
        client.attach_timeout_handler(on_timeout);

        assert_eq!(client.read_register(0x12u8), 0x00);
        assert!(client.timed_out());
        assert_eq!(TIMEOUTS.load(Ordering::SeqCst), 1);

        i2c.done();
    }

    #[test]
    fn read_retries_until_data() {
        let expectations = [
            mock_i2c::Transaction::write_read(0x20, vec![0x13], vec![0x00])
                .with_error(ErrorKind::Other),
            mock_i2c::Transaction::write_read(0x20, vec![0x13], vec![0x81]),
        ];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);
        client.set_timeout(1);

        assert_eq!(client.read_register(0x13u8), 0x81);
        assert!(!client.timed_out());

        i2c.done();
    }

    #[test]
    fn timeout_flag_is_sticky_until_next_read() {
        let expectations = [
            mock_i2c::Transaction::write_read(0x20, vec![0x10], vec![0x00, 0x00])
                .with_error(ErrorKind::Other),
            mock_i2c::Transaction::write(0x20, vec![0x14, 0x00]),
            mock_i2c::Transaction::write_read(0x20, vec![0x10], vec![0x12, 0x34]),
        ];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);
        client.set_timeout(0);

        let mut buf = [0xaa; 2];
        assert!(!client.read_registers(0x10u8, &mut buf));
        assert_eq!(buf, [0x00, 0x00]);
        assert!(client.timed_out());

        // writes leave the flag alone
        assert!(client.write_register(0x14u8, 0x00));
        assert!(client.timed_out());

        assert!(client.read_registers(0x10u8, &mut buf));
        assert_eq!(buf, [0x12, 0x34]);
        assert!(!client.timed_out());

        i2c.done();
    }

    #[test]
    fn handlers_last_attached_wins() {
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);
        static FIRST_NACK: AtomicUsize = AtomicUsize::new(0);
        static SECOND_NACK: AtomicUsize = AtomicUsize::new(0);
        fn first() {
            FIRST.fetch_add(1, Ordering::SeqCst);
        }
        fn second() {
            SECOND.fetch_add(1, Ordering::SeqCst);
        }
        fn first_nack(_: ErrorKind) {
            FIRST_NACK.fetch_add(1, Ordering::SeqCst);
        }
        fn second_nack(_: ErrorKind) {
            SECOND_NACK.fetch_add(1, Ordering::SeqCst);
        }

        let expectations = [
            mock_i2c::Transaction::write_read(0x20, vec![0x12], vec![0x00])
                .with_error(ErrorKind::Other),
            mock_i2c::Transaction::write(0x20, vec![0x14, 0x01]).with_error(NACK),
            // handlers detached
            mock_i2c::Transaction::write_read(0x20, vec![0x12], vec![0x00])
                .with_error(ErrorKind::Other),
            mock_i2c::Transaction::write(0x20, vec![0x14, 0x01]).with_error(NACK),
        ];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);
        client.set_timeout(0);

        client.attach_timeout_handler(first);
        client.attach_timeout_handler(second);
        client.attach_nack_handler(first_nack);
        client.attach_nack_handler(second_nack);

        assert_eq!(client.read_register(0x12u8), 0x00);
        assert!(!client.write_register(0x14u8, 0x01));
        assert_eq!(FIRST.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND.load(Ordering::SeqCst), 1);
        assert_eq!(FIRST_NACK.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND_NACK.load(Ordering::SeqCst), 1);

        client.detach_handlers();
        assert_eq!(client.read_register(0x12u8), 0x00);
        assert!(client.timed_out());
        assert!(!client.write_register(0x14u8, 0x01));
        assert_eq!(FIRST.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND.load(Ordering::SeqCst), 1);
        assert_eq!(FIRST_NACK.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND_NACK.load(Ordering::SeqCst), 1);

        i2c.done();
    }

    #[test]
    fn address_is_seven_bits() {
        let expectations = [mock_i2c::Transaction::write(0x21, vec![0x0a, 0x00])];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0xa1);

        assert_eq!(client.address(), 0x21);
        assert!(client.write_register(0x0au8, 0x00));

        i2c.done();
    }

    #[test]
    fn update_register() {
        let expectations = [
            mock_i2c::Transaction::write_read(0x21, vec![0x0a], vec![0b0100_0010]),
            mock_i2c::Transaction::write(0x21, vec![0x0a, 0b0000_0110]),
        ];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x21);

        client.update_register(0x0au8, 0b0000_0100, 0b0100_0000).unwrap();

        i2c.done();
    }

    #[test]
    fn update_register_skips_write_on_timeout() {
        let expectations = [mock_i2c::Transaction::write_read(0x20, vec![0x14], vec![0x00])
            .with_error(ErrorKind::Other)];
        let mut i2c = mock_i2c::Mock::new(&expectations);
        let mut client = RegisterClient::new(i2c.clone(), NoopDelay::new(), 0x20);
        client.set_timeout(0);

        assert_eq!(client.update_register(0x14u8, 0x01, 0x00), Err(Error::Timeout));

        i2c.done();
    }
}
