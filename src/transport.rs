//! Byte-stream seam between the frame protocol and the physical port.
//!
//! The driver only needs two operations from a serial link: send a frame
//! and read an exact number of response bytes with a deadline. Keeping
//! this behind a trait lets the facade be tested against a scripted fake
//! without hardware.

use thiserror::Error;

/// Serial baud rate of the 2JCIE-BU01 USB interface.
pub const BAUD_RATE: u32 = 115_200;

/// Transport-level errors, distinct from frame-format errors.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The read deadline elapsed. Callers may retry the whole
    /// write/read exchange.
    #[error("serial read timed out")]
    Timeout,
    #[error("serial connection error: {0}")]
    Connection(String),
}

/// Blocking byte-stream transport carrying serial frames.
///
/// One outstanding request at a time; `&mut self` receivers make the
/// one-at-a-time discipline a compile-time property.
pub trait SerialLink {
    /// Write all of `bytes` to the port.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read exactly `buf.len()` bytes, failing with
    /// [`TransportError::Timeout`] when the deadline elapses first.
    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;
}

#[cfg(feature = "serial")]
pub use port::UsbSerialLink;

#[cfg(feature = "serial")]
mod port {
    use super::{BAUD_RATE, SerialLink, TransportError};
    use std::io::{Read, Write};
    use std::time::Duration;

    impl From<std::io::Error> for TransportError {
        fn from(err: std::io::Error) -> Self {
            if err.kind() == std::io::ErrorKind::TimedOut {
                TransportError::Timeout
            } else {
                TransportError::Connection(err.to_string())
            }
        }
    }

    impl From<serialport::Error> for TransportError {
        fn from(err: serialport::Error) -> Self {
            TransportError::Connection(err.to_string())
        }
    }

    /// Serial link over a real port via the `serialport` crate.
    pub struct UsbSerialLink {
        port: Box<dyn serialport::SerialPort>,
    }

    impl UsbSerialLink {
        /// Open `path` (e.g. `/dev/ttyUSB0` or `COM5`) at the device baud
        /// rate with the given read timeout.
        pub fn open(path: &str, timeout: Duration) -> Result<Self, TransportError> {
            let port = serialport::new(path, BAUD_RATE).timeout(timeout).open()?;
            Ok(UsbSerialLink { port })
        }
    }

    impl SerialLink for UsbSerialLink {
        fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.port.write_all(bytes)?;
            Ok(())
        }

        fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
            self.port.read_exact(buf)?;
            Ok(())
        }
    }
}
