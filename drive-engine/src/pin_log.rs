//! Pin sink that formats each write as a text line.
//!
//! Used to drive a remote actuator over a serial link, one line per write:
//! `Writing <value> to pin <pin>`.

use ufmt::{uWrite, uwrite};

use crate::engine::PinWrite;

/// Wrapper for a `uWrite` that accepts pin writes
#[derive(Clone)]
pub struct PinLog<W>(pub W);

impl<W: uWrite> PinWrite for PinLog<W> {
    type Error = W::Error;

    fn write(&mut self, pin: &str, value: u8) -> Result<(), Self::Error> {
        uwrite!(self.0, "Writing {} to pin {}\r\n", value, pin)
    }
}
