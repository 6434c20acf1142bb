//! Pin sinks and the round timer used by the console.

use std::{
    convert::Infallible,
    io::{self, Write},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use anyhow::Context;
use drive_engine::{pin_log::PinLog, PinWrite};
use embedded_hal::blocking::delay::DelayMs;
use tracing::info;

use crate::config::OutputSink;

/// Logs pin writes instead of driving hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl PinWrite for LogSink {
    type Error = Infallible;

    fn write(&mut self, pin: &str, value: u8) -> Result<(), Infallible> {
        info!("Writing {} to pin {}", value, pin);
        Ok(())
    }
}

/// Wrapper for a serial port that supports ufmt
pub struct SerialWriter<'a>(pub &'a mut Box<dyn serialport::SerialPort>);

impl<'a> ufmt::uWrite for SerialWriter<'a> {
    type Error = io::Error;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.0.write_all(s.as_bytes())
    }
}

/// Sends pin writes to an actuator board over a serial port.
///
/// Clones share the port, each write holds the port for a full line.
#[derive(Clone)]
pub struct SerialSink {
    port: Arc<Mutex<Box<dyn serialport::SerialPort>>>,
}

impl SerialSink {
    pub fn new(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            port: Arc::new(Mutex::new(port)),
        }
    }
}

impl PinWrite for SerialSink {
    type Error = io::Error;

    fn write(&mut self, pin: &str, value: u8) -> Result<(), io::Error> {
        let mut port = self
            .port
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "Serial port lock poisoned"))?;
        PinLog(SerialWriter(&mut *port)).write(pin, value)?;
        port.flush()
    }
}

#[derive(Clone)]
pub enum Sink {
    Log(LogSink),
    Serial(SerialSink),
}

impl PinWrite for Sink {
    type Error = io::Error;

    fn write(&mut self, pin: &str, value: u8) -> Result<(), io::Error> {
        match self {
            Sink::Log(sink) => match sink.write(pin, value) {
                Ok(()) => Ok(()),
                Err(never) => match never {},
            },
            Sink::Serial(sink) => sink.write(pin, value),
        }
    }
}

pub fn open(output: &OutputSink) -> anyhow::Result<Sink> {
    match output {
        OutputSink::Log => Ok(Sink::Log(LogSink)),
        OutputSink::Serial { port, baudrate } => {
            let raw_port = serialport::new(port.to_string_lossy(), *baudrate)
                .timeout(Duration::from_secs(1))
                .open()
                .context(format!("Failed to open serial port at {:?}", port))?;
            Ok(Sink::Serial(SerialSink::new(raw_port)))
        }
    }
}

/// Blocking delay for the decay rounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayMs<u32> for ThreadDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_log_sink() {
        let mut sink = Sink::Log(LogSink);
        assert!(sink.write("A8", 255).is_ok());
        assert!(sink.write("A7", 0).is_ok());
    }

    #[test]
    fn test_thread_delay() {
        let start = Instant::now();
        ThreadDelay.delay_ms(20);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
