//! Command sources yielding whitespace-delimited command tokens.

use std::{
    collections::VecDeque,
    io::{self, BufRead, BufReader, ErrorKind, Stdout, Write},
    time::Duration,
};

use anyhow::Context;
use tracing::{debug, error};

use crate::config::InputSource;

pub const PROMPT: &str = "Enter a valid input";

pub struct Tokens<R, W = Stdout> {
    reader: R,
    /// Receives a prompt before every token
    prompt: Option<W>,
    prompted: bool,
    pending: VecDeque<String>,
    /// Holds a partial line across read errors
    line_buffer: String,
}

impl<R: BufRead> Tokens<R> {
    pub fn new(reader: R) -> Self {
        Self::with_prompt_to(reader, None)
    }
}

impl<R: BufRead, W: Write> Tokens<R, W> {
    pub fn with_prompt(reader: R, out: W) -> Self {
        Self::with_prompt_to(reader, Some(out))
    }

    fn with_prompt_to(reader: R, prompt: Option<W>) -> Self {
        Self {
            reader,
            prompt,
            prompted: false,
            pending: VecDeque::new(),
            line_buffer: String::new(),
        }
    }

    fn print_prompt(&mut self) {
        if self.prompted {
            return;
        }
        if let Some(out) = self.prompt.as_mut() {
            if let Err(e) = writeln!(out, "{}", PROMPT).and_then(|_| out.flush()) {
                error!("Error while prompting: {}", e);
            }
        }
        self.prompted = true;
    }

    fn take_line(&mut self) {
        self.pending
            .extend(self.line_buffer.split_whitespace().map(str::to_string));
        self.line_buffer.clear();
    }
}

impl<R: BufRead, W: Write> Iterator for Tokens<R, W> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.print_prompt();
        loop {
            if let Some(token) = self.pending.pop_front() {
                self.prompted = false;
                return Some(token);
            }

            // Bytes read before an error stay in the buffer, the next
            // read completes the line.
            match self.reader.read_line(&mut self.line_buffer) {
                Ok(0) => {
                    self.take_line();
                    if self.pending.is_empty() {
                        return None;
                    }
                }
                Ok(_size) => self.take_line(),
                Err(e) if e.kind() == ErrorKind::TimedOut => debug!("No command received"),
                Err(e) => error!("Error while reading: {}", e),
            }
        }
    }
}

pub fn open(input: &InputSource) -> anyhow::Result<Tokens<Box<dyn BufRead>>> {
    match input {
        InputSource::Stdin => {
            let reader: Box<dyn BufRead> = Box::new(io::stdin().lock());
            Ok(Tokens::with_prompt(reader, io::stdout()))
        }
        InputSource::Serial { port, baudrate } => {
            // Connect to serial device
            let raw_port = serialport::new(port.to_string_lossy(), *baudrate)
                .timeout(Duration::from_secs(30))
                .open()
                .context(format!("Failed to open serial port at {:?}", port))?;
            let reader: Box<dyn BufRead> = Box::new(BufReader::new(raw_port));
            Ok(Tokens::new(reader))
        }
    }
}
