//! Error handling.

use core::fmt;

use heapless::spsc::Queue;

use crate::engine::Polarity;

/// All possible error types
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Error {
    /// A pin write was rejected by the sink
    ActuationFailure(Polarity),
    /// Both directions of an engine were bound to the same token
    DuplicateCommandToken,
    /// A pin name does not fit into a `PinName`
    PinNameTooLong,
}

impl Error {
    pub fn log<const N: usize>(&self, queue: &mut Queue<Self, N>) {
        match queue.enqueue(*self) {
            Ok(()) => { /* Enqueued */ }
            Err(e) => {
                // Queue full, drop the oldest value and try again
                queue.dequeue();
                queue.enqueue(e).ok();
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActuationFailure(Polarity::Positive) => "Writing positive pin failed",
            Self::ActuationFailure(Polarity::Negative) => "Writing negative pin failed",
            Self::DuplicateCommandToken => "Engine: Same token for both directions",
            Self::PinNameTooLong => "Engine: Pin name too long",
        }
    }
}

impl ufmt::uDisplay for Error {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_newest() {
        // Capacity of an spsc queue is N - 1
        let mut queue: Queue<Error, 3> = Queue::new();
        Error::DuplicateCommandToken.log(&mut queue);
        Error::ActuationFailure(Polarity::Positive).log(&mut queue);
        Error::ActuationFailure(Polarity::Negative).log(&mut queue);

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.dequeue(),
            Some(Error::ActuationFailure(Polarity::Positive))
        );
        assert_eq!(
            queue.dequeue(),
            Some(Error::ActuationFailure(Polarity::Negative))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::PinNameTooLong.to_string(),
            "Engine: Pin name too long"
        );
    }
}
