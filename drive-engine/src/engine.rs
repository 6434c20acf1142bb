//! Per-motor accumulator with a fixed-interval decay loop.
//!
//! Recognized command tokens add a signed delta to the counter. Running the
//! engine writes the mapped output to both polarity pins once per round and
//! steps the counter one unit toward zero until it is idle again.

use embedded_hal::blocking::delay::DelayMs;
use heapless::spsc::Queue;
use heapless::{LinearMap, String};
use log::{debug, warn};

use crate::actuation::{Actuation, ActuationMapper, DEFAULT_DECELERATION_CUTOFF};
use crate::errors::Error;

/// Maximum length of a pin name
pub const PIN_NAME_LEN: usize = 8;

/// Number of errors kept in a `DecayReport`, see `heapless::spsc::Queue`
const REPORTED_ERRORS: usize = 9;

pub type PinName = String<PIN_NAME_LEN>;

/// Which of the two pins of a motor is driven
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Polarity {
    Positive,
    Negative,
}

/// Sink for pin writes, e.g. a PWM driver or a log.
pub trait PinWrite {
    type Error;

    fn write(&mut self, pin: &str, value: u8) -> Result<(), Self::Error>;
}

/// Tunables shared by all engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Sleep between two decay rounds
    pub round_interval_ms: u32,
    /// Counter magnitude at which deceleration begins
    pub deceleration_cutoff: u32,
    /// Counter change per recognized command
    pub command_value: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            round_interval_ms: 100,
            deceleration_cutoff: DEFAULT_DECELERATION_CUTOFF,
            command_value: 75,
        }
    }
}

pub struct MotorEngine {
    counter: i32,
    positive_pin: PinName,
    negative_pin: PinName,
    command_to_delta: LinearMap<char, i32, 2>,
    mapper: ActuationMapper,
    round_interval_ms: u32,
}

impl MotorEngine {
    pub fn new(
        negative_pin: &str,
        negative_token: char,
        positive_pin: &str,
        positive_token: char,
        tuning: &Tuning,
    ) -> Result<Self, Error> {
        if negative_token == positive_token {
            return Err(Error::DuplicateCommandToken);
        }

        let mut command_to_delta = LinearMap::new();
        command_to_delta
            .insert(positive_token, tuning.command_value)
            .map_err(|_| Error::DuplicateCommandToken)?;
        command_to_delta
            .insert(negative_token, -tuning.command_value)
            .map_err(|_| Error::DuplicateCommandToken)?;

        Ok(Self {
            counter: 0,
            positive_pin: pin_name(positive_pin)?,
            negative_pin: pin_name(negative_pin)?,
            command_to_delta,
            mapper: ActuationMapper::new(tuning.deceleration_cutoff),
            round_interval_ms: tuning.round_interval_ms,
        })
    }

    pub fn counter(&self) -> i32 {
        self.counter
    }

    pub fn is_idle(&self) -> bool {
        self.counter == 0
    }

    pub fn positive_pin(&self) -> &str {
        &self.positive_pin
    }

    pub fn negative_pin(&self) -> &str {
        &self.negative_pin
    }

    /// The tokens this engine reacts to.
    pub fn tokens(&self) -> impl Iterator<Item = char> + '_ {
        self.command_to_delta.keys().copied()
    }

    /// Apply a command token. Returns whether the token was recognized.
    pub fn input(&mut self, token: char) -> bool {
        match self.command_to_delta.get(&token) {
            Some(delta) => {
                self.counter = self.counter.saturating_add(*delta);
                true
            }
            None => false,
        }
    }

    /// Decay the counter to zero, one round per interval.
    ///
    /// Failed pin writes are recorded in the report and do not stop the
    /// loop, the counter still steps every round.
    pub fn run<P, D>(&mut self, sink: &mut P, delay: &mut D) -> DecayReport
    where
        P: PinWrite,
        D: DelayMs<u32>,
    {
        let mut report = DecayReport::new();
        while self.counter != 0 {
            debug!("starting round with count {}", self.counter);
            let actuation = self.mapper.map(self.counter);
            self.write(sink, actuation, &mut report);
            self.step();
            report.rounds += 1;
            delay.delay_ms(self.round_interval_ms);
        }
        report
    }

    fn write<P: PinWrite>(&self, sink: &mut P, actuation: Actuation, report: &mut DecayReport) {
        if sink.write(&self.positive_pin, actuation.positive).is_err() {
            warn!("Writing {} to pin {} failed", actuation.positive, self.positive_pin.as_str());
            report.record(Error::ActuationFailure(Polarity::Positive));
        }
        if sink.write(&self.negative_pin, actuation.negative).is_err() {
            warn!("Writing {} to pin {} failed", actuation.negative, self.negative_pin.as_str());
            report.record(Error::ActuationFailure(Polarity::Negative));
        }
    }

    fn step(&mut self) {
        if self.counter > 0 {
            self.counter -= 1;
        } else if self.counter < 0 {
            self.counter += 1;
        }
    }
}

fn pin_name(pin: &str) -> Result<PinName, Error> {
    let mut name = PinName::new();
    name.push_str(pin).map_err(|_| Error::PinNameTooLong)?;
    Ok(name)
}

/// Outcome of a single `MotorEngine::run`.
pub struct DecayReport {
    /// Number of decay rounds performed
    pub rounds: u32,
    /// Number of pin writes the sink rejected
    pub failed_writes: u32,
    /// Most recent errors, oldest are dropped first
    errors: Queue<Error, REPORTED_ERRORS>,
}

impl DecayReport {
    pub const fn new() -> Self {
        Self {
            rounds: 0,
            failed_writes: 0,
            errors: Queue::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed_writes == 0
    }

    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter()
    }

    fn record(&mut self, error: Error) {
        self.failed_writes = self.failed_writes.saturating_add(1);
        error.log(&mut self.errors);
    }
}

impl Default for DecayReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every pin write, optionally rejecting writes to one pin.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub writes: Vec<(std::string::String, u8)>,
        pub reject: Option<&'static str>,
    }

    impl PinWrite for RecordingSink {
        type Error = ();

        fn write(&mut self, pin: &str, value: u8) -> Result<(), ()> {
            self.writes.push((pin.to_string(), value));
            match self.reject {
                Some(rejected) if rejected == pin => Err(()),
                _ => Ok(()),
            }
        }
    }

    /// Counts requested sleeps instead of sleeping.
    #[derive(Default)]
    pub(crate) struct NoDelay {
        pub calls: u32,
        pub total_ms: u32,
    }

    impl DelayMs<u32> for NoDelay {
        fn delay_ms(&mut self, ms: u32) {
            self.calls += 1;
            self.total_ms += ms;
        }
    }

    pub(crate) fn front() -> MotorEngine {
        MotorEngine::new("A7", 'l', "A8", 'r', &Tuning::default()).unwrap()
    }

    pub(crate) fn rear() -> MotorEngine {
        MotorEngine::new("B7", 'b', "B8", 'f', &Tuning::default()).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let engine = front();
        assert_eq!(engine.counter(), 0);
        assert!(engine.is_idle());
        assert_eq!(engine.positive_pin(), "A8");
        assert_eq!(engine.negative_pin(), "A7");
    }

    #[test]
    fn test_input() {
        let mut engine = front();
        assert!(engine.input('r'));
        assert_eq!(engine.counter(), 75);
        assert!(engine.input('r'));
        assert_eq!(engine.counter(), 150);
        assert!(engine.input('l'));
        assert_eq!(engine.counter(), 75);
    }

    #[test]
    fn test_input_unknown_token() {
        let mut engine = front();
        engine.input('r');
        assert!(!engine.input('f'));
        assert!(!engine.input('x'));
        assert!(!engine.input('R'));
        assert_eq!(engine.counter(), 75);
    }

    #[test]
    fn test_duplicate_token() {
        let result = MotorEngine::new("A7", 'l', "A8", 'l', &Tuning::default());
        assert_eq!(result.err(), Some(Error::DuplicateCommandToken));
    }

    #[test]
    fn test_pin_name_too_long() {
        let result = MotorEngine::new("A7", 'l', "PWM_OUT_12", 'r', &Tuning::default());
        assert_eq!(result.err(), Some(Error::PinNameTooLong));
    }

    #[test]
    fn test_run_forward() {
        let mut engine = front();
        let mut sink = RecordingSink::default();
        let mut delay = NoDelay::default();
        engine.input('r');

        let report = engine.run(&mut sink, &mut delay);

        assert_eq!(report.rounds, 75);
        assert!(report.is_clean());
        assert!(engine.is_idle());
        assert_eq!(delay.calls, 75);
        assert_eq!(delay.total_ms, 7500);

        // Two writes per round, positive pin first
        assert_eq!(sink.writes.len(), 150);
        assert_eq!(sink.writes[0], ("A8".to_string(), 255));
        assert_eq!(sink.writes[1], ("A7".to_string(), 0));

        // Round 27 starts with count 49
        assert_eq!(sink.writes[52], ("A8".to_string(), 249));
        assert_eq!(sink.writes[53], ("A7".to_string(), 0));

        // Last round starts with count 1
        assert_eq!(sink.writes[148], ("A8".to_string(), 5));
        assert_eq!(sink.writes[149], ("A7".to_string(), 0));
    }

    #[test]
    fn test_run_backward() {
        let mut engine = rear();
        let mut sink = RecordingSink::default();
        let mut delay = NoDelay::default();
        engine.input('b');
        engine.input('b');

        let report = engine.run(&mut sink, &mut delay);

        assert_eq!(report.rounds, 150);
        assert_eq!(engine.counter(), 0);
        assert_eq!(sink.writes[0], ("B8".to_string(), 0));
        assert_eq!(sink.writes[1], ("B7".to_string(), 255));
        for pair in sink.writes.chunks(2) {
            assert_eq!(pair[0].0, "B8");
            assert_eq!(pair[0].1, 0);
            assert_eq!(pair[1].0, "B7");
        }
    }

    #[test]
    fn test_run_idle() {
        let mut engine = front();
        let mut sink = RecordingSink::default();
        let mut delay = NoDelay::default();

        let report = engine.run(&mut sink, &mut delay);

        assert_eq!(report.rounds, 0);
        assert!(sink.writes.is_empty());
        assert_eq!(delay.calls, 0);
    }

    #[test]
    fn test_opposing_inputs_cancel() {
        let mut engine = front();
        let mut sink = RecordingSink::default();
        let mut delay = NoDelay::default();
        engine.input('l');
        engine.input('r');

        let report = engine.run(&mut sink, &mut delay);

        assert_eq!(report.rounds, 0);
        assert!(sink.writes.is_empty());
    }

    #[test]
    fn test_run_with_custom_tuning() {
        let tuning = Tuning {
            round_interval_ms: 20,
            deceleration_cutoff: 10,
            command_value: 3,
        };
        let mut engine = MotorEngine::new("A7", 'l', "A8", 'r', &tuning).unwrap();
        let mut sink = RecordingSink::default();
        let mut delay = NoDelay::default();
        engine.input('l');

        let report = engine.run(&mut sink, &mut delay);

        assert_eq!(report.rounds, 3);
        assert_eq!(delay.total_ms, 60);
        // 255 - 7 * 25.5 = 76.5
        assert_eq!(sink.writes[1], ("A7".to_string(), 76));
    }

    #[test]
    fn test_failed_writes_do_not_stop_decay() {
        let mut engine = front();
        let mut sink = RecordingSink {
            reject: Some("A7"),
            ..Default::default()
        };
        let mut delay = NoDelay::default();
        engine.input('r');

        let report = engine.run(&mut sink, &mut delay);

        assert_eq!(report.rounds, 75);
        assert_eq!(report.failed_writes, 75);
        assert!(!report.is_clean());
        assert!(engine.is_idle());
        assert_eq!(sink.writes.len(), 150);

        // Only the most recent errors are kept
        assert_eq!(report.errors().count(), REPORTED_ERRORS - 1);
        assert!(report
            .errors()
            .all(|e| *e == Error::ActuationFailure(Polarity::Negative)));
    }

    #[test]
    fn test_failed_write_count_saturates() {
        let mut report = DecayReport::new();
        report.failed_writes = u32::MAX - 1;

        report.record(Error::ActuationFailure(Polarity::Positive));
        report.record(Error::ActuationFailure(Polarity::Negative));

        assert_eq!(report.failed_writes, u32::MAX);
        assert_eq!(report.errors().count(), 2);
    }
}
