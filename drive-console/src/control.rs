//! Control loop: route a command token, then decay both engines.

use std::{panic, thread};

use drive_engine::{DecayReport, MotorEngine, PinWrite, Router};
use embedded_hal::blocking::delay::DelayMs;
use tracing::{debug, info, warn};

use crate::config::DecayMode;

pub struct ControlLoop<P, D> {
    front: MotorEngine,
    rear: MotorEngine,
    router: Router,
    mode: DecayMode,
    sink: P,
    delay: D,
}

/// Outcome of one command token.
pub struct Batch {
    /// Number of characters applied to an engine
    pub applied: usize,
    pub front: DecayReport,
    pub rear: DecayReport,
}

impl<P, D> ControlLoop<P, D>
where
    P: PinWrite + Clone + Send,
    D: DelayMs<u32> + Clone + Send,
{
    pub fn new(
        front: MotorEngine,
        rear: MotorEngine,
        mode: DecayMode,
        sink: P,
        delay: D,
    ) -> anyhow::Result<Self> {
        let router = Router::new(&front, &rear)
            .map_err(|e| anyhow::anyhow!("Could not route commands: {}", e))?;
        Ok(Self {
            front,
            rear,
            router,
            mode,
            sink,
            delay,
        })
    }

    /// Process tokens until the source is exhausted. Returns the number of
    /// tokens processed.
    pub fn run<I>(&mut self, commands: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut processed = 0;
        for command in commands {
            let batch = self.process(&command);
            if batch.applied == 0 {
                debug!("No valid command in {:?}", command);
            }
            report("front", &batch.front);
            report("rear", &batch.rear);
            processed += 1;
        }
        processed
    }

    /// Apply every character of `command`, then decay both engines to idle.
    pub fn process(&mut self, command: &str) -> Batch {
        let applied = self
            .router
            .dispatch(command, &mut self.front, &mut self.rear);
        debug!(
            "Command {:?}: {} applied, front count {}, rear count {}",
            command,
            applied,
            self.front.counter(),
            self.rear.counter()
        );

        let (front, rear) = self.decay();
        Batch {
            applied,
            front,
            rear,
        }
    }

    pub fn front(&self) -> &MotorEngine {
        &self.front
    }

    pub fn rear(&self) -> &MotorEngine {
        &self.rear
    }

    fn decay(&mut self) -> (DecayReport, DecayReport) {
        match self.mode {
            DecayMode::Sequential => {
                let front = self.front.run(&mut self.sink, &mut self.delay);
                let rear = self.rear.run(&mut self.sink, &mut self.delay);
                (front, rear)
            }
            DecayMode::Concurrent => {
                let (mut sink, mut delay) = (self.sink.clone(), self.delay.clone());
                let front = &mut self.front;
                let rear = &mut self.rear;
                let (rear_sink, rear_delay) = (&mut self.sink, &mut self.delay);
                thread::scope(|s| {
                    let handle = s.spawn(move || front.run(&mut sink, &mut delay));
                    let rear = rear.run(rear_sink, rear_delay);
                    let front = handle.join().unwrap_or_else(|e| panic::resume_unwind(e));
                    (front, rear)
                })
            }
        }
    }
}

fn report(engine: &str, report: &DecayReport) {
    if report.rounds > 0 {
        info!("{} engine idle after {} rounds", engine, report.rounds);
    }
    if !report.is_clean() {
        warn!(
            "{} engine: {} pin writes failed",
            engine, report.failed_writes
        );
        for error in report.errors() {
            warn!("{} engine: {}", engine, error);
        }
    }
}
