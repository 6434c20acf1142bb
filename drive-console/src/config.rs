use std::{
    collections::HashSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context};
use drive_engine::{MotorEngine, Tuning};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref PIN_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,7}$").unwrap();
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawConfig {
    pub logger: Logger,
    pub tuning: RawTuning,
    pub front: RawEngine,
    pub rear: RawEngine,
    pub input: InputSource,
    pub output: OutputSink,
}

impl RawConfig {
    /// Parse the config file at the specified path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file at {:?}", path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file to string")?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn example() -> Self {
        Self {
            input: InputSource::Serial {
                port: PathBuf::from("/dev/ttyACM0"),
                baudrate: 9600,
            },
            output: OutputSink::Serial {
                port: PathBuf::from("/dev/ttyUSB0"),
                baudrate: 115200,
            },
            ..Self::default()
        }
    }
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            logger: Logger::default(),
            tuning: RawTuning::default(),
            front: RawEngine {
                negative_pin: "A7".to_string(),
                negative_token: "l".to_string(),
                positive_pin: "A8".to_string(),
                positive_token: "r".to_string(),
            },
            rear: RawEngine {
                negative_pin: "B7".to_string(),
                negative_token: "b".to_string(),
                positive_pin: "B8".to_string(),
                positive_token: "f".to_string(),
            },
            input: InputSource::Stdin,
            output: OutputSink::Log,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Logger {
    /// Log level used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawTuning {
    /// Sleep between two decay rounds in milliseconds
    pub round_interval_ms: u32,

    /// Counter magnitude at which deceleration begins
    pub deceleration_cutoff: u32,

    /// Counter change per command
    pub command_value: u32,

    pub decay_mode: DecayMode,
}

impl Default for RawTuning {
    fn default() -> Self {
        let tuning = Tuning::default();
        Self {
            round_interval_ms: tuning.round_interval_ms,
            deceleration_cutoff: tuning.deceleration_cutoff,
            command_value: tuning.command_value.unsigned_abs(),
            decay_mode: DecayMode::Sequential,
        }
    }
}

/// How the two engines decay after a command batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayMode {
    /// Front engine first, rear engine once the front is idle
    #[default]
    Sequential,
    /// Both engines at once
    Concurrent,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawEngine {
    pub negative_pin: String,
    pub negative_token: String,
    pub positive_pin: String,
    pub positive_token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum InputSource {
    /// Interactive prompt on standard input
    Stdin,
    /// Commands sent by a remote transmitter
    Serial { port: PathBuf, baudrate: u32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "sink", rename_all = "lowercase")]
pub enum OutputSink {
    /// Log every pin write
    Log,
    /// Send pin writes as text lines to an actuator board
    Serial { port: PathBuf, baudrate: u32 },
}

#[derive(Debug)]
pub struct Config {
    pub logger: Logger,
    pub tuning: Tuning,
    pub decay_mode: DecayMode,
    pub front: Engine,
    pub rear: Engine,
    pub input: InputSource,
    pub output: OutputSink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub negative_pin: String,
    pub negative_token: char,
    pub positive_pin: String,
    pub positive_token: char,
}

impl Engine {
    pub fn build(&self, tuning: &Tuning) -> anyhow::Result<MotorEngine> {
        MotorEngine::new(
            &self.negative_pin,
            self.negative_token,
            &self.positive_pin,
            self.positive_token,
            tuning,
        )
        .map_err(|e| anyhow!("Could not build engine {}/{}: {}", self.negative_pin, self.positive_pin, e))
    }
}

impl TryFrom<RawEngine> for Engine {
    type Error = anyhow::Error;

    fn try_from(raw_engine: RawEngine) -> Result<Self, Self::Error> {
        Ok(Engine {
            negative_pin: pin(raw_engine.negative_pin)?,
            negative_token: token(&raw_engine.negative_token)?,
            positive_pin: pin(raw_engine.positive_pin)?,
            positive_token: token(&raw_engine.positive_token)?,
        })
    }
}

fn pin(name: String) -> anyhow::Result<String> {
    if !PIN_RE.is_match(&name) {
        bail!("Invalid pin name {:?}", name);
    }
    Ok(name)
}

fn token(raw: &str) -> anyhow::Result<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() => Ok(c),
        _ => Err(anyhow!("Command token must be a single character, got {:?}", raw)),
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = anyhow::Error;

    fn try_from(raw_config: RawConfig) -> Result<Self, Self::Error> {
        let raw_tuning = raw_config.tuning;
        if raw_tuning.round_interval_ms == 0 {
            bail!("Round interval must be at least 1 ms");
        }
        if raw_tuning.deceleration_cutoff == 0 {
            bail!("Deceleration cutoff must be at least 1");
        }
        let command_value = i32::try_from(raw_tuning.command_value)
            .ok()
            .filter(|value| *value > 0)
            .ok_or(anyhow!("Invalid command value {}", raw_tuning.command_value))?;

        let front: Engine = raw_config.front.try_into().context("Invalid front engine")?;
        let rear: Engine = raw_config.rear.try_into().context("Invalid rear engine")?;

        // Every token must route to exactly one engine direction
        let mut tokens = HashSet::new();
        for token in [
            front.negative_token,
            front.positive_token,
            rear.negative_token,
            rear.positive_token,
        ] {
            if !tokens.insert(token) {
                bail!("Command token {:?} is used more than once", token);
            }
        }

        Ok(Config {
            logger: raw_config.logger,
            tuning: Tuning {
                round_interval_ms: raw_tuning.round_interval_ms,
                deceleration_cutoff: raw_tuning.deceleration_cutoff,
                command_value,
            },
            decay_mode: raw_tuning.decay_mode,
            front,
            rear,
            input: raw_config.input,
            output: raw_config.output,
        })
    }
}
