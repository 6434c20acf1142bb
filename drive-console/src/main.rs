use std::path::PathBuf;

use clap::Parser;
use tracing::info;

mod config;
mod control;
mod sink;
mod source;

use crate::config::{Config, RawConfig};
use crate::control::ControlLoop;
use crate::sink::ThreadDelay;

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    /// Path to config file, the built-in defaults are used if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print an example config and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_config {
        println!("{}", toml::to_string(&RawConfig::example())?);
        return Ok(());
    }

    // Parse config
    let raw_config = match &args.config {
        Some(path) => match RawConfig::load(path) {
            Ok(val) => val,
            Err(e) => {
                println!("Error: Failed to load config: {:#}", e);
                println!();
                println!(
                    "Example config:\n\n{}",
                    toml::to_string(&RawConfig::example())?
                );
                return Ok(());
            }
        },
        None => RawConfig::default(),
    };
    let config: Config = raw_config.try_into()?;

    init_logging(&config.logger.level);

    // Engines are built once and live for the whole session
    let front = config.front.build(&config.tuning)?;
    let rear = config.rear.build(&config.tuning)?;
    let sink = sink::open(&config.output)?;
    let mut control = ControlLoop::new(front, rear, config.decay_mode, sink, ThreadDelay)?;
    info!(
        "Front engine on pins {}/{}, rear engine on pins {}/{}, {:?} decay",
        control.front().negative_pin(),
        control.front().positive_pin(),
        control.rear().negative_pin(),
        control.rear().positive_pin(),
        config.decay_mode
    );

    // Main loop
    let commands = source::open(&config.input)?;
    let processed = control.run(commands);
    info!("Command source closed after {} commands", processed);

    Ok(())
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
                format!("{app_name}={level},drive_engine={level}").into()
            }),
        )
        .init();
}
