#![deny(clippy::unwrap_used)]

use clap::{arg, command, value_parser};
use log::LevelFilter;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::process::exit;
use synthhdctrl::proto::{self, Result};
use synthhdctrl::{
    Device, Frequency, MicrowaveSource, SynthConfig, TriggerEdge, DEFAULT_BAUDRATE, DEFAULT_TTY,
};

#[derive(Debug, Copy, Clone)]
pub enum OutputFormat {
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl clap::ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Text, Self::Json]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Text => clap::builder::PossibleValue::new("text"),
            Self::Json => clap::builder::PossibleValue::new("json"),
        })
    }
}

#[tokio::main]
async fn main() {
    let matches =
        command!() // requires `cargo` feature
            .arg(
                arg!(
                    -p --device <PORT> "Serial port of the synthesizer"
                )
                .default_value(DEFAULT_TTY)
                .required(false)
                .value_parser(value_parser!(String)),
            )
            .arg(
                arg!(
                    -c --config <FILE> "TOML configuration, overrides --device"
                )
                .required(false)
                .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(
                    -t --timeout <SECONDS> "Reply timeout"
                )
                .required(false)
                .value_parser(value_parser!(u64)),
            )
            .arg(
                arg!(
                    -b --baudrate <BAUDRATE> "Baudrate"
                )
                .default_value(DEFAULT_BAUDRATE.to_string())
                .value_parser(value_parser!(u32)),
            )
            .arg(arg!(
                -d --debug ... "Turn debugging information on"
            ))
            .arg(
                arg!(--format <fmt> "Output format")
                    .required(false)
                    .value_parser(value_parser!(OutputFormat)),
            )
            .subcommand(clap::Command::new("ident").about("Device identification"))
            .subcommand(clap::Command::new("temperature").about("Device temperature"))
            .subcommand(clap::Command::new("limits").about("Frequency and power limits"))
            .subcommand(clap::Command::new("status").about("Output mode and state"))
            .subcommand(clap::Command::new("off").about("Switch output off"))
            .subcommand(clap::Command::new("power").about("Output power in dBm"))
            .subcommand(clap::Command::new("frequency").about("Output frequency in Hz"))
            .subcommand(
                clap::Command::new("cw")
                    .about("Continuous wave output")
                    .arg(
                        arg!(--frequency <HZ> "Set frequency")
                            .required(false)
                            .value_parser(value_parser!(f64)),
                    )
                    .arg(
                        arg!(--power <DBM> "Set power")
                            .required(false)
                            .allow_negative_numbers(true)
                            .value_parser(value_parser!(f64)),
                    )
                    .arg(arg!(--on "Switch output on")),
            )
            .subcommand(
                clap::Command::new("sweep")
                    .about("Triggered frequency sweep")
                    .arg(
                        arg!(--start <HZ> "Start frequency")
                            .required(false)
                            .requires_all(["stop", "step"])
                            .value_parser(value_parser!(f64)),
                    )
                    .arg(
                        arg!(--stop <HZ> "Stop frequency")
                            .required(false)
                            .requires_all(["start", "step"])
                            .value_parser(value_parser!(f64)),
                    )
                    .arg(
                        arg!(--step <HZ> "Frequency step")
                            .required(false)
                            .requires_all(["start", "stop"])
                            .value_parser(value_parser!(f64)),
                    )
                    .arg(
                        arg!(--power <DBM> "Set power")
                            .required(false)
                            .allow_negative_numbers(true)
                            .value_parser(value_parser!(f64)),
                    )
                    .arg(arg!(--on "Start the sweep")),
            )
            .subcommand(clap::Command::new("reset-sweep").about("Reset sweep to start frequency"))
            .subcommand(
                clap::Command::new("trigger-edge")
                    .about("External trigger edge")
                    .arg(
                        arg!(<edge> "Requested edge")
                            .value_parser(value_parser!(TriggerEdge)),
                    ),
            )
            .subcommand_required(true)
            .get_matches();

    let level = match matches.get_count("debug") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match handle_args(&matches).await {
        Ok(()) => {}
        Err(e) => {
            match e {
                proto::ProtoError::DeviceUnreachable(err) => {
                    if err.kind() == tokio_serial::ErrorKind::NoDevice {
                        eprintln!("Device not found: {}", err);
                    } else {
                        eprintln!("Cannot open device: {}", err);
                    }
                    exit(-1);
                }
                proto::ProtoError::Io(err) => {
                    eprintln!("I/O Error: {}", err);
                    exit(-1);
                }
                proto::ProtoError::Timeout(after) => {
                    eprintln!("Device did not answer within {:?}, aborting!", after);
                    exit(-1);
                }
                proto::ProtoError::Abort => {
                    eprintln!("Failed to communicate with device, aborting!");
                    exit(-1);
                }
                proto::ProtoError::Protocol { command, reply } => {
                    eprintln!(
                        "Received an unexpected reply to {:?}, aborting!: {:?}",
                        command, reply
                    );
                    exit(-1);
                }
                proto::ProtoError::NotReady(after) => {
                    eprintln!("Output did not settle within {:?}", after);
                    exit(-3);
                }
                proto::ProtoError::InvalidParameter(msg) | proto::ProtoError::Config(msg) => {
                    eprintln!("{}", msg);
                    exit(-2);
                }
            }
        }
    }
}

fn load_config(matches: &clap::ArgMatches) -> Result<SynthConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SynthConfig::load(path)?,
        None => {
            let port = matches
                .get_one::<String>("device")
                .map(String::as_str)
                .unwrap_or(DEFAULT_TTY);
            let mut config = SynthConfig::new(port);
            if let Some(baud_rate) = matches.get_one::<u32>("baudrate") {
                config.baud_rate = *baud_rate;
            }
            config
        }
    };
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.serial_timeout = Some(*timeout);
    }
    Ok(config)
}

fn print<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) {
    match format {
        OutputFormat::Text => println!("{}", text(value)),
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(err) => eprintln!("JSON serialization failed: {}", err),
        },
    }
}

fn frequency_text(frequency: &Frequency) -> String {
    match frequency {
        Frequency::Cw(hz) => format!("Frequency: {} Hz", hz),
        Frequency::List(list) => format!("Frequency list: {:?} Hz", list),
        Frequency::Sweep { start, stop, step } => {
            format!("Sweep: {} Hz .. {} Hz, step {} Hz", start, stop, step)
        }
    }
}

async fn handle_args(matches: &clap::ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let format = *matches
        .get_one::<OutputFormat>("format")
        .unwrap_or(&OutputFormat::Text);

    // Attach without touching the output, so a running sweep survives a status query.
    let mut device = Device::connect(&config).await?;
    eprintln!("Connected to: {}\n", config.serial_port);

    match matches.subcommand() {
        Some(("ident", _args)) => {
            print(format, device.ident(), |ident| {
                format!(
                    "Model: {}\nSerial: {}\nHardware: {}\nFirmware: {}",
                    ident.model, ident.serial, ident.hardware, ident.firmware
                )
            });
        }
        Some(("temperature", _args)) => {
            let temperature = device.temperature().await?;
            print(format, &temperature, |t| format!("Temperature: {} °C", t));
        }
        Some(("limits", _args)) => {
            print(format, &device.limits(), |limits| {
                format!(
                    "Frequency: {} .. {} Hz\nPower: {} .. {} dBm\nModes: {:?}",
                    limits.min_frequency,
                    limits.max_frequency,
                    limits.min_power,
                    limits.max_power,
                    limits.supported_modes
                )
            });
        }
        Some(("status", _args)) => {
            let status = device.status().await?;
            print(format, &status, |s| {
                format!(
                    "Mode: {}\nOutput: {}",
                    s.mode,
                    if s.active { "on" } else { "off" }
                )
            });
        }
        Some(("off", _args)) => {
            device.off().await?;
            println!("OK");
        }
        Some(("power", _args)) => {
            let power = device.power().await?;
            print(format, &power, |p| format!("Power: {} dBm", p));
        }
        Some(("frequency", _args)) => {
            let frequency = device.frequency().await?;
            print(format, &frequency, frequency_text);
        }
        Some(("cw", args)) => {
            let frequency = args.get_one::<f64>("frequency").copied();
            let power = args.get_one::<f64>("power").copied();
            let (frequency, power, mode) = device.set_cw(frequency, power).await?;
            if let Some(true) = args.get_one::<bool>("on") {
                device.cw_on().await?;
            }
            print(format, &(frequency, power, mode), |(f, p, m)| {
                format!("Mode: {}\nFrequency: {} Hz\nPower: {} dBm", m, f, p)
            });
        }
        Some(("sweep", args)) => {
            let settings = device
                .set_sweep(
                    args.get_one::<f64>("start").copied(),
                    args.get_one::<f64>("stop").copied(),
                    args.get_one::<f64>("step").copied(),
                    args.get_one::<f64>("power").copied(),
                )
                .await?;
            if let Some(true) = args.get_one::<bool>("on") {
                device.sweep_on().await?;
            }
            print(format, &settings, |s| {
                format!(
                    "Mode: {}\nSweep: {} Hz .. {} Hz, step {} Hz\nPower: {} dBm",
                    s.mode, s.start, s.stop, s.step, s.power
                )
            });
        }
        Some(("reset-sweep", _args)) => {
            device.reset_sweep_position().await?;
            println!("OK");
        }
        Some(("trigger-edge", args)) => {
            let requested = *args
                .get_one::<TriggerEdge>("edge")
                .unwrap_or(&TriggerEdge::Falling);
            let edge = device.set_ext_trigger(requested).await?;
            print(format, &edge, |e| format!("Trigger edge: {}", e));
        }
        _ => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Unsupported command line argument",
            )
            .into());
        }
    }

    device.close().await
}
