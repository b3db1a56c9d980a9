//!
//! This library provides communication with a Windfreak SynthHD Pro microwave signal generator.
//!
//! <br>
//!
//! # Details
//!
//! - The synthesizer enumerates as a USB CDC serial port.
//!
//! - Basic setup and connection
//!
//!   ```no_run
//!   use synthhdctrl::{Device, MicrowaveSource, SynthConfig};
//!   #[tokio::main]
//!   async fn main() -> synthhdctrl::Result<()> {
//!       let config = SynthConfig::new("/dev/ttyACM0").with_timeout(10);
//!       let mut device = Device::open(&config).await?;
//!       eprintln!("Connected to: {}\n", device.ident().model);
//!       device.set_cw(Some(2.87e9), Some(-10.0)).await?;
//!       device.cw_on().await?;
//!       device.close().await
//!   }
//!   ```
//!
//! # Supported devices
//!
//!  * Windfreak SynthHD Pro
//!

pub mod config;
pub mod device;
pub mod interface;
pub mod limits;
pub mod proto;

pub use config::SynthConfig;
pub use device::Device;
pub use interface::{Frequency, MicrowaveSource, Status, SweepSettings};
pub use limits::MicrowaveLimits;
pub use proto::command::{OutputMode, TriggerEdge};
pub use proto::{ProtoError, Result};

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyACM0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// The USB CDC port ignores the rate, but the serial layer requires one.
pub const DEFAULT_BAUDRATE: u32 = 115200;
