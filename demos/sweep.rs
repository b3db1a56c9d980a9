use synthhdctrl::{Device, MicrowaveSource, SynthConfig, DEFAULT_TTY};

#[tokio::main]
async fn main() -> synthhdctrl::Result<()> {
    env_logger::init();

    let config = SynthConfig::new(DEFAULT_TTY).with_timeout(10);
    let mut device = Device::open(&config).await?;

    let settings = device
        .set_sweep(Some(2.80e9), Some(2.95e9), Some(1e6), Some(-10.0))
        .await?;
    println!(
        "Sweep {} Hz .. {} Hz, step {} Hz at {} dBm",
        settings.start, settings.stop, settings.step, settings.power
    );

    device.sweep_on().await?;
    let status = device.status().await?;
    println!("Mode: {}, running: {}", status.mode, status.active);

    device.off().await?;
    device.close().await
}
