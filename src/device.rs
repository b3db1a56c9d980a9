use async_trait::async_trait;
use futures::{FutureExt, SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use std::{pin::Pin, time::Duration};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::{Decoder, Framed};

use super::proto::{
    codec::ProtocolCodec,
    command::{Command, OutputMode, SweepDirection, TriggerEdge, HZ_PER_MHZ},
    response::{self, Ident},
    ProtoError,
};
use crate::config::SynthConfig;
use crate::interface::{Frequency, MicrowaveSource, Status, SweepSettings};
use crate::limits::MicrowaveLimits;
use crate::proto::Result;

trait AsyncReadWrite: AsyncRead + AsyncWrite + Send {}

impl<T> AsyncReadWrite for T where T: AsyncRead + AsyncWrite + Send {}

/// Frequencies and power of list mode. The command set has no way to program
/// the list table, so these only live here.
#[derive(Debug, Clone)]
struct ListParameters {
    frequencies: Vec<f64>,
    power: f64,
}

impl Default for ListParameters {
    fn default() -> Self {
        Self {
            frequencies: Vec::new(),
            power: MicrowaveLimits::synthhd_pro().min_power,
        }
    }
}

/// Driver for one Windfreak SynthHD Pro.
///
/// The serial port is owned by the device and released when it is closed or
/// dropped, including when [`Device::open`] fails half way.
pub struct Device {
    stream: Framed<Pin<Box<dyn AsyncReadWrite>>, ProtocolCodec>,
    config: SynthConfig,
    timeout: Duration,
    ident: Ident,
    mode: OutputMode,
    output_active: bool,
    list: ListParameters,
    sweep_power: Option<f64>,
}

impl Device {
    /// Open the serial port, read the device identity and switch output off.
    pub async fn open(config: &SynthConfig) -> Result<Self> {
        let mut device = Self::open_port(config)?;
        device.activate().await?;
        Ok(device)
    }

    /// Open the serial port and read the device identity, leaving the output
    /// as it is. A running sweep is picked up as sweep mode, anything else as CW.
    pub async fn connect(config: &SynthConfig) -> Result<Self> {
        let mut device = Self::open_port(config)?;
        device.attach().await?;
        Ok(device)
    }

    fn open_port(config: &SynthConfig) -> Result<Self> {
        let mut port =
            tokio_serial::new(&config.serial_port, config.baud_rate).open_native_async()?;

        #[cfg(unix)]
        port.set_exclusive(false)?;

        Ok(Self::with_port(Box::pin(port), config))
    }

    fn with_port(port: Pin<Box<dyn AsyncReadWrite>>, config: &SynthConfig) -> Self {
        Self {
            stream: ProtocolCodec.framed(port),
            timeout: config.timeout(),
            config: config.clone(),
            ident: Ident::default(),
            mode: OutputMode::Cw,
            output_active: false,
            list: ListParameters::default(),
            sweep_power: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_faked(fake: super::proto::fake::FakeSynth, config: &SynthConfig) -> Self {
        Self::with_port(Box::pin(fake), config)
    }

    #[cfg(test)]
    pub(crate) async fn open_faked(
        fake: super::proto::fake::FakeSynth,
        config: &SynthConfig,
    ) -> Result<Self> {
        let mut device = Self::new_faked(fake, config);
        device.activate().await?;
        Ok(device)
    }

    #[cfg(test)]
    pub(crate) async fn connect_faked(
        fake: super::proto::fake::FakeSynth,
        config: &SynthConfig,
    ) -> Result<Self> {
        let mut device = Self::new_faked(fake, config);
        device.attach().await?;
        Ok(device)
    }

    async fn activate(&mut self) -> Result<()> {
        self.identify().await?;
        self.off().await
    }

    async fn attach(&mut self) -> Result<()> {
        self.identify().await?;
        if self.query_flag(Command::RunState).await? {
            self.mode = OutputMode::Sweep;
            self.output_active = true;
        }
        debug!("Attached in {} mode", self.mode);
        Ok(())
    }

    async fn identify(&mut self) -> Result<()> {
        let firmware = self.query_text(Command::FirmwareVersion).await?;
        let hardware = self.query_text(Command::HardwareVersion).await?;
        let model = self.query_text(Command::Model).await?;
        let serial = self.query_text(Command::SerialNumber).await?;
        info!(
            "Found {} {} hw: {} fw: {}",
            model, serial, hardware, firmware
        );
        self.ident = Ident {
            model,
            serial,
            hardware,
            firmware,
        };
        let temperature = self.temperature().await?;
        info!("MW synth temperature: {}°C", temperature);
        Ok(())
    }

    /// Flush pending commands and release the serial port.
    pub async fn close(mut self) -> Result<()> {
        SinkExt::<Command>::close(&mut self.stream).await?;
        debug!("Closed {}", self.config.serial_port);
        Ok(())
    }

    /// Device identification, as read when the device was opened
    pub fn ident(&self) -> &Ident {
        &self.ident
    }

    /// Currently selected output mode
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Query device temperature in °C
    pub async fn temperature(&mut self) -> Result<f64> {
        self.query_number(Command::Temperature).await
    }

    async fn send(&mut self, command: Command) -> Result<()> {
        debug!("> {}", command);
        if let Err(err) = self.stream.send(command).await {
            // A command that failed to go out must not ride along with the next one.
            self.stream.write_buffer_mut().clear();
            return Err(err.into());
        }
        Ok(())
    }

    /// Drop replies that arrived after their query already gave up.
    fn discard_stale_replies(&mut self) {
        while let Some(Some(Ok(reply))) = self.stream.next().now_or_never() {
            warn!("Discarding stale reply {:?}", reply);
        }
        self.stream.read_buffer_mut().clear();
    }

    async fn query(&mut self, command: Command) -> Result<String> {
        debug_assert!(command.is_query(), "{} expects no reply", command);
        self.discard_stale_replies();
        self.send(command).await?;
        match tokio::time::timeout(self.timeout, self.stream.next()).await {
            Ok(Some(Ok(reply))) => {
                debug!("< {}", reply);
                Ok(reply)
            }
            Ok(Some(Err(ioerr))) => Err(ioerr.into()),
            Ok(None) => Err(ProtoError::Abort),
            Err(_) => Err(ProtoError::Timeout(self.timeout)),
        }
    }

    async fn query_text(&mut self, command: Command) -> Result<String> {
        let reply = self.query(command.clone()).await?;
        response::parse_text(&command, &reply)
    }

    async fn query_number(&mut self, command: Command) -> Result<f64> {
        let reply = self.query(command.clone()).await?;
        response::parse_number(&command, &reply)
    }

    async fn query_hz(&mut self, command: Command) -> Result<f64> {
        Ok(self.query_number(command).await? * HZ_PER_MHZ)
    }

    async fn query_flag(&mut self, command: Command) -> Result<bool> {
        let reply = self.query(command.clone()).await?;
        response::parse_flag(&command, &reply)
    }

    /// Enable output and wait for lock. Output is switched off again if it
    /// never settles.
    async fn switch_on(&mut self) -> Result<()> {
        self.send(Command::Output(true)).await?;
        if let Err(err) = self.wait_until_locked().await {
            if let Err(off_err) = self.send(Command::Output(false)).await {
                warn!("Failed to switch output off after {}: {}", err, off_err);
            }
            self.output_active = false;
            return Err(err);
        }
        self.output_active = true;
        Ok(())
    }

    /// Poll PLL lock until the output is stable or the settle timeout expires.
    async fn wait_until_locked(&mut self) -> Result<()> {
        let settle_timeout = self.config.settle_timeout();
        let deadline = Instant::now() + settle_timeout;
        loop {
            if self.query_flag(Command::PllLocked).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ProtoError::NotReady(settle_timeout));
            }
            trace!("PLL not locked yet");
            tokio::time::sleep(self.config.settle_poll()).await;
        }
    }
}

#[async_trait]
impl MicrowaveSource for Device {
    fn limits(&self) -> MicrowaveLimits {
        MicrowaveLimits::synthhd_pro()
    }

    async fn status(&mut self) -> Result<Status> {
        let active = match self.mode {
            OutputMode::Cw => self.output_active,
            OutputMode::List | OutputMode::Sweep => self.query_flag(Command::RunState).await?,
        };
        Ok(Status {
            mode: self.mode,
            active,
        })
    }

    async fn off(&mut self) -> Result<()> {
        self.send(Command::Output(false)).await?;
        self.output_active = false;
        Ok(())
    }

    async fn power(&mut self) -> Result<f64> {
        match self.mode {
            OutputMode::Cw => self.query_number(Command::Power).await,
            OutputMode::List => Ok(self.list.power),
            OutputMode::Sweep => match self.sweep_power {
                Some(power) => Ok(power),
                None => {
                    let power = self.query_number(Command::SweepPowerStart).await?;
                    self.sweep_power = Some(power);
                    Ok(power)
                }
            },
        }
    }

    async fn frequency(&mut self) -> Result<Frequency> {
        match self.mode {
            OutputMode::Cw => Ok(Frequency::Cw(self.query_hz(Command::Frequency).await?)),
            OutputMode::List => Ok(Frequency::List(self.list.frequencies.clone())),
            OutputMode::Sweep => Ok(Frequency::Sweep {
                start: self.query_hz(Command::SweepStart).await?,
                stop: self.query_hz(Command::SweepStop).await?,
                step: self.query_hz(Command::SweepStep).await?,
            }),
        }
    }

    async fn cw_on(&mut self) -> Result<()> {
        self.mode = OutputMode::Cw;
        self.switch_on().await?;
        info!("CW output on");
        Ok(())
    }

    async fn set_cw(
        &mut self,
        frequency: Option<f64>,
        power: Option<f64>,
    ) -> Result<(f64, f64, OutputMode)> {
        debug!("set_cw, frequency: {:?}, power: {:?}", frequency, power);
        let limits = self.limits();
        if let Some(frequency) = frequency {
            limits.check_frequency(frequency)?;
        }
        if let Some(power) = power {
            limits.check_power(power)?;
        }

        self.output_active = false;
        self.mode = OutputMode::Cw;
        if let Some(frequency) = frequency {
            self.send(Command::SetFrequency(frequency)).await?;
        }
        if let Some(power) = power {
            self.send(Command::SetPower(power)).await?;
        }

        let frequency = self.query_hz(Command::Frequency).await?;
        let power = self.query_number(Command::Power).await?;
        Ok((frequency, power, OutputMode::Cw))
    }

    async fn list_on(&mut self) -> Result<()> {
        self.mode = OutputMode::List;
        self.switch_on().await?;
        info!("List mode output on");
        Ok(())
    }

    async fn set_list(
        &mut self,
        frequency: Option<Vec<f64>>,
        power: Option<f64>,
    ) -> Result<(Vec<f64>, f64, OutputMode)> {
        debug!("set_list, frequency_list: {:?}, power: {:?}", frequency, power);
        let limits = self.limits();
        if let Some(frequency) = &frequency {
            limits.check_list(frequency)?;
        }
        if let Some(power) = power {
            limits.check_power(power)?;
        }

        self.output_active = false;
        self.mode = OutputMode::List;
        if let Some(frequency) = frequency {
            self.list.frequencies = frequency;
        }
        if let Some(power) = power {
            self.list.power = power;
        }
        Ok((
            self.list.frequencies.clone(),
            self.list.power,
            OutputMode::List,
        ))
    }

    async fn reset_list_position(&mut self) -> Result<()> {
        self.send(Command::ResetPosition).await
    }

    async fn sweep_on(&mut self) -> Result<()> {
        self.mode = OutputMode::Sweep;
        self.send(Command::ResetPosition).await?;
        let running = self.query_flag(Command::RunState).await?;
        debug!("Sweep running after reset: {}", running);
        self.send(Command::Output(true)).await?;
        self.output_active = true;
        info!("Sweep output on");
        Ok(())
    }

    async fn set_sweep(
        &mut self,
        start: Option<f64>,
        stop: Option<f64>,
        step: Option<f64>,
        power: Option<f64>,
    ) -> Result<SweepSettings> {
        let limits = self.limits();
        let range = match (start, stop, step) {
            (Some(start), Some(stop), Some(step)) => {
                limits.check_frequency(start)?;
                limits.check_frequency(stop)?;
                limits.check_sweep_step(step)?;
                Some((start, stop, step))
            }
            (None, None, None) => None,
            _ => {
                warn!("Sweep start, stop and step must be given together, ignoring them");
                None
            }
        };
        if let Some(power) = power {
            limits.check_power(power)?;
        }

        self.mode = OutputMode::Sweep;
        if let Some((start, stop, step)) = range {
            // linear, non-continuous sweep advanced one step per trigger
            self.send(Command::LinearSweep).await?;
            self.send(Command::SingleSweep).await?;
            self.send(Command::SingleStepTrigger).await?;
            let direction = SweepDirection::between(start, stop);
            self.send(Command::SetSweepDirection(direction)).await?;
            self.send(Command::SetSweepStart(start)).await?;
            self.send(Command::SetSweepStop(stop)).await?;
            self.send(Command::SetSweepStep(step)).await?;
        }
        if let Some(power) = power {
            self.send(Command::SetPower(power)).await?;
            self.send(Command::SetSweepPowerStart(power)).await?;
            self.send(Command::SetSweepPowerStop(power)).await?;
        }

        let start = self.query_hz(Command::SweepStart).await?;
        let stop = self.query_hz(Command::SweepStop).await?;
        let step = self.query_hz(Command::SweepStep).await?;
        let power = self.query_number(Command::SweepPowerStart).await?;
        self.sweep_power = Some(power);
        Ok(SweepSettings {
            start,
            stop,
            step,
            power,
            mode: OutputMode::Sweep,
        })
    }

    async fn reset_sweep_position(&mut self) -> Result<()> {
        self.send(Command::ResetPosition).await
    }

    async fn set_ext_trigger(&mut self, edge: TriggerEdge) -> Result<TriggerEdge> {
        if edge != TriggerEdge::Falling {
            debug!("Trigger edge {} requested, trigger edge is fixed to falling", edge);
        }
        Ok(TriggerEdge::Falling)
    }

    async fn trigger(&mut self) -> Result<()> {
        // List and sweep steps are advanced by the external trigger line only.
        Ok(())
    }
}
