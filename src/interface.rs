//! Capability interface of a microwave source as seen by a measurement host.

use async_trait::async_trait;
use serde::Serialize;

use crate::limits::MicrowaveLimits;
use crate::proto::command::{OutputMode, TriggerEdge};
use crate::proto::Result;

/// Frequency setting, shaped by the current output mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Cw(f64),
    List(Vec<f64>),
    Sweep { start: f64, stop: f64, step: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub mode: OutputMode,
    pub active: bool,
}

/// Values read back after configuring a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepSettings {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
    pub power: f64,
    pub mode: OutputMode,
}

#[async_trait]
pub trait MicrowaveSource {
    fn limits(&self) -> MicrowaveLimits;

    async fn status(&mut self) -> Result<Status>;

    /// Switch off any output.
    async fn off(&mut self) -> Result<()>;

    /// Output power in dBm.
    async fn power(&mut self) -> Result<f64>;

    async fn frequency(&mut self) -> Result<Frequency>;

    /// Switch on CW output. Returns once the output is running.
    async fn cw_on(&mut self) -> Result<()>;

    /// Select CW mode and optionally change frequency (Hz) and power (dBm).
    async fn set_cw(
        &mut self,
        frequency: Option<f64>,
        power: Option<f64>,
    ) -> Result<(f64, f64, OutputMode)>;

    /// Switch on list output. Returns once the output is running.
    async fn list_on(&mut self) -> Result<()>;

    async fn set_list(
        &mut self,
        frequency: Option<Vec<f64>>,
        power: Option<f64>,
    ) -> Result<(Vec<f64>, f64, OutputMode)>;

    /// Move the list position back to the first entry.
    async fn reset_list_position(&mut self) -> Result<()>;

    async fn sweep_on(&mut self) -> Result<()>;

    /// Start, stop and step are applied only when all three are given.
    async fn set_sweep(
        &mut self,
        start: Option<f64>,
        stop: Option<f64>,
        step: Option<f64>,
        power: Option<f64>,
    ) -> Result<SweepSettings>;

    /// Move the sweep position back to the start frequency.
    async fn reset_sweep_position(&mut self) -> Result<()>;

    async fn set_ext_trigger(&mut self, edge: TriggerEdge) -> Result<TriggerEdge>;

    /// Advance list/sweep position by software.
    async fn trigger(&mut self) -> Result<()>;
}
