use std::fmt::Display;

use serde::Serialize;

/// Output mode of the synthesizer. Exactly one is current at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Cw,
    List,
    Sweep,
}

impl Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Cw => f.write_str("cw"),
            OutputMode::List => f.write_str("list"),
            OutputMode::Sweep => f.write_str("sweep"),
        }
    }
}

/// Edge on the external trigger line that advances list/sweep position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEdge {
    Rising,
    Falling,
}

impl Display for TriggerEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEdge::Rising => f.write_str("rising"),
            TriggerEdge::Falling => f.write_str("falling"),
        }
    }
}

impl clap::ValueEnum for TriggerEdge {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Rising, Self::Falling]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Rising => clap::builder::PossibleValue::new("rising"),
            Self::Falling => clap::builder::PossibleValue::new("falling"),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SweepDirection {
    Descending,
    Ascending,
}

impl SweepDirection {
    /// Ascending unless `stop` lies below `start`.
    pub fn between(start: f64, stop: f64) -> Self {
        if stop >= start {
            Self::Ascending
        } else {
            Self::Descending
        }
    }
}

/// Commands understood by the SynthHD Pro.
///
/// Frequencies are carried in Hz and written to the wire in MHz.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FirmwareVersion,
    HardwareVersion,
    Model,
    SerialNumber,
    Temperature,
    PllLocked,
    Frequency,
    SetFrequency(f64),
    Power,
    SetPower(f64),
    RunState,
    ResetPosition,
    SweepStart,
    SetSweepStart(f64),
    SweepStop,
    SetSweepStop(f64),
    SweepStep,
    SetSweepStep(f64),
    SweepPowerStart,
    SetSweepPowerStart(f64),
    SetSweepPowerStop(f64),
    /// `X0`: linear sweep instead of tabular.
    LinearSweep,
    /// `c0`: run a sweep once instead of continuously.
    SingleSweep,
    /// `w2`: advance one step per external trigger.
    SingleStepTrigger,
    SetSweepDirection(SweepDirection),
    /// Master, RF and hardware output enable bits.
    Output(bool),
}

impl Command {
    /// Queries are answered by exactly one reply line, all other commands by none.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Command::FirmwareVersion
                | Command::HardwareVersion
                | Command::Model
                | Command::SerialNumber
                | Command::Temperature
                | Command::PllLocked
                | Command::Frequency
                | Command::Power
                | Command::RunState
                | Command::SweepStart
                | Command::SweepStop
                | Command::SweepStep
                | Command::SweepPowerStart
        )
    }
}

pub(crate) const HZ_PER_MHZ: f64 = 1e6;

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::FirmwareVersion => f.write_str("v0"),
            Command::HardwareVersion => f.write_str("v1"),
            Command::Model => f.write_str("+"),
            Command::SerialNumber => f.write_str("-"),
            Command::Temperature => f.write_str("z?"),
            Command::PllLocked => f.write_str("p?"),
            Command::Frequency => f.write_str("f?"),
            Command::SetFrequency(hz) => write!(f, "f{:5.7}", hz / HZ_PER_MHZ),
            Command::Power => f.write_str("W?"),
            Command::SetPower(dbm) => write!(f, "W{:2.3}", dbm),
            Command::RunState => f.write_str("g?"),
            Command::ResetPosition => f.write_str("g1"),
            Command::SweepStart => f.write_str("l?"),
            Command::SetSweepStart(hz) => write!(f, "l{:5.7}", hz / HZ_PER_MHZ),
            Command::SweepStop => f.write_str("u?"),
            Command::SetSweepStop(hz) => write!(f, "u{:5.7}", hz / HZ_PER_MHZ),
            Command::SweepStep => f.write_str("s?"),
            Command::SetSweepStep(hz) => write!(f, "s{:5.7}", hz / HZ_PER_MHZ),
            Command::SweepPowerStart => f.write_str("[?"),
            Command::SetSweepPowerStart(dbm) => write!(f, "[{:2.3}", dbm),
            Command::SetSweepPowerStop(dbm) => write!(f, "]{:2.3}", dbm),
            Command::LinearSweep => f.write_str("X0"),
            Command::SingleSweep => f.write_str("c0"),
            Command::SingleStepTrigger => f.write_str("w2"),
            Command::SetSweepDirection(SweepDirection::Ascending) => f.write_str("^1"),
            Command::SetSweepDirection(SweepDirection::Descending) => f.write_str("^0"),
            Command::Output(true) => f.write_str("E1r1h1"),
            Command::Output(false) => f.write_str("E0r0h0"),
        }
    }
}
