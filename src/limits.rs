use serde::Serialize;

use crate::proto::{command::OutputMode, ProtoError, Result};

/// Hardware limits of the SynthHD Pro.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicrowaveLimits {
    pub supported_modes: Vec<OutputMode>,
    /// Hz
    pub min_frequency: f64,
    /// Hz
    pub max_frequency: f64,
    /// dBm
    pub min_power: f64,
    /// dBm
    pub max_power: f64,
    pub list_minstep: f64,
    pub list_maxstep: f64,
    pub list_maxentries: usize,
    pub sweep_minstep: f64,
    pub sweep_maxstep: f64,
    pub sweep_maxentries: usize,
}

impl MicrowaveLimits {
    pub fn synthhd_pro() -> Self {
        Self {
            // The list table cannot be programmed over this command set.
            supported_modes: vec![OutputMode::Cw, OutputMode::Sweep],
            min_frequency: 53e6,
            max_frequency: 14e9,
            min_power: -60.0,
            max_power: 20.0,
            list_minstep: 0.01,
            list_maxstep: 14e9,
            list_maxentries: 100,
            sweep_minstep: 0.01,
            sweep_maxstep: 14e9,
            sweep_maxentries: 100,
        }
    }

    pub fn check_frequency(&self, hz: f64) -> Result<()> {
        if hz.is_finite() && (self.min_frequency..=self.max_frequency).contains(&hz) {
            Ok(())
        } else {
            Err(ProtoError::InvalidParameter(format!(
                "frequency {} Hz outside [{}, {}] Hz",
                hz, self.min_frequency, self.max_frequency
            )))
        }
    }

    pub fn check_power(&self, dbm: f64) -> Result<()> {
        if dbm.is_finite() && (self.min_power..=self.max_power).contains(&dbm) {
            Ok(())
        } else {
            Err(ProtoError::InvalidParameter(format!(
                "power {} dBm outside [{}, {}] dBm",
                dbm, self.min_power, self.max_power
            )))
        }
    }

    pub fn check_sweep_step(&self, hz: f64) -> Result<()> {
        if hz.is_finite() && (self.sweep_minstep..=self.sweep_maxstep).contains(&hz) {
            Ok(())
        } else {
            Err(ProtoError::InvalidParameter(format!(
                "sweep step {} Hz outside [{}, {}] Hz",
                hz, self.sweep_minstep, self.sweep_maxstep
            )))
        }
    }

    pub fn check_list(&self, frequencies: &[f64]) -> Result<()> {
        if frequencies.len() > self.list_maxentries {
            return Err(ProtoError::InvalidParameter(format!(
                "{} list entries, at most {} supported",
                frequencies.len(),
                self.list_maxentries
            )));
        }
        frequencies
            .iter()
            .try_for_each(|hz| self.check_frequency(*hz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_bounds() {
        let limits = MicrowaveLimits::synthhd_pro();
        assert!(limits.check_frequency(53e6).is_ok());
        assert!(limits.check_frequency(14e9).is_ok());
        assert!(limits.check_frequency(52.9e6).is_err());
        assert!(limits.check_frequency(f64::NAN).is_err());
    }

    #[test]
    fn test_power_bounds() {
        let limits = MicrowaveLimits::synthhd_pro();
        assert!(limits.check_power(-60.0).is_ok());
        assert!(limits.check_power(20.5).is_err());
    }

    #[test]
    fn test_list_entries() {
        let limits = MicrowaveLimits::synthhd_pro();
        assert!(limits.check_list(&[1e9, 2e9]).is_ok());
        assert!(limits.check_list(&vec![1e9; 101]).is_err());
        assert!(limits.check_list(&[1e9, 20e9]).is_err());
    }
}
