use serde::{Deserialize, Serialize};

use crate::error::{ErpError, Result};

/// Role of a channel within a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    /// Continuous physiological signal
    Signal,
    /// Auxiliary line carrying discrete integer event codes
    Marker,
}

/// Per-channel metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    pub unit: String,
    pub role: ChannelRole,
}

impl ChannelInfo {
    pub fn signal(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            role: ChannelRole::Signal,
        }
    }

    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: String::new(),
            role: ChannelRole::Marker,
        }
    }
}

/// A complete multichannel recording held in memory
///
/// Data is channel-major: `data[channel][sample]`. All channels share the
/// same sample count and sampling rate. Pipeline stages return new
/// recordings rather than mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuousRecording {
    pub channels: Vec<ChannelInfo>,
    pub data: Vec<Vec<f64>>, // [channels × samples]
    pub sampling_rate: f64,
}

impl ContinuousRecording {
    /// Build a recording, validating shape consistency up front
    pub fn new(
        channels: Vec<ChannelInfo>,
        data: Vec<Vec<f64>>,
        sampling_rate: f64,
    ) -> Result<Self> {
        if sampling_rate <= 0.0 {
            return Err(ErpError::InvalidRecording(format!(
                "sampling rate must be positive, got {}",
                sampling_rate
            )));
        }
        if channels.len() != data.len() {
            return Err(ErpError::InvalidRecording(format!(
                "{} channel descriptions but {} data rows",
                channels.len(),
                data.len()
            )));
        }
        if data.is_empty() {
            return Err(ErpError::InvalidRecording(
                "recording has no channels".to_string(),
            ));
        }
        let n_samples = data[0].len();
        for (info, row) in channels.iter().zip(&data) {
            if row.len() != n_samples {
                return Err(ErpError::InvalidRecording(format!(
                    "channel '{}' has {} samples, expected {}",
                    info.name,
                    row.len(),
                    n_samples
                )));
            }
        }
        Ok(Self {
            channels,
            data,
            sampling_rate,
        })
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn n_samples(&self) -> usize {
        self.data.first().map_or(0, |row| row.len())
    }

    pub fn duration_secs(&self) -> f64 {
        self.n_samples() as f64 / self.sampling_rate
    }

    pub fn nyquist(&self) -> f64 {
        self.sampling_rate / 2.0
    }

    /// Index of the channel with the given name, if present
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    /// Indices of all signal channels, in recording order
    pub fn signal_indices(&self) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role == ChannelRole::Signal)
            .map(|(i, _)| i)
            .collect()
    }

    /// Names of all signal channels, in recording order
    pub fn signal_names(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| c.role == ChannelRole::Signal)
            .map(|c| c.name.clone())
            .collect()
    }
}

/// A discrete event derived from the marker channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMarker {
    /// Sample index of the rising transition
    pub sample_index: usize,
    /// Sustained integer level identifying the stimulus/condition
    pub code: i32,
}

/// One event-aligned window cut from a recording
///
/// `data` covers the signal channels only, in recording order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epoch {
    pub condition: String,
    pub data: Vec<Vec<f64>>, // [channels × samples]
    pub baseline_applied: bool,
}

/// Trial-averaged waveform for one condition
///
/// Immutable once computed. A difference waveform produced by the contrast
/// engine is also represented as an `EvokedResponse`; there `n_trials`
/// carries no meaning and is set to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvokedResponse {
    pub condition: String,
    pub channel_names: Vec<String>,
    pub data: Vec<Vec<f64>>, // [channels × samples]
    /// Event-relative time of each sample, in seconds
    pub times: Vec<f64>,
    /// Number of epochs contributing to the mean
    pub n_trials: usize,
}

impl EvokedResponse {
    pub fn n_channels(&self) -> usize {
        self.channel_names.len()
    }

    pub fn n_samples(&self) -> usize {
        self.times.len()
    }
}

/// Detected component: peak location in time, amplitude and channel
///
/// `time` and `amplitude` come from the cross-channel average inside the
/// search window; `channel` is the channel with the largest individual
/// maximum over the same window. The channel's own peak time need not
/// coincide with `time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub amplitude: f64,
    /// Event-relative peak time in seconds
    pub time: f64,
    pub channel: String,
    /// Search window (tmin, tmax) in seconds
    pub search_window: (f64, f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel_recording() -> ContinuousRecording {
        ContinuousRecording::new(
            vec![
                ChannelInfo::signal("EEG 001", "uV"),
                ChannelInfo::marker("STI 014"),
            ],
            vec![vec![0.0; 100], vec![0.0; 100]],
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn test_recording_shape_accessors() {
        let rec = two_channel_recording();
        assert_eq!(rec.n_channels(), 2);
        assert_eq!(rec.n_samples(), 100);
        assert_eq!(rec.duration_secs(), 1.0);
        assert_eq!(rec.nyquist(), 50.0);
    }

    #[test]
    fn test_channel_lookup() {
        let rec = two_channel_recording();
        assert_eq!(rec.channel_index("STI 014"), Some(1));
        assert_eq!(rec.channel_index("missing"), None);
        assert_eq!(rec.signal_indices(), vec![0]);
        assert_eq!(rec.signal_names(), vec!["EEG 001".to_string()]);
    }

    #[test]
    fn test_recording_rejects_ragged_data() {
        let result = ContinuousRecording::new(
            vec![
                ChannelInfo::signal("a", "uV"),
                ChannelInfo::signal("b", "uV"),
            ],
            vec![vec![0.0; 10], vec![0.0; 9]],
            100.0,
        );
        assert!(matches!(result, Err(ErpError::InvalidRecording(_))));
    }

    #[test]
    fn test_recording_rejects_channel_count_mismatch() {
        let result = ContinuousRecording::new(
            vec![ChannelInfo::signal("a", "uV")],
            vec![vec![0.0; 10], vec![0.0; 10]],
            100.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_recording_rejects_bad_sampling_rate() {
        let result = ContinuousRecording::new(
            vec![ChannelInfo::signal("a", "uV")],
            vec![vec![0.0; 10]],
            0.0,
        );
        assert!(result.is_err());
    }
}
