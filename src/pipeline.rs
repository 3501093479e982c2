//! Pipeline runner: composes the engine stages into one analysis pass.

use serde::{Deserialize, Serialize};

use crate::epochs::{extract_epochs, Baseline, ConditionEntry, ConditionMap};
use crate::error::{ErpError, Result};
use crate::events::{code_counts, detect_events};
use crate::evoked::{average, difference};
use crate::filter::band_pass_filter;
use crate::peak::locate_peak;
use crate::types::{ComponentReport, ContinuousRecording, EvokedResponse};

/// Complete configuration for one analysis run
///
/// Every parameter is explicit; nothing is read from ambient state. The
/// defaults reproduce the classic auditory oddball run: 0.1-40 Hz
/// band-pass, 2 ms marker de-bounce, -0.2..0.8 s epochs baselined on the
/// pre-stimulus span, and a P300 search window of 250-400 ms on the
/// oddball-minus-standard contrast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpConfig {
    /// High-pass edge in Hz; `None` disables the high-pass stage
    pub low_cut: Option<f64>,
    /// Low-pass edge in Hz; `None` disables the low-pass stage
    pub high_cut: Option<f64>,
    /// Name of the channel carrying event codes
    pub marker_channel: String,
    /// Minimum sustained marker duration in seconds
    pub min_duration: f64,
    pub conditions: ConditionMap,
    /// Epoch window start relative to the event, in seconds
    pub tmin: f64,
    /// Epoch window end relative to the event, in seconds
    pub tmax: f64,
    pub baseline: Option<Baseline>,
    /// Condition labels for the difference waveform, computed as `.0 - .1`
    pub contrast: (String, String),
    /// Component search window (tmin, tmax) in seconds
    pub search_window: (f64, f64),
}

impl Default for ErpConfig {
    fn default() -> Self {
        let conditions = ConditionMap::new(vec![
            ConditionEntry::new("standard", [1]),
            ConditionEntry::new("oddball", [2]),
        ])
        .expect("default condition map is valid");
        Self {
            low_cut: Some(0.1),
            high_cut: Some(40.0),
            marker_channel: "STI 014".to_string(),
            min_duration: 0.002,
            conditions,
            tmin: -0.2,
            tmax: 0.8,
            baseline: Some((None, 0.0)),
            contrast: ("oddball".to_string(), "standard".to_string()),
            search_window: (0.25, 0.40),
        }
    }
}

/// Everything one analysis run produces
///
/// Plain serializable values with no external references; safe to hand to
/// any storage or reporting layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpAnalysis {
    pub id: String,
    pub created_at: String,
    /// Per-code event tally, ordered by code
    pub event_counts: Vec<(i32, usize)>,
    /// Trial-averaged waveform per condition, in condition-map order
    pub evoked: Vec<EvokedResponse>,
    /// Contrast waveform (`contrast.0 - contrast.1`)
    pub difference: EvokedResponse,
    pub component: ComponentReport,
    pub n_events: usize,
    pub n_epochs: usize,
    /// Events whose epoch window fell outside the recording
    pub n_rejected: usize,
}

/// Runs the full filter -> detect -> epoch -> average -> contrast ->
/// locate pipeline over an in-memory recording.
pub struct ErpPipeline {
    config: ErpConfig,
}

impl ErpPipeline {
    pub fn new(config: ErpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ErpConfig {
        &self.config
    }

    /// Execute one analysis pass.
    ///
    /// The recording is consumed stage by stage but never mutated; each
    /// stage produces a fresh value. Any stage error aborts the run.
    pub fn run(&self, recording: &ContinuousRecording) -> Result<ErpAnalysis> {
        let cfg = &self.config;
        for label in [&cfg.contrast.0, &cfg.contrast.1] {
            if !cfg.conditions.contains_label(label) {
                return Err(ErpError::InvalidConditionMap(format!(
                    "contrast label '{}' is not a condition",
                    label
                )));
            }
        }

        log::info!(
            "Starting ERP analysis: {} channels, {:.1} s at {} Hz",
            recording.n_channels(),
            recording.duration_secs(),
            recording.sampling_rate
        );
        let start_time = std::time::Instant::now();

        let filtered = if cfg.low_cut.is_some() || cfg.high_cut.is_some() {
            band_pass_filter(recording, cfg.low_cut, cfg.high_cut)?
        } else {
            recording.clone()
        };

        let events = detect_events(&filtered, &cfg.marker_channel, cfg.min_duration)?;
        let event_counts = code_counts(&events);

        let batch = extract_epochs(
            &filtered,
            &events,
            &cfg.conditions,
            cfg.tmin,
            cfg.tmax,
            cfg.baseline,
        )?;

        let mut evoked = Vec::new();
        for label in cfg.conditions.labels() {
            evoked.push(average(&batch, label)?);
        }

        let find = |label: &str| {
            evoked
                .iter()
                .find(|e| e.condition == label)
                .ok_or_else(|| {
                    ErpError::InvalidConditionMap(format!("no evoked response for '{}'", label))
                })
        };
        let diff = difference(find(&cfg.contrast.0)?, find(&cfg.contrast.1)?)?;

        let component = locate_peak(&diff, cfg.search_window.0, cfg.search_window.1)?;

        log::info!(
            "ERP analysis completed in {:.2} s: {} events, {} epochs ({} rejected)",
            start_time.elapsed().as_secs_f64(),
            events.len(),
            batch.len(),
            batch.n_rejected
        );

        Ok(ErpAnalysis {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            event_counts,
            n_events: events.len(),
            n_epochs: batch.len(),
            n_rejected: batch.n_rejected,
            evoked,
            difference: diff,
            component,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_oddball_run() {
        let cfg = ErpConfig::default();
        assert_eq!(cfg.low_cut, Some(0.1));
        assert_eq!(cfg.high_cut, Some(40.0));
        assert_eq!(cfg.marker_channel, "STI 014");
        assert_eq!(cfg.min_duration, 0.002);
        assert_eq!(cfg.tmin, -0.2);
        assert_eq!(cfg.tmax, 0.8);
        assert_eq!(cfg.baseline, Some((None, 0.0)));
        assert_eq!(cfg.search_window, (0.25, 0.40));
        assert_eq!(cfg.contrast.0, "oddball");
        assert_eq!(cfg.contrast.1, "standard");
    }

    #[test]
    fn test_unknown_contrast_label_rejected() {
        let mut cfg = ErpConfig::default();
        cfg.contrast.0 = "target".to_string();
        let pipeline = ErpPipeline::new(cfg);
        let recording = crate::types::ContinuousRecording::new(
            vec![
                crate::types::ChannelInfo::signal("EEG 001", "uV"),
                crate::types::ChannelInfo::marker("STI 014"),
            ],
            vec![vec![0.0; 100], vec![0.0; 100]],
            1000.0,
        )
        .unwrap();
        let result = pipeline.run(&recording);
        assert!(matches!(result, Err(ErpError::InvalidConditionMap(_))));
    }
}
