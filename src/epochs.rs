//! Epoch extractor: event-aligned windows with per-channel baseline
//! correction.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ErpError, Result};
use crate::types::{ContinuousRecording, Epoch, EventMarker};

/// Baseline period `(bmin, bmax)` in event-relative seconds; `bmin = None`
/// means "from the start of the epoch window".
pub type Baseline = (Option<f64>, f64);

/// One condition label and the event codes it covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionEntry {
    pub label: String,
    pub codes: Vec<i32>,
}

impl ConditionEntry {
    pub fn new(label: impl Into<String>, codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            label: label.into(),
            codes: codes.into_iter().collect(),
        }
    }
}

/// Ordered association of condition labels to event codes
///
/// Validated once at construction: labels must be unique and non-empty,
/// every entry must carry at least one code, and no code may belong to two
/// labels. Events whose code is unmapped are simply ignored during
/// extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionMap {
    entries: Vec<ConditionEntry>,
}

impl ConditionMap {
    pub fn new(entries: Vec<ConditionEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ErpError::InvalidConditionMap(
                "no conditions defined".to_string(),
            ));
        }
        let mut seen_labels: Vec<&str> = Vec::new();
        let mut seen_codes: Vec<i32> = Vec::new();
        for entry in &entries {
            if entry.label.is_empty() {
                return Err(ErpError::InvalidConditionMap(
                    "empty condition label".to_string(),
                ));
            }
            if seen_labels.contains(&entry.label.as_str()) {
                return Err(ErpError::InvalidConditionMap(format!(
                    "duplicate label '{}'",
                    entry.label
                )));
            }
            seen_labels.push(&entry.label);
            if entry.codes.is_empty() {
                return Err(ErpError::InvalidConditionMap(format!(
                    "label '{}' has no codes",
                    entry.label
                )));
            }
            for &code in &entry.codes {
                if seen_codes.contains(&code) {
                    return Err(ErpError::InvalidConditionMap(format!(
                        "code {} mapped more than once",
                        code
                    )));
                }
                seen_codes.push(code);
            }
        }
        Ok(Self { entries })
    }

    /// Condition label for an event code, if mapped
    pub fn label_for(&self, code: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.codes.contains(&code))
            .map(|e| e.label.as_str())
    }

    /// Labels in definition order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.entries.iter().any(|e| e.label == label)
    }
}

/// All epochs extracted from one recording in a single pass
///
/// Every epoch shares the same `times` vector and channel set, so epochs
/// are time-aligned across conditions by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochBatch {
    pub epochs: Vec<Epoch>,
    /// Event-relative time of each epoch sample, in seconds
    pub times: Vec<f64>,
    pub channel_names: Vec<String>,
    /// Events whose window fell outside the recording bounds
    pub n_rejected: usize,
}

impl EpochBatch {
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Epochs belonging to one condition, in extraction order
    pub fn for_condition(&self, label: &str) -> Vec<&Epoch> {
        self.epochs.iter().filter(|e| e.condition == label).collect()
    }

    pub fn condition_count(&self, label: &str) -> usize {
        self.epochs.iter().filter(|e| e.condition == label).count()
    }
}

/// Cut a fixed-length, optionally baseline-corrected window around every
/// mapped event.
///
/// The window `[t + tmin, t + tmax)` is converted to sample indices with
/// nearest-sample rounding. Windows that do not fit inside `[0, N)` are
/// rejected and counted, not padded and not treated as errors. Only signal
/// channels enter the epochs.
///
/// With `baseline = Some((bmin, bmax))` the per-channel mean over that
/// sub-range is subtracted from the whole epoch, zeroing the pre-event
/// reference level. `None` skips baseline correction.
///
/// # Errors
/// `EmptyWindow` when the epoch window or the baseline sub-range contains
/// no samples; `InvalidRecording` when the recording has no signal
/// channels to epoch.
pub fn extract_epochs(
    recording: &ContinuousRecording,
    events: &[EventMarker],
    conditions: &ConditionMap,
    tmin: f64,
    tmax: f64,
    baseline: Option<Baseline>,
) -> Result<EpochBatch> {
    let signal_indices = recording.signal_indices();
    if signal_indices.is_empty() {
        return Err(ErpError::InvalidRecording(
            "recording has no signal channels".to_string(),
        ));
    }

    let fs = recording.sampling_rate;
    let offset_min = (tmin * fs).round() as i64;
    let offset_max = (tmax * fs).round() as i64;
    if offset_max <= offset_min {
        return Err(ErpError::EmptyWindow { tmin, tmax });
    }
    let window_len = (offset_max - offset_min) as usize;
    let times: Vec<f64> = (offset_min..offset_max).map(|k| k as f64 / fs).collect();

    // Baseline sub-range as indices into the epoch window, end-exclusive
    let baseline_range = match baseline {
        Some((bmin, bmax)) => {
            let lo = match bmin {
                None => 0,
                Some(b) => ((b * fs).round() as i64 - offset_min).max(0) as usize,
            };
            let hi = (((bmax * fs).round() as i64 - offset_min) + 1)
                .clamp(0, window_len as i64) as usize;
            if lo >= hi {
                return Err(ErpError::EmptyWindow {
                    tmin: bmin.unwrap_or(tmin),
                    tmax: bmax,
                });
            }
            Some((lo, hi))
        }
        None => None,
    };

    let channel_names = recording.signal_names();
    let n_samples = recording.n_samples() as i64;

    // Partition mapped events into in-bounds windows and boundary rejections
    let mut accepted: Vec<(String, usize)> = Vec::new();
    let mut n_rejected = 0usize;
    for event in events {
        let Some(label) = conditions.label_for(event.code) else {
            continue;
        };
        let start = event.sample_index as i64 + offset_min;
        let end = event.sample_index as i64 + offset_max;
        if start < 0 || end > n_samples {
            n_rejected += 1;
            continue;
        }
        accepted.push((label.to_string(), start as usize));
    }

    let epochs: Vec<Epoch> = accepted
        .into_par_iter()
        .map(|(condition, start)| {
            let data: Vec<Vec<f64>> = signal_indices
                .iter()
                .map(|&ch_idx| {
                    let mut window =
                        recording.data[ch_idx][start..start + window_len].to_vec();
                    if let Some((lo, hi)) = baseline_range {
                        let mean =
                            window[lo..hi].iter().sum::<f64>() / (hi - lo) as f64;
                        for sample in &mut window {
                            *sample -= mean;
                        }
                    }
                    window
                })
                .collect();
            Epoch {
                condition,
                data,
                baseline_applied: baseline_range.is_some(),
            }
        })
        .collect();

    log::info!(
        "Extracted {} epochs of {} samples ({} rejected at recording bounds)",
        epochs.len(),
        window_len,
        n_rejected
    );

    Ok(EpochBatch {
        epochs,
        times,
        channel_names,
        n_rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelInfo;

    fn oddball_map() -> ConditionMap {
        ConditionMap::new(vec![
            ConditionEntry::new("standard", [1]),
            ConditionEntry::new("oddball", [2]),
        ])
        .unwrap()
    }

    /// 1 kHz, 10 s, two signal channels with a constant offset plus a ramp
    fn test_recording() -> ContinuousRecording {
        let n = 10_000;
        let ch1: Vec<f64> = (0..n).map(|i| 2.0 + i as f64 * 1e-4).collect();
        let ch2: Vec<f64> = (0..n).map(|i| -1.0 + (i as f64 * 0.01).sin()).collect();
        ContinuousRecording::new(
            vec![
                ChannelInfo::signal("EEG 001", "uV"),
                ChannelInfo::signal("EEG 002", "uV"),
                ChannelInfo::marker("STI 014"),
            ],
            vec![ch1, ch2, vec![0.0; n]],
            1000.0,
        )
        .unwrap()
    }

    fn test_events() -> Vec<EventMarker> {
        vec![
            EventMarker { sample_index: 1000, code: 1 },
            EventMarker { sample_index: 5000, code: 2 },
        ]
    }

    #[test]
    fn test_map_rejects_duplicate_code() {
        let result = ConditionMap::new(vec![
            ConditionEntry::new("a", [1, 2]),
            ConditionEntry::new("b", [2]),
        ]);
        assert!(matches!(result, Err(ErpError::InvalidConditionMap(_))));
    }

    #[test]
    fn test_map_rejects_duplicate_label() {
        let result = ConditionMap::new(vec![
            ConditionEntry::new("a", [1]),
            ConditionEntry::new("a", [2]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_map_rejects_empty() {
        assert!(ConditionMap::new(vec![]).is_err());
        assert!(ConditionMap::new(vec![ConditionEntry::new("a", [])]).is_err());
    }

    #[test]
    fn test_map_lookup_order() {
        let map = oddball_map();
        assert_eq!(map.label_for(1), Some("standard"));
        assert_eq!(map.label_for(2), Some("oddball"));
        assert_eq!(map.label_for(9), None);
        let labels: Vec<&str> = map.labels().collect();
        assert_eq!(labels, vec!["standard", "oddball"]);
    }

    #[test]
    fn test_marker_only_recording_rejected() {
        let rec = ContinuousRecording::new(
            vec![ChannelInfo::marker("STI 014")],
            vec![vec![0.0; 10_000]],
            1000.0,
        )
        .unwrap();
        let result = extract_epochs(&rec, &test_events(), &oddball_map(), -0.2, 0.8, None);
        assert!(matches!(result, Err(ErpError::InvalidRecording(_))));
    }

    #[test]
    fn test_window_length_and_times() {
        let batch = extract_epochs(
            &test_recording(),
            &test_events(),
            &oddball_map(),
            -0.2,
            0.8,
            Some((None, 0.0)),
        )
        .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.times.len(), 1000);
        assert!((batch.times[0] - (-0.2)).abs() < 1e-12);
        assert!((batch.times[999] - 0.799).abs() < 1e-12);
        for epoch in &batch.epochs {
            assert_eq!(epoch.data.len(), 2);
            assert_eq!(epoch.data[0].len(), 1000);
        }
    }

    #[test]
    fn test_baseline_mean_is_zero() {
        let batch = extract_epochs(
            &test_recording(),
            &test_events(),
            &oddball_map(),
            -0.2,
            0.8,
            Some((None, 0.0)),
        )
        .unwrap();
        // Baseline sub-range covers times -0.2 ..= 0.0 -> indices 0..201
        for epoch in &batch.epochs {
            assert!(epoch.baseline_applied);
            for channel in &epoch.data {
                let mean = channel[0..201].iter().sum::<f64>() / 201.0;
                assert!(mean.abs() < 1e-9, "baseline mean {}", mean);
            }
        }
    }

    #[test]
    fn test_no_baseline_keeps_raw_values() {
        let rec = test_recording();
        let batch =
            extract_epochs(&rec, &test_events(), &oddball_map(), -0.2, 0.8, None).unwrap();
        let epoch = &batch.epochs[0];
        assert!(!epoch.baseline_applied);
        // Window starts at sample 1000 - 200 = 800
        assert_eq!(epoch.data[0][0], rec.data[0][800]);
    }

    #[test]
    fn test_unmapped_codes_ignored() {
        let mut events = test_events();
        events.push(EventMarker { sample_index: 7000, code: 7 });
        let batch = extract_epochs(
            &test_recording(),
            &events,
            &oddball_map(),
            -0.2,
            0.8,
            Some((None, 0.0)),
        )
        .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.n_rejected, 0);
    }

    #[test]
    fn test_boundary_events_rejected_not_fatal() {
        let mut events = test_events();
        // Window [50 - 200, 50 + 800) starts before the recording
        events.insert(0, EventMarker { sample_index: 50, code: 1 });
        // Window [9900 - 200, 9900 + 800) runs past the end
        events.push(EventMarker { sample_index: 9900, code: 2 });
        let batch = extract_epochs(
            &test_recording(),
            &events,
            &oddball_map(),
            -0.2,
            0.8,
            Some((None, 0.0)),
        )
        .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.n_rejected, 2);
        assert_eq!(batch.condition_count("standard"), 1);
        assert_eq!(batch.condition_count("oddball"), 1);
    }

    #[test]
    fn test_zero_length_window_is_error() {
        let result = extract_epochs(
            &test_recording(),
            &test_events(),
            &oddball_map(),
            0.5,
            0.5,
            None,
        );
        assert!(matches!(result, Err(ErpError::EmptyWindow { .. })));
    }

    #[test]
    fn test_marker_channel_not_epoched() {
        let batch = extract_epochs(
            &test_recording(),
            &test_events(),
            &oddball_map(),
            -0.2,
            0.8,
            None,
        )
        .unwrap();
        assert_eq!(batch.channel_names, vec!["EEG 001", "EEG 002"]);
    }
}
