//! Event detector: de-bounced scan of a digital marker channel.

use std::collections::BTreeMap;

use crate::error::{ErpError, Result};
use crate::types::{ContinuousRecording, EventMarker};

/// Scan a marker channel and emit one `EventMarker` per sustained rising
/// transition.
///
/// A transition to a new non-zero integer level emits an event at the
/// transition's sample index, with `code` equal to the sustained level,
/// provided the level holds for at least `min_duration` seconds (the gate
/// is `>=`). Shorter excursions are treated as line glitches: they emit
/// nothing and are invisible to the collapse and re-trigger rules below.
/// Consecutive identical levels collapse into a single event; a step to a
/// *higher* non-zero level triggers again, a step down does not until the
/// line has dropped.
///
/// Emitted events are strictly increasing in `sample_index`.
///
/// # Errors
/// `MarkerChannelNotFound` if no channel has the given name.
pub fn detect_events(
    recording: &ContinuousRecording,
    marker_channel: &str,
    min_duration: f64,
) -> Result<Vec<EventMarker>> {
    let ch_idx = recording
        .channel_index(marker_channel)
        .ok_or_else(|| ErpError::MarkerChannelNotFound(marker_channel.to_string()))?;

    // Samples the level must hold; the epsilon guards against the binary
    // representation of min_duration * fs landing just above an integer.
    let min_samples = ((min_duration * recording.sampling_rate) - 1e-9)
        .ceil()
        .max(1.0) as usize;

    let row = &recording.data[ch_idx];
    let mut events = Vec::new();
    let mut prev_level: i64 = 0;
    let mut i = 0;
    while i < row.len() {
        let level = row[i].round() as i64;
        let start = i;
        while i < row.len() && row[i].round() as i64 == level {
            i += 1;
        }
        let run_len = i - start;
        // Runs below the gate are glitches: they emit nothing and leave
        // the detector's level memory untouched, as if they never happened.
        if run_len < min_samples {
            continue;
        }
        if level != 0 && level > prev_level {
            events.push(EventMarker {
                sample_index: start,
                code: level as i32,
            });
        }
        prev_level = level;
    }

    log::info!(
        "Detected {} events on '{}' (min_duration {} s -> {} samples)",
        events.len(),
        marker_channel,
        min_duration,
        min_samples
    );
    for (code, count) in code_counts(&events) {
        log::debug!("  code {}: {} events", code, count);
    }

    Ok(events)
}

/// Number of events per code, ordered by code
pub fn code_counts(events: &[EventMarker]) -> Vec<(i32, usize)> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for event in events {
        *counts.entry(event.code).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}
