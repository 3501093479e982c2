//! Evoked averager and contrast engine.

use crate::epochs::EpochBatch;
use crate::error::{ErpError, Result};
use crate::types::EvokedResponse;

/// Reduce the epochs of one condition to their trial-averaged waveform.
///
/// The mean is taken elementwise across the epoch dimension with a fixed
/// accumulation order, so results are deterministic. `n_trials` equals the
/// number of contributing epochs exactly.
///
/// # Errors
/// `EmptyEpochSet` if the batch holds no epochs for `condition`.
pub fn average(batch: &EpochBatch, condition: &str) -> Result<EvokedResponse> {
    let epochs = batch.for_condition(condition);
    if epochs.is_empty() {
        return Err(ErpError::EmptyEpochSet(condition.to_string()));
    }

    let n_trials = epochs.len();
    let n_channels = batch.channel_names.len();
    let n_samples = batch.times.len();

    let mut data = vec![vec![0.0f64; n_samples]; n_channels];
    for epoch in &epochs {
        for (accum, channel) in data.iter_mut().zip(&epoch.data) {
            for (sum, &sample) in accum.iter_mut().zip(channel) {
                *sum += sample;
            }
        }
    }
    let scale = 1.0 / n_trials as f64;
    for channel in &mut data {
        for sample in channel.iter_mut() {
            *sample *= scale;
        }
    }

    log::debug!(
        "Averaged {} epochs for condition '{}'",
        n_trials,
        condition
    );

    Ok(EvokedResponse {
        condition: condition.to_string(),
        channel_names: batch.channel_names.clone(),
        data,
        times: batch.times.clone(),
        n_trials,
    })
}

/// Weighted linear combination of two evoked responses:
/// `weight_a * a + weight_b * b`, elementwise.
///
/// Both inputs must share the same `times` vector and the same channel
/// name sequence. The result's `n_trials` is 0; a derived waveform has no
/// meaningful trial count.
///
/// # Errors
/// `IncompatibleWaveforms` on any mismatch in times or channels.
pub fn combine(
    a: &EvokedResponse,
    b: &EvokedResponse,
    weight_a: f64,
    weight_b: f64,
) -> Result<EvokedResponse> {
    if a.times != b.times {
        return Err(ErpError::IncompatibleWaveforms(format!(
            "time axes differ ({} vs {} samples)",
            a.times.len(),
            b.times.len()
        )));
    }
    if a.channel_names != b.channel_names {
        return Err(ErpError::IncompatibleWaveforms(format!(
            "channel sets differ ({:?} vs {:?})",
            a.channel_names, b.channel_names
        )));
    }

    let data: Vec<Vec<f64>> = a
        .data
        .iter()
        .zip(&b.data)
        .map(|(row_a, row_b)| {
            row_a
                .iter()
                .zip(row_b)
                .map(|(&va, &vb)| weight_a * va + weight_b * vb)
                .collect()
        })
        .collect();

    Ok(EvokedResponse {
        condition: format!("{} vs {}", a.condition, b.condition),
        channel_names: a.channel_names.clone(),
        data,
        times: a.times.clone(),
        n_trials: 0,
    })
}

/// Difference waveform `a - b` (e.g. oddball minus standard)
pub fn difference(a: &EvokedResponse, b: &EvokedResponse) -> Result<EvokedResponse> {
    let mut diff = combine(a, b, 1.0, -1.0)?;
    diff.condition = format!("{} - {}", a.condition, b.condition);
    Ok(diff)
}
