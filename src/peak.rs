//! Component locator: two-stage peak search over a difference waveform.

use crate::error::{ErpError, Result};
use crate::types::{ComponentReport, EvokedResponse};

/// Locate a component peak inside `[window_tmin, window_tmax]`.
///
/// Two independent searches, each breaking exact ties by first occurrence:
///
/// 1. The amplitude averaged across all channels is maximized over time;
///    that sample gives the reported `time` and `amplitude`.
/// 2. Each channel's own maximum over the window is computed, and the
///    channel with the largest such maximum is reported as `channel`.
///
/// The two stages aggregate along different axes on purpose: they answer
/// "when does the grand average peak" and "which single channel is most
/// responsive" separately, so the reported channel's peak time need not
/// equal the reported `time`.
///
/// # Errors
/// `EmptyWindow` if no sample of `waveform.times` falls inside the window.
pub fn locate_peak(
    waveform: &EvokedResponse,
    window_tmin: f64,
    window_tmax: f64,
) -> Result<ComponentReport> {
    if waveform.n_channels() == 0 {
        return Err(ErpError::IncompatibleWaveforms(
            "waveform has no channels".to_string(),
        ));
    }

    let window: Vec<usize> = waveform
        .times
        .iter()
        .enumerate()
        .filter(|(_, &t)| t >= window_tmin && t <= window_tmax)
        .map(|(i, _)| i)
        .collect();
    if window.is_empty() {
        return Err(ErpError::EmptyWindow {
            tmin: window_tmin,
            tmax: window_tmax,
        });
    }

    let n_channels = waveform.n_channels();

    // Stage 1: cross-channel average, argmax over time
    let mut best_sample = window[0];
    let mut best_amplitude = f64::NEG_INFINITY;
    for &idx in &window {
        let mean = waveform
            .data
            .iter()
            .map(|channel| channel[idx])
            .sum::<f64>()
            / n_channels as f64;
        if mean > best_amplitude {
            best_amplitude = mean;
            best_sample = idx;
        }
    }

    // Stage 2: per-channel max over the window, argmax across channels
    let mut best_channel = 0;
    let mut best_channel_peak = f64::NEG_INFINITY;
    for (ch_idx, channel) in waveform.data.iter().enumerate() {
        let peak = window
            .iter()
            .map(|&idx| channel[idx])
            .fold(f64::NEG_INFINITY, f64::max);
        if peak > best_channel_peak {
            best_channel_peak = peak;
            best_channel = ch_idx;
        }
    }

    let report = ComponentReport {
        amplitude: best_amplitude,
        time: waveform.times[best_sample],
        channel: waveform.channel_names[best_channel].clone(),
        search_window: (window_tmin, window_tmax),
    };

    log::info!(
        "Component in [{}, {}] s: {:.3} at {:.3} s, strongest channel '{}' ({:.3})",
        window_tmin,
        window_tmax,
        report.amplitude,
        report.time,
        report.channel,
        best_channel_peak
    );

    Ok(report)
}
