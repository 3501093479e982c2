//! Signal conditioner: zero-phase Butterworth filtering of signal channels.

use rayon::prelude::*;
use sci_rs::signal::filter::{design::*, sosfiltfilt_dyn};

use crate::error::{ErpError, Result};
use crate::types::{ChannelRole, ContinuousRecording};

/// Butterworth order per design; the forward-backward pass doubles the
/// effective order.
const FILTER_ORDER: usize = 2;

fn design_butter_lp(order: usize, highcut: f64, fs: f64) -> Vec<Sos<f64>> {
    let filter = butter_dyn(
        order,
        [highcut].to_vec(),
        Some(FilterBandType::Lowpass),
        Some(false),
        Some(FilterOutputType::Sos),
        Some(fs),
    );
    let DigitalFilter::Sos(SosFormatFilter { sos }) = filter else {
        panic!("Failed to design low-pass filter");
    };
    sos
}

fn design_butter_hp(order: usize, lowcut: f64, fs: f64) -> Vec<Sos<f64>> {
    let filter = butter_dyn(
        order,
        [lowcut].to_vec(),
        Some(FilterBandType::Highpass),
        Some(false),
        Some(FilterOutputType::Sos),
        Some(fs),
    );
    let DigitalFilter::Sos(SosFormatFilter { sos }) = filter else {
        panic!("Failed to design high-pass filter");
    };
    sos
}

/// Apply a zero-phase band-pass to every signal channel of a recording.
///
/// `low_cut`/`high_cut` are the band edges in Hz; omit `low_cut` for a
/// low-pass-only filter and `high_cut` for high-pass-only. The band-pass is
/// realized as a high-pass/low-pass cascade, each a Butterworth SOS run
/// forward-backward (no phase distortion, channel length unchanged).
/// Marker channels pass through untouched. Returns a new recording; the
/// input is not modified.
///
/// # Errors
/// `InvalidFilterRange` when both cutoffs are omitted, when
/// `low_cut >= high_cut`, or when either cutoff is outside
/// `(0, sampling_rate / 2)`.
pub fn band_pass_filter(
    recording: &ContinuousRecording,
    low_cut: Option<f64>,
    high_cut: Option<f64>,
) -> Result<ContinuousRecording> {
    let nyquist = recording.nyquist();
    let invalid = || ErpError::InvalidFilterRange {
        low_cut,
        high_cut,
        nyquist,
    };

    if low_cut.is_none() && high_cut.is_none() {
        return Err(invalid());
    }
    for cutoff in [low_cut, high_cut].into_iter().flatten() {
        if cutoff <= 0.0 || cutoff >= nyquist {
            return Err(invalid());
        }
    }
    if let (Some(low), Some(high)) = (low_cut, high_cut) {
        if low >= high {
            return Err(invalid());
        }
    }

    // High-pass first, then low-pass; omitting a cutoff drops that stage.
    let mut cascades: Vec<Vec<Sos<f64>>> = Vec::new();
    if let Some(low) = low_cut {
        cascades.push(design_butter_hp(FILTER_ORDER, low, recording.sampling_rate));
    }
    if let Some(high) = high_cut {
        cascades.push(design_butter_lp(FILTER_ORDER, high, recording.sampling_rate));
    }

    log::info!(
        "Filtering {} channels ({} signal): low_cut {:?} Hz, high_cut {:?} Hz, fs {} Hz",
        recording.n_channels(),
        recording.signal_indices().len(),
        low_cut,
        high_cut,
        recording.sampling_rate
    );

    let data: Vec<Vec<f64>> = (0..recording.n_channels())
        .into_par_iter()
        .map(|ch_idx| {
            let row = &recording.data[ch_idx];
            if recording.channels[ch_idx].role == ChannelRole::Marker {
                return row.clone();
            }
            let mut samples = row.clone();
            for sos in &cascades {
                samples = sosfiltfilt_dyn(samples.iter().copied(), sos);
            }
            samples
        })
        .collect();

    Ok(ContinuousRecording {
        channels: recording.channels.clone(),
        data,
        sampling_rate: recording.sampling_rate,
    })
}
