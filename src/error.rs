use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErpError {
    #[error("invalid filter range: low_cut {low_cut:?}, high_cut {high_cut:?} (Nyquist {nyquist} Hz)")]
    InvalidFilterRange {
        low_cut: Option<f64>,
        high_cut: Option<f64>,
        nyquist: f64,
    },

    #[error("marker channel not found: {0}")]
    MarkerChannelNotFound(String),

    #[error("no epochs to average for condition: {0}")]
    EmptyEpochSet(String),

    #[error("incompatible waveforms: {0}")]
    IncompatibleWaveforms(String),

    #[error("no samples inside window [{tmin}, {tmax}] s")]
    EmptyWindow { tmin: f64, tmax: f64 },

    #[error("malformed recording: {0}")]
    InvalidRecording(String),

    #[error("invalid condition map: {0}")]
    InvalidConditionMap(String),
}

pub type Result<T> = std::result::Result<T, ErpError>;
