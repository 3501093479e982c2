pub mod types;
pub mod error;
pub mod filter;
pub mod events;
pub mod epochs;
pub mod evoked;
pub mod peak;
pub mod pipeline;

pub use types::*;
pub use error::{ErpError, Result};
pub use filter::band_pass_filter;
pub use events::{code_counts, detect_events};
pub use epochs::{extract_epochs, ConditionEntry, ConditionMap, EpochBatch};
pub use evoked::{average, combine, difference};
pub use peak::locate_peak;
pub use pipeline::{ErpAnalysis, ErpConfig, ErpPipeline};
