use clap::Parser;
use std::io::Write;
use std::path::Path;

use erp_rs::{ChannelInfo, ContinuousRecording, ErpConfig, ErpPipeline};

const SUCCESS: i32 = 0;
const INPUT_ERROR: i32 = 1;
const ANALYSIS_ERROR: i32 = 2;

#[derive(Parser)]
#[command(
    name = "erp",
    version,
    about = "Event-related potential extraction engine",
    long_about = "Generates a synthetic auditory-oddball recording and runs the full\n\
                  ERP pipeline over it: band-pass filter, event detection, epoching\n\
                  with baseline correction, trial averaging, oddball-minus-standard\n\
                  contrast and P300 peak search. Prints the analysis as JSON."
)]
struct Cli {
    /// Sampling rate in Hz
    #[arg(long, default_value_t = 1000.0)]
    rate: f64,

    /// Recording duration in seconds
    #[arg(long, default_value_t = 60.0)]
    duration: f64,

    /// Number of signal channels
    #[arg(long, default_value_t = 4)]
    channels: usize,

    /// Seconds between stimuli
    #[arg(long, default_value_t = 1.0)]
    interval: f64,

    /// Every Nth stimulus is an oddball
    #[arg(long, default_value_t = 5)]
    oddball_every: usize,

    /// Write JSON to this file instead of stdout
    #[arg(long)]
    output: Option<String>,

    /// Compact (single-line) JSON
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    if cli.channels == 0 || cli.rate <= 0.0 || cli.duration <= 2.0 || cli.interval <= 0.0 {
        eprintln!("Error: need at least 1 channel, a positive rate/interval and > 2 s duration");
        return INPUT_ERROR;
    }

    let config = ErpConfig::default();
    let recording = match synthesize_oddball(cli, &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error building synthetic recording: {}", e);
            return INPUT_ERROR;
        }
    };

    eprintln!(
        "Running ERP analysis on a synthetic {}-channel, {:.0} s recording at {} Hz...",
        cli.channels, cli.duration, cli.rate
    );

    let pipeline = ErpPipeline::new(config);
    match pipeline.run(&recording) {
        Ok(analysis) => {
            eprintln!(
                "  {} events, {} epochs ({} rejected)",
                analysis.n_events, analysis.n_epochs, analysis.n_rejected
            );
            eprintln!(
                "  component: {:.3} at {:.0} ms on {}",
                analysis.component.amplitude,
                analysis.component.time * 1000.0,
                analysis.component.channel
            );
            let json = match to_json(&analysis, cli.compact) {
                Ok(j) => j,
                Err(e) => {
                    eprintln!("Error serializing result: {}", e);
                    return ANALYSIS_ERROR;
                }
            };
            if let Err(e) = write_output(&json, cli.output.as_deref()) {
                eprintln!("Error: {}", e);
                return ANALYSIS_ERROR;
            }
            if let Some(ref path) = cli.output {
                eprintln!("Results written to {}", path);
            }
            SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ANALYSIS_ERROR
        }
    }
}

/// Build a synthetic oddball recording: background oscillations per channel
/// plus an evoked bump ~300 ms after each stimulus, larger for oddballs.
fn synthesize_oddball(cli: &Cli, config: &ErpConfig) -> erp_rs::Result<ContinuousRecording> {
    let n = (cli.duration * cli.rate) as usize;
    let marker_len = ((0.05 * cli.rate) as usize).max(2);

    let mut schedule: Vec<(usize, i32)> = Vec::new();
    let mut t = 0.5;
    let mut k = 0usize;
    while t + 0.8 < cli.duration {
        let code = if cli.oddball_every > 0 && (k + 1) % cli.oddball_every == 0 {
            2
        } else {
            1
        };
        schedule.push(((t * cli.rate) as usize, code));
        t += cli.interval;
        k += 1;
    }

    let mut marker = vec![0.0; n];
    for &(onset, code) in &schedule {
        for sample in marker.iter_mut().skip(onset).take(marker_len) {
            *sample = code as f64;
        }
    }

    let mut channels = Vec::new();
    let mut data = Vec::new();
    for ch in 0..cli.channels {
        channels.push(ChannelInfo::signal(format!("EEG {:03}", ch + 1), "uV"));
        let background_freq = 9.0 + ch as f64;
        let mut row: Vec<f64> = (0..n)
            .map(|i| {
                let time = i as f64 / cli.rate;
                1.5 * (2.0 * std::f64::consts::PI * background_freq * time).sin()
            })
            .collect();
        // Parietal-like gradient: later channels respond more strongly
        let gain = 1.0 + ch as f64 / cli.channels as f64;
        for &(onset, code) in &schedule {
            let amplitude = gain * if code == 2 { 8.0 } else { 2.0 };
            add_bump(&mut row, onset, cli.rate, 0.3, 0.04, amplitude);
        }
        data.push(row);
    }

    channels.push(ChannelInfo::marker(&config.marker_channel));
    data.push(marker);

    ContinuousRecording::new(channels, data, cli.rate)
}

/// Add a Gaussian bump centered `latency` seconds after `onset`
fn add_bump(row: &mut [f64], onset: usize, rate: f64, latency: f64, width: f64, amplitude: f64) {
    let center = onset as f64 + latency * rate;
    let sigma = width * rate;
    let lo = (center - 4.0 * sigma).max(0.0) as usize;
    let hi = ((center + 4.0 * sigma) as usize).min(row.len());
    for (i, sample) in row.iter_mut().enumerate().take(hi).skip(lo) {
        let z = (i as f64 - center) / sigma;
        *sample += amplitude * (-0.5 * z * z).exp();
    }
}

/// Serialize a value to JSON (pretty or compact).
fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String, String> {
    if compact {
        serde_json::to_string(value).map_err(|e| format!("JSON serialization failed: {}", e))
    } else {
        serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {}", e))
    }
}

/// Write JSON string to stdout or a file.
fn write_output(json: &str, output_path: Option<&str>) -> Result<(), String> {
    match output_path {
        Some(path) => std::fs::write(Path::new(path), json)
            .map_err(|e| format!("Failed to write output file '{}': {}", path, e)),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(json.as_bytes())
                .and_then(|_| handle.write_all(b"\n"))
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}
