//! pristine: normalize one supplier product photo from the command line.
//!
//! Loads an image from a URL or a local file, runs it through the
//! normalizer (remote tier when an API key is set, then the local
//! pipeline), and writes the result.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pristine -- [OPTIONS] <SOURCE>
//! ```
//!
//! Exits with status 2 when processing failed and the original source
//! would be shown instead.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use pristine_io::{DisplayHint, ImageSource, LogObserver, Normalizer, NormalizerConfig, Rendition};
use pristine_pipeline::{StageObserver, TimingRecorder, Treatment};

/// Exit status when the original source is returned unprocessed.
const EXIT_FALLBACK: u8 = 2;

/// Normalize a supplier product photo into a uniform square image.
#[derive(Parser)]
#[command(name = "pristine", version)]
struct Cli {
    /// Image URL (http/https) or path to a local file.
    source: String,

    /// Write the result here. Without it the result is printed as a
    /// data URI.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Treatment to apply.
    #[arg(long, value_enum, default_value_t = Mode::Studio)]
    treatment: Mode,

    /// Treat the image as decorative (it is passed through untouched).
    #[arg(long)]
    decorative: bool,

    /// Side length of the studio surface in pixels.
    #[arg(long)]
    size: Option<u32>,

    /// Watermark text. Pass an empty string to disable the watermark.
    #[arg(long)]
    watermark: Option<String>,

    /// JPEG quality for studio output (1-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// remove.bg API key. Enables the remote tier for cutouts.
    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    remove_bg_key: Option<String>,

    /// Normalizer config file (JSON).
    #[arg(long, conflicts_with = "config_json")]
    config: Option<PathBuf>,

    /// Full normalizer config as a JSON string.
    ///
    /// Individual flags above still override the fields they name.
    #[arg(long)]
    config_json: Option<String>,

    /// Print per-stage timings of the local pipeline.
    #[arg(long)]
    timings: bool,
}

/// Treatment selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Product on the branded square surface (JPEG).
    Studio,
    /// Product with a transparent background (PNG).
    Cutout,
}

impl From<Mode> for Treatment {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Studio => Self::Studio,
            Mode::Cutout => Self::Cutout,
        }
    }
}

/// Build a [`NormalizerConfig`] from the config file or JSON, then apply
/// the individual flags on top.
fn config_from_cli(cli: &Cli) -> Result<NormalizerConfig, String> {
    let mut config = if let Some(ref path) = cli.config {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        NormalizerConfig::from_json(&json)
            .map_err(|e| format!("Error parsing {}: {e}", path.display()))?
    } else if let Some(ref json) = cli.config_json {
        NormalizerConfig::from_json(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        NormalizerConfig::default()
    };

    if let Some(size) = cli.size {
        config.pipeline.output_size = size;
    }
    if let Some(quality) = cli.quality {
        config.pipeline.jpeg_quality = quality;
    }
    if let Some(ref text) = cli.watermark {
        config.pipeline.watermark = (!text.trim().is_empty()).then(|| text.clone());
    }
    if cli.remove_bg_key.is_some() {
        config.remote.api_key.clone_from(&cli.remove_bg_key);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let recorder = Arc::new(TimingRecorder::new());
    let observer: Arc<dyn StageObserver> = if cli.timings {
        recorder.clone()
    } else {
        Arc::new(LogObserver)
    };

    let normalizer = match Normalizer::from_config(config) {
        Ok(n) => n.with_observer(observer),
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let source = ImageSource::parse(&cli.source);
    let hint = if cli.decorative {
        DisplayHint::Decorative
    } else {
        DisplayHint::Product
    };

    let rendition = normalizer
        .render(&source, hint, cli.treatment.into())
        .await;

    if cli.timings {
        eprintln!("{}", recorder.report());
    }

    let processed = match rendition {
        Rendition::Processed(processed) => processed,
        Rendition::Original(original) => {
            eprintln!("Not processed, showing original: {original}");
            return ExitCode::from(EXIT_FALLBACK);
        }
    };

    eprintln!(
        "{} via {:?}: {}x{} {} ({} bytes)",
        processed.treatment,
        processed.tier,
        processed.dimensions().width,
        processed.dimensions().height,
        processed.format().media_type(),
        processed.bytes().len(),
    );

    match cli.output {
        Some(ref path) => {
            if let Err(e) = tokio::fs::write(path, processed.bytes()).await {
                eprintln!("Error writing {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            eprintln!("Written to {}", path.display());
        }
        None => println!("{}", processed.to_data_uri()),
    }

    ExitCode::SUCCESS
}
