use std::{error::Error, path::PathBuf};

use clap::Parser;
use colorcal::{run_from_config, BayerPattern, CalibrationConfig};

/// Calibrate a camera's color pipeline from a raw photo of a color chart.
#[derive(Debug, Parser)]
#[command(author, version, about = "Color chart calibration")]
struct Args {
    /// JSON CalibrationConfig. Flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raw chart capture (single-channel 8- or 16-bit image).
    #[arg(long)]
    image: Option<PathBuf>,

    /// Starting ISP configuration (JSON).
    #[arg(long)]
    isp_config: Option<PathBuf>,

    /// Directory for the text, JSON and debug outputs.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    grid_width: Option<usize>,

    #[arg(long)]
    grid_height: Option<usize>,

    /// Normalized black level `r,g,b`; skips estimation.
    #[arg(long, value_delimiter = ',')]
    black_level: Option<Vec<f32>>,

    /// Per-channel gamma `r,g,b`.
    #[arg(long, value_delimiter = ',')]
    gamma: Option<Vec<f32>>,

    #[arg(long, value_enum)]
    bayer_pattern: Option<Pattern>,

    /// Save numbered intermediate images into the output directory.
    #[arg(long)]
    save_debug: bool,

    /// off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Structured JSON logs (requires the `tracing` feature).
    #[arg(long)]
    json_logs: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Pattern {
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl From<Pattern> for BayerPattern {
    fn from(p: Pattern) -> Self {
        match p {
            Pattern::Rggb => BayerPattern::Rggb,
            Pattern::Bggr => BayerPattern::Bggr,
            Pattern::Grbg => BayerPattern::Grbg,
            Pattern::Gbrg => BayerPattern::Gbrg,
        }
    }
}

fn triple(values: Vec<f32>, flag: &str) -> Result<[f32; 3], Box<dyn Error>> {
    <[f32; 3]>::try_from(values)
        .map_err(|v| format!("--{flag} expects 3 values, got {}", v.len()).into())
}

fn build_config(args: Args) -> Result<CalibrationConfig, Box<dyn Error>> {
    let mut config = match (&args.config, &args.image) {
        (Some(path), _) => CalibrationConfig::load_json(path)?,
        (None, Some(image)) => CalibrationConfig::new(image),
        (None, None) => return Err("either --config or --image is required".into()),
    };
    if let Some(image) = args.image {
        config.image_path = image;
    }
    if let Some(path) = args.isp_config {
        config.isp_config_path = Some(path);
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(w) = args.grid_width {
        config.grid_width = w;
    }
    if let Some(h) = args.grid_height {
        config.grid_height = h;
    }
    if let Some(values) = args.black_level {
        config.black_level = Some(triple(values, "black-level")?);
    }
    if let Some(values) = args.gamma {
        config.gamma = triple(values, "gamma")?;
    }
    if let Some(pattern) = args.bayer_pattern {
        config.bayer_pattern = Some(pattern.into());
    }
    config.save_debug |= args.save_debug;
    Ok(config)
}

fn init_logging(level: &str, json: bool) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "tracing")]
    {
        let _ = level;
        colorcal::core::init_tracing(json);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        if json {
            eprintln!("warning: --json-logs needs the `tracing` feature; using plain logs");
        }
        let filter = colorcal::core::parse_level(level)
            .ok_or_else(|| format!("unknown log level '{level}'"))?;
        colorcal::core::init_with_level(filter)?;
        Ok(())
    }
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args.log_level, args.json_logs)?;
    let config = build_config(args)?;
    let outcome = run_from_config(&config)?;
    println!("{}", serde_json::to_string_pretty(&outcome.parameters)?);
    Ok(())
}
