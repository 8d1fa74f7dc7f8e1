use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_barcode::{
    CancelToken, RegionOfInterest, ReplayBackend, ScanConfig, ScanReport, Symbology, SymbologySet,
    scan_device, scan_image_bytes, validate,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "barscan", version, about = "EAN-13, CODE128 and QR scanner")]
struct Cli {
    /// TOML scan configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one still image
    Image {
        path: PathBuf,
        /// Restrict to these symbologies (repeatable)
        #[arg(long = "symbology", short = 's')]
        symbologies: Vec<Symbology>,
    },
    /// Play a directory of frames through the live scan loop
    Replay {
        dir: PathBuf,
        #[arg(long)]
        timeout: Option<f64>,
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Only decode the central region of each frame
        #[arg(long)]
        roi_center: bool,
    },
    /// Check a value against a symbology's rules
    Validate { symbology: Symbology, value: String },
}

/// The file replaces the mode preset entirely when given
fn load_config(path: Option<&Path>, preset: ScanConfig) -> Result<ScanConfig, ExitCode> {
    let Some(path) = path else {
        return Ok(preset);
    };
    ScanConfig::load(path).map_err(|e| {
        eprintln!("Failed to load config from {}: {e}", path.display());
        ExitCode::FAILURE
    })
}

fn init_logging(config: &ScanConfig) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();
}

fn report(outcome: &ScanReport) -> ExitCode {
    println!("{outcome}");
    if outcome.is_found() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Image { path, symbologies } => {
            let mut config = match load_config(cli.config.as_deref(), ScanConfig::still()) {
                Ok(config) => config,
                Err(code) => return code,
            };
            if !symbologies.is_empty() {
                config.symbologies = symbologies.into_iter().collect::<SymbologySet>();
            }
            init_logging(&config);

            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    eprintln!("Failed to read {}: {e}", path.display());
                    return ExitCode::FAILURE;
                }
            };
            let outcome = scan_image_bytes(&bytes, &config);
            info!(path = %path.display(), attempts = outcome.attempts, stage = ?outcome.stage, "image scanned");
            report(&outcome)
        }
        Command::Replay {
            dir,
            timeout,
            max_attempts,
            roi_center,
        } => {
            let mut config = match load_config(cli.config.as_deref(), ScanConfig::live()) {
                Ok(config) => config,
                Err(code) => return code,
            };
            if let Some(timeout) = timeout {
                config.timeout_secs = timeout;
            }
            if max_attempts.is_some() {
                config.max_attempts = max_attempts;
            }
            if roi_center {
                config.region_of_interest = Some(RegionOfInterest::CENTER);
            }
            init_logging(&config);

            let backend = match ReplayBackend::from_dir(&dir) {
                Ok(backend) => backend,
                Err(e) => {
                    eprintln!("Failed to load frames: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let outcome = scan_device(0, backend, &config, CancelToken::new());
            if let Some(bbox) = outcome.bounding_box {
                info!(x = bbox.x, y = bbox.y, width = bbox.width, height = bbox.height, "barcode location");
            }
            report(&outcome)
        }
        Command::Validate { symbology, value } => match validate(symbology, value.as_bytes()) {
            Ok(value) => {
                println!("valid {symbology} {value}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("invalid {symbology}: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
