use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{error, info};

use zygo_labwork_rs::interferometry::{
    Aberration, AnalysisConfig, AnalysisReport, FrameSource, InterferogramPipeline, MapWriter, PsfConfig,
    TiffCompression,
};
use zygo_labwork_rs::logger;

#[derive(Parser)]
#[command(name = "zygo-analyze")]
#[command(about = "Surface, statistics and PSF/MTF from five phase-shifted interferograms")]
struct Args {
    /// The five interferograms, in phase-step order
    #[arg(num_args = 5, required = true)]
    frames: Vec<PathBuf>,

    /// Aperture mask image (non-zero inside)
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Directory receiving the exported maps
    #[arg(long, short, default_value = "analysis")]
    output_dir: PathBuf,

    /// Gaussian pre-filter sigma in pixels, 0 disables it
    #[arg(long, default_value_t = 10.0)]
    sigma: f64,

    /// Wedge factor applied to the unwrapped surface
    #[arg(long, default_value_t = 1.0)]
    wedge: f64,

    /// The pupil is resampled to grid-size / 2^zoom samples
    #[arg(long, default_value_t = PsfConfig::default().zoom, allow_hyphen_values = true)]
    zoom: i32,

    /// FFT grid size for the PSF
    #[arg(long, default_value_t = PsfConfig::default().grid_size)]
    grid_size: usize,

    /// Lower clip of the PSF in dB
    #[arg(long, default_value_t = PsfConfig::default().floor_db, allow_hyphen_values = true)]
    floor_db: f64,

    /// Aberrations to remove before the PSF, comma separated (e.g. tilt,defocus)
    #[arg(long, value_delimiter = ',', value_parser = parse_aberration)]
    remove: Vec<Aberration>,

    /// Print the Zernike and Seidel coefficients
    #[arg(long)]
    zernike: bool,

    /// Frames are camera RAW files instead of TIFF
    #[arg(long)]
    raw: bool,

    /// Deflate-compress the exported maps
    #[arg(long)]
    compress: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_aberration(value: &str) -> Result<Aberration, String> {
    value.parse().map_err(|e: zygo_labwork_rs::interferometry::AnalysisError| e.to_string())
}

impl Args {
    fn config(&self) -> AnalysisConfig {
        AnalysisConfig::builder()
            .gaussian_sigma((self.sigma > 0.0).then_some(self.sigma))
            .wedge_factor(self.wedge)
            .psf(PsfConfig {
                zoom: self.zoom,
                grid_size: self.grid_size,
                floor_db: self.floor_db,
            })
            .fit_zernike(self.zernike)
            .remove_aberrations(self.remove.clone())
            .compression(if self.compress {
                TiffCompression::DeflateBalanced
            } else {
                TiffCompression::None
            })
            .build()
    }
}

fn run<S: FrameSource, W: MapWriter>(pipeline: &InterferogramPipeline<S, W>, args: &Args) -> Result<AnalysisReport> {
    let report = pipeline
        .analyze_files(args.frames.as_slice(), args.mask.as_ref())
        .context("analysis failed")?;
    pipeline
        .export(&report, &args.output_dir)
        .with_context(|| format!("cannot export maps to {}", args.output_dir.display()))?;
    Ok(report)
}

fn summarize(report: &AnalysisReport) {
    let stats = report.statistics;
    info!(
        pv = format_args!("{:.4}", stats.peak_to_valley),
        rms = format_args!("{:.4}", stats.rms),
        samples = stats.valid_samples,
        "Surface (waves)"
    );
    if let Some(corrected) = &report.corrected {
        let removed: Vec<String> = corrected.removed.iter().map(ToString::to_string).collect();
        info!(
            pv = format_args!("{:.4}", corrected.statistics.peak_to_valley),
            rms = format_args!("{:.4}", corrected.statistics.rms),
            removed = %removed.join(","),
            "Corrected surface (waves)"
        );
    }
    if let Some(fit) = &report.zernike {
        for (index, coefficient) in fit.coefficients().iter().enumerate() {
            info!(index, "Z{index} = {coefficient:+.4}");
        }
        let seidel = fit.seidel();
        info!(
            tilt = format_args!("{:.4} @ {:.1}°", seidel.tilt_magnitude, seidel.tilt_angle),
            defocus = format_args!("{:.4}", seidel.defocus),
            astigmatism = format_args!("{:.4} @ {:.1}°", seidel.astigmatism_magnitude, seidel.astigmatism_angle),
            coma = format_args!("{:.4} @ {:.1}°", seidel.coma_magnitude, seidel.coma_angle),
            spherical = format_args!("{:.4}", seidel.spherical),
            "Seidel"
        );
    }
    report.timings.log_summary();
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose);

    info!("Starting zygo-analyze...");
    let config = args.config();
    info!("Pre-filter: {:?}", config.gaussian_sigma);
    info!("PSF: {:?}", config.psf);

    let result = if args.raw {
        run(&InterferogramPipeline::for_raw(config), &args)
    } else {
        run(&InterferogramPipeline::new(config), &args)
    };

    match result {
        Ok(report) => {
            summarize(&report);
            info!(output = %args.output_dir.display(), "Analysis successful!");
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            Err(e)
        }
    }
}
