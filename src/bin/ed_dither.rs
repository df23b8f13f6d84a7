//! Error Diffusion Dithering CLI Tool
//!
//! Command-line front end for the dithering library. Loads an image, runs one
//! task and writes PNG results (plus optional metadata JSON).
//!
//! Tasks:
//! - error-diffusion: binary diffusion with one or more catalog kernels
//! - adaptive: Ostromoukhov and Zhou-Fang variable-coefficient diffusion
//! - multi-level: palette diffusion onto an evenly spaced gray ramp
//! - list-kernels: print the kernel catalog grouped by family

use clap::{Parser, ValueEnum};
use image::{GenericImageView, GrayImage, RgbImage};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use dither_diffusion::dither::{
    adaptive_diffuse, check_kernels, error_diffuse, format_kernels_by_family,
    init_adaptive_tables, palette_diffuse, AdaptiveConfig, AdaptiveMethod, DiffusionConfig,
    Palette,
};
use dither_diffusion::grayscale::{grayscale, map_threshold, prepare_rgb, ImageView, RgbBuffer};
use dither_diffusion::output::OutputType;
use dither_diffusion::GrayBuffer;

const DEFAULT_KERNELS: &str =
    "floyd_steinberg,jarvis_judice_ninke,stucki,burkes,atkinson,sierra,two_row_sierra,stevenson_arce";

// ============================================================================
// Command Line Arguments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Task {
    /// Binary error diffusion with the kernels given by --kernels
    ErrorDiffusion,
    /// Ostromoukhov and Zhou-Fang adaptive diffusion
    Adaptive,
    /// Gray palette diffusion with --levels entries
    MultiLevel,
    /// Print available kernels and aliases
    ListKernels,
}

impl Task {
    fn name(self) -> &'static str {
        match self {
            Task::ErrorDiffusion => "error_diffusion",
            Task::Adaptive => "adaptive_diffusion",
            Task::MultiLevel => "multi_level",
            Task::ListKernels => "list_kernels",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ed_dither")]
#[command(author, version, about = "Error diffusion dithering - fixed kernels, adaptive coefficients and gray palettes", long_about = None)]
struct Args {
    /// Input image path
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Task to run
    #[arg(short, long, value_enum, default_value_t = Task::ErrorDiffusion)]
    task: Task,

    /// Comma separated kernel names or aliases (error-diffusion)
    #[arg(short, long, default_value = DEFAULT_KERNELS)]
    kernels: String,

    /// Kernel for palette diffusion (multi-level)
    #[arg(long, default_value = "floyd_steinberg")]
    palette_kernel: String,

    /// Global threshold (0..255) for binarization
    #[arg(long, default_value_t = 128.0)]
    threshold: f64,

    /// Disable serpentine scanning (left-to-right only)
    #[arg(long)]
    no_serpentine: bool,

    /// Number of gray levels (multi-level, >= 2)
    #[arg(long, default_value_t = 4)]
    levels: usize,

    /// Random seed for Zhou-Fang threshold jitter
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Zhou-Fang jitter multiplier
    #[arg(long, default_value_t = 1.0)]
    noise_scale: f64,

    /// Ostromoukhov coefficient table (256 rows x 3 columns)
    #[arg(long)]
    ostro_table: Option<PathBuf>,

    /// Zhou-Fang strength table (N rows x 3 columns)
    #[arg(long)]
    zf_table: Option<PathBuf>,

    /// Directory for output PNGs
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Output metadata JSON file path (optional)
    #[arg(long)]
    output_meta: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Image Loading and Saving
// ============================================================================

fn load_image(path: &Path) -> Result<(Vec<u8>, u32, u32), String> {
    info!(path = %path.display(), "loading image");
    let img = image::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let (width, height) = img.dimensions();
    let rgb_img = img.to_rgb8();
    debug!(width, height, "decoded");
    Ok((rgb_img.into_raw(), width, height))
}

/// A produced image: name plus either gray (1 channel) or RGB (3 channel) bytes.
struct Output {
    name: String,
    data: Vec<u8>,
    channels: u8,
}

fn save_output(
    out: &Output,
    dir: &Path,
    stem: &str,
    task: Task,
    width: u32,
    height: u32,
) -> Result<PathBuf, String> {
    let path = dir.join(format!("{}_{}_{}.png", stem, task.name(), out.name));
    let result = if out.channels == 1 {
        GrayImage::from_raw(width, height, out.data.clone())
            .ok_or_else(|| "Failed to create grayscale image buffer".to_string())?
            .save(&path)
    } else {
        RgbImage::from_raw(width, height, out.data.clone())
            .ok_or_else(|| "Failed to create RGB image buffer".to_string())?
            .save(&path)
    };
    result.map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    info!(path = %path.display(), "saved");
    Ok(path)
}

fn write_metadata(
    path: &Path,
    args: &Args,
    input: &Path,
    width: u32,
    height: u32,
    outputs: &[(String, PathBuf)],
) -> Result<(), String> {
    let outputs_json: Vec<serde_json::Value> = outputs
        .iter()
        .map(|(name, file)| {
            serde_json::json!({
                "name": name,
                "path": file.display().to_string(),
            })
        })
        .collect();

    let meta = serde_json::json!({
        "input": input.display().to_string(),
        "task": args.task.name(),
        "width": width,
        "height": height,
        "serpentine": !args.no_serpentine,
        "threshold": args.threshold,
        "levels": args.levels,
        "seed": args.seed,
        "noise_scale": args.noise_scale,
        "outputs": outputs_json,
    });

    let json = serde_json::to_string_pretty(&meta)
        .map_err(|e| format!("Failed to serialize metadata: {}", e))?;
    let mut file = File::create(path)
        .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    file.write_all(json.as_bytes())
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    Ok(())
}

// ============================================================================
// Tasks
// ============================================================================

fn run_error_diffusion(args: &Args, gray: &GrayBuffer) -> Result<Vec<Output>, String> {
    let names: Vec<&str> = args
        .kernels
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    // Validate every name before running any of them
    let canonical = check_kernels(&names).map_err(|e| e.to_string())?;

    let config = DiffusionConfig {
        threshold: map_threshold(args.threshold, OutputType::U8),
        serpentine: !args.no_serpentine,
    };

    canonical
        .into_iter()
        .map(|kernel| {
            info!(kernel, "error diffusion");
            let out = error_diffuse(gray, kernel, &config, None).map_err(|e| e.to_string())?;
            Ok(Output { name: kernel.to_string(), data: out.into_vec(), channels: 1 })
        })
        .collect()
}

fn run_adaptive(args: &Args, gray: &GrayBuffer) -> Result<Vec<Output>, String> {
    let base = AdaptiveConfig {
        threshold: map_threshold(args.threshold, OutputType::U8),
        serpentine: !args.no_serpentine,
        noise_scale: args.noise_scale,
        seed: Some(args.seed),
        ..AdaptiveConfig::default()
    };

    [AdaptiveMethod::Ostromoukhov, AdaptiveMethod::ZhouFang]
        .into_iter()
        .map(|method| {
            info!(%method, "adaptive diffusion");
            let config = AdaptiveConfig { method, ..base };
            let out = adaptive_diffuse(gray, &config, None).map_err(|e| e.to_string())?;
            Ok(Output { name: method.name().to_string(), data: out.into_vec(), channels: 1 })
        })
        .collect()
}

fn run_multi_level(args: &Args, rgb: &RgbBuffer) -> Result<Vec<Output>, String> {
    let palette = Palette::gray_ramp(args.levels).map_err(|e| e.to_string())?;
    info!(levels = args.levels, kernel = %args.palette_kernel, "multi-level diffusion");

    let mut progress = |p: f32| debug!(progress = p, "rows done");
    let out = palette_diffuse(rgb, &palette, &args.palette_kernel, true, Some(&mut progress))
        .map_err(|e| e.to_string())?;

    Ok(vec![Output {
        name: format!("multi_level_{}", args.levels),
        data: out.into_vec(),
        channels: 3,
    }])
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| e.to_string())?;

    if args.task == Task::ListKernels {
        println!("{}", format_kernels_by_family());
        return Ok(());
    }

    if args.ostro_table.is_some() || args.zf_table.is_some() {
        init_adaptive_tables(args.ostro_table.as_deref(), args.zf_table.as_deref())
            .map_err(|e| e.to_string())?;
    }

    let input = args
        .input
        .clone()
        .ok_or_else(|| "No input specified. Use --input".to_string())?;
    let (data, width, height) = load_image(&input)?;
    let view = ImageView::new(&data, &[height as usize, width as usize, 3]).map_err(|e| e.to_string())?;

    let outputs = match args.task {
        Task::ErrorDiffusion => {
            let gray = grayscale(&view).map_err(|e| e.to_string())?;
            run_error_diffusion(&args, &gray)?
        }
        Task::Adaptive => {
            let gray = grayscale(&view).map_err(|e| e.to_string())?;
            run_adaptive(&args, &gray)?
        }
        Task::MultiLevel => {
            let rgb = prepare_rgb(&view).map_err(|e| e.to_string())?;
            run_multi_level(&args, &rgb)?
        }
        Task::ListKernels => Vec::new(),
    };

    std::fs::create_dir_all(&args.output_dir)
        .map_err(|e| format!("Failed to create {}: {}", args.output_dir.display(), e))?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let mut written = Vec::with_capacity(outputs.len());
    for out in &outputs {
        let path = save_output(out, &args.output_dir, &stem, args.task, width, height)?;
        written.push((out.name.clone(), path));
    }

    if let Some(ref meta_path) = args.output_meta {
        debug!(path = %meta_path.display(), "writing metadata");
        write_metadata(meta_path, &args, &input, width, height, &written)?;
    }

    info!(count = written.len(), "done");
    Ok(())
}
