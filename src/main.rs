use bigthumb::config::{self, ThumbConfig};
use bigthumb::imaging::{Region, RustBackend};
use bigthumb::output;
use bigthumb::pipeline::{DEFAULT_SCALE, ThumbnailPipeline};
use bigthumb::quick::{self, Job};
use bigthumb::rescale::ScaleMode;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bigthumb")]
#[command(about = "Thumbnails for images too large to decode at once")]
#[command(long_about = "\
Thumbnails for images too large to decode at once

The source is cut into tiles (5000x5000 by default), each tile is rescaled
on its own, and the results are stitched back together and encoded in the
format named by the target's extension.

  scale   uniform factor, e.g. 0.01 for a 1% thumbnail
  size    approximate overall size, split between tiles; aspect not kept
  plan    show the tile grid without processing anything

resize, crop and convert work on images small enough to decode whole.

Run 'bigthumb gen-config' to generate a documented bigthumb.toml.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); stock defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of progress lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Source and target shared by every image command.
#[derive(Args, Clone)]
struct Paths {
    /// Image to read
    source: PathBuf,
    /// Image to write; its extension picks the encoder
    target: PathBuf,
}

/// Exactly one way to size a `resize`.
#[derive(Args, Clone)]
#[group(required = true, multiple = false)]
struct ResizeBy {
    /// Scale both axes by this factor
    #[arg(long)]
    factor: Option<f64>,
    /// Target width, aspect kept
    #[arg(long)]
    width: Option<u32>,
    /// Target height, aspect kept
    #[arg(long)]
    height: Option<u32>,
    /// Exact WIDTHxHEIGHT, aspect not kept
    #[arg(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,
}

#[derive(Subcommand)]
enum Command {
    /// Tiled thumbnail by a uniform factor
    Scale {
        #[command(flatten)]
        paths: Paths,
        #[arg(long, default_value_t = DEFAULT_SCALE)]
        factor: f64,
    },
    /// Tiled thumbnail to an approximate overall size
    Size {
        #[command(flatten)]
        paths: Paths,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Show how a source would be tiled
    Plan {
        /// Image to inspect
        source: PathBuf,
    },
    /// Resize a whole image in one pass
    Resize {
        #[command(flatten)]
        paths: Paths,
        #[command(flatten)]
        by: ResizeBy,
    },
    /// Cut a region out of an image
    Crop {
        #[command(flatten)]
        paths: Paths,
        #[arg(long)]
        x: u32,
        #[arg(long)]
        y: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Shrink the cut to fit inside WIDTHxHEIGHT, aspect kept
        #[arg(long, value_parser = parse_size)]
        fit: Option<(u32, u32)>,
    },
    /// Re-encode an image in the target's format
    Convert {
        #[command(flatten)]
        paths: Paths,
    },
    /// Print a stock bigthumb.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let cfg = config::load_config(cli.config.as_deref())?;
    init_thread_pool(&cfg.processing);
    let backend = RustBackend::new();

    match cli.command {
        Command::Scale { paths, factor } => {
            run_tiled(&backend, cfg, &paths, ScaleMode::Uniform(factor), json)?;
        }
        Command::Size {
            paths,
            width,
            height,
        } => {
            run_tiled(
                &backend,
                cfg,
                &paths,
                ScaleMode::Apportioned { width, height },
                json,
            )?;
        }
        Command::Plan { source } => {
            let tile_size = cfg.tiling.tile_size();
            let pipeline = ThumbnailPipeline::new(&backend, cfg);
            let descriptor = pipeline.describe(&source)?;
            let grid = pipeline.plan(&descriptor)?;
            if json {
                let value = serde_json::json!({
                    "source": descriptor.path,
                    "format": format!("{:?}", descriptor.format).to_lowercase(),
                    "width": descriptor.width,
                    "height": descriptor.height,
                    "tile_size": tile_size,
                    "grid": grid,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                output::print_plan(&descriptor, &grid, tile_size);
            }
        }
        Command::Resize { paths, by } => {
            let resize = job(&paths, &cfg);
            let written = match by {
                ResizeBy {
                    factor: Some(f), ..
                } => quick::scale(&backend, &resize, f)?,
                ResizeBy { width: Some(w), .. } => quick::fit_width(&backend, &resize, w)?,
                ResizeBy {
                    height: Some(h), ..
                } => quick::fit_height(&backend, &resize, h)?,
                ResizeBy {
                    size: Some((w, h)), ..
                } => quick::force_size(&backend, &resize, w, h)?,
                _ => return Err("one of --factor, --width, --height, --size is required".into()),
            };
            print_written(&written, json)?;
        }
        Command::Crop {
            paths,
            x,
            y,
            width,
            height,
            fit,
        } => {
            let region = Region::new(x, y, width, height);
            let written = quick::crop(&backend, &job(&paths, &cfg), region, fit)?;
            print_written(&written, json)?;
        }
        Command::Convert { paths } => {
            let written = quick::convert(&backend, &job(&paths, &cfg))?;
            print_written(&written, json)?;
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Run the tiled pipeline, printing events as they arrive or a JSON report.
fn run_tiled(
    backend: &RustBackend,
    cfg: ThumbConfig,
    paths: &Paths,
    mode: ScaleMode,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let report = ThumbnailPipeline::new(backend, cfg).run_with_report(
            &paths.source,
            &paths.target,
            mode,
        )?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_pipeline_event(&event) {
                println!("{}", line);
            }
        }
    });
    // The pipeline owns the sender; dropping it ends the printer loop.
    let result = ThumbnailPipeline::new(backend, cfg)
        .with_events(tx)
        .run(&paths.source, &paths.target, mode);
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    result?;
    Ok(())
}

fn job<'a>(paths: &'a Paths, cfg: &ThumbConfig) -> Job<'a> {
    Job::new(&paths.source, &paths.target).with_quality(cfg.output.quality())
}

fn print_written(target: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let value = serde_json::json!({ "target": target });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for line in output::format_written(target) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Parse `WIDTHxHEIGHT`, e.g. `800x600`.
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width = w
        .trim()
        .parse()
        .map_err(|e| format!("bad width '{w}': {e}"))?;
    let height = h
        .trim()
        .parse()
        .map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok((width, height))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
