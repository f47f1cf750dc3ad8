use clap::{Args, Parser, Subcommand};
use imgbatch::config;
use imgbatch::delivery::{self, DirectorySink, ZipPackager};
use imgbatch::format::FormatChoice;
use imgbatch::imaging;
use imgbatch::output;
use imgbatch::process::{BatchContext, BatchSummary, Converter};
use imgbatch::queue::Queue;
use imgbatch::store::{self, DEFAULT_STATE_FILE, JsonSettingsStore};
use imgbatch::types::{ConversionSettings, CropRect, EditState, Rotation};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("IMGBATCH_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("IMGBATCH_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "imgbatch")]
#[command(about = "Batch image converter")]
#[command(long_about = "\
Batch image converter

Queue image files, convert them to one output format with optional resize,
rotation, flips and crop, and save the results. A single result is saved as
is; several results are packed into one ZIP archive.

Formats: same | jpeg | png | webp | gif | bmp | tiff | svg | ico
  same   keeps each file's own format (unknown sources become JPEG)
  svg    wraps the raster image in an SVG document
  ico    32x32 icon on a white background

Settings are layered, later layers winning:
  stock defaults -> config.toml -> last-used settings -> flags

Run 'imgbatch gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Where the last-used settings are kept between runs
    #[arg(long, default_value = DEFAULT_STATE_FILE, global = true)]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue, convert and save images
    Convert(ConvertArgs),
    /// Print per-file output size estimates without converting
    Estimate(EstimateArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

/// Flags that override the conversion settings.
#[derive(Args, Clone, Default)]
struct SettingsArgs {
    /// Output format
    #[arg(long)]
    format: Option<FormatChoice>,

    /// Lossy quality, 0.1 to 1.0
    #[arg(long)]
    quality: Option<f64>,

    /// Resize width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Resize height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Keep the first file's aspect ratio when only one dimension is given
    #[arg(long)]
    lock_aspect: bool,
}

/// Edits applied to every file in the batch.
#[derive(Args, Clone, Default)]
struct EditArgs {
    /// Clockwise rotation in degrees, a multiple of 90
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    rotate: i32,

    /// Mirror left to right
    #[arg(long)]
    flip_h: bool,

    /// Mirror top to bottom
    #[arg(long)]
    flip_v: bool,

    /// Crop rectangle in source pixels, X,Y,WIDTH,HEIGHT
    #[arg(long)]
    crop: Option<CropRect>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// Archive filename used when more than one file is converted
    #[arg(long)]
    archive_name: Option<String>,

    /// Re-run failed items this many times
    #[arg(long, default_value_t = 0)]
    retries: u32,

    #[command(flatten)]
    settings: SettingsArgs,

    #[command(flatten)]
    edit: EditArgs,
}

#[derive(Args)]
struct EstimateArgs {
    /// Image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Also write square PNG thumbnails into this directory
    #[arg(long)]
    thumbnails: Option<PathBuf>,

    #[command(flatten)]
    settings: SettingsArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Convert(args) => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let edit = edit_state(&args.edit)?;

            let mut queue = Queue::new();
            queue.add_all(imaging::collect_sources(&args.inputs)?);
            if queue.is_empty() {
                return Err("no image files to convert".into());
            }

            let store = JsonSettingsStore::new(&cli.state);
            let base = config.to_settings();
            let settings = resolve_settings(base, &store, &args.settings, &queue);
            store::persist(&store, &base, &settings);

            queue.refresh_estimates(&settings);
            output::print_queue(&queue);

            let ctx = BatchContext::new(queue, settings, edit);
            let (ctx, summary) = run_with_retries(ctx, args.retries);
            tracing::debug!(
                converted = summary.converted,
                failed = ctx.queue.failed_count(),
                "conversion finished"
            );

            let archive_name = args
                .archive_name
                .unwrap_or_else(|| config.delivery.archive_name.clone());
            let sink = DirectorySink::new(&args.output);
            let delivered =
                delivery::deliver(&summary.results, &sink, Some(&ZipPackager), &archive_name)?;
            output::print_delivery(&delivered);
        }
        Command::Estimate(args) => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);

            let mut queue = Queue::new();
            queue.add_all(imaging::collect_sources(&args.inputs)?);

            let store = JsonSettingsStore::new(&cli.state);
            let settings = resolve_settings(config.to_settings(), &store, &args.settings, &queue);
            queue.refresh_estimates(&settings);
            output::print_queue(&queue);

            if let Some(dir) = args.thumbnails {
                // No HEIC decoder is compiled in, so HEIC items get no thumbnail.
                queue.refresh_thumbnails(config.processing.thumbnail_size, None);
                let written = write_thumbnails(&queue, &dir)?;
                for line in output::format_thumbnails(&written) {
                    println!("{}", line);
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays the user-facing report. `RUST_LOG` overrides.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
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

fn edit_state(args: &EditArgs) -> Result<EditState, Box<dyn std::error::Error>> {
    Ok(EditState {
        rotation: Rotation::try_from(args.rotate)?,
        flip_horizontal: args.flip_h,
        flip_vertical: args.flip_v,
        crop: args.crop,
    })
}

/// Config-derived `base`, then the saved overrides, then flags.
fn resolve_settings(
    base: ConversionSettings,
    store: &JsonSettingsStore,
    flags: &SettingsArgs,
    queue: &Queue,
) -> ConversionSettings {
    let mut settings = store::recall(store).apply(base);

    if let Some(format) = flags.format {
        settings.format = format;
    }
    if let Some(quality) = flags.quality {
        settings.quality = imaging::Quality::new(quality);
    }
    if flags.lock_aspect {
        let ratio = queue
            .items()
            .first()
            .and_then(|item| imaging::probe_dimensions(&item.source().bytes).ok())
            .filter(|dims| dims.height > 0)
            .map(|dims| dims.width as f64 / dims.height as f64);
        settings.lock_aspect(ratio);
    }
    match (flags.width, flags.height) {
        (Some(width), Some(height)) => {
            settings.resize.width = Some(width);
            settings.resize.height = Some(height);
        }
        (Some(width), None) => settings.set_width(width),
        (None, Some(height)) => settings.set_height(height),
        (None, None) => {}
    }
    if flags.width.is_some() || flags.height.is_some() {
        settings.resize.enabled = true;
    }
    settings
}

/// Run the batch, then re-run failed items up to `retries` times.
///
/// Progress lines are printed from a separate thread while the batch runs.
fn run_with_retries(mut ctx: BatchContext, retries: u32) -> (BatchContext, BatchSummary) {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });

    let converter = Converter::new().with_events(tx);
    let mut summary = converter.run_batch(&mut ctx);
    for attempt in 1..=retries {
        if ctx.queue.retry_failed() == 0 {
            break;
        }
        tracing::info!(attempt, "retrying failed items");
        summary = converter.run_batch(&mut ctx);
    }

    drop(converter);
    if printer.join().is_err() {
        tracing::warn!("progress printer stopped early");
    }
    (ctx, summary)
}

/// Write each cached thumbnail as `<stem>_thumb.png`, returning the names.
fn write_thumbnails(queue: &Queue, dir: &Path) -> std::io::Result<Vec<String>> {
    std::fs::create_dir_all(dir)?;
    let mut taken = std::collections::HashSet::new();
    let mut written = Vec::new();
    for item in queue.items() {
        let Some(png) = item.thumbnail() else {
            continue;
        };
        let name = imgbatch::naming::disambiguate(
            &format!("{}_thumb.png", imgbatch::naming::strip_extension(item.name())),
            &mut taken,
        );
        std::fs::write(dir.join(&name), png)?;
        written.push(name);
    }
    Ok(written)
}
