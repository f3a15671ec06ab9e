use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::prelude::*;
use webshrink::{config, imaging, output, run, scan};

/// Set by Ctrl+C. Checked before each file starts.
static CANCEL: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "webshrink")]
#[command(about = "Batch-convert photo trees into web-ready images")]
#[command(long_about = "\
Batch-convert photo trees into web-ready images

Every supported image under SOURCE is resized to fit the configured bounding
box and written under OUTPUT with the same directory layout and a web-safe
file name. The output format is the best codec that works on this machine:
AVIF, then WebP, then JPEG.

  photos/                         out/
  ├── Beach Day.png          →    ├── img-beach-day.avif
  └── trips/                      └── trips/
      └── IMG_0042.JPG       →        └── img-img_0042.avif

Supported inputs: jpg, jpeg, png, bmp, tiff, webp, gif.

Settings come from the stock defaults, then --config FILE, then any flag
passed on the command line. Run 'webshrink gen-config' for the full list.

Set RUST_LOG=debug for diagnostic logging on stderr.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every image under SOURCE into OUTPUT
    Convert(ConvertArgs),
    /// Print the output format this machine would use
    Probe,
    /// Print the stock JSON config with all options
    GenConfig,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Directory to read images from
    source: PathBuf,

    /// Directory to write converted images to
    output: PathBuf,

    /// Also write a WebP copy of every image under this directory
    #[arg(long)]
    webp_dir: Option<PathBuf>,

    /// JSON config file (only the keys to change are needed)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config to this file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Write the run statistics as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Config keys settable from the command line. Serializes to a JSON overlay
/// holding only the flags that were passed.
#[derive(clap::Args, Serialize)]
struct Overrides {
    /// Worker threads (capped at the number of cores)
    #[arg(long, short = 'j')]
    #[serde(rename = "max_processes", skip_serializing_if = "Option::is_none")]
    jobs: Option<usize>,

    /// Primary format quality, 1-100
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<u32>,

    /// WebP companion quality, 1-100
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    webp_quality: Option<u32>,

    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_width: Option<u32>,

    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_height: Option<u32>,

    /// Drop source metadata
    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    remove_exif: Option<bool>,

    /// Resize images larger than max-width x max-height
    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    optimize_for_web: Option<bool>,

    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    create_thumbnails: Option<bool>,

    /// Comma-separated thumbnail box sizes, e.g. 150,300
    #[arg(long, value_delimiter = ',')]
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail_sizes: Option<Vec<u32>>,

    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    preserve_transparency: Option<bool>,

    /// Transliterate and slugify output file names
    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    seo_friendly_names: Option<bool>,

    /// Prefix output names with "img-"
    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    seo_prefix: Option<bool>,

    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    progressive: Option<bool>,

    /// Write the WebP companion when --webp-dir is given
    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    create_webp: Option<bool>,

    /// AVIF encoder speed, 1 (slow, small) to 10 (fast)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    avif_speed: Option<u8>,

    /// Lossless WebP when WebP is the primary format
    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    lossless: Option<bool>,

    /// WebP effort when WebP is the primary format, 0 (fast) to 6 (small)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<u8>,

    /// Lossless WebP companion
    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    webp_lossless: Option<bool>,

    /// WebP companion effort, 0 (fast) to 6 (small)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    webp_method: Option<u8>,

    #[command(flatten, next_help_heading = "Metadata")]
    #[serde(rename = "custom_exif", skip_serializing_if = "ExifOverrides::is_empty")]
    exif: ExifOverrides,
}

/// Custom EXIF fields. Serialized under their JSON config names so they
/// merge into `custom_exif` field by field.
#[derive(clap::Args, Serialize)]
struct ExifOverrides {
    #[arg(long)]
    #[serde(rename = "Artist", skip_serializing_if = "Option::is_none")]
    artist: Option<String>,

    #[arg(long)]
    #[serde(rename = "Copyright", skip_serializing_if = "Option::is_none")]
    copyright: Option<String>,

    /// Appended to the comment as "Website: <url>"
    #[arg(long)]
    #[serde(rename = "Website", skip_serializing_if = "Option::is_none")]
    website: Option<String>,

    #[arg(long)]
    #[serde(rename = "Software", skip_serializing_if = "Option::is_none")]
    software: Option<String>,

    #[arg(long)]
    #[serde(rename = "ImageDescription", skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[arg(long)]
    #[serde(rename = "XPKeywords", skip_serializing_if = "Option::is_none")]
    keywords: Option<String>,

    #[arg(long)]
    #[serde(rename = "XPComment", skip_serializing_if = "Option::is_none")]
    comment: Option<String>,

    #[arg(long)]
    #[serde(rename = "XPSubject", skip_serializing_if = "Option::is_none")]
    subject: Option<String>,

    /// Camera make
    #[arg(long)]
    #[serde(rename = "Make", skip_serializing_if = "Option::is_none")]
    make: Option<String>,

    /// Camera model
    #[arg(long)]
    #[serde(rename = "Model", skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

impl ExifOverrides {
    fn is_empty(&self) -> bool {
        [
            &self.artist,
            &self.copyright,
            &self.website,
            &self.software,
            &self.description,
            &self.keywords,
            &self.comment,
            &self.subject,
            &self.make,
            &self.model,
        ]
        .iter()
        .all(|field| field.is_none())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert(args) => convert(args)?,
        Command::Probe => {
            output::print_probe(imaging::detect_output_format());
        }
        Command::GenConfig => {
            println!("{}", config::stock_config_json());
        }
    }

    Ok(())
}

fn convert(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args)?;
    if let Some(path) = &args.save_config {
        config::save_config(&config, path)?;
        println!("Saved config to {}", path.display());
    }

    ctrlc::set_handler(|| CANCEL.store(true, Ordering::SeqCst))?;
    init_thread_pool(&config);

    let excluded: Vec<PathBuf> = std::iter::once(args.output.clone())
        .chain(args.webp_dir.clone())
        .collect();
    let files = scan::discover_excluding(&args.source, &excluded)?;

    let primary = imaging::detect_output_format();
    output::print_probe(primary);

    let plan = run::RunPlan {
        source_root: args.source.clone(),
        output_dir: args.output.clone(),
        webp_dir: args.webp_dir.clone(),
        primary,
    };

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_run_event(&event) {
                println!("{}", line);
            }
        }
    });
    let stats = run::run(&plan, &files, &config, Some(tx), &CANCEL);
    printer.join().ok();
    let stats = stats?;

    println!();
    output::print_report(&stats);

    if let Some(path) = &args.report {
        write_report(&stats, path)?;
    }
    Ok(())
}

/// Stock defaults, then the config file, then flags passed on the command line.
fn resolve_config(args: &ConvertArgs) -> Result<config::ConvertConfig, Box<dyn std::error::Error>> {
    let mut base = config::stock_defaults_value();
    if let Some(path) = &args.config {
        base = config::merge_json(base, config::read_overlay(path)?);
    }
    let flags = serde_json::to_value(&args.overrides)?;
    Ok(config::resolve_config(base, Some(flags))?)
}

fn write_report(stats: &webshrink::stats::RunStatistics, path: &Path) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(stats)?;
    std::fs::write(path, json)
}

/// Diagnostics go to stderr; default level `warn`, override with `RUST_LOG`.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(config: &config::ConvertConfig) {
    let threads = config::effective_threads(config);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_args(flags: &[&str]) -> ConvertArgs {
        let argv = ["webshrink", "convert", "photos", "out"];
        let cli = Cli::try_parse_from(argv.iter().chain(flags)).unwrap();
        match cli.command {
            Command::Convert(args) => args,
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn no_flags_means_empty_overlay() {
        let args = convert_args(&[]);
        let overlay = serde_json::to_value(&args.overrides).unwrap();
        assert_eq!(overlay, serde_json::json!({}));
    }

    #[test]
    fn metadata_flags_nest_under_custom_exif() {
        let args = convert_args(&[
            "--artist",
            "Jane Doe",
            "--keywords",
            "sea;sky",
            "--quality",
            "70",
        ]);
        let overlay = serde_json::to_value(&args.overrides).unwrap();
        assert_eq!(
            overlay,
            serde_json::json!({
                "quality": 70,
                "custom_exif": { "Artist": "Jane Doe", "XPKeywords": "sea;sky" }
            })
        );
    }

    #[test]
    fn flags_override_stock_defaults() {
        let args = convert_args(&[
            "--copyright",
            "(c) Jane",
            "--website",
            "example.com",
            "--description",
            "Harbor",
            "--lossless",
            "true",
            "--method",
            "2",
            "--webp-lossless",
            "true",
            "--webp-method",
            "4",
        ]);

        let config = resolve_config(&args).unwrap();

        assert_eq!(config.custom_exif.copyright, "(c) Jane");
        assert_eq!(config.custom_exif.website, "example.com");
        assert_eq!(config.custom_exif.image_description, "Harbor");
        assert_eq!(config.custom_exif.artist, "");
        assert!(config.lossless);
        assert_eq!(config.method, 2);
        assert!(config.webp_lossless);
        assert_eq!(config.webp_method, 4);
    }

    #[test]
    fn out_of_range_method_is_rejected() {
        let args = convert_args(&["--webp-method", "9"]);
        assert!(resolve_config(&args).is_err());
    }
}
