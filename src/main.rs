use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use stickerpress::exporter::verify_raster;
use stickerpress::{
    sticker_file_name, template, BusinessRecord, ExporterConfig, StickerExporter, StickerSpec,
    Surface,
};

/// Capture a business sticker and export it as a PNG, a printable PDF, or a
/// self-printing HTML payload.
#[derive(Parser)]
#[command(name = "stickerpress", version, about)]
struct Cli {
    /// Path to the business record JSON
    #[arg(long)]
    input: PathBuf,

    /// Published site URL the QR badge points at
    #[arg(long)]
    site_url: String,

    /// Asset proxy endpoint for cross-origin images
    #[arg(long)]
    proxy: Option<String>,

    /// Host treated as same-origin (its images bypass the proxy)
    #[arg(long)]
    origin: Option<String>,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// On-screen capture width in pixels
    #[arg(long, default_value_t = 400)]
    display_width: u32,

    /// Export raster width in pixels (height follows the 1:2 ratio)
    #[arg(long, default_value_t = 10000)]
    export_width: u32,

    /// Shared asset-readiness deadline in milliseconds
    #[arg(long, default_value_t = 6000)]
    asset_deadline_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the sticker as a high-resolution PNG
    Png,
    /// Export a single-page full-bleed PDF
    Pdf,
    /// Build the self-printing HTML payload
    Print,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let record: BusinessRecord = {
        let raw = std::fs::read_to_string(&cli.input)
            .with_context(|| format!("failed to read {}", cli.input.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", cli.input.display()))?
    };

    let spec = StickerSpec {
        display_width: cli.display_width,
        export_width: cli.export_width,
        export_height: cli.export_width * 2,
        ..Default::default()
    };

    let config = ExporterConfig {
        proxy_endpoint: cli.proxy.clone(),
        origin_host: cli.origin.clone(),
        asset_deadline_ms: cli.asset_deadline_ms,
        ..Default::default()
    };

    let mut surface = Surface::new();
    let tree = template::build_sticker_tree(&record, &cli.site_url);
    let source = surface.mount(tree);
    let exporter = StickerExporter::new(config)?;

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("failed to create {}", cli.out.display()))?;

    match cli.command {
        Command::Png => {
            let raster = match exporter.capture_raster(&mut surface, source, &spec).await {
                Ok(raster) => raster,
                Err(e) => {
                    log::debug!("capture error: {}", e);
                    eprintln!("Sticker download failed.");
                    std::process::exit(1);
                }
            };
            if !verify_raster(&raster, &spec) {
                eprintln!(
                    "Warning: the downloaded sticker is not exactly {}x{} pixels.",
                    spec.export_width, spec.export_height
                );
            }
            let path = cli.out.join(sticker_file_name(&record.name, "png"));
            std::fs::write(&path, &raster.png_data)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Sticker downloaded: {}", path.display());
        }
        Command::Pdf => {
            let pdf = match exporter.export_document(&mut surface, source, &spec).await {
                Ok(pdf) => pdf,
                Err(e) => {
                    log::debug!("document error: {}", e);
                    eprintln!("Sticker PDF export failed.");
                    std::process::exit(1);
                }
            };
            let path = cli.out.join(sticker_file_name(&record.name, "pdf"));
            std::fs::write(&path, &pdf)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Sticker PDF saved: {}", path.display());
        }
        Command::Print => {
            let job = match exporter
                .export_for_print(&mut surface, source, &spec, &record.name)
                .await
            {
                Ok(job) => job,
                Err(e) => {
                    log::debug!("print error: {}", e);
                    eprintln!("Sticker print export failed.");
                    std::process::exit(1);
                }
            };
            let path = cli.out.join(&job.file_name);
            job.write_to(&path)?;
            println!("Print payload saved: {}", path.display());
        }
    }

    Ok(())
}
