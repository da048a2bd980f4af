// ABOUTME: Main entry point for the deck-export program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use deck_export::{
    AssetResolver, ChromeCapturer, Config, FileStore, Presentation, Quality, ResourceFile,
    SlideProgress, StaticSurface, StyleSource,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a presentation as a standalone interactive HTML file
    ExportHtml(ExportArgs),

    /// Export a presentation as a PDF with clickable links
    ExportPdf(PdfArgs),

    /// Export a presentation as a JSON archive with embedded images
    ExportJson(ExportArgs),

    /// Import a JSON archive into the store
    ImportJson {
        /// Path to the archive
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Add an image to the store and print its asset id
    AddImage {
        /// Path to the image file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List stored presentations
    List,

    /// Capture thumbnails for every slide of a stored presentation
    Thumbnails {
        /// Presentation id
        #[arg(long)]
        id: String,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// Id of a presentation in the store
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    id: Option<String>,

    /// Path to a presentation JSON file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Extra CSS files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    css: Option<Vec<String>>,
}

#[derive(Args)]
struct PdfArgs {
    #[command(flatten)]
    export: ExportArgs,

    /// Raster quality: high, medium or low
    #[arg(long)]
    quality: Option<String>,
}

fn load_presentation(args: &ExportArgs, store: &FileStore) -> anyhow::Result<Presentation> {
    let presentation = match (&args.id, &args.file) {
        (Some(id), _) => store
            .get_presentation(id)?
            .ok_or_else(|| anyhow!("No presentation with id {}", id))?,
        (None, Some(path)) => {
            deck_export::utils::validate_file_exists(path)?;
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse presentation {:?}", path))?
        }
        (None, None) => return Err(anyhow!("Either --id or --file is required")),
    };
    presentation.validate()?;
    Ok(presentation)
}

fn resolver(config: &Config, store: &FileStore) -> anyhow::Result<AssetResolver> {
    Ok(AssetResolver::new()
        .with_store(Arc::new(store.clone()))
        .with_http(
            Duration::from_millis(config.default_timeout_ms),
            config.fetch_retries,
        )?)
}

fn surface(resolver: AssetResolver, css: &Option<Vec<String>>) -> StaticSurface {
    css.iter()
        .flatten()
        .fold(StaticSurface::new(resolver), |surface, path| {
            surface.with_stylesheet(StyleSource::Linked(ResourceFile::new(path)))
        })
}

fn launch_capturer(config: &Config, presentation: &Presentation) -> anyhow::Result<ChromeCapturer> {
    let (width, height) = presentation.max_slide_size();
    Ok(ChromeCapturer::launch(
        &config.get_capture_config(),
        width.ceil() as u32,
        height.ceil() as u32,
    )?)
}

fn prepare_output(output: &Path) -> anyhow::Result<()> {
    deck_export::utils::validate_directory_writable(output)?;
    Ok(())
}

fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    let store = FileStore::open(&config.store_dir)?;

    match command {
        Commands::ExportHtml(args) => {
            println!("Executing export-html command...");
            prepare_output(&args.output)?;
            let presentation = load_presentation(&args, &store)?;
            let mut surface = surface(resolver(config, &store)?, &args.css);
            let path = deck_export::export_html(
                &presentation,
                &mut surface,
                &config.get_html_options(&args.output),
            )?;
            println!("HTML generated successfully: {:?}", path);
        }
        Commands::ExportPdf(args) => {
            println!("Executing export-pdf command...");
            prepare_output(&args.export.output)?;
            let quality = args.quality.as_deref().map(str::parse::<Quality>).transpose()?;
            let presentation = load_presentation(&args.export, &store)?;
            let mut surface = surface(resolver(config, &store)?, &args.export.css);
            let mut capturer = launch_capturer(config, &presentation)?;

            let mut report_progress = |p: &SlideProgress| match &p.failure {
                None => println!("[{}/{}] slide {}", p.completed, p.total, p.slide_id),
                Some(reason) => println!(
                    "[{}/{}] slide {} failed: {}",
                    p.completed, p.total, p.slide_id, reason
                ),
            };
            let export = deck_export::export_pdf(
                &presentation,
                &mut surface,
                &mut capturer,
                &config.get_pdf_options(&args.export.output, quality),
                Some(&mut report_progress),
            )?;
            println!(
                "PDF generated successfully: {:?} ({} pages, {} failed)",
                export.path,
                export.report.pages,
                export.report.failures.len()
            );
        }
        Commands::ExportJson(args) => {
            println!("Executing export-json command...");
            prepare_output(&args.output)?;
            let presentation = load_presentation(&args, &store)?;
            let path = deck_export::export_json(
                &presentation,
                &resolver(config, &store)?,
                &config.get_json_options(&args.output),
            )?;
            println!("JSON generated successfully: {:?}", path);
        }
        Commands::ImportJson { file } => {
            let mut presentation = deck_export::import_json_file(&file)?;
            store.save_presentation(&mut presentation)?;
            println!("Imported presentation {} ({})", presentation.id, presentation.title);
        }
        Commands::AddImage { file } => {
            deck_export::utils::validate_file_exists(&file)?;
            let bytes = fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let id = store.save_image(&bytes)?;
            println!("{}", id);
        }
        Commands::List => {
            for p in store.list_presentations()? {
                let updated = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(p.updated_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| p.updated_at.to_string());
                println!("{}\t{}\t{} slides\t{}", p.id, p.title, p.slides.len(), updated);
            }
        }
        Commands::Thumbnails { id } => {
            let presentation = store
                .get_presentation(&id)?
                .ok_or_else(|| anyhow!("No presentation with id {}", id))?;
            presentation.validate()?;
            let mut surface = surface(resolver(config, &store)?, &None);
            let mut capturer = launch_capturer(config, &presentation)?;

            let session = deck_export::ExportSession::begin(&mut surface, config.settle_delay())?;
            let deck = session.snapshot(&presentation)?;
            let stylesheet = deck_export::surface::collect_styles(&deck.stylesheets);
            for slide in &deck.slides {
                match deck_export::capture_thumbnail(&mut capturer, slide, &stylesheet) {
                    Ok(png) => {
                        let path = store.save_thumbnail(&slide.slide_id, &png)?;
                        println!("Thumbnail written: {:?}", path);
                    }
                    Err(e) => eprintln!("Thumbnail for slide {} failed: {}", slide.slide_id, e),
                }
            }
            session.end();
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = Config::from_env();

    let result = match cli.command {
        Some(command) => run(command, &config),
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
