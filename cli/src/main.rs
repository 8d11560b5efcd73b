//! docmason CLI - lossless DOCX/PDF layout extraction

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use docmason::{
    ConvertOptions, ConvertResult, ConverterRegistry, Error, ExtractionPipeline, JsonFormat,
    PageSelection, RelationshipMode, XmlOptions,
};

#[derive(Parser)]
#[command(name = "docmason")]
#[command(version)]
#[command(about = "Extract DOCX and PDF layout into lossless XML", long_about = None)]
struct Cli {
    #[command(flatten)]
    flags: ConvertFlags,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ConvertFlags {
    /// Page range for PDF input (e.g., "1-10", "1,3,5")
    #[arg(long, global = true, value_parser = PageSelection::parse)]
    pages: Option<PageSelection>,

    /// Record each overlap only on the element that comes first
    #[arg(long, global = true)]
    directional: bool,

    /// Relate only elements on the same page
    #[arg(long, global = true)]
    same_page: bool,

    /// Skip the read-back integrity check
    #[arg(long, global = true)]
    no_verify: bool,

    /// Leave image bytes out of the XML
    #[arg(long, global = true)]
    no_binary: bool,

    /// Write extracted images into this directory
    #[arg(long, global = true, value_name = "DIR")]
    image_dir: Option<PathBuf>,
}

impl ConvertFlags {
    fn options(&self) -> ConvertOptions {
        let mode = if self.directional {
            RelationshipMode::Directional
        } else {
            RelationshipMode::Symmetric
        };
        let options = ConvertOptions::new()
            .with_pages(self.pages.clone().unwrap_or_default())
            .with_relationship_mode(mode)
            .with_same_page_relationships(self.same_page)
            .with_verify(!self.no_verify)
            .with_xml(XmlOptions::new().with_binary(!self.no_binary));
        match &self.image_dir {
            Some(dir) => options.with_image_dir(dir),
            None => options,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document to LosslessDocument XML
    Convert {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to the input name with an .xml extension)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the plain text of a document
    Text {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the element list as JSON
    Json {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show document information
    Info {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// List supported input formats
    Formats,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let options = cli.flags.options();

    let result = match cli.command {
        Commands::Convert { input, output } => cmd_convert(&input, output.as_deref(), options),
        Commands::Text { input, output } => cmd_text(&input, output.as_deref(), options),
        Commands::Json {
            input,
            output,
            compact,
        } => cmd_json(&input, output.as_deref(), compact, options),
        Commands::Info { input } => cmd_info(&input, options),
        Commands::Formats => {
            cmd_formats();
            Ok(())
        }
    };

    if let Err(e) = result {
        let status = e.status();
        eprintln!("{} [{}]: {}", "Error".red().bold(), status, e);
        std::process::exit(status.code());
    }
}

/// Run the conversion on a worker thread while this thread draws progress.
fn run_conversion(input: &Path, options: ConvertOptions) -> docmason::Result<ConvertResult> {
    debug!("Converting {} on a worker thread", input.display());
    let (tx, rx) = crossbeam_channel::unbounded();
    let options = options.with_progress(tx);
    let path = input.to_path_buf();
    let worker =
        thread::spawn(move || ExtractionPipeline::with_defaults().convert(&path, &options));

    let pb = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    // The channel closes when the worker drops its options.
    for event in rx.iter() {
        pb.set_position(u64::from(event.percent));
        pb.set_message(format!("{}: {}", event.stage.label(), event.message));
    }
    pb.finish_and_clear();

    worker
        .join()
        .map_err(|_| Error::Unknown("conversion thread panicked".into()))?
}

fn write_output(path: &Path, data: &[u8]) -> docmason::Result<()> {
    fs::write(path, data).map_err(|e| Error::Write(format!("{}: {}", path.display(), e)))?;
    println!("{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    options: ConvertOptions,
) -> docmason::Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("xml"));

    let result = run_conversion(input, options)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Write(format!("{}: {}", parent.display(), e)))?;
    }
    write_output(&output, &result.xml)?;

    println!(
        "  {} {} elements, {} relationship pairs, {} pages",
        "└─".dimmed(),
        result.element_count(),
        result.relationship_pairs,
        result.page_count
    );
    Ok(())
}

fn cmd_text(input: &Path, output: Option<&Path>, options: ConvertOptions) -> docmason::Result<()> {
    let result = run_conversion(input, options.with_verify(false))?;
    let text = result.text();

    match output {
        Some(path) => write_output(path, text.as_bytes()),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    options: ConvertOptions,
) -> docmason::Result<()> {
    let result = run_conversion(input, options.with_verify(false))?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = result.to_json(format)?;

    match output {
        Some(path) => write_output(path, json.as_bytes()),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

fn cmd_info(input: &Path, options: ConvertOptions) -> docmason::Result<()> {
    let result = run_conversion(input, options)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), result.format.name().to_uppercase());
    println!("{}: {}", "Pages".bold(), result.page_count);
    println!("{}: {} bytes", "XML size".bold(), result.xml.len());

    println!();
    println!("{}", "Elements".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for el in &result.elements {
        *by_type.entry(el.element_type.tag()).or_default() += 1;
    }
    for (tag, count) in &by_type {
        println!("{}: {}", tag.bold(), count);
    }
    println!("{}: {}", "Relationship pairs".bold(), result.relationship_pairs);

    let text = result.text();
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());
    println!("{}: {}", "Characters".bold(), text.chars().count());

    Ok(())
}

fn cmd_formats() {
    let registry = ConverterRegistry::with_defaults();
    println!("{}", "Supported formats".cyan().bold());
    for ext in registry.supported_extensions() {
        let name = registry
            .get_by_extension(ext)
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        println!("  {} .{} ({})", "•".dimmed(), ext, name);
    }
}
