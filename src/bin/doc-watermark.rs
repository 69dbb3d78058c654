//! Document Watermark CLI tool
//!
//! A command-line tool for converting office documents to PDF and watermarking them.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use glob::glob;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use doc_watermark::batch::{process_folder, ConsoleReporter};
use doc_watermark::config::{BatchConfig, DEFAULT_EXTENSION, DEFAULT_LOCK_PREFIX};
use doc_watermark::convert::{convert_to_pdf, SofficeConverter};
use doc_watermark::pdf::{apply_watermark, extract_metadata, pages_containing, LopdfStore, WatermarkOverlay};
use doc_watermark::WatermarkStyle;

/// Document Watermark - Convert documents to PDF and stamp a watermark on every page
#[derive(Parser)]
#[command(name = "doc-watermark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Convert and watermark every .docx in a folder
    doc-watermark batch ./documents --text \"LIBRARY COPY\"

    # Watermark existing PDFs
    doc-watermark watermark \"*.pdf\" --text DRAFT

    # Convert a single document
    doc-watermark convert Report.docx -o Report.pdf

    # Check that every page carries the watermark
    doc-watermark info Report.pdf --text \"LIBRARY COPY\"")]
struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every document in a folder to PDF and watermark it
    Batch {
        /// Folder containing the documents (not searched recursively)
        folder: PathBuf,

        /// Watermark text
        #[arg(short, long)]
        text: String,

        /// Extension of documents to process
        #[arg(long, default_value = DEFAULT_EXTENSION)]
        extension: String,

        /// File name prefix of editor lock files to skip
        #[arg(long, default_value = DEFAULT_LOCK_PREFIX)]
        lock_prefix: String,

        /// Conversion executable
        #[arg(long, default_value = "soffice")]
        converter: String,
    },

    /// Watermark existing PDF files
    Watermark {
        /// Input PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Watermark text
        #[arg(short, long)]
        text: String,

        /// Output PDF path (single input only; default: <name>-watermarked.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert one document to PDF
    Convert {
        /// Input document
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Conversion executable
        #[arg(long, default_value = "soffice")]
        converter: String,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,

        /// Also count pages whose text contains this watermark
        #[arg(short, long)]
        text: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Batch { folder, text, extension, lock_prefix, converter } => {
            cmd_batch(folder, text, extension, lock_prefix, converter)
        }
        Commands::Watermark { inputs, text, output } => cmd_watermark(inputs, text, output),
        Commands::Convert { input, output, converter } => cmd_convert(input, output, converter),
        Commands::Info { input, text } => cmd_info(input, text),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    paths.sort();
    paths.dedup();

    Ok(paths)
}

/// `<dir>/<stem>-watermarked.pdf`
fn default_watermark_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}-watermarked.pdf", stem))
}

/// Convert and watermark a folder of documents
fn cmd_batch(
    folder: PathBuf,
    text: String,
    extension: String,
    lock_prefix: String,
    converter: String,
) -> anyhow::Result<i32> {
    if !folder.is_dir() {
        println!("The folder {} does not exist.", folder.display());
        return Ok(0);
    }

    let config = BatchConfig::new(folder, text)
        .with_extension(extension)
        .with_lock_prefix(lock_prefix);

    let summary = process_folder(
        &config,
        &SofficeConverter::with_program(converter),
        &mut LopdfStore::new(),
        &mut ConsoleReporter,
    )?;

    println!(
        "Done: {} watermarked, {} failed",
        summary.processed.len(),
        summary.failures.len()
    );
    for (source, error) in &summary.failures {
        eprintln!("  {}: {}", source.display(), error);
    }

    Ok(if summary.is_success() { 0 } else { 1 })
}

/// Watermark existing PDFs
fn cmd_watermark(inputs: Vec<String>, text: String, output: Option<PathBuf>) -> anyhow::Result<i32> {
    let inputs = expand_globs(inputs)?;

    if output.is_some() && inputs.len() != 1 {
        bail!("--output can only be used with a single input file");
    }

    let overlay = WatermarkOverlay::build(&text, &WatermarkStyle::default())?;
    let mut store = LopdfStore::new();

    for input in &inputs {
        let target = output.clone().unwrap_or_else(|| default_watermark_output(input));
        let pages = apply_watermark(&mut store, input, &target, &overlay)
            .with_context(|| format!("Failed to watermark {}", input.display()))?;
        println!("Saved watermarked document as: {} ({} pages)", target.display(), pages);
    }

    Ok(0)
}

/// Convert a single document to PDF
fn cmd_convert(input: PathBuf, output: PathBuf, converter: String) -> anyhow::Result<i32> {
    convert_to_pdf(&SofficeConverter::with_program(converter), &input, &output)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    println!("Converted: {}", output.display());
    Ok(0)
}

/// Show information about a PDF
fn cmd_info(input: PathBuf, text: Option<String>) -> anyhow::Result<i32> {
    let metadata = extract_metadata(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }
    if let Some(text) = text {
        let stamped = pages_containing(&input, &text)?;
        println!("Pages with \"{}\": {} of {}", text, stamped, metadata.page_count);
    }

    Ok(0)
}
