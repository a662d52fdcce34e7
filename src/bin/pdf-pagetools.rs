//! PDF Page Tools CLI
//!
//! A command-line tool for cropping, fitting, rotating, arranging and rasterizing PDF pages.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use pdf_pagetools::layout::{
    parse_grid, parse_horizontal_alignment, parse_length, parse_margins, parse_offset, parse_paper_size,
    parse_scale_mode, parse_vertical_alignment, Margins, Orientation,
};
use pdf_pagetools::pdf::{
    crop_pdf, extract_metadata, nup_pdf, overlay_pdf, pagefit_pdf, rasterize_pdf, rotate_pdf, CropOptions,
    NupOptions, OverlayOptions, PagefitOptions, RasterizeOptions, RotateOptions,
};
use pdf_pagetools::raster::{Color, Sides};

/// PDF Page Tools - Crop, fit, rotate and rasterize PDF pages
#[derive(Parser)]
#[command(name = "pdf-pagetools")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Remove the white border around every page
    pdf-pagetools crop slides.pdf -o cropped.pdf

    # Print on A5 with a 1cm margin, aligned to the top
    pdf-pagetools pagefit slides.pdf -o a5.pdf --size A5 --margin 1cm --valign top

    # Turn pages a quarter counter-clockwise
    pdf-pagetools rotate scan.pdf -o rotated.pdf 90

    # Six pages per sheet, three across
    pdf-pagetools nup slides.pdf -o sheets.pdf 3x2

    # Stamp a letterhead onto every page, 1cm down
    pdf-pagetools overlay letter.pdf letterhead.pdf -o stamped.pdf --offset 0,1cm

    # Replace vector content with deduplicated image regions
    pdf-pagetools rasterize drawing.pdf -o raster.pdf --dpi 300 --chop")]
struct Cli {
    /// Show per-page details (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputOutput {
    /// Input PDF file
    input: PathBuf,

    /// Output PDF file path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove whitespace around page content
    Crop {
        #[command(flatten)]
        files: InputOutput,

        /// Background color as RRGGBB
        #[arg(long, default_value = "ffffff")]
        background: String,

        /// Resolution used to detect content
        #[arg(long, default_value_t = 72.0)]
        dpi: f64,

        /// Crop each page by its own margins instead of the same amount for all pages
        #[arg(long)]
        per_page: bool,

        /// Per-channel color difference still counted as background (0-255)
        #[arg(long, default_value_t = 0)]
        fuzz: u8,

        /// Non-background pixels a row or column may contain and still be cropped
        #[arg(long, default_value_t = 0)]
        mismatch_budget: usize,

        /// Sides to leave uncropped, e.g. "top,bottom"
        #[arg(long)]
        keep: Option<String>,

        /// Whitespace to keep around the content (1 to 4 values, CSS order)
        #[arg(long)]
        margin: Option<String>,

        /// Scale output pages to this width (e.g. 210mm)
        #[arg(long)]
        width: Option<String>,

        /// Scale output pages to this height (e.g. 297mm)
        #[arg(long)]
        height: Option<String>,

        /// Fail instead of leaving a page uncropped when rendering fails
        #[arg(long)]
        strict: bool,
    },

    /// Fit pages onto a paper size
    Pagefit {
        #[command(flatten)]
        files: InputOutput,

        /// Paper size: A3, A4, A5 or WIDTHxHEIGHT with pt, mm or cm
        #[arg(long, default_value = "A4")]
        size: String,

        /// auto, landscape or portrait
        #[arg(long, default_value = "auto")]
        orientation: String,

        /// Margins (1 to 4 values, CSS order), e.g. "1cm" or "10,20mm"
        #[arg(long)]
        margin: Option<String>,

        /// left, center or right
        #[arg(long, default_value = "center")]
        halign: String,

        /// top, center or bottom
        #[arg(long, default_value = "center")]
        valign: String,

        /// fit, cover or a scale factor
        #[arg(long, default_value = "fit")]
        scale: String,
    },

    /// Rotate pages counter-clockwise by an angle in degrees
    Rotate {
        #[command(flatten)]
        files: InputOutput,

        /// Angle in degrees, counter-clockwise
        #[arg(allow_negative_numbers = true)]
        angle: f64,
    },

    /// Arrange several pages on one sheet
    Nup {
        #[command(flatten)]
        files: InputOutput,

        /// Grid as COLSxROWS; two pages per sheet when omitted
        grid: Option<String>,
    },

    /// Draw the pages of other PDFs on top of the input's pages
    Overlay {
        #[command(flatten)]
        files: InputOutput,

        /// PDFs to draw on top, page by page, in order
        #[arg(required = true)]
        overlays: Vec<PathBuf>,

        /// Shift of the overlays as X,Y (e.g. "0,1cm")
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<String>,
    },

    /// Replace page content with rendered images
    Rasterize {
        #[command(flatten)]
        files: InputOutput,

        /// Rendering resolution
        #[arg(long, default_value_t = 600.0)]
        dpi: f64,

        /// Chop pages into opaque parts (implies --transparent)
        #[arg(short, long)]
        chop: bool,

        /// Make white pixels transparent
        #[arg(short, long)]
        transparent: bool,

        /// Turn pages into grayscale
        #[arg(short, long)]
        grayscale: bool,

        /// Mark chopped regions with red rectangles
        #[arg(short, long)]
        debug: bool,

        /// Give up on pages that split into more regions than this
        #[arg(long)]
        region_limit: Option<usize>,

        /// Fail instead of keeping the original page when rendering fails
        #[arg(long)]
        strict: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Crop {
            files,
            background,
            dpi,
            per_page,
            fuzz,
            mismatch_budget,
            keep,
            margin,
            width,
            height,
            strict,
        } => cmd_crop(
            &files,
            &background,
            dpi,
            per_page,
            fuzz,
            mismatch_budget,
            keep.as_deref(),
            margin.as_deref(),
            width.as_deref(),
            height.as_deref(),
            strict,
        ),
        Commands::Pagefit {
            files,
            size,
            orientation,
            margin,
            halign,
            valign,
            scale,
        } => cmd_pagefit(&files, &size, &orientation, margin.as_deref(), &halign, &valign, &scale),
        Commands::Rotate { files, angle } => cmd_rotate(&files, &RotateOptions { angle }),
        Commands::Nup { files, grid } => cmd_nup(&files, grid.as_deref()),
        Commands::Overlay {
            files,
            overlays,
            offset,
        } => cmd_overlay(&files, &overlays, offset.as_deref()),
        Commands::Rasterize {
            files,
            dpi,
            chop,
            transparent,
            grayscale,
            debug,
            region_limit,
            strict,
        } => {
            let options = RasterizeOptions {
                dpi,
                chop,
                transparent,
                grayscale,
                debug,
                region_limit,
                strict,
            };
            cmd_rasterize(&files, &options)
        }
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn parse_optional_margins(spec: Option<&str>) -> pdf_pagetools::Result<Margins> {
    spec.map(parse_margins).transpose().map(Option::unwrap_or_default)
}

fn ensure_input(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(())
}

/// Crop whitespace around page content
#[allow(clippy::too_many_arguments)]
fn cmd_crop(
    files: &InputOutput,
    background: &str,
    dpi: f64,
    per_page: bool,
    fuzz: u8,
    mismatch_budget: usize,
    keep: Option<&str>,
    margin: Option<&str>,
    width: Option<&str>,
    height: Option<&str>,
    strict: bool,
) -> Result<()> {
    ensure_input(&files.input)?;

    let options = CropOptions {
        background: background.parse::<Color>()?,
        dpi,
        per_page,
        fuzz,
        mismatch_budget,
        keep: keep.map(str::parse::<Sides>).transpose()?.unwrap_or_default(),
        margin: parse_optional_margins(margin)?,
        target_width: width.map(parse_length).transpose()?.map(|l| l.pt()),
        target_height: height.map(parse_length).transpose()?.map(|l| l.pt()),
        strict,
    };

    eprintln!("Cropping {}...", files.input.display());
    crop_pdf(&files.input, &files.output, &options)
        .with_context(|| format!("Failed to crop {}", files.input.display()))?;

    eprintln!("Output: {}", files.output.display());
    Ok(())
}

/// Fit pages onto paper
fn cmd_pagefit(
    files: &InputOutput,
    size: &str,
    orientation: &str,
    margin: Option<&str>,
    halign: &str,
    valign: &str,
    scale: &str,
) -> Result<()> {
    ensure_input(&files.input)?;

    let options = PagefitOptions {
        paper: parse_paper_size(size)?,
        orientation: orientation.parse::<Orientation>()?,
        margins: parse_optional_margins(margin)?,
        halign: parse_horizontal_alignment(halign)?,
        valign: parse_vertical_alignment(valign)?,
        scale: parse_scale_mode(scale)?,
    };

    eprintln!("Fitting pages of {}...", files.input.display());
    pagefit_pdf(&files.input, &files.output, &options)
        .with_context(|| format!("Failed to fit pages of {}", files.input.display()))?;

    eprintln!("Output: {}", files.output.display());
    Ok(())
}

/// Rotate pages
fn cmd_rotate(files: &InputOutput, options: &RotateOptions) -> Result<()> {
    ensure_input(&files.input)?;

    eprintln!("Rotating pages of {} by {} degrees...", files.input.display(), options.angle);
    rotate_pdf(&files.input, &files.output, options)
        .with_context(|| format!("Failed to rotate {}", files.input.display()))?;

    eprintln!("Output: {}", files.output.display());
    Ok(())
}

/// Arrange pages n-up
fn cmd_nup(files: &InputOutput, grid: Option<&str>) -> Result<()> {
    ensure_input(&files.input)?;

    let options = NupOptions {
        grid: grid.map(parse_grid).transpose()?,
    };

    eprintln!("Arranging pages of {}...", files.input.display());
    nup_pdf(&files.input, &files.output, &options)
        .with_context(|| format!("Failed to arrange {}", files.input.display()))?;

    eprintln!("Output: {}", files.output.display());
    Ok(())
}

/// Overlay other PDFs
fn cmd_overlay(files: &InputOutput, overlays: &[PathBuf], offset: Option<&str>) -> Result<()> {
    ensure_input(&files.input)?;
    for overlay in overlays {
        ensure_input(overlay)?;
    }

    let offset = match offset {
        Some(spec) => {
            let (x, y) = parse_offset(spec)?;
            (x.pt(), y.pt())
        }
        None => (0.0, 0.0),
    };

    eprintln!("Overlaying {} files onto {}...", overlays.len(), files.input.display());
    overlay_pdf(&files.input, overlays, &files.output, &OverlayOptions { offset })
        .with_context(|| format!("Failed to overlay {}", files.input.display()))?;

    eprintln!("Output: {}", files.output.display());
    Ok(())
}

/// Rasterize pages
fn cmd_rasterize(files: &InputOutput, options: &RasterizeOptions) -> Result<()> {
    ensure_input(&files.input)?;

    eprintln!("Rasterizing {} at {} dpi...", files.input.display(), options.dpi);
    rasterize_pdf(&files.input, &files.output, options)
        .with_context(|| format!("Failed to rasterize {}", files.input.display()))?;

    eprintln!("Output: {}", files.output.display());
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> Result<()> {
    ensure_input(input)?;

    let metadata = extract_metadata(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }
    for (i, size) in metadata.page_sizes.iter().enumerate() {
        println!("Page {}: {:.2} x {:.2} pt", i + 1, size.width, size.height);
    }

    Ok(())
}
