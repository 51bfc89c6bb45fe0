//! pdf-guard - command-line front end
//!
//! Usage:
//!   pdf-guard info <file>                     Page count and document metadata
//!   pdf-guard outline <file>                  Bookmark tree as JSON
//!   pdf-guard links <file> --page N           Links of one page as JSON
//!   pdf-guard text <file> --page N            Structured text of one page
//!   pdf-guard render <file> --page N -o out   Render one page to PNG

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand};
use pdf_guard::{
    Colorspace, Context, ContextConfig, DocumentHandle, Handle, Matrix, PageHandle, PdfiumBackend,
    TextOptions,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pdf-guard", version, about = "Inspect and render PDFs through the guarded adapter")]
struct Cli {
    /// Directory holding the PDFium shared library
    #[arg(long, global = true)]
    library_path: Option<PathBuf>,

    /// Maximum render scale factor
    #[arg(long, global = true, default_value_t = 10.0)]
    max_scale: f32,

    /// Maximum rendered pixel area
    #[arg(long, global = true, default_value_t = 100_000_000)]
    max_pixels: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print page count, title, author and format
    Info { file: PathBuf },

    /// Print the outline (bookmarks)
    Outline { file: PathBuf },

    /// Print the links of a page
    Links {
        file: PathBuf,
        /// Zero-based page index
        #[arg(long)]
        page: i32,
    },

    /// Print the structured text of a page
    Text {
        file: PathBuf,
        #[arg(long)]
        page: i32,
        #[arg(long)]
        dehyphenate: bool,
        #[arg(long)]
        preserve_whitespace: bool,
        #[arg(long)]
        inhibit_spaces: bool,
    },

    /// Render a page to a PNG file
    Render {
        file: PathBuf,
        #[arg(long)]
        page: i32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        /// Render in grayscale instead of RGB
        #[arg(long)]
        gray: bool,
        /// Add an alpha channel
        #[arg(long)]
        alpha: bool,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct InfoOutput {
    pages: i32,
    title: Option<String>,
    author: Option<String>,
    format: Option<String>,
}

#[derive(Serialize)]
struct TextOutput {
    text: String,
    blocks: usize,
    lines: usize,
    words: usize,
}

#[derive(Serialize)]
struct RenderOutput {
    output: String,
    width: u32,
    height: u32,
}

type PdfContext = Context<PdfiumBackend>;

/// Turn a sentinel into an error carrying the context's last failure.
fn check<K>(ctx: &PdfContext, handle: Handle<K>) -> Result<Handle<K>> {
    if handle.is_null() {
        Err(last_failure(ctx))
    } else {
        Ok(handle)
    }
}

fn last_failure(ctx: &PdfContext) -> anyhow::Error {
    match ctx.last_error() {
        Some(record) => anyhow!("{} failed: {}", record.operation, record.message),
        None => anyhow!("operation failed"),
    }
}

fn open(ctx: &PdfContext, file: &Path) -> Result<DocumentHandle> {
    check(ctx, ctx.open_document(file))
}

fn open_page(ctx: &PdfContext, file: &Path, page: i32) -> Result<PageHandle> {
    let doc = open(ctx, file)?;
    check(ctx, ctx.load_page(doc, page))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(ctx: &PdfContext, command: Command) -> Result<()> {
    match command {
        Command::Info { file } => {
            let doc = open(ctx, &file)?;
            let pages = ctx.count_pages(doc);
            if pages < 0 {
                return Err(last_failure(ctx));
            }
            print_json(&InfoOutput {
                pages,
                title: ctx.lookup_metadata(doc, "info:Title"),
                author: ctx.lookup_metadata(doc, "info:Author"),
                format: ctx.lookup_metadata(doc, "format"),
            })
        }
        Command::Outline { file } => {
            let doc = open(ctx, &file)?;
            let outline = check(ctx, ctx.load_outline(doc))?;
            let outline = ctx.outline(outline).ok_or_else(|| last_failure(ctx))?;
            print_json(&outline.items)
        }
        Command::Links { file, page } => {
            let page = open_page(ctx, &file, page)?;
            let links = check(ctx, ctx.load_links(page))?;
            let links = ctx.links(links).ok_or_else(|| last_failure(ctx))?;
            print_json(&*links)
        }
        Command::Text {
            file,
            page,
            dehyphenate,
            preserve_whitespace,
            inhibit_spaces,
        } => {
            let mut options = TextOptions::default();
            if dehyphenate {
                options = options.with(TextOptions::DEHYPHENATE);
            }
            if preserve_whitespace {
                options = options.with(TextOptions::PRESERVE_WHITESPACE);
            }
            if inhibit_spaces {
                options = options.with(TextOptions::INHIBIT_SPACES);
            }

            let page = open_page(ctx, &file, page)?;
            let text_page = check(ctx, ctx.new_stext_page_from_page(page, options))?;
            let text_page = ctx.text_page(text_page).ok_or_else(|| last_failure(ctx))?;
            print_json(&TextOutput {
                text: text_page.text(),
                blocks: text_page.blocks.len(),
                lines: text_page.line_count(),
                words: text_page.words().len(),
            })
        }
        Command::Render {
            file,
            page,
            scale,
            gray,
            alpha,
            output,
        } => {
            let colorspace = if gray { Colorspace::Gray } else { Colorspace::Rgb };
            let page = open_page(ctx, &file, page)?;
            let pixmap = check(
                ctx,
                ctx.new_pixmap_from_page(page, Matrix::scale(scale, scale), colorspace, alpha),
            )?;
            let pixmap = ctx.pixmap(pixmap).ok_or_else(|| last_failure(ctx))?;

            std::fs::write(&output, pixmap.to_png()?)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(output = %output.display(), "page rendered");

            print_json(&RenderOutput {
                output: output.display().to_string(),
                width: pixmap.width,
                height: pixmap.height,
            })
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_guard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ContextConfig {
        library_path: cli.library_path,
        max_render_scale: cli.max_scale,
        max_render_pixels: cli.max_pixels,
    };

    let ctx = Context::pdfium(config)?;
    run(&ctx, cli.command)
}
