use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lopdf::Document;
use planmark_engine::overlay::{Color, OverlaySession};
use planmark_engine::transform::{PageGeometry, Point};
use planmark_engine::{document, search_text, SearchHit};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Exit codes by failure class.
pub mod exit_code {
    pub const INTERNAL: i32 = 1;
    pub const OPEN: i32 = 2;
    pub const EXTRACT: i32 = 3;
    pub const SAVE: i32 = 4;
    pub const DRAW: i32 = 5;
    pub const BEGIN: i32 = 6;
}

/// A CLI failure tagged with its process exit code.
#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub source: anyhow::Error,
}

impl CliError {
    fn new(code: i32, source: anyhow::Error) -> Self {
        Self { code, source }
    }
}

trait ExitClass<T> {
    /// Tag any error from this result with an exit code class.
    fn exit_class(self, code: i32) -> Result<T, CliError>;
}

impl<T, E: Into<anyhow::Error>> ExitClass<T> for Result<T, E> {
    fn exit_class(self, code: i32) -> Result<T, CliError> {
        self.map_err(|source| CliError::new(code, source.into()))
    }
}

#[derive(Debug, Parser)]
#[command(name = "planmark-cli")]
#[command(about = "Plan-set overlay and search CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Search the document text layer and print hits as JSON.
    Search {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "NEEDLE")]
        needle: String,
        #[arg(long, default_value_t = 100)]
        max_results: usize,
    },
    /// Stamp a rectangle onto one page and write the result.
    StampRect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        x: f32,
        #[arg(long)]
        y: f32,
        #[arg(long)]
        width: f32,
        #[arg(long)]
        height: f32,
        #[arg(long)]
        filled: bool,
        /// Hex color as RRGGBB.
        #[arg(long, default_value = "FF0000")]
        color: String,
        #[arg(long, default_value_t = 1.0)]
        alpha: f32,
        #[arg(long, default_value_t = 1.0)]
        thickness: f32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    recognition_supported: bool,
    first_page_size_pt: Option<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct HitOutput {
    page_index: u32,
    text: String,
    /// Corner points in UL, UR, LR, LL order, native page coordinates.
    corners: [[f32; 2]; 4],
}

impl From<&SearchHit> for HitOutput {
    fn from(hit: &SearchHit) -> Self {
        let corners = hit.corners().map(|p| [p.x, p.y]);
        Self { page_index: hit.page_index, text: hit.text.clone(), corners }
    }
}

pub fn run<I, T>(args: I) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Search { file, needle, max_results } => run_search(&file, &needle, max_results),
        Commands::StampRect {
            file,
            page,
            x,
            y,
            width,
            height,
            filled,
            color,
            alpha,
            thickness,
            output,
        } => {
            let color = parse_color(&color).exit_class(exit_code::INTERNAL)?;
            run_stamp_rect(
                &file,
                page,
                Point::new(x, y),
                width,
                height,
                filled,
                color,
                alpha,
                thickness,
                &output,
            )
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_document(file: &Path) -> Result<Document, CliError> {
    ensure_pdf_exists(file).exit_class(exit_code::OPEN)?;
    Document::load(file)
        .with_context(|| format!("failed to open PDF: {}", file.display()))
        .exit_class(exit_code::OPEN)
}

fn run_info(file: &Path) -> Result<(), CliError> {
    let doc = open_document(file)?;

    let page_count = document::page_count(&doc);
    let first_page_size_pt = document::page_object_id(&doc, 0).map(|page_id| {
        let geometry = PageGeometry::resolve(&doc, page_id);
        PageSizeOutput { width: geometry.view_width, height: geometry.view_height }
    });

    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count,
        recognition_supported: planmark_engine::recognition_supported(),
        first_page_size_pt,
    };

    let json = serde_json::to_string_pretty(&payload).exit_class(exit_code::INTERNAL)?;
    println!("{json}");
    Ok(())
}

fn run_search(file: &Path, needle: &str, max_results: usize) -> Result<(), CliError> {
    let doc = open_document(file)?;

    let hits = search_text(&doc, needle, max_results, None)
        .map_err(anyhow::Error::from)
        .context("failed to extract document text")
        .exit_class(exit_code::EXTRACT)?;

    let payload: Vec<HitOutput> = hits.iter().map(HitOutput::from).collect();
    let json = serde_json::to_string_pretty(&payload).exit_class(exit_code::INTERNAL)?;
    println!("{json}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_stamp_rect(
    file: &Path,
    page: u32,
    origin: Point,
    width: f32,
    height: f32,
    filled: bool,
    color: Color,
    alpha: f32,
    thickness: f32,
    output: &Path,
) -> Result<(), CliError> {
    if page == 0 {
        return Err(CliError::new(
            exit_code::BEGIN,
            anyhow::anyhow!("--page is 1-based and must be >= 1"),
        ));
    }

    let mut doc = open_document(file)?;

    let mut session = OverlaySession::begin(&mut doc, page - 1)
        .map_err(anyhow::Error::from)
        .context("failed to open overlay session")
        .exit_class(exit_code::BEGIN)?;
    session
        .draw_rect(origin, width, height, thickness, color, alpha, filled)
        .map_err(anyhow::Error::from)
        .context("failed to draw rectangle")
        .exit_class(exit_code::DRAW)?;
    session
        .end()
        .map_err(anyhow::Error::from)
        .context("failed to commit overlay")
        .exit_class(exit_code::INTERNAL)?;

    doc.save(output)
        .with_context(|| format!("failed to save PDF to {}", output.display()))
        .exit_class(exit_code::SAVE)?;

    println!("{}", output.display());
    Ok(())
}

fn parse_color(hex: &str) -> Result<Color> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        anyhow::bail!("color must be RRGGBB, got {hex:?}");
    }
    let r = u8::from_str_radix(&hex[0..2], 16).context("invalid red component")?;
    let g = u8::from_str_radix(&hex[2..4], 16).context("invalid green component")?;
    let b = u8::from_str_radix(&hex[4..6], 16).context("invalid blue component")?;
    Ok(Color::new(r, g, b))
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_hex_with_or_without_hash() {
        assert_eq!(parse_color("FF0000").unwrap(), Color::RED);
        assert_eq!(parse_color("#00ff00").unwrap(), Color::new(0, 255, 0));
        assert!(parse_color("red").is_err());
        assert!(parse_color("FFAA").is_err());
    }

    #[test]
    fn color_rejects_non_ascii_without_panicking() {
        // Six bytes but two chars; must be a plain parse error.
        assert!(parse_color("€€").is_err());
        assert!(parse_color("#€€").is_err());
    }

    #[test]
    fn exit_class_tags_any_error_type() {
        let parse: Result<serde_json::Value, serde_json::Error> = serde_json::from_str("{");
        let tagged = parse.exit_class(exit_code::INTERNAL).unwrap_err();
        assert_eq!(tagged.code, exit_code::INTERNAL);

        let open: anyhow::Result<()> = Err(anyhow::anyhow!("no such file"));
        assert_eq!(open.exit_class(exit_code::OPEN).unwrap_err().code, exit_code::OPEN);
    }
}
