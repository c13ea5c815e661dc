use clap::Parser;
use resvg::usvg;
use std::path::PathBuf;
use tiny_skia::{Pixmap, Transform};
use tracing_subscriber::EnvFilter;

use entviz::error::{Error, Result};
use entviz::{ColorStrategy, Document, RenderOptions, ServeOptions, ThemeKind};

/// Visualize named-entity and relation annotations over text
#[derive(Parser, Debug)]
#[command(name = "entviz")]
#[command(about = "Render entity/relation annotations to HTML, SVG, PNG or PDF, or serve them over HTTP", long_about = None)]
struct Args {
    /// Input payload JSON with text, entities and optional relations
    /// (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (extension determines format: .html, .svg, .png or .pdf)
    #[arg(short, long, value_name = "OUTPUT", conflicts_with = "serve")]
    output: Option<PathBuf>,

    /// Serve the rendered page over HTTP instead of writing a file
    #[arg(long)]
    serve: bool,

    /// Host address to bind when serving
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind when serving
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Color theme: light or dark
    #[arg(short, long, default_value = "light")]
    theme: String,

    /// Entity attribute key used to assign highlight colors
    #[arg(long, value_name = "KEY")]
    color_attr: Option<String>,

    /// Page title
    #[arg(long)]
    title: Option<String>,

    /// Canvas width in pixels
    #[arg(short, long, default_value_t = 800.0)]
    width: f32,

    /// Raster scale multiplier for PNG output (e.g. 2.0 for sharper output)
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Read payload input
    let payload = if args.input.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)?
    };

    let value: serde_json::Value =
        serde_json::from_str(&payload).map_err(|_| Error::TypeMismatch {
            field: "payload",
            expected: "a JSON object",
        })?;
    let document = Document::from_json(&value)?;

    let mut options = RenderOptions::default()
        .with_theme(args.theme.parse::<ThemeKind>()?)
        .with_width(args.width);
    if let Some(key) = args.color_attr {
        options = options.with_color(ColorStrategy::AttrKey(key));
    }
    if let Some(title) = args.title {
        options = options.with_title(title);
    }

    if args.serve {
        return entviz::serve(&document, &options, &ServeOptions::new(args.host, args.port));
    }

    let output = args.output.ok_or(Error::TypeMismatch {
        field: "output",
        expected: "a path (or pass --serve)",
    })?;

    let output_ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match output_ext.as_str() {
        "html" => {
            let html = entviz::render(&document, &options)?;
            std::fs::write(&output, html)?;
            eprintln!("HTML saved to: {}", output.display());
        }
        "svg" => {
            let svg = entviz::render_svg(&document, &options)?;
            std::fs::write(&output, svg)?;
            eprintln!("SVG saved to: {}", output.display());
        }
        "png" => {
            let svg = entviz::render_svg(&document, &options)?;
            let png_data = svg_to_png(&svg, args.png_scale)?;
            std::fs::write(&output, png_data)?;
            eprintln!("PNG saved to: {}", output.display());
        }
        "pdf" => {
            let svg = entviz::render_svg(&document, &options)?;
            let pdf_data = svg_to_pdf(&svg)?;
            std::fs::write(&output, pdf_data)?;
            eprintln!("PDF saved to: {}", output.display());
        }
        other => {
            return Err(Error::Export {
                message: format!(
                    "unsupported output format: .{other} (use .html, .svg, .png or .pdf)"
                ),
            });
        }
    }

    Ok(())
}

fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::Export {
            message: format!("invalid --png-scale value: {scale}"),
        });
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();
        if let Some(family) =
            generic_sans_family(fontdb.faces().flat_map(|f| &f.families)).map(str::to_string)
        {
            fontdb.set_sans_serif_family(family);
        }
    }

    let tree = usvg::Tree::from_str(svg, &opts).map_err(|e| Error::Export {
        message: format!("failed to parse SVG: {e}"),
    })?;

    let png_width = (tree.size().width() * scale).ceil() as u32;
    let png_height = (tree.size().height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(png_width, png_height).ok_or(Error::Export {
        message: "failed to create pixmap".to_string(),
    })?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap.encode_png().map_err(|e| Error::Export {
        message: format!("failed to encode PNG: {e}"),
    })
}

fn svg_to_pdf(svg: &str) -> Result<Vec<u8>> {
    use svg2pdf::usvg::fontdb;

    let mut fontdb = fontdb::Database::new();
    fontdb.load_system_fonts();
    if let Some(family) =
        generic_sans_family(fontdb.faces().flat_map(|f| &f.families)).map(str::to_string)
    {
        fontdb.set_sans_serif_family(family);
    }

    let mut opts = svg2pdf::usvg::Options::default();
    opts.fontdb = std::sync::Arc::new(fontdb);

    let tree = svg2pdf::usvg::Tree::from_str(svg, &opts).map_err(|e| Error::Export {
        message: format!("failed to parse SVG: {e}"),
    })?;

    // Keep text as paths so the PDF survives viewers without the fonts.
    let mut options = svg2pdf::ConversionOptions::default();
    options.embed_text = false;

    svg2pdf::to_pdf(&tree, options, svg2pdf::PageOptions::default()).map_err(|e| Error::Export {
        message: format!("failed to convert SVG to PDF: {e}"),
    })
}

/// Picks a family to stand in for `sans-serif`: the first family with
/// "sans" in its name, else the first family at all. Generic because resvg
/// and svg2pdf each bundle their own fontdb.
fn generic_sans_family<'a, L: 'a, I>(families: I) -> Option<&'a str>
where
    I: Iterator<Item = &'a (String, L)>,
{
    let mut first: Option<&str> = None;
    for (family, _) in families {
        if first.is_none() {
            first = Some(family);
        }
        if family.to_ascii_lowercase().contains("sans") {
            return Some(family);
        }
    }
    first
}
