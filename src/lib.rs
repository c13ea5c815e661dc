//! Render named-entity and relation annotations over a text span.
//!
//! The layout engine segments the text into plain and annotated runs, wraps
//! lines at whitespace against real font metrics, stacks overlapping
//! highlights and routes rounded connectors between related spans. The
//! result is a deterministic SVG canvas, either standalone or embedded in a
//! self-contained HTML page with filter and table panels.
//!
//! ```no_run
//! use entviz::{Document, Entity, Relation, RenderOptions};
//!
//! let document = Document::new(
//!     "Barack Obama was born in Hawaii.",
//!     vec![Entity::new("1", 0, 12), Entity::new("2", 27, 33)],
//!     vec![Relation::new("1", "2")],
//! );
//! let html = entviz::render(&document, &RenderOptions::default())?;
//! # Ok::<(), entviz::Error>(())
//! ```

pub mod color;
pub mod connector;
pub mod error;
pub mod layout;
pub mod measure;
pub mod model;
pub mod page;
pub mod server;
pub mod svg;
pub mod theme;

pub use color::{ColorMapper, ColorSpec, ColorStrategy};
pub use error::{Error, Result};
pub use model::{Document, Entity, Relation};
pub use server::ServeOptions;
pub use theme::{Theme, ThemeColor, ThemeKind};

const DEFAULT_TITLE: &str = "Named Entity Visualization";
const DEFAULT_WIDTH: f32 = 800.0;

/// Rendering knobs shared by [`render`], [`render_svg`] and [`serve`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub theme: ThemeKind,
    pub color: ColorStrategy,
    pub title: String,
    pub width: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: ThemeKind::Light,
            color: ColorStrategy::Payload,
            title: DEFAULT_TITLE.to_string(),
            width: DEFAULT_WIDTH,
        }
    }
}

impl RenderOptions {
    pub fn with_theme(mut self, theme: ThemeKind) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_color(mut self, color: ColorStrategy) -> Self {
        self.color = color;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }
}

/// Validates the document and runs the color strategy over a clone of its
/// entities; the caller's data is never touched.
fn colored_entities(document: &Document, options: &RenderOptions) -> Result<Vec<Entity>> {
    document.validate()?;
    let mut entities = document.entities.clone();
    color::assign_colors(&mut entities, &options.color, options.theme)?;
    Ok(entities)
}

fn build_canvas(document: &Document, entities: &[Entity], options: &RenderOptions) -> Result<String> {
    let mut measure = measure::default_measure();
    let text_layout = layout::lay_out(&document.text, entities, measure.as_mut(), options.width);
    tracing::debug!(
        lines = text_layout.line_count,
        boxes = text_layout.boxes.len(),
        "laid out annotation canvas"
    );
    let connectors = connector::route(&document.relations, &text_layout)?;
    Ok(svg::canvas(&text_layout, &connectors, &options.theme.theme()))
}

/// Renders the full self-contained HTML page. Pure: identical inputs yield
/// byte-identical output, and no network or filesystem is touched.
pub fn render(document: &Document, options: &RenderOptions) -> Result<String> {
    let entities = colored_entities(document, options)?;
    let canvas = build_canvas(document, &entities, options)?;
    page::render_page(
        &document.text,
        &entities,
        &document.relations,
        &canvas,
        options.theme,
        &options.title,
    )
}

/// Renders just the annotation canvas as an SVG document.
pub fn render_svg(document: &Document, options: &RenderOptions) -> Result<String> {
    let entities = colored_entities(document, options)?;
    build_canvas(document, &entities, options)
}

/// Renders the page, binds `host:port` and serves it at the root path until
/// terminated. Validation and rendering failures abort before the socket is
/// bound.
pub fn serve(
    document: &Document,
    options: &RenderOptions,
    serve_options: &ServeOptions,
) -> Result<()> {
    let page = render(document, options)?;
    server::serve_page(page, serve_options)
}
