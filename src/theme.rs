use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const LIGHT_BACKGROUND: &str = "#ffffff";
const LIGHT_TEXT: &str = "#24292f";
const LIGHT_SURFACE: &str = "#f6f8fa";
const LIGHT_BORDER: &str = "#d0d7de";
const LIGHT_CONNECTOR: &str = "#57606a";
const LIGHT_HIGHLIGHT: &str = "#fff3b0";

const DARK_BACKGROUND: &str = "#1e1e2e";
const DARK_TEXT: &str = "#e6e6f0";
const DARK_SURFACE: &str = "#2a2a3c";
const DARK_BORDER: &str = "#44445a";
const DARK_CONNECTOR: &str = "#a6adc8";
const DARK_HIGHLIGHT: &str = "#5a5120";

const PALETTES: &[(ThemeKind, &str)] = &[
    (ThemeKind::Light, include_str!("../themes/light.toml")),
    (ThemeKind::Dark, include_str!("../themes/dark.toml")),
];

/// One named palette entry; the ordered palette drives cyclic
/// attribute-based color assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeColor {
    pub color_name: String,
    pub color_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeKind {
    #[default]
    Light,
    Dark,
}

impl ThemeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeKind::Light => "light",
            ThemeKind::Dark => "dark",
        }
    }

    pub fn theme(&self) -> Theme {
        match self {
            ThemeKind::Light => Theme::light(),
            ThemeKind::Dark => Theme::dark(),
        }
    }

    /// The ordered color palette for this theme, parsed from the embedded
    /// palette asset.
    pub fn palette(&self) -> Result<Vec<ThemeColor>> {
        let content = PALETTES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, content)| *content)
            .unwrap_or_default();

        let file: PaletteFile = toml::from_str(content).map_err(|e| Error::MalformedPalette {
            message: e.to_string(),
        })?;
        Ok(file.colors)
    }
}

impl FromStr for ThemeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemeKind::Light),
            "dark" => Ok(ThemeKind::Dark),
            other => Err(Error::UnknownTheme {
                name: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaletteFile {
    colors: Vec<ThemeColor>,
}

/// Page and canvas styling for one theme.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background_color: String,
    pub text_color: String,
    pub surface_color: String,
    pub border_color: String,
    pub connector_color: String,
    /// Fill for entities that end the color-assignment pass without a color.
    pub default_highlight_color: String,
}

impl Theme {
    pub fn light() -> Self {
        Theme {
            background_color: LIGHT_BACKGROUND.to_string(),
            text_color: LIGHT_TEXT.to_string(),
            surface_color: LIGHT_SURFACE.to_string(),
            border_color: LIGHT_BORDER.to_string(),
            connector_color: LIGHT_CONNECTOR.to_string(),
            default_highlight_color: LIGHT_HIGHLIGHT.to_string(),
        }
    }

    pub fn dark() -> Self {
        Theme {
            background_color: DARK_BACKGROUND.to_string(),
            text_color: DARK_TEXT.to_string(),
            surface_color: DARK_SURFACE.to_string(),
            border_color: DARK_BORDER.to_string(),
            connector_color: DARK_CONNECTOR.to_string(),
            default_highlight_color: DARK_HIGHLIGHT.to_string(),
        }
    }
}

/// Looks a color name up against the union of both palettes, light first.
pub fn resolve_named_color(name: &str) -> Result<Option<String>> {
    for kind in [ThemeKind::Light, ThemeKind::Dark] {
        if let Some(color) = kind
            .palette()?
            .iter()
            .find(|c| c.color_name.eq_ignore_ascii_case(name))
        {
            return Ok(Some(color.color_code.clone()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::{ThemeKind, resolve_named_color};
    use crate::error::Error;

    #[test]
    fn both_palettes_parse_and_are_non_empty() {
        for kind in [ThemeKind::Light, ThemeKind::Dark] {
            let palette = kind.palette().expect("embedded palette must parse");
            assert!(!palette.is_empty());
            for color in &palette {
                assert!(color.color_code.starts_with('#'), "{:?}", color);
            }
        }
    }

    #[test]
    fn theme_names_parse_case_insensitively() {
        assert_eq!("Light".parse::<ThemeKind>().unwrap(), ThemeKind::Light);
        assert_eq!(" DARK ".parse::<ThemeKind>().unwrap(), ThemeKind::Dark);
        assert!(matches!(
            "sepia".parse::<ThemeKind>(),
            Err(Error::UnknownTheme { name }) if name == "sepia"
        ));
    }

    #[test]
    fn named_lookup_prefers_light_palette() {
        let blue = resolve_named_color("blue").unwrap().unwrap();
        assert_eq!(blue, "#1f77b4");
        assert!(resolve_named_color("no-such-color").unwrap().is_none());
    }
}
