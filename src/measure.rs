use std::collections::HashMap;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping};

/// Line height relative to font size, shared by measurement and layout.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

pub trait TextMeasure {
    /// Width and height of `text` laid out on a single unbounded line.
    fn measure(&mut self, text: &str, font_size: f32) -> (f32, f32);
}

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    font_size_bits: u32,
}

pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: HashMap<MeasureKey, (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            cache: HashMap::new(),
        }
    }

    fn has_fonts(&self) -> bool {
        self.font_system.db().faces().next().is_some()
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure(&mut self, text: &str, font_size: f32) -> (f32, f32) {
        let key = MeasureKey {
            text: text.to_string(),
            font_size_bits: font_size.to_bits(),
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height: font_size * LINE_HEIGHT_FACTOR,
            },
        );

        buffer.set_size(&mut self.font_system, None, None);

        let attrs = Attrs::new().family(Family::SansSerif);
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;
        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += run.line_height;
        }

        let measured = (total_width, total_height);
        self.cache.insert(key, measured);
        measured
    }
}

/// Fixed per-glyph advances, used when the host exposes no fonts. Keeps
/// layout deterministic in stripped-down environments (containers, CI).
pub struct HeuristicMeasure;

impl HeuristicMeasure {
    fn advance(c: char) -> f32 {
        match c {
            'i' | 'j' | 'l' | '!' | '|' | '.' | ',' | '\'' | ':' | ';' => 0.28,
            'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.36,
            'm' | 'w' | 'M' | 'W' | '@' => 0.85,
            ' ' => 0.30,
            c if c.is_ascii_uppercase() => 0.68,
            c if c.is_ascii_digit() => 0.55,
            c if (c as u32) >= 0x2E80 => 1.0,
            _ => 0.52,
        }
    }
}

impl TextMeasure for HeuristicMeasure {
    fn measure(&mut self, text: &str, font_size: f32) -> (f32, f32) {
        let width: f32 = text.chars().map(Self::advance).sum::<f32>() * font_size;
        (width, font_size * LINE_HEIGHT_FACTOR)
    }
}

/// Real font metrics when available, heuristic advances otherwise.
pub fn default_measure() -> Box<dyn TextMeasure> {
    let cosmic = CosmicTextMeasure::new();
    if cosmic.has_fonts() {
        Box::new(cosmic)
    } else {
        Box::new(HeuristicMeasure)
    }
}

#[cfg(test)]
mod tests {
    use super::{HeuristicMeasure, TextMeasure};

    #[test]
    fn heuristic_widths_grow_with_text() {
        let mut measure = HeuristicMeasure;
        let (short, _) = measure.measure("ab", 16.0);
        let (long, _) = measure.measure("abcdef", 16.0);
        assert!(long > short);
        assert!(short > 0.0);
    }

    #[test]
    fn heuristic_is_deterministic() {
        let mut measure = HeuristicMeasure;
        assert_eq!(
            measure.measure("Barack Obama", 16.0),
            measure.measure("Barack Obama", 16.0)
        );
    }
}
