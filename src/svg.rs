use crate::connector::Connector;
use crate::layout::{FONT_SIZE, HIGHLIGHT_RADIUS, TextLayout};
use crate::theme::Theme;

const CONNECTOR_STROKE_WIDTH: f32 = 1.5;

/// XML 1.0 valid char ranges:
/// - 0x09, 0x0A, 0x0D
/// - 0x20..=0xD7FF
/// - 0xE000..=0xFFFD
/// - 0x10000..=0x10FFFF
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if !is_valid_xml_char(c) {
            continue;
        }
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Assembles the annotation canvas: background, highlight boxes (outermost
/// first), text runs, then connector paths on top. Content shifts down when
/// stacked arcs would otherwise poke above the canvas.
pub fn canvas(layout: &TextLayout, connectors: &[Connector], theme: &Theme) -> String {
    let overshoot = connectors
        .iter()
        .map(|c| c.top - CONNECTOR_STROKE_WIDTH)
        .fold(0.0f32, f32::min);
    let shift = -overshoot.min(0.0);
    let height = layout.height + shift;

    let mut content = String::new();

    for hbox in &layout.boxes {
        let fill = hbox
            .color
            .as_deref()
            .unwrap_or(&theme.default_highlight_color);
        content.push_str(&format!(
            r#"<rect class="entity-box" data-entity-id="{}" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}" />"#,
            escape_xml(&hbox.entity_id),
            hbox.rect.x,
            hbox.rect.y,
            hbox.rect.width,
            hbox.rect.height,
            HIGHLIGHT_RADIUS,
            escape_xml(fill),
        ));
    }

    for run in &layout.runs {
        content.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="{:.2}" fill="{}">{}</text>"#,
            run.x,
            run.y,
            FONT_SIZE,
            theme.text_color,
            escape_xml(&run.text),
        ));
    }

    for connector in connectors {
        content.push_str(&format!(
            r#"<path class="relation-path" data-relation-index="{}" data-entity1="{}" data-entity2="{}" d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="round" />"#,
            connector.index,
            escape_xml(&connector.entity_1_id),
            escape_xml(&connector.entity_2_id),
            connector.path,
            theme.connector_color,
            CONNECTOR_STROKE_WIDTH,
        ));
    }

    let group = if shift > 0.0 {
        format!(r#"<g transform="translate(0 {shift:.2})">{content}</g>"#)
    } else {
        format!("<g>{content}</g>")
    };

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}"><rect width="100%" height="100%" fill="{}" />{}</svg>"#,
        layout.width, height, layout.width, height, theme.background_color, group,
    )
}

#[cfg(test)]
mod tests {
    use super::{canvas, escape_xml};
    use crate::connector::route;
    use crate::layout::lay_out;
    use crate::measure::HeuristicMeasure;
    use crate::model::{Entity, Relation};
    use crate::theme::Theme;

    #[test]
    fn escape_special_xml_chars() {
        let s = r#"<tag attr="x&y">'z'"#;
        assert_eq!(
            escape_xml(s),
            "&lt;tag attr=&quot;x&amp;y&quot;&gt;&apos;z&apos;"
        );
    }

    #[test]
    fn remove_invalid_control_chars() {
        assert_eq!(escape_xml("A\u{0007}B\u{000C}C"), "ABC");
    }

    #[test]
    fn canvas_contains_boxes_text_and_connectors() {
        let entities = vec![Entity::new("1", 0, 12), Entity::new("2", 27, 33)];
        let layout = lay_out(
            "Barack Obama was born in Hawaii.",
            &entities,
            &mut HeuristicMeasure,
            800.0,
        );
        let connectors = route(&[Relation::new("1", "2")], &layout).unwrap();
        let svg = canvas(&layout, &connectors, &Theme::light());

        assert!(svg.starts_with("<svg "));
        assert_eq!(svg.matches("entity-box").count(), 2);
        assert_eq!(svg.matches("relation-path").count(), 1);
        assert!(svg.contains("Barack"));
        assert!(svg.contains("Hawaii."));
    }

    #[test]
    fn entity_ids_are_escaped_in_attributes() {
        let entities = vec![Entity::new(r#"a"b"#, 0, 4)];
        let layout = lay_out("text", &entities, &mut HeuristicMeasure, 800.0);
        let svg = canvas(&layout, &[], &Theme::light());
        assert!(svg.contains("a&quot;b"));
    }
}
