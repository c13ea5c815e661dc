use std::collections::BTreeMap;

use crate::measure::TextMeasure;
use crate::model::Entity;

pub const FONT_SIZE: f32 = 16.0;
pub const PADDING_X: f32 = 32.0;
pub const PADDING_Y: f32 = 32.0;
/// Vertical slot per text line, as a multiple of the font size. Leaves
/// headroom above each line for connector arcs and stacked highlights.
pub const LINE_SPACING: f32 = 2.4;
pub const HIGHLIGHT_PAD_X: f32 = 2.0;
pub const HIGHLIGHT_PAD_Y: f32 = 3.0;
pub const HIGHLIGHT_RADIUS: f32 = 3.0;
/// Vertical inset per overlap level, so stacked highlights read as nested
/// boxes instead of one merged block.
pub const STACK_INSET: f32 = 2.5;
/// Overlap levels deeper than this draw at the clamped inset.
pub const MAX_STACK_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top_center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y)
    }

    pub fn top_right(&self) -> (f32, f32) {
        (self.right(), self.y)
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.y + other.height <= self.y + self.height
    }
}

/// A positioned piece of text; `y` is the baseline.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// One highlight rectangle for one entity on one line.
#[derive(Debug, Clone)]
pub struct HighlightBox {
    pub entity_id: String,
    pub rect: Rect,
    pub depth: usize,
    pub color: Option<String>,
}

/// The laid-out text block: text runs, highlight boxes in draw order
/// (outermost first) and per-entity anchor boxes for connector routing.
#[derive(Debug, Clone)]
pub struct TextLayout {
    pub width: f32,
    pub height: f32,
    pub line_count: usize,
    pub runs: Vec<TextRun>,
    pub boxes: Vec<HighlightBox>,
    pub anchors: BTreeMap<String, Vec<Rect>>,
}

/// A word piece or covered whitespace placed during the flow pass. Pieces
/// never cross an entity boundary, so coverage is uniform within one.
struct Fragment {
    line: usize,
    x: f32,
    width: f32,
    text: String,
    covering: Vec<usize>,
}

pub fn lay_out(
    text: &str,
    entities: &[Entity],
    measure: &mut dyn TextMeasure,
    width: f32,
) -> TextLayout {
    let chars: Vec<char> = text.chars().collect();

    // Longer span first on equal starts, so nested spans draw as contained
    // boxes and ties resolve deterministically.
    let mut order: Vec<usize> = (0..entities.len()).collect();
    order.sort_by(|&a, &b| {
        entities[a]
            .start
            .cmp(&entities[b].start)
            .then(entities[b].end.cmp(&entities[a].end))
    });

    let mut rank = vec![0usize; entities.len()];
    for (pos, &i) in order.iter().enumerate() {
        rank[i] = pos;
    }

    // Overlap level: how many earlier-ranked entities overlap this one.
    let mut depth = vec![0usize; entities.len()];
    for (pos, &i) in order.iter().enumerate() {
        let overlapping = order[..pos]
            .iter()
            .filter(|&&j| entities[j].end > entities[i].start && entities[j].start < entities[i].end)
            .count();
        depth[i] = overlapping.min(MAX_STACK_DEPTH);
    }

    let covering_of = |a: usize, b: usize| -> Vec<usize> {
        let mut covering: Vec<usize> = (0..entities.len())
            .filter(|&e| entities[e].start <= a && entities[e].end >= b)
            .collect();
        covering.sort_by_key(|&e| rank[e]);
        covering
    };

    let boundary_within = |a: usize, b: usize| -> Vec<usize> {
        let mut points: Vec<usize> = entities
            .iter()
            .flat_map(|e| [e.start, e.end])
            .filter(|&p| p > a && p < b)
            .collect();
        points.sort_unstable();
        points.dedup();
        points
    };

    let right_edge = width - PADDING_X;
    let (space_width, _) = measure.measure(" ", FONT_SIZE);
    let space_width = if space_width > 0.0 {
        space_width
    } else {
        FONT_SIZE * 0.3
    };

    let mut fragments: Vec<Fragment> = Vec::new();
    let mut cursor_x = PADDING_X;
    let mut line = 0usize;
    let mut at_line_start = true;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            cursor_x = PADDING_X;
            at_line_start = true;
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            if !at_line_start {
                if cursor_x + space_width > right_edge {
                    line += 1;
                    cursor_x = PADDING_X;
                    at_line_start = true;
                } else {
                    let covering = covering_of(i, i + 1);
                    if !covering.is_empty() {
                        fragments.push(Fragment {
                            line,
                            x: cursor_x,
                            width: space_width,
                            text: String::new(),
                            covering,
                        });
                    }
                    cursor_x += space_width;
                }
            }
            i += 1;
            continue;
        }

        // Word: breaks happen only at whitespace, never inside it, so the
        // whole word is measured before the wrap decision.
        let mut j = i;
        while j < chars.len() && !chars[j].is_whitespace() {
            j += 1;
        }

        let mut pieces = Vec::new();
        let mut a = i;
        for b in boundary_within(i, j).into_iter().chain([j]) {
            let piece: String = chars[a..b].iter().collect();
            let (piece_width, _) = measure.measure(&piece, FONT_SIZE);
            pieces.push((piece, piece_width, covering_of(a, b)));
            a = b;
        }

        let word_width: f32 = pieces.iter().map(|(_, w, _)| w).sum();
        if !at_line_start && cursor_x + word_width > right_edge {
            line += 1;
            cursor_x = PADDING_X;
        }

        for (piece, piece_width, covering) in pieces {
            fragments.push(Fragment {
                line,
                x: cursor_x,
                width: piece_width,
                text: piece,
                covering,
            });
            cursor_x += piece_width;
        }
        at_line_start = false;
        i = j;
    }

    let line_count = line + 1;
    let slot = FONT_SIZE * LINE_SPACING;
    let baseline = |l: usize| PADDING_Y + (l + 1) as f32 * slot - FONT_SIZE * 0.5;
    let text_top = |l: usize| baseline(l) - FONT_SIZE * 0.85;

    let runs = fragments
        .iter()
        .filter(|f| !f.text.is_empty())
        .map(|f| TextRun {
            x: f.x,
            y: baseline(f.line),
            text: f.text.clone(),
        })
        .collect();

    // Group each entity's fragments per line into one box spanning from the
    // first to the last covered piece.
    let mut extents: BTreeMap<(usize, usize), (f32, f32)> = BTreeMap::new();
    for fragment in &fragments {
        for &e in &fragment.covering {
            let entry = extents
                .entry((e, fragment.line))
                .or_insert((fragment.x, fragment.x + fragment.width));
            entry.0 = entry.0.min(fragment.x);
            entry.1 = entry.1.max(fragment.x + fragment.width);
        }
    }

    let mut boxes: Vec<HighlightBox> = Vec::new();
    let mut anchors: BTreeMap<String, Vec<Rect>> = BTreeMap::new();
    for (&(e, l), &(x0, x1)) in &extents {
        let inset = depth[e] as f32 * STACK_INSET;
        let rect = Rect {
            x: x0 - HIGHLIGHT_PAD_X + inset,
            y: text_top(l) - HIGHLIGHT_PAD_Y + inset,
            width: (x1 - x0) + 2.0 * (HIGHLIGHT_PAD_X - inset),
            height: FONT_SIZE * 1.1 + 2.0 * (HIGHLIGHT_PAD_Y - inset),
        };
        boxes.push(HighlightBox {
            entity_id: entities[e].entity_id.clone(),
            rect,
            depth: depth[e],
            color: entities[e].color.clone(),
        });
        anchors
            .entry(entities[e].entity_id.clone())
            .or_default()
            .push(rect);
    }

    // Outermost first, so nested highlights draw on top of their parents.
    boxes.sort_by_key(|b| b.depth);

    TextLayout {
        width,
        height: line_count as f32 * slot + 2.0 * PADDING_Y,
        line_count,
        runs,
        boxes,
        anchors,
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_STACK_DEPTH, Rect, lay_out};
    use crate::measure::HeuristicMeasure;
    use crate::model::Entity;

    fn obama_entities() -> Vec<Entity> {
        vec![Entity::new("1", 0, 12), Entity::new("2", 27, 33)]
    }

    #[test]
    fn single_line_layout_produces_one_box_per_entity() {
        let layout = lay_out(
            "Barack Obama was born in Hawaii.",
            &obama_entities(),
            &mut HeuristicMeasure,
            800.0,
        );

        assert_eq!(layout.line_count, 1);
        assert_eq!(layout.boxes.len(), 2);
        assert_eq!(layout.anchors["1"].len(), 1);
        assert_eq!(layout.anchors["2"].len(), 1);
        // "Barack Obama" sits left of "Hawaii".
        assert!(layout.anchors["1"][0].right() < layout.anchors["2"][0].x);
    }

    #[test]
    fn narrow_width_wraps_between_words_only() {
        let text = "Barack Obama was born in Hawaii.";
        let layout = lay_out(text, &obama_entities(), &mut HeuristicMeasure, 180.0);

        assert!(layout.line_count > 1);
        // Every run is a whole word piece; none contains whitespace.
        for run in &layout.runs {
            assert!(!run.text.contains(char::is_whitespace), "{:?}", run.text);
        }
    }

    #[test]
    fn entity_wrapping_across_lines_gets_one_anchor_per_line() {
        // The whole text is one entity; at this width it must wrap.
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let entities = vec![Entity::new("1", 0, text.len())];
        let layout = lay_out(text, &entities, &mut HeuristicMeasure, 200.0);

        assert!(layout.line_count > 1);
        assert_eq!(layout.anchors["1"].len(), layout.line_count);
    }

    #[test]
    fn newline_forces_a_break() {
        let layout = lay_out("one\ntwo", &[], &mut HeuristicMeasure, 800.0);
        assert_eq!(layout.line_count, 2);
        assert_eq!(layout.runs.len(), 2);
        assert!(layout.runs[1].y > layout.runs[0].y);
    }

    #[test]
    fn overlapping_entities_stack_with_nested_inner_box() {
        let text = "abcdefghij rest";
        let entities = vec![Entity::new("1", 0, 10), Entity::new("2", 5, 8)];
        let layout = lay_out(text, &entities, &mut HeuristicMeasure, 800.0);

        let outer: &Rect = &layout.anchors["1"][0];
        let inner: &Rect = &layout.anchors["2"][0];
        assert!(outer.contains(inner), "{outer:?} should contain {inner:?}");
        assert!(inner.height < outer.height);

        let inner_box = layout
            .boxes
            .iter()
            .find(|b| b.entity_id == "2")
            .expect("box for inner entity");
        assert_eq!(inner_box.depth, 1);
        // Outer draws first so the nested box stays visible.
        let positions: Vec<&str> = layout
            .boxes
            .iter()
            .map(|b| b.entity_id.as_str())
            .collect();
        assert_eq!(positions, vec!["1", "2"]);
    }

    #[test]
    fn overlap_depth_clamps() {
        let text = "abcdefghijkl";
        let entities: Vec<Entity> = (0..6)
            .map(|i| Entity::new(format!("e{i}"), i, 12 - i))
            .collect();
        let layout = lay_out(text, &entities, &mut HeuristicMeasure, 800.0);

        let max_depth = layout.boxes.iter().map(|b| b.depth).max().unwrap();
        assert_eq!(max_depth, MAX_STACK_DEPTH);
    }

    #[test]
    fn covered_whitespace_joins_the_highlight_box() {
        let text = "a b";
        let entities = vec![Entity::new("1", 0, 3)];
        let layout = lay_out(text, &entities, &mut HeuristicMeasure, 800.0);

        let rect = layout.anchors["1"][0];
        let last_run = layout.runs.last().unwrap();
        // Box spans across the interior space up to the final run.
        assert!(rect.right() >= last_run.x);
    }

    #[test]
    fn layout_is_deterministic() {
        let text = "Barack Obama was born in Hawaii.";
        let a = lay_out(text, &obama_entities(), &mut HeuristicMeasure, 420.0);
        let b = lay_out(text, &obama_entities(), &mut HeuristicMeasure, 420.0);
        assert_eq!(a.runs.len(), b.runs.len());
        for (ra, rb) in a.runs.iter().zip(&b.runs) {
            assert_eq!(ra.x, rb.x);
            assert_eq!(ra.y, rb.y);
        }
    }
}
