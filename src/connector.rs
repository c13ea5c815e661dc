use crate::error::{Error, Result};
use crate::layout::{Rect, TextLayout};
use crate::model::Relation;

/// Corner radius of connector bends, matching the rounded highlight boxes.
const ARC_RADIUS: f32 = 6.0;
/// Extra lift per relation sharing an endpoint; first-declared runs
/// innermost.
const STACK_STEP: f32 = 4.0;

/// A routed connector: SVG path data plus the metadata the page script
/// needs to toggle it.
#[derive(Debug, Clone)]
pub struct Connector {
    pub index: usize,
    pub entity_1_id: String,
    pub entity_2_id: String,
    pub path: String,
    /// Highest point of the path; the canvas uses it to reserve headroom so
    /// arcs are never clipped at the top edge.
    pub top: f32,
}

fn anchor_point(boxes: &[Rect]) -> (f32, f32) {
    // A span wrapped over more than two lines is mostly line-shaped; its
    // right edge reads as the span position better than the center of the
    // first partial line.
    let first = &boxes[0];
    if boxes.len() > 2 {
        first.top_right()
    } else {
        first.top_center()
    }
}

/// Routes every relation between its endpoints' anchor boxes. Fails on the
/// first endpoint that has no anchors rather than dropping the connector.
pub fn route(relations: &[Relation], layout: &TextLayout) -> Result<Vec<Connector>> {
    let mut connectors = Vec::with_capacity(relations.len());

    for (index, relation) in relations.iter().enumerate() {
        let a = resolve(layout, &relation.entity_1_id)?;
        let b = resolve(layout, &relation.entity_2_id)?;

        let (start, end) = if a.0 <= b.0 { (a, b) } else { (b, a) };

        let slot = relations[..index]
            .iter()
            .filter(|earlier| shares_endpoint(earlier, relation))
            .count();
        let lift = slot as f32 * STACK_STEP;

        let (path, top) = build_path(start, end, lift);
        connectors.push(Connector {
            index,
            entity_1_id: relation.entity_1_id.clone(),
            entity_2_id: relation.entity_2_id.clone(),
            path,
            top,
        });
    }

    Ok(connectors)
}

fn resolve(layout: &TextLayout, entity_id: &str) -> Result<(f32, f32)> {
    layout
        .anchors
        .get(entity_id)
        .filter(|boxes| !boxes.is_empty())
        .map(|boxes| anchor_point(boxes))
        .ok_or_else(|| Error::UnresolvedRelationEndpoint {
            entity_id: entity_id.to_string(),
        })
}

fn shares_endpoint(a: &Relation, b: &Relation) -> bool {
    [&a.entity_1_id, &a.entity_2_id]
        .iter()
        .any(|id| **id == b.entity_1_id || **id == b.entity_2_id)
}

/// Left-to-right path with rounded corners: up from the start anchor to an
/// offset baseline above the upper endpoint, across, and down to the end
/// anchor. Degenerate verticals are skipped so same-line arcs stay compact.
fn build_path((sx, sy): (f32, f32), (ex, ey): (f32, f32), lift: f32) -> (String, f32) {
    let r = ARC_RADIUS;
    let base = sy.min(ey) - lift;

    let mut path = format!("M{sx:.2} {sy:.2}");
    if sy > base {
        path.push_str(&format!(" L{sx:.2} {base:.2}"));
    }
    path.push_str(&format!(" a {r:.2} {r:.2} 0 0 1 {r:.2} -{r:.2}"));
    path.push_str(&format!(" L{:.2} {:.2}", ex - r, base - r));
    path.push_str(&format!(" a {r:.2} {r:.2} 0 0 1 {r:.2} {r:.2}"));
    if ey > base {
        path.push_str(&format!(" L{ex:.2} {ey:.2}"));
    }

    (path, base - r)
}

#[cfg(test)]
mod tests {
    use super::route;
    use crate::layout::lay_out;
    use crate::measure::HeuristicMeasure;
    use crate::model::{Entity, Relation};

    #[test]
    fn same_line_relation_arcs_above_the_text() {
        let layout = lay_out(
            "Barack Obama was born in Hawaii.",
            &[Entity::new("1", 0, 12), Entity::new("2", 27, 33)],
            &mut HeuristicMeasure,
            800.0,
        );
        let connectors = route(&[Relation::new("1", "2")], &layout).unwrap();

        assert_eq!(connectors.len(), 1);
        let connector = &connectors[0];
        assert!(connector.path.starts_with('M'));
        assert_eq!(connector.path.matches(" a ").count(), 2);
        // The arc rides above both anchor boxes.
        assert!(connector.top < layout.anchors["1"][0].y);
    }

    #[test]
    fn cross_line_relation_drops_to_the_upper_baseline() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let entities = vec![Entity::new("first", 0, 5), Entity::new("last", 51, 56)];
        let layout = lay_out(text, &entities, &mut HeuristicMeasure, 220.0);
        assert!(layout.line_count > 1, "text must wrap for this test");

        let connectors = route(&[Relation::new("first", "last")], &layout).unwrap();
        let connector = &connectors[0];
        // One vertical drop on the lower side plus the final descent.
        assert!(connector.path.matches(" L").count() >= 2);
        assert!(connector.top < layout.anchors["first"][0].y);
    }

    #[test]
    fn shared_endpoints_stack_first_declared_innermost() {
        let text = "one two three";
        let entities = vec![
            Entity::new("a", 0, 3),
            Entity::new("b", 4, 7),
            Entity::new("c", 8, 13),
        ];
        let layout = lay_out(text, &entities, &mut HeuristicMeasure, 800.0);
        let relations = vec![Relation::new("a", "b"), Relation::new("a", "c")];
        let connectors = route(&relations, &layout).unwrap();

        assert!(connectors[1].top < connectors[0].top);
    }

    #[test]
    fn duplicate_relations_occupy_their_own_slots() {
        let layout = lay_out(
            "one two",
            &[Entity::new("a", 0, 3), Entity::new("b", 4, 7)],
            &mut HeuristicMeasure,
            800.0,
        );
        let relations = vec![Relation::new("a", "b"), Relation::new("a", "b")];
        let connectors = route(&relations, &layout).unwrap();
        assert_ne!(connectors[0].path, connectors[1].path);
    }

    #[test]
    fn missing_anchor_is_a_hard_error() {
        let layout = lay_out(
            "one two",
            &[Entity::new("a", 0, 3)],
            &mut HeuristicMeasure,
            800.0,
        );
        let result = route(&[Relation::new("a", "ghost")], &layout);
        assert!(matches!(
            result,
            Err(crate::error::Error::UnresolvedRelationEndpoint { entity_id }) if entity_id == "ghost"
        ));
    }
}
