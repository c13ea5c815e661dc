use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::Entity;
use crate::theme::{ThemeKind, resolve_named_color};

/// A color picked by a [`ColorMapper`]: either a recognized theme color name
/// or a hex literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    Named(String),
    Hex(String),
}

/// Per-entity color assignment hook. Implemented for any
/// `Fn(&Entity) -> ColorSpec`.
pub trait ColorMapper {
    fn assign(&self, entity: &Entity) -> ColorSpec;
}

impl<F> ColorMapper for F
where
    F: Fn(&Entity) -> ColorSpec,
{
    fn assign(&self, entity: &Entity) -> ColorSpec {
        self(entity)
    }
}

/// How entities get their highlight color. Precedence is "last one wins":
/// an explicit mapper beats the attribute key, which beats colors carried in
/// the payload.
#[derive(Clone, Default)]
pub enum ColorStrategy {
    /// Keep payload-supplied colors; everything else falls back to the
    /// theme's default highlight fill.
    #[default]
    Payload,
    /// Rank the distinct values of this attribute key by first occurrence
    /// and cycle the theme palette over them.
    AttrKey(String),
    /// Ask the mapper for every entity.
    Mapper(Arc<dyn ColorMapper>),
}

impl fmt::Debug for ColorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorStrategy::Payload => f.write_str("Payload"),
            ColorStrategy::AttrKey(key) => f.debug_tuple("AttrKey").field(key).finish(),
            ColorStrategy::Mapper(_) => f.write_str("Mapper(..)"),
        }
    }
}

pub fn is_valid_hex(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

fn resolve_spec(spec: ColorSpec) -> Result<String> {
    match spec {
        ColorSpec::Hex(value) => {
            if is_valid_hex(&value) {
                Ok(value)
            } else {
                Err(Error::InvalidColorFormat { value })
            }
        }
        ColorSpec::Named(name) => {
            resolve_named_color(&name)?.ok_or(Error::InvalidColorFormat { value: name })
        }
    }
}

/// Resolves a color reference carried in the payload: a hex literal, a
/// palette index, or a theme color name.
fn resolve_payload_color(value: &str, theme: ThemeKind) -> Result<String> {
    if is_valid_hex(value) {
        return Ok(value.to_string());
    }
    if let Ok(index) = value.parse::<usize>() {
        let palette = theme.palette()?;
        return Ok(palette[index % palette.len()].color_code.clone());
    }
    if let Some(code) = resolve_named_color(value)? {
        return Ok(code);
    }
    Err(Error::InvalidColorFormat {
        value: value.to_string(),
    })
}

/// Runs the selected strategy over `entities`, writing resolved hex codes
/// into their `color` fields. The map is recomputed from scratch on every
/// call; callers pass a clone of their entity list.
pub fn assign_colors(
    entities: &mut [Entity],
    strategy: &ColorStrategy,
    theme: ThemeKind,
) -> Result<()> {
    match strategy {
        ColorStrategy::Mapper(mapper) => {
            for entity in entities.iter_mut() {
                entity.color = Some(resolve_spec(mapper.assign(entity))?);
            }
        }
        ColorStrategy::AttrKey(key) => {
            let mut seen = HashSet::new();
            let mut order = Vec::new();
            for entity in entities.iter() {
                let value = entity
                    .attr
                    .as_ref()
                    .and_then(|attr| attr.get(key))
                    .ok_or_else(|| Error::MissingAttribute {
                        entity_id: entity.entity_id.clone(),
                        key: key.clone(),
                    })?;
                if seen.insert(value.clone()) {
                    order.push(value.clone());
                }
            }

            let palette = theme.palette()?;
            let map: HashMap<&str, &str> = order
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    (
                        value.as_str(),
                        palette[i % palette.len()].color_code.as_str(),
                    )
                })
                .collect();

            for entity in entities.iter_mut() {
                let value = entity
                    .attr
                    .as_ref()
                    .and_then(|attr| attr.get(key))
                    .expect("checked above");
                entity.color = Some(map[value.as_str()].to_string());
            }
        }
        ColorStrategy::Payload => {
            for entity in entities.iter_mut() {
                if let Some(value) = entity.color.take() {
                    entity.color = Some(resolve_payload_color(&value, theme)?);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ColorSpec, ColorStrategy, assign_colors, is_valid_hex};
    use crate::error::Error;
    use crate::model::Entity;
    use crate::theme::ThemeKind;
    use std::sync::Arc;

    fn tagged(id: &str, start: usize, value: &str) -> Entity {
        Entity::new(id, start, start + 1).with_attr("type", value)
    }

    #[test]
    fn hex_validation() {
        assert!(is_valid_hex("#1f77b4"));
        assert!(is_valid_hex("#abc"));
        assert!(!is_valid_hex("red5"));
        assert!(!is_valid_hex("#12"));
        assert!(!is_valid_hex(""));
        assert!(!is_valid_hex("#12345g"));
    }

    #[test]
    fn attr_values_rank_by_first_seen_order() {
        let mut entities = vec![
            tagged("1", 0, "LOC"),
            tagged("2", 1, "PER"),
            tagged("3", 2, "LOC"),
        ];
        assign_colors(
            &mut entities,
            &ColorStrategy::AttrKey("type".into()),
            ThemeKind::Light,
        )
        .unwrap();

        let palette = ThemeKind::Light.palette().unwrap();
        assert_eq!(entities[0].color.as_deref(), Some(&*palette[0].color_code));
        assert_eq!(entities[1].color.as_deref(), Some(&*palette[1].color_code));
        // Same value, same color.
        assert_eq!(entities[2].color, entities[0].color);
    }

    #[test]
    fn palette_wraps_when_exhausted() {
        let palette = ThemeKind::Light.palette().unwrap();
        let mut entities: Vec<Entity> = (0..palette.len() + 1)
            .map(|i| tagged(&format!("e{i}"), i, &format!("v{i}")))
            .collect();
        assign_colors(
            &mut entities,
            &ColorStrategy::AttrKey("type".into()),
            ThemeKind::Light,
        )
        .unwrap();

        assert_eq!(
            entities.last().unwrap().color.as_deref(),
            Some(&*palette[0].color_code)
        );
    }

    #[test]
    fn missing_attribute_names_the_entity() {
        let mut entities = vec![tagged("1", 0, "LOC"), Entity::new("2", 1, 2)];
        let err = assign_colors(
            &mut entities,
            &ColorStrategy::AttrKey("type".into()),
            ThemeKind::Light,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAttribute { entity_id, key } if entity_id == "2" && key == "type"
        ));
    }

    #[test]
    fn mapper_rejects_malformed_colors() {
        for bad in ["red5", "#12", ""] {
            let mut entities = vec![Entity::new("1", 0, 1)];
            let owned = bad.to_string();
            let strategy =
                ColorStrategy::Mapper(Arc::new(move |_: &Entity| ColorSpec::Hex(owned.clone())));
            let err = assign_colors(&mut entities, &strategy, ThemeKind::Light).unwrap_err();
            assert!(
                matches!(err, Error::InvalidColorFormat { value } if value == bad),
                "expected InvalidColorFormat for {bad:?}"
            );
        }
    }

    #[test]
    fn mapper_resolves_recognized_names_and_beats_payload_colors() {
        let mut entities = vec![Entity {
            color: Some("#000000".into()),
            ..Entity::new("1", 0, 1)
        }];
        let strategy =
            ColorStrategy::Mapper(Arc::new(|_: &Entity| ColorSpec::Named("orange".into())));
        assign_colors(&mut entities, &strategy, ThemeKind::Light).unwrap();
        assert_eq!(entities[0].color.as_deref(), Some("#ff7f0e"));
    }

    #[test]
    fn mapper_rejects_unrecognized_names() {
        let mut entities = vec![Entity::new("1", 0, 1)];
        let strategy =
            ColorStrategy::Mapper(Arc::new(|_: &Entity| ColorSpec::Named("magenta-ish".into())));
        assert!(matches!(
            assign_colors(&mut entities, &strategy, ThemeKind::Light),
            Err(Error::InvalidColorFormat { .. })
        ));
    }

    #[test]
    fn payload_strategy_resolves_indices_and_names() {
        let palette = ThemeKind::Dark.palette().unwrap();
        let mut entities = vec![
            Entity {
                color: Some("3".into()),
                ..Entity::new("1", 0, 1)
            },
            Entity {
                color: Some("blue".into()),
                ..Entity::new("2", 1, 2)
            },
            Entity::new("3", 2, 3),
        ];
        assign_colors(&mut entities, &ColorStrategy::Payload, ThemeKind::Dark).unwrap();
        assert_eq!(entities[0].color.as_deref(), Some(&*palette[3].color_code));
        assert_eq!(entities[1].color.as_deref(), Some("#1f77b4"));
        assert_eq!(entities[2].color, None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn assignment_is_deterministic(values in proptest::collection::vec("[a-z]{1,6}", 1..24)) {
                let build = || -> Vec<Entity> {
                    values
                        .iter()
                        .enumerate()
                        .map(|(i, v)| tagged(&format!("e{i}"), i, v))
                        .collect()
                };

                let mut first = build();
                let mut second = build();
                let strategy = ColorStrategy::AttrKey("type".into());
                assign_colors(&mut first, &strategy, ThemeKind::Light).unwrap();
                assign_colors(&mut second, &strategy, ThemeKind::Light).unwrap();

                prop_assert_eq!(&first, &second);

                // Equal attribute values always share a color.
                for a in &first {
                    for b in &first {
                        if a.attr == b.attr {
                            prop_assert_eq!(&a.color, &b.color);
                        }
                    }
                }
            }
        }
    }
}
