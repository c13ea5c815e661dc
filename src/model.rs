use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A labeled character span within the source text. Offsets are character
/// offsets (not bytes), half-open: `start..end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Entity {
    pub fn new(entity_id: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            entity_id: entity_id.into(),
            start,
            end,
            attr: None,
            color: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attr
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// The covered slice of `text`, by character offsets.
    pub fn slice(&self, text: &str) -> String {
        text.chars()
            .skip(self.start)
            .take(self.end.saturating_sub(self.start))
            .collect()
    }
}

/// An undirected association between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub entity_1_id: String,
    pub entity_2_id: String,
}

impl Relation {
    pub fn new(entity_1_id: impl Into<String>, entity_2_id: impl Into<String>) -> Self {
        Self {
            entity_1_id: entity_1_id.into(),
            entity_2_id: entity_2_id.into(),
        }
    }
}

/// The text/entities/relations triple handed to the renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
}

impl Document {
    pub fn new(text: impl Into<String>, entities: Vec<Entity>, relations: Vec<Relation>) -> Self {
        Self {
            text: text.into(),
            entities,
            relations,
        }
    }

    /// Builds a document from the loosely-typed wire shape. Offsets may be
    /// numbers or decimal strings (`"start": "2"`); unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or(Error::TypeMismatch {
            field: "payload",
            expected: "a JSON object",
        })?;

        let text = obj
            .get("text")
            .ok_or(Error::SchemaError {
                record: "payload",
                key: "text",
            })?
            .as_str()
            .ok_or(Error::TypeMismatch {
                field: "text",
                expected: "a string",
            })?
            .to_string();

        let raw_entities = obj
            .get("entities")
            .ok_or(Error::SchemaError {
                record: "payload",
                key: "entities",
            })?
            .as_array()
            .ok_or(Error::TypeMismatch {
                field: "entities",
                expected: "an array of objects",
            })?;

        let mut entities = Vec::with_capacity(raw_entities.len());
        for raw in raw_entities {
            entities.push(entity_from_json(raw)?);
        }

        let mut relations = Vec::new();
        if let Some(raw_relations) = obj.get("relations") {
            let raw_relations = raw_relations.as_array().ok_or(Error::TypeMismatch {
                field: "relations",
                expected: "an array of objects",
            })?;
            for raw in raw_relations {
                relations.push(relation_from_json(raw)?);
            }
        }

        Ok(Self {
            text,
            entities,
            relations,
        })
    }

    /// Checks span bounds, entity_id uniqueness and relation endpoints, in
    /// that order. The first violation aborts.
    pub fn validate(&self) -> Result<()> {
        let len = self.text.chars().count();

        for entity in &self.entities {
            if entity.start >= entity.end || entity.end > len {
                return Err(Error::SpanOutOfBounds {
                    entity_id: entity.entity_id.clone(),
                    start: entity.start,
                    end: entity.end,
                    len,
                });
            }
        }

        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.entity_id.as_str()) {
                return Err(Error::DuplicateEntityId {
                    entity_id: entity.entity_id.clone(),
                });
            }
        }

        for relation in &self.relations {
            for endpoint in [&relation.entity_1_id, &relation.entity_2_id] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(Error::UnresolvedRelationEndpoint {
                        entity_id: endpoint.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn entity_from_json(value: &Value) -> Result<Entity> {
    let obj = value.as_object().ok_or(Error::TypeMismatch {
        field: "entities",
        expected: "an array of objects",
    })?;

    let entity_id = require_string(obj, "entity", "entity_id")?;
    let start = require_offset(obj, "start")?;
    let end = require_offset(obj, "end")?;

    let attr = match obj.get("attr") {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let map = raw.as_object().ok_or(Error::TypeMismatch {
                field: "attr",
                expected: "a string-to-string mapping",
            })?;
            let mut attr = BTreeMap::new();
            for (key, value) in map {
                let value = value.as_str().ok_or(Error::TypeMismatch {
                    field: "attr",
                    expected: "a string-to-string mapping",
                })?;
                attr.insert(key.clone(), value.to_string());
            }
            Some(attr)
        }
    };

    let color = match obj.get("color") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            raw.as_str()
                .ok_or(Error::TypeMismatch {
                    field: "color",
                    expected: "a string",
                })?
                .to_string(),
        ),
    };

    Ok(Entity {
        entity_id,
        start,
        end,
        attr,
        color,
    })
}

fn relation_from_json(value: &Value) -> Result<Relation> {
    let obj = value.as_object().ok_or(Error::TypeMismatch {
        field: "relations",
        expected: "an array of objects",
    })?;

    Ok(Relation {
        entity_1_id: require_string(obj, "relation", "entity_1_id")?,
        entity_2_id: require_string(obj, "relation", "entity_2_id")?,
    })
}

fn require_string(
    obj: &serde_json::Map<String, Value>,
    record: &'static str,
    key: &'static str,
) -> Result<String> {
    obj.get(key)
        .ok_or(Error::SchemaError { record, key })?
        .as_str()
        .map(str::to_string)
        .ok_or(Error::TypeMismatch {
            field: key,
            expected: "a string",
        })
}

fn require_offset(obj: &serde_json::Map<String, Value>, key: &'static str) -> Result<usize> {
    let raw = obj.get(key).ok_or(Error::SchemaError {
        record: "entity",
        key,
    })?;

    match raw {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or(Error::TypeMismatch {
        field: key,
        expected: "a non-negative integer",
    })
}
