use serde_json::{Map, Value, json};

use super::{CompositeRule, RuleMetadata, UnpackContext, collection_members};
use crate::error::Result;

const DEFAULT_RELATIONSHIP: &str = "fulfills";

/// `{values: [...]}` → `[{referenced_id, referenced_type, type}]`.
pub struct ReferencesRule {
    metadata: RuleMetadata,
}

impl ReferencesRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "references",
                "references",
                "Turn related-event values into reference records",
            ),
        }
    }
}

impl Default for ReferencesRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeRule for ReferencesRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(&self, _ctx: &UnpackContext, attrs: &mut Map<String, Value>) -> Result<()> {
        let Some(raw) = attrs.get("references") else {
            return Ok(());
        };
        let references: Vec<Value> = collection_members(raw)
            .iter()
            .filter_map(reference)
            .collect();
        attrs.insert("references".to_string(), Value::Array(references));
        Ok(())
    }
}

fn reference(value: &Value) -> Option<Value> {
    match value {
        Value::String(id) => Some(json!({
            "referenced_id": id,
            "referenced_type": Value::Null,
            "type": DEFAULT_RELATIONSHIP,
        })),
        Value::Object(map) => {
            let id = first_of(map, &["referenced_id", "referencedId", "id"])?;
            let referenced_type =
                first_of(map, &["referenced_type", "referencedType", "_type"]).unwrap_or(Value::Null);
            let relationship = map
                .get("type")
                .filter(|value| !value.is_null())
                .cloned()
                .unwrap_or_else(|| Value::String(DEFAULT_RELATIONSHIP.to_string()));
            Some(json!({
                "referenced_id": id,
                "referenced_type": referenced_type,
                "type": relationship,
            }))
        }
        _ => None,
    }
}

fn first_of(map: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|value| !value.is_null()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(value: Value) -> Value {
        let mut attrs = Map::new();
        attrs.insert("references".to_string(), value);
        ReferencesRule::new()
            .apply(&UnpackContext::default(), &mut attrs)
            .unwrap();
        attrs["references"].clone()
    }

    #[test]
    fn string_ids_default_to_fulfills() {
        assert_eq!(
            run(json!({"values": ["5a0c1e"]})),
            json!([{"referenced_id": "5a0c1e", "referenced_type": null, "type": "fulfills"}])
        );
    }

    #[test]
    fn maps_keep_their_type() {
        assert_eq!(
            run(json!({"values": [{"referencedId": "1", "referencedType": "Encounter"}]})),
            json!([{"referenced_id": "1", "referenced_type": "Encounter", "type": "fulfills"}])
        );
    }

    #[test]
    fn rerun_is_a_no_op() {
        let once = run(json!({"values": ["a", "b"]}));
        assert_eq!(run(once.clone()), once);
    }
}
