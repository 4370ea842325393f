use serde_json::{Map, Value};

use super::{CompositeRule, RuleMetadata, UnpackContext, collection_members, tagged_collection};
use crate::error::Result;

/// Panel members with record-side code labels.
pub struct ComponentsRule {
    metadata: RuleMetadata,
}

impl ComponentsRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "components",
                "components",
                "Relabel panel component codes and results",
            ),
        }
    }
}

impl Default for ComponentsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeRule for ComponentsRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(&self, _ctx: &UnpackContext, attrs: &mut Map<String, Value>) -> Result<()> {
        let Some(raw) = attrs.get("components") else {
            return Ok(());
        };
        let members = collection_members(raw)
            .into_iter()
            .map(|member| match member {
                Value::Object(mut map) => {
                    for key in ["code", "result"] {
                        if let Some(Value::Object(inner)) = map.get_mut(key) {
                            relabel(inner);
                        }
                    }
                    Value::Object(map)
                }
                other => other,
            })
            .collect();
        attrs.insert("components".to_string(), tagged_collection(members));
        Ok(())
    }
}

fn relabel(code: &mut Map<String, Value>) {
    if let Some(system) = code.remove("codeSystem") {
        code.insert("code_system".to_string(), system);
    }
    code.remove("title");
}
