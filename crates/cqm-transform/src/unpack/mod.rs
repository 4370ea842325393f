//! Composite-field repair rules.
//!
//! After generic extraction a handful of record attributes still have the
//! event-side structure. Each rule rewrites one of them in place and is a
//! no-op when its trigger attribute is absent. Rules are idempotent.
//!
//! - `references` - `{values: [...]}` to reference records
//! - `facility` - location list to a display collection
//! - `diagnosis` - coded results to a collection, deduplicated against
//!   `principalDiagnosis`
//! - `components` - panel members relabelled for the record side

mod components;
mod diagnosis;
mod facility;
mod references;

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::Result;

pub use components::ComponentsRule;
pub use diagnosis::DiagnosisRule;
pub use facility::FacilityRule;
pub use references::ReferencesRule;

/// Tag the record side uses for collection-valued attributes.
pub const COLLECTION_TYPE: &str = "COL";

/// Default display format for facility location periods.
pub const DEFAULT_FACILITY_TIME_FORMAT: &str = "%m/%d/%Y %-I:%M %p";

/// Inputs the rules need besides the attribute map.
#[derive(Debug, Clone)]
pub struct UnpackContext {
    pub facility_time_format: String,
}

impl Default for UnpackContext {
    fn default() -> Self {
        Self {
            facility_time_format: DEFAULT_FACILITY_TIME_FORMAT.to_string(),
        }
    }
}

/// Metadata about a rule.
#[derive(Debug, Clone)]
pub struct RuleMetadata {
    pub id: String,
    pub description: String,
    /// The record attribute whose presence triggers the rule.
    pub trigger: String,
}

impl RuleMetadata {
    pub fn new(
        id: impl Into<String>,
        trigger: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            trigger: trigger.into(),
        }
    }
}

/// One structural repair applied to a record entry's attributes.
pub trait CompositeRule: Send + Sync {
    fn metadata(&self) -> &RuleMetadata;

    fn id(&self) -> &str {
        &self.metadata().id
    }

    /// Whether the trigger attribute is present and non-null.
    fn applies(&self, attrs: &Map<String, Value>) -> bool {
        attrs
            .get(&self.metadata().trigger)
            .is_some_and(|value| !value.is_null())
    }

    fn apply(&self, ctx: &UnpackContext, attrs: &mut Map<String, Value>) -> Result<()>;
}

/// Runs rules in insertion order.
#[derive(Default)]
pub struct RuleExecutor {
    rules: Vec<Arc<dyn CompositeRule>>,
    disabled: HashSet<String>,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// References, facility, diagnosis, components, in that order.
    pub fn with_default_rules() -> Self {
        let mut executor = Self::new();
        executor.add_rule(Arc::new(ReferencesRule::new()));
        executor.add_rule(Arc::new(FacilityRule::new()));
        executor.add_rule(Arc::new(DiagnosisRule::new()));
        executor.add_rule(Arc::new(ComponentsRule::new()));
        executor
    }

    pub fn add_rule(&mut self, rule: Arc<dyn CompositeRule>) {
        self.rules.push(rule);
    }

    pub fn disable_rule(&mut self, rule_id: &str) {
        self.disabled.insert(rule_id.to_string());
    }

    pub fn is_rule_disabled(&self, rule_id: &str) -> bool {
        self.disabled.contains(rule_id)
    }

    pub fn execute(&self, ctx: &UnpackContext, attrs: &mut Map<String, Value>) -> Result<()> {
        for rule in &self.rules {
            if self.is_rule_disabled(rule.id()) || !rule.applies(attrs) {
                continue;
            }
            trace!(rule = rule.id(), "applying composite rule");
            rule.apply(ctx, attrs)?;
        }
        Ok(())
    }

    pub fn rule_metadata(&self) -> Vec<&RuleMetadata> {
        self.rules.iter().map(|rule| rule.metadata()).collect()
    }
}

/// The members of a possibly wrapped collection.
///
/// Accepts `{values: [...]}` (with or without a collection tag), a bare
/// array, or a single map treated as a one-member collection.
pub(crate) fn collection_members(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("values") {
            Some(Value::Array(items)) => items.clone(),
            _ => vec![value.clone()],
        },
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

pub(crate) fn tagged_collection(values: Vec<Value>) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::String(COLLECTION_TYPE.to_string()));
    map.insert("values".to_string(), Value::Array(values));
    Value::Object(map)
}
