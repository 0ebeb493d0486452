//! Rule registry: built-in defaults plus caller overrides.
//!
//! The registry owns the authoritative default table; on scan entry,
//! caller-supplied overrides are deep-merged onto defaults per resource type
//! and frozen into a `RuleSet`. Scenarios read only from the resolved view.

mod defaults;

use crate::models::ResourceType;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One resource type's parameter block (open per-type union).
pub type RuleMap = serde_json::Map<String, Value>;

/// Caller overrides, keyed by resource type name. Unknown keys are ignored
/// with a warning so configs survive vocabulary growth in either direction.
pub type RuleOverrides = BTreeMap<String, RuleMap>;

/// Holds the built-in default table and produces resolved rule sets.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    defaults: BTreeMap<ResourceType, RuleMap>,
}

impl RuleRegistry {
    pub fn built_in() -> Self {
        Self { defaults: defaults::default_table() }
    }

    /// Deep-merge overrides onto the defaults and freeze the result.
    pub fn resolve(&self, overrides: &RuleOverrides) -> RuleSet {
        let mut by_type = BTreeMap::new();
        for (rt, default_block) in &self.defaults {
            let mut merged = default_block.clone();
            if let Some(overlay) = overrides.get(rt.as_str()) {
                deep_merge(&mut merged, overlay);
            }
            by_type.insert(*rt, ResolvedRules { values: Arc::new(merged) });
        }
        for key in overrides.keys() {
            if ResourceType::parse(key).is_none() {
                tracing::warn!(resource_type = %key, "ignoring rule override for unknown resource type");
            }
        }
        RuleSet { by_type }
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::built_in()
    }
}

fn deep_merge(base: &mut RuleMap, overlay: &RuleMap) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Immutable, fully-resolved configuration for one scan.
#[derive(Debug, Clone)]
pub struct RuleSet {
    by_type: BTreeMap<ResourceType, ResolvedRules>,
}

impl RuleSet {
    pub fn for_type(&self, resource_type: ResourceType) -> &ResolvedRules {
        // The registry seeds every known type; a miss is a programmer error.
        &self.by_type[&resource_type]
    }
}

/// Confidence ladder thresholds for one resource type.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceDays {
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
}

/// Typed read access over one resource type's merged parameter block.
#[derive(Debug, Clone)]
pub struct ResolvedRules {
    values: Arc<RuleMap>,
}

impl ResolvedRules {
    #[cfg(test)]
    pub fn from_map(values: RuleMap) -> Self {
        Self { values: Arc::new(values) }
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn enabled(&self) -> bool {
        self.bool_or("enabled", true)
    }

    /// Per-scenario feature flag; scenarios default to enabled when the key
    /// is absent from the table.
    pub fn flag(&self, key: &str) -> bool {
        self.bool_or(key, true)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn i64_or(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or(default)
    }

    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn usize_or(&self, key: &str, default: usize) -> usize {
        self.get(key)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(default)
    }

    pub fn str_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn str_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn u32_list(&self, key: &str) -> Vec<u32> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_u64)
                    .map(|v| v as u32)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn str_map(&self, key: &str) -> BTreeMap<String, String> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The ladder thresholds, with the standard defaults as the last resort.
    pub fn confidence_days(&self) -> ConfidenceDays {
        ConfidenceDays {
            critical: self.i64_or("confidence_critical_days", 90),
            high: self.i64_or("confidence_high_days", 30),
            medium: self.i64_or("confidence_medium_days", 7),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overrides(resource_type: &str, value: serde_json::Value) -> RuleOverrides {
        let mut map = RuleOverrides::new();
        let serde_json::Value::Object(obj) = value else { panic!("object expected") };
        map.insert(resource_type.to_string(), obj);
        map
    }

    #[test]
    fn test_defaults_resolve_without_overrides() {
        let set = RuleRegistry::built_in().resolve(&RuleOverrides::new());
        let volume = set.for_type(ResourceType::Volume);
        assert!(volume.enabled());
        assert_eq!(volume.i64_or("min_age_days", 0), 7);
        assert_eq!(volume.confidence_days().critical, 90);
    }

    #[test]
    fn test_override_replaces_single_parameter() {
        let set = RuleRegistry::built_in()
            .resolve(&overrides("volume", json!({"min_age_days": 21})));
        let volume = set.for_type(ResourceType::Volume);
        assert_eq!(volume.i64_or("min_age_days", 0), 21);
        // untouched siblings keep their defaults
        assert_eq!(volume.f64_or("iops_overprovisioning_factor", 0.0), 2.0);
    }

    #[test]
    fn test_override_can_disable_resource_type() {
        let set = RuleRegistry::built_in().resolve(&overrides("instance", json!({"enabled": false})));
        assert!(!set.for_type(ResourceType::Instance).enabled());
        assert!(set.for_type(ResourceType::Volume).enabled());
    }

    #[test]
    fn test_nested_maps_merge_recursively() {
        let set = RuleRegistry::built_in()
            .resolve(&overrides("instance", json!({"generation_upgrades": {"t2": "t3a"}})));
        let upgrades = set.for_type(ResourceType::Instance).str_map("generation_upgrades");
        assert_eq!(upgrades.get("t2").map(String::as_str), Some("t3a"));
        // other mappings survive the merge
        assert_eq!(upgrades.get("m4").map(String::as_str), Some("m5"));
    }

    #[test]
    fn test_unknown_override_key_is_ignored() {
        let set = RuleRegistry::built_in().resolve(&overrides("quantum_disk", json!({"enabled": false})));
        assert!(set.for_type(ResourceType::Volume).enabled());
    }
}
