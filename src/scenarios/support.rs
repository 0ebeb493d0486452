//! Shared helpers for scenario implementations.

use crate::models::Resource;
use crate::rules::ResolvedRules;
use chrono::{DateTime, Utc};

/// Days a resource has been in its current (stopped) state, with the source
/// of the figure: the parsed state-transition time when the provider exposed
/// one, otherwise the creation time as a lower-confidence fallback.
pub fn stopped_duration_days(resource: &Resource, now: DateTime<Utc>) -> (i64, &'static str) {
    if let Some(days) = resource.state_age_days(now) {
        (days, "state_transition")
    } else {
        (resource.age_days(now), "creation_time")
    }
}

/// Minimum-age gate. Resources whose creation time the provider does not
/// expose pass the gate (they cannot be proven young) with an effective age
/// of zero, which keeps their ladder confidence at the floor.
pub fn passes_min_age(resource: &Resource, now: DateTime<Utc>, min_days: i64) -> bool {
    match resource.created_at {
        Some(_) => resource.age_days(now) >= min_days,
        None => true,
    }
}

/// Environment-tag check against the configured non-production markers.
pub fn is_nonprod(resource: &Resource, rules: &ResolvedRules) -> bool {
    resource.tag_value_in(
        &rules.str_list("nonprod_env_tags"),
        &rules.str_list("nonprod_env_values"),
    )
}

/// Compliance-tag check; a match suppresses scenarios that would suggest a
/// lower-durability alternative.
pub fn has_compliance_marker(resource: &Resource, rules: &ResolvedRules) -> bool {
    resource.tag_marker_present(&rules.str_list("compliance_tags"))
}

pub fn fmt_bytes(bytes: f64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes.max(0.0);
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

pub fn fmt_gb(gb: f64) -> String {
    if gb >= 1024.0 {
        format!("{:.1} TB", gb / 1024.0)
    } else {
        format!("{gb:.0} GB")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;
    use crate::rules::{RuleOverrides, RuleRegistry};

    #[test]
    fn test_stopped_duration_prefers_transition_time() {
        let now = Utc::now();
        let mut r = Resource::new(ResourceType::Instance, "i-1", "us-east-1");
        r.created_at = Some(now - chrono::Duration::days(100));
        r.state_since = Some(now - chrono::Duration::days(40));
        assert_eq!(stopped_duration_days(&r, now), (40, "state_transition"));
        r.state_since = None;
        assert_eq!(stopped_duration_days(&r, now), (100, "creation_time"));
    }

    #[test]
    fn test_min_age_gate_passes_unknown_creation() {
        let now = Utc::now();
        let r = Resource::new(ResourceType::PublicIp, "eip-1", "us-east-1");
        assert!(passes_min_age(&r, now, 30));
    }

    #[test]
    fn test_nonprod_detection_uses_rules() {
        let rules = RuleRegistry::built_in().resolve(&RuleOverrides::new());
        let instance_rules = rules.for_type(ResourceType::Instance);
        let mut r = Resource::new(ResourceType::Instance, "i-1", "us-east-1");
        assert!(!is_nonprod(&r, instance_rules));
        r.tags.insert("Environment".to_string(), "staging".to_string());
        assert!(is_nonprod(&r, instance_rules));
    }

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(512.0), "512.0 B");
        assert_eq!(fmt_bytes(2.0 * 1024.0 * 1024.0), "2.0 MB");
    }
}
