//! Confidence calculator: a pure function of age and the resource type's
//! ladder thresholds. Scenarios may upgrade the label on stronger signals;
//! age remains the floor, never the ceiling.

use crate::models::Confidence;
use crate::rules::ResolvedRules;

pub fn for_age(age_days: i64, rules: &ResolvedRules) -> Confidence {
    let ladder = rules.confidence_days();
    if age_days >= ladder.critical {
        Confidence::Critical
    } else if age_days >= ladder.high {
        Confidence::High
    } else if age_days >= ladder.medium {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(value: serde_json::Value) -> ResolvedRules {
        let serde_json::Value::Object(map) = value else { panic!("object expected") };
        ResolvedRules::from_map(map)
    }

    #[test]
    fn test_default_ladder() {
        let r = rules(json!({}));
        assert_eq!(for_age(0, &r), Confidence::Low);
        assert_eq!(for_age(6, &r), Confidence::Low);
        assert_eq!(for_age(7, &r), Confidence::Medium);
        assert_eq!(for_age(29, &r), Confidence::Medium);
        assert_eq!(for_age(30, &r), Confidence::High);
        assert_eq!(for_age(89, &r), Confidence::High);
        assert_eq!(for_age(90, &r), Confidence::Critical);
        assert_eq!(for_age(10_000, &r), Confidence::Critical);
    }

    #[test]
    fn test_ladder_overrides() {
        let r = rules(json!({
            "confidence_medium_days": 3,
            "confidence_high_days": 7,
            "confidence_critical_days": 30,
        }));
        assert_eq!(for_age(2, &r), Confidence::Low);
        assert_eq!(for_age(3, &r), Confidence::Medium);
        assert_eq!(for_age(7, &r), Confidence::High);
        assert_eq!(for_age(30, &r), Confidence::Critical);
    }

    #[test]
    fn test_monotonic_in_age() {
        let r = rules(json!({}));
        let mut last = Confidence::Low;
        for age in 0..200 {
            let c = for_age(age, &r);
            assert!(c >= last, "confidence regressed at age {age}");
            last = c;
        }
    }
}
