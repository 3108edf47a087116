//! Lenient conversions from loosely typed JSON values

use crate::extract::types::{KeyIssue, Recommendation};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const ISSUE_KEYS: &[&str] = &["issue", "title", "problem", "description"];
const FIX_KEYS: &[&str] = &["how_to_fix", "fix", "solution", "howToFix"];
const RECOMMENDATION_KEYS: &[&str] = &["recommendation", "title", "action", "description"];
const BENEFIT_KEYS: &[&str] = &["benefit", "impact", "rationale"];

/// A number, or the first number in a string such as `"7"`, `"7/10"` or `"Score: 7.5"`
pub fn score_from_value(value: &Value) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let re = NUMBER.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern is valid"));
            re.find(s).and_then(|m| m.as_str().parse().ok())
        }
        _ => None,
    }
}

/// A string, or a number or boolean rendered as text
pub fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First non-empty string among `keys` of an object
pub fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    let object = value.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key).and_then(text_from_value))
        .find(|text| !text.is_empty())
}

/// A list item as plain text: a string, or an object's descriptive field
pub fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => first_text(value, ISSUE_KEYS).or_else(|| first_text(value, RECOMMENDATION_KEYS)),
        other => text_from_value(other),
    }
    .filter(|text| !text.is_empty())
}

/// An issue from a bare string or an object, filling a missing fix with `placeholder`
pub fn issue_from_value(value: &Value, placeholder: &str) -> Option<KeyIssue> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(KeyIssue {
            issue: s.trim().to_string(),
            how_to_fix: placeholder.to_string(),
        }),
        Value::Object(_) => {
            let issue = first_text(value, ISSUE_KEYS)?;
            let how_to_fix = first_text(value, FIX_KEYS).unwrap_or_else(|| placeholder.to_string());
            Some(KeyIssue { issue, how_to_fix })
        }
        _ => None,
    }
}

/// A recommendation from a bare string or an object, filling a missing benefit with `placeholder`
pub fn recommendation_from_value(value: &Value, placeholder: &str) -> Option<Recommendation> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Recommendation {
            recommendation: s.trim().to_string(),
            benefit: placeholder.to_string(),
        }),
        Value::Object(_) => {
            let recommendation = first_text(value, RECOMMENDATION_KEYS)?;
            let benefit = first_text(value, BENEFIT_KEYS).unwrap_or_else(|| placeholder.to_string());
            Some(Recommendation {
                recommendation,
                benefit,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_from_value() {
        assert_eq!(score_from_value(&json!(7)), Some(7.0));
        assert_eq!(score_from_value(&json!("7/10")), Some(7.0));
        assert_eq!(score_from_value(&json!("Score: 6.5")), Some(6.5));
        assert_eq!(score_from_value(&json!("n/a")), None);
        assert_eq!(score_from_value(&json!(null)), None);
    }

    #[test]
    fn test_issue_shapes() {
        let bare = issue_from_value(&json!("Menu hidden"), "placeholder").unwrap();
        assert_eq!(bare.how_to_fix, "placeholder");

        let alt = issue_from_value(&json!({"problem": "Slow", "fix": "Cache it"}), "p").unwrap();
        assert_eq!(alt.issue, "Slow");
        assert_eq!(alt.how_to_fix, "Cache it");

        assert!(issue_from_value(&json!({"how_to_fix": "orphan"}), "p").is_none());
        assert!(issue_from_value(&json!(""), "p").is_none());
        assert!(issue_from_value(&json!(4), "p").is_none());
    }

    #[test]
    fn test_item_text() {
        assert_eq!(item_text(&json!("a")), Some("a".to_string()));
        assert_eq!(
            item_text(&json!({"recommendation": "Add search"})),
            Some("Add search".to_string())
        );
        assert_eq!(item_text(&json!([])), None);
    }
}
