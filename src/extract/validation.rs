//! Shape validation and repair of an assembled report
//!
//! Validation is pure and total: any JSON value goes in, a fully typed
//! [`Report`] comes out together with the list of repairs that were needed.
//! Running it on its own output yields the same report and no errors.

use crate::extract::coerce::{
    first_text, issue_from_value, item_text, recommendation_from_value, score_from_value,
    text_from_value,
};
use crate::extract::heuristic::clamp_score;
use crate::extract::types::{
    mean_page_score, round_one_decimal, KeyIssue, OverallSummary, PageAnalysisRecord,
    Recommendation, Report, ReportMetadata, ValidationResult, DEFAULT_SCORE, MAX_SCORE, MIN_SCORE,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Placeholder for a bare-string issue with no fix
pub const FIX_REQUIRES_REVIEW: &str = "Fix details require review.";

/// Placeholder for a bare-string recommendation with no benefit
pub const BENEFIT_REQUIRES_REVIEW: &str = "Benefit details require review.";

/// Validates and repairs a report
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use ux_sweep::validate_report;
///
/// let result = validate_report(&json!({
///     "page_analyses": [{ "url": "https://example.com/", "key_issues": ["Some issue text"] }]
/// }));
/// assert!(!result.valid);
/// assert_eq!(result.data.overall_summary.total_pages_analyzed, 1);
/// assert_eq!(
///     result.data.page_analyses[0].key_issues[0].how_to_fix,
///     "Fix details require review."
/// );
/// ```
pub fn validate_report(value: &Value) -> ValidationResult {
    let mut v = Validator::default();
    let empty = Map::new();

    let root = match value.as_object() {
        Some(root) => root,
        None => {
            v.error("report", "expected an object");
            &empty
        }
    };

    let timestamp = v.string(root, "timestamp", "report", "");

    let page_analyses = match root.get("page_analyses") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| v.page(item, &format!("page_analyses[{}]", index)))
            .collect(),
        Some(_) => {
            v.error("page_analyses", "expected an array");
            Vec::new()
        }
        None => {
            v.error("page_analyses", "missing");
            Vec::new()
        }
    };

    let overall_summary = v.overall_summary(root.get("overall_summary"), &page_analyses);
    let metadata = v.metadata(root.get("metadata"));

    ValidationResult {
        valid: v.errors.is_empty(),
        errors: v.errors,
        data: Report {
            timestamp,
            overall_summary,
            page_analyses,
            metadata,
        },
    }
}

impl Report {
    /// Runs [`validate_report`] over this report
    pub fn validated(&self) -> ValidationResult {
        match serde_json::to_value(self) {
            Ok(value) => validate_report(&value),
            Err(e) => ValidationResult {
                valid: false,
                errors: vec![format!("report: could not serialize: {}", e)],
                data: self.clone(),
            },
        }
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<String>,
}

impl Validator {
    fn error(&mut self, path: &str, message: &str) {
        self.errors.push(format!("{}: {}", path, message));
    }

    fn string(&mut self, object: &Map<String, Value>, key: &str, parent: &str, default: &str) -> String {
        let path = format!("{}.{}", parent, key);
        match object.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => match text_from_value(other) {
                Some(text) => {
                    self.error(&path, "coerced to string");
                    text
                }
                None => {
                    self.error(&path, "expected a string");
                    default.to_string()
                }
            },
            None => {
                self.error(&path, "missing");
                default.to_string()
            }
        }
    }

    fn page_score(&mut self, value: Option<&Value>, path: &str) -> u8 {
        let Some(value) = value else {
            self.error(path, "missing");
            return DEFAULT_SCORE;
        };
        let Some(raw) = score_from_value(value) else {
            self.error(path, "expected a score");
            return DEFAULT_SCORE;
        };

        let score = clamp_score(raw);
        let exact_integer = value.as_u64().map(|n| n == score as u64).unwrap_or(false);
        if !exact_integer {
            if raw < MIN_SCORE as f64 || raw > MAX_SCORE as f64 {
                self.error(path, &format!("score {} clamped to {}", raw, score));
            } else {
                self.error(path, "coerced to integer score");
            }
        }
        score
    }

    fn page(&mut self, item: &Value, path: &str) -> Option<PageAnalysisRecord> {
        let Some(object) = item.as_object() else {
            self.error(path, "expected an object, dropped");
            return None;
        };
        let defaults = PageAnalysisRecord::default();

        let key_issues = self.list(object, "key_issues", path, |v, item, item_path| {
            if item.is_string() {
                v.error(item_path, "converted bare string to issue object");
            } else if item.is_object() && first_text(item, &["how_to_fix"]).is_none() {
                v.error(item_path, "missing how_to_fix");
            }
            let issue: Option<KeyIssue> = issue_from_value(item, FIX_REQUIRES_REVIEW);
            if issue.is_none() {
                v.error(item_path, "unusable issue, dropped");
            }
            issue
        });

        let recommendations = self.list(object, "recommendations", path, |v, item, item_path| {
            if item.is_string() {
                v.error(item_path, "converted bare string to recommendation object");
            } else if item.is_object() && first_text(item, &["benefit"]).is_none() {
                v.error(item_path, "missing benefit");
            }
            let recommendation: Option<Recommendation> =
                recommendation_from_value(item, BENEFIT_REQUIRES_REVIEW);
            if recommendation.is_none() {
                v.error(item_path, "unusable recommendation, dropped");
            }
            recommendation
        });

        let section_scores = self.section_scores(object.get("section_scores"), &format!("{}.section_scores", path));

        Some(PageAnalysisRecord {
            page_type: self.string(object, "page_type", path, &defaults.page_type),
            title: self.string(object, "title", path, &defaults.title),
            overall_score: self.page_score(object.get("overall_score"), &format!("{}.overall_score", path)),
            overall_explanation: self.string(object, "overall_explanation", path, ""),
            key_issues,
            recommendations,
            summary: self.string(object, "summary", path, ""),
            section_scores,
            url: self.string(object, "url", path, ""),
            original_analysis: self.string(object, "original_analysis", path, ""),
        })
    }

    fn list<T>(
        &mut self,
        object: &Map<String, Value>,
        key: &str,
        parent: &str,
        mut convert: impl FnMut(&mut Self, &Value, &str) -> Option<T>,
    ) -> Vec<T> {
        let path = format!("{}.{}", parent, key);
        match object.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| convert(self, item, &format!("{}[{}]", path, index)))
                .collect(),
            Some(Value::Null) | None => {
                self.error(&path, "missing");
                Vec::new()
            }
            Some(single) => {
                self.error(&path, "expected an array");
                convert(self, single, &format!("{}[0]", path)).into_iter().collect()
            }
        }
    }

    fn section_scores(&mut self, value: Option<&Value>, path: &str) -> BTreeMap<String, u8> {
        match value {
            Some(Value::Object(scores)) => scores
                .iter()
                .filter_map(|(name, score)| {
                    let score_path = format!("{}.{}", path, name);
                    if score_from_value(score).is_none() {
                        self.error(&score_path, "expected a score, dropped");
                        return None;
                    }
                    Some((name.clone(), self.page_score(Some(score), &score_path)))
                })
                .collect(),
            Some(_) => {
                self.error(path, "expected an object");
                BTreeMap::new()
            }
            None => {
                self.error(path, "missing");
                BTreeMap::new()
            }
        }
    }

    fn string_list(&mut self, object: &Map<String, Value>, key: &str, parent: &str) -> Vec<String> {
        self.list(object, key, parent, |v, item, item_path| {
            if !item.is_string() {
                v.error(item_path, "coerced to string");
            }
            let text = item_text(item);
            if text.is_none() {
                v.error(item_path, "unusable entry, dropped");
            }
            text
        })
    }

    fn overall_summary(&mut self, value: Option<&Value>, pages: &[PageAnalysisRecord]) -> OverallSummary {
        const PATH: &str = "overall_summary";
        let empty = Map::new();
        let object = match value {
            Some(Value::Object(object)) => object,
            Some(_) => {
                self.error(PATH, "expected an object");
                &empty
            }
            None => {
                self.error(PATH, "missing");
                &empty
            }
        };

        let overall_score = match object.get("overall_score") {
            Some(value) => match score_from_value(value) {
                Some(raw) if (MIN_SCORE as f64..=MAX_SCORE as f64).contains(&raw) => {
                    if !value.is_number() {
                        self.error("overall_summary.overall_score", "coerced to number");
                    }
                    raw
                }
                Some(raw) => {
                    let clamped = round_one_decimal(raw.clamp(MIN_SCORE as f64, MAX_SCORE as f64));
                    self.error(
                        "overall_summary.overall_score",
                        &format!("score {} clamped to {}", raw, clamped),
                    );
                    clamped
                }
                None => {
                    self.error("overall_summary.overall_score", "expected a number");
                    mean_page_score(pages)
                }
            },
            None => {
                self.error("overall_summary.overall_score", "missing");
                mean_page_score(pages)
            }
        };

        match object.get("total_pages_analyzed").and_then(Value::as_u64) {
            Some(n) if n as usize == pages.len() => {}
            Some(n) => self.error(
                "overall_summary.total_pages_analyzed",
                &format!("was {}, set to {}", n, pages.len()),
            ),
            None => self.error("overall_summary.total_pages_analyzed", "missing or not an integer"),
        }

        OverallSummary {
            executive_summary: self.string(object, "executive_summary", PATH, ""),
            overall_score,
            total_pages_analyzed: pages.len(),
            most_critical_issues: self.string_list(object, "most_critical_issues", PATH),
            top_recommendations: self.string_list(object, "top_recommendations", PATH),
            key_strengths: self.string_list(object, "key_strengths", PATH),
            performance_summary: self.string(object, "performance_summary", PATH, ""),
            detailed_markdown_content: self.string(object, "detailed_markdown_content", PATH, ""),
        }
    }

    fn metadata(&mut self, value: Option<&Value>) -> ReportMetadata {
        const PATH: &str = "metadata";
        let empty = Map::new();
        let object = match value {
            Some(Value::Object(object)) => object,
            Some(_) => {
                self.error(PATH, "expected an object");
                &empty
            }
            None => {
                self.error(PATH, "missing");
                &empty
            }
        };

        let pages_heuristic_fallback = match object.get("pages_heuristic_fallback") {
            Some(value) => match value.as_u64() {
                Some(n) => n as usize,
                None => {
                    self.error("metadata.pages_heuristic_fallback", "expected a non-negative integer");
                    score_from_value(value).map(|n| n.max(0.0) as usize).unwrap_or(0)
                }
            },
            None => {
                self.error("metadata.pages_heuristic_fallback", "missing");
                0
            }
        };

        ReportMetadata {
            preset_key: self.string(object, "preset_key", PATH, ""),
            organization_name: self.string(object, "organization_name", PATH, ""),
            organization_type: self.string(object, "organization_type", PATH, ""),
            organization_purpose: self.string(object, "organization_purpose", PATH, ""),
            start_url: self.string(object, "start_url", PATH, ""),
            analysis_model: self.string(object, "analysis_model", PATH, ""),
            formatting_model: self.string(object, "formatting_model", PATH, ""),
            generated_at: self.string(object, "generated_at", PATH, ""),
            pages_heuristic_fallback,
            errors: self.string_list(object, "errors", PATH),
        }
    }
}
