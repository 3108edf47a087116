//! Report data types
//!
//! Field names are the on-disk names of `structured-analysis.json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest score a page or section can receive
pub const MIN_SCORE: u8 = 1;

/// Highest score a page or section can receive
pub const MAX_SCORE: u8 = 10;

/// Score used when none can be recovered from the text
pub const DEFAULT_SCORE: u8 = 3;

/// Maximum issues and recommendations kept per page
pub const MAX_LIST_ITEMS: usize = 5;

/// Free-text model output for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPageAnalysis {
    pub url: String,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyIssue {
    pub issue: String,
    pub how_to_fix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation: String,
    pub benefit: String,
}

/// Structured analysis of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysisRecord {
    pub page_type: String,
    pub title: String,
    /// 1..=10
    pub overall_score: u8,
    pub overall_explanation: String,
    pub key_issues: Vec<KeyIssue>,
    pub recommendations: Vec<Recommendation>,
    pub summary: String,
    /// Section key to 1..=10 score
    pub section_scores: BTreeMap<String, u8>,
    pub url: String,
    pub original_analysis: String,
}

impl Default for PageAnalysisRecord {
    fn default() -> Self {
        Self {
            page_type: "Page".to_string(),
            title: "Untitled Page".to_string(),
            overall_score: DEFAULT_SCORE,
            overall_explanation: String::new(),
            key_issues: Vec::new(),
            recommendations: Vec::new(),
            summary: String::new(),
            section_scores: BTreeMap::new(),
            url: String::new(),
            original_analysis: String::new(),
        }
    }
}

/// Site-wide summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub executive_summary: String,
    /// Mean of page scores, one decimal place
    pub overall_score: f64,
    pub total_pages_analyzed: usize,
    pub most_critical_issues: Vec<String>,
    pub top_recommendations: Vec<String>,
    pub key_strengths: Vec<String>,
    pub performance_summary: String,
    pub detailed_markdown_content: String,
}

impl Default for OverallSummary {
    fn default() -> Self {
        Self {
            executive_summary: String::new(),
            overall_score: DEFAULT_SCORE as f64,
            total_pages_analyzed: 0,
            most_critical_issues: Vec::new(),
            top_recommendations: Vec::new(),
            key_strengths: Vec::new(),
            performance_summary: String::new(),
            detailed_markdown_content: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub preset_key: String,
    pub organization_name: String,
    pub organization_type: String,
    pub organization_purpose: String,
    pub start_url: String,
    pub analysis_model: String,
    pub formatting_model: String,
    pub generated_at: String,
    /// Pages whose record came from the heuristic extractor
    pub pages_heuristic_fallback: usize,
    /// Formatting and validation diagnostics
    pub errors: Vec<String>,
}

/// The complete structured report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: String,
    pub overall_summary: OverallSummary,
    pub page_analyses: Vec<PageAnalysisRecord>,
    pub metadata: ReportMetadata,
}

/// Outcome of [`crate::extract::validate_report`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no field needed repair
    pub valid: bool,
    pub errors: Vec<String>,
    /// The repaired report
    pub data: Report,
}

/// Rounds to one decimal place
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean page score with one decimal place, or the default when there are no pages
pub fn mean_page_score(pages: &[PageAnalysisRecord]) -> f64 {
    if pages.is_empty() {
        return DEFAULT_SCORE as f64;
    }
    let total: u32 = pages.iter().map(|p| p.overall_score as u32).sum();
    round_one_decimal(total as f64 / pages.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(score: u8) -> PageAnalysisRecord {
        PageAnalysisRecord {
            overall_score: score,
            ..PageAnalysisRecord::default()
        }
    }

    #[test]
    fn test_mean_page_score() {
        assert_eq!(mean_page_score(&[]), 3.0);
        assert_eq!(mean_page_score(&[page(7), page(8)]), 7.5);
        assert_eq!(mean_page_score(&[page(7), page(8), page(8)]), 7.7);
    }
}
