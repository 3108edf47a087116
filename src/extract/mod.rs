//! Structured-data extraction and report validation
//!
//! # Components
//!
//! - `types`: the report shape written to `structured-analysis.json`
//! - `json_block`: JSON recovery from model replies
//! - `heuristic`: per-field extraction from free text
//! - `formatter`: the per-page and site-wide formatting chain
//! - `validation`: pure shape repair of an assembled report

mod coerce;
pub mod formatter;
pub mod heuristic;
pub mod json_block;
mod types;
mod validation;

pub use formatter::{FormattedPages, Formatter, RecordSource};
pub use heuristic::{extract_page_record, overall_from_text};
pub use types::{
    mean_page_score, KeyIssue, OverallSummary, PageAnalysisRecord, RawPageAnalysis,
    Recommendation, Report, ReportMetadata, ValidationResult, DEFAULT_SCORE, MAX_LIST_ITEMS,
    MAX_SCORE, MIN_SCORE,
};
pub use validation::{validate_report, BENEFIT_REQUIRES_REVIEW, FIX_REQUIRES_REVIEW};
