//! Turns free-text analyses into typed records
//!
//! Each page goes through the formatting model first. Whatever comes back is
//! run through the JSON recovery chain; when nothing usable is recovered the
//! heuristic extractor reads the original analysis instead. None of this can
//! fail: the worst case is a record of placeholders.

use crate::extract::coerce::{
    issue_from_value, item_text, recommendation_from_value, score_from_value, text_from_value,
};
use crate::extract::heuristic::{self, clamp_score, BENEFIT_NOT_PARSED, FIX_NOT_PARSED};
use crate::extract::json_block::{parse_json_object, JsonSource};
use crate::extract::types::{
    mean_page_score, OverallSummary, PageAnalysisRecord, RawPageAnalysis, MAX_LIST_ITEMS,
};
use crate::llm::{prompts, CompletionRequest, LanguageModel};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a record's fields came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Json(JsonSource),
    Heuristic,
}

/// Result of formatting a batch of pages
#[derive(Debug, Clone, Default)]
pub struct FormattedPages {
    pub records: Vec<PageAnalysisRecord>,
    /// Pages that fell back to the heuristic extractor
    pub heuristic_fallbacks: usize,
    /// Per-page diagnostics
    pub errors: Vec<String>,
}

/// Formatting model wrapper
pub struct Formatter {
    model: Arc<dyn LanguageModel>,
    model_name: String,
    concurrency: usize,
}

impl Formatter {
    pub fn new(model: Arc<dyn LanguageModel>, model_name: impl Into<String>, concurrency: usize) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Formats one page; never fails
    pub async fn format_page(&self, raw_text: &str, url: &str) -> PageAnalysisRecord {
        self.format_page_traced(raw_text, url).await.0
    }

    async fn format_page_traced(
        &self,
        raw_text: &str,
        url: &str,
    ) -> (PageAnalysisRecord, RecordSource, Option<String>) {
        let request = CompletionRequest::new(
            &self.model_name,
            prompts::FORMAT_SYSTEM_PROMPT,
            prompts::page_format_prompt(raw_text, url),
        )
        .temperature(0.0)
        .json_response();

        let (reply, error) = match self.model.complete(&request).await {
            Ok(text) => (Some(text), None),
            Err(e) => {
                tracing::warn!("Formatting call failed for {}: {}", url, e);
                (None, Some(format!("{}: formatting call failed: {}", url, e)))
            }
        };

        match reply.as_deref().and_then(parse_json_object) {
            Some((object, source)) => (record_from_object(&object, raw_text, url), RecordSource::Json(source), error),
            None => {
                tracing::debug!("Using heuristic extraction for {}", url);
                (
                    heuristic::extract_page_record(raw_text, url),
                    RecordSource::Heuristic,
                    error,
                )
            }
        }
    }

    /// Formats pages in chunks of the configured concurrency
    ///
    /// Each chunk completes before the next one starts. Output order matches
    /// input order.
    pub async fn format_pages(&self, pages: &[RawPageAnalysis]) -> FormattedPages {
        let mut formatted = FormattedPages::default();

        for (index, chunk) in pages.chunks(self.concurrency).enumerate() {
            tracing::info!(
                "Formatting batch {} ({} pages)",
                index + 1,
                chunk.len()
            );
            let results = join_all(
                chunk
                    .iter()
                    .map(|page| self.format_page_traced(&page.analysis, &page.url)),
            )
            .await;

            for (record, source, error) in results {
                if source == RecordSource::Heuristic {
                    formatted.heuristic_fallbacks += 1;
                }
                formatted.errors.extend(error);
                formatted.records.push(record);
            }
        }
        formatted
    }

    /// Formats the site-wide summary; never fails
    ///
    /// `overall_score` and `total_pages_analyzed` always come from `pages`.
    pub async fn format_overall(&self, pages: &[PageAnalysisRecord], overview_text: &str) -> OverallSummary {
        let request = CompletionRequest::new(
            &self.model_name,
            prompts::FORMAT_SYSTEM_PROMPT,
            prompts::overall_format_prompt(overview_text, pages),
        )
        .temperature(0.0)
        .json_response();

        let reply = match self.model.complete(&request).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("Overall formatting call failed: {}", e);
                None
            }
        };

        let mut summary = match reply.as_deref().and_then(parse_json_object) {
            Some((object, _)) => summary_from_object(&object, overview_text, pages),
            None => heuristic::overall_from_text(overview_text, pages),
        };
        summary.overall_score = mean_page_score(pages);
        summary.total_pages_analyzed = pages.len();
        summary
    }
}

/// Builds a page record from a recovered JSON object
///
/// Fields that are missing or unusable are taken from the heuristic
/// extractor run on the original text.
pub fn record_from_object(object: &Map<String, Value>, raw_text: &str, url: &str) -> PageAnalysisRecord {
    let fallback = heuristic::extract_page_record(raw_text, url);
    let text = |key: &str| {
        object
            .get(key)
            .and_then(text_from_value)
            .filter(|s| !s.is_empty())
    };

    let key_issues: Vec<_> = object
        .get("key_issues")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| issue_from_value(item, FIX_NOT_PARSED))
                .take(MAX_LIST_ITEMS)
                .collect()
        })
        .unwrap_or_default();

    let recommendations: Vec<_> = object
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| recommendation_from_value(item, BENEFIT_NOT_PARSED))
                .take(MAX_LIST_ITEMS)
                .collect()
        })
        .unwrap_or_default();

    let section_scores: BTreeMap<String, u8> = object
        .get("section_scores")
        .and_then(Value::as_object)
        .map(|scores| {
            scores
                .iter()
                .filter_map(|(name, value)| score_from_value(value).map(|s| (name.clone(), clamp_score(s))))
                .collect()
        })
        .unwrap_or_default();

    PageAnalysisRecord {
        page_type: text("page_type").unwrap_or(fallback.page_type),
        title: text("title").unwrap_or(fallback.title),
        overall_score: object
            .get("overall_score")
            .and_then(score_from_value)
            .map(clamp_score)
            .unwrap_or(fallback.overall_score),
        overall_explanation: text("overall_explanation").unwrap_or(fallback.overall_explanation),
        key_issues: if key_issues.is_empty() { fallback.key_issues } else { key_issues },
        recommendations: if recommendations.is_empty() {
            fallback.recommendations
        } else {
            recommendations
        },
        summary: text("summary").unwrap_or(fallback.summary),
        section_scores: if section_scores.is_empty() {
            fallback.section_scores
        } else {
            section_scores
        },
        url: url.to_string(),
        original_analysis: raw_text.to_string(),
    }
}

/// Builds the site-wide summary from a recovered JSON object
pub fn summary_from_object(
    object: &Map<String, Value>,
    overview_text: &str,
    pages: &[PageAnalysisRecord],
) -> OverallSummary {
    let fallback = heuristic::overall_from_text(overview_text, pages);
    let text = |key: &str| {
        object
            .get(key)
            .and_then(text_from_value)
            .filter(|s| !s.is_empty())
    };
    let list = |key: &str, fallback: Vec<String>| -> Vec<String> {
        let items: Vec<String> = object
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(item_text).take(MAX_LIST_ITEMS).collect())
            .unwrap_or_default();
        if items.is_empty() {
            fallback
        } else {
            items
        }
    };

    OverallSummary {
        executive_summary: text("executive_summary").unwrap_or(fallback.executive_summary),
        most_critical_issues: list("most_critical_issues", fallback.most_critical_issues),
        top_recommendations: list("top_recommendations", fallback.top_recommendations),
        key_strengths: list("key_strengths", fallback.key_strengths),
        performance_summary: text("performance_summary").unwrap_or(fallback.performance_summary),
        detailed_markdown_content: text("detailed_markdown_content")
            .unwrap_or(fallback.detailed_markdown_content),
        ..OverallSummary::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::types::DEFAULT_SCORE;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with canned texts in order, then errors
    struct CannedModel {
        replies: Mutex<Vec<Result<String, LlmError>>>,
    }

    impl CannedModel {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            let mut replies = replies;
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(LlmError::Network("no more replies".into())))
        }
    }

    const PROSE: &str = "The landing page presents a friendly welcome and a clear description of the food pantry hours and locations.";

    #[tokio::test]
    async fn test_strict_json_reply() {
        let reply = r#"{"title": "Pantry", "overall_score": 8, "key_issues": [{"issue": "No map", "how_to_fix": "Embed one"}], "summary": "Good page"}"#;
        let formatter = Formatter::new(CannedModel::new(vec![Ok(reply.into())]), "m", 2);

        let record = formatter.format_page(PROSE, "https://example.com/pantry").await;
        assert_eq!(record.title, "Pantry");
        assert_eq!(record.overall_score, 8);
        assert_eq!(record.key_issues[0].how_to_fix, "Embed one");
        assert_eq!(record.url, "https://example.com/pantry");
        assert_eq!(record.original_analysis, PROSE);
    }

    #[tokio::test]
    async fn test_fenced_reply_with_out_of_range_score() {
        let reply = "Sure!\n```json\n{\"overall_score\": \"14/10\", \"recommendations\": [\"Add hours\"]}\n```";
        let formatter = Formatter::new(CannedModel::new(vec![Ok(reply.into())]), "m", 2);

        let record = formatter.format_page(PROSE, "https://example.com/").await;
        assert_eq!(record.overall_score, 10);
        assert_eq!(record.recommendations[0].benefit, BENEFIT_NOT_PARSED);
        assert_eq!(record.summary, PROSE);
    }

    #[tokio::test]
    async fn test_model_error_falls_back_to_heuristics() {
        let formatter = Formatter::new(
            CannedModel::new(vec![Err(LlmError::Network("down".into()))]),
            "m",
            2,
        );
        let record = formatter.format_page(PROSE, "https://example.com/").await;
        assert_eq!(record.overall_score, DEFAULT_SCORE);
        assert_eq!(record.summary, PROSE);
        assert_eq!(record.page_type, "Homepage");
    }

    #[tokio::test]
    async fn test_format_pages_counts_fallbacks_and_keeps_order() {
        let pages: Vec<RawPageAnalysis> = (0..5)
            .map(|i| RawPageAnalysis {
                url: format!("https://example.com/p{}", i),
                analysis: PROSE.to_string(),
            })
            .collect();
        let formatter = Formatter::new(
            CannedModel::new(vec![
                Ok(r#"{"overall_score": 9}"#.into()),
                Ok("not json".into()),
                Err(LlmError::Network("down".into())),
                Ok(r#"{"overall_score": 5}"#.into()),
            ]),
            "m",
            2,
        );

        let formatted = formatter.format_pages(&pages).await;
        assert_eq!(formatted.records.len(), 5);
        assert_eq!(formatted.heuristic_fallbacks, 3);
        assert_eq!(formatted.errors.len(), 2);
        let urls: Vec<&str> = formatted.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/p0",
                "https://example.com/p1",
                "https://example.com/p2",
                "https://example.com/p3",
                "https://example.com/p4"
            ]
        );
        for record in &formatted.records {
            assert!((1..=10).contains(&record.overall_score));
        }
    }

    #[tokio::test]
    async fn test_format_overall_backfills_score_and_count() {
        let pages = vec![
            PageAnalysisRecord {
                overall_score: 6,
                ..PageAnalysisRecord::default()
            },
            PageAnalysisRecord {
                overall_score: 9,
                ..PageAnalysisRecord::default()
            },
        ];
        let reply = r#"{"executive_summary": "Solid site", "overall_score": 2, "total_pages_analyzed": 40, "key_strengths": ["Clear mission"]}"#;
        let formatter = Formatter::new(CannedModel::new(vec![Ok(reply.into())]), "m", 2);

        let overall = formatter.format_overall(&pages, "overview").await;
        assert_eq!(overall.executive_summary, "Solid site");
        assert_eq!(overall.overall_score, 7.5);
        assert_eq!(overall.total_pages_analyzed, 2);
        assert_eq!(overall.key_strengths, vec!["Clear mission"]);
    }

    #[tokio::test]
    async fn test_format_overall_without_pages() {
        let formatter = Formatter::new(
            CannedModel::new(vec![Err(LlmError::MissingApiKey)]),
            "m",
            1,
        );
        let overall = formatter.format_overall(&[], "").await;
        assert_eq!(overall.overall_score, 3.0);
        assert_eq!(overall.total_pages_analyzed, 0);
    }
}
