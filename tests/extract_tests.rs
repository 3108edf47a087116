//! Integration tests for the formatting chain and report validation
//!
//! The formatting model is an OpenAI-compatible wiremock server, so the whole
//! path from HTTP reply to validated report is exercised.

use serde_json::json;
use std::sync::Arc;
use ux_sweep::extract::{extract_page_record, Formatter, RawPageAnalysis, DEFAULT_SCORE};
use ux_sweep::llm::OpenAiModel;
use ux_sweep::stages::analysis::{build_report, AnalysisFile};
use ux_sweep::validate_report;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

const PROSE: &str = "\
Thanks for sharing the page.

The page presents the organization's mission in a long block of text that visitors must read \
before finding any way to get involved, and the layout feels crowded on smaller screens.

It could be better.";

fn analysis_file(pages: Vec<RawPageAnalysis>) -> AnalysisFile {
    AnalysisFile {
        preset_key: "helping_hands".to_string(),
        organization_name: "Helping Hands".to_string(),
        start_url: "https://example.org".to_string(),
        analysis_model: "gpt-4o".to_string(),
        page_analyses: pages,
        overview: "The site is friendly but slow.\n\nKEY STRENGTHS\n- Warm photography".to_string(),
        ..AnalysisFile::default()
    }
}

#[test]
fn test_plain_prose_still_yields_a_record() {
    let record = extract_page_record(PROSE, "https://example.org/about-us");

    assert!(record.summary.starts_with("The page presents the organization's mission"));
    assert_eq!(record.overall_score, DEFAULT_SCORE);
    assert_eq!(record.url, "https://example.org/about-us");
    assert_eq!(record.original_analysis, PROSE);
    assert!(record.key_issues.is_empty());
}

#[tokio::test]
async fn test_fenced_json_reply_is_recovered() {
    let server = MockServer::start().await;
    let reply = "Here is the JSON you asked for:\n```json\n{\"page_type\": \"Homepage\", \"title\": \"Welcome\", \
                 \"overall_score\": \"7/10\", \"key_issues\": [\"Donate button hidden\"], \
                 \"recommendations\": [{\"recommendation\": \"Pin the donate button\", \"benefit\": \"More gifts\"}]}\n```";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
        .mount(&server)
        .await;

    let model = Arc::new(OpenAiModel::new("sk-test", server.uri()).unwrap());
    let formatter = Formatter::new(model, "gpt-4o-mini", 2);
    let formatted = formatter
        .format_pages(&[RawPageAnalysis {
            url: "https://example.org/".to_string(),
            analysis: PROSE.to_string(),
        }])
        .await;

    assert_eq!(formatted.heuristic_fallbacks, 0);
    let record = &formatted.records[0];
    assert_eq!(record.title, "Welcome");
    assert_eq!(record.overall_score, 7);
    assert_eq!(record.key_issues.len(), 1);
    assert_eq!(record.recommendations[0].benefit, "More gifts");
    // Fields the reply left out come from the text itself.
    assert!(record.summary.starts_with("The page presents"));
}

#[tokio::test]
async fn test_build_report_with_api_down_falls_back_to_heuristics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let model = Arc::new(OpenAiModel::new("sk-test", server.uri()).unwrap());
    let analysis = analysis_file(vec![
        RawPageAnalysis {
            url: "https://example.org/".to_string(),
            analysis: "# Home\n\nOverall score: 6/10 because the hero is clear.".to_string(),
        },
        RawPageAnalysis {
            url: "https://example.org/about-us".to_string(),
            analysis: PROSE.to_string(),
        },
    ]);

    let result = build_report(model, "gpt-4o-mini", 2, &analysis).await;
    let report = &result.data;

    assert!(result.valid, "unexpected repairs: {:?}", result.errors);
    assert_eq!(report.page_analyses.len(), 2);
    assert_eq!(report.page_analyses[0].overall_score, 6);
    assert_eq!(report.page_analyses[1].overall_score, DEFAULT_SCORE);
    assert_eq!(report.overall_summary.total_pages_analyzed, 2);
    assert_eq!(report.overall_summary.overall_score, 4.5);
    assert_eq!(report.overall_summary.key_strengths, vec!["Warm photography".to_string()]);
    assert_eq!(report.metadata.pages_heuristic_fallback, 2);
    assert_eq!(report.metadata.errors.len(), 2);
    assert_eq!(report.metadata.organization_name, "Helping Hands");
    assert_eq!(report.metadata.formatting_model, "gpt-4o-mini");
}

#[tokio::test]
async fn test_build_report_uses_page_and_overall_replies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("executive_summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"executive_summary": "Solid site.", "overall_score": 1, "total_pages_analyzed": 99,
                "top_recommendations": ["Speed up images"]}"#,
        )))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"title": "Home", "overall_score": 9, "summary": "Great."}"#,
        )))
        .with_priority(2)
        .mount(&server)
        .await;

    let model = Arc::new(OpenAiModel::new("sk-test", server.uri()).unwrap());
    let analysis = analysis_file(vec![RawPageAnalysis {
        url: "https://example.org/".to_string(),
        analysis: PROSE.to_string(),
    }]);

    let result = build_report(model, "gpt-4o-mini", 1, &analysis).await;
    let summary = &result.data.overall_summary;

    assert_eq!(summary.executive_summary, "Solid site.");
    assert_eq!(summary.top_recommendations, vec!["Speed up images".to_string()]);
    // Score and count always come from the pages, never from the model.
    assert_eq!(summary.overall_score, 9.0);
    assert_eq!(summary.total_pages_analyzed, 1);
    assert_eq!(result.data.metadata.pages_heuristic_fallback, 0);
}

#[test]
fn test_validation_repairs_and_is_idempotent() {
    let mangled = json!({
        "timestamp": "2024-05-01T10:00:00Z",
        "overall_summary": "not an object",
        "page_analyses": [
            {
                "url": "https://example.org/",
                "overall_score": "8/10",
                "key_issues": ["Some issue text"],
                "recommendations": "also not a list"
            },
            "garbage"
        ]
    });

    let first = validate_report(&mangled);
    assert!(!first.valid);
    let page = &first.data.page_analyses[0];
    assert_eq!(first.data.page_analyses.len(), 1);
    assert_eq!(page.overall_score, 8);
    assert_eq!(page.key_issues[0].issue, "Some issue text");
    assert_eq!(page.key_issues[0].how_to_fix, "Fix details require review.");
    assert!(page.recommendations.is_empty());
    assert_eq!(first.data.overall_summary.total_pages_analyzed, 1);

    let second = validate_report(&serde_json::to_value(&first.data).unwrap());
    assert!(second.valid, "second pass repaired: {:?}", second.errors);
    assert_eq!(second.data, first.data);
}
