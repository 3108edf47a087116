//! Stage 5: HTML report
//!
//! The structured report is validated again on the way in, so a hand-edited
//! `structured-analysis.json` still renders.

use crate::extract::{validate_report, PageAnalysisRecord, Report};
use crate::output::read_json;
use crate::stages::{Stage, StageContext, StageError, StageKind, StageOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Write;

/// Renders `index.html` from `structured-analysis.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportStage;

#[async_trait]
impl Stage for ReportStage {
    fn kind(&self) -> StageKind {
        StageKind::Report
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        ctx.require_inputs(StageKind::Report)?;

        let raw: Value = read_json(&ctx.layout.structured_file())?;
        let result = validate_report(&raw);
        if !result.valid {
            tracing::warn!(
                "structured-analysis.json needed {} repairs before rendering",
                result.errors.len()
            );
        }

        let path = ctx.layout.report_file();
        tokio::fs::write(&path, render_html(&result.data)).await?;
        tracing::info!("Report written to {}", path.display());

        let mut output = StageOutput {
            items_ok: result.data.page_analyses.len(),
            ..StageOutput::default()
        };
        output.log.extend(result.errors);
        output.artifact(path);
        Ok(output)
    }
}

/// Escapes text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn list(html: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(html, "<h3>{}</h3>\n<ul>", escape_html(title));
    for item in items {
        let _ = writeln!(html, "<li>{}</li>", escape_html(item));
    }
    html.push_str("</ul>\n");
}

fn page_section(html: &mut String, page: &PageAnalysisRecord) {
    let _ = writeln!(
        html,
        "<section class=\"page\">\n<h2>{} <span class=\"score\">{}/10</span></h2>",
        escape_html(&page.title),
        page.overall_score
    );
    let _ = writeln!(
        html,
        "<p class=\"meta\">{} &middot; <a href=\"{}\">{}</a></p>",
        escape_html(&page.page_type),
        escape_html(&page.url),
        escape_html(&page.url)
    );
    if !page.summary.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", escape_html(&page.summary));
    }

    if !page.section_scores.is_empty() {
        html.push_str("<table>\n");
        for (section, score) in &page.section_scores {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}/10</td></tr>",
                escape_html(&section.replace('_', " ")),
                score
            );
        }
        html.push_str("</table>\n");
    }

    if !page.key_issues.is_empty() {
        html.push_str("<h3>Key issues</h3>\n<ul>\n");
        for issue in &page.key_issues {
            let _ = writeln!(
                html,
                "<li><strong>{}</strong><br>How to fix: {}</li>",
                escape_html(&issue.issue),
                escape_html(&issue.how_to_fix)
            );
        }
        html.push_str("</ul>\n");
    }

    if !page.recommendations.is_empty() {
        html.push_str("<h3>Recommendations</h3>\n<ul>\n");
        for rec in &page.recommendations {
            let _ = writeln!(
                html,
                "<li><strong>{}</strong><br>Benefit: {}</li>",
                escape_html(&rec.recommendation),
                escape_html(&rec.benefit)
            );
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</section>\n");
}

/// Renders a self-contained HTML page for `report`
pub fn render_html(report: &Report) -> String {
    let summary = &report.overall_summary;
    let name = if report.metadata.organization_name.is_empty() {
        "Website"
    } else {
        report.metadata.organization_name.as_str()
    };

    let mut html = String::new();
    let _ = writeln!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} - UX Report</title>\n<style>{}</style>\n</head>\n<body>",
        escape_html(name),
        STYLE
    );
    let _ = writeln!(
        html,
        "<header>\n<h1>{}</h1>\n<p class=\"meta\">{} &middot; {} pages &middot; overall {:.1}/10</p>\n</header>",
        escape_html(name),
        escape_html(&report.metadata.start_url),
        summary.total_pages_analyzed,
        summary.overall_score
    );

    html.push_str("<section class=\"summary\">\n");
    if !summary.executive_summary.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", escape_html(&summary.executive_summary));
    }
    list(&mut html, "Most critical issues", &summary.most_critical_issues);
    list(&mut html, "Top recommendations", &summary.top_recommendations);
    list(&mut html, "Key strengths", &summary.key_strengths);
    if !summary.performance_summary.is_empty() {
        let _ = writeln!(
            html,
            "<h3>Performance</h3>\n<p>{}</p>",
            escape_html(&summary.performance_summary)
        );
    }
    html.push_str("</section>\n");

    for page in &report.page_analyses {
        page_section(&mut html, page);
    }

    let _ = writeln!(
        html,
        "<footer class=\"meta\">Generated {} with {}</footer>\n</body>\n</html>",
        escape_html(&report.timestamp),
        escape_html(&report.metadata.analysis_model)
    );
    html
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem;color:#222}\
.meta{color:#666;font-size:.9rem}.score{float:right;color:#2a6}\
section{border-top:1px solid #ddd;padding-top:1rem}table{border-collapse:collapse}\
td{padding:.2rem .8rem;border-bottom:1px solid #eee}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{KeyIssue, OverallSummary};

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert(\"x\" & 'y')</script>"),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_render_escapes_model_text() {
        let report = Report {
            overall_summary: OverallSummary {
                executive_summary: "Good <b>overall</b>".to_string(),
                most_critical_issues: vec!["Slow & heavy".to_string()],
                ..OverallSummary::default()
            },
            page_analyses: vec![PageAnalysisRecord {
                title: "<img src=x>".to_string(),
                url: "https://example.com/".to_string(),
                key_issues: vec![KeyIssue {
                    issue: "Menu hidden".to_string(),
                    how_to_fix: "Show it".to_string(),
                }],
                ..PageAnalysisRecord::default()
            }],
            ..Report::default()
        };

        let html = render_html(&report);
        assert!(html.contains("Good &lt;b&gt;overall&lt;/b&gt;"));
        assert!(html.contains("<li>Slow &amp; heavy</li>"));
        assert!(html.contains("&lt;img src=x&gt;"));
        assert!(!html.contains("<img"));
        assert!(html.contains("How to fix: Show it"));
        assert!(html.contains("<title>Website - UX Report</title>"));
    }
}
