//! Prompt text for analysis and formatting calls
//!
//! The analysis prompt asks for the section headings the heuristic extractor
//! understands, so even an unformattable reply keeps its scores and lists.

use crate::config::Preset;
use crate::extract::{PageAnalysisRecord, RawPageAnalysis};
use crate::stages::audit::AuditMetrics;
use std::fmt::Write;

pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a senior UX analyst reviewing one web page for \
an organization. You receive a screenshot of the page and, when available, its performance \
metrics. Be specific, cite what is visible, and keep recommendations actionable.";

pub const TECHNICAL_SYSTEM_PROMPT: &str = "You are a web performance engineer. Summarize \
performance audit results for a non-technical audience in a few short paragraphs.";

pub const OVERVIEW_SYSTEM_PROMPT: &str = "You are a senior UX strategist. Combine page-level \
reviews into a site-wide assessment for the organization's leadership.";

pub const FORMAT_SYSTEM_PROMPT: &str = "You convert UX review text into JSON. Reply with a single \
JSON object and nothing else. Never invent content that is not in the review.";

const ANALYSIS_OUTLINE: &str = "\
Structure your answer with these headings, each followed by (Score: n/10) and a short assessment:
1. FIRST IMPRESSION & CLARITY
2. GOAL ALIGNMENT
3. VISUAL DESIGN
4. CONTENT QUALITY
5. USABILITY & ACCESSIBILITY
6. CONVERSION OPTIMIZATION
7. TECHNICAL EXECUTION

Then add:
KEY ISSUES
- one bullet per issue, ending with \"How to Fix: ...\"
RECOMMENDATIONS
- one bullet per recommendation, ending with \"Benefit: ...\"

Finish with one line stating \"Overall score: n/10\" and why.";

fn organization_context(preset: &Preset) -> String {
    let mut context = format!("Organization: {}\n", preset.organization_name);
    if !preset.organization_type.is_empty() {
        let _ = writeln!(context, "Type: {}", preset.organization_type);
    }
    if !preset.organization_purpose.is_empty() {
        let _ = writeln!(context, "Purpose: {}", preset.organization_purpose);
    }
    context
}

/// Prompt for one page's analysis
pub fn page_analysis_prompt(preset: &Preset, url: &str, metrics: Option<&AuditMetrics>) -> String {
    let mut prompt = organization_context(preset);
    let _ = writeln!(prompt, "Page: {}\n", url);

    if let Some(metrics) = metrics {
        prompt.push_str("Performance metrics:\n");
        prompt.push_str(&metrics.describe());
        prompt.push('\n');
    }

    prompt.push_str(ANALYSIS_OUTLINE);
    prompt
}

/// Prompt for the site-wide technical summary
pub fn technical_summary_prompt(metrics: &[AuditMetrics]) -> String {
    let mut prompt = String::from("Performance audit results per page:\n\n");
    for page in metrics {
        let _ = writeln!(prompt, "## {}\n{}", page.url, page.describe());
    }
    prompt.push_str("\nSummarize the overall performance picture and the three most impactful fixes.");
    prompt
}

/// Prompt for the site-wide overview
pub fn overview_prompt(
    preset: &Preset,
    analyses: &[RawPageAnalysis],
    technical_summary: Option<&str>,
) -> String {
    let mut prompt = organization_context(preset);
    let _ = writeln!(prompt, "Site: {}\n", preset.url);

    for analysis in analyses {
        let _ = writeln!(prompt, "=== {} ===\n{}\n", analysis.url, analysis.analysis);
    }

    if let Some(summary) = technical_summary {
        let _ = writeln!(prompt, "=== PERFORMANCE ===\n{}\n", summary);
    }

    prompt.push_str(
        "Write an executive summary paragraph, then these headings with bullet lists:\n\
         MOST CRITICAL ISSUES\nTOP RECOMMENDATIONS\nKEY STRENGTHS\nPERFORMANCE SUMMARY",
    );
    prompt
}

/// Prompt asking the formatting model to restructure one page analysis
pub fn page_format_prompt(raw_text: &str, url: &str) -> String {
    format!(
        "Convert this review of {url} into JSON with exactly these keys:\n\
         page_type (string), title (string), overall_score (integer 1-10), \
         overall_explanation (string), key_issues (array of {{issue, how_to_fix}}, at most 5), \
         recommendations (array of {{recommendation, benefit}}, at most 5), summary (string), \
         section_scores (object of section name to integer 1-10).\n\n\
         Review:\n{raw_text}"
    )
}

/// Prompt asking the formatting model to restructure the site overview
pub fn overall_format_prompt(overview_text: &str, pages: &[PageAnalysisRecord]) -> String {
    let mut prompt = String::from(
        "Convert this site overview into JSON with exactly these keys:\n\
         executive_summary (string), most_critical_issues (array of strings, at most 5), \
         top_recommendations (array of strings, at most 5), key_strengths (array of strings), \
         performance_summary (string), detailed_markdown_content (string, the overview as markdown).\n\n",
    );
    let _ = writeln!(prompt, "Pages reviewed: {}", pages.len());
    for page in pages {
        let _ = writeln!(prompt, "- {} ({}): {}/10", page.title, page.url, page.overall_score);
    }
    let _ = write!(prompt, "\nOverview:\n{}", overview_text);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset() -> Preset {
        Preset {
            url: "https://example.org".to_string(),
            organization_name: "Helping Hands".to_string(),
            organization_type: "nonprofit".to_string(),
            organization_purpose: String::new(),
            analysis_options: Default::default(),
        }
    }

    #[test]
    fn test_page_prompt_mentions_headings_and_context() {
        let prompt = page_analysis_prompt(&preset(), "https://example.org/donate", None);
        assert!(prompt.contains("Helping Hands"));
        assert!(prompt.contains("Type: nonprofit"));
        assert!(!prompt.contains("Purpose:"));
        assert!(prompt.contains("FIRST IMPRESSION & CLARITY"));
        assert!(prompt.contains("How to Fix:"));
    }

    #[test]
    fn test_format_prompt_embeds_review() {
        let prompt = page_format_prompt("great page", "https://example.org/");
        assert!(prompt.contains("https://example.org/"));
        assert!(prompt.ends_with("great page"));
        assert!(prompt.contains("{issue, how_to_fix}"));
    }
}
