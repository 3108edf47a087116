//! Heuristic field extraction from free-form analysis text
//!
//! This is the last fallback when no JSON can be recovered from the
//! formatting model. Each field has its own pure function over the original
//! analysis text, so a partially structured text still yields whatever it
//! contains.

use crate::extract::types::{
    KeyIssue, OverallSummary, PageAnalysisRecord, Recommendation, DEFAULT_SCORE, MAX_LIST_ITEMS,
    MAX_SCORE, MIN_SCORE,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Placeholder when an issue has no "How to Fix:" part
pub const FIX_NOT_PARSED: &str = "Fix details not parsed.";

/// Placeholder when a recommendation has no "Benefit:" part
pub const BENEFIT_NOT_PARSED: &str = "Benefit details not parsed.";

pub const EXPLANATION_NOT_PARSED: &str = "Score explanation not parsed.";

/// Section headings and the keys they are reported under
pub const SECTION_HEADINGS: &[(&str, &str)] = &[
    ("FIRST IMPRESSION & CLARITY", "first_impression_clarity"),
    ("GOAL ALIGNMENT", "goal_alignment"),
    ("VISUAL DESIGN", "visual_design"),
    ("CONTENT QUALITY", "content_quality"),
    ("USABILITY & ACCESSIBILITY", "usability_accessibility"),
    ("CONVERSION OPTIMIZATION", "conversion_optimization"),
    ("TECHNICAL EXECUTION", "technical_execution"),
];

const ISSUE_HEADINGS: &[&str] = &["KEY ISSUES", "CRITICAL ISSUES", "ISSUES"];
const RECOMMENDATION_HEADINGS: &[&str] =
    &["RECOMMENDATIONS", "TOP RECOMMENDATIONS", "KEY RECOMMENDATIONS"];
const SITE_ISSUE_HEADINGS: &[&str] = &[
    "MOST CRITICAL ISSUES",
    "CRITICAL ISSUES",
    "KEY ISSUES",
    "ISSUES",
];
const STRENGTH_HEADINGS: &[&str] = &["KEY STRENGTHS", "STRENGTHS"];
const PERFORMANCE_HEADINGS: &[&str] = &["PERFORMANCE SUMMARY", "PERFORMANCE", "TECHNICAL PERFORMANCE"];

const MIN_SUMMARY_CHARS: usize = 50;
const MAX_SUMMARY_CHARS: usize = 500;

/// Builds a complete record from analysis text alone
pub fn extract_page_record(text: &str, url: &str) -> PageAnalysisRecord {
    let (overall_score, overall_explanation) = match overall_score(text) {
        Some((score, line)) => (score, line),
        None => (DEFAULT_SCORE, EXPLANATION_NOT_PARSED.to_string()),
    };

    PageAnalysisRecord {
        page_type: page_type(url),
        title: title(text, url),
        overall_score,
        overall_explanation,
        key_issues: key_issues(text),
        recommendations: recommendations(text),
        summary: summary(text).unwrap_or_default(),
        section_scores: section_scores(text),
        url: url.to_string(),
        original_analysis: text.to_string(),
    }
}

/// Scores of the known sections, keyed by section key
///
/// A section counts when its heading is followed on the same line by
/// `Score: n/10`.
pub fn section_scores(text: &str) -> BTreeMap<String, u8> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        SECTION_HEADINGS
            .iter()
            .filter_map(|(heading, key)| {
                let heading = heading
                    .split('&')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join("(?:&|and)");
                let pattern = format!(
                    r"(?i){}[^\n]*?score\s*:?\s*(\d{{1,2}}(?:\.\d+)?)\s*/\s*10",
                    heading
                );
                Regex::new(&pattern).ok().map(|re| (re, *key))
            })
            .collect()
    });

    patterns
        .iter()
        .filter_map(|(re, key)| {
            let captures = re.captures(text)?;
            let score = parse_score(captures.get(1)?.as_str())?;
            Some((key.to_string(), score))
        })
        .collect()
}

/// Issues listed under an issues heading
pub fn key_issues(text: &str) -> Vec<KeyIssue> {
    static FIX: OnceLock<Regex> = OnceLock::new();
    let fix = FIX.get_or_init(|| {
        Regex::new(r"(?i)[\s\-–—(|]*how to fix\s*:\s*").expect("fix pattern is valid")
    });

    let mut issues: Vec<KeyIssue> = Vec::new();
    for bullet in bullets_under(text, ISSUE_HEADINGS) {
        let (issue, how_to_fix) = split_on(fix, &bullet);
        match (issue.is_empty(), how_to_fix) {
            (true, Some(how_to_fix)) => {
                if let Some(last) = issues.last_mut() {
                    if last.how_to_fix == FIX_NOT_PARSED {
                        last.how_to_fix = how_to_fix;
                    }
                }
            }
            (true, None) => {}
            (false, how_to_fix) => issues.push(KeyIssue {
                issue,
                how_to_fix: how_to_fix.unwrap_or_else(|| FIX_NOT_PARSED.to_string()),
            }),
        }
    }
    issues.truncate(MAX_LIST_ITEMS);
    issues
}

/// Recommendations listed under a recommendations heading
pub fn recommendations(text: &str) -> Vec<Recommendation> {
    static BENEFIT: OnceLock<Regex> = OnceLock::new();
    let benefit_re = BENEFIT.get_or_init(|| {
        Regex::new(r"(?i)[\s\-–—(|]*benefit\s*:\s*").expect("benefit pattern is valid")
    });

    let mut recommendations: Vec<Recommendation> = Vec::new();
    for bullet in bullets_under(text, RECOMMENDATION_HEADINGS) {
        let (recommendation, benefit) = split_on(benefit_re, &bullet);
        match (recommendation.is_empty(), benefit) {
            (true, Some(benefit)) => {
                if let Some(last) = recommendations.last_mut() {
                    if last.benefit == BENEFIT_NOT_PARSED {
                        last.benefit = benefit;
                    }
                }
            }
            (true, None) => {}
            (false, benefit) => recommendations.push(Recommendation {
                recommendation,
                benefit: benefit.unwrap_or_else(|| BENEFIT_NOT_PARSED.to_string()),
            }),
        }
    }
    recommendations.truncate(MAX_LIST_ITEMS);
    recommendations
}

/// The overall score and the line it was found on
///
/// A line mentioning "overall" wins; otherwise the first `score is N`,
/// `score of N` or `Score: N/10` anywhere in the text.
pub fn overall_score(text: &str) -> Option<(u8, String)> {
    static OVERALL: OnceLock<Regex> = OnceLock::new();
    static ANY: OnceLock<Regex> = OnceLock::new();
    let overall = OVERALL.get_or_init(|| {
        Regex::new(r"(?i)overall[^\n]*?score\s*(?:is|of|:)?\s*\**\s*(\d{1,2}(?:\.\d+)?)")
            .expect("overall score pattern is valid")
    });
    let any = ANY.get_or_init(|| {
        Regex::new(
            r"(?i)score\s+(?:is|of)\s+(\d{1,2}(?:\.\d+)?)|score\s*:\s*(\d{1,2}(?:\.\d+)?)\s*/\s*10",
        )
        .expect("score pattern is valid")
    });

    let lines: Vec<&str> = text.lines().collect();

    let from_overall = lines.iter().find_map(|line| {
        let captures = overall.captures(line)?;
        let score = parse_score(captures.get(1)?.as_str())?;
        Some((score, clean_inline(line)))
    });
    if from_overall.is_some() {
        return from_overall;
    }

    lines.iter().find_map(|line| {
        let captures = any.captures(line)?;
        let value = captures.get(1).or_else(|| captures.get(2))?;
        let score = parse_score(value.as_str())?;
        Some((score, clean_inline(line)))
    })
}

/// First prose paragraph longer than 50 characters, truncated to 500
pub fn summary(text: &str) -> Option<String> {
    paragraphs(text)
        .into_iter()
        .find(|p| p.chars().count() > MIN_SUMMARY_CHARS)
        .map(|p| p.chars().take(MAX_SUMMARY_CHARS).collect())
}

/// First markdown heading, or a title derived from the URL
pub fn title(text: &str, url: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| clean_inline(line.trim_start_matches('#')))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| title_from_url(url))
}

/// Human title from the last path segment of a URL
pub fn title_from_url(url: &str) -> String {
    let segment = ::url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        });

    match segment {
        None => "Home Page".to_string(),
        Some(segment) => {
            let stem = segment.split('.').next().unwrap_or(&segment);
            stem.split(['-', '_'])
                .filter(|word| !word.is_empty())
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Page type derived from the first path segment
pub fn page_type(url: &str) -> String {
    let first = ::url::Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()).map(|s| s.to_lowercase()))
    });

    let Some(first) = first else {
        return "Homepage".to_string();
    };

    let kind = match first.as_str() {
        s if s.contains("about") || s == "mission" || s == "history" => "About",
        s if s.contains("contact") => "Contact",
        "blog" | "news" | "articles" | "stories" | "press" | "updates" => "Blog/News",
        "services" | "programs" | "program" | "what-we-do" | "solutions" => "Services",
        "donate" | "give" | "giving" | "support-us" => "Donation",
        "events" | "calendar" => "Events",
        "products" | "product" | "shop" | "store" => "Product",
        "careers" | "jobs" | "volunteer" | "get-involved" => "Get Involved",
        "team" | "staff" | "leadership" | "people" | "board" => "Team",
        "faq" | "faqs" | "help" | "support" => "Support",
        "resources" | "library" | "publications" => "Resources",
        _ => "Content Page",
    };
    kind.to_string()
}

/// Site-wide summary from the overview text, backed by the page records
///
/// `overall_score` and `total_pages_analyzed` are left for the caller to
/// back-fill from the pages.
pub fn overall_from_text(text: &str, pages: &[PageAnalysisRecord]) -> OverallSummary {
    let executive_summary = summary(text).unwrap_or_else(|| {
        pages
            .iter()
            .map(|p| p.summary.as_str())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    });

    let mut most_critical_issues = bullets_under(text, SITE_ISSUE_HEADINGS);
    if most_critical_issues.is_empty() {
        most_critical_issues = first_unique(pages.iter().filter_map(|p| p.key_issues.first()).map(|i| i.issue.clone()));
    }
    most_critical_issues.truncate(MAX_LIST_ITEMS);

    let mut top_recommendations = bullets_under(text, RECOMMENDATION_HEADINGS);
    if top_recommendations.is_empty() {
        top_recommendations = first_unique(
            pages
                .iter()
                .filter_map(|p| p.recommendations.first())
                .map(|r| r.recommendation.clone()),
        );
    }
    top_recommendations.truncate(MAX_LIST_ITEMS);

    let mut key_strengths = bullets_under(text, STRENGTH_HEADINGS);
    key_strengths.truncate(MAX_LIST_ITEMS);

    OverallSummary {
        executive_summary,
        most_critical_issues,
        top_recommendations,
        key_strengths,
        performance_summary: paragraph_under(text, PERFORMANCE_HEADINGS).unwrap_or_default(),
        detailed_markdown_content: text.to_string(),
        ..OverallSummary::default()
    }
}

/// Clamps and rounds a raw score into 1..=10
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return DEFAULT_SCORE;
    }
    value.round().clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8
}

fn parse_score(raw: &str) -> Option<u8> {
    raw.parse::<f64>().ok().map(clamp_score)
}

/// Splits `text` at the first match of `marker` into head and tail
fn split_on(marker: &Regex, text: &str) -> (String, Option<String>) {
    match marker.find(text) {
        Some(m) => {
            let head = text[..m.start()].trim();
            let tail = text[m.end()..].trim().trim_end_matches(')').trim();
            let tail = (!tail.is_empty()).then(|| tail.to_string());
            (head.to_string(), tail)
        }
        None => (text.trim().to_string(), None),
    }
}

fn first_unique(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One classified line of analysis text
#[derive(Debug, PartialEq)]
enum Line {
    Blank,
    /// Normalized, uppercased heading text
    Heading(String),
    Bullet(String),
    Text(String),
}

fn classify(line: &str) -> Line {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    for marker in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Line::Bullet(clean_inline(rest));
        }
    }

    if trimmed.starts_with('#') {
        return Line::Heading(normalize_heading(trimmed.trim_start_matches('#')));
    }

    let (numbered, rest) = match strip_numbering(trimmed) {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let bold_line = rest.starts_with("**")
        && (rest.ends_with("**") || rest.ends_with("**:"))
        && rest.len() > 4;
    if bold_line || is_uppercase_heading(rest) {
        return Line::Heading(normalize_heading(rest));
    }

    if numbered {
        return Line::Bullet(clean_inline(rest));
    }
    Line::Text(trimmed.to_string())
}

fn strip_numbering(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(". ")
        .or_else(|| rest.strip_prefix(") "))
        .map(str::trim_start)
}

fn without_parentheticals(text: &str) -> String {
    static PARENS: OnceLock<Regex> = OnceLock::new();
    let re = PARENS.get_or_init(|| Regex::new(r"\([^)]*\)").expect("parenthetical pattern is valid"));
    re.replace_all(text, "").to_string()
}

fn is_uppercase_heading(text: &str) -> bool {
    let text = without_parentheticals(text);
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase())
}

fn normalize_heading(text: &str) -> String {
    let cleaned = clean_inline(&without_parentheticals(text));
    let cleaned = strip_numbering(&cleaned).unwrap_or(&cleaned).to_string();
    cleaned
        .trim_end_matches(':')
        .trim()
        .to_uppercase()
}

/// Removes bold markers and surrounding whitespace
fn clean_inline(text: &str) -> String {
    text.replace("**", "").replace("__", "").trim().to_string()
}

fn heading_matches(heading: &str, names: &[&str]) -> bool {
    names.iter().any(|name| {
        heading == *name
            || heading
                .strip_prefix(name)
                .map(|rest| rest.starts_with(|c: char| !c.is_alphanumeric()))
                .unwrap_or(false)
    })
}

/// Bullet texts of the first section whose heading matches `names`
fn bullets_under(text: &str, names: &[&str]) -> Vec<String> {
    let mut inside = false;
    let mut bullets = Vec::new();

    for line in text.lines() {
        match classify(line) {
            Line::Heading(heading) => {
                if inside {
                    break;
                }
                inside = heading_matches(&heading, names);
            }
            Line::Bullet(bullet) if inside && !bullet.is_empty() => bullets.push(bullet),
            _ => {}
        }
    }
    bullets
}

/// First prose paragraph of the first section whose heading matches `names`
fn paragraph_under(text: &str, names: &[&str]) -> Option<String> {
    let mut inside = false;
    let mut section = String::new();

    for line in text.lines() {
        if let Line::Heading(heading) = classify(line) {
            if inside {
                break;
            }
            inside = heading_matches(&heading, names);
            continue;
        }
        if inside {
            section.push_str(line);
            section.push('\n');
        }
    }
    paragraphs(&section).into_iter().next()
}

/// Prose paragraphs: runs of plain text lines, broken by blanks, headings and bullets
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        match classify(line) {
            Line::Text(content) => current.push(clean_inline(&content)),
            _ => {
                if !current.is_empty() {
                    out.push(current.join(" "));
                    current.clear();
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}
