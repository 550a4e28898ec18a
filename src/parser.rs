//! Score and comment extraction from free-form judge output.
//!
//! Models rarely follow the output format exactly, so every field is tried
//! against an ordered list of patterns and the first hit wins. Whatever cannot
//! be recovered falls back to fixed defaults: parsing never fails.

use crate::constants::{
    COMMENT_MAX_CHARS, DEFAULT_COMMENT, MIN_RESPONSE_CHARS, SCORE_LABELS, SUB_SCORE_CAP,
    TOTAL_CAP,
};
use crate::str_utils::prefix_chars;
use crate::types::Scores;
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Musicality,
    Marketability,
    Narrative,
    Total,
}

impl ScoreField {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreField::Musicality => "Musicality",
            ScoreField::Marketability => "Marketability",
            ScoreField::Narrative => "Narrative",
            ScoreField::Total => "Total",
        }
    }

    fn slot<'a>(&self, scores: &'a mut Scores) -> &'a mut u32 {
        match self {
            ScoreField::Musicality => &mut scores.musicality,
            ScoreField::Marketability => &mut scores.marketability,
            ScoreField::Narrative => &mut scores.narrative,
            ScoreField::Total => &mut scores.total,
        }
    }
}

pub struct ScoreRule {
    pub field: ScoreField,
    pub patterns: Vec<Regex>,
    pub cap: u32,
}

impl ScoreRule {
    fn new(field: ScoreField, cap: u32) -> Self {
        let label = field.label();
        let patterns = [
            format!(r"(?im){}\s*[:：-]\s*([0-9]+)", label),
            format!(r"(?im){}\s*=\s*([0-9]+)", label),
            format!(r"(?im)\*\*{}\*\*\s*[:：-]\s*([0-9]+)", label),
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid score regex"))
        .collect();
        Self {
            field,
            patterns,
            cap,
        }
    }

    /// First matching pattern wins; the value is clamped to the cap.
    pub fn extract(&self, text: &str) -> Option<u32> {
        self.patterns.iter().find_map(|re| {
            let digits = re.captures(text)?.get(1)?.as_str();
            // Overlong digit runs saturate instead of failing.
            let value = digits.parse::<u32>().unwrap_or(u32::MAX);
            Some(value.min(self.cap))
        })
    }
}

lazy_static! {
    pub static ref SCORE_RULES: Vec<ScoreRule> = vec![
        ScoreRule::new(ScoreField::Musicality, SUB_SCORE_CAP),
        ScoreRule::new(ScoreField::Marketability, SUB_SCORE_CAP),
        ScoreRule::new(ScoreField::Narrative, SUB_SCORE_CAP),
        ScoreRule::new(ScoreField::Total, TOTAL_CAP),
    ];
    pub static ref COMMENT_RULES: Vec<Regex> = [
        r"(?is)Comment\s*[:：-]\s*(.*)",
        r"(?is)\*\*Comment\*\*\s*[:：-]\s*(.*)",
        r"(?is)Feedback\s*[:：-]\s*(.*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid comment regex"))
    .collect();
}

/// Parses a judge's raw answer into bounded scores and a comment of at most
/// `COMMENT_MAX_CHARS` characters.
pub fn parse_response(text: &str) -> (Scores, String) {
    let clean_text = text.trim();
    if clean_text.chars().count() < MIN_RESPONSE_CHARS {
        return (Scores::FALLBACK, DEFAULT_COMMENT.to_string());
    }

    let scores = extract_scores(clean_text);
    let comment = extract_comment(clean_text);
    (scores, prefix_chars(&comment, COMMENT_MAX_CHARS).to_string())
}

fn extract_scores(text: &str) -> Scores {
    let mut scores = Scores::default();
    for rule in SCORE_RULES.iter() {
        if let Some(value) = rule.extract(text) {
            *rule.field.slot(&mut scores) = value;
        }
    }

    if scores.total == 0 {
        scores.total = scores.sub_score_sum().min(TOTAL_CAP);
    }
    if scores.total == 0 {
        return Scores::FALLBACK;
    }
    scores
}

fn extract_comment(text: &str) -> String {
    let explicit = COMMENT_RULES.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    });
    match explicit {
        Some(comment) if comment != DEFAULT_COMMENT => return comment,
        _ => {}
    }

    if text.chars().count() > 50 {
        let remainder: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !SCORE_LABELS.iter().any(|k| l.contains(k)))
            .collect();
        if !remainder.is_empty() {
            return remainder.join(" ");
        }
    }
    explicit.unwrap_or_else(|| DEFAULT_COMMENT.to_string())
}
