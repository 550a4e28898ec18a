use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing_error::SpanTrace;

/// Backend integration style a judge is bound to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions served from a custom base URL.
    Friendli,
    /// OpenAI chat completions.
    OpenAi,
    /// Gemini `streamGenerateContent`.
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Friendli,
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Friendli => "FRIENDLI",
            ProviderKind::OpenAi => "OPENAI",
            ProviderKind::Gemini => "GEMINI",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse persona-tone category used to pick prompt phrasing.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum GradeBucket {
    Hit,
    #[default]
    Good,
    Solid,
    Bad,
}

impl GradeBucket {
    pub const ALL: [GradeBucket; 4] = [
        GradeBucket::Hit,
        GradeBucket::Good,
        GradeBucket::Solid,
        GradeBucket::Bad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GradeBucket::Hit => "HIT",
            GradeBucket::Good => "GOOD",
            GradeBucket::Solid => "SOLID",
            GradeBucket::Bad => "BAD",
        }
    }
}

impl fmt::Display for GradeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeBucket {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIT" => Ok(GradeBucket::Hit),
            "GOOD" => Ok(GradeBucket::Good),
            "SOLID" => Ok(GradeBucket::Solid),
            "BAD" => Ok(GradeBucket::Bad),
            other => Err(format!(
                "unknown grade bucket '{}' (expected HIT, GOOD, SOLID or BAD)",
                other
            )),
        }
    }
}

/// Input for one panel run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongContext {
    pub artist: String,
    pub title: String,
    /// Lyrics excerpt, at most `REVIEW_MAX_CHARS` characters.
    pub review: String,
}

impl SongContext {
    pub fn new(artist: impl Into<String>, title: impl Into<String>, review: &str) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            review: crate::str_utils::prefix_chars(review, crate::constants::REVIEW_MAX_CHARS)
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Scores {
    #[serde(rename = "Musicality")]
    pub musicality: u32,
    #[serde(rename = "Marketability")]
    pub marketability: u32,
    #[serde(rename = "Narrative")]
    pub narrative: u32,
    #[serde(rename = "Total")]
    pub total: u32,
}

impl Scores {
    /// Used whenever a judge produced nothing that could be scored.
    pub const FALLBACK: Scores = Scores {
        musicality: 25,
        marketability: 25,
        narrative: 23,
        total: 73,
    };

    pub fn sub_score_sum(&self) -> u32 {
        self.musicality + self.marketability + self.narrative
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No client for the judge's provider (credential missing).
    Unavailable,
    /// Network, HTTP status or malformed stream.
    Transport,
    /// Generated text empty or shorter than the minimum.
    Degenerate,
    Timeout,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::Unavailable => "클라이언트 없음",
            FailureKind::Transport => "전송 오류",
            FailureKind::Degenerate => "응답 부족",
            FailureKind::Timeout => "시간 초과",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Unavailable => "unavailable",
            FailureKind::Transport => "transport",
            FailureKind::Degenerate => "degenerate",
            FailureKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JudgeOutcome {
    Completed,
    Failed(FailureKind),
}

impl JudgeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, JudgeOutcome::Failed(_))
    }
}

/// Live status label shown while a panel runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JudgeStatus {
    Waiting,
    Loading,
    Generating,
    Done,
    Error,
}

impl JudgeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JudgeStatus::Waiting => "대기 중",
            JudgeStatus::Loading => "로딩",
            JudgeStatus::Generating => "생성 중",
            JudgeStatus::Done => "완료",
            JudgeStatus::Error => "오류",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JudgeStatus::Done | JudgeStatus::Error)
    }
}

/// Message flowing from judge tasks to the orchestrator.
#[derive(Debug, Clone)]
pub enum JudgeEvent {
    Started {
        judge: String,
        provider: ProviderKind,
    },
    Delta {
        judge: String,
        provider: ProviderKind,
        text: String,
    },
    /// Exactly one per judge per run, always carrying parseable text.
    Finished {
        judge: String,
        provider: ProviderKind,
        text: String,
        elapsed: Duration,
        outcome: JudgeOutcome,
    },
}

impl JudgeEvent {
    pub fn judge(&self) -> &str {
        match self {
            JudgeEvent::Started { judge, .. }
            | JudgeEvent::Delta { judge, .. }
            | JudgeEvent::Finished { judge, .. } => judge,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            JudgeEvent::Started { provider, .. }
            | JudgeEvent::Delta { provider, .. }
            | JudgeEvent::Finished { provider, .. } => *provider,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgeResult {
    pub scores: Scores,
    pub comment: String,
    #[serde(rename = "elapsed")]
    pub elapsed_secs: f64,
    pub outcome: JudgeOutcome,
}

/// Judge name -> parsed result for one song, kept in insertion order.
/// Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelResult {
    judges: Vec<(String, JudgeResult)>,
}

impl PanelResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a judge, or replaces its result in place if already present.
    pub fn insert(&mut self, judge: impl Into<String>, result: JudgeResult) {
        let judge = judge.into();
        match self.judges.iter_mut().find(|(name, _)| *name == judge) {
            Some((_, existing)) => *existing = result,
            None => self.judges.push((judge, result)),
        }
    }

    pub fn get(&self, judge: &str) -> Option<&JudgeResult> {
        self.judges
            .iter()
            .find(|(name, _)| name == judge)
            .map(|(_, result)| result)
    }

    pub fn contains(&self, judge: &str) -> bool {
        self.get(judge).is_some()
    }

    pub fn len(&self) -> usize {
        self.judges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JudgeResult)> {
        self.judges.iter().map(|(name, result)| (name, result))
    }

    /// Sum of every judge's Total (out of 300 for a three-judge panel).
    pub fn grand_total(&self) -> u32 {
        self.judges.iter().map(|(_, r)| r.scores.total).sum()
    }

    pub fn tier(&self) -> crate::grade::Tier {
        crate::grade::Tier::classify(self.grand_total())
    }
}

impl Serialize for PanelResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream read error: {0}")]
    StreamRead(#[from] tokio_util::codec::LinesCodecError),

    #[error("Upstream error (status {0}): {1}")]
    Upstream(reqwest::StatusCode, String),

    #[error("{0} client is not initialized")]
    ProviderUnavailable(ProviderKind),

    #[error("Generated text is empty or too short ({0} chars)")]
    Degenerate(usize),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PanelError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PanelError::ProviderUnavailable(_) => FailureKind::Unavailable,
            PanelError::Degenerate(_) => FailureKind::Degenerate,
            PanelError::Timeout(_) => FailureKind::Timeout,
            _ => FailureKind::Transport,
        }
    }
}

#[derive(Debug)]
pub struct ObservedError {
    pub inner: PanelError,
    pub span_trace: SpanTrace,
}

impl std::fmt::Display for ObservedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n\nSpan Trace:\n{}", self.inner, self.span_trace)
    }
}

impl std::error::Error for ObservedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl<E> From<E> for ObservedError
where
    E: Into<PanelError>,
{
    fn from(error: E) -> Self {
        Self {
            inner: error.into(),
            span_trace: SpanTrace::capture(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ObservedError>;
