pub const RETRYABLE_STATUS_CODES: &[u16] = &[429, 500, 502, 503, 504, 520];

/// Provider API endpoints (overridable through the environment)
pub const FRIENDLI_BASE_URL: &str = "https://inference.friendli.ai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const LASTFM_BASE_URL: &str = "http://ws.audioscrobbler.com/2.0/";

/// Generation parameters shared by every judge
pub const JUDGE_TEMPERATURE: f32 = 0.7;
pub const JUDGE_MAX_TOKENS: u32 = 700;

/// Streaming limits
pub const MAX_LINE_BYTES: usize = 1024 * 1024;
pub const MAX_STREAM_LINES: usize = 100_000;

/// Anything shorter (after trimming) is treated as no answer at all.
pub const MIN_RESPONSE_CHARS: usize = 10;
pub const COMMENT_MAX_CHARS: usize = 700;
pub const REVIEW_MAX_CHARS: usize = 500;
pub const MAX_SONGS_PER_RUN: usize = 5;
pub const LASTFM_MAX_TAGS: usize = 5;

pub const SUB_SCORE_CAP: u32 = 40;
pub const TOTAL_CAP: u32 = 100;

pub const DEFAULT_COMMENT: &str = "상세 피드백이 없습니다.";

/// Terminal text for any judge that could not produce its own answer.
pub const FALLBACK_RESPONSE: &str = "Musicality: 25/40\nMarketability: 25/40\nNarrative: 23/40\nTotal: 73\nComment: 기술적 문제로 평가를 완료할 수 없었습니다.";

/// Labels of the four score lines; also used to filter comment candidates.
pub const SCORE_LABELS: &[&str] = &["Musicality", "Marketability", "Narrative", "Total"];

/// Scoring contract embedded in every system prompt
pub const SCORING_CONTRACT: &str = "엄격한 점수 규칙: Musicality 15-30, Marketability 15-30, Narrative 15-28, Total 45-78. 절대 이 범위를 초과하지 마세요.";
pub const FORMAT_INSTRUCTION: &str = "반드시 아래 형식 그대로 답변하세요: Musicality: [number]/40\nMarketability: [number]/40\nNarrative: [number]/40\nTotal: [sum]\nComment: [4-7문장 상세 피드백]";

/// Environment variable names
pub const ENV_FRIENDLI_KEY: &str = "FRIENDLI_API_KEY";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_GOOGLE_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_LASTFM_KEY: &str = "LASTFM_API_KEY";
pub const ENV_FRIENDLI_BASE_URL: &str = "FRIENDLI_BASE_URL";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
