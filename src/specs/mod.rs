pub mod gemini;
pub mod openai;

use crate::types::ProviderKind;
use serde::{Deserialize, Serialize};

/// Error body shared by both wire families: `{"error": {"message": ..., "code": ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    pub error: ProviderErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderErrorDetails {
    pub message: String,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One decoded server-sent-events line.
#[derive(Debug, Clone)]
pub enum SseFrame {
    Text(String),
    Done,
    Skip,
    Error(ProviderErrorDetails),
    Malformed(String),
}

pub fn parse_sse_line(kind: ProviderKind, line: &str) -> SseFrame {
    let data = match line.strip_prefix("data:") {
        Some(d) => d.trim(),
        None => return SseFrame::Skip,
    };
    if data.is_empty() {
        return SseFrame::Skip;
    }
    if data == "[DONE]" {
        return SseFrame::Done;
    }
    // Try Error first as it's more specific (requires "error" key)
    if let Ok(err) = serde_json::from_str::<ProviderError>(data) {
        return SseFrame::Error(err.error);
    }

    let text = match kind {
        ProviderKind::Friendli | ProviderKind::OpenAi => {
            serde_json::from_str::<openai::ChatCompletionChunk>(data)
                .map(|chunk| chunk.text().map(str::to_string))
        }
        ProviderKind::Gemini => {
            serde_json::from_str::<gemini::GenerateContentChunk>(data).map(|chunk| chunk.text())
        }
    };

    match text {
        Ok(Some(t)) if !t.is_empty() => SseFrame::Text(t),
        Ok(_) => SseFrame::Skip,
        Err(e) => {
            tracing::debug!(
                "[STREAM] Unparseable {} line ({}): {}",
                kind,
                e,
                crate::str_utils::snippet(data, 200)
            );
            SseFrame::Malformed(e.to_string())
        }
    }
}
