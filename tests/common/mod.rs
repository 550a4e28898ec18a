//! In-process mock of the provider APIs and Last.fm, served over real HTTP.
//!
//! The first path segment picks the behaviour, so a base URL such as
//! `http://127.0.0.1:PORT/slow` makes every request through it slow.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{stream, StreamExt};
use judge_panel::hardening::RetryPolicy;
use judge_panel::providers::{Credentials, Endpoint, ProviderRegistry, ProviderSettings};
use judge_panel::types::ProviderKind;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GOOD_ANSWER: [&str; 5] = [
    "Musicality: 32/40\n",
    "Marketability: 28/40\n",
    "Narrative: 21/40\n",
    "Total: 81\n",
    "Comment: 후렴이 강렬하고 멜로디가 오래 남습니다.",
];
pub const GOOD_COMMENT: &str = "후렴이 강렬하고 멜로디가 오래 남습니다.";
pub const SLOW_DELAY: Duration = Duration::from_millis(600);
const FRAME_GAP: Duration = Duration::from_millis(10);

#[derive(Default)]
pub struct MockState {
    hits: Mutex<HashMap<String, usize>>,
}

impl MockState {
    /// Records a request and returns how many this scenario has seen, this one included.
    fn hit(&self, scenario: &str) -> usize {
        let mut hits = self.hits.lock().unwrap();
        let count = hits.entry(scenario.to_string()).or_default();
        *count += 1;
        *count
    }

    pub fn hits(&self, scenario: &str) -> usize {
        self.hits.lock().unwrap().get(scenario).copied().unwrap_or(0)
    }
}

pub struct MockProvider {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockProvider {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/:scenario/chat/completions", post(chat_completions))
            .route("/:scenario/models/:action", post(generate_content))
            .route("/lastfm/", get(lastfm))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn url(&self, scenario: &str) -> String {
        format!("http://{}/{}", self.addr, scenario)
    }

    /// Registry whose providers all point at this mock, one scenario each.
    pub fn registry(&self, scenarios: &[(ProviderKind, &str)]) -> ProviderRegistry {
        let mut credentials = Credentials::new();
        for (kind, scenario) in scenarios {
            credentials = credentials
                .with_key(*kind, "test-key")
                .with_base_url(*kind, self.url(scenario));
        }
        ProviderRegistry::from_credentials(&credentials, &fast_settings())
    }

    /// A single endpoint on `scenario` that gives up after one attempt.
    pub fn endpoint(&self, scenario: &str) -> Endpoint {
        Endpoint::new(
            reqwest::Client::new(),
            &self.url(scenario),
            "test-key",
            RetryPolicy::new(1, 5),
        )
        .unwrap()
    }
}

pub fn fast_settings() -> ProviderSettings {
    ProviderSettings {
        request_timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(2),
        max_retries: 3,
        retry_base_delay_ms: 5,
    }
}

fn chat_frame(text: &str) -> String {
    let chunk = json!({
        "id": "mock",
        "model": "mock-model",
        "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
    });
    format!("data: {}\n\n", chunk)
}

fn gemini_frame(text: &str) -> String {
    let chunk = json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}],
        "modelVersion": "mock"
    });
    format!("data: {}\n\n", chunk)
}

async fn chat_completions(
    State(state): State<Arc<MockState>>,
    Path(scenario): Path<String>,
) -> Response {
    respond(&state, &scenario, chat_frame, Some("data: [DONE]\n\n")).await
}

async fn generate_content(
    State(state): State<Arc<MockState>>,
    Path((scenario, _action)): Path<(String, String)>,
) -> Response {
    respond(&state, &scenario, gemini_frame, None).await
}

async fn respond(
    state: &MockState,
    scenario: &str,
    frame: fn(&str) -> String,
    terminator: Option<&str>,
) -> Response {
    let attempt = state.hit(scenario);
    let answer = |parts: &[&str]| {
        let mut frames: Vec<String> = parts.iter().map(|p| frame(p)).collect();
        frames.extend(terminator.map(str::to_string));
        frames
    };

    match scenario {
        "ok" => sse(answer(&GOOD_ANSWER[..]), FRAME_GAP),
        "slow" => {
            tokio::time::sleep(SLOW_DELAY).await;
            sse(answer(&GOOD_ANSWER[..]), FRAME_GAP)
        }
        // First fragment arrives, then the stream goes quiet.
        "stall" => sse(answer(&GOOD_ANSWER[..]), Duration::from_secs(30)),
        "short" => sse(answer(&["좋아요"][..]), FRAME_GAP),
        "broken" => sse(
            vec![frame("Musicality: 30/40\n"), "data: {not json\n\n".to_string()],
            FRAME_GAP,
        ),
        "fail" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "denied" => (StatusCode::UNAUTHORIZED, "invalid api key").into_response(),
        // Two 503s, then a normal answer.
        "flaky" if attempt <= 2 => (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response(),
        "flaky" => sse(answer(&GOOD_ANSWER[..]), FRAME_GAP),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn sse(frames: Vec<String>, gap: Duration) -> Response {
    let body = stream::iter(frames.into_iter().enumerate()).then(move |(i, frame)| async move {
        if i > 0 {
            tokio::time::sleep(gap).await;
        }
        Ok::<_, std::convert::Infallible>(frame)
    });
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(body))
        .unwrap()
}

async fn lastfm(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit("lastfm");
    if params.get("api_key").map(String::as_str) != Some("lastfm-key") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": 10, "message": "Invalid API key"})),
        )
            .into_response();
    }
    if params.get("track").map(String::as_str) == Some("Unknown") {
        return Json(json!({"error": 6, "message": "Track not found"})).into_response();
    }
    Json(json!({
        "track": {
            "name": params.get("track"),
            "album": {
                "image": [
                    {"#text": "http://img/small.png", "size": "small"},
                    {"#text": "http://img/large.png", "size": "large"}
                ]
            },
            "toptags": {"tag": [{"name": "k-pop"}, {"name": "ballad"}]}
        }
    }))
    .into_response()
}
