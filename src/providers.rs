use crate::constants::{
    ENV_FRIENDLI_BASE_URL, ENV_FRIENDLI_KEY, ENV_GEMINI_BASE_URL, ENV_GOOGLE_KEY,
    ENV_OPENAI_BASE_URL, ENV_OPENAI_KEY, FRIENDLI_BASE_URL, GEMINI_BASE_URL, MAX_LINE_BYTES,
    MAX_STREAM_LINES, OPENAI_BASE_URL,
};
use crate::hardening::RetryPolicy;
use crate::specs::gemini::GenerateContentRequest;
use crate::specs::openai::ChatCompletionRequest;
use crate::specs::{parse_sse_line, SseFrame};
use crate::types::*;
use futures_util::future;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio_util::codec::{FramedRead, LinesCodec};

/// Text fragments in generation order; the first `Err` ends the stream.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// API keys and endpoint overrides, one slot per provider kind.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<ProviderKind, String>,
    base_urls: HashMap<ProviderKind, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut creds = Self::new();
        for kind in ProviderKind::ALL {
            if let Ok(key) = std::env::var(key_env_var(kind)) {
                creds = creds.with_key(kind, key);
            }
            if let Ok(url) = std::env::var(base_url_env_var(kind)) {
                creds = creds.with_base_url(kind, url);
            }
        }
        creds
    }

    pub fn with_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.keys.insert(kind, key.into());
        self
    }

    pub fn with_base_url(mut self, kind: ProviderKind, url: impl Into<String>) -> Self {
        self.base_urls.insert(kind, url.into());
        self
    }

    /// Empty or whitespace-only keys count as missing.
    pub fn key(&self, kind: ProviderKind) -> Option<&str> {
        self.keys
            .get(&kind)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
    }

    pub fn base_url(&self, kind: ProviderKind) -> &str {
        match self.base_urls.get(&kind) {
            Some(url) if !url.trim().is_empty() => url.trim(),
            _ => default_base_url(kind),
        }
    }
}

pub fn key_env_var(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Friendli => ENV_FRIENDLI_KEY,
        ProviderKind::OpenAi => ENV_OPENAI_KEY,
        ProviderKind::Gemini => ENV_GOOGLE_KEY,
    }
}

fn base_url_env_var(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Friendli => ENV_FRIENDLI_BASE_URL,
        ProviderKind::OpenAi => ENV_OPENAI_BASE_URL,
        ProviderKind::Gemini => ENV_GEMINI_BASE_URL,
    }
}

fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Friendli => FRIENDLI_BASE_URL,
        ProviderKind::OpenAi => OPENAI_BASE_URL,
        ProviderKind::Gemini => GEMINI_BASE_URL,
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay_ms: 100,
        }
    }
}

pub fn build_http_client(settings: &ProviderSettings) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .build()?;
    Ok(client)
}

#[derive(Clone)]
pub struct Endpoint {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    max_stream_lines: usize,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("retry", &self.retry)
            .field("max_stream_lines", &self.max_stream_lines)
            .finish()
    }
}

impl Endpoint {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: &str,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if let Err(e) = reqwest::Url::parse(base_url) {
            return Err(PanelError::Config(format!("invalid base URL '{}': {}", base_url, e)).into());
        }
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry,
            max_stream_lines: MAX_STREAM_LINES,
        })
    }

    /// Caps the SSE lines read from one response. Going past the cap fails
    /// the stream with a protocol error.
    pub fn with_max_stream_lines(mut self, max_lines: usize) -> Self {
        self.max_stream_lines = max_lines;
        self
    }

    /// Sends the request (retrying connection-stage failures) and returns the
    /// response once its status is known to be a success.
    async fn open<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        self.retry
            .execute_with_retry(|| {
                let request = build(&self.http);
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let error_body = match response.text().await {
                        Ok(text) => crate::str_utils::snippet(&text, 500).into_owned(),
                        Err(e) => format!("Upstream error (body unreadable): {}", e),
                    };
                    Err(PanelError::Upstream(status, error_body).into())
                }
            })
            .await
    }
}

/// One initialized backend; the variant fixes the wire protocol.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    /// `POST {base}/chat/completions` with `stream: true`.
    ChatCompletions {
        kind: ProviderKind,
        endpoint: Endpoint,
    },
    /// `POST {base}/models/{model}:streamGenerateContent?alt=sse`.
    Generation { endpoint: Endpoint },
}

impl ProviderClient {
    pub fn new(kind: ProviderKind, endpoint: Endpoint) -> Self {
        match kind {
            ProviderKind::Friendli | ProviderKind::OpenAi => {
                ProviderClient::ChatCompletions { kind, endpoint }
            }
            ProviderKind::Gemini => ProviderClient::Generation { endpoint },
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderClient::ChatCompletions { kind, .. } => *kind,
            ProviderClient::Generation { .. } => ProviderKind::Gemini,
        }
    }

    pub async fn stream_complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<FragmentStream> {
        let (response, max_lines) = match self {
            ProviderClient::ChatCompletions { endpoint, .. } => {
                let url = format!("{}/chat/completions", endpoint.base_url);
                let body = ChatCompletionRequest::streaming(model, system_prompt, user_prompt);
                let response = endpoint
                    .open(|http| {
                        http.post(&url)
                            .bearer_auth(&endpoint.api_key)
                            .json(&body)
                    })
                    .await?;
                (response, endpoint.max_stream_lines)
            }
            ProviderClient::Generation { endpoint } => {
                let url = format!(
                    "{}/models/{}:streamGenerateContent",
                    endpoint.base_url, model
                );
                let body = GenerateContentRequest::single_turn(system_prompt, user_prompt);
                let response = endpoint
                    .open(|http| {
                        http.post(&url)
                            .query(&[("alt", "sse"), ("key", endpoint.api_key.as_str())])
                            .json(&body)
                    })
                    .await?;
                (response, endpoint.max_stream_lines)
            }
        };
        tracing::debug!("[☁️  -> ⚙️ ] {} stream opened: {}", self.kind(), response.status());
        Ok(fragment_stream(self.kind(), response, max_lines))
    }
}

fn fragment_stream(
    kind: ProviderKind,
    response: reqwest::Response,
    max_lines: usize,
) -> FragmentStream {
    let bytes_stream = response
        .bytes_stream()
        .map(|r| r.map_err(std::io::Error::other));
    let lines = FramedRead::new(
        tokio_util::io::StreamReader::new(bytes_stream),
        LinesCodec::new_with_max_length(MAX_LINE_BYTES),
    );

    lines
        .enumerate()
        .map(move |(index, line)| -> Result<SseFrame> {
            if index >= max_lines {
                return Err(
                    PanelError::Protocol(format!("stream exceeded {} lines", max_lines)).into(),
                );
            }
            let line: String = line?;
            Ok(parse_sse_line(kind, &line))
        })
        .take_while(|frame| future::ready(!matches!(frame, Ok(SseFrame::Done))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(SseFrame::Text(text)) => Some(Ok(text)),
                Ok(SseFrame::Skip) | Ok(SseFrame::Done) => None,
                Ok(SseFrame::Error(details)) => Some(Err(PanelError::Protocol(format!(
                    "provider reported error: {}",
                    details.message
                ))
                .into())),
                Ok(SseFrame::Malformed(reason)) => Some(Err(PanelError::Protocol(format!(
                    "malformed stream chunk: {}",
                    reason
                ))
                .into())),
                Err(e) => Some(Err(e)),
            })
        })
        .boxed()
}

/// Read-only set of initialized provider clients, shared by every judge task.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<ProviderKind, ProviderClient>,
}

impl ProviderRegistry {
    /// Builds one client per kind whose credential is present. Never fails:
    /// a kind whose client cannot be built is simply left out.
    pub fn from_credentials(credentials: &Credentials, settings: &ProviderSettings) -> Self {
        let http = match build_http_client(settings) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Failed to build HTTP client: {}", e.inner);
                return Self::default();
            }
        };
        let retry = RetryPolicy::new(settings.max_retries, settings.retry_base_delay_ms);

        let mut clients = HashMap::new();
        for kind in ProviderKind::ALL {
            let Some(key) = credentials.key(kind) else {
                tracing::warn!(
                    "{} unavailable: {} is not set; judges bound to it will use the fallback verdict",
                    kind,
                    key_env_var(kind)
                );
                continue;
            };
            match Endpoint::new(http.clone(), credentials.base_url(kind), key, retry) {
                Ok(endpoint) => {
                    tracing::info!("{} client initialized ({})", kind, endpoint.base_url);
                    clients.insert(kind, ProviderClient::new(kind, endpoint));
                }
                Err(e) => {
                    tracing::warn!("{} client initialization failed: {}", kind, e.inner);
                }
            }
        }
        Self { clients }
    }

    pub fn with_clients(clients: impl IntoIterator<Item = ProviderClient>) -> Self {
        Self {
            clients: clients.into_iter().map(|c| (c.kind(), c)).collect(),
        }
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&ProviderClient> {
        self.clients.get(&kind)
    }

    pub fn available(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.clients.keys().copied().collect();
        kinds.sort();
        kinds
    }
}
