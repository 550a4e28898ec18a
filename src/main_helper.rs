use crate::catalog::JudgeCatalog;
use crate::constants::ENV_LASTFM_KEY;
use crate::lastfm::LastFmClient;
use crate::lyrics::load_lyrics_file;
use crate::panel::{LiveUpdate, PanelOrchestrator, PanelSettings};
use crate::providers::{build_http_client, Credentials, ProviderRegistry, ProviderSettings};
use crate::types::*;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Lyrics document with `Artist - Title:` headers
    #[arg(long, conflicts_with_all = ["artist", "title", "review"])]
    pub lyrics: Option<String>,
    #[arg(long, requires = "title")]
    pub artist: Option<String>,
    #[arg(long, requires = "artist")]
    pub title: Option<String>,
    /// Lyrics or review text for a single song
    #[arg(long, default_value = "")]
    pub review: String,
    /// Extra tag for a single song; Last.fm tags are used when none are given
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Persona tone used by every judge
    #[arg(long, default_value_t = GradeBucket::Good)]
    pub grade: GradeBucket,
    /// JSON judge catalog; the built-in panel is used when omitted
    #[arg(long)]
    pub catalog: Option<String>,
    #[arg(long, default_value_t = 60)]
    pub judge_timeout_secs: u64,
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,
    #[arg(long, default_value_t = false)]
    pub no_lastfm: bool,
    /// Print results as JSON instead of the terminal view
    #[arg(long, default_value_t = false)]
    pub json: bool,
    #[arg(long, default_value = ".")]
    pub log_dir: String,
}

impl Args {
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_retries: self.max_retries,
            ..ProviderSettings::default()
        }
    }

    pub fn panel_settings(&self) -> PanelSettings {
        PanelSettings {
            grade_bucket: self.grade,
            judge_deadline: Duration::from_secs(self.judge_timeout_secs),
            ..PanelSettings::default()
        }
    }

    /// Songs to judge: the lyrics document, or the single song given inline.
    pub async fn songs(&self) -> Result<Vec<SongContext>> {
        if let Some(path) = &self.lyrics {
            return load_lyrics_file(path).await;
        }
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => Ok(vec![SongContext::new(
                artist.as_str(),
                title.as_str(),
                &self.review,
            )]),
            _ => Err(PanelError::Config(
                "either --lyrics or --artist and --title must be given".to_string(),
            )
            .into()),
        }
    }
}

/// Everything a run needs, built once from the arguments and environment.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PanelOrchestrator>,
    pub lastfm: Option<LastFmClient>,
    pub tx_live: broadcast::Sender<LiveUpdate>,
    pub args: Arc<Args>,
}

impl AppState {
    pub fn build(args: Args, credentials: &Credentials) -> Result<Self> {
        let catalog = match &args.catalog {
            Some(path) => JudgeCatalog::from_json_file(path)?,
            None => JudgeCatalog::default(),
        };
        let provider_settings = args.provider_settings();
        let registry = ProviderRegistry::from_credentials(credentials, &provider_settings);
        tracing::info!("Available providers: {:?}", registry.available());

        let lastfm = if args.no_lastfm {
            None
        } else {
            match std::env::var(ENV_LASTFM_KEY) {
                Ok(key) if !key.trim().is_empty() => Some(LastFmClient::new(
                    build_http_client(&provider_settings)?,
                    key.trim(),
                )),
                _ => {
                    tracing::warn!("{} is not set; songs are judged without tags", ENV_LASTFM_KEY);
                    None
                }
            }
        };

        let (tx_live, _) = broadcast::channel(256);
        let orchestrator = PanelOrchestrator::new(
            Arc::new(catalog),
            Arc::new(registry),
            args.panel_settings(),
        )
        .with_live_feed(tx_live.clone());

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            lastfm,
            tx_live,
            args: Arc::new(args),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["judge-panel", "--artist", "IU", "--title", "Blueming"]);
        assert_eq!(args.grade, GradeBucket::Good);
        assert_eq!(args.judge_timeout_secs, 60);
        assert_eq!(args.max_retries, 3);
        assert!(args.tags.is_empty());
        let settings = args.panel_settings();
        assert_eq!(settings.judge_deadline, Duration::from_secs(60));
    }

    #[test]
    fn test_grade_and_tags() {
        let args = Args::parse_from([
            "judge-panel",
            "--artist",
            "IU",
            "--title",
            "Blueming",
            "--grade",
            "hit",
            "--tag",
            "k-pop",
            "--tag",
            "ballad",
        ]);
        assert_eq!(args.grade, GradeBucket::Hit);
        assert_eq!(args.tags, vec!["k-pop", "ballad"]);
    }

    #[test]
    fn test_lyrics_conflicts_with_inline_song() {
        let parsed = Args::try_parse_from([
            "judge-panel",
            "--lyrics",
            "songs.txt",
            "--artist",
            "IU",
            "--title",
            "x",
        ]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_inline_song() {
        let args = Args::parse_from([
            "judge-panel",
            "--artist",
            "IU",
            "--title",
            "Blueming",
            "--review",
            "뭐해?",
        ]);
        let songs = args.songs().await.unwrap();
        assert_eq!(songs, vec![SongContext::new("IU", "Blueming", "뭐해?")]);
    }

    #[tokio::test]
    async fn test_no_song_source_is_a_config_error() {
        let args = Args::parse_from(["judge-panel"]);
        let err = args.songs().await.unwrap_err();
        assert!(matches!(err.inner, PanelError::Config(_)));
    }
}
