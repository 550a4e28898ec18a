use crate::catalog::JudgeCatalog;
use crate::constants::FALLBACK_RESPONSE;
use crate::parser::parse_response;
use crate::providers::ProviderRegistry;
use crate::streaming::JudgeTask;
use crate::types::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct PanelSettings {
    /// Persona tone used for every judge in a run.
    pub grade_bucket: GradeBucket,
    pub judge_deadline: Duration,
    pub channel_capacity: usize,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            grade_bucket: GradeBucket::Good,
            judge_deadline: Duration::from_secs(60),
            channel_capacity: 256,
        }
    }
}

/// Display state of one judge while the panel runs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LiveJudge {
    pub status: JudgeStatus,
    pub provider: ProviderKind,
    pub partial_text: String,
    pub elapsed_secs: Option<f64>,
}

/// Snapshot published after every event the orchestrator consumes.
#[derive(Debug, Clone, Serialize)]
pub struct LiveUpdate {
    pub judge: String,
    pub status: JudgeStatus,
    pub provider: ProviderKind,
    pub partial_text: String,
    pub elapsed_secs: Option<f64>,
    pub outcome: Option<JudgeOutcome>,
    pub result: Option<JudgeResult>,
}

#[derive(Debug, Clone, Default)]
pub struct LiveBoard {
    judges: BTreeMap<String, LiveJudge>,
}

impl LiveBoard {
    pub fn new(catalog: &JudgeCatalog) -> Self {
        let judges = catalog
            .judges()
            .iter()
            .map(|j| {
                (
                    j.name.clone(),
                    LiveJudge {
                        status: JudgeStatus::Waiting,
                        provider: j.provider,
                        partial_text: String::new(),
                        elapsed_secs: None,
                    },
                )
            })
            .collect();
        Self { judges }
    }

    pub fn get(&self, judge: &str) -> Option<&LiveJudge> {
        self.judges.get(judge)
    }

    /// Folds one event into the board. Events for unknown judges are ignored.
    pub fn apply(&mut self, event: &JudgeEvent) -> Option<&LiveJudge> {
        let entry = self.judges.get_mut(event.judge())?;
        entry.provider = event.provider();
        match event {
            JudgeEvent::Started { .. } => {
                entry.status = JudgeStatus::Loading;
            }
            JudgeEvent::Delta { text, .. } => {
                entry.status = JudgeStatus::Generating;
                entry.partial_text.push_str(text);
            }
            JudgeEvent::Finished {
                elapsed, outcome, ..
            } => {
                entry.status = match outcome {
                    JudgeOutcome::Completed => JudgeStatus::Done,
                    JudgeOutcome::Failed(_) => JudgeStatus::Error,
                };
                entry.elapsed_secs = Some(round_secs(*elapsed));
            }
        }
        Some(entry)
    }

    pub fn mark_error(&mut self, judge: &str) {
        if let Some(entry) = self.judges.get_mut(judge) {
            entry.status = JudgeStatus::Error;
        }
    }
}

fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}

/// Runs every judge of the catalog concurrently against one song.
pub struct PanelOrchestrator {
    catalog: Arc<JudgeCatalog>,
    registry: Arc<ProviderRegistry>,
    settings: PanelSettings,
    live_feed: Option<broadcast::Sender<LiveUpdate>>,
}

impl PanelOrchestrator {
    pub fn new(
        catalog: Arc<JudgeCatalog>,
        registry: Arc<ProviderRegistry>,
        settings: PanelSettings,
    ) -> Self {
        Self {
            catalog,
            registry,
            settings,
            live_feed: None,
        }
    }

    pub fn with_live_feed(mut self, tx: broadcast::Sender<LiveUpdate>) -> Self {
        self.live_feed = Some(tx);
        self
    }

    pub fn catalog(&self) -> &JudgeCatalog {
        &self.catalog
    }

    /// Returns once every judge has reported; the result always holds one
    /// entry per catalog judge.
    pub async fn run(&self, song: &SongContext, tags: &[String]) -> PanelResult {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "panel",
            run_id = %run_id,
            artist = %song.artist,
            title = %song.title
        );
        self.run_judges(song, tags).instrument(span).await
    }

    async fn run_judges(&self, song: &SongContext, tags: &[String]) -> PanelResult {
        tracing::info!(
            "Panel started: {} judges, bucket {}",
            self.catalog.len(),
            self.settings.grade_bucket
        );
        let (tx, rx) = mpsc::channel::<JudgeEvent>(self.settings.channel_capacity.max(1));
        let song = Arc::new(song.clone());
        let tags: Arc<[String]> = Arc::from(tags.to_vec());

        for judge in self.catalog.judges() {
            let task = JudgeTask {
                judge: judge.clone(),
                song: song.clone(),
                tags: tags.clone(),
                bucket: self.settings.grade_bucket,
                registry: self.registry.clone(),
                deadline: self.settings.judge_deadline,
            };
            let span = tracing::info_span!(
                "judge",
                judge = %judge.name,
                provider = %judge.provider
            );
            tokio::spawn(task.run(tx.clone()).instrument(span));
        }
        // Only the tasks hold senders now, so `recv` ends once they are all gone.
        drop(tx);

        let results = self.collect(rx).await;
        tracing::info!(
            "Panel finished: total {} ({})",
            results.grand_total(),
            results.tier()
        );
        results
    }

    /// Drains judge events until every judge has finished or every sender is
    /// gone, then assembles the result in catalog order. Judges that never
    /// finished get a `Failed(Transport)` fallback.
    async fn collect(&self, mut rx: mpsc::Receiver<JudgeEvent>) -> PanelResult {
        let mut board = LiveBoard::new(&self.catalog);
        let mut finished = HashMap::new();
        let expected = self
            .catalog
            .judges()
            .iter()
            .map(|j| j.name.as_str())
            .collect::<HashSet<_>>()
            .len();

        while finished.len() < expected {
            let Some(event) = rx.recv().await else {
                tracing::error!(
                    "Judge channel closed with {}/{} results; filling the rest with fallbacks",
                    finished.len(),
                    expected
                );
                break;
            };
            self.consume(event, &mut board, &mut finished);
        }

        let mut results = PanelResult::new();
        for judge in self.catalog.judges() {
            let result = match finished.remove(&judge.name) {
                Some(result) => result,
                None if results.contains(&judge.name) => continue,
                None => {
                    board.mark_error(&judge.name);
                    let result = fallback_result(JudgeOutcome::Failed(FailureKind::Transport));
                    self.publish(&judge.name, &board, Some(&result));
                    result
                }
            };
            results.insert(judge.name.clone(), result);
        }
        results
    }

    fn consume(
        &self,
        event: JudgeEvent,
        board: &mut LiveBoard,
        finished: &mut HashMap<String, JudgeResult>,
    ) {
        if board.apply(&event).is_none() {
            tracing::warn!("Event for unknown judge '{}' ignored", event.judge());
            return;
        }

        match event {
            JudgeEvent::Finished {
                judge,
                text,
                elapsed,
                outcome,
                ..
            } => {
                if finished.contains_key(&judge) {
                    tracing::warn!("Duplicate terminal event for {} ignored", judge);
                    return;
                }
                let (scores, comment) = parse_response(&text);
                let result = JudgeResult {
                    scores,
                    comment,
                    elapsed_secs: round_secs(elapsed),
                    outcome,
                };
                tracing::debug!("{} scored {:?}", judge, result.scores);
                self.publish(&judge, board, Some(&result));
                finished.insert(judge, result);
            }
            other => self.publish(other.judge(), board, None),
        }
    }

    fn publish(&self, judge: &str, board: &LiveBoard, result: Option<&JudgeResult>) {
        let Some(tx) = &self.live_feed else {
            return;
        };
        let Some(live) = board.get(judge) else {
            return;
        };
        // No subscribers is fine
        let _ = tx.send(LiveUpdate {
            judge: judge.to_string(),
            status: live.status,
            provider: live.provider,
            partial_text: live.partial_text.clone(),
            elapsed_secs: live.elapsed_secs,
            outcome: result.map(|r| r.outcome),
            result: result.cloned(),
        });
    }
}

fn fallback_result(outcome: JudgeOutcome) -> JudgeResult {
    let (scores, comment) = parse_response(FALLBACK_RESPONSE);
    JudgeResult {
        scores,
        comment,
        elapsed_secs: 0.0,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_response_parses_to_fallback_scores() {
        let result = fallback_result(JudgeOutcome::Failed(FailureKind::Timeout));
        assert_eq!(result.scores, Scores::FALLBACK);
        assert_eq!(result.comment, "기술적 문제로 평가를 완료할 수 없었습니다.");
    }

    #[test]
    fn test_live_board_transitions() {
        let catalog = JudgeCatalog::default();
        let mut board = LiveBoard::new(&catalog);
        let judge = "Howie Mandel".to_string();
        assert_eq!(board.get(&judge).unwrap().status, JudgeStatus::Waiting);

        board.apply(&JudgeEvent::Started {
            judge: judge.clone(),
            provider: ProviderKind::OpenAi,
        });
        assert_eq!(board.get(&judge).unwrap().status, JudgeStatus::Loading);

        for part in ["Musicality: ", "30"] {
            board.apply(&JudgeEvent::Delta {
                judge: judge.clone(),
                provider: ProviderKind::OpenAi,
                text: part.to_string(),
            });
        }
        let live = board.get(&judge).unwrap();
        assert_eq!(live.status, JudgeStatus::Generating);
        assert_eq!(live.partial_text, "Musicality: 30");

        board.apply(&JudgeEvent::Finished {
            judge: judge.clone(),
            provider: ProviderKind::OpenAi,
            text: String::new(),
            elapsed: Duration::from_millis(1234),
            outcome: JudgeOutcome::Failed(FailureKind::Degenerate),
        });
        let live = board.get(&judge).unwrap();
        assert_eq!(live.status, JudgeStatus::Error);
        assert_eq!(live.elapsed_secs, Some(1.23));
        assert_eq!(
            board.get("Simon Cowell").unwrap().status,
            JudgeStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_judges_without_a_terminal_event_fall_back() {
        let catalog = Arc::new(JudgeCatalog::default());
        let (live_tx, mut live_rx) = broadcast::channel(64);
        let panel = PanelOrchestrator::new(
            catalog.clone(),
            Arc::new(ProviderRegistry::default()),
            PanelSettings::default(),
        )
        .with_live_feed(live_tx);

        // Howie finishes, Mel B starts and goes quiet, Simon never reports.
        let (tx, rx) = mpsc::channel(16);
        for event in [
            JudgeEvent::Started {
                judge: "Howie Mandel".to_string(),
                provider: ProviderKind::OpenAi,
            },
            JudgeEvent::Finished {
                judge: "Howie Mandel".to_string(),
                provider: ProviderKind::OpenAi,
                text: "Musicality: 30/40\nMarketability: 30/40\nNarrative: 20/40\nTotal: 80\nComment: 좋아요"
                    .to_string(),
                elapsed: Duration::from_millis(800),
                outcome: JudgeOutcome::Completed,
            },
            JudgeEvent::Started {
                judge: "Mel B".to_string(),
                provider: ProviderKind::Gemini,
            },
        ] {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        let result = panel.collect(rx).await;

        assert_eq!(result.len(), catalog.len());
        let names: Vec<_> = result.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["Simon Cowell", "Howie Mandel", "Mel B"]);

        let howie = result.get("Howie Mandel").unwrap();
        assert_eq!(howie.outcome, JudgeOutcome::Completed);
        assert_eq!(howie.scores.total, 80);
        for name in ["Simon Cowell", "Mel B"] {
            let missing = result.get(name).unwrap();
            assert_eq!(
                missing.outcome,
                JudgeOutcome::Failed(FailureKind::Transport),
                "{}",
                name
            );
            assert_eq!(missing.scores, Scores::FALLBACK);
        }

        let mut last = HashMap::new();
        while let Ok(update) = live_rx.try_recv() {
            last.insert(update.judge.clone(), update);
        }
        assert_eq!(last["Mel B"].status, JudgeStatus::Error);
        assert_eq!(
            last["Simon Cowell"].outcome,
            Some(JudgeOutcome::Failed(FailureKind::Transport))
        );
    }

    #[test]
    fn test_unknown_judge_is_ignored() {
        let mut board = LiveBoard::new(&JudgeCatalog::default());
        let applied = board.apply(&JudgeEvent::Started {
            judge: "Nobody".to_string(),
            provider: ProviderKind::Gemini,
        });
        assert!(applied.is_none());
    }
}
