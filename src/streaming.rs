use crate::catalog::Judge;
use crate::constants::{FALLBACK_RESPONSE, MIN_RESPONSE_CHARS};
use crate::logging::StreamMetric;
use crate::prompt::{build_system_prompt, build_user_prompt};
use crate::providers::ProviderRegistry;
use crate::types::*;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Everything one judge needs for a single panel run.
#[derive(Debug, Clone)]
pub struct JudgeTask {
    pub judge: Judge,
    pub song: Arc<SongContext>,
    pub tags: Arc<[String]>,
    pub bucket: GradeBucket,
    pub registry: Arc<ProviderRegistry>,
    /// Bounds the whole provider interaction, first byte to last.
    pub deadline: Duration,
}

impl JudgeTask {
    /// Streams the judge's answer into `sink` and always finishes with exactly
    /// one `JudgeEvent::Finished`, carrying the fallback answer on any failure.
    pub async fn run(self, sink: mpsc::Sender<JudgeEvent>) {
        let start = Instant::now();
        let judge = self.judge.name.clone();
        let provider = self.judge.provider;

        emit(
            &sink,
            JudgeEvent::Started {
                judge: judge.clone(),
                provider,
            },
        )
        .await;

        let attempt = tokio::time::timeout(self.deadline, self.stream_answer(&sink)).await;
        let result = match attempt {
            Ok(r) => r,
            Err(_) => Err(PanelError::Timeout(self.deadline).into()),
        };

        let (text, outcome) = match result {
            Ok(text) => {
                tracing::info!(
                    "{} finished in {:.2}s ({} chars)",
                    judge,
                    start.elapsed().as_secs_f64(),
                    text.chars().count()
                );
                (text, JudgeOutcome::Completed)
            }
            Err(e) => {
                let kind = e.inner.failure_kind();
                tracing::warn!("{} 평가 실패 [{}]: {}", judge, kind.label(), e.inner);
                (FALLBACK_RESPONSE.to_string(), JudgeOutcome::Failed(kind))
            }
        };

        emit(
            &sink,
            JudgeEvent::Finished {
                judge,
                provider,
                text,
                elapsed: start.elapsed(),
                outcome,
            },
        )
        .await;
    }

    async fn stream_answer(&self, sink: &mpsc::Sender<JudgeEvent>) -> Result<String> {
        let provider = self.judge.provider;
        let client = self
            .registry
            .get(provider)
            .ok_or(PanelError::ProviderUnavailable(provider))?;

        let system_prompt = build_system_prompt(&self.judge, self.bucket);
        let user_prompt = build_user_prompt(&self.song, &self.tags);
        let mut fragments = client
            .stream_complete(&self.judge.model_id, &system_prompt, &user_prompt)
            .await?;

        let mut full_text = String::new();
        let mut metric = StreamMetric::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            if fragment.is_empty() {
                continue;
            }
            metric.record_fragment(&fragment);
            full_text.push_str(&fragment);
            emit(
                sink,
                JudgeEvent::Delta {
                    judge: self.judge.name.clone(),
                    provider,
                    text: fragment,
                },
            )
            .await;
        }
        metric.log_summary(&self.judge.name);

        let len = full_text.trim().chars().count();
        if len < MIN_RESPONSE_CHARS {
            return Err(PanelError::Degenerate(len).into());
        }
        Ok(full_text)
    }
}

async fn emit(sink: &mpsc::Sender<JudgeEvent>, event: JudgeEvent) {
    if sink.send(event).await.is_err() {
        tracing::debug!("Panel consumer gone, dropping judge event");
    }
}
