use crate::redaction_layer::RedactingWriter;
use std::panic;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

pub const LOG_FILE_NAME: &str = "judge-panel.log";
const DEFAULT_FILTER: &str = "judge_panel=info";

/// Installs the global subscriber. Everything the env filter admits goes to a
/// daily rolling NDJSON file; stderr only gets warnings so it does not interleave
/// with the live board. Keep the guard alive until exit.
pub fn init_tracing(log_dir: &str) -> WorkerGuard {
    use tracing_subscriber::prelude::*;

    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => DEFAULT_FILTER.into(),
    };

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(move || RedactingWriter::new(non_blocking.clone()))
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(|| RedactingWriter::new(std::io::stderr()))
                .with_target(false)
                .compact()
                .with_filter(tracing_subscriber::filter::LevelFilter::WARN),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();

    guard
}

/// Sets up a global panic hook that logs panics using tracing.
pub fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();

        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic payload"
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        error!(
            target: "panic",
            message = %message,
            location = %location,
            backtrace = %backtrace,
            "FATAL: Application panicked"
        );

        original_hook(panic_info);
    }));
}

/// Per-judge streaming counters, summarized once the stream ends.
#[derive(Default)]
pub struct StreamMetric {
    pub chunks: usize,
    pub text_chars: usize,
    pub first_chunk_at: Option<std::time::Instant>,
    started_at: Option<std::time::Instant>,
}

impl StreamMetric {
    pub fn new() -> Self {
        Self {
            started_at: Some(std::time::Instant::now()),
            ..Self::default()
        }
    }

    pub fn record_fragment(&mut self, fragment: &str) {
        if self.first_chunk_at.is_none() {
            self.first_chunk_at = Some(std::time::Instant::now());
        }
        self.chunks += 1;
        self.text_chars += fragment.chars().count();
    }

    pub fn time_to_first_chunk(&self) -> Option<std::time::Duration> {
        match (self.started_at, self.first_chunk_at) {
            (Some(start), Some(first)) => Some(first.duration_since(start)),
            _ => None,
        }
    }

    pub fn log_summary(&self, judge: &str) {
        let ttfc = match self.time_to_first_chunk() {
            Some(d) => format!("{}ms", d.as_millis()),
            None => "n/a".to_string(),
        };
        info!(
            target: "judge_panel::stream",
            "[STREAM END] Judge: {} | Chunks: {} | Text: {} chars | First chunk: {}",
            judge, self.chunks, self.text_chars, ttfc
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_metric_counts_characters() {
        let mut metric = StreamMetric::new();
        assert!(metric.time_to_first_chunk().is_none());
        metric.record_fragment("Total: ");
        metric.record_fragment("칠십");
        assert_eq!(metric.chunks, 2);
        assert_eq!(metric.text_chars, 9);
        assert!(metric.time_to_first_chunk().is_some());
    }
}
