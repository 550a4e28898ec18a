//! Terminal output for panel runs.

use crate::constants::{SUB_SCORE_CAP, TOTAL_CAP};
use crate::lastfm::TrackInfo;
use crate::panel::LiveUpdate;
use crate::types::*;
use colored::*;
use std::collections::HashMap;
use std::fmt::Write;

const BAR_WIDTH: u32 = 30;

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Turns the live feed into status lines, one per status change. Text deltas
/// produce no line of their own; the streamed text is printed under the
/// judge's terminal line instead.
#[derive(Default)]
pub struct LiveRenderer {
    last_status: HashMap<String, JudgeStatus>,
}

impl LiveRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_for(&mut self, update: &LiveUpdate) -> Option<String> {
        let previous = self
            .last_status
            .insert(update.judge.clone(), update.status);
        if previous == Some(update.status) {
            return None;
        }
        let mut line = format!(
            "{} {}",
            format!("[{}]", timestamp()).dimmed(),
            status_text(update)
        );
        if update.status.is_terminal() {
            for text in update.partial_text.lines().filter(|l| !l.trim().is_empty()) {
                let _ = write!(line, "\n    {}", text.trim_end().dimmed());
            }
        }
        Some(line)
    }
}

fn status_text(update: &LiveUpdate) -> String {
    let name = update.judge.bold();
    let elapsed = update
        .elapsed_secs
        .map(|s| format!(" [{:.1}s]", s))
        .unwrap_or_default();
    match update.status {
        JudgeStatus::Done => {
            let total = update
                .result
                .as_ref()
                .map(|r| r.scores.total.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{} {} {}{} [총점: {}]",
                name,
                update.status.label().green(),
                update.provider,
                elapsed,
                total
            )
        }
        JudgeStatus::Error => {
            let reason = match update.outcome {
                Some(JudgeOutcome::Failed(kind)) => kind.label(),
                _ => FailureKind::Transport.label(),
            };
            format!(
                "{} {} {}{} ({}, 기본 점수 사용)",
                name,
                update.status.label().red(),
                update.provider,
                elapsed,
                reason
            )
        }
        status => format!("{} {} {}", name, status.label().yellow(), update.provider),
    }
}

pub fn song_header(song: &SongContext, info: &TrackInfo) -> String {
    let mut out = format!("♪ {} - {}", song.artist, song.title)
        .bold()
        .cyan()
        .to_string();
    if !info.tags.is_empty() {
        let _ = write!(out, "\n  태그: {}", info.tags.join(", "));
    }
    if let Some(url) = &info.image_url {
        let _ = write!(out, "\n  앨범 이미지: {}", url);
    }
    out
}

pub fn judge_block(name: &str, result: &JudgeResult) -> String {
    let s = &result.scores;
    let mut out = String::new();
    let _ = writeln!(out, "{} [{:.1}s]", name.bold(), result.elapsed_secs);
    let _ = writeln!(out, "  Musicality: {}/{}", s.musicality, SUB_SCORE_CAP);
    let _ = writeln!(out, "  Marketability: {}/{}", s.marketability, SUB_SCORE_CAP);
    let _ = writeln!(out, "  Narrative: {}/{}", s.narrative, SUB_SCORE_CAP);
    let _ = writeln!(out, "  Total: {}", s.total);
    let _ = write!(out, "  Comment: {}", result.comment);
    if let JudgeOutcome::Failed(kind) = result.outcome {
        let _ = write!(out, "\n  {}", format!("({})", kind.label()).red());
    }
    out
}

/// One bar per judge, scaled against `TOTAL_CAP`.
pub fn bar_chart(panel: &PanelResult) -> String {
    let width = panel
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0);
    panel
        .iter()
        .map(|(name, result)| {
            let filled = (result.scores.total.min(TOTAL_CAP) * BAR_WIDTH / TOTAL_CAP) as usize;
            let pad = width - name.chars().count();
            format!(
                "{}{} | {}{} {}",
                name,
                " ".repeat(pad),
                "█".repeat(filled),
                "·".repeat(BAR_WIDTH as usize - filled),
                result.scores.total
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summary_line(panel: &PanelResult) -> String {
    format!(
        "총점: {} / {} | 상태: {}",
        panel.grand_total(),
        TOTAL_CAP * panel.len() as u32,
        panel.tier()
    )
}

/// Final view of a finished panel: judge blocks, chart and summary.
pub fn render_panel(panel: &PanelResult) -> String {
    let mut out = String::new();
    for (name, result) in panel.iter() {
        let _ = write!(out, "{}\n\n", judge_block(name, result));
    }
    let _ = write!(out, "{}\n{}", bar_chart(panel), summary_line(panel).bold());
    out
}
