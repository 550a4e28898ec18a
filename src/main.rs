use judge_panel::grade::Tier;
use judge_panel::lastfm::TrackInfo;
use judge_panel::logging::{init_tracing, setup_panic_hook};
use judge_panel::providers::Credentials;
use judge_panel::render::{render_panel, song_header, LiveRenderer};
use judge_panel::*;

use clap::Parser;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

#[derive(Serialize)]
struct SongReport {
    song: SongContext,
    track: TrackInfo,
    results: PanelResult,
    grand_total: u32,
    tier: Tier,
}

async fn lookup_track(state: &AppState, song: &SongContext) -> TrackInfo {
    let mut info = match &state.lastfm {
        Some(client) => client.track_info(&song.artist, &song.title).await,
        None => TrackInfo::default(),
    };
    if !state.args.tags.is_empty() {
        info.tags = state.args.tags.clone();
    }
    info
}

/// Runs the panel for one song while echoing live status changes.
async fn judge_song(state: &AppState, song: &SongContext, tags: &[String]) -> PanelResult {
    let mut rx = state.tx_live.subscribe();
    let mut renderer = LiveRenderer::new();
    let quiet = state.args.json;
    let mut show = |update: &panel::LiveUpdate| {
        if quiet {
            return;
        }
        if let Some(line) = renderer.line_for(update) {
            println!("{}", line);
        }
    };

    let run = state.orchestrator.run(song, tags);
    tokio::pin!(run);
    let mut feed_open = true;
    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            update = rx.recv(), if feed_open => match update {
                Ok(update) => show(&update),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Live view skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => feed_open = false,
            },
        }
    };
    while let Ok(update) = rx.try_recv() {
        show(&update);
    }
    result
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let _guard = init_tracing(&args.log_dir);
    setup_panic_hook();

    let credentials = Credentials::from_env();
    let state = match AppState::build(args, &credentials) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Failed to start: {}", e.inner);
            std::process::exit(1);
        }
    };

    let songs = match state.args.songs().await {
        Ok(songs) if !songs.is_empty() => songs,
        Ok(_) => {
            eprintln!("No songs with lyrics were found.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to load songs: {}", e.inner);
            std::process::exit(1);
        }
    };

    let mut reports = Vec::with_capacity(songs.len());
    for song in songs {
        let track = lookup_track(&state, &song).await;
        if !state.args.json {
            println!("\n{}", song_header(&song, &track));
        }

        let results = judge_song(&state, &song, &track.tags).await;
        if !state.args.json {
            println!("\n{}", render_panel(&results));
        }

        reports.push(SongReport {
            grand_total: results.grand_total(),
            tier: results.tier(),
            song,
            track,
            results,
        });
    }

    if state.args.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize results: {}", e);
                std::process::exit(1);
            }
        }
    }
}
