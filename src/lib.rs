pub mod catalog;
pub mod constants;
pub mod grade;
pub mod hardening;
pub mod lastfm;
pub mod logging;
pub mod lyrics;
pub mod main_helper;
pub mod panel;
pub mod parser;
pub mod prompt;
pub mod providers;
pub mod redaction_layer;
pub mod render;
pub mod specs;
pub mod str_utils;
pub mod streaming;
pub mod types;

pub use types::*;

pub use main_helper::{AppState, Args};
