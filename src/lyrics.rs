use crate::constants::MAX_SONGS_PER_RUN;
use crate::types::*;
use std::path::Path;

struct PendingSong {
    artist: String,
    title: String,
    lines: Vec<String>,
}

impl PendingSong {
    fn finish(self) -> Option<SongContext> {
        if self.lines.is_empty() {
            return None;
        }
        Some(SongContext::new(
            self.artist,
            self.title,
            &self.lines.join("\n"),
        ))
    }
}

fn parse_header(line: &str) -> Option<(String, String)> {
    let body = line.strip_suffix(':')?;
    let (artist, title) = body.split_once(" - ")?;
    Some((artist.trim().to_string(), title.trim().to_string()))
}

/// Splits a lyrics document into songs. A line such as `IU - Blueming:` opens
/// a song and every following non-empty line belongs to it.
pub fn parse_lyrics_document(text: &str) -> Vec<SongContext> {
    let mut songs = Vec::new();
    let mut current: Option<PendingSong> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if let Some((artist, title)) = parse_header(line) {
            if let Some(song) = current.take().and_then(PendingSong::finish) {
                songs.push(song);
            }
            current = Some(PendingSong {
                artist,
                title,
                lines: Vec::new(),
            });
        } else if !line.is_empty() {
            if let Some(song) = current.as_mut() {
                song.lines.push(line.to_string());
            }
        }
    }
    if let Some(song) = current.and_then(PendingSong::finish) {
        songs.push(song);
    }

    if songs.len() > MAX_SONGS_PER_RUN {
        tracing::info!(
            "Lyrics document holds {} songs; keeping the first {}",
            songs.len(),
            MAX_SONGS_PER_RUN
        );
        songs.truncate(MAX_SONGS_PER_RUN);
    }
    songs
}

pub async fn load_lyrics_file<P: AsRef<Path>>(path: P) -> Result<Vec<SongContext>> {
    let content = tokio::fs::read_to_string(path.as_ref())
        .await
        .map_err(PanelError::Io)?;
    let songs = parse_lyrics_document(&content);
    tracing::info!(
        "Loaded {} songs from {}",
        songs.len(),
        path.as_ref().display()
    );
    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::REVIEW_MAX_CHARS;

    #[test]
    fn test_parses_headers_and_lyrics() {
        let doc = "IU - Blueming:\n  뭐해? 라는 두 글자에  \n\n네가 보고 싶어\nNewJeans - Ditto:\nStay in the middle\n";
        let songs = parse_lyrics_document(doc);
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].artist, "IU");
        assert_eq!(songs[0].title, "Blueming");
        assert_eq!(songs[0].review, "뭐해? 라는 두 글자에\n네가 보고 싶어");
        assert_eq!(songs[1].title, "Ditto");
    }

    #[test]
    fn test_songs_without_lyrics_are_dropped() {
        let doc = "Nobody - Silence:\n\nBand - Song:\nla la la\nEmpty - Last:\n";
        let songs = parse_lyrics_document(doc);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].artist, "Band");
    }

    #[test]
    fn test_text_before_first_header_is_ignored() {
        let songs = parse_lyrics_document("stray line\nA - B:\nverse");
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].review, "verse");
    }

    #[test]
    fn test_title_may_contain_separator() {
        let songs = parse_lyrics_document("AKMU - Love Lee - Remix:\nhello");
        assert_eq!(songs[0].artist, "AKMU");
        assert_eq!(songs[0].title, "Love Lee - Remix");
    }

    #[test]
    fn test_limits() {
        let mut doc = String::new();
        for i in 0..8 {
            doc.push_str(&format!("Artist{} - Song{}:\n{}\n", i, i, "가".repeat(800)));
        }
        let songs = parse_lyrics_document(&doc);
        assert_eq!(songs.len(), MAX_SONGS_PER_RUN);
        assert_eq!(songs[4].artist, "Artist4");
        assert!(songs
            .iter()
            .all(|s| s.review.chars().count() == REVIEW_MAX_CHARS));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_an_error() {
        let result = load_lyrics_file("/definitely/not/here.txt").await;
        assert!(matches!(result, Err(ref e) if matches!(e.inner, PanelError::Io(_))));
    }
}
