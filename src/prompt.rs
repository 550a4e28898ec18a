use crate::catalog::Judge;
use crate::constants::{FORMAT_INSTRUCTION, SCORING_CONTRACT};
use crate::types::{GradeBucket, SongContext};

/// Renders the system prompt for `judge` in the tone of `bucket`.
///
/// A judge without a persona for the bucket (only possible for catalogs built
/// without validation) gets the persona-less prompt; the scoring contract and
/// the output format are always present.
pub fn build_system_prompt(judge: &Judge, bucket: GradeBucket) -> String {
    let (persona, lines) = match judge.persona(bucket) {
        Some(p) => (p.persona.as_str(), p.lines.join(", ")),
        None => ("", String::new()),
    };
    format!(
        "당신은 {}입니다. {} 유행어: {}. {} {} 오직 한글로만 답변하세요. {}",
        judge.name, persona, lines, SCORING_CONTRACT, judge.guideline, FORMAT_INSTRUCTION
    )
}

pub fn build_user_prompt(song: &SongContext, tags: &[String]) -> String {
    let tags_text = if tags.is_empty() {
        "태그: 사용 불가".to_string()
    } else {
        format!("태그: {}", tags.join(", "))
    };
    format!(
        "평가 대상: Artist: {}, Title: {}\nLyrics: {}\n{}",
        song.artist, song.title, song.review, tags_text
    )
}
