use crate::types::{GradeBucket, ObservedError, PanelError, ProviderKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Persona text and catchphrases for one grade bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    pub persona: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Judge {
    pub name: String,
    pub provider: ProviderKind,
    pub model_id: String,
    /// Style instruction appended after the scoring contract.
    #[serde(default)]
    pub guideline: String,
    pub score_ranges: BTreeMap<GradeBucket, Persona>,
}

impl Judge {
    pub fn persona(&self, bucket: GradeBucket) -> Option<&Persona> {
        self.score_ranges.get(&bucket)
    }
}

/// The judges of a panel, in display order. Immutable once built, and
/// only ever built validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawCatalog")]
pub struct JudgeCatalog {
    judges: Vec<Judge>,
}

/// Wire shape of a catalog before validation.
#[derive(Deserialize)]
struct RawCatalog {
    judges: Vec<Judge>,
}

impl TryFrom<RawCatalog> for JudgeCatalog {
    type Error = ObservedError;

    fn try_from(raw: RawCatalog) -> Result<Self> {
        Self::new(raw.judges)
    }
}

impl JudgeCatalog {
    pub fn new(judges: Vec<Judge>) -> Result<Self> {
        let catalog = Self { judges };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        // Parse the raw shape first so validation failures stay `Config` errors.
        let raw: RawCatalog = serde_json::from_str(json)?;
        raw.try_into()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(
            "Loaded {} judges from {}",
            catalog.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.judges.is_empty() {
            return Err(PanelError::Config("judge catalog is empty".to_string()).into());
        }
        let mut seen = HashSet::new();
        for judge in &self.judges {
            if !seen.insert(judge.name.as_str()) {
                return Err(
                    PanelError::Config(format!("duplicate judge name '{}'", judge.name)).into(),
                );
            }
            if let Some(missing) = GradeBucket::ALL
                .iter()
                .find(|b| !judge.score_ranges.contains_key(*b))
            {
                return Err(PanelError::Config(format!(
                    "judge '{}' has no persona for grade bucket {}",
                    judge.name, missing
                ))
                .into());
            }
        }
        Ok(())
    }

    pub fn judges(&self) -> &[Judge] {
        &self.judges
    }

    pub fn get(&self, name: &str) -> Option<&Judge> {
        self.judges.iter().find(|j| j.name == name)
    }

    pub fn len(&self) -> usize {
        self.judges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty()
    }
}

fn persona(text: &str, lines: [&str; 3]) -> Persona {
    Persona {
        persona: text.to_string(),
        lines: lines.iter().map(|l| l.to_string()).collect(),
    }
}

impl Default for JudgeCatalog {
    /// The built-in three-judge audition panel.
    fn default() -> Self {
        let simon = Judge {
            name: "Simon Cowell".to_string(),
            provider: ProviderKind::Friendli,
            model_id: "meta-llama-3.1-8b-instruct".to_string(),
            guideline: "거친 영국식 유머로 4-6문장을 자세히 작성하세요. 냉정하게 분석하세요."
                .to_string(),
            score_ranges: BTreeMap::from([
                (
                    GradeBucket::Hit,
                    persona(
                        "A brutally honest British mogul showing rare approval. Be impressed and acknowledge excellence.",
                        ["That was absolutely brilliant!", "You're a star!", "Best of the night!"],
                    ),
                ),
                (
                    GradeBucket::Good,
                    persona(
                        "A brutally honest British mogul being moderately positive. Show cautious optimism.",
                        ["Decent effort.", "You've got potential.", "Not bad at all."],
                    ),
                ),
                (
                    GradeBucket::Solid,
                    persona(
                        "A brutally honest British mogul. Be harsh and critical.",
                        ["It's a no from me.", "You're wasting everyone's time.", "Utterly forgettable."],
                    ),
                ),
                (
                    GradeBucket::Bad,
                    persona(
                        "A brutally honest British mogul at his harshest. Be severely critical.",
                        ["Total disaster.", "Worst I've ever seen.", "Absolutely dreadful."],
                    ),
                ),
            ]),
        };

        let howie = Judge {
            name: "Howie Mandel".to_string(),
            provider: ProviderKind::OpenAi,
            model_id: "gpt-4o-mini".to_string(),
            guideline: "열정적인 4-6문장을 작성하세요. 에너지 넘치고 격려하되 솔직해야 합니다."
                .to_string(),
            score_ranges: BTreeMap::from([
                (
                    GradeBucket::Hit,
                    persona(
                        "An enthusiastic comedian at peak excitement. Be ecstatic and celebratory.",
                        ["You just changed your life!", "America is going to love you!", "You are a superstar!"],
                    ),
                ),
                (
                    GradeBucket::Good,
                    persona(
                        "An enthusiastic comedian showing genuine appreciation. Be friendly and encouraging.",
                        ["Really good job!", "I enjoyed that!", "You've got something special."],
                    ),
                ),
                (
                    GradeBucket::Solid,
                    persona(
                        "An enthusiastic comedian trying to stay positive despite disappointment.",
                        ["It was okay.", "I've seen better.", "Keep working on it."],
                    ),
                ),
                (
                    GradeBucket::Bad,
                    persona(
                        "An enthusiastic comedian struggling to find positives.",
                        ["That didn't work for me.", "I'm confused.", "Not your best."],
                    ),
                ),
            ]),
        };

        let mel = Judge {
            name: "Mel B".to_string(),
            provider: ProviderKind::Gemini,
            model_id: "gemini-2.0-flash-lite".to_string(),
            guideline:
                "영국식 슬랭을 섞어 5-7문장을 강하게 작성하세요. 직설적이고 열정적으로 개성을 보여주세요."
                    .to_string(),
            score_ranges: BTreeMap::from([
                (
                    GradeBucket::Hit,
                    persona(
                        "A Fierce Spice Girl completely blown away. Be wildly enthusiastic with British slang.",
                        ["Off the chain!", "Absolutely sick!", "You smashed it, love!"],
                    ),
                ),
                (
                    GradeBucket::Good,
                    persona(
                        "A Fierce Spice Girl showing approval. Be upbeat with British slang.",
                        ["That was proper good!", "I'm feeling it!", "Nice one!"],
                    ),
                ),
                (
                    GradeBucket::Solid,
                    persona(
                        "A Fierce Spice Girl being outspoken about disappointment. Be frank with British slang.",
                        ["What just happened?!", "Not feeling it.", "Bit rubbish, innit?"],
                    ),
                ),
                (
                    GradeBucket::Bad,
                    persona(
                        "A Fierce Spice Girl at her most critical. Be harshly honest with British slang.",
                        ["Shut up, Simon! But he's right.", "Absolute shambles.", "That was pants."],
                    ),
                ),
            ]),
        };

        Self {
            judges: vec![simon, howie, mel],
        }
    }
}
