//! Multi-label emotion classification over the GoEmotions taxonomy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CapabilityError, check_status, with_timeout};
use crate::i18n::UiLanguage;

/// The 28 emotion categories scored by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Admiration,
    Amusement,
    Anger,
    Annoyance,
    Approval,
    Caring,
    Confusion,
    Curiosity,
    Desire,
    Disappointment,
    Disapproval,
    Disgust,
    Embarrassment,
    Excitement,
    Fear,
    Gratitude,
    Grief,
    Joy,
    Love,
    Nervousness,
    Optimism,
    Pride,
    Realization,
    Relief,
    Remorse,
    Sadness,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 28] = [
        Emotion::Admiration,
        Emotion::Amusement,
        Emotion::Anger,
        Emotion::Annoyance,
        Emotion::Approval,
        Emotion::Caring,
        Emotion::Confusion,
        Emotion::Curiosity,
        Emotion::Desire,
        Emotion::Disappointment,
        Emotion::Disapproval,
        Emotion::Disgust,
        Emotion::Embarrassment,
        Emotion::Excitement,
        Emotion::Fear,
        Emotion::Gratitude,
        Emotion::Grief,
        Emotion::Joy,
        Emotion::Love,
        Emotion::Nervousness,
        Emotion::Optimism,
        Emotion::Pride,
        Emotion::Realization,
        Emotion::Relief,
        Emotion::Remorse,
        Emotion::Sadness,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Parse the model's label name (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.key().eq_ignore_ascii_case(label))
    }

    /// Label name as used by the model.
    pub fn key(&self) -> &'static str {
        self.label(UiLanguage::En)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::Admiration => "👏",
            Emotion::Amusement => "😄",
            Emotion::Anger => "😠",
            Emotion::Annoyance => "😒",
            Emotion::Approval => "👍",
            Emotion::Caring => "🤗",
            Emotion::Confusion => "😕",
            Emotion::Curiosity => "🤔",
            Emotion::Desire => "😍",
            Emotion::Disappointment => "😞",
            Emotion::Disapproval => "👎",
            Emotion::Disgust => "🤢",
            Emotion::Embarrassment => "😳",
            Emotion::Excitement => "🤩",
            Emotion::Fear => "😨",
            Emotion::Gratitude => "🙏",
            Emotion::Grief => "😢",
            Emotion::Joy => "😊",
            Emotion::Love => "❤️",
            Emotion::Nervousness => "😬",
            Emotion::Optimism => "🌤️",
            Emotion::Pride => "🦁",
            Emotion::Realization => "💡",
            Emotion::Relief => "😮‍💨",
            Emotion::Remorse => "😔",
            Emotion::Sadness => "😢",
            Emotion::Surprise => "😮",
            Emotion::Neutral => "😐",
        }
    }

    /// Display name in the given UI language.
    pub fn label(&self, lang: UiLanguage) -> &'static str {
        match lang {
            UiLanguage::En => match self {
                Emotion::Admiration => "admiration",
                Emotion::Amusement => "amusement",
                Emotion::Anger => "anger",
                Emotion::Annoyance => "annoyance",
                Emotion::Approval => "approval",
                Emotion::Caring => "caring",
                Emotion::Confusion => "confusion",
                Emotion::Curiosity => "curiosity",
                Emotion::Desire => "desire",
                Emotion::Disappointment => "disappointment",
                Emotion::Disapproval => "disapproval",
                Emotion::Disgust => "disgust",
                Emotion::Embarrassment => "embarrassment",
                Emotion::Excitement => "excitement",
                Emotion::Fear => "fear",
                Emotion::Gratitude => "gratitude",
                Emotion::Grief => "grief",
                Emotion::Joy => "joy",
                Emotion::Love => "love",
                Emotion::Nervousness => "nervousness",
                Emotion::Optimism => "optimism",
                Emotion::Pride => "pride",
                Emotion::Realization => "realization",
                Emotion::Relief => "relief",
                Emotion::Remorse => "remorse",
                Emotion::Sadness => "sadness",
                Emotion::Surprise => "surprise",
                Emotion::Neutral => "neutral",
            },
            UiLanguage::Es => match self {
                Emotion::Admiration => "admiración",
                Emotion::Amusement => "diversión",
                Emotion::Anger => "ira",
                Emotion::Annoyance => "molestia",
                Emotion::Approval => "aprobación",
                Emotion::Caring => "afecto",
                Emotion::Confusion => "confusión",
                Emotion::Curiosity => "curiosidad",
                Emotion::Desire => "deseo",
                Emotion::Disappointment => "decepción",
                Emotion::Disapproval => "desaprobación",
                Emotion::Disgust => "asco",
                Emotion::Embarrassment => "vergüenza",
                Emotion::Excitement => "entusiasmo",
                Emotion::Fear => "temor",
                Emotion::Gratitude => "gratitud",
                Emotion::Grief => "duelo",
                Emotion::Joy => "alegría",
                Emotion::Love => "amor",
                Emotion::Nervousness => "nerviosismo",
                Emotion::Optimism => "optimismo",
                Emotion::Pride => "orgullo",
                Emotion::Realization => "revelación",
                Emotion::Relief => "alivio",
                Emotion::Remorse => "remordimiento",
                Emotion::Sadness => "tristeza",
                Emotion::Surprise => "sorpresa",
                Emotion::Neutral => "neutral",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub label: Emotion,
    pub score: f32,
}

/// Selection policy applied to the raw per-category scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionPolicy {
    pub top_k: usize,
    pub threshold: f32,
}

impl Default for EmotionPolicy {
    fn default() -> Self {
        Self {
            top_k: 3,
            threshold: 0.30,
        }
    }
}

/// Keep every score at or above the threshold, best first, at most `top_k`.
/// If nothing clears the threshold the single best score is kept instead.
pub fn select(mut scores: Vec<EmotionScore>, policy: EmotionPolicy) -> Vec<EmotionScore> {
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    let best = scores.first().copied();
    let mut picked: Vec<_> = scores
        .into_iter()
        .filter(|s| s.score >= policy.threshold)
        .collect();
    if picked.is_empty() {
        picked.extend(best);
    }
    picked.truncate(policy.top_k);
    picked
}

/// Render scores as `"joy 😊 (0.91), love ❤️ (0.40)"`.
///
/// An empty list renders the neutral label without a score.
pub fn format_emotions(scores: &[EmotionScore], lang: UiLanguage) -> String {
    if scores.is_empty() {
        return format!(
            "{} {}",
            Emotion::Neutral.label(lang),
            Emotion::Neutral.emoji()
        );
    }
    scores
        .iter()
        .map(|s| format!("{} {} ({:.2})", s.label.label(lang), s.label.emoji(), s.score))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Independent per-category probabilities for a piece of English text.
#[async_trait]
pub trait EmotionModel: Send + Sync {
    async fn score(&self, text: &str) -> Result<Vec<EmotionScore>, CapabilityError>;
}

/// Runs an [`EmotionModel`] and applies an [`EmotionPolicy`].
///
/// Input is expected to be English; no language check is made here.
#[derive(Clone)]
pub struct EmotionClassifier {
    model: Arc<dyn EmotionModel>,
    timeout: Duration,
}

impl EmotionClassifier {
    pub fn new(model: Arc<dyn EmotionModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub async fn classify(
        &self,
        text: &str,
        policy: EmotionPolicy,
    ) -> Result<Vec<EmotionScore>, CapabilityError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let scores = with_timeout(self.timeout, self.model.score(text)).await?;
        let picked = select(scores, policy);
        debug!(?picked, "emotions selected");
        Ok(picked)
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    inputs: &'a str,
    truncate: bool,
}

#[derive(Debug, Deserialize)]
struct RawScore {
    label: String,
    score: f32,
}

/// [`EmotionModel`] served by a text-embeddings-inference `/predict` endpoint
/// running a multi-label GoEmotions checkpoint.
#[derive(Clone)]
pub struct HttpEmotionModel {
    http: Client,
    base_url: String,
}

impl HttpEmotionModel {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmotionModel for HttpEmotionModel {
    async fn score(&self, text: &str) -> Result<Vec<EmotionScore>, CapabilityError> {
        let url = format!("{}/predict", self.base_url);
        let req = PredictRequest {
            inputs: text,
            truncate: true,
        };
        let resp = self.http.post(&url).json(&req).send().await?;
        let raw: Vec<RawScore> = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;
        Ok(raw
            .into_iter()
            .filter_map(|r| match Emotion::from_label(&r.label) {
                Some(label) => Some(EmotionScore {
                    label,
                    score: r.score,
                }),
                None => {
                    warn!(label = %r.label, "unknown emotion label");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn s(label: Emotion, score: f32) -> EmotionScore {
        EmotionScore { label, score }
    }

    #[test]
    fn keeps_scores_above_threshold_best_first() {
        let picked = select(
            vec![
                s(Emotion::Love, 0.41),
                s(Emotion::Joy, 0.91),
                s(Emotion::Fear, 0.05),
                s(Emotion::Optimism, 0.30),
                s(Emotion::Admiration, 0.35),
            ],
            EmotionPolicy::default(),
        );
        assert_eq!(
            picked,
            vec![
                s(Emotion::Joy, 0.91),
                s(Emotion::Love, 0.41),
                s(Emotion::Admiration, 0.35)
            ]
        );
    }

    #[test]
    fn falls_back_to_single_best_below_threshold() {
        let picked = select(
            vec![s(Emotion::Fear, 0.05), s(Emotion::Neutral, 0.21)],
            EmotionPolicy::default(),
        );
        assert_eq!(picked, vec![s(Emotion::Neutral, 0.21)]);
    }

    #[test]
    fn no_scores_select_nothing() {
        assert!(select(vec![], EmotionPolicy::default()).is_empty());
    }

    #[test]
    fn labels_round_trip_through_model_names() {
        for e in Emotion::ALL {
            assert_eq!(Emotion::from_label(e.key()), Some(e));
        }
        assert_eq!(Emotion::from_label("JOY"), Some(Emotion::Joy));
        assert_eq!(Emotion::from_label("bliss"), None);
    }

    #[test]
    fn formats_in_ui_language() {
        let list = [s(Emotion::Joy, 0.912), s(Emotion::Love, 0.4)];
        assert_eq!(
            format_emotions(&list, UiLanguage::En),
            "joy 😊 (0.91), love ❤️ (0.40)"
        );
        assert_eq!(
            format_emotions(&list, UiLanguage::Es),
            "alegría 😊 (0.91), amor ❤️ (0.40)"
        );
        assert_eq!(format_emotions(&[], UiLanguage::Es), "neutral 😐");
    }

    struct Fixed(Vec<EmotionScore>);

    #[async_trait]
    impl EmotionModel for Fixed {
        async fn score(&self, _text: &str) -> Result<Vec<EmotionScore>, CapabilityError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn classify_is_bounded_and_sorted() {
        let scores = Emotion::ALL
            .iter()
            .enumerate()
            .map(|(i, e)| s(*e, i as f32 / 27.0))
            .collect();
        let clf = EmotionClassifier::new(Arc::new(Fixed(scores)), Duration::from_secs(1));
        let out = clf.classify("whatever", EmotionPolicy::default()).await.unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(out[0].label, Emotion::Neutral);
    }

    #[tokio::test]
    async fn classify_empty_text_is_empty() {
        let clf = EmotionClassifier::new(
            Arc::new(Fixed(vec![s(Emotion::Joy, 0.9)])),
            Duration::from_secs(1),
        );
        assert!(clf.classify("", EmotionPolicy::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_model_parses_predictions() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/predict")
                    .json_body(json!({ "inputs": "I love this", "truncate": true }));
                then.status(200).json_body(json!([
                    { "label": "love", "score": 0.93 },
                    { "label": "mystery", "score": 0.5 },
                    { "label": "admiration", "score": 0.12 }
                ]));
            })
            .await;
        let model = HttpEmotionModel::new(Client::new(), server.base_url());
        let scores = model.score("I love this").await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].label, Emotion::Love);
    }
}
