// src/refine/response.rs - Decoding of free-form ranking model output
use log::debug;
use serde::Deserialize;

use crate::models::records::Candidate;

pub const NO_REASON: &str = "No reason provided";
pub const NOT_ANALYZED: &str = "Not analyzed by ranker";

/// The AI verdict for one candidate, keyed by URL.
#[derive(Debug, Clone, PartialEq)]
pub struct AiScore {
    pub url: String,
    pub gemini_score: f64,
    pub reason: String,
}

/// Result of decoding one ranking response.
#[derive(Debug, Clone, PartialEq)]
pub enum RankingOutcome {
    /// One entry per top candidate, in candidate order.
    Ranked(Vec<AiScore>),
    Failed { reason: String },
}

#[derive(Debug, Deserialize)]
struct RawAiScore {
    url: String,
    #[serde(rename = "geminiScore", alias = "aiScore", alias = "score")]
    gemini_score: f64,
    #[serde(default)]
    reason: Option<String>,
}

/// Decodes the model text for `top_candidates`.
///
/// The JSON array is taken from the first `[` to the last `]`. Candidates
/// the model skipped keep their own score with [`NOT_ANALYZED`].
pub fn parse_ranking_response(text: &str, top_candidates: &[Candidate]) -> RankingOutcome {
    let Some(array) = extract_json_array(text) else {
        return RankingOutcome::Failed {
            reason: "No JSON array found in ranker response".to_string(),
        };
    };

    let decoded: Vec<RawAiScore> = match serde_json::from_str(&array) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("Ranker response did not decode: {} | {}", e, array);
            return RankingOutcome::Failed {
                reason: format!("Malformed ranker response: {}", e),
            };
        }
    };

    if let Some(bad) = decoded.iter().find(|r| !r.gemini_score.is_finite()) {
        return RankingOutcome::Failed {
            reason: format!("Non-finite score for {}", bad.url),
        };
    }

    let scores = top_candidates
        .iter()
        .map(|candidate| match decoded.iter().find(|r| r.url == candidate.url()) {
            Some(raw) => AiScore {
                url: raw.url.clone(),
                gemini_score: raw.gemini_score.clamp(0.0, 1.0),
                reason: raw
                    .reason
                    .clone()
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| NO_REASON.to_string()),
            },
            None => own_score(candidate, NOT_ANALYZED),
        })
        .collect();

    RankingOutcome::Ranked(scores)
}

/// Every candidate keeps its own similarity score, tagged with `reason`.
pub fn fallback_scores(top_candidates: &[Candidate], reason: &str) -> Vec<AiScore> {
    top_candidates.iter().map(|c| own_score(c, reason)).collect()
}

fn own_score(candidate: &Candidate, reason: &str) -> AiScore {
    AiScore {
        url: candidate.url().to_string(),
        gemini_score: candidate.score,
        reason: reason.to_string(),
    }
}

fn extract_json_array(text: &str) -> Option<String> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let start = cleaned.find('[')?;
    let end = cleaned.rfind(']')?;
    if end < start {
        return None;
    }
    Some(cleaned[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::{FieldScores, Record};

    fn candidate(url: &str, score: f64) -> Candidate {
        Candidate::new(
            Record {
                url: url.to_string(),
                ..Record::default()
            },
            score,
            FieldScores::default(),
        )
    }

    fn top() -> Vec<Candidate> {
        vec![candidate("/b", 0.9), candidate("/c", 0.85)]
    }

    #[test]
    fn test_decodes_array_with_surrounding_text() {
        let text = "Claro! Aqui está:\n```json\n[{\"url\": \"/b\", \"geminiScore\": 0.95, \"reason\": \"mesmo tipo\"}]\n```";
        let RankingOutcome::Ranked(scores) = parse_ranking_response(text, &top()) else {
            panic!("expected ranked outcome");
        };
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].url, "/b");
        assert_eq!(scores[0].gemini_score, 0.95);
        assert_eq!(scores[0].reason, "mesmo tipo");
        assert_eq!(scores[1].url, "/c");
        assert_eq!(scores[1].gemini_score, 0.85);
        assert_eq!(scores[1].reason, NOT_ANALYZED);
    }

    #[test]
    fn test_clamps_and_defaults_reason() {
        let text = r#"[{"url": "/b", "geminiScore": 1.7}, {"url": "/c", "geminiScore": -0.2, "reason": ""}]"#;
        let RankingOutcome::Ranked(scores) = parse_ranking_response(text, &top()) else {
            panic!("expected ranked outcome");
        };
        assert_eq!(scores[0].gemini_score, 1.0);
        assert_eq!(scores[0].reason, NO_REASON);
        assert_eq!(scores[1].gemini_score, 0.0);
        assert_eq!(scores[1].reason, NO_REASON);
    }

    #[test]
    fn test_failures() {
        assert!(matches!(
            parse_ranking_response("no json here", &top()),
            RankingOutcome::Failed { .. }
        ));
        assert!(matches!(
            parse_ranking_response("[{\"url\": \"/b\"}]", &top()),
            RankingOutcome::Failed { .. }
        ));
        assert!(matches!(
            parse_ranking_response("[{\"url\": \"/b\", \"geminiScore\": \"high\"}]", &top()),
            RankingOutcome::Failed { .. }
        ));
        assert!(matches!(
            parse_ranking_response("] then [", &top()),
            RankingOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_fallback_scores_use_own_score() {
        let scores = fallback_scores(&top(), "Parse error");
        assert_eq!(scores[0].gemini_score, 0.9);
        assert_eq!(scores[1].gemini_score, 0.85);
        assert!(scores.iter().all(|s| s.reason == "Parse error"));
    }
}
