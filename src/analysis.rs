use crate::config::{Config, ANALYSIS_MAX_TOKENS};
use crate::errors::{AnalysisError, AppError};
use crate::models::{AnalysisResult, ChurnRisk, CustomerRecord, RECOMMENDATION_COUNT};
use crate::prompt::{render_prompt, strip_code_fences};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
///
/// Every call is independent: no caching, no retry. Asking twice about the same
/// customer issues two requests and may get two different answers.
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Reply shape the prompt asks for, before validation.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    health_score: f64,
    churn_risk: String,
    analysis: String,
    recommendations: Vec<String>,
}

impl AnthropicClient {
    /// Creates a new `AnthropicClient` from configuration.
    ///
    /// A missing API key is accepted here; calls fail with
    /// `AnalysisError::MissingCredential` instead.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.analysis_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create Anthropic client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.anthropic_base_url.clone(),
            api_key: config.anthropic_api_key.clone(),
            model: config.anthropic_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Analyzes one customer: renders the prompt, calls the model once and
    /// decodes the reply.
    pub async fn analyze(&self, record: &CustomerRecord) -> Result<AnalysisResult, AnalysisError> {
        tracing::info!("Analyzing customer '{}' with {}", record.name, self.model);
        let prompt = render_prompt(record);
        let reply = self.complete(&prompt).await?;
        let result = decode_reply(&reply).map_err(|e| {
            tracing::warn!("Unusable reply for '{}': {}", record.name, e);
            tracing::debug!("Raw reply: {}", reply);
            e
        })?;

        tracing::info!(
            "✓ '{}' analyzed: health_score={}, churn_risk={}",
            record.name,
            result.health_score,
            result.churn_risk
        );
        Ok(result)
    }

    /// Sends one user message and returns the reply text.
    pub async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AnalysisError::MissingCredential)?;

        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: ANALYSIS_MAX_TOKENS,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Network(format!("Messages API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message: api_error_message(&error_text),
            });
        }

        let data: MessagesResponse = response.json().await?;
        let text: String = data
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(AnalysisError::Decode(
                "reply contained no text content".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Pulls `error.message` out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Decodes a model reply into a validated [`AnalysisResult`].
///
/// Code fences are stripped first. Replies whose score is not an integer in
/// 0-100, whose risk is not one of the three literals, or that do not carry
/// exactly three recommendations are rejected with `AnalysisError::Contract`.
pub fn decode_reply(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let cleaned = strip_code_fences(text);
    let raw: RawAnalysis = serde_json::from_str(cleaned.trim())?;

    let score = raw.health_score;
    if !score.is_finite() || score.fract() != 0.0 || !(0.0..=100.0).contains(&score) {
        return Err(AnalysisError::Contract(format!(
            "health_score must be an integer between 0 and 100, got {}",
            score
        )));
    }

    let churn_risk: ChurnRisk = raw.churn_risk.parse().map_err(AnalysisError::Contract)?;

    if raw.recommendations.len() != RECOMMENDATION_COUNT {
        return Err(AnalysisError::Contract(format!(
            "expected {} recommendations, got {}",
            RECOMMENDATION_COUNT,
            raw.recommendations.len()
        )));
    }

    Ok(AnalysisResult {
        health_score: score as u8,
        churn_risk,
        analysis: raw.analysis,
        recommendations: raw.recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(recommendations: &[&str]) -> String {
        serde_json::json!({
            "health_score": 64,
            "churn_risk": "medium",
            "analysis": "Uso estable.",
            "recommendations": recommendations,
        })
        .to_string()
    }

    #[test]
    fn test_decode_valid_reply() {
        let result = decode_reply(&reply(&["A", "B", "C"])).unwrap();
        assert_eq!(result.health_score, 64);
        assert_eq!(result.churn_risk, ChurnRisk::Medium);
        assert_eq!(result.recommendations, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_decode_fenced_reply() {
        let fenced = format!("```json\n{}\n```", reply(&["A", "B", "C"]));
        assert!(decode_reply(&fenced).is_ok());
    }

    #[test]
    fn test_wrong_recommendation_counts_are_rejected() {
        for recs in [vec![], vec!["A"], vec!["A", "B"], vec!["A", "B", "C", "D"]] {
            let err = decode_reply(&reply(&recs)).unwrap_err();
            assert!(
                matches!(err, AnalysisError::Contract(ref m) if m.contains(&format!("got {}", recs.len()))),
                "unexpected error for {} recommendations: {:?}",
                recs.len(),
                err
            );
        }
    }

    #[test]
    fn test_unknown_churn_risk_is_rejected() {
        let text = r#"{"health_score":50,"churn_risk":"critical","analysis":"x","recommendations":["A","B","C"]}"#;
        assert!(matches!(
            decode_reply(text),
            Err(AnalysisError::Contract(_))
        ));
    }

    #[test]
    fn test_out_of_range_scores_are_rejected() {
        for score in ["101", "-1", "72.5"] {
            let text = format!(
                r#"{{"health_score":{},"churn_risk":"low","analysis":"x","recommendations":["A","B","C"]}}"#,
                score
            );
            assert!(matches!(
                decode_reply(&text),
                Err(AnalysisError::Contract(_))
            ));
        }
        let text = r#"{"health_score":100.0,"churn_risk":"low","analysis":"x","recommendations":["A","B","C"]}"#;
        assert_eq!(decode_reply(text).unwrap().health_score, 100);
    }

    #[test]
    fn test_non_json_and_missing_keys_are_decode_errors() {
        assert!(matches!(
            decode_reply("Lo siento, no puedo ayudar."),
            Err(AnalysisError::Decode(_))
        ));
        assert!(matches!(
            decode_reply(r#"{"health_score":50,"churn_risk":"low"}"#),
            Err(AnalysisError::Decode(_))
        ));
    }

    #[test]
    fn test_api_error_message_extraction() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(api_error_message(body), "Overloaded");
        assert_eq!(api_error_message("bad gateway"), "bad gateway");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_network() {
        let config = Config::for_base_url("http://127.0.0.1:9", None);
        let client = AnthropicClient::new(&config).unwrap();
        assert!(!client.has_credential());
        let err = client.complete("hola").await.unwrap_err();
        assert_eq!(err, AnalysisError::MissingCredential);
    }
}
