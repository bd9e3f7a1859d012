//! Gemini-based translation into colloquial Persian using the Generative AI API.

use crate::config::DEFAULT_MODEL;
use crate::error::{FarsubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Base delay for exponential backoff between retries.
const BASE_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound for a single backoff delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

const SYSTEM_INSTRUCTION: &str = r#"
You are an expert movie subtitle translator specialized in translating English to "Colloquial Iranian Persian" (Farsi Mahavorei).
Your goal is to make the subtitles sound exactly like how real Iranians speak in everyday life.

RULES:
1. DO NOT use formal or bookish Persian (Ketabi). Use "Tehrani" colloquial style.
2. Adapt idioms to their cultural Persian equivalents.
3. Keep the emotional tone, humor, and slang intact.
4. Examples:
   - "I don't know" -> "نمی‌دونم" (NOT: من نمی‌دانم)
   - "What's up?" -> "چه خبر؟"
   - "Are you kidding me?" -> "شوخی می‌کنی؟" یا "داری شوخی می‌کنی؟"
   - "Come on!" -> "بزن‌تالا!" یا "زود باش دیگه!"
   - "This is insane!" -> "این دیگه خیلیه!" یا "دیوونه‌کننده‌ست!"
5. Profanity is allowed if it fits the character's tone.
6. Return only the translated text.
"#;

/// Translator using Google Gemini API.
pub struct GeminiTranslator {
    client: Client,
    base_url: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl Default for GeminiTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_retries: 3,
            retry_delay: BASE_RETRY_DELAY,
        }
    }

    /// Set a different model (e.g., "gemini-2.0-flash").
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Number of retries after the first attempt on server or transport errors.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Delay before retry `attempt` (1-based): doubles each time, capped.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }

    fn build_prompt(&self, texts: &[&str]) -> Result<String> {
        Ok(format!(
            "Translate the following subtitle lines into colloquial Persian. \
             Return them as a JSON array of strings: {}",
            serde_json::to_string(texts)?
        ))
    }

    fn build_request(&self, texts: &[&str]) -> Result<GenerateContentRequest> {
        Ok(GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: self.build_prompt(texts)?,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: Schema {
                    kind: "ARRAY",
                    items: Some(Box::new(Schema {
                        kind: "STRING",
                        items: None,
                    })),
                },
            },
        })
    }

    /// Pull the translated strings out of a generateContent response body.
    fn parse_response(&self, body: &str) -> Result<Vec<String>> {
        let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
            FarsubError::Api(format!("Failed to parse translation response: {}", e))
        })?;

        if let Some(error) = response.error {
            return Err(FarsubError::Api(format!("Gemini error: {}", error.message)));
        }

        let text = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(FarsubError::Api("Empty translation response".to_string()));
        }

        parse_translations(&text)
    }
}

/// Parse the model output as a JSON array of strings, tolerating a markdown code fence.
fn parse_translations(text: &str) -> Result<Vec<String>> {
    let mut json = text.trim();
    if let Some(rest) = json.strip_prefix("```") {
        let rest = rest.trim_start_matches("json");
        json = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    serde_json::from_str(json).map_err(|e| {
        FarsubError::Api(format!(
            "Translation response is not a JSON array of strings: {}",
            e
        ))
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Schema,
}

#[derive(Serialize)]
struct Schema {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Box<Schema>>,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate_batch(&self, texts: &[&str], api_key: &str) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Translating {} text(s) with {}", texts.len(), self.model);

        let request = self.build_request(texts)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                debug!("Retry attempt {} after {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .query(&[("key", api_key)])
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let body = resp.text().await.map_err(|e| e.without_url())?;
                        return self.parse_response(&body);
                    }

                    let error_body = resp.text().await.unwrap_or_default();

                    // Don't retry on client errors
                    if status.is_client_error() {
                        return Err(FarsubError::Api(format!(
                            "Translation API error ({}): {}",
                            status, error_body
                        )));
                    }

                    warn!("Gemini API server error ({}): {}", status, error_body);
                    last_error = Some(FarsubError::Api(format!(
                        "Translation API server error: {}",
                        status
                    )));
                }
                Err(e) => {
                    // The URL carries the API key
                    let e = e.without_url();
                    warn!("Translation request failed: {}", e);
                    last_error = Some(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FarsubError::Api("Unknown error".to_string())))
    }

    async fn validate_key(&self, api_key: &str) -> Result<bool> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", api_key)])
            .send()
            .await
            .map_err(|e| e.without_url())?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Ok(false)
            }
            status => Err(FarsubError::Api(format!(
                "Key validation failed with status {}",
                status
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_translator_creation() {
        let translator = GeminiTranslator::new();
        assert_eq!(translator.name(), "gemini");
        assert_eq!(translator.model(), "gemini-3-flash-preview");
    }

    #[test]
    fn test_with_model_and_base_url() {
        let translator = GeminiTranslator::new()
            .with_model("gemini-2.0-flash")
            .with_base_url("http://localhost:1234/");
        assert_eq!(translator.model(), "gemini-2.0-flash");
        assert_eq!(translator.base_url, "http://localhost:1234");
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let translator = GeminiTranslator::new();
        assert_eq!(translator.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(translator.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(translator.backoff_delay(4), Duration::from_secs(8));
        assert_eq!(translator.backoff_delay(40), MAX_RETRY_DELAY);
        assert_eq!(translator.backoff_delay(u32::MAX), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_system_instruction_examples() {
        assert!(SYSTEM_INSTRUCTION.contains(r#""Come on!" -> "بزن‌تالا!" یا "زود باش دیگه!""#));
        assert!(SYSTEM_INSTRUCTION.contains("Profanity is allowed"));
    }

    #[test]
    fn test_build_prompt_embeds_json_array() {
        let translator = GeminiTranslator::new();
        let prompt = translator.build_prompt(&["Hello", "Say \"hi\""]).unwrap();
        assert!(prompt.contains("colloquial Persian"));
        assert!(prompt.ends_with(r#"["Hello","Say \"hi\""]"#));
    }

    #[test]
    fn test_request_shape() {
        let translator = GeminiTranslator::new();
        let request = translator.build_request(&["Hello"]).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert_eq!(
            json["generationConfig"]["responseSchema"]["items"]["type"],
            "STRING"
        );
        assert_eq!(json["contents"][0]["role"], "user");
        assert!(json["systemInstruction"].get("role").is_none());
        assert!(json["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Colloquial Iranian Persian"));
    }

    #[test]
    fn test_parse_translations() {
        assert_eq!(
            parse_translations(r#"["سلام", "خداحافظ"]"#).unwrap(),
            vec!["سلام", "خداحافظ"]
        );
        assert_eq!(
            parse_translations("```json\n[\"سلام\"]\n```").unwrap(),
            vec!["سلام"]
        );
        assert!(parse_translations("not json").is_err());
        assert!(parse_translations(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn test_parse_response() {
        let translator = GeminiTranslator::new();
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"[\"سلام\"]"}]}}]}"#;
        assert_eq!(translator.parse_response(body).unwrap(), vec!["سلام"]);

        let error = r#"{"error":{"message":"quota exceeded"}}"#;
        let err = translator.parse_response(error).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        let empty = r#"{"candidates":[]}"#;
        assert!(translator.parse_response(empty).is_err());
    }
}
