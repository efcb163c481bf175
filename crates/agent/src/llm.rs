use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use foodlog_core::config::{LlmConfig, LlmProvider};
use foodlog_core::domain::food::FoodCandidate;
use foodlog_core::domain::intake::{FoodIntakeEvent, FoodIntakeItem};
use foodlog_core::domain::selection::FoodSelectionResult;
use foodlog_core::state::ChatMessage;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm request timed out after {0}s")]
    Timeout(u64),
    #[error("llm returned schema-invalid output: {0}")]
    SchemaInvalid(String),
}

/// The language-understanding and selection collaborator. Strictly a
/// translator between free text and the structured types the workflow
/// routes on; it never writes data and never decides routing itself.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Decompose the latest user message into a structured intake event,
    /// with quantities normalized to grams.
    async fn parse_intake(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<FoodIntakeEvent, LlmError>;

    /// Pick the best candidate for an item, or estimate per-100g macros
    /// when the candidate list is empty.
    async fn select_food(
        &self,
        item: &FoodIntakeItem,
        candidates: &[FoodCandidate],
    ) -> Result<FoodSelectionResult, LlmError>;

    /// Conversational reply for turns that carry no nutrition work.
    async fn small_talk(&self, history: &[ChatMessage]) -> Result<String, LlmError>;
}

const PARSER_PROMPT: &str = "\
You are the intake parser for a nutrition-tracking assistant. Classify the \
latest user message and reply with ONLY a JSON object, no prose.

Schema:
{
  \"action\": \"LOG_FOOD\" | \"QUERY_DAILY_STATS\" | \"CHITCHAT\" | \"CONFIRM_ESTIMATION\",
  \"items\": [{\"food_name\": string, \"amount_g\": number, \"unit\": \"g\", \"original_text\": string}],
  \"meal_type\": string | null,
  \"target_date\": \"YYYY-MM-DD\" | null,
  \"start_date\": \"YYYY-MM-DD\" | null,
  \"end_date\": \"YYYY-MM-DD\" | null,
  \"consumed_at\": RFC3339 timestamp | null
}

Rules:
- LOG_FOOD when the user reports eating something; extract every distinct \
food as its own item, in the order mentioned, with amounts converted to grams \
(estimate typical portions when unstated, e.g. one apple = 150g, one egg = 50g).
- food_name is a normalized database-friendly name; original_text preserves \
the user's wording.
- QUERY_DAILY_STATS for questions about what was eaten or totals; fill \
target_date, or start_date/end_date for ranges.
- CONFIRM_ESTIMATION only when the message is an explicit agreement to a \
pending estimate (\"yes\", \"log it\", \"sounds right\").
- CHITCHAT for everything else; items must be empty.";

const SELECTION_PROMPT: &str = "\
You select the best database match for one food item. Reply with ONLY a JSON \
object, no prose.

Schema:
{
  \"status\": \"SELECTED\" | \"NO_MATCH\" | \"ESTIMATED\",
  \"food_id\": number | null,
  \"confidence\": string,
  \"estimated\": {\"calories\": number, \"protein\": number, \"carbs\": number, \"fat\": number} | null
}

Rules:
- With candidates listed: return SELECTED with a food_id taken from the list, \
or NO_MATCH if none fits. Prefer whole/generic foods over processed ones, \
cooked over raw unless the user said raw, and the most common variant.
- With NO candidates listed: you MUST return ESTIMATED with per-100g macro \
values for the described food; never SELECTED or NO_MATCH.
- confidence is a one-sentence rationale.";

const SMALL_TALK_PROMPT: &str = "\
You are a friendly, concise nutrition coach. Answer the user's latest message \
in one or two sentences. Do not invent logged data.";

/// Chat-completions client for OpenAI-compatible endpoints (OpenAI, Ollama,
/// and Anthropic-compatible gateways). Transport failures are retried up to
/// `max_retries`; schema-invalid payloads are surfaced immediately.
pub struct HttpLlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let base_url = match (&config.base_url, config.provider) {
            (Some(url), _) => url.clone(),
            (None, LlmProvider::OpenAi) => "https://api.openai.com/v1".to_string(),
            (None, LlmProvider::Anthropic) => "https://api.anthropic.com/v1".to_string(),
            (None, LlmProvider::Ollama) => "http://localhost:11434/v1".to_string(),
        };
        let trimmed = base_url.trim_end_matches('/');
        let endpoint = if trimmed.ends_with("/v1") {
            format!("{trimmed}/chat/completions")
        } else {
            format!("{trimmed}/v1/chat/completions")
        };

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }

    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content},
            ],
        });

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            let mut request = self.http.post(&self.endpoint).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key.expose_secret());
            }

            match request.send().await {
                Ok(response) => {
                    let response = response
                        .error_for_status()
                        .map_err(|err| LlmError::Transport(err.to_string()))?;
                    let completion: ChatCompletion = response
                        .json()
                        .await
                        .map_err(|err| LlmError::SchemaInvalid(err.to_string()))?;
                    return completion
                        .choices
                        .into_iter()
                        .next()
                        .map(|choice| choice.message.content)
                        .ok_or_else(|| {
                            LlmError::SchemaInvalid("completion had no choices".to_string())
                        });
                }
                Err(error) if error.is_timeout() => {
                    return Err(LlmError::Timeout(self.timeout_secs));
                }
                Err(error) => {
                    last_error = error.to_string();
                    if attempt < self.max_retries {
                        warn!(
                            event_name = "llm.transport_retry",
                            attempt = attempt + 1,
                            "retrying llm request after transport failure: {last_error}"
                        );
                    }
                }
            }
        }

        Err(LlmError::Transport(last_error))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn parse_intake(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<FoodIntakeEvent, LlmError> {
        let mut content = render_transcript(history);
        content.push_str("Latest message: ");
        content.push_str(message);

        let raw = self.complete(PARSER_PROMPT, &content).await?;
        serde_json::from_str(extract_json(&raw))
            .map_err(|err| LlmError::SchemaInvalid(format!("intake event: {err}")))
    }

    async fn select_food(
        &self,
        item: &FoodIntakeItem,
        candidates: &[FoodCandidate],
    ) -> Result<FoodSelectionResult, LlmError> {
        let mut content = format!(
            "Food item: {} ({}g)\nUser wording: {}\n",
            item.food_name, item.amount_g, item.original_text
        );
        if candidates.is_empty() {
            content.push_str("Candidates: none\n");
        } else {
            content.push_str("Candidates:\n");
            for candidate in candidates {
                content.push_str(&format!("- id {}: {}\n", candidate.id.0, candidate.name));
            }
        }

        let raw = self.complete(SELECTION_PROMPT, &content).await?;
        serde_json::from_str(extract_json(&raw))
            .map_err(|err| LlmError::SchemaInvalid(format!("selection result: {err}")))
    }

    async fn small_talk(&self, history: &[ChatMessage]) -> Result<String, LlmError> {
        let content = render_transcript(history);
        self.complete(SMALL_TALK_PROMPT, &content).await
    }
}

fn render_transcript(history: &[ChatMessage]) -> String {
    let mut transcript = String::new();
    for message in history {
        let role = match message.role {
            foodlog_core::state::Role::User => "user",
            foodlog_core::state::Role::Assistant => "assistant",
        };
        transcript.push_str(&format!("{role}: {}\n", message.content));
    }
    transcript
}

/// Models sometimes wrap JSON replies in markdown fences despite the
/// instructions; accept both shapes.
fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use foodlog_core::config::{LlmConfig, LlmProvider};
    use foodlog_core::domain::intake::UserIntent;
    use foodlog_core::domain::selection::SelectionStatus;

    use super::{extract_json, HttpLlmClient};

    fn config(base_url: Option<&str>, provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: Some("sk-test".to_string().into()),
            base_url: base_url.map(str::to_string),
            model: "test-model".to_string(),
            timeout_secs: 5,
            max_retries: 1,
        }
    }

    #[test]
    fn endpoint_joins_v1_exactly_once() {
        let with_v1 = HttpLlmClient::from_config(&config(
            Some("http://localhost:11434/v1"),
            LlmProvider::Ollama,
        ))
        .expect("client");
        assert_eq!(with_v1.endpoint, "http://localhost:11434/v1/chat/completions");

        let without_v1 = HttpLlmClient::from_config(&config(
            Some("http://localhost:11434/"),
            LlmProvider::Ollama,
        ))
        .expect("client");
        assert_eq!(without_v1.endpoint, "http://localhost:11434/v1/chat/completions");

        let openai =
            HttpLlmClient::from_config(&config(None, LlmProvider::OpenAi)).expect("client");
        assert_eq!(openai.endpoint, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn extract_json_unwraps_markdown_fences() {
        assert_eq!(extract_json("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn wire_payloads_deserialize_into_domain_types() {
        let event: foodlog_core::domain::intake::FoodIntakeEvent = serde_json::from_str(
            extract_json(
                r#"```json
{"action": "LOG_FOOD", "items": [{"food_name": "chicken breast", "amount_g": 200.0, "unit": "g", "original_text": "200g of chicken breast"}], "meal_type": null, "target_date": null, "start_date": null, "end_date": null, "consumed_at": null}
```"#,
            ),
        )
        .expect("intake event parses");
        assert_eq!(event.action, UserIntent::LogFood);
        assert_eq!(event.items[0].amount_g, 200.0);

        let selection: foodlog_core::domain::selection::FoodSelectionResult =
            serde_json::from_str(
                r#"{"status": "ESTIMATED", "food_id": null, "confidence": "no database entry", "estimated": {"calories": 250, "protein": 26, "carbs": 0, "fat": 15}}"#,
            )
            .expect("selection parses");
        assert_eq!(selection.status, SelectionStatus::Estimated);
        assert!(selection.estimated.is_some());
    }
}
