//! Language-model diagnosis of a single test failure.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tfia_ai::{ChatRequest, LlmClient, Message};
use tracing::{info, warn};

use crate::failure_analysis::ErrorGroup;
use crate::failure_table::FailureRecord;

pub const DEFAULT_PREDICTION_MAX_TOKENS: u32 = 300;
pub const DEFAULT_PREDICTION_TEMPERATURE: f32 = 0.7;

const UNKNOWN_FIELD: &str = "Unknown";
const NO_SUGGESTION: &str = "No suggestion available";
const SYSTEM_PROMPT: &str =
    "You analyze failing automated tests and answer in the numbered format requested.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePrompt {
    pub test_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl FailurePrompt {
    pub fn from_failure(group: &ErrorGroup, record: &FailureRecord) -> Self {
        Self {
            test_id: Some(record.test.clone()),
            title: Some(record.test.clone()),
            description: Some(format!(
                "Failure pattern '{}' shared by {} test(s), owned by {}",
                group.pattern,
                group.count,
                if record.owner.is_empty() {
                    "nobody"
                } else {
                    record.owner.as_str()
                }
            )),
            error: Some(group.pattern.clone()),
            logs: record
                .error_message
                .lines()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn from_utterance(test_id: Option<String>, text: &str) -> Self {
        Self {
            test_id,
            title: None,
            description: Some(text.to_string()),
            error: None,
            logs: Vec::new(),
        }
    }

    pub fn display_id(&self) -> &str {
        self.test_id.as_deref().unwrap_or("the described failure")
    }

    pub fn render(&self) -> String {
        let field = |value: &Option<String>| -> String {
            value
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or(UNKNOWN_FIELD)
                .to_string()
        };
        format!(
            "Test ID: {}\nTest Title: {}\nDescription: {}\nError: {}\n\nLogs:\n{}\n\n\
Analyze the test failure above and provide:\n\
1. Likely cause of the failure:\n\
2. Confidence level (0-100):\n\
3. Suggested actions to fix:\n\
4. Similar previous cases:\n",
            field(&self.test_id),
            field(&self.title),
            field(&self.description),
            field(&self.error),
            self.logs.join("\n"),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub cause: String,
    pub confidence: u8,
    pub suggestion: String,
    pub similar_cases: Vec<String>,
}

impl Prediction {
    pub fn unavailable() -> Self {
        Self {
            cause: UNKNOWN_FIELD.to_string(),
            confidence: 0,
            suggestion: NO_SUGGESTION.to_string(),
            similar_cases: Vec::new(),
        }
    }

    /// Parses free text. Any section that cannot be found keeps its placeholder.
    pub fn parse(response: &str) -> Self {
        match PredictionParser::new() {
            Ok(parser) => parser.parse(response),
            Err(error) => {
                warn!(%error, "prediction parser unavailable");
                Self::unavailable()
            }
        }
    }
}

/// Extracts the four numbered sections from generated text.
#[derive(Debug, Clone)]
pub struct PredictionParser {
    cause: Regex,
    confidence: Regex,
    suggestion: Regex,
    similar_cases: Regex,
}

impl PredictionParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            cause: Regex::new(r"(?is)1\.\s*Likely cause[^:]*:(.*?)(?:\n\s*2\.|\z)")?,
            confidence: Regex::new(r"(?is)2\.\s*Confidence level[^:]*:\D*?(\d+)")?,
            suggestion: Regex::new(r"(?is)3\.\s*Suggested actions[^:]*:(.*?)(?:\n\s*4\.|\z)")?,
            similar_cases: Regex::new(r"(?is)4\.\s*Similar previous cases[^:]*:(.*)\z")?,
        })
    }

    pub fn parse(&self, response: &str) -> Prediction {
        let mut prediction = Prediction::unavailable();
        let section = |regex: &Regex| -> Option<String> {
            regex
                .captures(response)
                .and_then(|captures| captures.get(1))
                .map(|matched| matched.as_str().trim().to_string())
                .filter(|text| !text.is_empty())
        };

        if let Some(cause) = section(&self.cause) {
            prediction.cause = cause;
        }
        if let Some(confidence) = section(&self.confidence) {
            prediction.confidence = saturating_percent(&confidence);
        }
        if let Some(suggestion) = section(&self.suggestion) {
            prediction.suggestion = suggestion;
        }
        if let Some(cases) = section(&self.similar_cases) {
            prediction.similar_cases = cases
                .lines()
                .map(|line| {
                    line.trim()
                        .trim_start_matches(['-', '*', '•'])
                        .trim()
                        .to_string()
                })
                .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case("none"))
                .collect();
        }
        prediction
    }
}

/// Clamps a run of ASCII digits to 0..=100 without overflowing.
fn saturating_percent(digits: &str) -> u8 {
    let significant = digits.trim_start_matches('0');
    if significant.len() > 3 {
        return 100;
    }
    significant.parse::<u16>().unwrap_or(0).min(100) as u8
}

/// Capability seam for whatever produces a diagnosis from a prompt.
#[async_trait]
pub trait CausePredictor: Send + Sync {
    async fn predict(&self, prompt: &FailurePrompt) -> Prediction;
}

/// Sends the rendered prompt to a chat-completions model.
pub struct LlmCausePredictor {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    parser: PredictionParser,
}

impl LlmCausePredictor {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Self> {
        Ok(Self {
            client,
            model: model.into(),
            max_tokens,
            temperature,
            parser: PredictionParser::new().context("failed to compile prediction parser")?,
        })
    }
}

#[async_trait]
impl CausePredictor for LlmCausePredictor {
    async fn predict(&self, prompt: &FailurePrompt) -> Prediction {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(prompt.render())],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        };
        match self.client.complete(request).await {
            Ok(response) => {
                info!(
                    model = %self.model,
                    output_tokens = response.usage.output_tokens,
                    "failure cause prediction completed"
                );
                self.parser.parse(response.message.text_content())
            }
            Err(error) => {
                warn!(model = %self.model, %error, "failure cause prediction failed");
                Prediction::unavailable()
            }
        }
    }
}

pub fn render_prediction(prompt: &FailurePrompt, prediction: &Prediction) -> String {
    let mut response = format!("**Predicted cause for {}**\n\n", prompt.display_id());
    response.push_str(&format!("Likely cause: {}\n", prediction.cause));
    response.push_str(&format!("Confidence: {}%\n", prediction.confidence));
    response.push_str(&format!("Suggested actions: {}\n", prediction.suggestion));
    if prediction.similar_cases.is_empty() {
        response.push_str("Similar previous cases: none found\n");
    } else {
        response.push_str("Similar previous cases:\n");
        for case in &prediction.similar_cases {
            response.push_str(&format!("- {case}\n"));
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tfia_ai::{ChatResponse, ChatUsage, TfiaAiError};

    use super::*;

    struct ScriptedClient {
        reply: Result<String, u16>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, TfiaAiError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            match &self.reply {
                Ok(text) => Ok(ChatResponse {
                    message: Message::assistant_text(text.clone()),
                    finish_reason: Some("stop".to_string()),
                    usage: ChatUsage::default(),
                }),
                Err(status) => Err(TfiaAiError::HttpStatus {
                    status: *status,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    const WELL_FORMED: &str = "1. Likely cause of the failure: The solver license server timed out.\n\
2. Confidence level (0-100): 85\n\
3. Suggested actions to fix: Retry with a longer license timeout.\n\
4. Similar previous cases:\n- T-1002\n- T-1010\n";

    #[test]
    fn parses_all_four_sections() {
        let prediction = Prediction::parse(WELL_FORMED);
        assert_eq!(prediction.cause, "The solver license server timed out.");
        assert_eq!(prediction.confidence, 85);
        assert_eq!(prediction.suggestion, "Retry with a longer license timeout.");
        assert_eq!(prediction.similar_cases, vec!["T-1002", "T-1010"]);
    }

    #[test]
    fn unparseable_output_defaults_every_field() {
        assert_eq!(
            Prediction::parse("I am not sure what happened."),
            Prediction::unavailable()
        );
    }

    #[test]
    fn confidence_is_clamped_and_partial_sections_survive() {
        let prediction = Prediction::parse(
            "2. Confidence level: 250 percent\n3. Suggested actions: rerun the job",
        );
        assert_eq!(prediction.cause, "Unknown");
        assert_eq!(prediction.confidence, 100);
        assert_eq!(prediction.suggestion, "rerun the job");
        assert!(prediction.similar_cases.is_empty());
    }

    #[test]
    fn overlong_confidence_saturates_at_one_hundred() {
        let prediction = Prediction::parse("2. Confidence level (0-100): 99999999999");
        assert_eq!(prediction.confidence, 100);
        assert_eq!(Prediction::parse("2. Confidence level: 0007").confidence, 7);
        assert_eq!(Prediction::parse("2. Confidence level: 000").confidence, 0);
    }

    #[test]
    fn prompt_renders_placeholders_and_section_requests() {
        let prompt = FailurePrompt {
            test_id: Some("T-1234".to_string()),
            logs: vec!["line one".to_string(), "line two".to_string()],
            ..FailurePrompt::default()
        };
        let rendered = prompt.render();
        assert!(rendered.starts_with("Test ID: T-1234\nTest Title: Unknown\n"));
        assert!(rendered.contains("Logs:\nline one\nline two\n"));
        assert!(rendered.ends_with("4. Similar previous cases:\n"));
    }

    #[tokio::test]
    async fn llm_predictor_sends_prompt_and_parses_reply() {
        let client = Arc::new(ScriptedClient {
            reply: Ok(WELL_FORMED.to_string()),
            requests: Mutex::new(Vec::new()),
        });
        let predictor = LlmCausePredictor::new(client.clone(), "diagnoser", 300, 0.7)
            .expect("predictor");
        let prompt = FailurePrompt::from_utterance(Some("T-7".to_string()), "solver hangs");
        let prediction = predictor.predict(&prompt).await;

        assert_eq!(prediction.confidence, 85);
        let requests = client.requests.lock().expect("requests");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "diagnoser");
        assert_eq!(requests[0].max_tokens, Some(300));
        assert!(requests[0].messages[1].content.contains("Description: solver hangs"));
    }

    #[tokio::test]
    async fn llm_predictor_degrades_on_provider_error() {
        let client = Arc::new(ScriptedClient {
            reply: Err(503),
            requests: Mutex::new(Vec::new()),
        });
        let predictor = LlmCausePredictor::new(client, "diagnoser", 300, 0.7).expect("predictor");
        let prediction = predictor
            .predict(&FailurePrompt::from_utterance(None, "crash"))
            .await;
        assert_eq!(prediction, Prediction::unavailable());
    }

    #[test]
    fn rendering_lists_similar_cases() {
        let prompt = FailurePrompt::from_utterance(Some("T-7".to_string()), "x");
        let text = render_prediction(&prompt, &Prediction::parse(WELL_FORMED));
        assert!(text.starts_with("**Predicted cause for T-7**"));
        assert!(text.contains("Confidence: 85%"));
        assert!(text.contains("- T-1010\n"));

        let fallback = render_prediction(
            &FailurePrompt::from_utterance(None, "x"),
            &Prediction::unavailable(),
        );
        assert!(fallback.contains("the described failure"));
        assert!(fallback.contains("Similar previous cases: none found"));
    }
}
