//! Language-model client surface used by the failure-cause predictor.
mod openai;
mod retry;
mod types;

pub use openai::{OpenAiAuthScheme, OpenAiClient, OpenAiConfig};
pub use types::{ChatRequest, ChatResponse, ChatUsage, LlmClient, Message, MessageRole, TfiaAiError};
