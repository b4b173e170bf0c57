//! Dialogue-engine wire types: the tracker snapshot an action receives and
//! the events/responses it hands back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SLOT_CDCARM_OWNER: &str = "cdcarm_owner";
pub const SLOT_PLATFORM_ID: &str = "platform_id";
pub const SLOT_RELEASE_ID: &str = "release_id";
pub const SLOT_APPLICATION_ID: &str = "application_id";
pub const SLOT_WITH_INVESTIGATION_REPORT: &str = "with_investigation_report";
pub const SLOT_GENERATED_URL: &str = "generated_url";
pub const SLOT_UPLOADED_FILE_PATH: &str = "uploaded_file_path";
pub const SLOT_ANALYSIS_RESULTS: &str = "analysis_results";

pub const ENTITY_CDCARM_OWNER: &str = "cdcarm_owner";
pub const ENTITY_PLATFORM: &str = "platform";
pub const ENTITY_RELEASE: &str = "release";
pub const ENTITY_REPORT_TYPE: &str = "report_type";
pub const ENTITY_TEST_ID: &str = "test_id";

/// Request body posted by the dialogue engine when it wants an action run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCall {
    pub next_action: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub domain: Value,
    #[serde(default)]
    pub version: Option<String>,
}

/// Snapshot of one conversation: persisted slots plus the latest user message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tracker {
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub slots: BTreeMap<String, Value>,
    #[serde(default)]
    pub latest_message: LatestMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub intent: Option<IntentRef>,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Entity recognized in the current utterance. Valid for one turn only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub entity: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl ExtractedEntity {
    pub fn new(entity: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            value: Value::String(value.into()),
            start: None,
            end: None,
        }
    }
}

impl Tracker {
    pub fn with_slot(mut self, name: &str, value: Value) -> Self {
        self.slots.insert(name.to_string(), value);
        self
    }

    pub fn with_entity(mut self, entity: &str, value: &str) -> Self {
        self.latest_message
            .entities
            .push(ExtractedEntity::new(entity, value));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.latest_message.text = Some(text.to_string());
        self
    }

    /// Returns the raw slot value, treating JSON `null` as unset.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|value| !value.is_null())
    }

    /// Returns a slot rendered as text. Empty strings count as unset.
    pub fn slot_text(&self, name: &str) -> Option<String> {
        self.slot(name).and_then(scalar_text)
    }

    /// Returns a boolean slot. Accepts JSON booleans and `"true"`/`"false"` strings.
    pub fn slot_flag(&self, name: &str) -> Option<bool> {
        match self.slot(name)? {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// First non-empty value of the named entity in the latest message.
    pub fn latest_entity_value(&self, entity: &str) -> Option<String> {
        self.latest_message
            .entities
            .iter()
            .filter(|candidate| candidate.entity == entity)
            .find_map(|candidate| scalar_text(&candidate.value))
    }

    pub fn latest_text(&self) -> Option<&str> {
        self.latest_message
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// State update returned to the dialogue engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConversationEvent {
    #[serde(rename = "slot")]
    SlotSet { name: String, value: Value },
}

impl ConversationEvent {
    pub fn slot_set(name: &str, value: impl Into<Value>) -> Self {
        Self::SlotSet {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Outgoing chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotMessage {
    pub text: String,
}

/// Response body returned to the dialogue engine for one action run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub events: Vec<ConversationEvent>,
    pub responses: Vec<BotMessage>,
}
