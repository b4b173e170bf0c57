//! Named actions invoked by the dialogue engine, and the registry that
//! dispatches to them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::cause_prediction::CausePredictor;
use crate::cdcarm_actions::{CdcarmUrlAction, CdcarmUrlMode, OpenCdcarmUrlAction};
use crate::cdcarm_catalog::CdcarmCatalog;
use crate::conversation::{ActionCall, ActionResponse, BotMessage, ConversationEvent, Tracker};
use crate::failure_actions::{
    AnalyzeFailureAction, AnalyzeTestFailuresAction, ExplainPredictionAction,
    PredictFailureCauseAction,
};
use crate::failure_analysis::{FailureAnalyzer, PatternFailureAnalyzer};

/// One named step the dialogue engine can ask the server to run.
///
/// Actions never fail: missing or malformed input ends in a chat message.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, tracker: &Tracker) -> ActionResponse;
}

impl ActionResponse {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            events: Vec::new(),
            responses: vec![BotMessage { text: text.into() }],
        }
    }

    pub fn with_event(mut self, event: ConversationEvent) -> Self {
        self.events.push(event);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no registered action named '{action_name}'")]
pub struct UnknownAction {
    pub action_name: String,
}

#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action; returns true when it replaced one of the same name.
    pub fn register<A>(&mut self, action: A) -> bool
    where
        A: Action + 'static,
    {
        self.actions
            .insert(action.name().to_string(), Arc::new(action))
            .is_some()
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Returns sorted registered action names.
    pub fn registered_action_names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    pub async fn dispatch(&self, call: &ActionCall) -> Result<ActionResponse, UnknownAction> {
        let action = self
            .actions
            .get(call.next_action.as_str())
            .ok_or_else(|| UnknownAction {
                action_name: call.next_action.clone(),
            })?;
        let response = action.run(&call.tracker).await;
        info!(
            action = %call.next_action,
            sender = call.sender_id.as_deref().unwrap_or(""),
            events = response.events.len(),
            responses = response.responses.len(),
            "action completed"
        );
        Ok(response)
    }
}

/// Shared immutable collaborators handed to every action.
#[derive(Clone)]
pub struct ActionDependencies {
    pub catalog: Arc<CdcarmCatalog>,
    pub analyzer: Arc<dyn FailureAnalyzer>,
    pub predictor: Option<Arc<dyn CausePredictor>>,
}

impl ActionDependencies {
    pub fn new(catalog: CdcarmCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            analyzer: Arc::new(PatternFailureAnalyzer),
            predictor: None,
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn CausePredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }
}

pub fn default_action_registry(dependencies: &ActionDependencies) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    for mode in [
        CdcarmUrlMode::FromConversation,
        CdcarmUrlMode::ForceWithReport,
        CdcarmUrlMode::ForceWithoutReport,
    ] {
        registry.register(CdcarmUrlAction::new(Arc::clone(&dependencies.catalog), mode));
    }
    registry.register(OpenCdcarmUrlAction);
    registry.register(AnalyzeTestFailuresAction::new(Arc::clone(
        &dependencies.analyzer,
    )));
    registry.register(AnalyzeFailureAction);
    registry.register(PredictFailureCauseAction::new(dependencies.predictor.clone()));
    registry.register(ExplainPredictionAction);
    registry
}
