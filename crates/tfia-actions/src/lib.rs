//! Chatbot actions for CDCARM report links and uploaded test-failure analysis.

pub mod action_registry;
pub mod cause_prediction;
pub mod cdcarm_actions;
pub mod cdcarm_catalog;
pub mod cdcarm_resolver;
pub mod cdcarm_response;
pub mod cdcarm_url;
pub mod conversation;
pub mod failure_actions;
pub mod failure_analysis;
pub mod failure_table;

pub use action_registry::{
    default_action_registry, Action, ActionDependencies, ActionRegistry, UnknownAction,
};
pub use cause_prediction::{
    CausePredictor, FailurePrompt, LlmCausePredictor, Prediction, PredictionParser,
    DEFAULT_PREDICTION_MAX_TOKENS, DEFAULT_PREDICTION_TEMPERATURE,
};
pub use cdcarm_actions::{CdcarmUrlAction, CdcarmUrlMode, OpenCdcarmUrlAction};
pub use cdcarm_catalog::CdcarmCatalog;
pub use cdcarm_resolver::{
    resolve_cdcarm_parameters, InvestigationStatus, ResolvedParameters, StoredSlots,
    TurnOverrides,
};
pub use cdcarm_url::build_cdcarm_url;
pub use conversation::{
    ActionCall, ActionResponse, BotMessage, ConversationEvent, ExtractedEntity, Tracker,
};
pub use failure_analysis::{AnalysisResult, FailureAnalyzer, PatternFailureAnalyzer};
pub use failure_table::{load_failure_table, FailureTable, TableLoadError};
