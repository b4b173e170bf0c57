//! Actions over uploaded test results: table analysis, per-test detail and
//! model-backed cause prediction.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::action_registry::Action;
use crate::cause_prediction::{render_prediction, CausePredictor, FailurePrompt};
use crate::conversation::{
    ActionResponse, ConversationEvent, Tracker, ENTITY_TEST_ID, SLOT_ANALYSIS_RESULTS,
    SLOT_UPLOADED_FILE_PATH,
};
use crate::failure_analysis::{
    render_analysis_summary, render_failure_detail, AnalysisResult, FailureAnalyzer,
};
use crate::failure_table::load_failure_table;

pub const NO_UPLOADED_FILE_MESSAGE: &str =
    "I couldn't find the uploaded file. Please upload a CSV or Excel file with test failure data.";
pub const NO_TEST_ID_MESSAGE: &str =
    "I couldn't identify which test you're asking about. Please provide a test ID like T-1234.";
pub const NO_ANALYSIS_MESSAGE: &str =
    "I don't have any analysis data yet. Please upload a test results file first.";
pub const PREDICTOR_UNAVAILABLE_MESSAGE: &str =
    "Failure cause prediction is not configured on this server.";

const PREDICTION_EXPLANATION: &str = "Our test failure prediction system works by analyzing patterns in historical test failures and correlating them with code changes.

**How it works:**

1. **Historical Data Analysis**: We analyze past test failures to identify patterns and common failure modes.

2. **Code Change Analysis**: We examine the current code changes to identify what areas of the codebase are being modified.

3. **Correlation**: We correlate these code changes with the historical failure patterns.

4. **Risk Assessment**: We calculate the likelihood of each test failing based on:
   - Similarity to past failure scenarios
   - Areas of code affected by current changes
   - Test coverage metrics
   - Developer history with similar changes

The system continually improves as it learns from new test results, making its predictions more accurate over time.

Would you like to know more about a specific aspect of the prediction system?";

fn not_found_message(test_id: &str) -> String {
    format!("I couldn't find test {test_id} in the analysis results.")
}

/// Reads the stored analysis; the slot may hold the object or its JSON text.
fn stored_analysis(tracker: &Tracker) -> Option<AnalysisResult> {
    let value = tracker.slot(SLOT_ANALYSIS_RESULTS)?;
    let parsed = match value {
        Value::String(raw) => serde_json::from_str::<AnalysisResult>(raw),
        other => serde_json::from_value::<AnalysisResult>(other.clone()),
    };
    match parsed {
        Ok(analysis) => Some(analysis),
        Err(error) => {
            warn!(%error, "stored analysis results are unreadable");
            None
        }
    }
}

pub struct AnalyzeTestFailuresAction {
    analyzer: Arc<dyn FailureAnalyzer>,
}

impl AnalyzeTestFailuresAction {
    pub fn new(analyzer: Arc<dyn FailureAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl Action for AnalyzeTestFailuresAction {
    fn name(&self) -> &'static str {
        "action_analyze_test_failures"
    }

    async fn run(&self, tracker: &Tracker) -> ActionResponse {
        let Some(path) = tracker.slot_text(SLOT_UPLOADED_FILE_PATH).map(PathBuf::from) else {
            return ActionResponse::message(NO_UPLOADED_FILE_MESSAGE);
        };
        if !path.is_file() {
            warn!(path = %path.display(), "uploaded file is missing");
            return ActionResponse::message(NO_UPLOADED_FILE_MESSAGE);
        }

        let analyzer = Arc::clone(&self.analyzer);
        let load_path = path.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            load_failure_table(&load_path)
                .map(|table| analyzer.analyze(&table))
                .map_err(|error| error.to_string())
        })
        .await
        .unwrap_or_else(|error| Err(error.to_string()));

        let analysis = match outcome {
            Ok(analysis) => analysis,
            Err(reason) => {
                warn!(path = %path.display(), %reason, "failed to analyze uploaded file");
                return ActionResponse::message(format!("Error analyzing the file: {reason}"));
            }
        };
        info!(
            path = %path.display(),
            total_tests = analysis.total_tests,
            failures = analysis.failure_count,
            "analyzed uploaded test results"
        );

        let summary = render_analysis_summary(&analysis);
        match serde_json::to_value(&analysis) {
            Ok(stored) => ActionResponse::message(summary)
                .with_event(ConversationEvent::slot_set(SLOT_ANALYSIS_RESULTS, stored)),
            Err(error) => ActionResponse::message(format!("Error analyzing the file: {error}")),
        }
    }
}

/// Detail for one test taken from the stored analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeFailureAction;

#[async_trait]
impl Action for AnalyzeFailureAction {
    fn name(&self) -> &'static str {
        "action_analyze_failure"
    }

    async fn run(&self, tracker: &Tracker) -> ActionResponse {
        let Some(test_id) = tracker.latest_entity_value(ENTITY_TEST_ID) else {
            return ActionResponse::message(NO_TEST_ID_MESSAGE);
        };
        let Some(analysis) = stored_analysis(tracker) else {
            return ActionResponse::message(NO_ANALYSIS_MESSAGE);
        };
        match analysis.find_test(&test_id) {
            Some((group, record)) => {
                ActionResponse::message(render_failure_detail(&test_id, group, record))
            }
            None => ActionResponse::message(not_found_message(&test_id)),
        }
    }
}

pub struct PredictFailureCauseAction {
    predictor: Option<Arc<dyn CausePredictor>>,
}

impl PredictFailureCauseAction {
    pub fn new(predictor: Option<Arc<dyn CausePredictor>>) -> Self {
        Self { predictor }
    }
}

#[async_trait]
impl Action for PredictFailureCauseAction {
    fn name(&self) -> &'static str {
        "action_predict_failure_cause"
    }

    async fn run(&self, tracker: &Tracker) -> ActionResponse {
        let Some(predictor) = self.predictor.as_ref() else {
            return ActionResponse::message(PREDICTOR_UNAVAILABLE_MESSAGE);
        };
        let test_id = tracker.latest_entity_value(ENTITY_TEST_ID);
        let from_analysis = test_id.as_deref().and_then(|test_id| {
            stored_analysis(tracker).and_then(|analysis| {
                analysis
                    .find_test(test_id)
                    .map(|(group, record)| FailurePrompt::from_failure(group, record))
            })
        });
        let prompt = match (from_analysis, tracker.latest_text()) {
            (Some(prompt), _) => prompt,
            (None, Some(text)) => FailurePrompt::from_utterance(test_id, text),
            (None, None) => match test_id {
                Some(test_id) => return ActionResponse::message(not_found_message(&test_id)),
                None => return ActionResponse::message(NO_TEST_ID_MESSAGE),
            },
        };

        let prediction = predictor.predict(&prompt).await;
        ActionResponse::message(render_prediction(&prompt, &prediction))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExplainPredictionAction;

#[async_trait]
impl Action for ExplainPredictionAction {
    fn name(&self) -> &'static str {
        "action_explain_prediction"
    }

    async fn run(&self, _tracker: &Tracker) -> ActionResponse {
        ActionResponse::message(PREDICTION_EXPLANATION)
    }
}
