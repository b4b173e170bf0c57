use std::sync::Arc;

use async_trait::async_trait;

use crate::action_registry::Action;
use crate::cdcarm_catalog::CdcarmCatalog;
use crate::cdcarm_resolver::{
    resolve_cdcarm_parameters, InvestigationStatus, StoredSlots, TurnOverrides,
};
use crate::cdcarm_response::{
    render_cdcarm_url_message, render_open_url_instructions, NO_GENERATED_URL_MESSAGE,
};
use crate::cdcarm_url::build_cdcarm_url;
use crate::conversation::{ActionResponse, ConversationEvent, Tracker, SLOT_GENERATED_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdcarmUrlMode {
    /// Report flag comes from the entity, then the slot, then the default.
    FromConversation,
    ForceWithReport,
    ForceWithoutReport,
}

impl CdcarmUrlMode {
    fn action_name(self) -> &'static str {
        match self {
            Self::FromConversation => "action_generate_cdcarm_url",
            Self::ForceWithReport => "action_get_cdcarm_url_with_report",
            Self::ForceWithoutReport => "action_get_cdcarm_url_without_report",
        }
    }

    fn forced_status(self) -> Option<InvestigationStatus> {
        match self {
            Self::FromConversation => None,
            Self::ForceWithReport => Some(InvestigationStatus::HasInvestigation),
            Self::ForceWithoutReport => Some(InvestigationStatus::NoInvestigation),
        }
    }
}

pub struct CdcarmUrlAction {
    catalog: Arc<CdcarmCatalog>,
    mode: CdcarmUrlMode,
}

impl CdcarmUrlAction {
    pub fn new(catalog: Arc<CdcarmCatalog>, mode: CdcarmUrlMode) -> Self {
        Self { catalog, mode }
    }

    pub fn respond(&self, tracker: &Tracker) -> ActionResponse {
        let overrides = TurnOverrides::from_tracker(tracker);
        let slots = StoredSlots::from_tracker(tracker);
        let mut params = resolve_cdcarm_parameters(&self.catalog, &slots, &overrides);
        if let Some(status) = self.mode.forced_status() {
            params.investigation_status = status;
        }

        let url = build_cdcarm_url(&self.catalog.dashboard_origin, &params);
        let text = render_cdcarm_url_message(
            params.investigation_status.has_report(),
            &overrides,
            &url,
        );
        ActionResponse::message(text).with_event(ConversationEvent::slot_set(SLOT_GENERATED_URL, url))
    }
}

#[async_trait]
impl Action for CdcarmUrlAction {
    fn name(&self) -> &'static str {
        self.mode.action_name()
    }

    async fn run(&self, tracker: &Tracker) -> ActionResponse {
        self.respond(tracker)
    }
}

/// Follow-up explaining how to open the last generated URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCdcarmUrlAction;

#[async_trait]
impl Action for OpenCdcarmUrlAction {
    fn name(&self) -> &'static str {
        "action_open_cdcarm_url"
    }

    async fn run(&self, tracker: &Tracker) -> ActionResponse {
        match tracker.slot_text(SLOT_GENERATED_URL) {
            Some(_) => ActionResponse::message(render_open_url_instructions()),
            None => ActionResponse::message(NO_GENERATED_URL_MESSAGE),
        }
    }
}
