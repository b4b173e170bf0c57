//! Merges stored slots with the current turn's entities into the parameter
//! set the CDCARM URL is rendered from.

use tracing::debug;

use crate::cdcarm_catalog::CdcarmCatalog;
use crate::conversation::{
    Tracker, ENTITY_CDCARM_OWNER, ENTITY_PLATFORM, ENTITY_RELEASE, ENTITY_REPORT_TYPE,
    SLOT_APPLICATION_ID, SLOT_CDCARM_OWNER, SLOT_PLATFORM_ID, SLOT_RELEASE_ID,
    SLOT_WITH_INVESTIGATION_REPORT,
};

const REPORT_TYPE_WITHOUT: &str = "without";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestigationStatus {
    HasInvestigation,
    NoInvestigation,
}

impl InvestigationStatus {
    pub fn from_report_flag(with_report: bool) -> Self {
        if with_report {
            Self::HasInvestigation
        } else {
            Self::NoInvestigation
        }
    }

    pub fn has_report(self) -> bool {
        matches!(self, Self::HasInvestigation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HasInvestigation => "HAS_INVESTIGATION",
            Self::NoInvestigation => "NO_INVESTIGATION",
        }
    }
}

/// Values extracted from the current utterance, before any mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOverrides {
    pub owner: Option<String>,
    pub platform: Option<String>,
    pub release: Option<String>,
    pub report_type: Option<String>,
}

impl TurnOverrides {
    pub fn from_tracker(tracker: &Tracker) -> Self {
        Self {
            owner: tracker.latest_entity_value(ENTITY_CDCARM_OWNER),
            platform: tracker.latest_entity_value(ENTITY_PLATFORM),
            release: tracker.latest_entity_value(ENTITY_RELEASE),
            report_type: tracker.latest_entity_value(ENTITY_REPORT_TYPE),
        }
    }
}

/// Values persisted in conversation state from earlier turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSlots {
    pub owner: Option<String>,
    pub platform_id: Option<String>,
    pub release_id: Option<String>,
    pub application_id: Option<String>,
    pub with_report: Option<bool>,
}

impl StoredSlots {
    pub fn from_tracker(tracker: &Tracker) -> Self {
        Self {
            owner: tracker.slot_text(SLOT_CDCARM_OWNER),
            platform_id: tracker.slot_text(SLOT_PLATFORM_ID),
            release_id: tracker.slot_text(SLOT_RELEASE_ID),
            application_id: tracker.slot_text(SLOT_APPLICATION_ID),
            with_report: tracker.slot_flag(SLOT_WITH_INVESTIGATION_REPORT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParameters {
    pub investigation_status: InvestigationStatus,
    pub owner: Option<String>,
    pub platform_id: String,
    pub release_id: String,
    pub application_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolutionTier {
    Entity,
    Slot,
    Default,
    Absent,
}

/// Entity override beats stored slot; `None` when neither is present.
fn resolve_optional(
    field: &'static str,
    entity: Option<String>,
    slot: Option<String>,
) -> Option<String> {
    let (tier, value) = match (entity, slot) {
        (Some(value), _) => (ResolutionTier::Entity, Some(value)),
        (None, Some(value)) => (ResolutionTier::Slot, Some(value)),
        (None, None) => (ResolutionTier::Absent, None),
    };
    debug!(field, ?tier, value = value.as_deref().unwrap_or(""), "resolved cdcarm parameter");
    value
}

/// Entity override beats stored slot beats `default`.
fn resolve_with_default(
    field: &'static str,
    entity: Option<String>,
    slot: Option<String>,
    default: &str,
) -> String {
    let (tier, value) = match (entity, slot) {
        (Some(value), _) => (ResolutionTier::Entity, value),
        (None, Some(value)) => (ResolutionTier::Slot, value),
        (None, None) => (ResolutionTier::Default, default.to_string()),
    };
    debug!(field, ?tier, value = value.as_str(), "resolved cdcarm parameter");
    value
}

/// `"without"` (any case) disables the report; every other value enables it.
pub fn report_flag_from_entity(value: &str) -> bool {
    value.trim().to_lowercase() != REPORT_TYPE_WITHOUT
}

/// Computes the effective parameters for this turn. Never fails: absent or
/// unrecognized inputs degrade to catalog defaults.
pub fn resolve_cdcarm_parameters(
    catalog: &CdcarmCatalog,
    slots: &StoredSlots,
    overrides: &TurnOverrides,
) -> ResolvedParameters {
    let owner = resolve_optional("owner", overrides.owner.clone(), slots.owner.clone());
    let platform_id = resolve_with_default(
        "platform_id",
        overrides
            .platform
            .as_deref()
            .map(|name| catalog.platform_id_for(name)),
        slots.platform_id.clone(),
        &catalog.default_platform_id,
    );
    let release_id = resolve_with_default(
        "release_id",
        overrides
            .release
            .as_deref()
            .map(|name| catalog.release_id_for(name)),
        slots.release_id.clone(),
        &catalog.default_release_id,
    );
    let application_id = resolve_with_default(
        "application_id",
        None,
        slots.application_id.clone(),
        &catalog.default_application_id,
    );

    let with_report = overrides
        .report_type
        .as_deref()
        .map(report_flag_from_entity)
        .or(slots.with_report)
        .unwrap_or(true);

    ResolvedParameters {
        investigation_status: InvestigationStatus::from_report_flag(with_report),
        owner,
        platform_id,
        release_id,
        application_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn owner_prefers_entity_then_slot_then_absent() {
        let catalog = CdcarmCatalog::default();
        let cases = [
            (text("Alice"), text("Bob"), text("Alice")),
            (text("Alice"), None, text("Alice")),
            (None, text("Bob"), text("Bob")),
            (None, None, None),
        ];
        for (entity, slot, expected) in cases {
            let resolved = resolve_cdcarm_parameters(
                &catalog,
                &StoredSlots {
                    owner: slot,
                    ..StoredSlots::default()
                },
                &TurnOverrides {
                    owner: entity,
                    ..TurnOverrides::default()
                },
            );
            assert_eq!(resolved.owner, expected);
        }
    }

    #[test]
    fn required_fields_fall_back_to_catalog_default() {
        assert_eq!(
            resolve_with_default("release_id", None, None, "fallback"),
            "fallback"
        );
        assert_eq!(
            resolve_with_default("release_id", None, text("slot"), "fallback"),
            "slot"
        );
        assert_eq!(
            resolve_with_default("release_id", text("entity"), text("slot"), "fallback"),
            "entity"
        );
        assert_eq!(resolve_optional("owner", None, None), None);
    }

    #[test]
    fn report_entity_disables_report_only_for_without() {
        for value in ["with", "WITH", "yes", "witout", "", "anything else"] {
            assert!(report_flag_from_entity(value), "value {value:?}");
        }
        for value in ["without", "Without", "WITHOUT", " without "] {
            assert!(!report_flag_from_entity(value), "value {value:?}");
        }
    }

    #[test]
    fn report_flag_falls_back_to_slot_then_true() {
        let catalog = CdcarmCatalog::default();
        let from_slot = resolve_cdcarm_parameters(
            &catalog,
            &StoredSlots {
                with_report: Some(false),
                ..StoredSlots::default()
            },
            &TurnOverrides::default(),
        );
        assert_eq!(
            from_slot.investigation_status,
            InvestigationStatus::NoInvestigation
        );

        let entity_beats_slot = resolve_cdcarm_parameters(
            &catalog,
            &StoredSlots {
                with_report: Some(false),
                ..StoredSlots::default()
            },
            &TurnOverrides {
                report_type: text("with"),
                ..TurnOverrides::default()
            },
        );
        assert_eq!(
            entity_beats_slot.investigation_status,
            InvestigationStatus::HasInvestigation
        );

        let defaulted = resolve_cdcarm_parameters(
            &catalog,
            &StoredSlots::default(),
            &TurnOverrides::default(),
        );
        assert!(defaulted.investigation_status.has_report());
    }

    #[test]
    fn empty_state_resolves_to_defaults() {
        let resolved = resolve_cdcarm_parameters(
            &CdcarmCatalog::default(),
            &StoredSlots::default(),
            &TurnOverrides::default(),
        );
        assert_eq!(
            resolved,
            ResolvedParameters {
                investigation_status: InvestigationStatus::HasInvestigation,
                owner: None,
                platform_id: "1".to_string(),
                release_id: "217".to_string(),
                application_id: "-1".to_string(),
            }
        );
    }

    #[test]
    fn platform_and_release_entities_map_through_catalog() {
        let resolved = resolve_cdcarm_parameters(
            &CdcarmCatalog::default(),
            &StoredSlots {
                platform_id: text("3"),
                release_id: text("200"),
                ..StoredSlots::default()
            },
            &TurnOverrides {
                platform: text("Linux"),
                release: text("25.2"),
                ..TurnOverrides::default()
            },
        );
        assert_eq!(resolved.platform_id, "2");
        assert_eq!(resolved.release_id, "217");
    }

    #[test]
    fn unmapped_entities_pass_through_and_slots_fill_gaps() {
        let resolved = resolve_cdcarm_parameters(
            &CdcarmCatalog::default(),
            &StoredSlots {
                release_id: text("205"),
                application_id: text("12"),
                ..StoredSlots::default()
            },
            &TurnOverrides {
                platform: text("freebsd"),
                ..TurnOverrides::default()
            },
        );
        assert_eq!(resolved.platform_id, "freebsd");
        assert_eq!(resolved.release_id, "205");
        assert_eq!(resolved.application_id, "12");
    }

    #[test]
    fn reads_overrides_and_slots_from_tracker() {
        let tracker = Tracker::default()
            .with_slot(SLOT_CDCARM_OWNER, serde_json::json!("Bob"))
            .with_slot(SLOT_WITH_INVESTIGATION_REPORT, serde_json::json!(true))
            .with_entity(ENTITY_REPORT_TYPE, "without")
            .with_entity(ENTITY_PLATFORM, "mac");
        let overrides = TurnOverrides::from_tracker(&tracker);
        let slots = StoredSlots::from_tracker(&tracker);
        assert_eq!(overrides.platform.as_deref(), Some("mac"));
        assert_eq!(overrides.owner, None);
        assert_eq!(slots.owner.as_deref(), Some("Bob"));
        assert_eq!(slots.with_report, Some(true));

        let resolved = resolve_cdcarm_parameters(&CdcarmCatalog::default(), &slots, &overrides);
        assert_eq!(resolved.owner.as_deref(), Some("Bob"));
        assert_eq!(resolved.platform_id, "3");
        assert_eq!(
            resolved.investigation_status,
            InvestigationStatus::NoInvestigation
        );
    }
}
