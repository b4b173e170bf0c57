//! Renders the CDCARM error-report deep link.
//!
//! The dashboard parses the query positionally, so parameter order and the
//! pre-encoded separators below must stay byte-for-byte stable.

use crate::cdcarm_resolver::ResolvedParameters;

pub const CDCARM_REPORT_PATH: &str = "/Reports/Unified/ErrorReport/Product/90";

const ALL_PACKAGES: &str = "True";
const HIGHLIGHTER_COLLECTION: &str = "MatchType%3DAll";
const OFFICIAL_ONLY: &str = "False";
const CHRONIC_FAILURE_THRESHOLD: &str = "0";
const NO_CACHE: &str = "False";
const SHOW_NON_CHRONIC_FAILURES: &str = "true";

const FILTER_MATCH_ALL: &str = "MatchType%3DAll";
const FILTER_INVESTIGATION_STATUS: &str =
    "%26Filter0%3DType%3AARM.WebFilters.TestResults.Filters.InvestigationStatusFilter%2COperator%3AEQUAL%2CValue%3A";
const FILTER_OWNER: &str =
    "%26Filter1%3DType%3AARM.WebFilters.TestResults.Filters.OwnerFilter%2COperator%3AEQUAL%2CValue%3A";

/// Builds the nested, already-encoded `filterCollection` value.
///
/// The owner is percent-encoded a single time, matching the query-level
/// encoding. Once the dashboard decodes the parameter, a `,` or `&` inside an
/// owner name reads as a filter separator again.
pub fn build_filter_collection(params: &ResolvedParameters) -> String {
    let mut collection = format!(
        "{FILTER_MATCH_ALL}{FILTER_INVESTIGATION_STATUS}{}",
        params.investigation_status.as_str()
    );
    if let Some(owner) = params.owner.as_deref() {
        collection.push_str(FILTER_OWNER);
        collection.push_str(&urlencoding::encode(owner));
    }
    collection
}

pub fn build_cdcarm_url(dashboard_origin: &str, params: &ResolvedParameters) -> String {
    format!(
        "{origin}{CDCARM_REPORT_PATH}?applicationId={application}&platformId={platform}&releaseId={release}\
&allPackages={ALL_PACKAGES}&filterCollection={filters}&highlighterCollection={HIGHLIGHTER_COLLECTION}\
&officialOnly={OFFICIAL_ONLY}&chronicFailureThreshold={CHRONIC_FAILURE_THRESHOLD}&noCache={NO_CACHE}\
&showNonChronicFailures={SHOW_NON_CHRONIC_FAILURES}",
        origin = dashboard_origin.trim_end_matches('/'),
        application = urlencoding::encode(&params.application_id),
        platform = urlencoding::encode(&params.platform_id),
        release = urlencoding::encode(&params.release_id),
        filters = build_filter_collection(params),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdcarm_catalog::DEFAULT_DASHBOARD_ORIGIN;
    use crate::cdcarm_resolver::InvestigationStatus;

    fn params(status: InvestigationStatus, owner: Option<&str>) -> ResolvedParameters {
        ResolvedParameters {
            investigation_status: status,
            owner: owner.map(str::to_string),
            platform_id: "1".to_string(),
            release_id: "217".to_string(),
            application_id: "-1".to_string(),
        }
    }

    #[test]
    fn renders_exact_layout_without_owner() {
        let url = build_cdcarm_url(
            DEFAULT_DASHBOARD_ORIGIN,
            &params(InvestigationStatus::HasInvestigation, None),
        );
        assert_eq!(
            url,
            "https://cdcarm.win.ansys.com/Reports/Unified/ErrorReport/Product/90?applicationId=-1&platformId=1&releaseId=217&allPackages=True&filterCollection=MatchType%3DAll%26Filter0%3DType%3AARM.WebFilters.TestResults.Filters.InvestigationStatusFilter%2COperator%3AEQUAL%2CValue%3AHAS_INVESTIGATION&highlighterCollection=MatchType%3DAll&officialOnly=False&chronicFailureThreshold=0&noCache=False&showNonChronicFailures=true"
        );
    }

    #[test]
    fn renders_exact_layout_with_owner() {
        let url = build_cdcarm_url(
            DEFAULT_DASHBOARD_ORIGIN,
            &params(InvestigationStatus::NoInvestigation, Some("JohnDoe")),
        );
        assert_eq!(
            url,
            "https://cdcarm.win.ansys.com/Reports/Unified/ErrorReport/Product/90?applicationId=-1&platformId=1&releaseId=217&allPackages=True&filterCollection=MatchType%3DAll%26Filter0%3DType%3AARM.WebFilters.TestResults.Filters.InvestigationStatusFilter%2COperator%3AEQUAL%2CValue%3ANO_INVESTIGATION%26Filter1%3DType%3AARM.WebFilters.TestResults.Filters.OwnerFilter%2COperator%3AEQUAL%2CValue%3AJohnDoe&highlighterCollection=MatchType%3DAll&officialOnly=False&chronicFailureThreshold=0&noCache=False&showNonChronicFailures=true"
        );
    }

    #[test]
    fn filter_collection_has_single_clause_without_owner() {
        let filters = build_filter_collection(&params(InvestigationStatus::HasInvestigation, None));
        assert_eq!(filters.matches("Filter0").count(), 1);
        assert!(!filters.contains("Filter1"));
    }

    #[test]
    fn filter_collection_ends_with_owner_value() {
        let filters = build_filter_collection(&params(
            InvestigationStatus::HasInvestigation,
            Some("JohnDoe"),
        ));
        assert!(filters.ends_with("Value%3AJohnDoe"));
        assert!(filters.contains("Value%3AHAS_INVESTIGATION%26Filter1"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let resolved = params(InvestigationStatus::HasInvestigation, Some("Alice"));
        assert_eq!(
            build_cdcarm_url(DEFAULT_DASHBOARD_ORIGIN, &resolved),
            build_cdcarm_url(DEFAULT_DASHBOARD_ORIGIN, &resolved)
        );
    }

    #[test]
    fn owner_is_percent_encoded_once() {
        let filters = build_filter_collection(&params(
            InvestigationStatus::HasInvestigation,
            Some("Doe, John&Co"),
        ));
        assert!(filters.ends_with("Value%3ADoe%2C%20John%26Co"));
        assert!(!filters.contains("%252C"));
    }

    #[test]
    fn origin_trailing_slash_is_ignored() {
        let resolved = params(InvestigationStatus::HasInvestigation, None);
        assert_eq!(
            build_cdcarm_url("https://arm.example.test/", &resolved),
            build_cdcarm_url("https://arm.example.test", &resolved)
        );
    }
}
