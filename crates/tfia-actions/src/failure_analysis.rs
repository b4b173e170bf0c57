//! Failure-pattern and owner aggregation over an uploaded table, plus the
//! chat renderings of the results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::failure_table::{FailureRecord, FailureTable};

const PASSING_STATUSES: &[&str] = &["pass", "passed", "ok", "success", "succeeded"];
const MAX_PATTERN_CHARS: usize = 120;
const UNKNOWN_PATTERN: &str = "Unknown error";
const UNASSIGNED_OWNER: &str = "Unassigned";
const SUMMARY_TOP_N: usize = 3;
const SIMILAR_TESTS_SHOWN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorGroup {
    pub pattern: String,
    pub count: usize,
    pub percentage: u32,
    pub tests: Vec<FailureRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerStat {
    pub owner: String,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_tests: usize,
    pub failure_count: usize,
    #[serde(default)]
    pub error_groups: Vec<ErrorGroup>,
    #[serde(default)]
    pub owner_stats: Vec<OwnerStat>,
}

impl AnalysisResult {
    /// Finds a test by id together with the error group it belongs to.
    pub fn find_test(&self, test_id: &str) -> Option<(&ErrorGroup, &FailureRecord)> {
        let test_id = test_id.trim();
        self.error_groups.iter().find_map(|group| {
            group
                .tests
                .iter()
                .find(|test| test.test == test_id)
                .map(|test| (group, test))
        })
    }
}

/// Capability seam for whatever turns a failure table into an analysis.
pub trait FailureAnalyzer: Send + Sync {
    fn analyze(&self, table: &FailureTable) -> AnalysisResult;
}

/// Groups failures by the first line of their error message.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternFailureAnalyzer;

impl FailureAnalyzer for PatternFailureAnalyzer {
    fn analyze(&self, table: &FailureTable) -> AnalysisResult {
        let records = table.records();
        let total_tests = records.len();
        let failures = records
            .into_iter()
            .filter(is_failure)
            .collect::<Vec<_>>();
        let failure_count = failures.len();

        let mut groups: BTreeMap<String, Vec<FailureRecord>> = BTreeMap::new();
        let mut owners: BTreeMap<String, usize> = BTreeMap::new();
        for record in failures {
            let owner = if record.owner.is_empty() {
                UNASSIGNED_OWNER.to_string()
            } else {
                record.owner.clone()
            };
            *owners.entry(owner).or_default() += 1;
            groups
                .entry(failure_pattern(&record.error_message))
                .or_default()
                .push(record);
        }

        let mut error_groups = groups
            .into_iter()
            .map(|(pattern, tests)| ErrorGroup {
                pattern,
                count: tests.len(),
                percentage: percentage(tests.len(), failure_count),
                tests,
            })
            .collect::<Vec<_>>();
        error_groups.sort_by(|left, right| {
            right
                .count
                .cmp(&left.count)
                .then_with(|| left.pattern.cmp(&right.pattern))
        });

        let mut owner_stats = owners
            .into_iter()
            .map(|(owner, count)| OwnerStat {
                owner,
                count,
                percentage: percentage(count, failure_count),
            })
            .collect::<Vec<_>>();
        owner_stats.sort_by(|left, right| {
            right
                .count
                .cmp(&left.count)
                .then_with(|| left.owner.cmp(&right.owner))
        });

        AnalysisResult {
            total_tests,
            failure_count,
            error_groups,
            owner_stats,
        }
    }
}

fn is_failure(record: &FailureRecord) -> bool {
    match record.status.as_deref() {
        None => true,
        Some(status) => !PASSING_STATUSES.contains(&status.trim().to_lowercase().as_str()),
    }
}

/// First non-empty line of the message, whitespace-collapsed and truncated.
pub fn failure_pattern(error_message: &str) -> String {
    let first_line = error_message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return UNKNOWN_PATTERN.to_string();
    }
    collapsed.chars().take(MAX_PATTERN_CHARS).collect()
}

fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

pub fn render_analysis_summary(analysis: &AnalysisResult) -> String {
    let failure_rate = percentage(analysis.failure_count, analysis.total_tests);
    let mut response = String::from("📊 **Test Failure Analysis Summary**\n\n");
    response.push_str(&format!("Total Tests: {}\n", analysis.total_tests));
    response.push_str(&format!(
        "Failed Tests: {} ({}%)\n\n",
        analysis.failure_count, failure_rate
    ));

    response.push_str("**Top Failure Patterns:**\n");
    for (index, group) in analysis.error_groups.iter().take(SUMMARY_TOP_N).enumerate() {
        response.push_str(&format!(
            "{}. **{}**: {} tests ({}%)\n",
            index + 1,
            group.pattern,
            group.count,
            group.percentage
        ));
    }

    response.push_str("\n**Most Affected Owners:**\n");
    for (index, owner) in analysis.owner_stats.iter().take(SUMMARY_TOP_N).enumerate() {
        response.push_str(&format!(
            "{}. **{}**: {} tests ({}%)\n",
            index + 1,
            owner.owner,
            owner.count,
            owner.percentage
        ));
    }

    response.push_str(
        "\nYou can ask me for more details about specific patterns or owners, like:\n",
    );
    if let Some(group) = analysis.error_groups.first() {
        response.push_str(&format!("- Tell me more about '{}'\n", group.pattern));
    }
    if let Some(owner) = analysis.owner_stats.first() {
        response.push_str(&format!("- Show me all failing tests for {}\n", owner.owner));
    }
    response
}

pub fn render_failure_detail(test_id: &str, group: &ErrorGroup, record: &FailureRecord) -> String {
    let mut response = format!("**Analysis for Test {test_id}**\n\n");
    response.push_str(&format!(
        "This test is failing due to: **{}**\n\n",
        group.pattern
    ));
    response.push_str(&format!("Owner: {}\n\n", record.owner));
    response.push_str(&format!("Error message:\n{}\n\n", record.error_message));

    let similar = group
        .tests
        .iter()
        .filter(|test| test.test != record.test)
        .map(|test| test.test.as_str())
        .collect::<Vec<_>>();
    if !similar.is_empty() {
        response.push_str("**Similar tests with the same issue:**\n");
        for (index, test) in similar.iter().take(SIMILAR_TESTS_SHOWN).enumerate() {
            response.push_str(&format!("{}. {}\n", index + 1, test));
        }
        if similar.len() > SIMILAR_TESTS_SHOWN {
            response.push_str(&format!(
                "... and {} more\n",
                similar.len() - SIMILAR_TESTS_SHOWN
            ));
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure_table::parse_delimited;

    fn sample_table() -> FailureTable {
        parse_delimited(
            "Test,Owner,ErrorMessage\n\
T-1,alice,Timeout waiting for solver\n\
T-2,alice,Timeout waiting for solver\n\
T-3,bob,\"Assertion failed\nexpected 3\"\n\
T-4,,Timeout   waiting for solver\n",
        )
        .expect("table")
    }

    #[test]
    fn groups_failures_by_pattern_and_owner() {
        let analysis = PatternFailureAnalyzer.analyze(&sample_table());
        assert_eq!(analysis.total_tests, 4);
        assert_eq!(analysis.failure_count, 4);
        assert_eq!(analysis.error_groups.len(), 2);
        assert_eq!(analysis.error_groups[0].pattern, "Timeout waiting for solver");
        assert_eq!(analysis.error_groups[0].count, 3);
        assert_eq!(analysis.error_groups[0].percentage, 75);
        assert_eq!(analysis.error_groups[1].pattern, "Assertion failed");
        assert_eq!(
            analysis
                .owner_stats
                .iter()
                .map(|stat| (stat.owner.as_str(), stat.count))
                .collect::<Vec<_>>(),
            vec![("alice", 2), ("Unassigned", 1), ("bob", 1)]
        );
    }

    #[test]
    fn status_column_excludes_passing_rows() {
        let table = parse_delimited(
            "Test,Owner,ErrorMessage,Status\nT-1,a,boom,FAILED\nT-2,a,,Passed\nT-3,b,,ok\n",
        )
        .expect("table");
        let analysis = PatternFailureAnalyzer.analyze(&table);
        assert_eq!(analysis.total_tests, 3);
        assert_eq!(analysis.failure_count, 1);
        assert_eq!(analysis.error_groups[0].percentage, 100);
    }

    #[test]
    fn empty_messages_fall_into_unknown_pattern() {
        assert_eq!(failure_pattern("  \n\t"), "Unknown error");
        assert_eq!(failure_pattern("\n  first   line \nsecond"), "first line");
        assert_eq!(failure_pattern(&"x".repeat(500)).chars().count(), 120);
    }

    #[test]
    fn summary_lists_top_patterns_and_owners() {
        let analysis = PatternFailureAnalyzer.analyze(&sample_table());
        let summary = render_analysis_summary(&analysis);
        assert!(summary.starts_with("📊 **Test Failure Analysis Summary**"));
        assert!(summary.contains("Failed Tests: 4 (100%)"));
        assert!(summary.contains("1. **Timeout waiting for solver**: 3 tests (75%)"));
        assert!(summary.contains("1. **alice**: 2 tests (50%)"));
        assert!(summary.contains("- Tell me more about 'Timeout waiting for solver'"));
        assert!(summary.contains("- Show me all failing tests for alice"));
    }

    #[test]
    fn summary_of_empty_analysis_has_zero_rate() {
        let summary = render_analysis_summary(&AnalysisResult::default());
        assert!(summary.contains("Failed Tests: 0 (0%)"));
        assert!(!summary.contains("Tell me more"));
    }

    #[test]
    fn detail_lists_similar_tests_with_overflow() {
        let tests = (1..=8)
            .map(|index| FailureRecord {
                test: format!("T-{index}"),
                owner: "alice".to_string(),
                error_message: "boom".to_string(),
                status: None,
            })
            .collect::<Vec<_>>();
        let group = ErrorGroup {
            pattern: "boom".to_string(),
            count: tests.len(),
            percentage: 100,
            tests,
        };
        let analysis = AnalysisResult {
            total_tests: 8,
            failure_count: 8,
            error_groups: vec![group],
            owner_stats: Vec::new(),
        };
        let (group, record) = analysis.find_test("T-1").expect("found");
        let detail = render_failure_detail("T-1", group, record);
        assert!(detail.starts_with("**Analysis for Test T-1**"));
        assert!(detail.contains("This test is failing due to: **boom**"));
        assert!(detail.contains("1. T-2\n"));
        assert!(detail.contains("5. T-6\n"));
        assert!(!detail.contains("T-7\n"));
        assert!(detail.contains("... and 2 more"));
        assert!(analysis.find_test("T-99").is_none());
    }
}
