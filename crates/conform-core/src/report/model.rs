use serde::{Deserialize, Serialize};

use crate::SCHEMA_VERSION;
use crate::rules::catalog::Category;
use crate::rules::eval::Outcome;
use crate::rules::severity::Severity;

/// Final result of one validation run.
///
/// Serialized as-is for `--format json`; the Markdown report is rendered
/// from the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub conformance: Conformance,
    /// Worst severity among failed outcomes; `Low` when everything passed.
    pub severity: Severity,
    pub categories: Vec<CategorySection>,
}

impl Report {
    pub fn new(tool: ToolInfo, categories: Vec<CategorySection>) -> Self {
        let failures = || {
            categories
                .iter()
                .flat_map(|c| c.outcomes.iter())
                .filter(|o| !o.passed)
        };
        let conformance = if failures().next().is_none() {
            Conformance::Conforming
        } else {
            Conformance::NonConforming
        };
        let severity = failures()
            .map(|o| o.severity)
            .max()
            .unwrap_or(Severity::Low);

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            tool,
            conformance,
            severity,
            categories,
        }
    }

    pub fn passed(&self) -> bool {
        self.conformance == Conformance::Conforming
    }

    /// CI exit code. Without `strict` a produced report always exits 0.
    ///
    /// - CONFORMING → 0
    /// - NON-CONFORMING, non-blocking severity → 1
    /// - NON-CONFORMING, blocking severity → 2
    pub fn exit_code(&self, strict: bool) -> i32 {
        if !strict || self.passed() {
            0
        } else if self.severity.is_blocking() {
            2
        } else {
            1
        }
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.categories.iter().flat_map(|c| c.outcomes.iter())
    }
}

/// Tool metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conformance {
    #[serde(rename = "CONFORMING")]
    Conforming,
    #[serde(rename = "NON-CONFORMING")]
    NonConforming,
}

impl std::fmt::Display for Conformance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Conformance::Conforming => "CONFORMING",
            Conformance::NonConforming => "NON-CONFORMING",
        })
    }
}

/// One non-empty report bucket, outcomes in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySection {
    pub category: Category,
    pub label: String,
    pub outcomes: Vec<Outcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(passed: bool, severity: Severity) -> Outcome {
        Outcome {
            name: "n".into(),
            catalog: "functional_requirements".into(),
            severity,
            passed,
            message: "m".into(),
        }
    }

    fn section(outcomes: Vec<Outcome>) -> CategorySection {
        CategorySection {
            category: Category::FunctionalRequirements,
            label: Category::FunctionalRequirements.label().into(),
            outcomes,
        }
    }

    #[test]
    fn all_pass_is_conforming_low() {
        let report = Report::new(
            ToolInfo::default(),
            vec![section(vec![outcome(true, Severity::High)])],
        );
        assert_eq!(report.conformance, Conformance::Conforming);
        assert_eq!(report.severity, Severity::Low);
        assert_eq!(report.exit_code(true), 0);
    }

    #[test]
    fn passing_outcomes_do_not_raise_severity() {
        let report = Report::new(
            ToolInfo::default(),
            vec![section(vec![
                outcome(true, Severity::High),
                outcome(false, Severity::Low),
            ])],
        );
        assert_eq!(report.conformance, Conformance::NonConforming);
        assert_eq!(report.severity, Severity::Low);
        assert_eq!(report.exit_code(true), 1);
        assert_eq!(report.exit_code(false), 0);
    }

    #[test]
    fn blocking_failure_exits_two_when_strict() {
        let report = Report::new(
            ToolInfo::default(),
            vec![section(vec![outcome(false, Severity::High)])],
        );
        assert_eq!(report.exit_code(true), 2);
    }

    #[test]
    fn conformance_serializes_with_hyphen() {
        assert_eq!(
            serde_json::to_string(&Conformance::NonConforming).unwrap(),
            "\"NON-CONFORMING\""
        );
    }
}
