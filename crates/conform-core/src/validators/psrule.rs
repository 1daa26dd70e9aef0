use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, error};

use crate::report::format::{LINE_DELIMITER, Sign, fail_item, indent, pass_item, sub_item};
use crate::rules::severity::Severity;
use crate::validators::{Validator, Verdict};

/// One record of a PSRule results file.
#[derive(Debug, Clone, Deserialize)]
pub struct PsRuleRecord {
    pub outcome: String,
    #[serde(rename = "ruleName")]
    pub rule_name: String,
    #[serde(rename = "ref")]
    pub reference_code: String,
    pub info: PsRuleInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PsRuleInfo {
    pub recommendation: String,
    pub annotations: PsRuleAnnotations,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PsRuleAnnotations {
    #[serde(rename = "online version")]
    pub online_version: String,
}

pub fn read_records(path: &Path) -> Result<Vec<PsRuleRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read PSRule results {}", path.display()))?;
    serde_json::from_str(&raw).context("PSRule results are not a valid record array")
}

/// Turns failing PSRule records into report findings.
///
/// An unreadable or malformed results file is reported as a passing
/// "scan not performed" item.
#[derive(Debug, Clone)]
pub struct PsRuleValidator {
    pub name: String,
    pub catalog: String,
    pub severity: Severity,
    pub results_path: Option<PathBuf>,
}

impl PsRuleValidator {
    pub fn new(catalog: impl Into<String>, results_path: Option<PathBuf>) -> Self {
        Self {
            name: "PSRuleValidator".to_string(),
            catalog: catalog.into(),
            severity: Severity::default(),
            results_path,
        }
    }

    fn render_failure(&self, record: &PsRuleRecord) -> String {
        let head = sub_item(
            Sign::for_failure(self.severity),
            &format!("{} ({}){LINE_DELIMITER}", record.rule_name, record.reference_code),
        );
        let reference = format!("reference: {}", record.info.annotations.online_version);
        indent(
            &[
                head.as_str(),
                record.info.recommendation.as_str(),
                reference.as_str(),
            ]
            .join(LINE_DELIMITER),
            4,
        )
    }
}

impl Validator for PsRuleValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn catalog(&self) -> &str {
        &self.catalog
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn validate(&self) -> Result<Verdict> {
        let records = match &self.results_path {
            Some(path) => {
                debug!("validating PSRule results file: {}", path.display());
                read_records(path)
            }
            None => Err(anyhow::anyhow!("no PSRule results file supplied")),
        };

        let records = match records {
            Ok(records) => records,
            Err(e) => {
                error!("error parsing PSRule results: {e:#}");
                return Ok(Verdict::pass(pass_item("Security scan is not performed")));
            }
        };

        let details: Vec<String> = records
            .iter()
            .filter(|r| r.outcome == "Fail")
            .map(|r| self.render_failure(r))
            .collect();

        if details.is_empty() {
            Ok(Verdict::pass(pass_item("Security Scan")))
        } else {
            Ok(Verdict::fail(fail_item(
                Sign::for_failure(self.severity),
                "Security Scan",
                &details.join(LINE_DELIMITER),
            )))
        }
    }
}
