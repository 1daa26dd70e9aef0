pub mod error;
pub mod report;
pub mod rules;
pub mod util;
pub mod validators;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::error::ConformError;
use crate::report::model::{Report, ToolInfo};
use crate::rules::classify::ResultAggregator;
use crate::rules::eval::ExecutionEngine;
use crate::rules::manifest::RuleManifest;
use crate::rules::parser::{RuleParser, RunOptions};
use crate::util::process::CommandRunner;

pub const TOOL_NAME: &str = "conform";

/// JSON schema version of reports. Bump only on semantic changes.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Validate one repository: build validators from `manifest`, run them,
/// and aggregate the outcomes into a report.
///
/// Individual check failures end up inside the report. `Err` is reserved
/// for configuration faults such as a missing repository or a rule whose
/// catalog names no report category.
pub fn validate_repo(
    options: &RunOptions,
    manifest: RuleManifest,
    runner: Arc<dyn CommandRunner>,
    tool: ToolInfo,
) -> Result<Report> {
    if !options.repo_path.is_dir() {
        return Err(ConformError::InvalidRepoPath(options.repo_path.clone()).into());
    }

    let validators = RuleParser::new(manifest, options, runner).parse();
    let engine = ExecutionEngine::new(validators);
    info!(
        repo = %options.repo_path.display(),
        validators = engine.len(),
        "validating repository"
    );
    let outcomes = engine.execute();

    let mut aggregator = ResultAggregator::new();
    aggregator
        .extend(outcomes)
        .context("rule manifest assigns a check to an unknown category")?;

    let report = aggregator.report(tool);
    info!(
        conformance = %report.conformance,
        severity = %report.severity,
        "validation finished"
    );
    Ok(report)
}
