use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::report::format::{Sign, fail_item, indent, output_block, pass_item, sub_item};
use crate::rules::severity::Severity;
use crate::util::process::{
    CommandRunner, CommandSpec, DEFAULT_COMMAND_TIMEOUT, ExitState, sanitize_output,
};
use crate::util::retry::{RetryPolicy, with_retry};
use crate::validators::{Validator, Verdict};

const PLAYWRIGHT_PROGRAM: &str = "npx";
const PLAYWRIGHT_ARGS: &[&str] = &[
    "playwright",
    "test",
    "--pass-with-no-tests",
    "--quiet",
    "--reporter",
    "list",
];

/// Runs the repository's Playwright suite; a zero exit status passes.
pub struct PlaywrightValidator {
    pub name: String,
    pub catalog: String,
    pub severity: Severity,
    pub folder: PathBuf,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl PlaywrightValidator {
    pub fn new(
        catalog: impl Into<String>,
        folder: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            name: "PlaywrightValidator".to_string(),
            catalog: catalog.into(),
            severity: Severity::Low,
            folder: folder.into(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            runner,
        }
    }

    fn summary() -> &'static str {
        "npx playwright test"
    }

    fn attempt(&self) -> Verdict {
        debug!("running playwright tests in {}", self.folder.display());
        let spec = CommandSpec::new(PLAYWRIGHT_PROGRAM, PLAYWRIGHT_ARGS, &self.folder, self.timeout);
        let sign = Sign::for_failure(self.severity);

        let detail = match self.runner.run(&spec) {
            Err(e) => sub_item(sign, &format!("Error: {e:#}")),
            Ok(out) if out.state == ExitState::TimedOut => sub_item(
                sign,
                &format!(
                    "Error: `{}` timed out after {} seconds.",
                    spec.display(),
                    self.timeout.as_secs()
                ),
            ),
            Ok(out) if out.succeeded() => {
                info!("{}", out.stdout);
                return Verdict::pass(pass_item(Self::summary()));
            }
            Ok(out) => {
                info!("{}", out.stdout);
                warn!("{}", out.stderr);
                indent(&output_block(&sanitize_output(&out.combined())), 2)
            }
        };
        Verdict::fail(fail_item(sign, Self::summary(), &detail))
    }
}

impl Validator for PlaywrightValidator {
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
        Ok(with_retry(&self.retry, Self::summary(), || self.attempt()))
    }
}
