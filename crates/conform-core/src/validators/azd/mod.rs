//! Deploy/teardown checks driven through the Azure Developer CLI.
//!
//! One validator instance runs exactly one [`AzdCommand`] against one
//! infrastructure path. The rule parser emits an `Up` then a `Down`
//! instance per path, so teardown always follows its own deploy.

pub mod resources;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::report::format::{
    Sign, fail_item, output_block, pass_item, pass_item_with_details, sub_item,
};
use crate::rules::severity::Severity;
use crate::util::process::{
    CommandOutput, CommandRunner, CommandSpec, DEFAULT_COMMAND_TIMEOUT, ExitState,
    sanitize_output,
};
use crate::util::retry::{RetryPolicy, with_retry};
use crate::util::walk::relative_key;
use crate::validators::{Validator, Verdict};

use resources::ResourceLister;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AzdCommand {
    Up,
    Down,
}

impl AzdCommand {
    pub fn label(self) -> &'static str {
        match self {
            AzdCommand::Up => "azd up",
            AzdCommand::Down => "azd down",
        }
    }

    pub fn args(self) -> &'static [&'static str] {
        match self {
            AzdCommand::Up => &["up", "--no-prompt"],
            AzdCommand::Down => &["down", "--force", "--purge", "--no-prompt"],
        }
    }
}

/// Swap a remote Terraform state backend for a local one so that a CI
/// deploy does not need pre-provisioned state storage.
///
/// Returns whether the file was rewritten.
pub fn use_local_tf_backend(folder: &Path) -> Result<bool> {
    let provider = folder.join("infra").join("provider.tf");
    if !provider.exists() {
        return Ok(false);
    }
    let content = fs::read_to_string(&provider)
        .with_context(|| format!("failed to read {}", provider.display()))?;
    let rewritten = content.replace(r#"backend "azurerm" {}"#, r#"backend "local" {}"#);
    if rewritten == content {
        return Ok(false);
    }
    fs::write(&provider, rewritten)
        .with_context(|| format!("failed to write {}", provider.display()))?;
    debug!("replaced azurerm backend with local backend in {}", provider.display());
    Ok(true)
}

pub struct AzdValidator {
    pub name: String,
    pub catalog: String,
    pub severity: Severity,
    pub command: AzdCommand,
    pub folder: PathBuf,
    /// Folder relative to the repository root; empty for the root itself.
    pub display_path: String,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl AzdValidator {
    pub fn new(
        catalog: impl Into<String>,
        command: AzdCommand,
        repo_root: &Path,
        folder: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let folder = folder.into();
        Self {
            name: command.label().to_string(),
            catalog: catalog.into(),
            severity: Severity::default(),
            command,
            display_path: relative_key(repo_root, &folder),
            folder,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            runner,
        }
    }

    /// Report heading, e.g. `azd up` or `azd up in samples/chat`.
    pub fn summary(&self) -> String {
        if self.display_path.is_empty() {
            self.command.label().to_string()
        } else {
            format!("{} in {}", self.command.label(), self.display_path)
        }
    }

    fn failure(&self, detail: String) -> Verdict {
        let sign = Sign::for_failure(self.severity);
        Verdict::fail(fail_item(sign, &self.summary(), &detail))
    }

    fn run_azd(&self) -> std::result::Result<CommandOutput, Verdict> {
        let spec = CommandSpec::new("azd", self.command.args(), &self.folder, self.timeout);
        let sign = Sign::for_failure(self.severity);
        match self.runner.run(&spec) {
            Err(e) => Err(self.failure(sub_item(sign, &format!("Error: {e:#}")))),
            Ok(out) if out.state == ExitState::TimedOut => Err(self.failure(sub_item(
                sign,
                &format!(
                    "Error: `{}` timed out after {} seconds.",
                    spec.display(),
                    self.timeout.as_secs()
                ),
            ))),
            Ok(out) if !out.succeeded() => {
                debug!("{}", out.stdout);
                debug!("{}", out.stderr);
                Err(self.failure(output_block(&sanitize_output(&out.combined()))))
            }
            Ok(out) => {
                debug!("{}", out.stdout);
                Ok(out)
            }
        }
    }

    /// Best-effort resource listing; any fault drops the section.
    fn inventory(&self, up_output: &str) -> Option<String> {
        let lister = ResourceLister::new(self.runner.as_ref(), &self.folder, self.timeout);
        let listed = lister
            .resolve_target(up_output)
            .and_then(|(group, sub)| lister.list(&group, sub.as_deref()));
        match listed {
            Ok(inventory) => Some(inventory.render()),
            Err(e) => {
                warn!("resource listing skipped: {e:#}");
                None
            }
        }
    }

    fn attempt(&self) -> Verdict {
        match self.command {
            AzdCommand::Up => {
                debug!("running azd up in {}", self.folder.display());
                if let Err(e) = use_local_tf_backend(&self.folder) {
                    warn!("failed to update tf backend: {e:#}");
                }
                match self.run_azd() {
                    Err(verdict) => verdict,
                    Ok(out) => match self.inventory(&out.stdout) {
                        Some(details) => {
                            Verdict::pass(pass_item_with_details(&self.summary(), &details))
                        }
                        None => Verdict::pass(pass_item(&self.summary())),
                    },
                }
            }
            AzdCommand::Down => {
                debug!("running azd down in {}", self.folder.display());
                match self.run_azd() {
                    Err(verdict) => verdict,
                    Ok(_) => Verdict::pass(pass_item(&self.summary())),
                }
            }
        }
    }
}

impl Validator for AzdValidator {
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
        Ok(with_retry(&self.retry, &self.summary(), || self.attempt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::process::fake::ScriptedRunner;

    const DOCKER_DOWN: &str =
        "ERROR: Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?";

    fn validator(command: AzdCommand, runner: Arc<ScriptedRunner>) -> AzdValidator {
        let mut v = AzdValidator::new(
            "functional_requirements",
            command,
            Path::new("/repo"),
            "/repo",
            runner,
        );
        v.retry.delay = Duration::ZERO;
        v
    }

    #[test]
    fn up_success_passes_without_inventory() {
        let runner = Arc::new(ScriptedRunner::default().on(
            "azd up",
            vec![CommandOutput::success("SUCCESS: Your application was provisioned")],
        ));
        let verdict = validator(AzdCommand::Up, runner.clone()).validate().unwrap();
        assert!(verdict.passed);
        assert_eq!(verdict.message, pass_item("azd up"));
        assert_eq!(runner.count("azd up"), 1);
    }

    #[test]
    fn up_success_appends_resource_inventory() {
        let runner = Arc::new(
            ScriptedRunner::default()
                .on(
                    "azd up",
                    vec![CommandOutput::success(
                        "https://portal.azure.com/#/resource/subscriptions/1/resourceGroups/rg-app/overview",
                    )],
                )
                .on("azd env get-values", vec![CommandOutput::success("AZURE_SUBSCRIPTION_ID=\"1\"")])
                .on(
                    "az resource list",
                    vec![CommandOutput::success(r#"[{"type":"Microsoft.Web/sites","name":"w"}]"#)],
                ),
        );
        let verdict = validator(AzdCommand::Up, runner).validate().unwrap();
        assert!(verdict.passed);
        assert!(verdict.message.contains("Resource group: rg-app"));
        assert!(verdict.message.contains("  - Microsoft.Web/sites"));
    }

    #[test]
    fn up_failure_embeds_sanitized_output() {
        let runner = Arc::new(ScriptedRunner::default().on(
            "azd up",
            vec![CommandOutput::failure(1, "deploy failed at C:\\infra", "")],
        ));
        let verdict = validator(AzdCommand::Up, runner.clone()).validate().unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.contains("deploy failed at C:infra"));
        assert!(verdict.message.contains(":warning:"));
        assert_eq!(runner.count("azd up"), 1);
    }

    #[test]
    fn severity_only_changes_the_sign() {
        let runner = Arc::new(ScriptedRunner::default().on(
            "azd down",
            vec![CommandOutput::failure(1, "boom", "")],
        ));
        let mut v = validator(AzdCommand::Down, runner);
        v.severity = Severity::High;
        let verdict = v.validate().unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.starts_with("<details><summary>:x: <b>azd down</b>"));
    }

    #[test]
    fn down_uses_force_purge_flags() {
        let runner = Arc::new(ScriptedRunner::default().on("azd down", vec![CommandOutput::success("")]));
        let verdict = validator(AzdCommand::Down, runner.clone()).validate().unwrap();
        assert!(verdict.passed);
        assert_eq!(runner.calls(), vec!["azd down --force --purge --no-prompt"]);
    }

    #[test]
    fn transient_failures_then_success_are_retried() {
        let runner = Arc::new(ScriptedRunner::default().on(
            "azd down",
            vec![
                CommandOutput::failure(1, "", DOCKER_DOWN),
                CommandOutput::failure(1, "", DOCKER_DOWN),
                CommandOutput::failure(1, "", DOCKER_DOWN),
                CommandOutput::success("done"),
            ],
        ));
        let verdict = validator(AzdCommand::Down, runner.clone()).validate().unwrap();
        assert!(verdict.passed);
        assert_eq!(runner.count("azd down"), 4);
    }

    #[test]
    fn exhausted_retries_keep_transient_message() {
        let runner = Arc::new(ScriptedRunner::default().on(
            "azd down",
            vec![CommandOutput::failure(1, "", DOCKER_DOWN)],
        ));
        let verdict = validator(AzdCommand::Down, runner.clone()).validate().unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.contains("Cannot connect to the Docker daemon"));
        assert_eq!(runner.count("azd down"), 4);
    }

    #[test]
    fn timeout_is_not_retried() {
        let runner = Arc::new(ScriptedRunner::default().on("azd up", vec![CommandOutput::timed_out()]));
        let verdict = validator(AzdCommand::Up, runner.clone()).validate().unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.contains("timed out"));
        assert_eq!(runner.count("azd up"), 1);
    }

    #[test]
    fn missing_binary_is_a_failed_verdict() {
        let runner = Arc::new(ScriptedRunner::default());
        let verdict = validator(AzdCommand::Up, runner).validate().unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.contains("no scripted response"));
    }

    #[test]
    fn summary_names_nested_folder() {
        let runner: Arc<dyn CommandRunner> = Arc::new(ScriptedRunner::default());
        let v = AzdValidator::new(
            "functional_requirements",
            AzdCommand::Up,
            Path::new("/repo"),
            "/repo/samples/chat",
            runner,
        );
        assert_eq!(v.summary(), "azd up in samples/chat");
    }

    #[test]
    fn rewrites_terraform_backend() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("infra")).unwrap();
        let provider = dir.path().join("infra/provider.tf");
        fs::write(&provider, "terraform {\n  backend \"azurerm\" {}\n}\n").unwrap();

        assert!(use_local_tf_backend(dir.path()).unwrap());
        let content = fs::read_to_string(&provider).unwrap();
        assert!(content.contains(r#"backend "local" {}"#));
        assert!(!use_local_tf_backend(dir.path()).unwrap());
    }

    #[test]
    fn missing_provider_file_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!use_local_tf_backend(dir.path()).unwrap());
    }
}
