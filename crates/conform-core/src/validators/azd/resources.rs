//! Post-deploy inventory of what `azd up` created.
//!
//! Everything here is best-effort: callers log and drop any error.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::util::process::{CommandRunner, CommandSpec};

const COGNITIVE_ACCOUNT_TYPE: &str = "Microsoft.CognitiveServices/accounts";

static PORTAL_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"resourceGroups/([^/\s]+)").expect("Invalid regex"));

static SUMMARY_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)resource group:\s*([A-Za-z0-9._()-]+)").expect("Invalid regex")
});

/// Pull the resource group name out of captured `azd up` output.
///
/// The portal link is preferred over the summary line.
pub fn extract_resource_group(output: &str) -> Option<String> {
    [&*PORTAL_GROUP, &*SUMMARY_GROUP]
        .into_iter()
        .filter_map(|re| re.captures(output))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .find(|name| !name.is_empty())
}

/// Parse `KEY="value"` lines as printed by `azd env get-values`.
pub fn parse_env_values(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().trim_matches('"').to_string()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInventory {
    pub resource_group: String,
    pub resource_types: Vec<String>,
    pub ai_deployments: Vec<String>,
}

impl ResourceInventory {
    pub fn render(&self) -> String {
        let mut out = format!("Resource group: {}\n\nResource types:", self.resource_group);
        for t in &self.resource_types {
            out.push_str(&format!("\n  - {t}"));
        }
        if !self.ai_deployments.is_empty() {
            out.push_str("\n\nAI deployments:");
            for d in &self.ai_deployments {
                out.push_str(&format!("\n  - {d}"));
            }
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct ResourceEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentEntry {
    properties: DeploymentProperties,
    sku: Option<DeploymentSku>,
}

#[derive(Debug, Deserialize)]
struct DeploymentProperties {
    model: DeploymentModel,
}

#[derive(Debug, Deserialize)]
struct DeploymentModel {
    format: String,
    name: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentSku {
    name: String,
}

impl DeploymentEntry {
    fn descriptor(&self) -> String {
        let sku = self.sku.as_ref().map(|s| s.name.as_str()).unwrap_or("unknown");
        let model = &self.properties.model;
        format!("{}.{sku}.{}:{}", model.format, model.name, model.version)
    }
}

/// Enumerates deployed resources through the `azd` and `az` CLIs.
pub struct ResourceLister<'a> {
    runner: &'a dyn CommandRunner,
    cwd: &'a Path,
    timeout: Duration,
}

impl<'a> ResourceLister<'a> {
    pub fn new(runner: &'a dyn CommandRunner, cwd: &'a Path, timeout: Duration) -> Self {
        Self {
            runner,
            cwd,
            timeout,
        }
    }

    fn stdout(&self, program: &str, args: &[&str]) -> Result<String> {
        let spec = CommandSpec::new(program, args, self.cwd, self.timeout);
        let out = self.runner.run(&spec)?;
        if !out.succeeded() {
            bail!("`{}` failed: {}", spec.display(), out.combined());
        }
        Ok(out.stdout)
    }

    /// Resource group from the deploy output, falling back to azd's
    /// environment state. The subscription only ever comes from the latter.
    pub fn resolve_target(&self, up_output: &str) -> Result<(String, Option<String>)> {
        let env = self
            .stdout("azd", &["env", "get-values"])
            .map(|raw| parse_env_values(&raw));
        let subscription = env
            .as_ref()
            .ok()
            .and_then(|vars| vars.get("AZURE_SUBSCRIPTION_ID").cloned());

        if let Some(group) = extract_resource_group(up_output) {
            return Ok((group, subscription));
        }
        debug!("resource group not found in azd output; querying azd env");
        let group = env?
            .remove("AZURE_RESOURCE_GROUP")
            .context("AZURE_RESOURCE_GROUP is not set in the azd environment")?;
        Ok((group, subscription))
    }

    pub fn list(&self, resource_group: &str, subscription: Option<&str>) -> Result<ResourceInventory> {
        let mut args = vec![
            "resource",
            "list",
            "--resource-group",
            resource_group,
            "--output",
            "json",
        ];
        if let Some(sub) = subscription {
            args.extend(["--subscription", sub]);
        }
        let resources: Vec<ResourceEntry> = serde_json::from_str(&self.stdout("az", &args)?)
            .context("unexpected `az resource list` output")?;

        info!("resource types in resource group {resource_group}:");
        let mut inventory = ResourceInventory {
            resource_group: resource_group.to_string(),
            ..Default::default()
        };
        for resource in &resources {
            info!("{}", resource.kind);
            inventory.resource_types.push(resource.kind.clone());
        }

        for account in resources.iter().filter(|r| r.kind == COGNITIVE_ACCOUNT_TYPE) {
            let mut args = vec![
                "cognitiveservices",
                "account",
                "deployment",
                "list",
                "--resource-group",
                resource_group,
                "--name",
                account.name.as_str(),
                "--output",
                "json",
            ];
            if let Some(sub) = subscription {
                args.extend(["--subscription", sub]);
            }
            let deployments: Vec<DeploymentEntry> =
                serde_json::from_str(&self.stdout("az", &args)?)
                    .context("unexpected `az cognitiveservices` output")?;
            info!("deployments for cognitive services account {}:", account.name);
            for deployment in deployments {
                let descriptor = deployment.descriptor();
                info!("{descriptor}");
                inventory.ai_deployments.push(descriptor);
            }
        }

        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::process::CommandOutput;
    use crate::util::process::fake::ScriptedRunner;

    #[test]
    fn extracts_group_from_portal_link() {
        let out = "You can view the resources created under the resource group in Azure Portal:\nhttps://portal.azure.com/#@/resource/subscriptions/123/resourceGroups/rg-chat-dev/overview";
        assert_eq!(extract_resource_group(out).as_deref(), Some("rg-chat-dev"));
    }

    #[test]
    fn extracts_group_from_summary_line() {
        let out = "(✓) Done: Resource group: rg-demo.";
        assert_eq!(extract_resource_group(out).as_deref(), Some("rg-demo"));
        assert_eq!(extract_resource_group("SUCCESS: deployed"), None);
    }

    #[test]
    fn parses_env_values() {
        let vars = parse_env_values("AZURE_RESOURCE_GROUP=\"rg-x\"\nAZURE_SUBSCRIPTION_ID=\"sub\"\n");
        assert_eq!(vars["AZURE_RESOURCE_GROUP"], "rg-x");
        assert_eq!(vars["AZURE_SUBSCRIPTION_ID"], "sub");
    }

    #[test]
    fn falls_back_to_env_state() {
        let runner = ScriptedRunner::default().on(
            "azd env get-values",
            vec![CommandOutput::success("AZURE_RESOURCE_GROUP=\"rg-env\"\n")],
        );
        let lister = ResourceLister::new(&runner, Path::new("."), Duration::from_secs(1));
        let (group, sub) = lister.resolve_target("no group here").unwrap();
        assert_eq!(group, "rg-env");
        assert_eq!(sub, None);
    }

    #[test]
    fn lists_types_and_ai_deployments() {
        let runner = ScriptedRunner::default()
            .on(
                "az resource list",
                vec![CommandOutput::success(
                    r#"[{"type":"Microsoft.Web/sites","name":"web"},{"type":"Microsoft.CognitiveServices/accounts","name":"ai"}]"#,
                )],
            )
            .on(
                "az cognitiveservices account deployment list",
                vec![CommandOutput::success(
                    r#"[{"properties":{"model":{"format":"OpenAI","name":"gpt-4o","version":"2024-05-13"}},"sku":{"name":"Standard"}}]"#,
                )],
            );
        let lister = ResourceLister::new(&runner, Path::new("."), Duration::from_secs(1));
        let inventory = lister.list("rg-x", Some("sub")).unwrap();

        assert_eq!(
            inventory.resource_types,
            vec!["Microsoft.Web/sites", "Microsoft.CognitiveServices/accounts"]
        );
        assert_eq!(inventory.ai_deployments, vec!["OpenAI.Standard.gpt-4o:2024-05-13"]);
        assert!(runner.calls()[0].ends_with("--subscription sub"));

        let rendered = inventory.render();
        assert!(rendered.contains("Resource group: rg-x"));
        assert!(rendered.contains("  - OpenAI.Standard.gpt-4o:2024-05-13"));
    }

    #[test]
    fn failed_listing_is_an_error() {
        let runner = ScriptedRunner::default().on(
            "az resource list",
            vec![CommandOutput::failure(1, "", "not logged in")],
        );
        let lister = ResourceLister::new(&runner, Path::new("."), Duration::from_secs(1));
        assert!(lister.list("rg-x", None).is_err());
    }
}
