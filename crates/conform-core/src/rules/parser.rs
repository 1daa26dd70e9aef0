//! Turns a rule manifest plus run-time options into an ordered list of
//! validators.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::rules::catalog::Category;
use crate::rules::manifest::{RuleDef, RuleManifest, normalize_extensions};
use crate::util::process::{CommandRunner, DEFAULT_COMMAND_TIMEOUT};
use crate::util::retry::RetryPolicy;
use crate::util::walk::find_infra_paths;
use crate::validators::azd::{AzdCommand, AzdValidator};
use crate::validators::file::FileValidator;
use crate::validators::folder::FolderValidator;
use crate::validators::playwright::PlaywrightValidator;
use crate::validators::psrule::PsRuleValidator;
use crate::validators::topic::TopicValidator;
use crate::validators::{Validator, ValidatorKind};

/// Sentinel accepted by list-valued options to switch a check off.
pub const DISABLED_SENTINEL: &str = "None";

/// A file requested explicitly on the command line, e.g. `README.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub name: String,
    /// With leading dot; `""` for extensionless files.
    pub ext: String,
}

impl PathSpec {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let path = Path::new(raw);
        let name = path.file_stem()?.to_string_lossy().into_owned();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Some(Self { name, ext })
    }
}

/// Which file/folder rules run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathSelection {
    /// Every file and folder rule in the manifest.
    #[default]
    All,
    /// No file or folder rule.
    Disabled,
    /// Only the named rules, creating ad-hoc file rules for unknown names.
    Only(Vec<PathSpec>),
}

impl PathSelection {
    pub fn from_arg(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None => PathSelection::All,
            Some(DISABLED_SENTINEL) => PathSelection::Disabled,
            Some(list) => {
                let specs: Vec<PathSpec> = list.split(',').filter_map(PathSpec::parse).collect();
                if specs.is_empty() {
                    PathSelection::All
                } else {
                    PathSelection::Only(specs)
                }
            }
        }
    }
}

/// Where the expected topic set comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicSelection {
    #[default]
    Manifest,
    Disabled,
    Override(Vec<String>),
}

impl TopicSelection {
    pub fn from_arg(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None => TopicSelection::Manifest,
            Some(DISABLED_SENTINEL) => TopicSelection::Disabled,
            Some(list) => TopicSelection::Override(split_csv(list)),
        }
    }
}

/// Run-time switches that shape which validators are built and how.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub repo_path: PathBuf,
    pub validate_azd: bool,
    pub validate_paths: PathSelection,
    /// Raw comma-separated topics actually set on the repository.
    pub topics: Option<String>,
    pub expected_topics: TopicSelection,
    pub psrule_result: Option<PathBuf>,
    pub validate_playwright: bool,
    pub command_timeout: Duration,
    pub retry: RetryPolicy,
}

impl RunOptions {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            validate_azd: false,
            validate_paths: PathSelection::All,
            topics: None,
            expected_topics: TopicSelection::Manifest,
            psrule_result: None,
            validate_playwright: false,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Environment variable carrying content markers for `rule`,
/// e.g. `README.md` -> `README_MD_H2_TAG`.
pub fn marker_env_var(rule: &str) -> String {
    format!("{}_H2_TAG", rule.to_uppercase().replace('.', "_"))
}

type EnvLookup<'a> = Box<dyn Fn(&str) -> Option<String> + 'a>;

pub struct RuleParser<'a> {
    manifest: RuleManifest,
    options: &'a RunOptions,
    runner: Arc<dyn CommandRunner>,
    env: EnvLookup<'a>,
}

impl<'a> RuleParser<'a> {
    pub fn new(
        manifest: RuleManifest,
        options: &'a RunOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            manifest,
            options,
            runner,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the process environment as the source of marker overrides.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.env = Box::new(lookup);
        self
    }

    /// `Some(None)` means the override explicitly disables marker checks.
    fn marker_override(&self, rule: &str) -> Option<Option<Vec<String>>> {
        let raw = (self.env)(&marker_env_var(rule))?;
        let raw = raw.trim();
        if raw == DISABLED_SENTINEL {
            return Some(None);
        }
        Some(Some(split_csv(raw)))
    }

    fn apply_path_overrides(&mut self) {
        let PathSelection::Only(specs) = &self.options.validate_paths else {
            return;
        };
        for spec in specs {
            let ext = normalize_extensions(std::slice::from_ref(&spec.ext));
            match self.manifest.get_mut(&spec.name) {
                Some(def) => {
                    debug!(rule = %spec.name, ?ext, "overriding rule extensions");
                    def.ext = ext;
                }
                None => {
                    debug!(rule = %spec.name, ?ext, "adding ad-hoc file rule");
                    self.manifest
                        .insert(spec.name.clone(), RuleDef::file(Category::SourceCodeStructure.key(), ext));
                }
            }
        }
    }

    fn path_rule_enabled(&self, name: &str) -> bool {
        match &self.options.validate_paths {
            PathSelection::All => true,
            PathSelection::Disabled => false,
            PathSelection::Only(specs) => specs.iter().any(|s| s.name == name),
        }
    }

    fn infra_paths(&self) -> Vec<PathBuf> {
        let found = find_infra_paths(&self.options.repo_path);
        if found.is_empty() {
            debug!("no infra manifest found; using repository root");
            vec![self.options.repo_path.clone()]
        } else {
            found
        }
    }

    fn file_validator(&self, name: &str, def: &RuleDef) -> FileValidator {
        let mut v = FileValidator::new(
            def.catalog.as_str(),
            name,
            normalize_extensions(&def.ext),
            &self.options.repo_path,
        );
        v.severity = def.severity;
        v.candidate_paths = def.candidate_paths();
        v.case_sensitive = def.case_sensitive;
        v.accept_folder = def.accept_folder;
        v.content_markers = match self.marker_override(name) {
            Some(markers) => markers,
            None => def.assert_in.clone(),
        };
        v
    }

    fn azd_validator(&self, def: &RuleDef, command: AzdCommand, folder: &Path) -> AzdValidator {
        let mut v = AzdValidator::new(
            def.catalog.as_str(),
            command,
            &self.options.repo_path,
            folder,
            self.runner.clone(),
        );
        v.severity = def.severity;
        v.retry = self.options.retry.clone();
        v.timeout = self.options.command_timeout;
        v
    }

    /// Build the validators in execution order.
    ///
    /// Each infrastructure path yields an `azd up` immediately followed by
    /// its `azd down`; a path is paired at most once even if several
    /// manifest rules ask for it.
    pub fn parse(mut self) -> Vec<Box<dyn Validator>> {
        self.apply_path_overrides();

        let mut validators: Vec<Box<dyn Validator>> = Vec::new();
        let mut paired: HashSet<PathBuf> = HashSet::new();
        let rules = std::mem::take(&mut self.manifest);

        for (name, def) in rules {
            let Some(kind) = ValidatorKind::from_tag(&def.validator) else {
                debug!(rule = %name, validator = %def.validator, "skipping unknown validator kind");
                continue;
            };

            match kind {
                ValidatorKind::File => {
                    if !self.path_rule_enabled(&name) {
                        continue;
                    }
                    validators.push(Box::new(self.file_validator(&name, &def)));
                }
                ValidatorKind::Folder => {
                    if !self.path_rule_enabled(&name) {
                        continue;
                    }
                    let mut v = FolderValidator::new(
                        def.catalog.as_str(),
                        name.as_str(),
                        &self.options.repo_path,
                        def.candidate_paths(),
                    );
                    v.severity = def.severity;
                    validators.push(Box::new(v));
                }
                ValidatorKind::Topic => {
                    let expected = match &self.options.expected_topics {
                        TopicSelection::Disabled => continue,
                        TopicSelection::Manifest => def.topics.clone(),
                        TopicSelection::Override(topics) => topics.clone(),
                    };
                    let mut v = TopicValidator::new(
                        def.catalog.as_str(),
                        name.as_str(),
                        expected,
                        self.options.topics.clone(),
                    );
                    v.severity = def.severity;
                    validators.push(Box::new(v));
                }
                ValidatorKind::Azd => {
                    if !self.options.validate_azd {
                        continue;
                    }
                    for folder in self.infra_paths() {
                        if !paired.insert(folder.clone()) {
                            debug!(path = %folder.display(), "azd pair already scheduled");
                            continue;
                        }
                        validators.push(Box::new(self.azd_validator(&def, AzdCommand::Up, &folder)));
                        validators.push(Box::new(self.azd_validator(&def, AzdCommand::Down, &folder)));
                    }
                }
                ValidatorKind::PsRule => {
                    let mut v =
                        PsRuleValidator::new(def.catalog.as_str(), self.options.psrule_result.clone());
                    v.severity = def.severity;
                    validators.push(Box::new(v));
                }
                ValidatorKind::Playwright => {
                    if !self.options.validate_playwright {
                        continue;
                    }
                    let mut v = PlaywrightValidator::new(
                        def.catalog.as_str(),
                        &self.options.repo_path,
                        self.runner.clone(),
                    );
                    v.severity = def.severity;
                    v.retry = self.options.retry.clone();
                    v.timeout = self.options.command_timeout;
                    validators.push(Box::new(v));
                }
            }
        }

        debug!(count = validators.len(), "validators built");
        validators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::severity::Severity;
    use crate::util::process::fake::ScriptedRunner;
    use std::collections::HashMap;
    use std::fs;

    const MANIFEST: &str = r###"{
        "README": {
            "catalog": "Repository Management",
            "ext": [".md"],
            "candidate_path": ["."],
            "assert_in": ["## Features", "## Getting Started"],
            "validator": "FileValidator",
            "level": "high"
        },
        "infra": {"catalog": "source_code_structure", "validator": "FolderValidator"},
        "azd": {"catalog": "Functional Requirements", "validator": "AzdValidator", "level": "high"},
        "expected_topics": {
            "catalog": "Repository Management",
            "topics": ["azd-templates", "ai-azd-templates"],
            "validator": "TopicValidator",
            "level": "high"
        },
        "msdo": {"catalog": "security_requirements", "validator": "MsdoValidator"},
        "psrule": {"catalog": "security_requirements", "validator": "PSRuleValidator"}
    }"###;

    fn manifest() -> RuleManifest {
        RuleManifest::from_json(MANIFEST).unwrap()
    }

    fn runner() -> Arc<dyn CommandRunner> {
        Arc::new(ScriptedRunner::default())
    }

    fn names(validators: &[Box<dyn Validator>]) -> Vec<String> {
        validators.iter().map(|v| v.name().to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_run_skips_azd_and_unknown_kinds() {
        let options = RunOptions::new("/repo");
        let validators = RuleParser::new(manifest(), &options, runner())
            .with_env(no_env)
            .parse();
        assert_eq!(
            names(&validators),
            vec!["README", "infra", "expected_topics", "PSRuleValidator"]
        );
        assert_eq!(validators[0].severity(), Severity::High);
        assert_eq!(validators[0].catalog(), "Repository Management");
        assert_eq!(validators[1].severity(), Severity::Moderate);
    }

    #[test]
    fn azd_pairs_follow_each_infra_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::create_dir_all(dir.path().join("samples/chat")).unwrap();
        fs::write(dir.path().join("app/azure.yaml"), "name: app").unwrap();
        fs::write(dir.path().join("samples/chat/azure.yml"), "name: chat").unwrap();

        let mut options = RunOptions::new(dir.path());
        options.validate_azd = true;
        options.validate_paths = PathSelection::Disabled;
        options.expected_topics = TopicSelection::Disabled;
        let validators = RuleParser::new(manifest(), &options, runner())
            .with_env(no_env)
            .parse();

        assert_eq!(
            names(&validators),
            vec!["azd up", "azd down", "azd up", "azd down", "PSRuleValidator"]
        );
        assert!(validators.iter().take(4).all(|v| v.severity() == Severity::High));
    }

    #[test]
    fn azd_without_manifest_uses_repo_root_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = RunOptions::new(dir.path());
        options.validate_azd = true;
        options.validate_paths = PathSelection::Disabled;
        let twice = RuleManifest::from_json(
            r#"{"azd up": {"catalog": "functional_requirements", "validator": "AzdValidator"},
                "azd down": {"catalog": "functional_requirements", "validator": "AzdValidator"}}"#,
        )
        .unwrap();
        let validators = RuleParser::new(twice, &options, runner()).with_env(no_env).parse();
        assert_eq!(names(&validators), vec!["azd up", "azd down"]);
    }

    #[test]
    fn explicit_paths_filter_and_synthesize() {
        let mut options = RunOptions::new("/repo");
        options.validate_paths = PathSelection::from_arg(Some("README.markdown,.env,azure.yml"));
        let validators = RuleParser::new(manifest(), &options, runner())
            .with_env(no_env)
            .parse();
        assert_eq!(
            names(&validators),
            vec!["README", "expected_topics", "PSRuleValidator", ".env", "azure"]
        );
        assert_eq!(validators[3].catalog(), "source_code_structure");
    }

    #[test]
    fn expected_topics_override_and_disable() {
        let mut options = RunOptions::new("/repo");
        options.validate_paths = PathSelection::Disabled;
        options.expected_topics = TopicSelection::from_arg(Some("None"));
        let validators = RuleParser::new(manifest(), &options, runner())
            .with_env(no_env)
            .parse();
        assert_eq!(names(&validators), vec!["PSRuleValidator"]);

        options.expected_topics = TopicSelection::from_arg(Some("x, y"));
        options.topics = Some("x".into());
        let validators = RuleParser::new(manifest(), &options, runner())
            .with_env(no_env)
            .parse();
        let verdict = validators[0].validate().unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.contains("Error: y is missing in topics."));
    }

    #[test]
    fn marker_env_overrides_and_disables() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "## Usage\n").unwrap();
        let mut options = RunOptions::new(dir.path());
        options.validate_paths = PathSelection::from_arg(Some("README.md"));

        let env: HashMap<String, String> =
            HashMap::from([("README_H2_TAG".to_string(), "## Usage".to_string())]);
        let validators = RuleParser::new(manifest(), &options, runner())
            .with_env(|k| env.get(k).cloned())
            .parse();
        assert!(validators[0].validate().unwrap().passed);

        let validators = RuleParser::new(manifest(), &options, runner())
            .with_env(|k| (k == "README_H2_TAG").then(|| "None".to_string()))
            .parse();
        assert!(validators[0].validate().unwrap().passed);

        let validators = RuleParser::new(manifest(), &options, runner())
            .with_env(no_env)
            .parse();
        assert!(!validators[0].validate().unwrap().passed);
    }

    #[test]
    fn env_var_names() {
        assert_eq!(marker_env_var("README"), "README_H2_TAG");
        assert_eq!(marker_env_var("readme.md"), "README_MD_H2_TAG");
    }

    #[test]
    fn path_spec_parsing() {
        assert_eq!(
            PathSpec::parse(" README.md "),
            Some(PathSpec { name: "README".into(), ext: ".md".into() })
        );
        assert_eq!(
            PathSpec::parse("LICENSE"),
            Some(PathSpec { name: "LICENSE".into(), ext: "".into() })
        );
        assert_eq!(
            PathSpec::parse(".gitignore"),
            Some(PathSpec { name: ".gitignore".into(), ext: "".into() })
        );
        assert_eq!(PathSpec::parse(""), None);
        assert_eq!(PathSelection::from_arg(None), PathSelection::All);
        assert_eq!(PathSelection::from_arg(Some("None")), PathSelection::Disabled);
    }
}
