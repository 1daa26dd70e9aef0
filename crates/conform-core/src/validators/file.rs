use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::report::format::{LINE_DELIMITER, Sign, fail_item, pass_item, sub_item};
use crate::rules::severity::Severity;
use crate::util::walk::{normalize_key, relative_key, sorted_walk};
use crate::validators::{Validator, Verdict};

/// Candidate path that matches every directory visited by the walk.
pub const WILDCARD_PATH: &str = "*";

/// Looks for `<file_name><ext>` in any of the candidate directories under
/// `root`, optionally asserting content markers inside the matched file.
///
/// The walk stops at the first hit; with a wildcard candidate that is the
/// first matching directory in sorted walk order, not the best one.
#[derive(Debug, Clone)]
pub struct FileValidator {
    pub name: String,
    pub catalog: String,
    pub severity: Severity,
    pub file_name: String,
    /// Each entry carries its leading dot; `""` means "no extension".
    pub extensions: Vec<String>,
    pub root: PathBuf,
    pub candidate_paths: Vec<String>,
    pub content_markers: Option<Vec<String>>,
    pub case_sensitive: bool,
    pub accept_folder: bool,
}

impl FileValidator {
    pub fn new(
        catalog: impl Into<String>,
        file_name: impl Into<String>,
        extensions: Vec<String>,
        root: impl Into<PathBuf>,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            name: file_name.clone(),
            catalog: catalog.into(),
            severity: Severity::default(),
            file_name,
            extensions,
            root: root.into(),
            candidate_paths: vec![".".to_string()],
            content_markers: None,
            case_sensitive: false,
            accept_folder: false,
        }
    }

    fn extensions(&self) -> Vec<&str> {
        if self.extensions.is_empty() {
            vec![""]
        } else {
            self.extensions.iter().map(String::as_str).collect()
        }
    }

    /// Name reported when nothing is found: the file with its first extension.
    fn expected_name(&self) -> String {
        format!("{}{}", self.file_name, self.extensions()[0])
    }

    fn fold(&self, s: &str) -> String {
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }

    fn dir_matches(&self, dir: &Path, candidates: &[String], wildcard: bool) -> bool {
        wildcard || candidates.contains(&self.fold(&relative_key(&self.root, dir)))
    }

    fn check_markers(&self, path: &Path, found: &str, display: &str) -> Result<Verdict> {
        let Some(markers) = &self.content_markers else {
            return Ok(Verdict::pass(pass_item(&format!("{display} File"))));
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let content = self.fold(&content);
        let sign = Sign::for_failure(self.severity);

        let missing: Vec<String> = markers
            .iter()
            .filter(|marker| !content.contains(&self.fold(marker)))
            .map(|marker| sub_item(sign, &format!("Error: {marker} is missing in {found}.")))
            .collect();

        if missing.is_empty() {
            Ok(Verdict::pass(pass_item(&format!("{display} File"))))
        } else {
            debug!(file = %path.display(), missing = missing.len(), "content markers missing");
            Ok(Verdict::fail(fail_item(
                sign,
                &format!("{display} File"),
                &missing.join(LINE_DELIMITER),
            )))
        }
    }

    fn missing(&self) -> Verdict {
        let expected = self.expected_name();
        let (summary, detail) = if self.accept_folder {
            (
                format!("{expected} File or {} Folder", self.file_name),
                format!("Error: {expected} file or {} folder is missing.", self.file_name),
            )
        } else {
            (
                format!("{expected} File"),
                format!("Error: {expected} file is missing."),
            )
        };
        let sign = Sign::for_failure(self.severity);
        Verdict::fail(fail_item(sign, &summary, &sub_item(sign, &detail)))
    }
}

impl Validator for FileValidator {
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
        debug!(
            "{}: checking for file {} with {:?} under {} in {:?} (case sensitive: {})",
            self.name,
            self.file_name,
            self.extensions,
            self.root.display(),
            self.candidate_paths,
            self.case_sensitive
        );

        let wildcard = self.candidate_paths.iter().any(|p| p == WILDCARD_PATH);
        let candidates: Vec<String> = self
            .candidate_paths
            .iter()
            .map(|p| self.fold(&normalize_key(p)))
            .collect();

        for dir in sorted_walk(&self.root).filter(|e| e.file_type().is_dir()) {
            if !self.dir_matches(dir.path(), &candidates, wildcard) {
                continue;
            }

            let mut files = Vec::new();
            let mut dirs = Vec::new();
            if let Ok(entries) = fs::read_dir(dir.path()) {
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    match entry.file_type() {
                        Ok(t) if t.is_dir() => dirs.push(name),
                        Ok(_) => files.push(name),
                        Err(_) => {}
                    }
                }
            }
            files.sort();

            for ext in self.extensions() {
                let candidate = self.fold(&format!("{}{ext}", self.file_name));
                if let Some(found) = files.iter().find(|f| self.fold(f) == candidate) {
                    debug!("- {found} is found in {}", dir.path().display());
                    let display = format!("{}{ext}", self.file_name);
                    return self.check_markers(&dir.path().join(found), found, &display);
                }
            }

            if self.accept_folder && dirs.iter().any(|d| d == &self.file_name) {
                debug!("- {} folder is found in {}", self.file_name, dir.path().display());
                return Ok(Verdict::pass(pass_item(&format!("{} Folder", self.file_name))));
            }
        }

        Ok(self.missing())
    }
}
