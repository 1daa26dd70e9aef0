use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::report::format::{Sign, fail_item, pass_item, sub_item};
use crate::rules::severity::Severity;
use crate::util::walk::all_dirs;
use crate::validators::file::WILDCARD_PATH;
use crate::validators::{Validator, Verdict};

/// Checks that `folder_name` exists directly under one of the candidate
/// parents. A `"*"` candidate expands to `root` plus every directory below it.
#[derive(Debug, Clone)]
pub struct FolderValidator {
    pub name: String,
    pub catalog: String,
    pub severity: Severity,
    pub folder_name: String,
    pub root: PathBuf,
    pub candidate_paths: Vec<String>,
}

impl FolderValidator {
    pub fn new(
        catalog: impl Into<String>,
        folder_name: impl Into<String>,
        root: impl Into<PathBuf>,
        candidate_paths: Vec<String>,
    ) -> Self {
        let folder_name = folder_name.into();
        Self {
            name: folder_name.clone(),
            catalog: catalog.into(),
            severity: Severity::default(),
            folder_name,
            root: root.into(),
            candidate_paths,
        }
    }

    fn expanded_parents(&self) -> Vec<PathBuf> {
        let mut parents = Vec::new();
        for candidate in &self.candidate_paths {
            if candidate == WILDCARD_PATH {
                parents.extend(all_dirs(&self.root));
            } else {
                parents.push(self.root.join(candidate));
            }
        }
        parents
    }
}

impl Validator for FolderValidator {
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
        debug!("checking for {} folder in candidate folders", self.folder_name);

        let found = self
            .expanded_parents()
            .into_iter()
            .map(|parent| parent.join(&self.folder_name))
            .find(|path| path.is_dir());

        match found {
            Some(path) => {
                debug!("- {} found at {}", self.folder_name, path.display());
                Ok(Verdict::pass(pass_item(&format!("{} Folder", self.folder_name))))
            }
            None => {
                let sign = Sign::for_failure(self.severity);
                Ok(Verdict::fail(fail_item(
                    sign,
                    &format!("{} Folder", self.folder_name),
                    &sub_item(sign, &format!("Error: {} folder is missing.", self.folder_name)),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_folder_in_explicit_candidate() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".github/workflows")).unwrap();

        let v = FolderValidator::new("c", "workflows", dir.path(), vec![".github".into()]);
        let verdict = v.validate().unwrap();
        assert!(verdict.passed);
        assert_eq!(verdict.message, pass_item("workflows Folder"));
    }

    #[test]
    fn missing_folder_fails_with_detail() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = FolderValidator::new("c", "infra", dir.path(), vec![".".into()]);
        v.severity = Severity::High;
        let verdict = v.validate().unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.contains("  - [ ] :x: Error: infra folder is missing."));
    }

    #[test]
    fn wildcard_finds_deeply_nested_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c/target")).unwrap();
        fs::create_dir_all(dir.path().join("z")).unwrap();

        let v = FolderValidator::new("c", "target", dir.path(), vec!["*".into()]);
        assert!(v.validate().unwrap().passed);

        let v = FolderValidator::new("c", "target", dir.path(), vec![".".into(), "a".into()]);
        assert!(!v.validate().unwrap().passed);
    }

    #[test]
    fn file_with_folder_name_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("docs"), "not a dir").unwrap();
        let v = FolderValidator::new("c", "docs", dir.path(), vec![".".into()]);
        assert!(!v.validate().unwrap().passed);
    }
}
