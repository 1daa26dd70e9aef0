//! Check kinds dispatched by the rule parser.
//!
//! Every kind implements [`Validator`]. Expected negatives (missing file,
//! failed command) come back as `Ok(Verdict { passed: false, .. })`; only
//! unexpected faults are returned as `Err`, and the execution engine turns
//! those into failed outcomes as well.

pub mod azd;
pub mod file;
pub mod folder;
pub mod playwright;
pub mod psrule;
pub mod topic;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::rules::severity::Severity;

/// Pass/fail plus the pre-rendered report message of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
}

impl Verdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// Common contract of every check kind.
pub trait Validator {
    fn name(&self) -> &str;

    /// Raw catalog value from the manifest; resolved to a bucket at aggregation.
    fn catalog(&self) -> &str;

    fn severity(&self) -> Severity;

    fn validate(&self) -> Result<Verdict>;
}

/// Manifest `validator` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    File,
    Folder,
    Topic,
    Azd,
    PsRule,
    Playwright,
}

impl ValidatorKind {
    /// `None` for tags this build does not know; such rules are skipped.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "FileValidator" => Some(ValidatorKind::File),
            "FolderValidator" => Some(ValidatorKind::Folder),
            "TopicValidator" => Some(ValidatorKind::Topic),
            "AzdValidator" => Some(ValidatorKind::Azd),
            "PSRuleValidator" => Some(ValidatorKind::PsRule),
            "PlaywrightValidator" => Some(ValidatorKind::Playwright),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ValidatorKind::File => "FileValidator",
            ValidatorKind::Folder => "FolderValidator",
            ValidatorKind::Topic => "TopicValidator",
            ValidatorKind::Azd => "AzdValidator",
            ValidatorKind::PsRule => "PSRuleValidator",
            ValidatorKind::Playwright => "PlaywrightValidator",
        }
    }
}
