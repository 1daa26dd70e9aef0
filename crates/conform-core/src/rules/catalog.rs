use serde::{Deserialize, Serialize};

use crate::error::ConformError;

/// The four fixed report buckets every rule belongs to.
///
/// Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    RepositoryManagement,
    SourceCodeStructure,
    FunctionalRequirements,
    SecurityRequirements,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::RepositoryManagement,
        Category::SourceCodeStructure,
        Category::FunctionalRequirements,
        Category::SecurityRequirements,
    ];

    /// Key searched for inside a rule's `catalog` string.
    pub fn key(self) -> &'static str {
        match self {
            Category::RepositoryManagement => "repository_management",
            Category::SourceCodeStructure => "source_code_structure",
            Category::FunctionalRequirements => "functional_requirements",
            Category::SecurityRequirements => "security_requirements",
        }
    }

    /// Section heading used in the rendered report.
    pub fn label(self) -> &'static str {
        match self {
            Category::RepositoryManagement => "Repository Management",
            Category::SourceCodeStructure => "Source code structure and conventions",
            Category::FunctionalRequirements => "Functional Requirements",
            Category::SecurityRequirements => "Security Requirements",
        }
    }

    /// Resolve a manifest catalog value to its bucket.
    ///
    /// The value is lowercased and spaces/hyphens become underscores before
    /// the substring test, so `"Repository Management"` and
    /// `"repository_management_readme"` both land in the same bucket.
    /// Anything else is a configuration error.
    pub fn resolve(catalog: &str) -> Result<Self, ConformError> {
        let normalized: String = catalog
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        Self::ALL
            .into_iter()
            .find(|c| normalized.contains(c.key()))
            .ok_or_else(|| ConformError::UnknownCatalog(catalog.to_string()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
