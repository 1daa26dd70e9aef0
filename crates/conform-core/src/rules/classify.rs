//! Buckets outcomes into the four report categories and derives the verdict.
//!
//! - overall pass = every outcome passed
//! - severity = highest severity among failed outcomes, `Low` if none failed
//! - an outcome whose catalog names no category is a configuration error

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ConformError;
use crate::report::model::{CategorySection, Report, ToolInfo};
use crate::report::render::render_markdown;
use crate::rules::catalog::Category;
use crate::rules::eval::Outcome;
use crate::rules::severity::Severity;

#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    buckets: BTreeMap<Category, Vec<Outcome>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: Outcome) -> Result<Category, ConformError> {
        let category = Category::resolve(&outcome.catalog)?;
        debug!(%category, passed = outcome.passed, "outcome recorded");
        self.buckets.entry(category).or_default().push(outcome);
        Ok(category)
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = Outcome>) -> Result<(), ConformError> {
        for outcome in outcomes {
            self.add(outcome)?;
        }
        Ok(())
    }

    fn all(&self) -> impl Iterator<Item = &Outcome> {
        self.buckets.values().flatten()
    }

    pub fn overall_passed(&self) -> bool {
        self.all().all(|o| o.passed)
    }

    pub fn severity(&self) -> Severity {
        self.all()
            .filter(|o| !o.passed)
            .map(|o| o.severity)
            .max()
            .unwrap_or(Severity::Low)
    }

    pub fn outcomes(&self, category: Category) -> &[Outcome] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    /// Non-empty categories in fixed report order.
    pub fn report(&self, tool: ToolInfo) -> Report {
        let sections = Category::ALL
            .into_iter()
            .filter_map(|category| {
                let outcomes = self.buckets.get(&category)?;
                (!outcomes.is_empty()).then(|| CategorySection {
                    category,
                    label: category.label().to_string(),
                    outcomes: outcomes.clone(),
                })
            })
            .collect();
        Report::new(tool, sections)
    }

    pub fn summary(&self) -> String {
        render_markdown(&self.report(ToolInfo::default()))
    }
}
