use anyhow::Result;
use tracing::debug;

use crate::report::format::{LINE_DELIMITER, Sign, fail_item, pass_item, sub_item};
use crate::rules::severity::Severity;
use crate::validators::{Validator, Verdict};

/// Checks that the repository topics cover every expected topic.
///
/// `actual` is the raw comma-separated string handed over by CI; quotes are
/// stripped, matching is exact and case-sensitive.
#[derive(Debug, Clone)]
pub struct TopicValidator {
    pub name: String,
    pub catalog: String,
    pub severity: Severity,
    pub expected: Vec<String>,
    pub actual: Option<String>,
}

impl TopicValidator {
    pub fn new(
        catalog: impl Into<String>,
        name: impl Into<String>,
        expected: Vec<String>,
        actual: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            catalog: catalog.into(),
            severity: Severity::default(),
            expected,
            actual,
        }
    }
}

impl Validator for TopicValidator {
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
        debug!("checking for topics {:?}", self.expected);
        let sign = Sign::for_failure(self.severity);

        let details: Vec<String> = match &self.actual {
            None => vec![sub_item(sign, "Error: topics string is NULL.")],
            Some(raw) => {
                let stripped = raw.replace(['"', '\''], "");
                let actual: Vec<&str> = stripped.split(',').map(str::trim).collect();
                self.expected
                    .iter()
                    .filter(|topic| !actual.contains(&topic.as_str()))
                    .map(|topic| sub_item(sign, &format!("Error: {topic} is missing in topics.")))
                    .collect()
            }
        };

        let summary = format!("Topics on repo contains {:?}", self.expected);
        if details.is_empty() {
            Ok(Verdict::pass(pass_item(&summary)))
        } else {
            Ok(Verdict::fail(fail_item(
                sign,
                &summary,
                &details.join(LINE_DELIMITER),
            )))
        }
    }
}
