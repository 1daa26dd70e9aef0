use crate::report::format::{HEADER_PREFIX, LINE_DELIMITER, how_to_fix};
use crate::report::model::{Conformance, Report};

pub fn header(report: &Report) -> String {
    match report.conformance {
        Conformance::Conforming => format!("{HEADER_PREFIX}{}", report.conformance),
        Conformance::NonConforming => format!(
            "{HEADER_PREFIX}{}, Severity: {}",
            report.conformance, report.severity
        ),
    }
}

/// Markdown report: verdict header, one section per non-empty category,
/// and a "How to fix" footer when anything failed.
pub fn render_markdown(report: &Report) -> String {
    let mut lines = vec![header(report)];
    for section in &report.categories {
        if section.outcomes.is_empty() {
            continue;
        }
        lines.push(format!("\n## {}:", section.label));
        lines.extend(section.outcomes.iter().map(|o| o.message.clone()));
    }
    if !report.passed() {
        lines.push(format!("\n{}", how_to_fix()));
    }
    lines.join(LINE_DELIMITER)
}

pub fn render_json(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::model::{CategorySection, ToolInfo};
    use crate::rules::catalog::Category;
    use crate::rules::eval::Outcome;
    use crate::rules::severity::Severity;

    fn section(category: Category, outcomes: Vec<(bool, Severity, &str)>) -> CategorySection {
        CategorySection {
            category,
            label: category.label().into(),
            outcomes: outcomes
                .into_iter()
                .map(|(passed, severity, message)| Outcome {
                    name: "n".into(),
                    catalog: category.key().into(),
                    severity,
                    passed,
                    message: message.into(),
                })
                .collect(),
        }
    }

    #[test]
    fn conforming_report_has_no_footer() {
        let report = Report::new(
            ToolInfo::default(),
            vec![section(
                Category::RepositoryManagement,
                vec![(true, Severity::High, "readme ok")],
            )],
        );
        assert_eq!(
            render_markdown(&report),
            "# AI Gallery Standard Validation: CONFORMING\n\n## Repository Management:\nreadme ok"
        );
    }

    #[test]
    fn failing_report_names_severity_and_links_help() {
        let report = Report::new(
            ToolInfo::default(),
            vec![
                section(Category::RepositoryManagement, vec![]),
                section(
                    Category::SecurityRequirements,
                    vec![(false, Severity::Moderate, "scan failed")],
                ),
            ],
        );
        let out = render_markdown(&report);
        assert!(out.starts_with("# AI Gallery Standard Validation: NON-CONFORMING, Severity: Moderate\n"));
        assert!(out.contains("\n## Security Requirements:\nscan failed"));
        assert!(!out.contains("Repository Management"));
        assert!(out.ends_with(&how_to_fix()));
    }

    #[test]
    fn json_carries_conformance() {
        let report = Report::new(ToolInfo::default(), vec![]);
        let json = render_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["conformance"], "CONFORMING");
        assert_eq!(value["severity"], "Low");
    }
}
