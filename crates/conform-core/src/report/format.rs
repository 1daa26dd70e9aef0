//! Pure formatting helpers for report items.
//!
//! Every function here takes its inputs explicitly and returns a fresh
//! `String`; there is no shared template state.

use crate::rules::severity::Severity;

pub const LINE_DELIMITER: &str = "\n";

pub const DETAILS_HELP_LINK: &str = "https://aka.ms/ai-template-standards";

pub const HEADER_PREFIX: &str = "# AI Gallery Standard Validation: ";

/// Visual markers used in the Markdown report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Check,
    Block,
    Warning,
}

impl Sign {
    pub fn as_str(self) -> &'static str {
        match self {
            Sign::Check => ":heavy_check_mark:",
            Sign::Block => ":x:",
            Sign::Warning => ":warning:",
        }
    }

    /// Failure marker for a rule of the given severity.
    pub fn for_failure(severity: Severity) -> Self {
        if severity.is_blocking() {
            Sign::Block
        } else {
            Sign::Warning
        }
    }
}

impl std::fmt::Display for Sign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn pass_item(message: &str) -> String {
    format!(
        "<details><summary>{} <b>{message}</b>.</summary></details>",
        Sign::Check
    )
}

/// A passing item that still carries an expandable body (e.g. deployed resources).
pub fn pass_item_with_details(message: &str, details: &str) -> String {
    format!(
        "<details><summary>{} <b>{message}</b>.</summary>\n\n{details}\n\n</details>",
        Sign::Check
    )
}

pub fn fail_item(sign: Sign, message: &str, details: &str) -> String {
    format!(
        "<details><summary>{sign} <b>{message}</b>. <a href={DETAILS_HELP_LINK}>[How to fix?]</a></summary>\n\n{details}\n\n</details>"
    )
}

pub fn sub_item(sign: Sign, message: &str) -> String {
    format!("  - [ ] {sign} {message}")
}

/// Fenced block for captured process output.
pub fn output_block(output: &str) -> String {
    format!("```\n{}\n```", output.trim_end())
}

pub fn how_to_fix() -> String {
    format!(
        "## <i>How to fix?</i>\n<b>The full Definition of Done of the AI-Gallery template and fix approached can be found [HERE]({DETAILS_HELP_LINK}).</b>"
    )
}

/// Indent every line after the first by `count` spaces.
pub fn indent(text: &str, count: usize) -> String {
    let pad = " ".repeat(count);
    text.split_inclusive('\n')
        .collect::<Vec<_>>()
        .join(&pad)
}
