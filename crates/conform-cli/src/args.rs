use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "conform",
    version,
    about = "Validate a repository against the AI gallery template standards"
)]
pub struct Args {
    /// Path to the repository to validate
    pub repo_path: PathBuf,

    /// Deploy and tear down every infrastructure path with azd
    #[arg(long)]
    pub validate_azd: bool,

    /// Comma-separated files to validate (e.g. README.md,LICENSE), or "None" to skip file checks
    #[arg(long)]
    pub validate_paths: Option<String>,

    /// Comma-separated topics set on the repository
    #[arg(long)]
    pub topics: Option<String>,

    /// Comma-separated expected topics overriding the rules, or "None" to skip the topic check
    #[arg(long)]
    pub expected_topics: Option<String>,

    /// PSRule results file produced by the security scan
    #[arg(long, visible_alias = "msdoresult")]
    pub psrule_result: Option<PathBuf>,

    /// Run the repository's Playwright tests
    #[arg(long)]
    pub validate_playwright: bool,

    /// Rule manifest to use instead of the built-in one
    #[arg(long, env = "CONFORM_RULES")]
    pub rules: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "markdown")]
    pub format: OutputFormat,

    /// Exit non-zero for a non-conforming repository (1 = warnings, 2 = blocking)
    #[arg(long)]
    pub strict: bool,

    /// Seconds before an external command is killed
    #[arg(long, default_value_t = 3600)]
    pub command_timeout: u64,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}
