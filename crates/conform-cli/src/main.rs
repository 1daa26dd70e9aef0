use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use conform_core::report::{model::ToolInfo, render};
use conform_core::rules::manifest::RuleManifest;
use conform_core::rules::parser::{PathSelection, RunOptions, TopicSelection};
use conform_core::util::process::SystemRunner;
use conform_core::validate_repo;

mod args;

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_options(args: &args::Args) -> RunOptions {
    let mut options = RunOptions::new(&args.repo_path);
    options.validate_azd = args.validate_azd;
    options.validate_paths = PathSelection::from_arg(args.validate_paths.as_deref());
    options.topics = args.topics.clone();
    options.expected_topics = TopicSelection::from_arg(args.expected_topics.as_deref());
    options.psrule_result = args.psrule_result.clone();
    options.validate_playwright = args.validate_playwright;
    options.command_timeout = Duration::from_secs(args.command_timeout);
    options
}

fn main() -> Result<()> {
    let args = args::Args::parse();
    init_logging(args.debug);
    debug!(?args, "parsed arguments");

    let manifest = match &args.rules {
        Some(path) => RuleManifest::load(path)?,
        None => RuleManifest::embedded().context("built-in rule manifest is invalid")?,
    };

    let tool = ToolInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let report = validate_repo(&run_options(&args), manifest, Arc::new(SystemRunner), tool)?;

    let output = match args.format {
        args::OutputFormat::Markdown => render::render_markdown(&report),
        args::OutputFormat::Json => render::render_json(&report)?,
    };

    match &args.output {
        Some(path) => std::fs::write(path, &output)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{output}"),
    }

    std::process::exit(report.exit_code(args.strict));
}
