use anyhow::{bail, Context, Result};
use clap::Parser;
use prism_review::analysis::analyze;
use prism_review::config::{find_config_file, ReviewConfig};
use prism_review::diff::parse_diff;
use prism_review::git_ops::working_tree_diff;
use prism_review::platform::{create_platform, PlatformName};
use prism_review::report::render_markdown;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "prism-review",
    about = "AI-powered code review for pull request pipelines",
    version
)]
struct Args {
    /// Path to the config file (defaults to prism-review.toml found upward from cwd)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a diff file (alternative to --platform)
    #[arg(short, long)]
    diff: Option<PathBuf>,

    /// Platform to fetch the diff from and post comments to (github)
    #[arg(short, long)]
    platform: Option<String>,

    /// Pull request ID (required with --platform)
    #[arg(long)]
    pr: Option<String>,

    /// Write a markdown report to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Analyze but do not post comments
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    eprintln!("prism-review: starting analysis...");

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir().context("Failed to determine working directory")?;
            find_config_file(&cwd).context(
                "No prism-review.toml found. Create one or pass --config.",
            )?
        }
    };
    let config = ReviewConfig::load(&config_path)?;
    eprintln!("  Loaded config: {}", config_path.display());
    eprintln!(
        "  Provider: {} ({})",
        config.ai.provider.as_str(),
        config.ai.model
    );
    eprintln!("  Languages: {}", config.languages.join(", "));

    let platform_name = match args.platform.as_deref() {
        Some(value) => Some(
            PlatformName::parse(value)
                .with_context(|| format!("Unknown platform: {}", value))?,
        ),
        None => None,
    };
    if platform_name.is_some() && args.pr.is_none() {
        bail!("--pr is required with --platform");
    }

    // Diff source precedence: explicit file, then platform PR, then local tree
    let diff_text = if let Some(diff_path) = &args.diff {
        let content = fs::read_to_string(diff_path)
            .with_context(|| format!("Failed to read diff file: {}", diff_path.display()))?;
        eprintln!("  Loaded diff from: {}", diff_path.display());
        content
    } else if let (Some(name), Some(pr)) = (platform_name, args.pr.as_deref()) {
        let platform = create_platform(name)?;
        let content = platform.get_diff(pr).await?;
        eprintln!("  Fetched diff from {} PR #{}", name.as_str(), pr);
        content
    } else {
        let cwd = std::env::current_dir()?;
        let content = working_tree_diff(&cwd)?;
        eprintln!("  Using working tree diff against HEAD");
        content
    };

    if diff_text.trim().is_empty() {
        println!("No changes to analyze");
        return Ok(());
    }

    let diff_files = parse_diff(&diff_text);
    eprintln!("  Parsed {} file(s)", diff_files.len());

    eprintln!("  Analyzing with {}...", config.ai.provider.as_str());
    let base_path = std::env::current_dir()?;
    let result = analyze(&config, &diff_files, &base_path).await?;

    println!();
    println!("Analysis complete");
    println!("  Summary: {}", result.summary);
    println!("  Files: {}", result.metadata.files_analyzed);
    println!("  Findings: {}", result.metadata.total_findings);
    println!("    critical: {}", result.metadata.by_severity.critical);
    println!("    warning:  {}", result.metadata.by_severity.warning);
    println!("    info:     {}", result.metadata.by_severity.info);
    println!("  Duration: {}ms", result.metadata.duration_ms);

    if let Some(output) = &args.output {
        let report = render_markdown(&result);
        fs::write(output, report)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
        println!("  Report saved to: {}", output.display());
    }

    if let (Some(name), Some(pr)) = (platform_name, args.pr.as_deref()) {
        if args.dry_run {
            println!("  Dry run - no comments posted");
        } else {
            let findings: Vec<_> = result
                .files
                .iter()
                .flat_map(|f| f.findings.iter().cloned())
                .collect();

            if !findings.is_empty() {
                println!(
                    "  Posting {} comments to {}...",
                    findings.len(),
                    name.as_str()
                );
                let platform = create_platform(name)?;
                platform.post_comments(pr, &findings).await?;
                println!("  Comments posted");
            }
        }
    }

    if result.metadata.by_severity.critical > 0 {
        eprintln!();
        eprintln!(
            "Blocking: {} critical finding(s). Fix them before merging.",
            result.metadata.by_severity.critical
        );
        std::process::exit(1);
    }

    Ok(())
}
