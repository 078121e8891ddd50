//! Analysis result assembly
//!
//! Joins model findings back onto the parsed diff, computes per-file and
//! overall severity statistics, and drives the provider round trip.

use crate::config::ReviewConfig;
use crate::diff::{DiffFile, DiffLineKind};
use crate::prompt::build_prompt;
use crate::provider::{create_provider, ProviderOptions};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Severity of a finding, ordered by blocking impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Parse a severity token from the closed set, rejecting anything else
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "info" => Some(Severity::Info),
            "warning" => Some(Severity::Warning),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Info => "🔵",
            Severity::Warning => "🟡",
            Severity::Critical => "🔴",
        }
    }
}

/// One reviewer comment anchored at a file and line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Path matched against `DiffFile::new_path`
    pub file: String,
    /// Target line in the new file
    pub line: u32,
    pub severity: Severity,
    pub message: String,
    /// Identifier of the violated rule category
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Findings grouped under one diff file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub findings: Vec<Finding>,
    /// Count of non-context lines across all hunks of this file
    pub lines_analyzed: usize,
}

/// Finding counts per severity level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub warning: usize,
    pub critical: usize,
}

impl SeverityCounts {
    /// Count severities over a complete findings list, order-independent
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = SeverityCounts::default();
        for finding in findings {
            match finding.severity {
                Severity::Info => counts.info += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Critical => counts.critical += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.critical
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub files_analyzed: usize,
    pub total_findings: usize,
    pub by_severity: SeverityCounts,
    pub provider: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Top-level analysis output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    /// One entry per input diff file, in diff order; empty buckets included
    pub files: Vec<FileAnalysis>,
    pub metadata: AnalysisMetadata,
}

/// Provider/model identity and timing carried into the result metadata
#[derive(Debug, Clone)]
pub struct ProviderMeta {
    pub provider: String,
    pub model: String,
    pub started: Instant,
}

/// Join findings onto diff files and compute aggregate statistics.
///
/// Findings whose `file` matches no diff file stay in the totals but land in
/// no per-file bucket. Pure and synchronous; the only inputs it trusts are its
/// arguments.
pub fn aggregate(
    diff_files: &[DiffFile],
    findings: Vec<Finding>,
    summary: String,
    meta: ProviderMeta,
) -> AnalysisResult {
    let by_severity = SeverityCounts::tally(&findings);
    let total_findings = findings.len();

    let mut by_file: HashMap<String, Vec<Finding>> = HashMap::new();
    for finding in findings {
        by_file.entry(finding.file.clone()).or_default().push(finding);
    }

    let files: Vec<FileAnalysis> = diff_files
        .iter()
        .map(|diff_file| {
            let lines_analyzed = diff_file
                .hunks
                .iter()
                .map(|hunk| {
                    hunk.lines
                        .iter()
                        .filter(|l| l.kind != DiffLineKind::Context)
                        .count()
                })
                .sum();

            FileAnalysis {
                path: diff_file.new_path.clone(),
                findings: by_file.remove(&diff_file.new_path).unwrap_or_default(),
                lines_analyzed,
            }
        })
        .collect();

    for unmatched_path in by_file.keys() {
        if !unmatched_path.is_empty() {
            eprintln!(
                "  Warning: finding references a file not in the diff: {}",
                unmatched_path
            );
        }
    }

    AnalysisResult {
        summary,
        files,
        metadata: AnalysisMetadata {
            files_analyzed: diff_files.len(),
            total_findings,
            by_severity,
            provider: meta.provider,
            model: meta.model,
            timestamp: Utc::now(),
            duration_ms: meta.started.elapsed().as_millis() as u64,
        },
    }
}

/// Run the full analysis pipeline: prompt, provider call, aggregation.
///
/// Provider and network failures propagate; everything downstream of a
/// successful backend response is infallible.
pub async fn analyze(
    config: &ReviewConfig,
    diff_files: &[DiffFile],
    base_path: &Path,
) -> Result<AnalysisResult> {
    let started = Instant::now();

    let provider = create_provider(config.ai.provider, ProviderOptions::new(&config.ai.model))?;
    let prompt = build_prompt(config, diff_files, base_path);

    let response = provider.analyze(&prompt).await?;

    Ok(aggregate(
        diff_files,
        response.findings,
        response.summary,
        ProviderMeta {
            provider: config.ai.provider.as_str().to_string(),
            model: config.ai.model.clone(),
            started,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse_diff;

    fn meta() -> ProviderMeta {
        ProviderMeta {
            provider: "claude".to_string(),
            model: "test-model".to_string(),
            started: Instant::now(),
        }
    }

    fn finding(file: &str, line: u32, severity: Severity) -> Finding {
        Finding {
            file: file.to_string(),
            line,
            severity,
            message: "m".to_string(),
            rule: "general".to_string(),
            suggestion: None,
        }
    }

    const DIFF: &str = "\
diff --git a/src/a.ts b/src/a.ts
@@ -1,2 +1,3 @@
 line1
+line2
 line3
";

    #[test]
    fn test_aggregate_scenario() {
        let diff_files = parse_diff(DIFF);
        let findings = vec![finding("src/a.ts", 2, Severity::Warning)];

        let result = aggregate(&diff_files, findings, "ok".to_string(), meta());

        assert_eq!(result.summary, "ok");
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].path, "src/a.ts");
        assert_eq!(result.files[0].findings.len(), 1);
        assert_eq!(result.files[0].lines_analyzed, 1);

        assert_eq!(result.metadata.files_analyzed, 1);
        assert_eq!(result.metadata.total_findings, 1);
        assert_eq!(
            result.metadata.by_severity,
            SeverityCounts { info: 0, warning: 1, critical: 0 }
        );
    }

    #[test]
    fn test_unmatched_findings_counted_but_not_bucketed() {
        let diff_files = parse_diff(DIFF);
        let findings = vec![
            finding("src/a.ts", 2, Severity::Info),
            finding("src/elsewhere.ts", 9, Severity::Critical),
        ];

        let result = aggregate(&diff_files, findings, String::new(), meta());

        assert_eq!(result.metadata.total_findings, 2);
        assert_eq!(result.metadata.by_severity.critical, 1);
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].findings.len(), 1);
    }

    #[test]
    fn test_files_without_findings_keep_empty_buckets() {
        let diff = "\
diff --git a/one.rs b/one.rs
@@ -1 +1 @@
-a
+b
diff --git a/two.rs b/two.rs
@@ -1 +1 @@
-c
+d
";
        let diff_files = parse_diff(diff);
        let findings = vec![finding("two.rs", 1, Severity::Info)];

        let result = aggregate(&diff_files, findings, String::new(), meta());

        assert_eq!(result.files.len(), 2);
        assert_eq!(result.files[0].path, "one.rs");
        assert!(result.files[0].findings.is_empty());
        assert_eq!(result.files[0].lines_analyzed, 2);
        assert_eq!(result.files[1].findings.len(), 1);
    }

    #[test]
    fn test_counting_is_order_independent() {
        let diff_files = parse_diff(DIFF);
        let a = vec![
            finding("src/a.ts", 1, Severity::Info),
            finding("src/a.ts", 2, Severity::Critical),
            finding("other.ts", 3, Severity::Warning),
        ];
        let mut b = a.clone();
        b.reverse();

        let result_a = aggregate(&diff_files, a, String::new(), meta());
        let result_b = aggregate(&diff_files, b, String::new(), meta());

        assert_eq!(result_a.metadata.by_severity, result_b.metadata.by_severity);
        assert_eq!(result_a.metadata.total_findings, result_b.metadata.total_findings);
    }

    #[test]
    fn test_totals_line_up_across_views() {
        let diff_files = parse_diff(DIFF);
        let findings = vec![
            finding("src/a.ts", 1, Severity::Info),
            finding("src/a.ts", 2, Severity::Info),
            finding("ghost.rs", 3, Severity::Warning),
        ];

        let result = aggregate(&diff_files, findings, String::new(), meta());

        let bucketed: usize = result.files.iter().map(|f| f.findings.len()).sum();
        assert_eq!(result.metadata.total_findings, 3);
        assert_eq!(result.metadata.by_severity.total(), 3);
        // One finding is unmatched, so buckets hold one fewer
        assert_eq!(bucketed, 2);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
