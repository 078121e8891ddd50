//! Markdown report rendering

use crate::analysis::AnalysisResult;

/// Render an analysis result as a markdown document
pub fn render_markdown(result: &AnalysisResult) -> String {
    let meta = &result.metadata;
    let mut lines: Vec<String> = vec![
        "# Code Review Report".to_string(),
        String::new(),
        format!("**Generated:** {}", meta.timestamp.to_rfc3339()),
        format!("**Provider:** {} ({})", meta.provider, meta.model),
        String::new(),
        "## Summary".to_string(),
        String::new(),
        result.summary.clone(),
        String::new(),
        "## Statistics".to_string(),
        String::new(),
        "| Metric | Value |".to_string(),
        "|--------|-------|".to_string(),
        format!("| Files Analyzed | {} |", meta.files_analyzed),
        format!("| Total Findings | {} |", meta.total_findings),
        format!("| Critical | {} |", meta.by_severity.critical),
        format!("| Warning | {} |", meta.by_severity.warning),
        format!("| Info | {} |", meta.by_severity.info),
        String::new(),
    ];

    for file in &result.files {
        if file.findings.is_empty() {
            continue;
        }

        lines.push(format!("## {}", file.path));
        lines.push(String::new());

        for finding in &file.findings {
            lines.push(format!(
                "### {} Line {}: {}",
                finding.severity.icon(),
                finding.line,
                finding.rule
            ));
            lines.push(String::new());
            lines.push(finding.message.clone());
            if let Some(suggestion) = &finding.suggestion {
                lines.push(String::new());
                lines.push(format!("**Suggestion:** {}", suggestion));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}
