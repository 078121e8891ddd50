//! Prompt assembly for the review request
//!
//! Builds one self-contained prompt: languages, active rules, optional project
//! documentation, custom instructions, the formatted diff, and the JSON output
//! contract the response parser expects back.

use crate::config::{DocumentationConfig, ReviewConfig};
use crate::diff::{format_diff_for_prompt, DiffFile};
use std::fs;
use std::path::Path;

/// Build the full analysis prompt for the AI provider
pub fn build_prompt(config: &ReviewConfig, diff_files: &[DiffFile], base_path: &Path) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push("# Code Review Request\n".to_string());
    sections.push("Please analyze the following code diff and provide feedback.\n".to_string());

    sections.push(format!("## Languages\n{}\n", config.languages.join(", ")));
    sections.push(rules_section(config));

    if let Some(docs) = &config.documentation {
        if let Some(section) = documentation_section(docs, base_path) {
            sections.push(section);
        }
    }

    if let Some(custom) = &config.custom_prompt {
        sections.push(format!("## Custom Instructions\n{}\n", custom));
    }

    sections.push("## Code Diff\n".to_string());
    sections.push(format_diff_for_prompt(diff_files));

    sections.push(OUTPUT_INSTRUCTIONS.to_string());

    sections.join("\n")
}

fn rules_section(config: &ReviewConfig) -> String {
    let rules = &config.rules;
    let mut active: Vec<&str> = Vec::new();

    if rules.clean_code {
        active.push("Clean Code principles");
    }
    if rules.solid {
        active.push("SOLID principles");
    }
    if rules.performance {
        active.push("Performance optimizations");
    }
    if rules.security {
        active.push("Security vulnerabilities");
    }
    if rules.readability {
        active.push("Code readability and maintainability");
    }

    if active.is_empty() {
        "## Analysis Focus\nGeneral code quality review.\n".to_string()
    } else {
        format!("## Analysis Focus\nFocus on: {}.\n", active.join(", "))
    }
}

/// Read the configured documentation files into a context section.
/// Missing or unreadable files are skipped without complaint.
fn documentation_section(docs: &DocumentationConfig, base_path: &Path) -> Option<String> {
    let mut parts: Vec<String> = vec!["## Project Context\n".to_string()];

    if let Some(content) = docs.project.as_deref().and_then(|p| load_doc(p, base_path)) {
        parts.push(format!("### Project Documentation\n\n{}\n", content));
    }
    if let Some(content) = docs
        .architecture
        .as_deref()
        .and_then(|p| load_doc(p, base_path))
    {
        parts.push(format!("### Architecture Standards\n\n{}\n", content));
    }

    if parts.len() > 1 {
        Some(parts.join("\n"))
    } else {
        None
    }
}

fn load_doc(rel_path: &str, base_path: &Path) -> Option<String> {
    fs::read_to_string(base_path.join(rel_path)).ok()
}

const OUTPUT_INSTRUCTIONS: &str = r#"
## Response Format

Respond with a JSON object containing:

```json
{
  "summary": "Brief overall summary of the code quality",
  "findings": [
    {
      "file": "path/to/file.rs",
      "line": 42,
      "severity": "warning",
      "rule": "cleanCode",
      "message": "Description of the issue",
      "suggestion": "How to fix it"
    }
  ]
}
```

Severity levels:
- "info": Minor suggestions or best practices
- "warning": Issues that should be addressed
- "critical": Security vulnerabilities or serious bugs

Rules:
- cleanCode: Clean Code violations
- solid: SOLID principle violations
- performance: Performance issues
- security: Security vulnerabilities
- readability: Readability improvements

Only include findings for actual issues. Be concise and actionable.
"#;
