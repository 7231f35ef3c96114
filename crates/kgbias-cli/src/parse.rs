use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Serialize;

use kgbias_analysis::reparse::render_parsed_report;
use kgbias_analysis::{read_log, BiasReport, CrossModelComparison};

#[derive(Debug, Serialize)]
struct ParseOutput {
    reports: Vec<BiasReport>,
    comparison: CrossModelComparison,
}

fn banner(title: &str) -> String {
    let rule = "=".repeat(80);
    format!("\n{rule}\n{title}\n{rule}")
}

fn render_parse_text(out: &ParseOutput) -> String {
    let mut lines = Vec::new();
    for report in &out.reports {
        lines.push(banner(&format!("[MODEL] {}", report.model)));
        lines.extend(render_parsed_report(report));
    }
    if out.reports.len() > 1 {
        lines.push(banner("[CROSS-MODEL COMPARISON]"));
        lines.extend(out.comparison.render());
    }
    lines.join("\n")
}

/// Per-log reports, then the cross-model ranking.
pub fn cmd_parse(logs: &[PathBuf], format: &str) -> Result<()> {
    let mut reports = Vec::with_capacity(logs.len());
    for path in logs {
        reports.push(read_log(path)?.report());
    }
    let comparison = CrossModelComparison::compare(&reports);
    let out = ParseOutput {
        reports,
        comparison,
    };

    let format = format.trim().to_ascii_lowercase();
    let rendered = match format.as_str() {
        "json" => serde_json::to_string_pretty(&out)?,
        "text" => render_parse_text(&out),
        other => return Err(anyhow!("unknown --format `{other}` (expected json|text)")),
    };
    println!("{rendered}");
    Ok(())
}
