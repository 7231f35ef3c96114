use anyhow::Result;

use crate::compare::cmd_compare;
use crate::config::RunConfig;
use crate::parse::cmd_parse;
use crate::predict::cmd_predict;

fn section(title: &str) {
    let rule = "=".repeat(60);
    println!("\n{rule}\n  {title}\n{rule}");
}

/// `predict` + `compare` for each model, then `parse` over all logs.
pub fn cmd_run(config: &RunConfig, models: &[String]) -> Result<()> {
    let models: Vec<String> = if models.is_empty() {
        config.models.keys().cloned().collect()
    } else {
        models.to_vec()
    };
    for model in &models {
        config.model(model)?;
    }

    let mut logs = Vec::with_capacity(models.len());
    for model in &models {
        section(&format!("PREDICTIONS: {model}"));
        cmd_predict(config, model)?;

        section(&format!("PAGERANK: {model}"));
        let log = config.log_path(model);
        cmd_compare(config, model, Some(&log))?;
        println!("  -> saved {}", log.display());
        logs.push(log);
    }

    section("PARSING BIAS");
    cmd_parse(&logs, "text")
}
