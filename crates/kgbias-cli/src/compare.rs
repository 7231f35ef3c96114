use std::path::Path;

use anyhow::{Context, Result};

use kgbias_analysis::analyze_run;
use kgbias_graph::TripleStore;
use kgbias_predict::read_prediction_set;

use crate::config::RunConfig;

/// Live analysis of one model's saved predictions. The tagged log goes to
/// `out`, or stdout when `out` is `None`.
pub fn cmd_compare(config: &RunConfig, model: &str, out: Option<&Path>) -> Result<()> {
    config.model(model)?;

    let store = TripleStore::load(&config.dataset_dir, &config.split_prefix)
        .context("failed to load dataset")?;
    let predictions_path = config.predictions_path(model);
    let predictions = read_prediction_set(&predictions_path).with_context(|| {
        format!("no usable predictions for `{model}` (run `kgbias predict {model}` first)")
    })?;

    let run = analyze_run(model, &store, &predictions, &config.centrality);
    let mut text = run.render().join("\n");
    text.push('\n');

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create `{}`", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            tracing::info!(model, path = %path.display(), samples = run.deltas.len(), "wrote log");
        }
        None => print!("{text}"),
    }
    Ok(())
}
