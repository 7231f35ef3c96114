use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};

use kgbias_graph::TripleStore;
use kgbias_predict::{
    novel_predictions, rank_all, write_prediction_set, ClosedWorldSampler, EmbeddingScorer,
    PredictionSet,
};

use crate::config::RunConfig;

/// Ranks every test triple and writes `{output_dir}/{model}_predictions.kgbp`.
pub fn cmd_predict(config: &RunConfig, model: &str) -> Result<PathBuf> {
    let model_cfg = config.model(model)?;
    println!(
        "[CONFIG] model={model} file={} k={} corruption={}",
        model_cfg.embeddings.display(),
        config.k,
        config.corruption.as_str()
    );

    let mut scorer = EmbeddingScorer::load(&model_cfg.embeddings)?;
    if let Some(scoring) = model_cfg.scoring {
        scorer = scorer
            .with_scoring(scoring)
            .map_err(|e| anyhow!("model `{model}`: {e}"))?;
    }

    let store = TripleStore::load(&config.dataset_dir, &config.split_prefix)
        .context("failed to load dataset")?;
    println!(
        "[DATA] entities={} relations={} test_triples={}",
        store.entities.len(),
        store.relations.len(),
        store.test.len()
    );

    let sampler = ClosedWorldSampler::from_store(&store, config.corruption);
    let start = Instant::now();
    let records = rank_all(&store.test, &scorer, &sampler, config.k, config.progress_every)
        .with_context(|| format!("ranking failed for model `{model}`"))?;
    let new = novel_predictions(&records, &store.known_set());
    println!(
        "[DONE] triples={} new_predictions={} time={:.1}s",
        records.len(),
        new.len(),
        start.elapsed().as_secs_f64()
    );

    let path = config.predictions_path(model);
    write_prediction_set(&path, &PredictionSet::new(model, config.k, records))?;
    println!("[SAVED] {}", path.display());
    Ok(path)
}
