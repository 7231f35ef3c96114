//! Rebuild bias reports from archived `compare` logs and compare runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::{BiasReport, DeltaRecord};
use crate::stats::{BiasClass, SIGNIFICANCE_PP};
use crate::wire::{self, WireError};

/// Samples recovered from one log.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLog {
    pub model: String,
    pub records: Vec<DeltaRecord>,
}

impl ParsedLog {
    pub fn report(&self) -> BiasReport {
        BiasReport::from_deltas(self.model.clone(), &self.records)
    }
}

/// Reads `[CONFIG] model=` and `[TAIL]`/`[HEAD]` lines; everything else is
/// ignored. The last `[CONFIG]` wins; without one the run is named
/// `fallback_model`.
pub fn parse_log(text: &str, fallback_model: &str) -> Result<ParsedLog, WireError> {
    let mut model: Option<String> = None;
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if wire::tag(line) == Some("CONFIG") {
            if let Some(m) = wire::fields(line).get("model") {
                model = Some((*m).to_string());
            }
            continue;
        }
        if let Some(record) = wire::parse_sample(line, idx + 1)? {
            records.push(record);
        }
    }
    Ok(ParsedLog {
        model: model.unwrap_or_else(|| fallback_model.to_string()),
        records,
    })
}

pub fn read_log(path: &Path) -> Result<ParsedLog, WireError> {
    let text = std::fs::read_to_string(path).map_err(|source| WireError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_log(&text, &path.display().to_string()).map_err(|e| WireError::InFile {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    tracing::info!(
        path = %path.display(),
        model = %parsed.model,
        samples = parsed.records.len(),
        "parsed log"
    );
    Ok(parsed)
}

/// Text → report, through the same aggregation the live path uses.
pub fn reparse(text: &str, fallback_model: &str) -> Result<BiasReport, WireError> {
    Ok(parse_log(text, fallback_model)?.report())
}

// ============================================================================
// Cross-model comparison
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRun {
    pub model: String,
    pub pct_pred_higher: f64,
    pub signed_diff: f64,
    pub bias: BiasClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub most_biased: String,
    pub least_biased: String,
    /// Percentage points between the two.
    pub spread_pp: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossModelComparison {
    /// Overall `pct_pred_higher` descending, ties by model name.
    pub ranked: Vec<RankedRun>,
    /// Runs without any overall samples.
    pub unranked: Vec<String>,
    /// Present when at least two runs are ranked.
    pub verdict: Option<Verdict>,
}

impl CrossModelComparison {
    pub fn compare(reports: &[BiasReport]) -> Self {
        let mut ranked = Vec::new();
        let mut unranked = Vec::new();
        for report in reports {
            match report.overall.bias.measured() {
                Some(s) => ranked.push(RankedRun {
                    model: report.model.clone(),
                    pct_pred_higher: s.pct_pred_higher,
                    signed_diff: s.signed_diff,
                    bias: s.bias,
                }),
                None => unranked.push(report.model.clone()),
            }
        }
        ranked.sort_by(|a, b| {
            b.pct_pred_higher
                .total_cmp(&a.pct_pred_higher)
                .then_with(|| a.model.cmp(&b.model))
        });

        let verdict = match (ranked.first(), ranked.last()) {
            (Some(most), Some(least)) if ranked.len() >= 2 => {
                let spread_pp = most.pct_pred_higher - least.pct_pred_higher;
                Some(Verdict {
                    most_biased: most.model.clone(),
                    least_biased: least.model.clone(),
                    spread_pp,
                    significant: spread_pp.abs() > SIGNIFICANCE_PP,
                })
            }
            _ => None,
        };

        Self {
            ranked,
            unranked,
            verdict,
        }
    }

    pub fn render(&self) -> Vec<String> {
        let mut out = Vec::new();
        for r in &self.ranked {
            out.push(format!(
                "[RANK] model={} pct_higher={:.1}% signed_diff={:+.10} bias={}",
                r.model, r.pct_pred_higher, r.signed_diff, r.bias
            ));
        }
        for m in &self.unranked {
            out.push(format!("[RANK] model={m} status=no_data"));
        }
        if let Some(v) = &self.verdict {
            out.push(format!(
                "[VERDICT] most_centrality_biased={} least_centrality_biased={}",
                v.most_biased, v.least_biased
            ));
            out.push(format!(
                "[VERDICT] difference={:.1}pp {}",
                v.spread_pp,
                if v.significant { "(significant)" } else { "(marginal)" }
            ));
        }
        out
    }
}

/// `[BIAS]` lines and the per-relation tail table for one parsed run.
pub fn render_parsed_report(report: &BiasReport) -> Vec<String> {
    let mut out = Vec::new();
    for (label, slice) in [
        ("tail", &report.tail),
        ("head", &report.head),
        ("overall", &report.overall),
    ] {
        out.push(wire::render_bias(label, &slice.bias));
    }
    out.push("[PER-RELATION TAIL BIAS] (sorted by mean signed difference)".to_string());
    for r in &report.relations {
        out.push(format!(
            "  rel={} n={} pct_higher={:.1}% signed_diff={:+.10}",
            r.relation, r.signed.n, r.signed.pct_pred_higher, r.signed.signed_diff
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::render_sample;
    use kgbias_predict::Side;

    /// `n_higher` of `n` samples predict a more central entity.
    fn log(model: &str, n: usize, n_higher: usize) -> String {
        let mut lines = vec![format!("[CONFIG] model={model}"), "[DATA] entities=3".to_string()];
        for i in 0..n {
            let pred = if i < n_higher { 0.3 } else { 0.1 };
            lines.push(render_sample(&DeltaRecord {
                side: if i % 2 == 0 { Side::Tail } else { Side::Head },
                test: i + 1,
                rel: "r".into(),
                real: "a".into(),
                pred: "b".into(),
                pr_real: 0.2,
                pr_pred: pred,
                err_orig: 0.1,
                err_aug: 0.1,
            }));
        }
        lines.push("[SUMMARY] type=tail graph=original mean=0.1".to_string());
        lines.join("\n")
    }

    #[test]
    fn sixty_vs_forty_is_a_significant_twenty_point_spread() {
        let a = reparse(&log("transe", 10, 6), "a.log").unwrap();
        let b = reparse(&log("rotate", 10, 4), "b.log").unwrap();
        let cmp = CrossModelComparison::compare(&[b, a]);

        assert_eq!(cmp.ranked[0].model, "transe");
        assert_eq!(cmp.ranked[0].bias, BiasClass::HighCentrality);
        assert_eq!(cmp.ranked[1].bias, BiasClass::LowCentrality);
        let v = cmp.verdict.as_ref().unwrap();
        assert_eq!((v.most_biased.as_str(), v.least_biased.as_str()), ("transe", "rotate"));
        assert!((v.spread_pp - 20.0).abs() < 1e-9);
        assert!(v.significant);

        let rendered = cmp.render();
        assert_eq!(rendered.last().unwrap(), "[VERDICT] difference=20.0pp (significant)");
    }

    #[test]
    fn small_spread_is_marginal() {
        let a = reparse(&log("a", 20, 11), "a").unwrap();
        let b = reparse(&log("b", 20, 10), "b").unwrap();
        let v = CrossModelComparison::compare(&[a, b]).verdict.unwrap();
        assert!(!v.significant);
    }

    #[test]
    fn empty_runs_are_unranked_and_single_runs_have_no_verdict() {
        let a = reparse(&log("a", 4, 2), "a").unwrap();
        let empty = reparse("[CONFIG] model=empty\n", "x").unwrap();
        let cmp = CrossModelComparison::compare(&[a, empty]);
        assert_eq!(cmp.unranked, vec!["empty".to_string()]);
        assert!(cmp.verdict.is_none());
    }

    #[test]
    fn model_falls_back_to_path_and_last_config_wins() {
        let parsed = parse_log("[TAIL] test=1 rel=r real=a pred=b pr_real=0.1 pr_pred=0.2 err_orig=0.1 err_aug=0.1", "runs/x.log").unwrap();
        assert_eq!(parsed.model, "runs/x.log");
        assert_eq!(parsed.records.len(), 1);

        let parsed = parse_log("[CONFIG] model=first\n[CONFIG] k=5\n[CONFIG] model=second\n", "p").unwrap();
        assert_eq!(parsed.model, "second");
    }

    #[test]
    fn malformed_sample_reports_its_line() {
        let text = "[CONFIG] model=m\n[TAIL] test=1 rel=r\n";
        let err = parse_log(text, "p").unwrap_err();
        assert!(matches!(err, WireError::MissingField { line: 2, .. }));
    }

    #[test]
    fn read_log_wraps_errors_with_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.log");
        std::fs::write(&path, "[HEAD] test=x\n").unwrap();
        let err = read_log(&path).unwrap_err();
        assert!(err.to_string().contains("bad.log"));

        let missing = read_log(&dir.path().join("missing.log")).unwrap_err();
        assert!(matches!(missing, WireError::Io { .. }));
    }
}
