//! Tagged log-line format shared by `compare` output and the re-aggregator.
//!
//! Every line is `[TAG] key=value key=value ...`. Keys are looked up by
//! name, so field order does not matter and unknown keys are ignored.
//! Floats carry 10 decimals; names never contain whitespace.
//!
//! ```text
//! [CONFIG] model=<name>
//! [TAIL] test=<n> rel=<name> real=<name> pred=<name> pr_real=<f> pr_pred=<f> err_orig=<f> err_aug=<f>
//! [HEAD] ...same keys...
//! [SUMMARY] type=<tail|head|overall> graph=<original|augmented> n= mean= median= max= std=
//! [SUMMARY] type=... graph=... status=no_data
//! [BIAS] type=<tail|head|overall> n= mean_pr_real= mean_pr_pred= signed_diff= abs_diff= pct_pred_higher=<x.x>% bias=
//! [RELATION] rel= n= mean_err= pct_pred_higher= signed_diff= bias=
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use kgbias_predict::Side;

use crate::aggregate::{BiasReport, DeltaRecord, GraphVariant, RelationBias};
use crate::stats::{DeltaStats, SignedStats, SliceStats};

/// Decimal places of every float on the wire.
pub const FLOAT_PRECISION: usize = 10;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("line {line}: missing `{key}=`")]
    MissingField { line: usize, key: &'static str },

    #[error("line {line}: `{key}={value}` is not a number")]
    InvalidNumber {
        line: usize,
        key: &'static str,
        value: String,
    },

    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{}`: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<WireError>,
    },
}

/// Round-trips `x` through its 10-decimal text form.
pub fn quantize(x: f64) -> f64 {
    float(x).parse().unwrap_or(x)
}

/// Whitespace → `_`, so a name stays a single token.
pub fn sanitize(name: &str) -> Cow<'_, str> {
    if name.chars().any(char::is_whitespace) {
        Cow::Owned(
            name.chars()
                .map(|c| if c.is_whitespace() { '_' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(name)
    }
}

fn float(x: f64) -> String {
    format!("{x:.prec$}", prec = FLOAT_PRECISION)
}

fn signed(x: f64) -> String {
    format!("{x:+.prec$}", prec = FLOAT_PRECISION)
}

// ============================================================================
// Rendering
// ============================================================================

pub fn side_tag(side: Side) -> &'static str {
    match side {
        Side::Head => "[HEAD]",
        Side::Tail => "[TAIL]",
    }
}

pub fn render_sample(r: &DeltaRecord) -> String {
    format!(
        "{} test={} rel={} real={} pred={} pr_real={} pr_pred={} err_orig={} err_aug={}",
        side_tag(r.side),
        r.test,
        r.rel,
        r.real,
        r.pred,
        float(r.pr_real),
        float(r.pr_pred),
        float(r.err_orig),
        float(r.err_aug),
    )
}

pub fn render_summary(slice: &str, variant: GraphVariant, stats: &SliceStats<DeltaStats>) -> String {
    match stats {
        SliceStats::Measured(s) => format!(
            "[SUMMARY] type={slice} graph={variant} n={} mean={} median={} max={} std={}",
            s.n,
            float(s.mean),
            float(s.median),
            float(s.max),
            float(s.std),
        ),
        SliceStats::NoData => format!("[SUMMARY] type={slice} graph={variant} status=no_data"),
    }
}

pub fn render_bias(slice: &str, stats: &SliceStats<SignedStats>) -> String {
    match stats {
        SliceStats::Measured(s) => format!(
            "[BIAS] type={slice} n={} mean_pr_real={} mean_pr_pred={} signed_diff={} abs_diff={} pct_pred_higher={:.1}% bias={}",
            s.n,
            float(s.mean_pr_real),
            float(s.mean_pr_pred),
            signed(s.signed_diff),
            float(s.abs_diff),
            s.pct_pred_higher,
            s.bias,
        ),
        SliceStats::NoData => format!("[BIAS] type={slice} status=no_data"),
    }
}

pub fn render_relation(r: &RelationBias) -> String {
    format!(
        "[RELATION] rel={} n={} mean_err={} pct_pred_higher={:.1}% signed_diff={} bias={}",
        r.relation,
        r.signed.n,
        float(r.errors.mean),
        r.signed.pct_pred_higher,
        signed(r.signed.signed_diff),
        r.signed.bias,
    )
}

/// `[SUMMARY]`, `[BIAS]`, then `[RELATION]` lines for a report.
pub fn render_report(report: &BiasReport) -> Vec<String> {
    let slices = [
        ("tail", &report.tail),
        ("head", &report.head),
        ("overall", &report.overall),
    ];
    let mut out = Vec::new();
    for (label, slice) in slices {
        for variant in GraphVariant::ALL {
            out.push(render_summary(label, variant, slice.delta(variant)));
        }
    }
    for (label, slice) in slices {
        out.push(render_bias(label, &slice.bias));
    }
    out.extend(report.relations.iter().map(render_relation));
    out
}

// ============================================================================
// Parsing
// ============================================================================

/// `key=value` tokens after the tag. Later duplicates win.
pub fn fields(line: &str) -> HashMap<&str, &str> {
    line.split_whitespace()
        .filter_map(|tok| tok.split_once('='))
        .collect()
}

/// The bracketed tag at the start of `line`, without brackets.
pub fn tag(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

fn required<'a>(
    kv: &HashMap<&str, &'a str>,
    key: &'static str,
    line: usize,
) -> Result<&'a str, WireError> {
    kv.get(key)
        .copied()
        .ok_or(WireError::MissingField { line, key })
}

fn number<T: std::str::FromStr>(
    kv: &HashMap<&str, &str>,
    key: &'static str,
    line: usize,
) -> Result<T, WireError> {
    let raw = required(kv, key, line)?;
    raw.parse().map_err(|_| WireError::InvalidNumber {
        line,
        key,
        value: raw.to_string(),
    })
}

/// Parses a `[TAIL]`/`[HEAD]` line. Other tags yield `Ok(None)`.
///
/// `line_no` is 1-based and only used in errors.
pub fn parse_sample(line: &str, line_no: usize) -> Result<Option<DeltaRecord>, WireError> {
    let side = match tag(line) {
        Some("TAIL") => Side::Tail,
        Some("HEAD") => Side::Head,
        _ => return Ok(None),
    };
    let kv = fields(line);
    Ok(Some(DeltaRecord {
        side,
        test: number(&kv, "test", line_no)?,
        rel: required(&kv, "rel", line_no)?.to_string(),
        real: required(&kv, "real", line_no)?.to_string(),
        pred: required(&kv, "pred", line_no)?.to_string(),
        pr_real: number(&kv, "pr_real", line_no)?,
        pr_pred: number(&kv, "pr_pred", line_no)?,
        err_orig: number(&kv, "err_orig", line_no)?,
        err_aug: number(&kv, "err_aug", line_no)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::BiasClass;

    fn sample() -> DeltaRecord {
        DeltaRecord {
            side: Side::Tail,
            test: 3,
            rel: "concept:athleteplaysforteam".into(),
            real: "concept_sportsteam_yankees".into(),
            pred: "concept_sportsteam_red_sox".into(),
            pr_real: quantize(0.000_123_456_789_01),
            pr_pred: quantize(0.000_2),
            err_orig: quantize(0.000_076_543_210_99),
            err_aug: quantize(0.000_08),
        }
    }

    #[test]
    fn sample_line_has_fixed_layout() {
        assert_eq!(
            render_sample(&sample()),
            "[TAIL] test=3 rel=concept:athleteplaysforteam real=concept_sportsteam_yankees \
             pred=concept_sportsteam_red_sox pr_real=0.0001234568 pr_pred=0.0002000000 \
             err_orig=0.0000765432 err_aug=0.0000800000"
        );
    }

    #[test]
    fn rendered_sample_parses_back_exactly() {
        let r = sample();
        let parsed = parse_sample(&render_sample(&r), 1).unwrap().unwrap();
        assert_eq!(parsed, r);
    }

    #[test]
    fn field_order_is_irrelevant() {
        let line = "[HEAD] err_aug=0.5 err_orig=0.25 pr_pred=0.75 pr_real=0.5 pred=b real=a rel=r test=9 extra=1";
        let r = parse_sample(line, 1).unwrap().unwrap();
        assert_eq!(r.side, Side::Head);
        assert_eq!(r.test, 9);
        assert_eq!(r.err_orig, 0.25);
    }

    #[test]
    fn malformed_lines_name_the_line() {
        let missing = parse_sample("[TAIL] test=1 rel=r real=a pred=b pr_real=0.1", 7).unwrap_err();
        assert!(matches!(missing, WireError::MissingField { line: 7, key: "pr_pred" }));

        let bad = parse_sample(
            "[TAIL] test=1 rel=r real=a pred=b pr_real=x pr_pred=0.1 err_orig=0 err_aug=0",
            4,
        )
        .unwrap_err();
        assert!(bad.to_string().starts_with("line 4:"));
    }

    #[test]
    fn non_sample_lines_are_skipped() {
        assert!(parse_sample("[CONFIG] model=transe", 1).unwrap().is_none());
        assert!(parse_sample("plain text", 1).unwrap().is_none());
        assert!(parse_sample("[TAILS] x=1", 1).unwrap().is_none());
    }

    #[test]
    fn sanitize_replaces_whitespace_only_when_needed() {
        assert!(matches!(sanitize("plain"), Cow::Borrowed("plain")));
        assert_eq!(sanitize("new york\tcity"), "new_york_city");
    }

    #[test]
    fn quantize_is_idempotent() {
        let q = quantize(1.0 / 3.0);
        assert_eq!(q, 0.3333333333);
        assert_eq!(quantize(q), q);
    }

    #[test]
    fn no_data_lines_are_explicit() {
        assert_eq!(
            render_summary("head", GraphVariant::Augmented, &SliceStats::NoData),
            "[SUMMARY] type=head graph=augmented status=no_data"
        );
        assert_eq!(render_bias("overall", &SliceStats::NoData), "[BIAS] type=overall status=no_data");
    }

    #[test]
    fn bias_line_format() {
        let s = SignedStats {
            n: 10,
            mean_pr_real: 0.001,
            mean_pr_pred: 0.002,
            signed_diff: 0.001,
            abs_diff: 0.0015,
            pct_pred_higher: 60.0,
            bias: BiasClass::HighCentrality,
        };
        assert_eq!(
            render_bias("tail", &SliceStats::Measured(s)),
            "[BIAS] type=tail n=10 mean_pr_real=0.0010000000 mean_pr_pred=0.0020000000 \
             signed_diff=+0.0010000000 abs_diff=0.0015000000 pct_pred_higher=60.0% bias=HIGH_CENTRALITY"
        );
    }

    #[test]
    fn relation_line_format() {
        let r = RelationBias {
            relation: "concept:worksfor".into(),
            errors: DeltaStats {
                n: 4,
                mean: 0.000_25,
                median: 0.000_2,
                max: 0.000_5,
                std: 0.000_1,
            },
            signed: SignedStats {
                n: 4,
                mean_pr_real: 0.003,
                mean_pr_pred: 0.000_5,
                signed_diff: -0.002_5,
                abs_diff: 0.002_5,
                pct_pred_higher: 25.0,
                bias: BiasClass::LowCentrality,
            },
        };
        assert_eq!(
            render_relation(&r),
            "[RELATION] rel=concept:worksfor n=4 mean_err=0.0002500000 pct_pred_higher=25.0% \
             signed_diff=-0.0025000000 bias=LOW_CENTRALITY"
        );
    }
}
