//! kgbias-analysis: is a model's wrong answer more central than the right one?
//!
//! Two computation paths share one aggregation:
//!
//! ```text
//! live:     PredictionSet + centrality maps ──BiasAggregator──┐
//!                                                            ├─ Vec<DeltaRecord> ── BiasReport
//! archived: tagged log text ───────────────────parse_log─────┘
//! ```
//!
//! The live path quantizes every float to the log's 10-decimal precision
//! before building its [`DeltaRecord`]s, so both paths see the same numbers
//! and produce equal reports.

pub mod aggregate;
pub mod live;
pub mod reparse;
pub mod stats;
pub mod wire;

pub use aggregate::{BiasAggregator, BiasReport, DeltaRecord, GraphVariant, RelationBias, SliceReport};
pub use live::{analyze_run, GraphSummary, LiveRun};
pub use reparse::{parse_log, read_log, reparse, CrossModelComparison, ParsedLog, RankedRun, Verdict};
pub use stats::{BiasClass, DeltaStats, SignedStats, SliceStats};
pub use wire::WireError;
