//! Size reports: deduplicated and raw stats for the same root
//!
//! The two figures are always computed with independent, fresh visited
//! sets, so neither run can hide cells from the other.

use crate::model::CellNode;
use crate::stats::{collect_deduplicated, collect_raw, StorageStats};
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Which counting mode a figure was produced with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    Deduplicated,
    Raw,
}

impl fmt::Display for SizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeMode::Deduplicated => write!(f, "Deduplicated"),
            SizeMode::Raw => write!(f, "Raw"),
        }
    }
}

/// Both size figures for one labeled artifact
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CodeSizeReport {
    pub label: String,
    pub deduplicated: StorageStats,
    pub raw: StorageStats,
}

impl CodeSizeReport {
    /// Hand both figures to `sink`, deduplicated first
    pub fn emit<S: ReportSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.record(&self.label, SizeMode::Deduplicated, &self.deduplicated)?;
        sink.record(&self.label, SizeMode::Raw, &self.raw)
    }
}

/// Receives labeled size figures
pub trait ReportSink {
    fn record(&mut self, label: &str, mode: SizeMode, stats: &StorageStats) -> Result<()>;
}

/// Writes one human-readable line per figure
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        TextSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn record(&mut self, label: &str, mode: SizeMode, stats: &StorageStats) -> Result<()> {
        writeln!(
            self.out,
            "{} {} code takes {} bits and {} cells",
            mode,
            label,
            stats.bits(),
            stats.cells()
        )?;
        Ok(())
    }
}

/// Emits each figure as an info-level tracing event
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn record(&mut self, label: &str, mode: SizeMode, stats: &StorageStats) -> Result<()> {
        tracing::info!(
            label,
            mode = %mode,
            bits = %stats.bits(),
            cells = %stats.cells(),
            "code size"
        );
        Ok(())
    }
}

/// Compute deduplicated and raw stats for `root`
pub fn code_size<C: CellNode>(label: impl Into<String>, root: &C) -> CodeSizeReport {
    CodeSizeReport {
        label: label.into(),
        deduplicated: collect_deduplicated(root),
        raw: collect_raw(root),
    }
}

/// Compute both figures for `root` and pass them to `sink`
pub fn report_code_size<C, S>(label: &str, root: &C, sink: &mut S) -> Result<CodeSizeReport>
where
    C: CellNode,
    S: ReportSink + ?Sized,
{
    let report = code_size(label, root);
    report.emit(sink)?;
    Ok(report)
}
