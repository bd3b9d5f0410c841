use crate::frame::{Frame, Offset};
use crate::histogram::{Histogram, HistogramSummary};

/// Merge processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStage {
    Fusing,
    Averaging,
    Tonemapping,
    Finishing,
    Analyzing,
}

impl std::fmt::Display for MergeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fusing => write!(f, "Fusing exposures"),
            Self::Averaging => write!(f, "Averaging frames"),
            Self::Tonemapping => write!(f, "Tonemapping"),
            Self::Finishing => write!(f, "Finishing"),
            Self::Analyzing => write!(f, "Computing histogram"),
        }
    }
}

/// Result of a merge together with its diagnostics.
#[derive(Clone, Debug)]
pub struct MergeOutput {
    pub frame: Frame,
    /// Offset applied to each input frame, in input order.
    pub offsets: Vec<Offset>,
    pub histogram: Histogram,
    /// `None` only for an empty output.
    pub summary: Option<HistogramSummary>,
}

/// Thread-safe progress reporting for the merge pipelines.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items
    /// in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: MergeStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Reporter that ignores all progress.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
