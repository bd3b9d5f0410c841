use indicatif::{ProgressBar, ProgressStyle};
use photomerge_core::pipeline::{MergeStage, ProgressReporter};

/// Drives a terminal progress bar from merge pipeline stages.
pub struct BarReporter {
    pb: ProgressBar,
}

impl BarReporter {
    pub fn new() -> Self {
        let pb = ProgressBar::new(1);
        let style = ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Self { pb }
    }

    pub fn finish(&self) {
        self.pb.finish_with_message("Done");
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: MergeStage, total_items: Option<usize>) {
        self.pb.set_length(total_items.unwrap_or(1) as u64);
        self.pb.set_position(0);
        self.pb.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.pb.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        if let Some(len) = self.pb.length() {
            self.pb.set_position(len);
        }
    }
}
