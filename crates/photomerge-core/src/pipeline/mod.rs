pub mod cancel;
pub mod config;
mod orchestrator;
mod types;

pub use cancel::CancelToken;
pub use orchestrator::{run_avg, run_dro, run_hdr};
pub use types::{MergeOutput, MergeStage, NoOpReporter, ProgressReporter};
