//! Burst averaging for noise reduction.
//!
//! Frames are folded one at a time into an `f32` accumulator
//! ([`AvgSession`]), so a long burst never has to be held in memory.
//! [`average_frames`] is the all-at-once equivalent.

mod batch;
mod merge;
mod policy;
mod session;

pub use batch::average_frames;
pub use merge::{finish_accumulator, spatial_denoise, NoiseEstimate};
pub use policy::{alignment_for_zoom, avg_sample_size, ghost_config_for_iso, prepare_frame, wiener_params};
pub use session::{AvgSession, RejectedFrame};
