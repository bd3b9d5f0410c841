mod engine;
mod metric;
pub mod pyramid;

pub use engine::{align, align_planes, AlignmentResult};
