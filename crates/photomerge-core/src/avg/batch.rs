use ndarray::Axis;
use tracing::info;

use crate::accumulator::Accumulator;
use crate::align::align;
use crate::error::Result;
use crate::frame::{check_dimensions, Frame, LuminanceProxy, Offset};
use crate::ghost::GhostMask;
use crate::pipeline::config::AvgConfig;

use super::merge::{finish_accumulator, NoiseEstimate};

/// Aligned mean of a whole burst against its first frame, finished the
/// same way as a streaming session.
///
/// Pixels whose aligned source falls outside a frame take the first
/// frame's value for that frame.
pub fn average_frames(frames: &[Frame], config: &AvgConfig) -> Result<Frame> {
    let (width, height) = check_dimensions(frames)?;
    let reference = &frames[0];
    info!(frames = frames.len(), width, height, "Averaging burst");

    let offsets = if frames.len() > 1 {
        align(reference, &frames[1..], &config.alignment)?.offsets
    } else {
        Vec::new()
    };

    let mut acc = Accumulator::from_frame(reference)?;
    let mut noise = NoiseEstimate::default();
    let reference_plane = reference.luminance_plane(LuminanceProxy::Average);
    let clear = GhostMask::clear(width, height);
    for (frame, offset) in frames[1..].iter().zip(offsets) {
        noise.add_frame(&reference_plane, &frame.luminance_plane(LuminanceProxy::Average), offset, &clear);
        add_shifted(&mut acc, frame, reference, offset);
    }
    let n = frames.len() as f32;
    acc.data.mapv_inplace(|v| v / n);

    let metadata = reference.metadata;
    finish_accumulator(acc, metadata, noise.level(), config)
}

fn add_shifted(acc: &mut Accumulator, frame: &Frame, reference: &Frame, offset: Offset) {
    let (w, h) = (frame.width(), frame.height());
    for (y, mut row) in acc.data.axis_iter_mut(Axis(0)).enumerate() {
        for x in 0..w {
            let px = match offset.source(x, y, w, h) {
                Some((sx, sy)) => frame.pixel(sx, sy),
                None => reference.pixel(x, y),
            };
            for c in 0..3 {
                row[[x, c]] += px[c] as f32;
            }
        }
    }
}
