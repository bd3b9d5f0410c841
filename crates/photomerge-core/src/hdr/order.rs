use crate::frame::{Frame, LuminanceProxy};

/// Order in which bracket frames are folded around the reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FoldOrder {
    /// Frames brighter than the reference, by increasing exposure.
    pub brighter: Vec<usize>,
    /// Frames darker than the reference, by decreasing exposure.
    pub darker: Vec<usize>,
}

/// Split the frames around `reference_index`.
///
/// Exposure times decide brightness when every frame carries one,
/// otherwise mean luminance does. Ties go by index.
pub fn fold_order(frames: &[Frame], reference_index: usize) -> FoldOrder {
    let keys: Vec<f64> = if frames.iter().all(|f| f.metadata.exposure_time_ns.is_some()) {
        frames
            .iter()
            .map(|f| f.metadata.exposure_time_ns.unwrap_or_default() as f64)
            .collect()
    } else {
        frames.iter().map(mean_brightness).collect()
    };

    let reference_key = keys[reference_index];
    let mut order = FoldOrder::default();
    for (i, &key) in keys.iter().enumerate() {
        if i == reference_index {
            continue;
        }
        if key > reference_key || (key == reference_key && i > reference_index) {
            order.brighter.push(i);
        } else {
            order.darker.push(i);
        }
    }
    order
        .brighter
        .sort_by(|&a, &b| keys[a].total_cmp(&keys[b]).then(a.cmp(&b)));
    order
        .darker
        .sort_by(|&a, &b| keys[b].total_cmp(&keys[a]).then(a.cmp(&b)));
    order
}

fn mean_brightness(frame: &Frame) -> f64 {
    let plane = frame.luminance_plane(LuminanceProxy::Average);
    plane.iter().map(|&v| v as f64).sum::<f64>() / plane.len().max(1) as f64
}
