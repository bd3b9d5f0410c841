#![allow(dead_code)]

use photomerge_core::frame::{CaptureMetadata, Frame};

/// Smooth, non-periodic test scene on the 8-bit scale: a few Gaussian
/// blobs over a gentle gradient.
pub fn scene(x: f32, y: f32) -> f32 {
    const BLOBS: [(f32, f32, f32, f32); 6] = [
        (30.0, 40.0, 9.0, 90.0),
        (85.0, 25.0, 7.0, -70.0),
        (60.0, 90.0, 11.0, 80.0),
        (100.0, 100.0, 6.0, -60.0),
        (20.0, 105.0, 8.0, 60.0),
        (110.0, 60.0, 10.0, 70.0),
    ];
    let mut v = 100.0 + 0.3 * x + 0.15 * y;
    for (cx, cy, sigma, amp) in BLOBS {
        let d2 = (x - cx).powi(2) + (y - cy).powi(2);
        v += amp * (-d2 / (2.0 * sigma * sigma)).exp();
    }
    v
}

/// Grey frame sampling `f(x, y)` on the 8-bit scale.
pub fn grey_frame<F: Fn(f32, f32) -> f32>(width: usize, height: usize, f: F) -> Frame {
    Frame::from_fn(width, height, |x, y| {
        let v = f(x as f32, y as f32).round().clamp(0.0, 255.0) as u8;
        [v, v, v]
    })
    .unwrap()
}

/// The test scene, with content displaced so that the pixel at `(x, y)`
/// of the result matches the scene at `(x - dx, y - dy)`.
pub fn shifted_scene(width: usize, height: usize, dx: i32, dy: i32) -> Frame {
    grey_frame(width, height, |x, y| scene(x - dx as f32, y - dy as f32))
}

fn hash(x: i32, y: i32, seed: u32) -> u32 {
    let mut h = (x as u32)
        .wrapping_mul(374_761_393)
        .wrapping_add((y as u32).wrapping_mul(668_265_263))
        .wrapping_add(seed.wrapping_mul(2_246_822_519));
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^ (h >> 16)
}

/// Deterministic pseudo-random value in `[-1, 1]`.
pub fn noise(x: usize, y: usize, seed: u32) -> f32 {
    (hash(x as i32, y as i32, seed) as f32 / u32::MAX as f32) * 2.0 - 1.0
}

/// Hard-edged scene of 8x8 blocks, each 40, 120 or 200.
pub fn blocks(x: f32, y: f32) -> f32 {
    let (bx, by) = ((x / 8.0).floor() as i32, (y / 8.0).floor() as i32);
    [40.0, 120.0, 200.0][(hash(bx, by, 7) % 3) as usize]
}

/// Three-frame bracket of a scene whose radiance spans roughly
/// `[2, 900]`: exposures x0.25, x1 and x4, clipped to 8 bits.
/// Frames are ordered darkest first; the middle one is the reference.
pub fn bracket(width: usize, height: usize) -> Vec<Frame> {
    shifted_bracket(width, height, [(0, 0); 3])
}

/// [`bracket`] with the content of each frame displaced by its `(dx, dy)`,
/// as in [`shifted_scene`].
pub fn shifted_bracket(width: usize, height: usize, shifts: [(i32, i32); 3]) -> Vec<Frame> {
    let radiance = move |x: f32, y: f32| {
        let t = x / (width as f32 - 1.0);
        let ripple = 1.0 + 0.2 * (y / height as f32 - 0.5);
        let texture = 1.0 + 0.12 * (0.37 * x + 0.21 * y).sin() + 0.1 * (0.29 * y - 0.13 * x).sin();
        2.0 * 450f32.powf(t) * ripple * texture
    };
    [(0.25f32, 2_500_000u64), (1.0, 10_000_000), (4.0, 40_000_000)]
        .into_iter()
        .zip(shifts)
        .map(|((gain, exposure), (dx, dy))| {
            grey_frame(width, height, move |x, y| radiance(x - dx as f32, y - dy as f32) * gain)
                .with_metadata(CaptureMetadata::new(100, exposure))
        })
        .collect()
}
