//! Synthetic volumes and host-side observers for integration tests.

use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use voxbridge_core::progress::{CancelToken, ProgressSink};
use voxbridge_core::scalar::Scalar;
use voxbridge_core::volume::VolumeMeta;

/// Samples all equal to `base`, except a single `outlier` at `at`.
pub fn outlier_volume<T: Scalar>(
    dims: [usize; 3],
    base: T,
    outlier: T,
    at: [usize; 3],
) -> Vec<T> {
    let meta = VolumeMeta::contiguous(dims, T::KIND);
    let mut samples = vec![base; meta.voxel_count()];
    samples[meta.index_of(at)] = outlier;
    samples
}

/// Two x-halves: `low` where `x < dims[0] / 2`, `high` elsewhere.
pub fn split_block<T: Scalar>(dims: [usize; 3], low: T, high: T) -> Vec<T> {
    let mut samples = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
    for _z in 0..dims[2] {
        for _y in 0..dims[1] {
            for x in 0..dims[0] {
                samples.push(if x < dims[0] / 2 { low } else { high });
            }
        }
    }
    samples
}

/// Deterministic noise in `[mean - spread, mean + spread]`.
///
/// Seeded PCG so a failing case reproduces bit for bit.
pub fn noisy_volume(dims: [usize; 3], mean: f32, spread: f32, seed: u64) -> Vec<f32> {
    let mut rng = Pcg32::seed_from_u64(seed);
    (0..dims[0] * dims[1] * dims[2])
        .map(|_| mean + rng.gen_range(-spread..=spread))
        .collect()
}

/// Signed distance to a sphere, in grid units. Negative inside.
pub fn sphere_field(dims: [usize; 3], center: [f32; 3], radius: f32) -> Vec<f32> {
    let mut field = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
    for z in 0..dims[2] {
        for y in 0..dims[1] {
            for x in 0..dims[0] {
                let d = [
                    x as f32 - center[0],
                    y as f32 - center[1],
                    z as f32 - center[2],
                ];
                let r = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
                field.push(r - radius);
            }
        }
    }
    field
}

/// Raw parameter pairs from string literals, as a host descriptor
/// would carry them.
pub fn raw_params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Progress receiver that records every forwarded fraction.
#[derive(Default)]
pub struct RecordingProgress {
    seen: Mutex<Vec<f32>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything the sink has seen, in arrival order.
    pub fn fractions(&self) -> Vec<f32> {
        self.seen.lock().expect("progress mutex poisoned").clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn update(&self, fraction: f32) {
        self.seen
            .lock()
            .expect("progress mutex poisoned")
            .push(fraction);
    }
}

/// Progress receiver that raises the cancellation token once the
/// fraction reaches a threshold, standing in for a user pressing
/// cancel mid-run.
pub struct CancelAfter {
    token: CancelToken,
    threshold: f32,
}

impl CancelAfter {
    pub fn new(token: CancelToken, threshold: f32) -> Self {
        Self { token, threshold }
    }
}

impl ProgressSink for CancelAfter {
    fn update(&self, fraction: f32) {
        if fraction >= self.threshold {
            self.token.cancel();
        }
    }
}
