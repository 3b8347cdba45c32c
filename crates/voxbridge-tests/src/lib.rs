//! voxbridge end-to-end test infrastructure.
//!
//! This crate holds the integration tests for the flows a host
//! exercises against the bridge:
//!
//! - Dispatch: every scalar kind routes through the invocation seam
//! - Adaptation: aliasing, bridging, rescale and cast behavior
//! - Coordinates: physical markers against grid indices
//! - Observation: progress, cancellation, and failure reports
//! - Filters: full pipeline runs over synthetic volumes
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test -p voxbridge-tests
//!
//! # Run one flow
//! cargo test -p voxbridge-tests --test e2e_smoothing
//! ```

pub mod fixtures;

// Re-export commonly used items
pub use fixtures::{
    noisy_volume, outlier_volume, raw_params, sphere_field, split_block, CancelAfter,
    RecordingProgress,
};
