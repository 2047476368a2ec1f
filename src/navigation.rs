//! Viewport/navigation controller
//!
//! Validates page and zoom changes. Every operation here is tolerant: an
//! out-of-range request is clamped or ignored, never an error. `None` means
//! "nothing changes", so the session does not bump its render generation.

use serde::Serialize;

use crate::config::ViewerConfig;

/// Zoom bounds and step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleBounds {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub step: f32,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl ScaleBounds {
    pub fn from_config(config: &ViewerConfig) -> Self {
        let config = config.clone().validated();
        Self {
            min: config.min_scale,
            max: config.max_scale,
            default: config.default_scale,
            step: config.zoom_step,
        }
    }

    pub fn clamp(&self, scale: f32) -> f32 {
        scale.clamp(self.min, self.max)
    }

    pub fn contains(&self, scale: f32) -> bool {
        scale >= self.min && scale <= self.max
    }
}

/// Page following `current`, or `None` at the last page
pub fn next_page(current: usize, total: usize) -> Option<usize> {
    (current < total).then(|| current + 1)
}

/// Page before `current`, or `None` at page 1
pub fn prev_page(current: usize) -> Option<usize> {
    (current > 1).then(|| current - 1)
}

/// `requested` clamped into `[1, total]`; `None` when that is the current page
pub fn jump_to_page(current: usize, requested: i64, total: usize) -> Option<usize> {
    if total == 0 {
        return None;
    }
    let target = requested.clamp(1, total as i64) as usize;
    (target != current).then_some(target)
}

/// `current + delta`, clamped. Not snapped to the step grid.
pub fn zoom_by(bounds: &ScaleBounds, current: f32, delta: f32) -> Option<f32> {
    if !delta.is_finite() {
        return None;
    }
    set_zoom(bounds, current, current + delta)
}

/// `value`, clamped; `None` for NaN or when the clamped value is unchanged
pub fn set_zoom(bounds: &ScaleBounds, current: f32, value: f32) -> Option<f32> {
    if value.is_nan() {
        return None;
    }
    let target = bounds.clamp(value);
    ((target - current).abs() > f32::EPSILON).then_some(target)
}
